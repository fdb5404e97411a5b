//! The training program for radiograph anomaly detection.

pub mod common;
pub mod config;
pub mod evaluate;
pub mod logging;
pub mod model;
pub mod tracking;
pub mod train;
pub mod utils;

use crate::{
    common::*,
    config::Config,
    logging::LoggingMessage,
    tracking::{TrackingClient, TrackingRun},
    train::{TrainingContext, TrainingOutcome},
};
use xray_ae::dataset::discover_records;

/// The summary written to `metrics.json` at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub model: String,
    pub params: IndexMap<String, String>,
    pub validation: IndexMap<String, f64>,
    pub test: IndexMap<String, f64>,
    pub model_file: PathBuf,
}

/// The entry of training program.
pub async fn start(config: Arc<Config>) -> Result<RunReport> {
    let start_time = Local::now();
    let logging_dir = config
        .logging
        .dir
        .join(format!("{}", start_time.format(utils::FILE_STRFTIME)));
    let checkpoint_dir = logging_dir.join("checkpoints");

    // create dirs and save config
    {
        tokio::fs::create_dir_all(&logging_dir).await?;
        tokio::fs::create_dir_all(&checkpoint_dir).await?;
        let path = logging_dir.join("config.json5");
        let text = serde_json::to_string_pretty(&*config)?;
        tokio::fs::write(&path, text).await?;
    }

    // load dataset
    info!("loading dataset");
    let DatasetSplit {
        train,
        validation,
        test,
    } = {
        let dir = config.dataset.dir.clone();
        let splitter = config.dataset.splitter.clone();
        tokio::task::spawn_blocking(move || -> Result<_> {
            let records = discover_records(&dir)?;
            ensure!(!records.is_empty(), "no images found in '{}'", dir.display());
            splitter.split(records)
        })
        .await??
    };
    info!(
        "{} train, {} validation and {} test images",
        train.len(),
        validation.len(),
        test.len()
    );

    let preprocessor = Arc::new(config.preprocessor.build()?);
    let train_set = MuraDataset::new(train, preprocessor.clone());
    let val_set = MuraDataset::new(validation, preprocessor.clone());
    let test_set = MuraDataset::new(test, preprocessor);

    // run parameters
    let params = run_params(&config)?;
    info!("run parameters {:?}", params);

    // tracking server
    let tracking = start_tracking(&config).await?;

    // create channels
    let (logging_tx, logging_rx) = broadcast::channel(64);
    logging_tx
        .send(LoggingMessage::new_params("params", params.clone()))
        .map_err(|_| format_err!("failed to send message to logging worker"))?;

    // start logger
    let logging_future = logging::logging_worker(logging_dir.clone(), tracking, logging_rx).await?;

    // training worker
    let training_future = {
        let ctx = TrainingContext {
            config: config.clone(),
            train_set,
            val_set,
            test_set,
            checkpoint_dir,
            logging_tx,
            runtime: tokio::runtime::Handle::current(),
        };
        tokio::task::spawn_blocking(move || train::training_worker(ctx))
            .map(|result| Fallible::Ok(result??))
    };

    let (outcome, ()) = futures::try_join!(training_future, logging_future)?;
    let TrainingOutcome {
        validation,
        test,
        model_file,
        ..
    } = outcome;

    let to_owned_map = |metrics: EvaluationMetrics| -> IndexMap<String, f64> {
        metrics
            .to_map()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    };
    let report = RunReport {
        model: config.model.name().to_string(),
        params,
        validation: to_owned_map(validation),
        test: to_owned_map(test),
        model_file,
    };

    let path = logging_dir.join("metrics.json");
    tokio::fs::write(&path, serde_json::to_string_pretty(&report)?)
        .await
        .with_context(|| format!("failed to write '{}'", path.display()))?;

    Ok(report)
}

/// The parameters reported to the tracking server.
pub fn run_params(config: &Config) -> Result<IndexMap<String, String>> {
    let Config {
        model,
        preprocessor,
        training,
        ..
    } = config;
    let [height, width] = preprocessor.image_size;
    let trainable_params = model
        .autoencoder_layout()?
        .summary(Chw::new(1, height, width))?
        .trainable_params();

    let params: IndexMap<_, _> = [
        ("model", model.name().to_string()),
        ("batch_size", training.batch_size.to_string()),
        ("image_resolution", format!("{}x{}", height, width)),
        ("num_epochs", training.num_epochs.to_string()),
        ("batch_normalisation", model.batch_norm().to_string()),
        (
            "hist_equalisation",
            preprocessor.hist_equalisation.to_string(),
        ),
        (
            "augmentation",
            preprocessor.augmentation.is_some().to_string(),
        ),
        (
            "masked_loss_on_train",
            training.masked_loss_on_train.to_string(),
        ),
        ("masked_loss_on_val", training.masked_loss_on_val.to_string()),
        ("lr", training.lr.to_string()),
        ("trainable_params", trainable_params.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();

    Ok(params)
}

/// Asks whether to log to the tracking server and opens a run if so.
async fn start_tracking(config: &Config) -> Result<Option<TrackingRun>> {
    let tracking = match &config.logging.tracking {
        Some(tracking) => tracking,
        None => return Ok(None),
    };

    let answer = tokio::task::spawn_blocking(|| {
        utils::query_yes_no_stdin("Log this run to the tracking server?", false)
    })
    .await??;
    if !answer {
        info!("tracking is disabled for this run");
        return Ok(None);
    }

    let experiment_name = tracking
        .experiment_name
        .as_deref()
        .unwrap_or_else(|| config.model.name());
    Ok(open_tracking_run(&tracking.uri, experiment_name).await)
}

/// Opens a tracking run, or returns `None` with a warning if the server
/// cannot be used.
pub async fn open_tracking_run(uri: &str, experiment_name: &str) -> Option<TrackingRun> {
    let result = async {
        let client = TrackingClient::new(uri)?;
        client.create_run(experiment_name).await
    }
    .await;

    match result {
        Ok(run) => {
            info!(
                "logging to run {} of experiment '{}' at {}",
                run.run_id(),
                experiment_name,
                uri
            );
            Some(run)
        }
        Err(err) => {
            warn!(
                "tracking server {} is unavailable, continue without tracking: {:#}",
                uri, err
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_of_sample_config() -> Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("train.json5");
        let config = Config::open(path)?;
        let params = run_params(&config)?;

        assert_eq!(params["model"], "BottleneckAutoencoder");
        assert_eq!(params["image_resolution"], "512x512");
        assert_eq!(params["batch_normalisation"], "true");
        assert!(params["trainable_params"].parse::<usize>()? > 0);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_tracking_server_is_skipped() -> Result<()> {
        // reserve a port and close it again so nothing listens there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let uri = format!("http://{}", listener.local_addr()?);
        drop(listener);

        assert!(open_tracking_run(&uri, "DCGAN").await.is_none());
        assert!(open_tracking_run("not a url", "DCGAN").await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn open_run_on_live_server() -> Result<()> {
        let server = tracking::mock_server::MockServer::start(false).await?;
        let run = open_tracking_run(&server.uri, "DCGAN").await;
        assert_eq!(
            run.as_ref().map(|run| run.run_id()),
            Some(tracking::mock_server::RUN_ID)
        );
        Ok(())
    }
}
