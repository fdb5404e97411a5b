//! The training worker.

use crate::{
    common::*,
    config::{Config, LoggingConfig, TrainingConfig},
    evaluate::{evaluate, Evaluation},
    logging::LoggingMessage,
    model::{summary_table, Model},
    utils::{self, RateCounter},
};
use tokio::runtime::Handle;

/// The inputs of a training run.
pub struct TrainingContext {
    pub config: Arc<Config>,
    pub train_set: MuraDataset,
    pub val_set: MuraDataset,
    pub test_set: MuraDataset,
    pub checkpoint_dir: PathBuf,
    pub logging_tx: broadcast::Sender<LoggingMessage>,
    pub runtime: Handle,
}

/// The outcome of a finished training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub validation: EvaluationMetrics,
    pub test: EvaluationMetrics,
    pub model_file: PathBuf,
    pub trainable_params: i64,
}

/// Trains the model, then scores the test split with the validation threshold.
///
/// It blocks the calling thread and must run in `spawn_blocking`.
pub fn training_worker(ctx: TrainingContext) -> Result<TrainingOutcome> {
    let TrainingContext {
        config,
        train_set,
        val_set,
        test_set,
        checkpoint_dir,
        logging_tx,
        runtime,
    } = ctx;
    let Config {
        model: ref model_init,
        ref preprocessor,
        training:
            TrainingConfig {
                batch_size,
                num_epochs,
                lr,
                masked_loss_on_train,
                masked_loss_on_val,
                seed,
                device,
                save_checkpoint,
                ref load_checkpoint,
                ref models_dir,
            },
        logging: LoggingConfig {
            ref dir,
            enable_images,
            ..
        },
        ..
    } = *config;
    let batch_size = batch_size.get();
    let num_epochs = num_epochs.get();
    let inner_loss = ReconstructionLoss::new(masked_loss_on_train);
    let outer_loss = ReconstructionLoss::new(masked_loss_on_val);

    ensure!(
        train_set.records().iter().all(|record| !record.abnormal),
        "the training set must contain normal studies only"
    );

    let send = |msg: LoggingMessage| {
        logging_tx
            .send(msg)
            .map(|_| ())
            .map_err(|_| format_err!("failed to send message to logging worker"))
    };

    // init model
    info!("use device {:?}", device);
    tch::manual_seed(seed as i64);
    let mut model = Model::new(model_init, device, lr.raw())?;
    {
        let [height, width] = preprocessor.image_size;
        let summary = model.summary(Chw::new(1, height, width))?;
        info!("{} summary\n{}", model_init.name(), summary_table(&summary));
    }
    model.load_checkpoint(dir, load_checkpoint)?;

    // training
    info!("start training");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rate_counter = RateCounter::with_second_interval();
    let mut step = 0;
    let mut val_metrics = None;

    for epoch in 1..=num_epochs {
        let bar = utils::batch_progress_bar(
            &format!("epoch {}", epoch),
            train_set.num_batches(batch_size),
        )?;
        let mut stream = train_set.batches(batch_size, Some(&mut rng))?;
        let mut last_losses = None;

        while let Some(batch) = runtime.block_on(stream.next()) {
            let batch = batch?.to_device(device);
            let losses = model.train_on_batch(&batch, inner_loss)?;
            step += 1;

            rate_counter.add(1.0);
            if let Some(batch_rate) = rate_counter.rate() {
                let record_rate = batch_rate * batch_size as f64;
                debug!(
                    "epoch: {}\tstep: {}\t{:.2} batches/s\t{:.2} records/s",
                    epoch, step, batch_rate, record_rate
                );
            }
            bar.set_message(format!("loss {:.5}", losses.total));
            bar.inc(1);

            send(LoggingMessage::new_training_step(
                "train",
                epoch,
                step,
                losses.to_map(),
            ))?;
            last_losses = Some(losses);
        }
        bar.finish();

        let last_losses =
            last_losses.ok_or_else(|| format_err!("the training set yields no batches"))?;
        info!(
            "epoch: {}\tloss on the last train batch: {:.5}",
            epoch, last_losses.total
        );

        // validation
        let example_index = (enable_images && !val_set.is_empty())
            .then(|| rng.gen_range(0..val_set.len()));
        let Evaluation { metrics, example } = evaluate(
            &model,
            &val_set,
            outer_loss,
            None,
            example_index,
            batch_size,
            device,
            &runtime,
            "validation",
        )?;
        send(LoggingMessage::new_evaluation("validation", epoch, metrics))?;

        if enable_images {
            if let Some((input, output)) = example {
                send(LoggingMessage::new_reconstruction(
                    "validation/reconstruction",
                    epoch,
                    &input,
                    &output,
                ))?;
            }
        }

        if save_checkpoint {
            let path = model.save_checkpoint(&checkpoint_dir, epoch, last_losses.total)?;
            info!("saved checkpoint {}", path.display());
        }

        val_metrics = Some(metrics);
    }

    let val_metrics =
        val_metrics.ok_or_else(|| format_err!("training finished without any epoch"))?;

    // test with the threshold selected on validation data
    let Evaluation {
        metrics: test_metrics,
        ..
    } = evaluate(
        &model,
        &test_set,
        outer_loss,
        Some(val_metrics.threshold),
        None,
        batch_size,
        device,
        &runtime,
        "test",
    )?;
    send(LoggingMessage::new_evaluation("test", num_epochs, test_metrics))?;

    // persist parameters
    std::fs::create_dir_all(models_dir)
        .with_context(|| format!("failed to create directory '{}'", models_dir.display()))?;
    let model_file = models_dir.join(format!("{}.ot", model_init.name()));
    model
        .save(&model_file)
        .with_context(|| format!("failed to save model '{}'", model_file.display()))?;
    info!("saved model parameters to {}", model_file.display());

    Ok(TrainingOutcome {
        validation: val_metrics,
        test: test_metrics,
        model_file,
        trainable_params: model.trainable_params(),
    })
}
