//! Data logging toolkit.

use crate::{common::*, tracking::TrackingRun, utils::RateCounter};
use async_std::{fs::File, io::BufWriter};

pub use logging_message::*;
pub use logging_worker::*;

mod logging_worker {
    use super::*;

    /// The data logging worker.
    ///
    /// It writes TensorBoard events and forwards parameters and evaluation
    /// metrics to the tracking server if a run is given.
    pub struct LoggingWorker {
        event_writer: EventWriter<BufWriter<File>>,
        tracking: Option<TrackingRun>,
        rate_counter: RateCounter,
        rx: broadcast::Receiver<LoggingMessage>,
    }

    impl LoggingWorker {
        /// Create a data logging worker.
        async fn new(
            logging_dir: &Path,
            tracking: Option<TrackingRun>,
            rx: broadcast::Receiver<LoggingMessage>,
        ) -> Result<Self> {
            let event_dir = logging_dir.join("events");
            let event_path_prefix = event_dir
                .join("xray-ae")
                .into_os_string()
                .into_string()
                .map_err(|path| format_err!("non-UTF-8 logging path {:?}", path))?;

            tokio::fs::create_dir_all(&event_dir).await?;

            let event_writer = EventWriterInit::default()
                .from_prefix_async(event_path_prefix, None)
                .await?;

            Ok(Self {
                event_writer,
                tracking,
                rate_counter: RateCounter::with_second_interval(),
                rx,
            })
        }

        /// Start the data logging worker.
        async fn start(mut self) -> Result<()> {
            loop {
                let LoggingMessage { tag, kind } = match self.rx.recv().await {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!("the logging worker skipped {} messages", count);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                self.rate_counter.add(1.0);

                match kind {
                    LoggingMessageKind::Params(msg) => {
                        self.log_params(msg).await;
                    }
                    LoggingMessageKind::TrainingStep(msg) => {
                        self.log_training_step(&tag, msg).await?;
                    }
                    LoggingMessageKind::Evaluation(msg) => {
                        self.log_evaluation(&tag, msg).await?;
                    }
                    LoggingMessageKind::Reconstruction(msg) => {
                        self.log_reconstruction(&tag, msg).await?;
                    }
                }

                if let Some(rate) = self.rate_counter.rate() {
                    debug!("processed {:.2} events/s", rate);
                }
            }

            if let Some(run) = &self.tracking {
                if let Err(err) = run.finish().await {
                    warn!("failed to finish the tracking run: {:#}", err);
                }
            }

            Ok(())
        }

        async fn log_params(&mut self, msg: ParamsLog) {
            let run = match &self.tracking {
                Some(run) => run,
                None => return,
            };

            for (key, value) in &msg.params {
                if let Err(err) = run.log_param(key, value).await {
                    warn!("failed to log parameter '{}': {:#}", key, err);
                }
            }
        }

        async fn log_training_step(&mut self, tag: &str, msg: TrainingStepLog) -> Result<()> {
            let TrainingStepLog { step, losses, .. } = msg;

            for (name, value) in losses {
                self.event_writer
                    .write_scalar_async(format!("{}/{}", tag, name), step as i64, value as f32)
                    .await?;
            }

            Ok(())
        }

        async fn log_evaluation(&mut self, tag: &str, msg: EvaluationLog) -> Result<()> {
            let EvaluationLog { epoch, metrics } = msg;
            let step = epoch as i64;

            for (name, value) in metrics.to_map() {
                let key = format!("{}/{}", tag, name);
                self.event_writer
                    .write_scalar_async(key.as_str(), step, value as f32)
                    .await?;

                if let Some(run) = &self.tracking {
                    if let Err(err) = run.log_metric(&key, value, step).await {
                        warn!("failed to log metric '{}': {:#}", key, err);
                    }
                }
            }

            Ok(())
        }

        async fn log_reconstruction(&mut self, tag: &str, msg: ReconstructionLog) -> Result<()> {
            let ReconstructionLog {
                epoch,
                input,
                output,
            } = msg;

            let images = tokio::task::spawn_blocking(move || {
                tch::no_grad(|| {
                    let images = Tensor::stack(&[input, output], 0).to_device(Device::Cpu);
                    (images.clamp(0.0, 1.0) * 255.0).to_kind(Kind::Uint8)
                })
            })
            .await?;

            self.event_writer
                .write_image_list_async(tag, epoch as i64, images)
                .await?;

            Ok(())
        }
    }

    /// Start the data logging worker.
    pub async fn logging_worker(
        logging_dir: PathBuf,
        tracking: Option<TrackingRun>,
        rx: broadcast::Receiver<LoggingMessage>,
    ) -> Result<impl Future<Output = Result<()>> + Send> {
        let worker = LoggingWorker::new(&logging_dir, tracking, rx).await?;
        Ok(tokio::task::spawn(worker.start()).map(|result| Fallible::Ok(result??)))
    }
}

mod logging_message {
    use super::*;

    /// The message type that is accepted by the logging worker.
    #[derive(Debug, TensorLike, Clone)]
    pub struct LoggingMessage {
        #[tensor_like(clone)]
        pub tag: Cow<'static, str>,
        pub kind: LoggingMessageKind,
    }

    impl LoggingMessage {
        pub fn new_params<S>(tag: S, params: IndexMap<String, String>) -> Self
        where
            S: Into<Cow<'static, str>>,
        {
            Self {
                tag: tag.into(),
                kind: LoggingMessageKind::Params(ParamsLog { params }),
            }
        }

        pub fn new_training_step<S>(
            tag: S,
            epoch: usize,
            step: usize,
            losses: IndexMap<&'static str, f64>,
        ) -> Self
        where
            S: Into<Cow<'static, str>>,
        {
            Self {
                tag: tag.into(),
                kind: LoggingMessageKind::TrainingStep(TrainingStepLog {
                    epoch,
                    step,
                    losses,
                }),
            }
        }

        pub fn new_evaluation<S>(tag: S, epoch: usize, metrics: EvaluationMetrics) -> Self
        where
            S: Into<Cow<'static, str>>,
        {
            Self {
                tag: tag.into(),
                kind: LoggingMessageKind::Evaluation(EvaluationLog { epoch, metrics }),
            }
        }

        pub fn new_reconstruction<S>(tag: S, epoch: usize, input: &Tensor, output: &Tensor) -> Self
        where
            S: Into<Cow<'static, str>>,
        {
            Self {
                tag: tag.into(),
                kind: LoggingMessageKind::Reconstruction(ReconstructionLog {
                    epoch,
                    input: input.shallow_clone(),
                    output: output.shallow_clone(),
                }),
            }
        }
    }

    #[derive(Debug, TensorLike)]
    pub enum LoggingMessageKind {
        Params(ParamsLog),
        TrainingStep(TrainingStepLog),
        Evaluation(EvaluationLog),
        Reconstruction(ReconstructionLog),
    }

    impl Clone for LoggingMessageKind {
        fn clone(&self) -> Self {
            self.shallow_clone()
        }
    }

    /// Run parameters reported once at start.
    #[derive(Debug, Clone, TensorLike)]
    pub struct ParamsLog {
        #[tensor_like(clone)]
        pub params: IndexMap<String, String>,
    }

    #[derive(Debug, Clone, TensorLike)]
    pub struct TrainingStepLog {
        #[tensor_like(copy)]
        pub epoch: usize,
        #[tensor_like(copy)]
        pub step: usize,
        #[tensor_like(clone)]
        pub losses: IndexMap<&'static str, f64>,
    }

    #[derive(Debug, Clone, TensorLike)]
    pub struct EvaluationLog {
        #[tensor_like(copy)]
        pub epoch: usize,
        #[tensor_like(copy)]
        pub metrics: EvaluationMetrics,
    }

    /// An input image and its reconstruction, both `[1, H, W]` in `[0, 1]`.
    #[derive(Debug, TensorLike)]
    pub struct ReconstructionLog {
        #[tensor_like(copy)]
        pub epoch: usize,
        pub input: Tensor,
        pub output: Tensor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{
        mock_server::{MockServer, Request},
        TrackingClient,
    };

    #[tokio::test]
    async fn write_events_without_tracking() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (tx, rx) = broadcast::channel(16);
        let worker = logging_worker(dir.path().to_owned(), None, rx).await?;

        let metrics = EvaluationMetrics {
            roc_auc: r64(0.75),
            mse: r64(0.01),
            f1_score: r64(0.5),
            threshold: r64(0.02),
        };
        let image = Tensor::rand(&[1, 8, 8], FLOAT_CPU);
        let send = |msg| {
            tx.send(msg)
                .map(|_| ())
                .map_err(|_| format_err!("failed to send message to logging worker"))
        };

        send(LoggingMessage::new_params(
            "params",
            IndexMap::from_iter([("lr".to_string(), "0.001".to_string())]),
        ))?;
        send(LoggingMessage::new_training_step(
            "train",
            1,
            1,
            IndexMap::from_iter([("total", 0.5)]),
        ))?;
        send(LoggingMessage::new_evaluation("validation", 1, metrics))?;
        send(LoggingMessage::new_reconstruction(
            "validation/reconstruction",
            1,
            &image,
            &image,
        ))?;
        drop(send);
        drop(tx);

        worker.await?;

        let num_event_files = std::fs::read_dir(dir.path().join("events"))?.count();
        assert_eq!(num_event_files, 1);
        Ok(())
    }

    #[tokio::test]
    async fn forward_params_and_metrics_to_tracking() -> Result<()> {
        let server = MockServer::start(true).await?;
        let run = TrackingClient::new(&server.uri)?
            .create_run("BaselineAutoencoder")
            .await?;

        let dir = tempfile::tempdir()?;
        let (tx, rx) = broadcast::channel(16);
        let worker = logging_worker(dir.path().to_owned(), Some(run), rx).await?;

        let metrics = EvaluationMetrics {
            roc_auc: r64(0.75),
            mse: r64(0.01),
            f1_score: r64(0.5),
            threshold: r64(0.02),
        };
        let params = IndexMap::from_iter([
            ("lr".to_string(), "0.001".to_string()),
            ("batch_size".to_string(), "8".to_string()),
        ]);
        tx.send(LoggingMessage::new_params("params", params))
            .map_err(|_| format_err!("failed to send message to logging worker"))?;
        tx.send(LoggingMessage::new_evaluation("validation", 3, metrics))
            .map_err(|_| format_err!("failed to send message to logging worker"))?;
        drop(tx);

        worker.await?;

        let requests = server.requests();
        let endpoint = |req: &Request| req.path.rsplit('/').next().unwrap_or_default().to_string();

        // get-by-name and runs/create precede the worker
        let logged: Vec<_> = requests[2..].iter().collect();
        let endpoints: Vec<_> = logged.iter().map(|req| endpoint(req)).collect();
        assert_eq!(
            endpoints,
            [
                "log-parameter",
                "log-parameter",
                "log-metric",
                "log-metric",
                "log-metric",
                "log-metric",
                "update",
            ]
        );

        assert_eq!(logged[0].body["key"], "lr");
        assert_eq!(logged[1].body["key"], "batch_size");
        let metric_keys: Vec<_> = logged[2..6]
            .iter()
            .map(|req| req.body["key"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            metric_keys,
            [
                "validation/roc-auc",
                "validation/mse",
                "validation/f1-score",
                "validation/optimal mse threshold",
            ]
        );
        assert!(logged[2..6].iter().all(|req| req.body["step"] == 3));
        assert_eq!(logged[6].body["status"], "FINISHED");
        Ok(())
    }
}
