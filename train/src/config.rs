//! Training program configuration format.

use crate::common::*;

pub use dataset::*;
pub use logging::*;
pub use training::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelInit,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub preprocessor: PreprocessorInit,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects invalid options before any training work starts.
    pub fn validate(&self) -> Result<()> {
        let [height, width] = self.preprocessor.image_size;
        let input_shape = Chw::new(1, height, width);

        self.model
            .autoencoder_layout()?
            .summary(input_shape)
            .with_context(|| {
                format!(
                    "the {} model cannot reconstruct {}x{} images",
                    self.model.name(),
                    height,
                    width
                )
            })?;
        if let ModelInit::Dcgan(init) = &self.model {
            init.discriminator.check_input_shape(input_shape)?;
            ensure!(
                init.adversarial_weight >= 0.0,
                "adversarial_weight must be non-negative"
            );
        }

        self.dataset.splitter.validate()?;
        self.preprocessor.build()?;
        ensure!(self.training.lr > 0.0, "lr must be positive");

        Ok(())
    }
}

mod dataset {
    use super::*;

    /// Dataset options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// The directory of `<patient>/<study>_<positive|negative>/<image>.png` files.
        pub dir: PathBuf,
        #[serde(default)]
        pub splitter: TrainValTestSplitter,
    }
}

mod training {
    use super::*;

    /// The training options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrainingConfig {
        pub batch_size: NonZeroUsize,
        pub num_epochs: NonZeroUsize,
        #[serde(default = "default_lr")]
        pub lr: R64,
        /// Use the masked loss for gradient descent.
        #[serde(default = "default_true")]
        pub masked_loss_on_train: bool,
        /// Use the masked loss for evaluation scores.
        #[serde(default = "default_true")]
        pub masked_loss_on_val: bool,
        /// The seed of parameter initialization and data shuffling.
        #[serde(default = "default_seed")]
        pub seed: u64,
        #[serde(with = "tch_serde::serde_device")]
        pub device: Device,
        /// Save a checkpoint file after every epoch.
        #[serde(default)]
        pub save_checkpoint: bool,
        /// Checkpoint file loading method.
        #[serde(default = "default_load_checkpoint")]
        pub load_checkpoint: LoadCheckpoint,
        /// The directory of persisted model parameters.
        pub models_dir: PathBuf,
    }

    /// Checkpoint file loading method.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum LoadCheckpoint {
        /// Disable checkpoint file loading.
        Disabled,
        /// Load the most recent checkpoint file.
        FromRecent,
        /// Load the checkpoint file at specified path.
        FromFile { file: PathBuf },
    }

    fn default_lr() -> R64 {
        r64(1e-3)
    }

    fn default_true() -> bool {
        true
    }

    fn default_seed() -> u64 {
        42
    }

    fn default_load_checkpoint() -> LoadCheckpoint {
        LoadCheckpoint::Disabled
    }
}

mod logging {
    use super::*;

    /// Data logging options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LoggingConfig {
        pub dir: PathBuf,
        /// Log one validation reconstruction per epoch.
        #[serde(default)]
        pub enable_images: bool,
        /// The optional MLflow-compatible tracking server.
        pub tracking: Option<TrackingConfig>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrackingConfig {
        /// The server URL, for example `http://localhost:5000`.
        pub uri: String,
        /// Defaults to the model name.
        pub experiment_name: Option<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
{
    model: { kind: "Baseline" },
    dataset: { dir: "data/XR_HAND" },
    preprocessor: { image_size: [64, 64] },
    training: {
        batch_size: 8,
        num_epochs: 2,
        device: "cpu",
        models_dir: "models",
    },
    logging: { dir: "logs" },
}
"#;

    #[test]
    fn parse_minimal_config() -> Result<()> {
        let config: Config = json5::from_str(EXAMPLE)?;
        config.validate()?;

        assert_eq!(config.model.name(), "BaselineAutoencoder");
        assert_eq!(config.training.lr, r64(1e-3));
        assert!(config.training.masked_loss_on_train);
        assert!(config.training.masked_loss_on_val);
        assert!(matches!(
            config.training.load_checkpoint,
            LoadCheckpoint::Disabled
        ));
        assert!(config.logging.tracking.is_none());
        Ok(())
    }

    #[test]
    fn reject_unreconstructable_size() -> Result<()> {
        let mut config: Config = json5::from_str(EXAMPLE)?;
        config.preprocessor.image_size = [100, 100];
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn sample_config_is_valid() -> Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("train.json5");
        let config = Config::open(path)?;
        assert_eq!(config.model.name(), "BottleneckAutoencoder");
        Ok(())
    }
}
