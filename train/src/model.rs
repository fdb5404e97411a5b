//! The trainable model with its parameters and optimizers.

use crate::{
    common::*,
    config::LoadCheckpoint,
    utils::{self, companion_path},
};
use prettytable::{cell, row, Table};
use xray_ae::model::{ConvAutoencoder, Discriminator};

/// Losses of a single optimization step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLosses {
    /// The loss the generator or autoencoder is optimized on.
    pub total: f64,
    pub reconstruction: f64,
    pub adversarial: Option<f64>,
    pub discriminator: Option<f64>,
}

impl StepLosses {
    pub fn to_map(&self) -> IndexMap<&'static str, f64> {
        let mut map = IndexMap::new();
        map.insert("total", self.total);
        map.insert("reconstruction", self.reconstruction);
        if let Some(loss) = self.adversarial {
            map.insert("adversarial", loss);
        }
        if let Some(loss) = self.discriminator {
            map.insert("discriminator", loss);
        }
        map
    }
}

/// A model variant together with its optimizer state.
pub enum Model {
    Autoencoder(AutoencoderModel),
    Dcgan(DcganModel),
}

pub struct AutoencoderModel {
    vs: nn::VarStore,
    net: ConvAutoencoder,
    optimizer: nn::Optimizer,
}

pub struct DcganModel {
    gen_vs: nn::VarStore,
    generator: ConvAutoencoder,
    gen_optimizer: nn::Optimizer,
    disc_vs: nn::VarStore,
    discriminator: Discriminator,
    disc_optimizer: nn::Optimizer,
    adversarial_weight: f64,
    bce: BceWithLogitsLoss,
}

impl Model {
    pub fn new(init: &ModelInit, device: Device, lr: f64) -> Result<Self> {
        let model = match init {
            ModelInit::Baseline(_) | ModelInit::Bottleneck(_) => {
                let vs = nn::VarStore::new(device);
                let net = init.autoencoder_layout()?.build(&vs.root());
                let optimizer = nn::Adam::default().build(&vs, lr)?;
                Self::Autoencoder(AutoencoderModel { vs, net, optimizer })
            }
            ModelInit::Dcgan(init) => {
                let gen_vs = nn::VarStore::new(device);
                let generator = init.generator.build(&gen_vs.root())?;
                let gen_optimizer = nn::Adam::default().build(&gen_vs, lr)?;

                let disc_vs = nn::VarStore::new(device);
                let discriminator = init.discriminator.build(&disc_vs.root())?;
                let disc_optimizer = nn::Adam::default().build(&disc_vs, lr)?;

                Self::Dcgan(DcganModel {
                    gen_vs,
                    generator,
                    gen_optimizer,
                    disc_vs,
                    discriminator,
                    disc_optimizer,
                    adversarial_weight: init.adversarial_weight.raw(),
                    bce: BceWithLogitsLoss::default(),
                })
            }
        };
        Ok(model)
    }

    /// The network that reconstructs images.
    pub fn autoencoder(&self) -> &ConvAutoencoder {
        match self {
            Self::Autoencoder(model) => &model.net,
            Self::Dcgan(model) => &model.generator,
        }
    }

    pub fn summary(&self, input_shape: Chw) -> Result<ModelSummary> {
        self.autoencoder().summary(input_shape)
    }

    /// The number of trainable scalars of the reconstruction network.
    pub fn trainable_params(&self) -> i64 {
        let vs = match self {
            Self::Autoencoder(model) => &model.vs,
            Self::Dcgan(model) => &model.gen_vs,
        };
        vs.trainable_variables()
            .iter()
            .map(|tensor| tensor.numel() as i64)
            .sum()
    }

    /// Runs one optimization step on a batch.
    pub fn train_on_batch(
        &mut self,
        batch: &Batch,
        loss_fn: ReconstructionLoss,
    ) -> Result<StepLosses> {
        let Batch { image, mask, .. } = batch;

        match self {
            Self::Autoencoder(model) => {
                let output = model.net.forward_t(image, true)?;
                let loss = loss_fn.forward(&output, image, mask, Reduction::Mean)?;
                model.optimizer.backward_step(&loss);

                let loss = f64::from(&loss);
                Ok(StepLosses {
                    total: loss,
                    reconstruction: loss,
                    adversarial: None,
                    discriminator: None,
                })
            }
            Self::Dcgan(model) => {
                let output = model.generator.forward_t(image, true)?;

                // discriminator step
                let disc_loss = {
                    let real = model.discriminator.forward_t(image, true)?;
                    let fake = model.discriminator.forward_t(&output.detach(), true)?;
                    (model.bce.real(&real)? + model.bce.fake(&fake)?) * 0.5
                };
                model.disc_optimizer.backward_step(&disc_loss);

                // generator step
                let recon_loss = loss_fn.forward(&output, image, mask, Reduction::Mean)?;
                let adv_loss = {
                    let logits = model.discriminator.forward_t(&output, true)?;
                    model.bce.real(&logits)?
                };
                let gen_loss = &recon_loss + &adv_loss * model.adversarial_weight;
                model.gen_optimizer.backward_step(&gen_loss);

                Ok(StepLosses {
                    total: f64::from(&gen_loss),
                    reconstruction: f64::from(&recon_loss),
                    adversarial: Some(f64::from(&adv_loss)),
                    discriminator: Some(f64::from(&disc_loss)),
                })
            }
        }
    }

    /// Reconstructs images in evaluation mode without tracking gradients.
    pub fn reconstruct(&self, image: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| self.autoencoder().forward_t(image, false))
    }

    /// Writes the parameters to `path`.
    ///
    /// The discriminator of a DCGAN goes to a companion file next to it.
    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Self::Autoencoder(model) => {
                model.vs.save(path)?;
            }
            Self::Dcgan(model) => {
                model.gen_vs.save(path)?;
                model
                    .disc_vs
                    .save(companion_path(path, "discriminator"))?;
            }
        }
        Ok(())
    }

    pub fn save_checkpoint(
        &self,
        checkpoint_dir: &Path,
        epoch: usize,
        loss: f64,
    ) -> Result<PathBuf> {
        let path = match self {
            Self::Autoencoder(model) => {
                utils::save_checkpoint(&model.vs, checkpoint_dir, epoch, loss)?
            }
            Self::Dcgan(model) => {
                let path = utils::save_checkpoint(&model.gen_vs, checkpoint_dir, epoch, loss)?;
                model
                    .disc_vs
                    .save(companion_path(&path, "discriminator"))?;
                path
            }
        };
        Ok(path)
    }

    pub fn load_checkpoint(
        &mut self,
        logging_dir: &Path,
        load_checkpoint: &LoadCheckpoint,
    ) -> Result<Option<PathBuf>> {
        match self {
            Self::Autoencoder(model) => {
                utils::try_load_checkpoint(&mut model.vs, logging_dir, load_checkpoint)
            }
            Self::Dcgan(model) => {
                let path =
                    utils::try_load_checkpoint(&mut model.gen_vs, logging_dir, load_checkpoint)?;
                if let Some(path) = &path {
                    let disc_path = companion_path(path, "discriminator");
                    if disc_path.is_file() {
                        model.disc_vs.load_partial(&disc_path).with_context(|| {
                            format!("failed to load checkpoint '{}'", disc_path.display())
                        })?;
                    } else {
                        warn!(
                            "{} is missing, the discriminator starts from scratch",
                            disc_path.display()
                        );
                    }
                }
                Ok(path)
            }
        }
    }
}

/// Renders a model summary as a text table.
pub fn summary_table(summary: &ModelSummary) -> Table {
    let mut table = Table::new();
    table.set_titles(row!["Layer", "Kind", "Output Shape", "Param #"]);
    table.add_row(row!["input", "", summary.input_shape.to_string(), ""]);
    summary.layers.iter().for_each(|layer| {
        table.add_row(row![
            layer.name,
            layer.kind,
            layer.output_shape.to_string(),
            layer.num_params
        ]);
    });
    table.add_row(row!["total", "", "", summary.trainable_params()]);
    table
}
