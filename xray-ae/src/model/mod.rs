//! Encoder/decoder model definitions.

mod autoencoder;
mod baseline;
mod bottleneck;
mod config;
mod dcgan;
mod discriminator;
pub mod module;
pub mod shape;
mod stack;
mod summary;

pub use autoencoder::*;
pub use baseline::*;
pub use bottleneck::*;
pub use config::*;
pub use dcgan::*;
pub use discriminator::*;
pub use shape::Chw;
pub use stack::*;
pub use summary::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::*;

    #[test]
    fn model_init_serde_test() -> Result<()> {
        let init = ModelInit::Bottleneck(Default::default());
        let text = serde_json::to_string_pretty(&init)?;
        let recovered: ModelInit = serde_json::from_str(&text)?;
        assert_eq!(init, recovered);

        let partial: ModelInit = serde_json::from_str(r#"{ "kind": "Baseline", "batch_norm": false }"#)?;
        match partial {
            ModelInit::Baseline(init) => {
                assert!(!init.batch_norm);
                assert_eq!(init.encoder, BaselineAutoencoderInit::default().encoder);
            }
            _ => bail!("expect the baseline variant"),
        }
        Ok(())
    }

    #[test]
    fn default_layouts_restore_input_shape() -> Result<()> {
        let input = Chw::new(1, 512, 512);

        let baseline = BaselineAutoencoderInit::default().layout()?.summary(input)?;
        assert_eq!(baseline.output_shape(), input);
        // the deepest code is 512 x 16 x 16
        assert_eq!(baseline.layers[9].output_shape, Chw::new(512, 16, 16));

        let bottleneck = BottleneckAutoencoderInit::default()
            .layout()?
            .summary(input)?;
        assert_eq!(bottleneck.output_shape(), input);
        assert_eq!(bottleneck.layers[5].output_shape, Chw::new(256, 3, 3));

        Ok(())
    }

    #[test]
    fn mismatched_resolution_is_rejected() -> Result<()> {
        // 100 is not divisible by 32, the strided stack cannot restore it
        let layout = BaselineAutoencoderInit::default().layout()?;
        assert!(layout.summary(Chw::new(1, 100, 100)).is_err());

        // the bottleneck collapses a small input to zero
        let layout = BottleneckAutoencoderInit::default().layout()?;
        assert!(layout.summary(Chw::new(1, 64, 64)).is_err());
        Ok(())
    }

    #[test]
    fn parameter_count() -> Result<()> {
        let init = BaselineAutoencoderInit {
            encoder: LayerStack::new([1], [4], [3], [1]),
            decoder: LayerStack::new([4], [1], [3], [1]),
            ..Default::default()
        };
        let summary = init.layout()?.summary(Chw::new(1, 8, 8))?;
        // conv 1*4*3*3 + bn 2*4, deconv 4*1*3*3 without bias and batch norm
        assert_eq!(summary.trainable_params(), 36 + 8 + 36);

        let vs = nn::VarStore::new(Device::Cpu);
        let _model = init.build(&vs.root())?;
        let num_trainable: i64 = vs
            .trainable_variables()
            .iter()
            .map(|tensor| tensor.numel() as i64)
            .sum();
        assert_eq!(num_trainable as usize, summary.trainable_params());
        Ok(())
    }
}
