use crate::common::*;

/// ITU-R 601 luma weights for the red, green and blue channels.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Converts a `[3, H, W]` or `[1, H, W]` uint8 image to `[1, H, W]` uint8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GrayScale;

impl GrayScale {
    pub fn forward(&self, image: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| {
            ensure!(
                image.kind() == Kind::Uint8,
                "expect a uint8 image, but get {:?}",
                image.kind()
            );
            let (channels, _height, _width) = image.size3()?;

            match channels {
                1 => Ok(image.shallow_clone()),
                3 => {
                    let weights =
                        Tensor::of_slice(&LUMA_WEIGHTS).to_device(image.device()).view([3, 1, 1]);
                    let gray = (image.to_kind(Kind::Float) * weights)
                        .sum_dim_intlist(&[0], true, Kind::Float)
                        .round()
                        .clamp(0.0, 255.0)
                        .to_kind(Kind::Uint8);
                    Ok(gray)
                }
                _ => bail!("expect 1 or 3 channels, but get {}", channels),
            }
        })
    }
}
