use crate::common::*;

/// Global histogram equalisation of a `[1, H, W]` uint8 image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HistEqualisation;

impl HistEqualisation {
    pub fn forward(&self, image: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| {
            ensure!(
                image.kind() == Kind::Uint8,
                "expect a uint8 image, but get {:?}",
                image.kind()
            );
            let size = image.size();
            let flat = image.view([-1]).to_kind(Kind::Int64);
            let num_pixels = flat.numel() as f64;
            ensure!(num_pixels > 0.0, "cannot equalise an empty image");

            let cdf = flat
                .bincount::<Tensor>(None, 256)
                .cumsum(0, Kind::Float);
            let cdf_min = f64::from(&cdf.masked_select(&cdf.gt(0.0)).min());

            // a constant image has nothing to spread
            if num_pixels - cdf_min < 1.0 {
                return Ok(image.shallow_clone());
            }

            let lut = ((cdf - cdf_min) / (num_pixels - cdf_min) * 255.0)
                .round()
                .clamp(0.0, 255.0)
                .to_kind(Kind::Uint8);
            Ok(lut.index_select(0, &flat).view(size.as_slice()))
        })
    }
}
