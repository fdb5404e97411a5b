use crate::common::*;

/// Scales a `[C, H, W]` float image to fit inside the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resize {
    pub height: usize,
    pub width: usize,
}

impl Resize {
    pub fn new(height: usize, width: usize) -> Result<Self> {
        ensure!(
            height > 0 && width > 0,
            "the target size must be positive, but get {}x{}",
            height,
            width
        );
        Ok(Self { height, width })
    }

    /// The content size after fitting `(height, width)` into the target
    /// while keeping the aspect ratio.
    pub fn fitted_size(&self, height: i64, width: i64) -> [i64; 2] {
        let scale_h = self.height as f64 / height as f64;
        let scale_w = self.width as f64 / width as f64;

        if scale_h <= scale_w {
            let new_w = (width as f64 * scale_h) as i64;
            [self.height as i64, new_w.clamp(1, self.width as i64)]
        } else {
            let new_h = (height as f64 * scale_w) as i64;
            [new_h.clamp(1, self.height as i64), self.width as i64]
        }
    }

    pub fn forward(&self, image: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| {
            let (channels, height, width) = image.size3()?;
            ensure!(
                height > 0 && width > 0,
                "cannot resize an empty image"
            );
            let [new_h, new_w] = self.fitted_size(height, width);

            if [new_h, new_w] == [height, width] {
                return Ok(image.shallow_clone());
            }

            let resized = image
                .view([1, channels, height, width])
                .upsample_bilinear2d(&[new_h, new_w], false, None, None)
                .view([channels, new_h, new_w]);
            Ok(resized)
        })
    }
}
