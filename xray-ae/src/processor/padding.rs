use crate::common::*;

/// Centres a `[C, h, w]` float image on a zero canvas of the target size.
///
/// The returned mask is `[1, H, W]`, one where the pixel comes from the
/// image and zero on the padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Padding {
    pub height: usize,
    pub width: usize,
}

impl Padding {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn forward(&self, image: &Tensor) -> Result<(Tensor, Tensor)> {
        tch::no_grad(|| {
            let (channels, height, width) = image.size3()?;
            let (canvas_h, canvas_w) = (self.height as i64, self.width as i64);
            ensure!(
                height <= canvas_h && width <= canvas_w,
                "the image size {}x{} exceeds the padding size {}x{}",
                height,
                width,
                canvas_h,
                canvas_w
            );

            let top = (canvas_h - height) / 2;
            let left = (canvas_w - width) / 2;
            let options = (Kind::Float, image.device());

            let canvas = Tensor::zeros(&[channels, canvas_h, canvas_w], options);
            canvas
                .narrow(1, top, height)
                .narrow(2, left, width)
                .copy_(&image.to_kind(Kind::Float));

            let mask = Tensor::zeros(&[1, canvas_h, canvas_w], options);
            let _ = mask.narrow(1, top, height).narrow(2, left, width).fill_(1.0);

            Ok((canvas, mask))
        })
    }
}
