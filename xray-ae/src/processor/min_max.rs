use crate::common::*;

/// Scales a float image to `[0, 1]`. Constant images map to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MinMaxNormalization;

impl MinMaxNormalization {
    pub fn forward(&self, image: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| {
            ensure!(image.numel() > 0, "cannot normalize an empty image");
            let image = image.to_kind(Kind::Float);
            let min = f64::from(&image.min());
            let max = f64::from(&image.max());

            if max - min <= f64::EPSILON {
                return Ok(image.zeros_like());
            }
            Ok((image - min) / (max - min))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalize_range() -> Result<()> {
        let image = Tensor::of_slice(&[50f32, 100.0, 150.0]).view([1, 1, 3]);
        let normalized = Vec::<f32>::from(&MinMaxNormalization.forward(&image)?.view([-1]));
        assert_abs_diff_eq!(normalized[0], 0.0);
        assert_abs_diff_eq!(normalized[1], 0.5);
        assert_abs_diff_eq!(normalized[2], 1.0);

        let constant = Tensor::full(&[1, 2, 2], 3.0, FLOAT_CPU);
        let normalized = MinMaxNormalization.forward(&constant)?;
        assert_eq!(f64::from(&normalized.abs().sum(Kind::Float)), 0.0);
        Ok(())
    }
}
