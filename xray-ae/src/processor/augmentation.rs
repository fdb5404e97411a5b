use crate::common::*;

/// Random flips and rotation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationInit {
    /// The probability of a horizontal flip.
    pub horizontal_flip_prob: R64,
    /// The probability of a vertical flip.
    pub vertical_flip_prob: R64,
    /// The probability of a rotation.
    pub rotation_prob: R64,
    /// Rotation angles are drawn uniformly from `[-max, max]` degrees.
    pub max_rotation_degrees: R64,
}

impl Default for AugmentationInit {
    fn default() -> Self {
        Self {
            horizontal_flip_prob: r64(0.5),
            vertical_flip_prob: r64(0.5),
            rotation_prob: r64(0.5),
            max_rotation_degrees: r64(20.0),
        }
    }
}

impl AugmentationInit {
    pub fn build(&self) -> Result<Augmentation> {
        let Self {
            horizontal_flip_prob,
            vertical_flip_prob,
            rotation_prob,
            max_rotation_degrees,
        } = *self;

        for (name, prob) in [
            ("horizontal_flip_prob", horizontal_flip_prob),
            ("vertical_flip_prob", vertical_flip_prob),
            ("rotation_prob", rotation_prob),
        ] {
            ensure!(
                (0.0..=1.0).contains(&prob.raw()),
                "{} must be in range [0, 1], but get {}",
                name,
                prob
            );
        }
        ensure!(
            (0.0..180.0).contains(&max_rotation_degrees.raw()),
            "max_rotation_degrees must be in range [0, 180), but get {}",
            max_rotation_degrees
        );

        Ok(Augmentation {
            horizontal_flip_prob: horizontal_flip_prob.raw(),
            vertical_flip_prob: vertical_flip_prob.raw(),
            rotation_prob: rotation_prob.raw(),
            max_rotation_radians: max_rotation_degrees.raw().to_radians(),
        })
    }
}

/// Random flips followed by a random rotation that enlarges the canvas to
/// keep every corner of the source image.
#[derive(Debug, Clone)]
pub struct Augmentation {
    horizontal_flip_prob: f64,
    vertical_flip_prob: f64,
    rotation_prob: f64,
    max_rotation_radians: f64,
}

impl Augmentation {
    /// Augments a `[C, H, W]` float image.
    pub fn forward<R>(&self, image: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng,
    {
        tch::no_grad(|| {
            let _ = image.size3()?;
            ensure!(
                image.kind() == Kind::Float,
                "expect a float image, but get {:?}",
                image.kind()
            );

            let image = if rng.gen_bool(self.horizontal_flip_prob) {
                image.flip(&[2])
            } else {
                image.shallow_clone()
            };
            let image = if rng.gen_bool(self.vertical_flip_prob) {
                image.flip(&[1])
            } else {
                image
            };
            let image = if self.max_rotation_radians > 0.0 && rng.gen_bool(self.rotation_prob) {
                let angle =
                    rng.gen_range((-self.max_rotation_radians)..=self.max_rotation_radians);
                rotate_fit_output(&image, angle)?
            } else {
                image
            };

            Ok(image)
        })
    }
}

/// Rotates a `[C, H, W]` float image about its centre.
///
/// The output canvas is enlarged to hold the whole rotated image. Uncovered
/// pixels are zero and sampling is bilinear.
pub fn rotate_fit_output(image: &Tensor, radians: f64) -> Result<Tensor> {
    tch::no_grad(|| {
        let (channels, height, width) = image.size3()?;
        let (h, w) = (height as f64, width as f64);
        let (sin, cos) = radians.sin_cos();

        // tolerate rounding noise at right angles
        let new_h = (h * cos.abs() + w * sin.abs() - 1e-6).ceil().max(1.0);
        let new_w = (w * cos.abs() + h * sin.abs() - 1e-6).ceil().max(1.0);

        // maps normalized output coordinates to normalized input coordinates
        let theta = Tensor::of_slice(&[
            (cos * new_w / w) as f32,
            (sin * new_h / w) as f32,
            0.0,
            (-sin * new_w / h) as f32,
            (cos * new_h / h) as f32,
            0.0,
        ])
        .view([1, 2, 3])
        .to_device(image.device());

        let (new_h, new_w) = (new_h as i64, new_w as i64);
        let grid =
            Tensor::affine_grid_generator(&theta, &[1, channels, new_h, new_w], false);
        let rotated = image
            .view([1, channels, height, width])
            .grid_sampler(&grid, 0, 0, false)
            .view([channels, new_h, new_w]);
        Ok(rotated)
    })
}
