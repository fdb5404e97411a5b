use super::{
    Augmentation, AugmentationInit, GrayScale, HistEqualisation, MinMaxNormalization, Padding,
    Resize,
};
use crate::common::*;

/// The per-image preprocessing options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorInit {
    /// The `[height, width]` of produced images.
    pub image_size: [usize; 2],
    pub hist_equalisation: bool,
    /// Disables augmentation if `None`.
    pub augmentation: Option<AugmentationInit>,
}

impl Default for PreprocessorInit {
    fn default() -> Self {
        Self {
            image_size: [512, 512],
            hist_equalisation: false,
            augmentation: Some(Default::default()),
        }
    }
}

impl PreprocessorInit {
    pub fn build(&self) -> Result<Preprocessor> {
        let Self {
            image_size: [height, width],
            hist_equalisation,
            ref augmentation,
        } = *self;

        let augmentation = augmentation.as_ref().map(|init| init.build()).transpose()?;

        Ok(Preprocessor {
            gray_scale: GrayScale,
            hist_equalisation: hist_equalisation.then(|| HistEqualisation),
            augmentation,
            resize: Resize::new(height, width)?,
            padding: Padding::new(height, width),
            min_max: MinMaxNormalization,
        })
    }
}

/// Turns a decoded image into a normalized `[1, H, W]` image and its
/// validity mask.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    gray_scale: GrayScale,
    hist_equalisation: Option<HistEqualisation>,
    augmentation: Option<Augmentation>,
    resize: Resize,
    padding: Padding,
    min_max: MinMaxNormalization,
}

impl Preprocessor {
    /// The `[height, width]` of produced images.
    pub fn image_size(&self) -> [usize; 2] {
        [self.padding.height, self.padding.width]
    }

    /// Processes a `[C, H, W]` uint8 image, returning `(image, mask)`.
    pub fn forward<R>(&self, image: &Tensor, rng: &mut R) -> Result<(Tensor, Tensor)>
    where
        R: Rng,
    {
        let image = self.gray_scale.forward(image)?;
        let image = match &self.hist_equalisation {
            Some(hist_eq) => hist_eq.forward(&image)?,
            None => image,
        };
        let image = image.to_kind(Kind::Float);
        let image = match &self.augmentation {
            Some(augmentation) => augmentation.forward(&image, rng)?,
            None => image,
        };
        let image = self.resize.forward(&image)?;
        let (image, mask) = self.padding.forward(&image)?;
        let image = self.min_max.forward(&image)?;
        Ok((image, mask))
    }

    /// Loads an image file and processes it.
    pub fn load<P, R>(&self, path: P, rng: &mut R) -> Result<(Tensor, Tensor)>
    where
        P: AsRef<Path>,
        R: Rng,
    {
        let path = path.as_ref();
        let image = vision::image::load(path)
            .with_context(|| format!("failed to load image file '{}'", path.display()))?;
        self.forward(&image, rng)
            .with_context(|| format!("failed to preprocess image file '{}'", path.display()))
    }
}
