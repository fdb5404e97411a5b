use crate::common::*;

/// An image file with its patient, study and label, without pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub patient: String,
    pub study: String,
    /// Whether the study is abnormal.
    pub abnormal: bool,
}

impl FileRecord {
    /// The binary label, 1 for abnormal and 0 for normal.
    pub fn label(&self) -> i64 {
        self.abnormal as i64
    }
}

/// A preprocessed image with its validity mask.
#[derive(Debug, TensorLike)]
pub struct ImageSample {
    /// The `[1, H, W]` image in `[0, 1]`.
    pub image: Tensor,
    /// The `[1, H, W]` validity mask.
    pub mask: Tensor,
    #[tensor_like(copy)]
    pub label: i64,
    #[tensor_like(clone)]
    pub path: PathBuf,
    #[tensor_like(clone)]
    pub patient: String,
}

/// A stack of image samples.
#[derive(Debug, TensorLike)]
pub struct Batch {
    /// The `[B, 1, H, W]` images.
    pub image: Tensor,
    /// The `[B, 1, H, W]` validity masks.
    pub mask: Tensor,
    /// The `[B]` int64 labels.
    pub labels: Tensor,
    #[tensor_like(clone)]
    pub paths: Vec<PathBuf>,
}

impl Batch {
    pub fn from_samples(samples: Vec<ImageSample>) -> Result<Self> {
        ensure!(!samples.is_empty(), "cannot build a batch from zero samples");

        let (images, masks, labels, paths) = samples.into_iter().fold(
            (vec![], vec![], vec![], vec![]),
            |(mut images, mut masks, mut labels, mut paths), sample| {
                let ImageSample {
                    image,
                    mask,
                    label,
                    path,
                    ..
                } = sample;
                images.push(image);
                masks.push(mask);
                labels.push(label);
                paths.push(path);
                (images, masks, labels, paths)
            },
        );

        let image = Tensor::f_stack(&images, 0)?;
        let mask = Tensor::f_stack(&masks, 0)?;
        let labels = Tensor::of_slice(&labels);

        Ok(Self {
            image,
            mask,
            labels,
            paths,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
