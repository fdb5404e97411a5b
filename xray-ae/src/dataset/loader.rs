use super::{Batch, FileRecord, ImageSample};
use crate::{common::*, processor::Preprocessor};

/// A set of image files paired with the preprocessing applied on loading.
#[derive(Debug, Clone)]
pub struct MuraDataset {
    records: Arc<Vec<FileRecord>>,
    preprocessor: Arc<Preprocessor>,
}

impl MuraDataset {
    pub fn new(records: Vec<FileRecord>, preprocessor: Arc<Preprocessor>) -> Self {
        Self {
            records: Arc::new(records),
            preprocessor,
        }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_batches(&self, batch_size: usize) -> usize {
        (self.len() + batch_size - 1) / batch_size.max(1)
    }

    /// Loads and preprocesses one image on the calling thread.
    pub fn sample(&self, index: usize) -> Result<ImageSample> {
        let record = self
            .records
            .get(index)
            .ok_or_else(|| format_err!("sample index {} is out of bound", index))?;
        load_sample(record, &self.preprocessor, &mut StdRng::from_entropy())
    }

    /// Streams batches of preprocessed images.
    ///
    /// Images are decoded and preprocessed in parallel on blocking threads
    /// and the batches keep the visiting order. The order is shuffled if a
    /// random generator is given. The last batch may be smaller.
    pub fn batches(
        &self,
        batch_size: usize,
        shuffle: Option<&mut StdRng>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Batch>> + Send>>> {
        ensure!(batch_size > 0, "batch_size must be positive");

        let mut order: Vec<usize> = (0..self.len()).collect();
        if let Some(rng) = shuffle {
            order.shuffle(rng);
        }

        let records = self.records.clone();
        let preprocessor = self.preprocessor.clone();

        let stream = stream::iter(order)
            .par_map(None, move |index| {
                let records = records.clone();
                let preprocessor = preprocessor.clone();

                move || {
                    let mut rng = StdRng::from_entropy();
                    load_sample(&records[index], &preprocessor, &mut rng)
                }
            })
            .chunks(batch_size)
            .map(|results| -> Result<_> {
                let samples: Vec<_> = results.into_iter().try_collect()?;
                Batch::from_samples(samples)
            });

        Ok(Box::pin(stream))
    }
}

fn load_sample(
    record: &FileRecord,
    preprocessor: &Preprocessor,
    rng: &mut StdRng,
) -> Result<ImageSample> {
    let FileRecord {
        ref path,
        ref patient,
        ..
    } = *record;
    let (image, mask) = preprocessor.load(path, rng)?;

    Ok(ImageSample {
        image,
        mask,
        label: record.label(),
        path: path.clone(),
        patient: patient.clone(),
    })
}
