use anyhow::Result;
use futures::stream::TryStreamExt as _;
use noisy_float::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::{fs, path::Path, sync::Arc};
use tch::{vision, Device, Kind, Tensor};
use xray_ae::{
    dataset::{discover_records, DatasetSplit, MuraDataset, TrainValTestSplitter},
    processor::PreprocessorInit,
};

/// Writes `num_patients` patients with one study of two images each.
fn write_fixture(dir: &Path, num_patients: usize) -> Result<()> {
    for patient in 0..num_patients {
        let label = if patient % 3 == 0 { "positive" } else { "negative" };
        let study_dir = dir
            .join(format!("patient{:05}", patient))
            .join(format!("study1_{}", label));
        fs::create_dir_all(&study_dir)?;

        for index in 0..2 {
            let (height, width) = if index == 0 { (20, 12) } else { (12, 20) };
            let image = (Tensor::rand(&[3, height, width], (Kind::Float, Device::Cpu)) * 255.0)
                .to_kind(Kind::Uint8);
            vision::image::save(&image, study_dir.join(format!("image{}.png", index)))?;
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn load_batches_from_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path(), 12)?;

    let records = discover_records(dir.path())?;
    assert_eq!(records.len(), 24);

    let splitter = TrainValTestSplitter {
        val_fraction: r64(0.25),
        test_fraction: r64(0.25),
        seed: 1,
    };
    let DatasetSplit {
        train,
        validation,
        test,
    } = splitter.split(records)?;
    assert!(train.iter().all(|record| !record.abnormal));
    assert_eq!(train.len() + validation.len() + test.len(), 24);

    let preprocessor = Arc::new(
        PreprocessorInit {
            image_size: [16, 16],
            ..Default::default()
        }
        .build()?,
    );
    let dataset = MuraDataset::new(validation, preprocessor);
    let num_samples = dataset.len();

    let mut rng = StdRng::seed_from_u64(0);
    let batches: Vec<_> = dataset.batches(3, Some(&mut rng))?.try_collect().await?;
    assert_eq!(batches.len(), dataset.num_batches(3));

    let total: usize = batches.iter().map(|batch| batch.len()).sum();
    assert_eq!(total, num_samples);

    for batch in &batches {
        let batch_size = batch.len() as i64;
        assert_eq!(batch.image.size(), vec![batch_size, 1, 16, 16]);
        assert_eq!(batch.mask.size(), vec![batch_size, 1, 16, 16]);
        assert_eq!(batch.labels.size(), vec![batch_size]);
        assert!(f64::from(&batch.image.max()) <= 1.0);
        assert!(f64::from(&batch.image.min()) >= 0.0);
    }
    Ok(())
}

#[test]
fn load_single_sample() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path(), 1)?;
    let records = discover_records(dir.path())?;

    let preprocessor = Arc::new(
        PreprocessorInit {
            image_size: [16, 16],
            augmentation: None,
            ..Default::default()
        }
        .build()?,
    );
    let dataset = MuraDataset::new(records, preprocessor);
    let sample = dataset.sample(0)?;
    assert_eq!(sample.label, 1);
    assert_eq!(sample.image.size(), vec![1, 16, 16]);

    // a 20x12 image fits as 16x9 without augmentation
    assert_eq!(f64::from(&sample.mask.sum(Kind::Float)), (16 * 9) as f64);
    assert!(dataset.sample(5).is_err());
    Ok(())
}
