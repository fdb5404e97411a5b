use anyhow::Result;
use std::{fs, path::Path, sync::Arc};
use tch::{vision, Device, Kind, Tensor};
use train::config::Config;

/// Writes `num_patients` patients with one study of two images each.
/// Every fourth patient is abnormal.
fn write_dataset(dir: &Path, num_patients: usize) -> Result<()> {
    for patient in 0..num_patients {
        let label = if patient % 4 == 0 { "positive" } else { "negative" };
        let study_dir = dir
            .join(format!("patient{:05}", patient))
            .join(format!("study1_{}", label));
        fs::create_dir_all(&study_dir)?;

        for index in 0..2 {
            let (height, width) = if index == 0 { (40, 24) } else { (24, 40) };
            let image = (Tensor::rand(&[1, height, width], (Kind::Float, Device::Cpu)) * 255.0)
                .to_kind(Kind::Uint8);
            vision::image::save(&image, study_dir.join(format!("image{}.png", index)))?;
        }
    }
    Ok(())
}

fn make_config(root: &Path) -> Result<Config> {
    let text = format!(
        r#"{{
    model: {{
        kind: "Baseline",
        encoder: {{
            in_channels: [1, 4],
            out_channels: [4, 8],
            kernel_sizes: [3, 3],
            strides: [1, 1],
        }},
        decoder: {{
            in_channels: [8, 4],
            out_channels: [4, 1],
            kernel_sizes: [3, 3],
            strides: [1, 1],
        }},
        final_activation: "logistic",
    }},
    dataset: {{
        dir: {dataset:?},
        splitter: {{ val_fraction: 0.25, test_fraction: 0.25, seed: 7 }},
    }},
    preprocessor: {{ image_size: [32, 32] }},
    training: {{
        batch_size: 4,
        num_epochs: 2,
        device: "cpu",
        save_checkpoint: true,
        models_dir: {models:?},
    }},
    logging: {{ dir: {logs:?}, enable_images: true }},
}}"#,
        dataset = root.join("data"),
        models = root.join("models"),
        logs = root.join("logs"),
    );
    let config: Config = json5::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

#[tokio::test(flavor = "multi_thread")]
async fn train_and_evaluate_tiny_autoencoder() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_dataset(&dir.path().join("data"), 16)?;
    let config = Arc::new(make_config(dir.path())?);

    let report = train::start(config).await?;

    assert_eq!(report.model, "BaselineAutoencoder");
    assert_eq!(report.params["image_resolution"], "32x32");
    assert!(report.model_file.is_file());
    assert_eq!(
        report.model_file,
        dir.path().join("models").join("BaselineAutoencoder.ot")
    );

    let names: Vec<_> = report.validation.keys().map(|name| name.as_str()).collect();
    assert_eq!(
        names,
        ["roc-auc", "mse", "f1-score", "optimal mse threshold"]
    );
    assert!(report.validation.values().all(|value| value.is_finite()));
    // the test split is scored with the validation threshold
    assert_eq!(
        report.test["optimal mse threshold"],
        report.validation["optimal mse threshold"]
    );

    // one timestamped run directory with its outputs
    let run_dirs: Vec<_> = fs::read_dir(dir.path().join("logs"))?.collect::<Result<_, _>>()?;
    assert_eq!(run_dirs.len(), 1);
    let run_dir = run_dirs[0].path();
    assert!(run_dir.join("config.json5").is_file());
    assert!(run_dir.join("metrics.json").is_file());
    assert_eq!(fs::read_dir(run_dir.join("checkpoints"))?.count(), 2);
    assert_eq!(fs::read_dir(run_dir.join("events"))?.count(), 1);

    Ok(())
}
