use crate::{common::*, config::LoadCheckpoint};

pub const FILE_STRFTIME: &str = "%Y-%m-%d-%H-%M-%S.%3f%z";

static CHECKPOINT_FILENAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}\.\d{3}[+-]\d{4})_\d{6}_-?\d+\.\d+\.ckpt$")
        .unwrap()
});

/// Save parameters to a checkpoint file.
pub fn save_checkpoint(
    vs: &nn::VarStore,
    checkpoint_dir: &Path,
    epoch: usize,
    loss: f64,
) -> Result<PathBuf> {
    let filename = format!(
        "{}_{:06}_{:08.5}.ckpt",
        Local::now().format(FILE_STRFTIME),
        epoch,
        loss
    );
    let path = checkpoint_dir.join(filename);
    vs.save(&path)
        .with_context(|| format!("failed to save checkpoint '{}'", path.display()))?;
    Ok(path)
}

/// Finds the checkpoint file selected by the loading method.
pub fn find_checkpoint(
    logging_dir: &Path,
    load_checkpoint: &LoadCheckpoint,
) -> Result<Option<PathBuf>> {
    let path = match load_checkpoint {
        LoadCheckpoint::Disabled => {
            info!("checkpoint loading is disabled");
            None
        }
        LoadCheckpoint::FromRecent => {
            let pattern = format!("{}/*/checkpoints/*.ckpt", logging_dir.display());
            let paths: Vec<_> = glob::glob(&pattern)?.try_collect()?;
            let checkpoint_file = paths
                .into_iter()
                .filter_map(|path| {
                    let file_name = path.file_name()?.to_str()?;
                    let captures = CHECKPOINT_FILENAME_REGEX.captures(file_name)?;
                    let datetime_str = captures.get(1)?.as_str();
                    let datetime = DateTime::parse_from_str(datetime_str, FILE_STRFTIME).ok()?;
                    Some((path, datetime))
                })
                .max_by_key(|(_path, datetime)| *datetime)
                .map(|(path, _datetime)| path);

            if checkpoint_file.is_none() {
                warn!("no checkpoint file found");
            }

            checkpoint_file
        }
        LoadCheckpoint::FromFile { file } => {
            if file.is_file() {
                Some(file.to_owned())
            } else {
                warn!("{} is not a file", file.display());
                None
            }
        }
    };

    Ok(path)
}

/// Load parameters from a diretory with specified checkpoint loading method.
pub fn try_load_checkpoint(
    vs: &mut nn::VarStore,
    logging_dir: &Path,
    load_checkpoint: &LoadCheckpoint,
) -> Result<Option<PathBuf>> {
    let path = find_checkpoint(logging_dir, load_checkpoint)?;

    if let Some(path) = &path {
        info!("load checkpoint file {}", path.display());
        vs.load_partial(path)
            .with_context(|| format!("failed to load checkpoint '{}'", path.display()))?;
    }

    Ok(path)
}

/// The path of a companion parameter file, e.g. `model.ot` to `model.discriminator.ot`.
pub fn companion_path(path: &Path, name: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, name, ext.to_string_lossy()),
        None => format!("{}.{}", stem, name),
    };
    path.with_file_name(file_name)
}
