use super::FileRecord;
use crate::common::*;
use regex::Regex;

static STUDY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<study>study\d+)_(?P<label>positive|negative)$").unwrap());

/// Finds the images of a MURA-style directory tree.
///
/// The expected layout is
/// `<dir>/<patient>/<study>_<positive|negative>/<image>.png`. Records are
/// sorted by path.
pub fn discover_records<P>(dir: P) -> Result<Vec<FileRecord>>
where
    P: AsRef<Path>,
{
    let dir = dir.as_ref();
    ensure!(
        dir.is_dir(),
        "the dataset directory '{}' does not exist",
        dir.display()
    );

    let pattern = dir.join("*").join("*").join("*.png");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format_err!("non-UTF-8 dataset path '{}'", dir.display()))?;

    let mut records: Vec<_> = glob::glob(pattern)?
        .map(|path| -> Result<_> {
            let path = path?;
            parse_record(path)
        })
        .filter_map(|result| result.transpose())
        .try_collect()?;
    records.sort();

    ensure!(
        !records.is_empty(),
        "no images found in dataset directory '{}'",
        dir.display()
    );
    debug!("found {} images in '{}'", records.len(), dir.display());

    Ok(records)
}

/// Builds a record from an image path, or returns `None` if the study
/// directory name does not follow the naming convention.
fn parse_record(path: PathBuf) -> Result<Option<FileRecord>> {
    let study_dir = path
        .parent()
        .ok_or_else(|| format_err!("invalid image path '{}'", path.display()))?;
    let patient_dir = study_dir
        .parent()
        .ok_or_else(|| format_err!("invalid image path '{}'", path.display()))?;

    let to_str = |component: &Path| -> Result<String> {
        let name = component
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format_err!("invalid image path '{}'", path.display()))?;
        Ok(name.to_owned())
    };
    let study_name = to_str(study_dir)?;
    let patient = to_str(patient_dir)?;

    let captures = match STUDY_REGEX.captures(&study_name) {
        Some(captures) => captures,
        None => {
            warn!("ignore image in unrecognized study directory '{}'", path.display());
            return Ok(None);
        }
    };
    let study = captures["study"].to_owned();
    let abnormal = &captures["label"] == "positive";

    Ok(Some(FileRecord {
        path,
        patient,
        study,
        abnormal,
    }))
}
