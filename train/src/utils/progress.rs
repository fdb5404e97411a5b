use crate::common::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar for a pass over `num_batches` batches.
pub fn batch_progress_bar(desc: &str, num_batches: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(num_batches as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{prefix:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?
        .progress_chars("##-"),
    );
    bar.set_prefix(desc.to_owned());
    Ok(bar)
}
