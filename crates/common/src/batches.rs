use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fragment_catalog::Batch;
use tracing::debug;

/// Monthly batch labels `YYYY-MM` from January of `from_year` through December of `to_year`.
pub fn month_range(from_year: u16, to_year: u16) -> Vec<String> {
    (from_year..=to_year).flat_map(|year| (1..=12).map(move |month| format!("{year:04}-{month:02}"))).collect()
}

/// The batch label of a log named `YYYY-MM_<id>.txt`.
pub fn batch_label(file_name: &str) -> Option<&str> {
    let (label, _) = file_name.split_once('_')?;
    let (year, month) = label.split_once('-')?;
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    (digits(year, 4) && digits(month, 2)).then_some(label)
}

/// Group logs into one batch per label of `months`, in that order.
///
/// Files within a batch are sorted by path and truncated to `max_files` if given. Labels without
/// files yield empty batches. Files whose label is not in `months` are ignored.
pub fn group_batches<I>(paths: I, months: &[String], max_files: Option<usize>) -> Vec<Batch>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut by_label: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for path in paths {
        let label = path.file_name().and_then(|name| name.to_str()).and_then(batch_label);
        if let Some(label) = label {
            by_label.entry(label.to_owned()).or_default().push(path);
        }
    }

    months
        .iter()
        .map(|label| {
            let mut files = by_label.remove(label).unwrap_or_default();
            files.sort();
            if let Some(max_files) = max_files {
                files.truncate(max_files);
            }
            debug!(batch = %label, files = files.len());
            Batch { label: label.clone(), files }
        })
        .collect()
}

/// [group_batches] over the regular files of `dir`.
pub fn discover_batches<P>(dir: P, months: &[String], max_files: Option<usize>) -> std::io::Result<Vec<Batch>>
where
    P: AsRef<Path>,
{
    let mut paths = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(group_batches(paths, months, max_files))
}
