use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::task::JoinSet;

use super::{IngestError, ReaderOptions, read_bank_records, read_system_transactions};
use crate::{BankRecord, DateRange, Result, SystemTransaction};

/// Bank name for a statement file: the file name without extension, upper-cased.
pub fn source_label_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::NotFound {
        path: path.to_owned(),
        source,
    })
}

/// Every `*.csv` file directly inside `dir`, sorted by name.
pub fn bank_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let pattern = format!("{}/*.csv", glob::Pattern::escape(&dir.to_string_lossy()));
    let files = glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(dir = %dir.display(), files = files.len(), "found bank statements");
    Ok(files)
}

/// Check that every listed statement file exists.
pub fn existing_bank_files(
    paths: impl IntoIterator<Item = PathBuf>,
) -> Result<Vec<PathBuf>, IngestError> {
    paths
        .into_iter()
        .map(|path| match std::fs::metadata(&path) {
            Ok(_) => Ok(path),
            Err(source) => Err(IngestError::NotFound { path, source }),
        })
        .collect()
}

/// Turn the `--bank` argument into a list of statement files.
///
/// A directory contributes every `*.csv` file directly inside it. Anything else is
/// treated as a comma separated list of files which must all exist.
pub fn resolve_bank_sources(spec: &str) -> Result<Vec<PathBuf>, IngestError> {
    let path = Path::new(spec);
    if path.is_dir() {
        return bank_files_in_dir(path);
    }

    existing_bank_files(spec.split(',').map(str::trim).map(PathBuf::from))
}

/// Read the system transactions file, skipping its header row.
pub fn load_system_transactions(
    path: &Path,
    date_range: Option<DateRange>,
) -> Result<Vec<SystemTransaction>> {
    let options = ReaderOptions {
        date_range,
        ..Default::default()
    };
    let transactions = open(path)
        .and_then(|file| read_system_transactions(file, &options))
        .with_context(|| format!("Failed to read system transactions from {}", path.display()))?;

    tracing::debug!(file = %path.display(), count = transactions.len(), "read system transactions");
    Ok(transactions)
}

fn load_bank_file(path: &Path, date_range: Option<DateRange>) -> Result<Vec<BankRecord>> {
    let options = ReaderOptions {
        date_range,
        source_label: Some(source_label_for(path)),
        ..Default::default()
    };
    let records = open(path)
        .and_then(|file| read_bank_records(file, &options))
        .with_context(|| format!("Failed to read bank statements from {}", path.display()))?;

    tracing::debug!(file = %path.display(), count = records.len(), "read bank statements");
    Ok(records)
}

/// Read all bank statement files in parallel.
///
/// The first failing file aborts the whole load. Records are concatenated in the order
/// the paths were given, regardless of which file finished reading first.
pub async fn load_bank_records(
    paths: &[PathBuf],
    date_range: Option<DateRange>,
) -> Result<Vec<BankRecord>> {
    let mut tasks = JoinSet::new();
    for (index, path) in paths.iter().cloned().enumerate() {
        tasks.spawn_blocking(move || (index, load_bank_file(&path, date_range)));
    }

    let mut per_source = vec![Vec::new(); paths.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, records) = joined.context("Bank statement reader panicked")?;
        per_source[index] = records?;
    }

    Ok(per_source.into_iter().flatten().collect())
}
