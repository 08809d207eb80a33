use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where bank statements come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankSource {
    /// Every `*.csv` file in the directory.
    Directory(PathBuf),
    Files(Vec<PathBuf>),
}

impl BankSource {
    fn relative_to(self, base_dir: &Path) -> Self {
        match self {
            BankSource::Directory(dir) => BankSource::Directory(base_dir.join(dir)),
            BankSource::Files(files) => {
                BankSource::Files(files.into_iter().map(|file| base_dir.join(file)).collect())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "RawConfigBank")]
pub struct ConfigBank(pub BankSource);

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfigBank {
    dir: Option<PathBuf>,
    #[serde(default)]
    files: Vec<PathBuf>,
}

impl TryFrom<RawConfigBank> for ConfigBank {
    type Error = String;

    fn try_from(raw: RawConfigBank) -> Result<Self, Self::Error> {
        match (raw.dir, raw.files.is_empty()) {
            (Some(dir), true) => Ok(ConfigBank(BankSource::Directory(dir))),
            (None, false) => Ok(ConfigBank(BankSource::Files(raw.files))),
            (None, true) => {
                Err("bank section must have either 'dir' or 'files' specified".to_string())
            }
            (Some(_), false) => {
                Err("bank section cannot have both 'dir' and 'files' specified".to_string())
            }
        }
    }
}

/// Defaults for the command line, read from `bankrecon.toml`.
///
/// ```toml
/// system = "exports/system.csv"
/// output = "reports/result.json"
///
/// [bank]
/// dir = "exports/statements"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub system: Option<PathBuf>,
    pub bank: Option<ConfigBank>,
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load a config file. Relative paths inside it are resolved against its directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let base_dir = path.parent().map(ToOwned::to_owned).unwrap_or_default();

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config.relative_to(&base_dir))
    }

    pub fn find_and_load() -> Result<Option<Self>> {
        let config_locations = [Path::new("bankrecon.toml"), Path::new(".bankrecon.toml")];

        for location in config_locations {
            if location.exists() {
                tracing::debug!(file = %location.display(), "using config file");
                return Self::load_from_file(location).map(Some);
            }
        }

        Ok(None)
    }

    fn relative_to(self, base_dir: &Path) -> Self {
        Config {
            system: self.system.map(|system| base_dir.join(system)),
            bank: self
                .bank
                .map(|ConfigBank(source)| ConfigBank(source.relative_to(base_dir))),
            output: self.output.map(|output| base_dir.join(output)),
        }
    }
}
