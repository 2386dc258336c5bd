use serde::Deserialize;
use std::{fs, io, path::Path};

pub const CONFIG_ENV: &str = "NEM12_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "nem12-config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Readings allowed in flight between the parser and the sink.
    pub channel_capacity: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { channel_capacity: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub batch_size: usize,
    pub emit_create_table: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            emit_create_table: false,
        }
    }
}

/// Opt-in sanity checks. A rejected reading is dropped from the output, so a
/// run with validation on may write fewer statements than the file holds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub validation: ValidationConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Loads the file named by `NEM12_CONFIG`, falling back to
    /// `nem12-config.toml`. Only the fallback file may be absent.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path),
            Err(_) => match Self::from_file(DEFAULT_CONFIG_PATH) {
                Err(e) if is_not_found(&e) => {
                    tracing::debug!("no {DEFAULT_CONFIG_PATH}, using default configuration");
                    Ok(Self::default())
                }
                other => other,
            },
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}
