use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".OccurrenceDesk";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_REPORT_TIME: &str = "23:30";
pub const API_URL_ENV: &str = "OCCURRENCE_DESK_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_timeout_seconds: u64,
    pub report_time: String,
    pub report_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub pdf_ttl_seconds: u64,
    pub catalog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let documents = default_documents_dir();

        Self {
            api_base_url: "http://localhost:3333".to_string(),
            api_timeout_seconds: 20,
            report_time: DEFAULT_REPORT_TIME.to_string(),
            report_dir: documents.join("reports"),
            pdf_dir: documents.join("pdf"),
            pdf_ttl_seconds: 600,
            catalog_path: None,
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load()
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    /// Base URL of the reporting backend. The environment wins over the file.
    pub fn resolved_api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub fn parse_report_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.report_time)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let normalized = normalize_config_key(key);

        match normalized {
            "api_base_url" => {
                let trimmed = value.trim().trim_end_matches('/');
                url::Url::parse(trimmed)
                    .with_context(|| format!("api_base_url must be a valid URL: {value}"))?;
                self.api_base_url = trimmed.to_string();
            }
            "api_timeout_seconds" => {
                self.api_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("api_timeout_seconds must be a number"))?
                    .max(5);
            }
            "report_time" => {
                parse_hhmm(value)?;
                self.report_time = value.to_string();
            }
            "report_dir" => {
                self.report_dir = expand_home(value);
            }
            "pdf_dir" => {
                self.pdf_dir = expand_home(value);
            }
            "pdf_ttl_seconds" => {
                self.pdf_ttl_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("pdf_ttl_seconds must be a number"))?;
            }
            "catalog_path" => {
                self.catalog_path = (!value.trim().is_empty()).then(|| expand_home(value.trim()));
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: api_base_url|api.base_url, api_timeout_seconds|api.timeout_seconds, report_time|report.time, report_dir|report.dir, pdf_dir|pdf.dir, pdf_ttl_seconds|pdf.ttl_seconds, catalog_path|catalog.path"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "api_base_url" => Some(self.api_base_url.clone()),
            "api_timeout_seconds" => Some(self.api_timeout_seconds.to_string()),
            "report_time" => Some(self.report_time.clone()),
            "report_dir" => Some(self.report_dir.display().to_string()),
            "pdf_dir" => Some(self.pdf_dir.display().to_string()),
            "pdf_ttl_seconds" => Some(self.pdf_ttl_seconds.to_string()),
            "catalog_path" => Some(
                self.catalog_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "bundled".to_string()),
            ),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "api_base_url" | "api.base_url" => "api_base_url",
        "api_timeout_seconds" | "api.timeout_seconds" => "api_timeout_seconds",
        "report_time" | "report.time" => "report_time",
        "report_dir" | "report.dir" => "report_dir",
        "pdf_dir" | "pdf.dir" => "pdf_dir",
        "pdf_ttl_seconds" | "pdf.ttl_seconds" => "pdf_ttl_seconds",
        "catalog_path" | "catalog.path" => "catalog_path",
        _ => key,
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 23:30 (24-hour format)",))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_documents_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("OccurrenceDesk")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
