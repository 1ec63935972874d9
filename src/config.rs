use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::export::ExportOptions;
use crate::guardrail::{self, Limits};
use crate::ingest::ReadOptions;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub limits: LimitsConfig,
    pub file_loading: FileLoadingConfig,
    pub display: DisplayConfig,
    pub export: ExportConfig,
    pub transfer: TransferConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_files: usize,
    pub max_rows: usize,
    pub warn_cells: usize,
    pub max_cells: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub try_parse_dates: Option<bool>,
    pub excel_sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows of the result printed after an operation.
    pub preview_rows: usize,
    /// Rows printed after each join step when debugging.
    pub step_preview_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub csv_delimiter: u8,
    pub include_header: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Defaults to `<data dir>/datablend/transfers`.
    pub store_dir: Option<PathBuf>,
    pub source_app: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    /// tracing EnvFilter directive, e.g. "datablend=trace".
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            limits: LimitsConfig::default(),
            file_loading: FileLoadingConfig::default(),
            display: DisplayConfig::default(),
            export: ExportConfig::default(),
            transfer: TransferConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_files: guardrail::DEFAULT_MAX_FILES,
            max_rows: guardrail::DEFAULT_MAX_ROWS,
            warn_cells: guardrail::DEFAULT_WARN_CELLS,
            max_cells: guardrail::DEFAULT_MAX_CELLS,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview_rows: 50,
            step_preview_rows: 5,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            include_header: true,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            source_app: crate::APP_NAME.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_from(&ConfigManager::new(app_name)?)
    }

    /// Same as [`AppConfig::load`] with an explicit config directory.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(manager)?);
        config.validate()?;
        Ok(config)
    }

    fn load_user_config(manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.limits.merge(other.limits);
        self.file_loading.merge(other.file_loading);
        self.display.merge(other.display);
        self.export.merge(other.export);
        self.transfer.merge(other.transfer);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        let limits = &self.limits;
        if limits.max_files == 0 || limits.max_rows == 0 {
            return Err(eyre!("max_files and max_rows must be greater than 0"));
        }
        if limits.max_cells == 0 {
            return Err(eyre!("max_cells must be greater than 0"));
        }
        if limits.warn_cells > limits.max_cells {
            return Err(eyre!(
                "warn_cells ({}) must not exceed max_cells ({})",
                limits.warn_cells,
                limits.max_cells
            ));
        }

        if matches!(self.export.csv_delimiter, b'\n' | b'\r' | b'"') {
            return Err(eyre!("csv_delimiter cannot be a newline or quote character"));
        }
        if matches!(self.file_loading.delimiter, Some(b'\n' | b'\r' | b'"')) {
            return Err(eyre!("delimiter cannot be a newline or quote character"));
        }

        if self.transfer.source_app.trim().is_empty() {
            return Err(eyre!("transfer.source_app must not be empty"));
        }

        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_files: self.limits.max_files,
            max_rows: self.limits.max_rows,
            warn_cells: self.limits.warn_cells,
            max_cells: self.limits.max_cells,
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        let defaults = ReadOptions::default();
        let fl = &self.file_loading;
        ReadOptions {
            delimiter: fl.delimiter.unwrap_or(defaults.delimiter),
            has_header: fl.has_header.unwrap_or(defaults.has_header),
            try_parse_dates: fl.try_parse_dates.unwrap_or(defaults.try_parse_dates),
            excel_sheet: fl.excel_sheet.clone(),
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            csv_delimiter: self.export.csv_delimiter,
            include_header: self.export.include_header,
            compression: None,
        }
    }
}

impl LimitsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LimitsConfig::default();
        if other.max_files != default.max_files {
            self.max_files = other.max_files;
        }
        if other.max_rows != default.max_rows {
            self.max_rows = other.max_rows;
        }
        if other.warn_cells != default.warn_cells {
            self.warn_cells = other.warn_cells;
        }
        if other.max_cells != default.max_cells {
            self.max_cells = other.max_cells;
        }
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.try_parse_dates.is_some() {
            self.try_parse_dates = other.try_parse_dates;
        }
        if other.excel_sheet.is_some() {
            self.excel_sheet = other.excel_sheet;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.preview_rows != default.preview_rows {
            self.preview_rows = other.preview_rows;
        }
        if other.step_preview_rows != default.step_preview_rows {
            self.step_preview_rows = other.step_preview_rows;
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ExportConfig::default();
        if other.csv_delimiter != default.csv_delimiter {
            self.csv_delimiter = other.csv_delimiter;
        }
        if other.include_header != default.include_header {
            self.include_header = other.include_header;
        }
    }
}

impl TransferConfig {
    pub fn merge(&mut self, other: Self) {
        let default = TransferConfig::default();
        if other.store_dir.is_some() {
            self.store_dir = other.store_dir;
        }
        if other.source_app != default.source_app {
            self.source_app = other.source_app;
        }
    }

    /// Configured store directory, or the per-user data directory.
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| eyre!("Could not determine data directory"))?
                .join(crate::APP_NAME)
                .join("transfers")),
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
        if other.log_filter.is_some() {
            self.log_filter = other.log_filter;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
