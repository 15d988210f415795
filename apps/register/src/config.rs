//! # Register Configuration
//!
//! Configuration management for the register.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILLPOINT_DB_PATH=/srv/till/tillpoint.db                           │
//! │     TILLPOINT_TERMINAL_ID=till-2                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tillpoint/register.toml (Linux)                          │
//! │     ~/Library/Application Support/com.tillpoint.register/ (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     data dir database, generated terminal id, threshold 10             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # register.toml
//! [store]
//! name = "Corner Store"
//!
//! [currency]
//! code = "VND"
//! symbol = "₫"
//! decimals = 0
//!
//! [database]
//! path = "/var/lib/tillpoint/tillpoint.db"
//! max_connections = 5
//!
//! [terminal]
//! id = "till-1"
//! employee_id = "cashier-01"
//!
//! [reports]
//! low_stock_threshold = 10
//! ```
//!
//! Loyalty tiers and bank details are edited at runtime and live in JSON
//! settings files instead, see [`crate::settings`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tillpoint_core::Money;

// =============================================================================
// Config Error
// =============================================================================

/// Errors raised while reading or writing configuration and settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Could not write TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the platform config directory")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Platform directories for the register (config, data).
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "tillpoint", "register")
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store name (printed on receipts)
    #[serde(default = "default_store_name")]
    pub name: String,
}

fn default_store_name() -> String {
    "Tillpoint Store".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: default_store_name(),
        }
    }
}

/// How amounts are displayed. Amounts are always stored in hundredths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency code (ISO 4217)
    #[serde(default = "default_currency_code")]
    pub code: String,

    /// Currency symbol (for display)
    #[serde(default = "default_currency_symbol")]
    pub symbol: String,

    /// Decimal places shown: 0 or 2
    #[serde(default)]
    pub decimals: u8,
}

fn default_currency_code() -> String {
    "VND".to_string()
}

fn default_currency_symbol() -> String {
    "₫".to_string()
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            code: default_currency_code(),
            symbol: default_currency_symbol(),
            decimals: 0,
        }
    }
}

impl CurrencyConfig {
    /// Formats an amount for display.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let currency = CurrencyConfig::default(); // ₫, 0 decimals
    /// assert_eq!(currency.format(Money::from_major(186_000)), "186,000₫");
    /// ```
    pub fn format(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let abs = amount.abs();
        let whole = if self.decimals == 0 {
            abs.round_to_major()
        } else {
            abs.major()
        };

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if self.decimals == 0 {
            format!("{}{}{}", sign, grouped, self.symbol)
        } else {
            format!("{}{}{}.{:02}", sign, self.symbol, grouped, abs.minor_part())
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; defaults to `tillpoint.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Unique terminal identifier. Generated on first run if not provided.
    #[serde(default = "default_terminal_id")]
    pub id: String,

    /// Employee recorded on invoices created at this terminal.
    #[serde(default = "default_employee_id")]
    pub employee_id: String,

    /// Directory holding `tier_settings.json` and `payment_settings.json`.
    #[serde(default)]
    pub settings_dir: Option<PathBuf>,
}

fn default_terminal_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_employee_id() -> String {
    "admin".to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            id: default_terminal_id(),
            employee_id: default_employee_id(),
            settings_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Products below this stock level show up as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    /// Rows in the dashboard's top products/customers lists.
    #[serde(default = "default_top_n")]
    pub top_n: u32,
}

fn default_low_stock_threshold() -> i64 {
    10
}

fn default_top_n() -> u32 {
    5
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            low_stock_threshold: default_low_stock_threshold(),
            top_n: default_top_n(),
        }
    }
}

// =============================================================================
// Main Register Configuration
// =============================================================================

/// Complete register configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub currency: CurrencyConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub reports: ReportConfig,
}

impl RegisterConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (register.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading register config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load register config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Register config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.terminal.id.trim().is_empty() {
            return Err(ConfigError::Invalid("terminal id must not be empty".into()));
        }

        if self.terminal.employee_id.trim().is_empty() {
            return Err(ConfigError::Invalid("employee id must not be empty".into()));
        }

        if !matches!(self.currency.decimals, 0 | 2) {
            return Err(ConfigError::Invalid(format!(
                "currency decimals must be 0 or 2, got {}",
                self.currency.decimals
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.reports.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "low_stock_threshold must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TILLPOINT_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TILLPOINT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("TILLPOINT_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(id) = lookup("TILLPOINT_TERMINAL_ID") {
            debug!(terminal_id = %id, "Overriding terminal ID from environment");
            self.terminal.id = id;
        }

        if let Some(id) = lookup("TILLPOINT_EMPLOYEE_ID") {
            self.terminal.employee_id = id;
        }

        if let Some(dir) = lookup("TILLPOINT_SETTINGS_DIR") {
            self.terminal.settings_dir = Some(PathBuf::from(dir));
        }

        if let Some(threshold) = lookup("TILLPOINT_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.reports.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring invalid low stock threshold"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("register.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The SQLite file to open.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("tillpoint.db"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Where the JSON settings files live.
    pub fn settings_dir(&self) -> ConfigResult<PathBuf> {
        if let Some(dir) = &self.terminal.settings_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }
}
