//! # Settings Files
//!
//! Runtime-editable settings stored as JSON next to the database.
//!
//! ```text
//! <settings dir>/
//! ├── tier_settings.json     ◄─── loyalty tiers (thresholds, discounts)
//! └── payment_settings.json  ◄─── bank details for transfer payments
//! ```
//!
//! Both files are optional. A missing or malformed file falls back to the
//! defaults with a warning so the register can always start.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use tillpoint_core::{LoyaltyTier, TierPolicy};

use crate::config::{ConfigError, ConfigResult};

pub const TIER_SETTINGS_FILE: &str = "tier_settings.json";
pub const PAYMENT_SETTINGS_FILE: &str = "payment_settings.json";

// =============================================================================
// Payment Settings
// =============================================================================

/// Bank account that receives transfer payments.
///
/// ## File Format
/// ```json
/// {
///   "bank_account": "0123 4567 89",
///   "bank_code": "VCB",
///   "bank_name": "Vietcombank",
///   "account_holder": "NGUYEN VAN A",
///   "enable_transfer": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    #[serde(default)]
    pub bank_account: String,

    #[serde(default)]
    pub bank_code: String,

    #[serde(default)]
    pub bank_name: String,

    #[serde(default)]
    pub account_holder: String,

    /// Offer bank transfer (QR) as a payment method.
    #[serde(default = "default_true")]
    pub enable_transfer: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            bank_account: String::new(),
            bank_code: String::new(),
            bank_name: String::new(),
            account_holder: String::new(),
            enable_transfer: true,
        }
    }
}

impl PaymentSettings {
    /// Whether enough bank details are present to request a transfer.
    pub fn is_configured(&self) -> bool {
        !self.bank_account.trim().is_empty()
            && !self.bank_code.trim().is_empty()
            && !self.account_holder.trim().is_empty()
    }
}

// =============================================================================
// Tier Policy Store
// =============================================================================

/// Where the loyalty tier policy is persisted.
pub trait TierPolicyStore: Send + Sync {
    /// Reads the stored policy.
    fn load(&self) -> ConfigResult<TierPolicy>;

    /// Replaces the stored policy.
    fn save(&self, policy: &TierPolicy) -> ConfigResult<()>;

    /// Reads the stored policy, falling back to the default tiers.
    fn load_or_default(&self) -> TierPolicy {
        self.load().unwrap_or_else(|e| {
            warn!("Failed to load tier settings: {}. Using default tiers.", e);
            TierPolicy::default()
        })
    }
}

/// On-disk shape of `tier_settings.json`.
///
/// Discounts are whole basis points (`725` = 7.25%), so the finest step is
/// 0.01%. A fractional value such as `712.5` fails to parse and the file is
/// rejected; it is never rounded.
#[derive(Debug, Serialize, Deserialize)]
struct TierSettingsFile {
    tiers: Vec<LoyaltyTier>,
}

/// JSON settings files in one directory.
#[derive(Debug, Clone)]
pub struct JsonSettings {
    dir: PathBuf,
}

impl JsonSettings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonSettings { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads `payment_settings.json`.
    pub fn load_payment(&self) -> ConfigResult<PaymentSettings> {
        let contents = std::fs::read_to_string(self.dir.join(PAYMENT_SETTINGS_FILE))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Reads `payment_settings.json`, falling back to empty bank details.
    pub fn load_payment_or_default(&self) -> PaymentSettings {
        self.load_payment().unwrap_or_else(|e| {
            warn!("Failed to load payment settings: {}. Using defaults.", e);
            PaymentSettings::default()
        })
    }

    pub fn save_payment(&self, settings: &PaymentSettings) -> ConfigResult<()> {
        self.write(PAYMENT_SETTINGS_FILE, settings)
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        info!(?path, "Settings saved");
        Ok(())
    }
}

impl TierPolicyStore for JsonSettings {
    fn load(&self) -> ConfigResult<TierPolicy> {
        let contents = std::fs::read_to_string(self.dir.join(TIER_SETTINGS_FILE))?;
        let file: TierSettingsFile = serde_json::from_str(&contents)?;
        TierPolicy::new(file.tiers).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn save(&self, policy: &TierPolicy) -> ConfigResult<()> {
        let file = TierSettingsFile {
            tiers: policy.tiers().to_vec(),
        };
        self.write(TIER_SETTINGS_FILE, &file)
    }
}
