//! # Hotel Configuration
//!
//! Deployment settings for the booking core: where the database lives,
//! which tax and exchange rates pricing uses, and how invoices are numbered.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     HOTEL_DB_PATH=/var/lib/hotel/hotel.db                               │
//! │     HOTEL_TAX_RATE_BPS=1600                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/hotel-booking/hotel.toml (Linux)                          │
//! │     ~/Library/Application Support/com.hotel.booking/hotel.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     16% tax, 0.92 EUR per USD, FAC- invoice numbers due in 30 days      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # hotel.toml
//! [database]
//! path = "/var/lib/hotel/hotel.db"
//! max_connections = 5
//!
//! [pricing]
//! tax_rate_bps = 1600      # 16.00 %
//! eur_per_usd_bps = 9200   # 1 USD = 0.92 EUR when a room type has no EUR rate
//!
//! [invoicing]
//! number_prefix = "FAC"
//! due_days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use hotel_core::pricing::PricingConfig;
use hotel_core::{TaxRate, DEFAULT_EUR_PER_USD_BPS, DEFAULT_TAX_BPS};
use hotel_db::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("hotel.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[pricing]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Lodging tax in basis points (1600 = 16%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// USD → EUR factor in basis points, for room types without an EUR rate.
    #[serde(default = "default_eur_per_usd_bps")]
    pub eur_per_usd_bps: u32,
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_BPS
}

fn default_eur_per_usd_bps() -> u32 {
    DEFAULT_EUR_PER_USD_BPS
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate_bps: default_tax_rate_bps(),
            eur_per_usd_bps: default_eur_per_usd_bps(),
        }
    }
}

/// `[invoicing]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicingSettings {
    /// First segment of invoice numbers: `{prefix}-YYYYMMDD-NNNN`.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,

    /// Days from generation to the due date of reservation invoices.
    #[serde(default = "default_due_days")]
    pub due_days: u32,
}

fn default_number_prefix() -> String {
    "FAC".to_string()
}

fn default_due_days() -> u32 {
    30
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        InvoicingSettings {
            number_prefix: default_number_prefix(),
            due_days: default_due_days(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete booking-core configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub invoicing: InvoicingSettings,
}

impl HotelConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (hotel.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading hotel config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load hotel config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Hotel config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.pricing.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "pricing.tax_rate_bps must be at most 10000, got {}",
                self.pricing.tax_rate_bps
            )));
        }

        if self.pricing.eur_per_usd_bps == 0 {
            return Err(ConfigError::Invalid(
                "pricing.eur_per_usd_bps must be greater than 0".into(),
            ));
        }

        if self.invoicing.number_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "invoicing.number_prefix must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`; unparsable numbers are ignored with
    /// a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("HOTEL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("HOTEL_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid HOTEL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(bps) = lookup("HOTEL_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(n) => {
                    debug!(tax_rate_bps = n, "Overriding tax rate from environment");
                    self.pricing.tax_rate_bps = n;
                }
                Err(_) => warn!(value = %bps, "Ignoring invalid HOTEL_TAX_RATE_BPS"),
            }
        }

        if let Some(bps) = lookup("HOTEL_EUR_PER_USD_BPS") {
            match bps.parse::<u32>() {
                Ok(n) => self.pricing.eur_per_usd_bps = n,
                Err(_) => warn!(value = %bps, "Ignoring invalid HOTEL_EUR_PER_USD_BPS"),
            }
        }

        if let Some(days) = lookup("HOTEL_INVOICE_DUE_DAYS") {
            match days.parse::<u32>() {
                Ok(n) => self.invoicing.due_days = n,
                Err(_) => warn!(value = %days, "Ignoring invalid HOTEL_INVOICE_DUE_DAYS"),
            }
        }

        if let Some(prefix) = lookup("HOTEL_INVOICE_PREFIX") {
            self.invoicing.number_prefix = prefix;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "hotel", "booking")
            .map(|dirs| dirs.config_dir().join("hotel.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The pricing inputs handed to the Pricing Calculator.
    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            tax_rate: TaxRate::from_bps(self.pricing.tax_rate_bps),
            eur_per_usd_bps: self.pricing.eur_per_usd_bps,
        }
    }

    /// Pool settings for [`hotel_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}
