//! Process configuration read from environment variables.

use chrono::{FixedOffset, NaiveTime};
use thiserror::Error;

use wrenchbook_invoicing::TaxRates;
use wrenchbook_scheduling::BusinessHours;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when persistent stores are enabled")]
    Missing(&'static str),
}

/// Where documents and counters live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// `None` when `JWT_SECRET` is unset; the binary falls back to a dev secret.
    pub jwt_secret: Option<String>,
    pub store: StoreBackend,
    pub business_hours: BusinessHours,
    pub invoice_series: String,
    pub tax_rates: TaxRates,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: None,
            store: StoreBackend::InMemory,
            business_hours: BusinessHours::default(),
            invoice_series: "1".to_string(),
            tax_rates: TaxRates::default(),
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_num<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: ToString,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| invalid(var, &value, e)),
        None => Ok(default),
    }
}

fn parse_time(var: &'static str, raw: Option<String>, default: NaiveTime) -> Result<NaiveTime, ConfigError> {
    match raw {
        Some(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|e| invalid(var, &value, e)),
        None => Ok(default),
    }
}

fn parse_flag(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(invalid(var, other, "expected true/false or 1/0")),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store = if parse_flag("USE_PERSISTENT_STORES", lookup("USE_PERSISTENT_STORES"))? {
            let database_url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = parse_num(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                10u32,
            )?;
            StoreBackend::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreBackend::InMemory
        };

        let open = parse_time("BUSINESS_OPEN", lookup("BUSINESS_OPEN"), defaults.business_hours.open())?;
        let close = parse_time("BUSINESS_CLOSE", lookup("BUSINESS_CLOSE"), defaults.business_hours.close())?;
        let offset_minutes: i32 = parse_num(
            "BUSINESS_UTC_OFFSET_MINUTES",
            lookup("BUSINESS_UTC_OFFSET_MINUTES"),
            0,
        )?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            invalid(
                "BUSINESS_UTC_OFFSET_MINUTES",
                &offset_minutes.to_string(),
                "offset out of range",
            )
        })?;
        let business_hours = BusinessHours::new(open, close, utc_offset)
            .map_err(|e| invalid("BUSINESS_CLOSE", &close.to_string(), e))?;

        let rates = defaults.tax_rates;
        let tax_rates = TaxRates {
            icms_bps: parse_num("TAX_ICMS_BPS", lookup("TAX_ICMS_BPS"), rates.icms_bps)?,
            iss_bps: parse_num("TAX_ISS_BPS", lookup("TAX_ISS_BPS"), rates.iss_bps)?,
            pis_bps: parse_num("TAX_PIS_BPS", lookup("TAX_PIS_BPS"), rates.pis_bps)?,
            cofins_bps: parse_num("TAX_COFINS_BPS", lookup("TAX_COFINS_BPS"), rates.cofins_bps)?,
        };

        let invoice_series = lookup("INVOICE_SERIES")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.invoice_series);

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            store,
            business_hours,
            invoice_series,
            tax_rates,
        })
    }
}
