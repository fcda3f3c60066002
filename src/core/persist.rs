//! Round-trip of the shareable inputs through a URL query string.
//!
//! Format: `own=<f64>&loan=<f64>&duration=<u32>[&sale=<f64>]`, form-urlencoded.
//! Floats use the shortest representation that parses back to the same value.
//! A `version` key may ride along; any other key is ignored.

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use super::engine::estimated_repair_cost;
use super::error::EstimatorError;
use super::params::{ConfigVersion, EstimatorConfig};
use super::types::ProjectInputs;

pub const OWN_KEY: &str = "own";
pub const LOAN_KEY: &str = "loan";
pub const DURATION_KEY: &str = "duration";
pub const SALE_KEY: &str = "sale";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedState {
    pub own_capital: f64,
    pub loan_amount: f64,
    pub duration_months: u32,
    pub sale_price: Option<f64>,
}

impl SharedState {
    pub fn defaults(config: &EstimatorConfig) -> Self {
        Self {
            own_capital: config.defaults.own_capital,
            loan_amount: config.defaults.loan_amount,
            duration_months: config.defaults.duration_months,
            sale_price: None,
        }
    }

    pub fn into_inputs(self) -> ProjectInputs {
        ProjectInputs {
            own_capital: self.own_capital,
            loan_amount: self.loan_amount,
            duration_months: self.duration_months,
            sale_price: self.sale_price,
            repair_cost: None,
        }
    }
}

impl From<&ProjectInputs> for SharedState {
    fn from(inputs: &ProjectInputs) -> Self {
        Self {
            own_capital: inputs.own_capital,
            loan_amount: inputs.loan_amount,
            duration_months: inputs.duration_months,
            sale_price: inputs.sale_price,
        }
    }
}

/// Raw, already percent-decoded query parameters. Values stay strings so a
/// bad number becomes a warning instead of an extractor rejection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryParams {
    pub own: Option<String>,
    pub loan: Option<String>,
    pub duration: Option<String>,
    pub sale: Option<String>,
    pub version: Option<String>,
}

impl QueryParams {
    pub fn from_query(query: &str) -> Result<Self, QueryError> {
        serde_urlencoded::from_str(query.trim_start_matches('?'))
            .map_err(|err| QueryError::Malformed(err.to_string()))
    }

    pub fn config_version(&self) -> Result<Option<ConfigVersion>, EstimatorError> {
        self.version
            .as_deref()
            .map(str::parse::<ConfigVersion>)
            .transpose()
    }

    fn has_shared_keys(&self) -> bool {
        self.own.is_some() || self.loan.is_some() || self.duration.is_some() || self.sale.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("query string is malformed: {0}")]
    Malformed(String),
    #[error("query string could not be encoded: {0}")]
    Encode(String),
    #[error("query parameter '{0}' is missing")]
    Missing(&'static str),
    #[error("query parameter '{key}' has unparsable value '{value}'")]
    Unparsable { key: &'static str, value: String },
    #[error("query parameter '{key}' value {value} is outside [{min}, {max}]")]
    OutOfBounds {
        key: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub state: SharedState,
    pub warning: Option<String>,
}

pub fn encode_query(state: &SharedState) -> Result<String, QueryError> {
    let mut pairs = vec![
        (OWN_KEY, state.own_capital.to_string()),
        (LOAN_KEY, state.loan_amount.to_string()),
        (DURATION_KEY, state.duration_months.to_string()),
    ];
    if let Some(sale) = state.sale_price {
        pairs.push((SALE_KEY, sale.to_string()));
    }
    serde_urlencoded::to_string(&pairs).map_err(|err| QueryError::Encode(err.to_string()))
}

/// Strict decode. `Ok(None)` means the query carries none of the shared keys.
pub fn parse_query(
    query: &str,
    config: &EstimatorConfig,
) -> Result<Option<SharedState>, QueryError> {
    QueryParams::from_query(query).and_then(|params| parse_params(&params, config))
}

pub fn parse_params(
    params: &QueryParams,
    config: &EstimatorConfig,
) -> Result<Option<SharedState>, QueryError> {
    if !params.has_shared_keys() {
        return Ok(None);
    }

    let bounds = &config.bounds;
    let own_capital = parse_f64(OWN_KEY, params.own.as_deref())?;
    check(OWN_KEY, own_capital, bounds.own_capital.min, bounds.own_capital.max)?;
    let loan_amount = parse_f64(LOAN_KEY, params.loan.as_deref())?;
    check(LOAN_KEY, loan_amount, bounds.loan_amount.min, bounds.loan_amount.max)?;

    let raw_duration = params
        .duration
        .as_deref()
        .ok_or(QueryError::Missing(DURATION_KEY))?;
    let duration_months = raw_duration
        .trim()
        .parse::<u32>()
        .map_err(|_| QueryError::Unparsable {
            key: DURATION_KEY,
            value: raw_duration.to_string(),
        })?;
    check(
        DURATION_KEY,
        f64::from(duration_months),
        f64::from(bounds.min_duration_months),
        f64::from(bounds.max_duration_months),
    )?;

    let sale_price = match params.sale.as_deref() {
        Some(raw) => {
            let sale = parse_f64(SALE_KEY, Some(raw))?;
            let purchase_price = own_capital + loan_amount;
            let window = bounds.sale_price(
                purchase_price,
                estimated_repair_cost(purchase_price, config),
            );
            check(SALE_KEY, sale, window.min, window.max)?;
            Some(sale)
        }
        None => None,
    };

    Ok(Some(SharedState {
        own_capital,
        loan_amount,
        duration_months,
        sale_price,
    }))
}

/// Lenient decode: any problem discards every value in favour of the defaults.
/// A warning is produced only when shared parameters were present but invalid.
pub fn decode_query(query: &str, config: &EstimatorConfig) -> Restored {
    restore(parse_query(query, config), config)
}

pub fn restore_params(params: &QueryParams, config: &EstimatorConfig) -> Restored {
    restore(parse_params(params, config), config)
}

pub fn restore(
    parsed: Result<Option<SharedState>, QueryError>,
    config: &EstimatorConfig,
) -> Restored {
    match parsed {
        Ok(Some(state)) => Restored {
            state,
            warning: None,
        },
        Ok(None) => Restored {
            state: SharedState::defaults(config),
            warning: None,
        },
        Err(err) => {
            warn!(error = %err, "discarding shared query parameters");
            Restored {
                state: SharedState::defaults(config),
                warning: Some(format!("{err}; default values were used instead")),
            }
        }
    }
}

fn parse_f64(key: &'static str, raw: Option<&str>) -> Result<f64, QueryError> {
    let raw = raw.ok_or(QueryError::Missing(key))?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| QueryError::Unparsable {
            key,
            value: raw.to_string(),
        })
}

fn check(key: &'static str, value: f64, min: f64, max: f64) -> Result<(), QueryError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(QueryError::OutOfBounds {
            key,
            value,
            min,
            max,
        })
    }
}
