use std::str::FromStr;

use serde::Serialize;

use super::error::EstimatorError;
use super::tiers::RateTierTable;

/// Named revision of the compiled-in business rules.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigVersion {
    Initial,
    Latest,
}

impl FromStr for ConfigVersion {
    type Err = EstimatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "initial" | "v1" => Ok(ConfigVersion::Initial),
            "latest" => Ok(ConfigVersion::Latest),
            other => Err(EstimatorError::InvalidConfig(format!(
                "unknown config version '{other}', expected 'initial' or 'latest'"
            ))),
        }
    }
}

/// How the investor's slice of project profit is sized.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharingPolicy {
    /// Non-fee profit split by contribution: purchase price vs. repairs.
    Proportional,
    /// Everything left after the management fee goes to the investor.
    Flat,
}

/// Where mortgage interest is charged in the profit-share scheme.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterestPolicy {
    /// Interest is a project cost, shared with the co-investor.
    ProjectExpense,
    /// Interest is deducted from the investor's share after the split.
    InvestorExpense,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn check(&self, field: &'static str, value: f64) -> Result<f64, EstimatorError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(EstimatorError::OutOfBounds {
                field,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBounds {
    pub own_capital: Bounds,
    pub loan_amount: Bounds,
    pub min_duration_months: u32,
    pub max_duration_months: u32,
    /// Allowed deviation of a user-supplied repair cost from the estimate.
    pub repair_cost_spread: f64,
    /// Upper bound of the sale price as a multiple of the purchase price.
    pub sale_price_multiplier: f64,
}

impl InputBounds {
    pub fn duration(&self) -> Bounds {
        Bounds::new(
            f64::from(self.min_duration_months),
            f64::from(self.max_duration_months),
        )
    }

    pub fn repair_cost(&self, estimate: f64) -> Bounds {
        Bounds::new(
            estimate * (1.0 - self.repair_cost_spread),
            estimate * (1.0 + self.repair_cost_spread),
        )
    }

    pub fn sale_price(&self, purchase_price: f64, repair_cost: f64) -> Bounds {
        Bounds::new(
            purchase_price + repair_cost,
            purchase_price * self.sale_price_multiplier,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultInputs {
    pub own_capital: f64,
    pub loan_amount: f64,
    pub duration_months: u32,
    /// Default sale price as a multiple of the purchase price, rounded to a whole unit.
    pub sale_price_multiplier: f64,
}

/// Every constant the calculators read. Passed by reference into each call so
/// that several revisions can be evaluated side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatorConfig {
    pub version: ConfigVersion,
    pub min_downpayment: f64,
    pub repairs_share: f64,
    pub loan_rate: f64,
    pub target_rate: f64,
    pub blended_rate_tolerance: f64,
    pub rate_tiers: RateTierTable,
    pub max_price_for_fixed_income: Option<f64>,
    pub min_price_for_profit_share: Option<f64>,
    pub profit_share_requires_no_loan: bool,
    pub project_management_fee: f64,
    pub tax_rate: f64,
    pub sharing_policy: SharingPolicy,
    pub interest_policy: InterestPolicy,
    pub bounds: InputBounds,
    pub defaults: DefaultInputs,
}

const MIN_DOWNPAYMENT: f64 = 0.1;
const REPAIRS_SHARE: f64 = 0.2;
const TAX_RATE: f64 = 0.13;
const BLENDED_RATE_TOLERANCE: f64 = 0.01;
const MAX_PRICE_FOR_FIXED_INCOME: f64 = 30.0;

impl EstimatorConfig {
    pub fn for_version(version: ConfigVersion) -> Result<Self, EstimatorError> {
        let config = match version {
            ConfigVersion::Initial => Self::initial()?,
            ConfigVersion::Latest => Self::latest()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn initial() -> Result<Self, EstimatorError> {
        Ok(Self {
            version: ConfigVersion::Initial,
            min_downpayment: MIN_DOWNPAYMENT,
            repairs_share: REPAIRS_SHARE,
            loan_rate: 0.14,
            target_rate: 0.2,
            blended_rate_tolerance: BLENDED_RATE_TOLERANCE,
            rate_tiers: RateTierTable::from_pairs(&[(15.0, 0.4), (1_000_000_000.0, 0.6)])?,
            max_price_for_fixed_income: Some(MAX_PRICE_FOR_FIXED_INCOME),
            min_price_for_profit_share: None,
            profit_share_requires_no_loan: false,
            project_management_fee: 0.5,
            tax_rate: TAX_RATE,
            sharing_policy: SharingPolicy::Proportional,
            interest_policy: InterestPolicy::ProjectExpense,
            bounds: InputBounds {
                own_capital: Bounds::new(1.0, 100.0),
                loan_amount: Bounds::new(10.0, 100.0),
                min_duration_months: 3,
                max_duration_months: 12,
                repair_cost_spread: 0.2,
                sale_price_multiplier: 2.0,
            },
            defaults: DefaultInputs {
                own_capital: 2.0,
                loan_amount: 10.0,
                duration_months: 6,
                sale_price_multiplier: 1.5,
            },
        })
    }

    fn latest() -> Result<Self, EstimatorError> {
        Ok(Self {
            version: ConfigVersion::Latest,
            min_downpayment: MIN_DOWNPAYMENT,
            repairs_share: REPAIRS_SHARE,
            loan_rate: 0.19,
            target_rate: 0.22,
            blended_rate_tolerance: BLENDED_RATE_TOLERANCE,
            rate_tiers: RateTierTable::from_pairs(&[
                (6.0, 0.40),
                (7.0, 0.38),
                (8.0, 0.36),
                (9.0, 0.34),
                (10.0, 0.32),
                (11.0, 0.30),
            ])?,
            max_price_for_fixed_income: Some(MAX_PRICE_FOR_FIXED_INCOME),
            min_price_for_profit_share: Some(10.0),
            profit_share_requires_no_loan: true,
            project_management_fee: 0.6,
            tax_rate: TAX_RATE,
            sharing_policy: SharingPolicy::Flat,
            interest_policy: InterestPolicy::InvestorExpense,
            bounds: InputBounds {
                own_capital: Bounds::new(1.0, 100.0),
                loan_amount: Bounds::new(0.0, 100.0),
                min_duration_months: 3,
                max_duration_months: 12,
                repair_cost_spread: 0.2,
                sale_price_multiplier: 2.0,
            },
            defaults: DefaultInputs {
                own_capital: 2.0,
                loan_amount: 10.0,
                duration_months: 6,
                sale_price_multiplier: 1.5,
            },
        })
    }

    pub fn validate(&self) -> Result<(), EstimatorError> {
        for (name, value) in [
            ("min_downpayment", self.min_downpayment),
            ("repairs_share", self.repairs_share),
            ("loan_rate", self.loan_rate),
            ("target_rate", self.target_rate),
            ("project_management_fee", self.project_management_fee),
            ("tax_rate", self.tax_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EstimatorError::InvalidConfig(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }

        if !self.blended_rate_tolerance.is_finite() || self.blended_rate_tolerance < 0.0 {
            return Err(EstimatorError::InvalidConfig(
                "blended_rate_tolerance must be >= 0".to_string(),
            ));
        }

        let bounds = &self.bounds;
        if bounds.own_capital.min <= 0.0 || bounds.own_capital.min > bounds.own_capital.max {
            return Err(EstimatorError::InvalidConfig(
                "own capital bounds must be positive and ordered".to_string(),
            ));
        }
        if bounds.loan_amount.min < 0.0 || bounds.loan_amount.min > bounds.loan_amount.max {
            return Err(EstimatorError::InvalidConfig(
                "loan amount bounds must be non-negative and ordered".to_string(),
            ));
        }
        if bounds.min_duration_months == 0 || bounds.min_duration_months > bounds.max_duration_months
        {
            return Err(EstimatorError::InvalidConfig(
                "duration bounds must be positive and ordered".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&bounds.repair_cost_spread) {
            return Err(EstimatorError::InvalidConfig(
                "repair_cost_spread must be in [0, 1)".to_string(),
            ));
        }
        if bounds.sale_price_multiplier
            <= 1.0 + self.repairs_share * (1.0 + bounds.repair_cost_spread)
        {
            return Err(EstimatorError::InvalidConfig(
                "sale_price_multiplier leaves no room above purchase price plus repairs"
                    .to_string(),
            ));
        }

        let defaults = &self.defaults;
        bounds
            .own_capital
            .check("default own_capital", defaults.own_capital)
            .and_then(|_| {
                bounds
                    .loan_amount
                    .check("default loan_amount", defaults.loan_amount)
            })
            .and_then(|_| {
                bounds
                    .duration()
                    .check("default duration_months", f64::from(defaults.duration_months))
            })
            .map_err(|err| EstimatorError::InvalidConfig(err.to_string()))?;

        Ok(())
    }
}
