mod engine;
mod error;
mod format;
mod params;
mod persist;
mod tiers;
mod types;

pub use engine::{
    check_blended_rate, default_sale_price, estimated_repair_cost, evaluate, fixed_income,
    fixed_income_eligibility, investor_share_fraction, profit_share, profit_share_eligibility,
    validate_inputs,
};
pub use error::EstimatorError;
pub use format::{format_rate_percent, round_amount};
pub use params::{
    Bounds, ConfigVersion, DefaultInputs, EstimatorConfig, InputBounds, InterestPolicy,
    SharingPolicy,
};
pub use persist::{
    QueryError, QueryParams, Restored, SharedState, decode_query, encode_query, parse_params,
    parse_query, restore, restore_params,
};
pub use tiers::{RateTier, RateTierTable};
pub use types::{
    BreakdownLine, Estimate, FixedIncomeResult, Ineligibility, LineItem, ProfitShareResult,
    ProjectInputs, SchemeOutcome, duration_years,
};
