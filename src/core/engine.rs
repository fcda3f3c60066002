use tracing::{debug, error};

use super::error::EstimatorError;
use super::params::{EstimatorConfig, InterestPolicy, SharingPolicy};
use super::types::{
    BreakdownLine, Estimate, FixedIncomeResult, Ineligibility, LineItem, ProfitShareResult,
    ProjectInputs, SchemeOutcome, duration_years,
};

/// Runs the whole validation chain and both schemes for one input snapshot.
///
/// Any validation failure aborts the evaluation: there are no partial results.
pub fn evaluate(
    inputs: &ProjectInputs,
    config: &EstimatorConfig,
) -> Result<Estimate, EstimatorError> {
    validate_inputs(inputs, config)?;

    let purchase_price = inputs.purchase_price();
    let repair_cost = resolve_repair_cost(inputs, config)?;
    let sale_price = resolve_sale_price(inputs, repair_cost, config)?;

    let fixed_income = match fixed_income_eligibility(purchase_price, config) {
        Some(reason) => SchemeOutcome::unavailable(reason),
        None => SchemeOutcome::Available {
            result: fixed_income(
                inputs.own_capital,
                inputs.loan_amount,
                purchase_price,
                inputs.duration_months,
                config,
            )?,
        },
    };

    let profit_share = match profit_share_eligibility(purchase_price, inputs.loan_amount, config) {
        Some(reason) => SchemeOutcome::unavailable(reason),
        None => SchemeOutcome::Available {
            result: profit_share(
                inputs.own_capital,
                inputs.loan_amount,
                purchase_price,
                repair_cost,
                inputs.duration_months,
                sale_price,
                config,
            ),
        },
    };

    debug!(
        version = ?config.version,
        purchase_price,
        fixed_available = fixed_income.result().is_some(),
        profit_share_available = profit_share.result().is_some(),
        "evaluated project"
    );

    Ok(Estimate {
        purchase_price,
        downpayment_fraction: inputs.downpayment_fraction(),
        repair_cost,
        fixed_income,
        profit_share,
    })
}

pub fn validate_inputs(
    inputs: &ProjectInputs,
    config: &EstimatorConfig,
) -> Result<(), EstimatorError> {
    let bounds = &config.bounds;
    bounds.own_capital.check("own_capital", inputs.own_capital)?;
    bounds.loan_amount.check("loan_amount", inputs.loan_amount)?;
    bounds
        .duration()
        .check("duration_months", f64::from(inputs.duration_months))?;

    let fraction = inputs.downpayment_fraction();
    if fraction < config.min_downpayment {
        return Err(EstimatorError::DownpaymentTooLow {
            fraction,
            minimum: config.min_downpayment,
        });
    }
    Ok(())
}

pub fn estimated_repair_cost(purchase_price: f64, config: &EstimatorConfig) -> f64 {
    purchase_price * config.repairs_share
}

fn resolve_repair_cost(
    inputs: &ProjectInputs,
    config: &EstimatorConfig,
) -> Result<f64, EstimatorError> {
    let estimate = estimated_repair_cost(inputs.purchase_price(), config);
    match inputs.repair_cost {
        Some(cost) => config.bounds.repair_cost(estimate).check("repair_cost", cost),
        None => Ok(estimate),
    }
}

pub fn default_sale_price(purchase_price: f64, repair_cost: f64, config: &EstimatorConfig) -> f64 {
    let bounds = config.bounds.sale_price(purchase_price, repair_cost);
    (purchase_price * config.defaults.sale_price_multiplier)
        .round()
        .max(bounds.min)
        .min(bounds.max)
}

fn resolve_sale_price(
    inputs: &ProjectInputs,
    repair_cost: f64,
    config: &EstimatorConfig,
) -> Result<f64, EstimatorError> {
    let purchase_price = inputs.purchase_price();
    match inputs.sale_price {
        Some(price) => config
            .bounds
            .sale_price(purchase_price, repair_cost)
            .check("sale_price", price),
        None => Ok(default_sale_price(purchase_price, repair_cost, config)),
    }
}

pub fn fixed_income_eligibility(
    purchase_price: f64,
    config: &EstimatorConfig,
) -> Option<Ineligibility> {
    match config.max_price_for_fixed_income {
        Some(limit) if purchase_price > limit => {
            Some(Ineligibility::PriceAboveFixedIncomeLimit { limit })
        }
        _ => None,
    }
}

pub fn profit_share_eligibility(
    purchase_price: f64,
    loan_amount: f64,
    config: &EstimatorConfig,
) -> Option<Ineligibility> {
    if let Some(minimum) = config.min_price_for_profit_share {
        if purchase_price < minimum {
            return Some(Ineligibility::PriceBelowProfitShareMinimum { minimum });
        }
    }
    if config.profit_share_requires_no_loan && loan_amount > 0.0 {
        return Some(Ineligibility::LoanPresent);
    }
    None
}

/// Fixed-rate payout on own capital.
///
/// The uncapped rate solves `(own * x + loan * loan_rate) / price = target_rate`
/// for `x`, so the project as a whole averages out to the target rate. The
/// price tier then caps it.
pub fn fixed_income(
    own_capital: f64,
    loan_amount: f64,
    purchase_price: f64,
    duration_months: u32,
    config: &EstimatorConfig,
) -> Result<FixedIncomeResult, EstimatorError> {
    let max_rate = config.rate_tiers.resolve(purchase_price);
    let balancing_rate =
        loan_amount * (config.target_rate - config.loan_rate) / own_capital + config.target_rate;
    let annual_rate = max_rate.min(balancing_rate);

    let blended_rate =
        check_blended_rate(own_capital, loan_amount, purchase_price, annual_rate, config)?;

    Ok(FixedIncomeResult {
        annual_rate,
        max_rate,
        blended_rate,
        absolute_income: annual_rate * duration_years(duration_months) * own_capital,
    })
}

/// Fails when the rate paid on own capital pushes the whole-project rate past
/// the target. Only a broken rate table or rate constants can trigger this.
pub fn check_blended_rate(
    own_capital: f64,
    loan_amount: f64,
    purchase_price: f64,
    own_rate: f64,
    config: &EstimatorConfig,
) -> Result<f64, EstimatorError> {
    let blended = (own_capital * own_rate + loan_amount * config.loan_rate) / purchase_price;
    if blended - config.target_rate > config.blended_rate_tolerance {
        error!(
            version = ?config.version,
            blended,
            target = config.target_rate,
            "blended rate exceeds target; rate configuration is inconsistent"
        );
        return Err(EstimatorError::BlendedRateExceedsTarget {
            blended,
            target: config.target_rate,
            tolerance: config.blended_rate_tolerance,
        });
    }
    Ok(blended)
}

pub fn investor_share_fraction(
    purchase_price: f64,
    repair_cost: f64,
    config: &EstimatorConfig,
) -> f64 {
    let after_fee = 1.0 - config.project_management_fee;
    match config.sharing_policy {
        SharingPolicy::Flat => after_fee,
        SharingPolicy::Proportional => purchase_price / (purchase_price + repair_cost) * after_fee,
    }
}

pub fn profit_share(
    own_capital: f64,
    loan_amount: f64,
    purchase_price: f64,
    repair_cost: f64,
    duration_months: u32,
    sale_price: f64,
    config: &EstimatorConfig,
) -> ProfitShareResult {
    let years = duration_years(duration_months);
    let share = investor_share_fraction(purchase_price, repair_cost, config);
    // Tax applies to price appreciation only, not to profit.
    let taxes = (sale_price - purchase_price) * config.tax_rate;
    let interest = config.loan_rate * loan_amount * years;

    let project_profit = sale_price - purchase_price - repair_cost - taxes;
    let (profit, investor_profit, net_income) = match config.interest_policy {
        InterestPolicy::ProjectExpense => {
            let profit = project_profit - interest;
            let investor_profit = profit * share;
            (profit, investor_profit, investor_profit)
        }
        InterestPolicy::InvestorExpense => {
            let investor_profit = project_profit * share;
            (project_profit, investor_profit, investor_profit - interest)
        }
    };
    let annual_rate = net_income / own_capital / years;

    let mut project_breakdown = vec![
        BreakdownLine::new(LineItem::Purchase, purchase_price),
        BreakdownLine::new(LineItem::Repairs, repair_cost),
    ];
    if config.interest_policy == InterestPolicy::ProjectExpense {
        project_breakdown.push(BreakdownLine::new(LineItem::LoanInterest, interest));
    }
    project_breakdown.extend([
        BreakdownLine::new(LineItem::Taxes, taxes),
        BreakdownLine::new(LineItem::Sale, sale_price),
        BreakdownLine::new(LineItem::Profit, profit),
    ]);

    let mut investor_breakdown = vec![
        BreakdownLine::new(LineItem::Profit, profit),
        BreakdownLine::new(LineItem::InvestorShare, investor_profit),
    ];
    if config.interest_policy == InterestPolicy::InvestorExpense {
        investor_breakdown.push(BreakdownLine::new(LineItem::LoanInterest, interest));
    }
    investor_breakdown.push(BreakdownLine::new(LineItem::NetIncome, net_income));

    ProfitShareResult {
        net_income,
        annual_rate,
        investor_share_fraction: share,
        repair_cost,
        sale_price,
        taxes,
        interest,
        profit,
        investor_profit,
        project_breakdown,
        investor_breakdown,
    }
}
