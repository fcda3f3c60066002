use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInputs {
    pub own_capital: f64,
    pub loan_amount: f64,
    pub duration_months: u32,
    pub sale_price: Option<f64>,
    pub repair_cost: Option<f64>,
}

impl ProjectInputs {
    pub fn purchase_price(&self) -> f64 {
        self.own_capital + self.loan_amount
    }

    pub fn downpayment_fraction(&self) -> f64 {
        self.own_capital / self.purchase_price()
    }
}

pub fn duration_years(duration_months: u32) -> f64 {
    f64::from(duration_months) / 12.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedIncomeResult {
    pub annual_rate: f64,
    pub max_rate: f64,
    pub blended_rate: f64,
    pub absolute_income: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineItem {
    Purchase,
    Repairs,
    LoanInterest,
    Taxes,
    Sale,
    Profit,
    InvestorShare,
    NetIncome,
}

impl LineItem {
    pub fn label(self) -> &'static str {
        match self {
            LineItem::Purchase => "Purchase",
            LineItem::Repairs => "Repairs",
            LineItem::LoanInterest => "Loan interest",
            LineItem::Taxes => "Taxes",
            LineItem::Sale => "Sale",
            LineItem::Profit => "Profit",
            LineItem::InvestorShare => "Your share of profit",
            LineItem::NetIncome => "Net income",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownLine {
    pub item: LineItem,
    pub label: &'static str,
    pub value: f64,
}

impl BreakdownLine {
    pub fn new(item: LineItem, value: f64) -> Self {
        Self {
            item,
            label: item.label(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitShareResult {
    pub net_income: f64,
    pub annual_rate: f64,
    pub investor_share_fraction: f64,
    pub repair_cost: f64,
    pub sale_price: f64,
    pub taxes: f64,
    pub interest: f64,
    pub profit: f64,
    pub investor_profit: f64,
    pub project_breakdown: Vec<BreakdownLine>,
    pub investor_breakdown: Vec<BreakdownLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Ineligibility {
    PriceAboveFixedIncomeLimit { limit: f64 },
    PriceBelowProfitShareMinimum { minimum: f64 },
    LoanPresent,
}

impl Ineligibility {
    pub fn message(self) -> String {
        match self {
            Ineligibility::PriceAboveFixedIncomeLimit { limit } => format!(
                "fixed income is only offered for purchase prices up to {limit}; use profit share"
            ),
            Ineligibility::PriceBelowProfitShareMinimum { minimum } => {
                format!("profit share is only offered for purchase prices from {minimum}")
            }
            Ineligibility::LoanPresent => {
                "profit share is not offered for projects financed with a loan".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SchemeOutcome<T> {
    Available { result: T },
    Unavailable { reason: Ineligibility, message: String },
}

impl<T> SchemeOutcome<T> {
    pub fn unavailable(reason: Ineligibility) -> Self {
        SchemeOutcome::Unavailable {
            reason,
            message: reason.message(),
        }
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            SchemeOutcome::Available { result } => Some(result),
            SchemeOutcome::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub purchase_price: f64,
    pub downpayment_fraction: f64,
    pub repair_cost: f64,
    pub fixed_income: SchemeOutcome<FixedIncomeResult>,
    pub profit_share: SchemeOutcome<ProfitShareResult>,
}
