use serde::Serialize;

use crate::core::{
    BreakdownLine, Estimate, ProjectInputs, SchemeOutcome, format_rate_percent, round_amount,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeDisplay {
    pub annual_rate: String,
    pub income: f64,
}

/// Rounded, human-facing view of an estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySummary {
    pub purchase_price: f64,
    pub downpayment: String,
    pub fixed_income: Option<SchemeDisplay>,
    pub profit_share: Option<SchemeDisplay>,
    pub investor_share: Option<String>,
}

pub fn display_summary(estimate: &Estimate) -> DisplaySummary {
    DisplaySummary {
        purchase_price: round_amount(estimate.purchase_price),
        downpayment: format_rate_percent(estimate.downpayment_fraction),
        fixed_income: estimate.fixed_income.result().map(|fixed| SchemeDisplay {
            annual_rate: format_rate_percent(fixed.annual_rate),
            income: round_amount(fixed.absolute_income),
        }),
        profit_share: estimate.profit_share.result().map(|shared| SchemeDisplay {
            annual_rate: format_rate_percent(shared.annual_rate),
            income: round_amount(shared.net_income),
        }),
        investor_share: estimate
            .profit_share
            .result()
            .map(|shared| format_rate_percent(shared.investor_share_fraction)),
    }
}

pub fn render_text(estimate: &Estimate, inputs: &ProjectInputs, share_query: &str) -> String {
    let summary = display_summary(estimate);
    let mut lines = vec![
        format!(
            "Purchase price: {:.2} (own {:.2} + loan {:.2})",
            estimate.purchase_price, inputs.own_capital, inputs.loan_amount
        ),
        format!("Downpayment: {}", summary.downpayment),
        format!("Duration: {} months", inputs.duration_months),
        String::new(),
        "Fixed income".to_string(),
    ];

    match (&estimate.fixed_income, &summary.fixed_income) {
        (SchemeOutcome::Available { .. }, Some(fixed)) => {
            lines.extend(scheme_lines(fixed, inputs.own_capital));
        }
        (SchemeOutcome::Unavailable { message, .. }, _) => {
            lines.push(format!("  Not offered: {message}"));
        }
        (SchemeOutcome::Available { .. }, None) => {}
    }

    lines.push(String::new());
    lines.push("Profit share".to_string());
    match &estimate.profit_share {
        SchemeOutcome::Available { result } => {
            if let Some(share) = &summary.investor_share {
                lines.push(format!("  Your share of project profit: {share}"));
            }
            lines.push("  Project calculation:".to_string());
            lines.extend(breakdown_lines(&result.project_breakdown));
            lines.push("  Your calculation:".to_string());
            lines.extend(breakdown_lines(&result.investor_breakdown));
            if let Some(shared) = &summary.profit_share {
                lines.extend(scheme_lines(shared, inputs.own_capital));
            }
        }
        SchemeOutcome::Unavailable { message, .. } => {
            lines.push(format!("  Not offered: {message}"));
        }
    }

    lines.push(String::new());
    lines.push(format!("Share: ?{share_query}"));
    lines.join("\n")
}

fn scheme_lines(scheme: &SchemeDisplay, own_capital: f64) -> [String; 2] {
    [
        format!(
            "  Rate on own capital ({own_capital:.1}): {}",
            scheme.annual_rate
        ),
        format!("  Income for the project: {:.2}", scheme.income),
    ]
}

fn breakdown_lines(lines: &[BreakdownLine]) -> impl Iterator<Item = String> + '_ {
    lines
        .iter()
        .map(|line| format!("    {:<22}{:>10.2}", line.label, line.value))
}
