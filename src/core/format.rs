/// Renders a fractional rate as a whole percent, e.g. `0.376` as `38%`.
pub fn format_rate_percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

pub fn round_amount(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_rounded_to_whole_percent() {
        assert_eq!(format_rate_percent(0.3), "30%");
        assert_eq!(format_rate_percent(0.376), "38%");
        assert_eq!(format_rate_percent(-0.05), "-5%");
    }

    #[test]
    fn amounts_keep_two_decimals() {
        assert_eq!(round_amount(0.25000000000000006), 0.25);
        assert_eq!(round_amount(0.883333), 0.88);
        assert_eq!(round_amount(1.128), 1.13);
    }
}
