//! Text charts and number formatting for the dashboard.

use num_format::{Locale, ToFormattedString};

/// Format an amount with thousands separators and fixed decimals.
pub fn format_amount(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();

    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }

    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Render labelled values as a horizontal bar chart.
///
/// Bars are scaled so the largest positive value spans `width` cells;
/// zero and negative values get an empty bar.
pub fn bar_chart(items: &[(String, f64)], width: usize, unit: &str) -> String {
    if items.is_empty() {
        return String::new();
    }

    let label_width = items
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let max = items
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    let mut chart = String::new();
    for (label, value) in items {
        let cells = if max > 0.0 && value.is_finite() && *value > 0.0 {
            ((value / max) * width as f64).round() as usize
        } else {
            0
        };
        let padding = label_width - label.chars().count();
        chart.push_str(&format!(
            "{}{} │{} {:.2}{}\n",
            label,
            " ".repeat(padding),
            "█".repeat(cells),
            value,
            unit
        ));
    }

    chart
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_amount(60.0, 2), "60.00");
        assert_eq!(format_amount(-1500.5, 2), "-1,500.50");
        assert_eq!(format_amount(0.0, 2), "0.00");
        assert_eq!(format_amount(42.0, 0), "42");
    }

    #[test]
    fn test_bar_chart_scales_to_width() {
        let items = vec![
            ("PMAY".to_string(), 50.0),
            ("Jal Yukt".to_string(), 100.0),
            ("Roads".to_string(), -5.0),
        ];
        let chart = bar_chart(&items, 10, "%");
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "PMAY     │█████ 50.00%");
        assert_eq!(lines[1], "Jal Yukt │██████████ 100.00%");
        assert_eq!(lines[2], "Roads    │ -5.00%");
    }

    #[test]
    fn test_bar_chart_empty() {
        assert_eq!(bar_chart(&[], 10, "%"), "");
    }
}
