//! Number formatting for summary tables and legend labels.

/// Rounds to an integer and groups thousands with commas
/// (`1234567.4` → `"1,234,567"`).
#[must_use]
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    if !rounded.bytes().all(|b| b.is_ascii_digit()) {
        return rounded;
    }

    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3 + 1);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if value < 0.0 && grouped != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Abbreviates large values with `k`/`M` suffixes (`2_500_000.0` →
/// `"2.5M"`, `3000.0` → `"3k"`), falling back to [`format_thousands`].
#[must_use]
pub fn format_compact(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0).replace(".0M", "M")
    } else if value >= 1_000.0 {
        format!("{:.1}k", value / 1_000.0).replace(".0k", "k")
    } else {
        format_thousands(value)
    }
}
