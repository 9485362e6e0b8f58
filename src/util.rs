// Formatting helpers shared by the terminal previews and the exports.
use num_format::{Locale, ToFormattedString};

/// Mean of `total` over `count`; 0 when there is nothing to divide by.
pub fn ratio(total: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total as f64 / count as f64
}

/// One decimal, no grouping, halves rounded away from zero.
///
/// - `0.25` becomes `"0.3"` and `1.25` becomes `"1.3"`.
/// - Values that only look like halves (`0.35` is stored just below it)
///   round by their stored value, so `0.35` becomes `"0.3"`.
/// - `1500.0` stays `"1500.0"`.
pub fn format_one_decimal(x: f64) -> String {
    // An f64 sits exactly on a `.x5` boundary only when `4x` is an odd
    // integer; `{:.1}` would send those to the even digit.
    let quarters = x * 4.0;
    let on_tie = quarters.fract() == 0.0 && quarters.abs() % 2.0 == 1.0;
    if on_tie {
        format!("{:.1}", x + 0.05 * x.signum())
    } else {
        format!("{:.1}", x)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
