//! Display formatting for on-chain amounts and fiat values.

/// Decimals of the native TON coin (1 TON = 10^9 nanotons).
pub const TON_DECIMALS: u8 = 9;

/// Render a raw integer amount with `decimals` fractional digits,
/// trimming trailing zeros: `1_500_000_000` with 9 decimals → `"1.5"`.
///
/// Works on the decimal string so any `decimals` value is safe.
pub fn format_units(raw: u128, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return group_thousands(&digits);
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        group_thousands(int_part)
    } else {
        format!("{}.{}", group_thousands(int_part), frac_part)
    }
}

/// Convert a raw integer amount to a floating-point number of whole units.
pub fn units_to_f64(raw: u128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(i32::from(decimals))
}

/// Format a fiat value with two decimals and a currency marker:
/// `"$1,204.50"`, `"€3.10"`, or `"12.00 PLN"` for codes without a symbol.
pub fn format_fiat(value: f64, currency: &str) -> String {
    let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
    let fixed = format!("{value:.2}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let amount = format!("{}.{}", group_thousands(int_part), frac_part);

    match currency.to_uppercase().as_str() {
        "USD" => format!("${amount}"),
        "EUR" => format!("€{amount}"),
        "GBP" => format!("£{amount}"),
        other => format!("{amount} {other}"),
    }
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
