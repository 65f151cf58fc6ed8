use std::fmt;

/// Money is stored as integer cents so sums never drift.
/// 1 unit = 100 cents, so $50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a plain decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// Only plain decimal notation is accepted. Anything else ("NaN", "inf",
/// "1e3", "") is rejected, so an invalid amount can never be stored.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !is_ascii_digits(units_str) || !is_ascii_digits(decimal_str) {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    // Pad or truncate the fractional part to exactly two digits
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

/// Parse an amount that must not be negative (expenses, savings, targets).
pub fn parse_non_negative_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let cents = parse_cents(input)?;
    if cents < 0 {
        return Err(ParseCentsError::Negative);
    }
    Ok(cents)
}

fn is_ascii_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Negative,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Negative => write!(f, "amount must not be negative"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(7550), "75.50");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-3000), "-30.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("25.5"), Ok(2550));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("7."), Ok(700));
        assert_eq!(parse_cents("+3"), Ok(300));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents(" 12.34 "), Ok(1234));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_rejects_non_numeric() {
        for input in ["", ".", "-", "abc", "NaN", "inf", "1e3", "12.34.56", "1.-5", "--5"] {
            assert_eq!(
                parse_cents(input),
                Err(ParseCentsError::InvalidFormat),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_cents_overflow() {
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::Overflow)
        );
        assert_eq!(
            parse_cents("922337203685477580"),
            Err(ParseCentsError::Overflow)
        );
    }

    #[test]
    fn test_parse_non_negative_cents() {
        assert_eq!(parse_non_negative_cents("0"), Ok(0));
        assert_eq!(parse_non_negative_cents("10.10"), Ok(1010));
        assert_eq!(
            parse_non_negative_cents("-1"),
            Err(ParseCentsError::Negative)
        );
    }
}
