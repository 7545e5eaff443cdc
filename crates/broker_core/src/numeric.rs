use log::warn;

/// Result of cleaning one numeric cell.
///
/// `coerced` is set when the raw value could not be converted and 0.0 was
/// substituted, so callers can count data-quality problems instead of
/// mistaking them for genuine zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedAmount {
    pub value: f64,
    pub coerced: bool,
}

impl ParsedAmount {
    fn clean(value: f64) -> Self {
        ParsedAmount {
            value,
            coerced: false,
        }
    }

    fn coerced_zero() -> Self {
        ParsedAmount {
            value: 0.0,
            coerced: true,
        }
    }
}

/// Clean and convert a locale-formatted amount cell.
///
/// Strips the `$` currency marker, thousands-separator commas and interior
/// spaces, and treats a minus sign anywhere in the value as negation.
/// Conversion failures soft-fail to 0.0 rather than failing the row.
pub fn parse_amount(raw: &str) -> ParsedAmount {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedAmount::coerced_zero();
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|&c| !matches!(c, '$' | ',' | ' ' | '\u{00A0}'))
        .collect();

    let is_negative = cleaned.contains('-');
    let unsigned: String = cleaned.chars().filter(|&c| c != '-').collect();

    match unsigned.parse::<f64>() {
        Ok(value) => ParsedAmount::clean(if is_negative { -value } else { value }),
        Err(_) => {
            warn!("could not convert amount '{}', using 0.0", raw);
            ParsedAmount::coerced_zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_formatted_amount() {
        assert_eq!(parse_amount("$ 1,234.56").value, 1234.56);
        assert!(!parse_amount("$ 1,234.56").coerced);
    }

    #[test]
    fn test_parse_negative_amount() {
        assert_eq!(parse_amount("-500").value, -500.0);
        assert_eq!(parse_amount("$ -1,000.25").value, -1000.25);
    }

    #[test]
    fn test_idempotent_on_clean_strings() {
        let first = parse_amount("1234.56");
        let again = parse_amount(&first.value.to_string());
        assert_eq!(first.value, again.value);
    }

    #[test]
    fn test_unparseable_coerces_to_zero() {
        let parsed = parse_amount("not a number");
        assert_eq!(parsed.value, 0.0);
        assert!(parsed.coerced);
    }

    #[test]
    fn test_empty_coerces_to_zero() {
        let parsed = parse_amount("   ");
        assert_eq!(parsed.value, 0.0);
        assert!(parsed.coerced);
    }
}
