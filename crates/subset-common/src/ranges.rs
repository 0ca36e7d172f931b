//! Compact integer-range expressions.
//!
//! The combinatorial date-selection path accepts year, month, and day lists
//! written as `"START-END"` or `"START-END+INCREMENT"`, where `END` may be
//! the literal `N` meaning "the maximum allowed value".

/// Parse a range expression into an ascending integer sequence.
///
/// `max_value` bounds the range end and substitutes for the literal `N`.
/// The increment defaults to 1; the end point is included only when it
/// lands exactly on a step.
pub fn parse_range(expr: &str, max_value: Option<u32>) -> Result<Vec<u32>, RangeParseError> {
    let malformed = || RangeParseError::Malformed(expr.to_string());

    let (start_str, rest) = expr.split_once('-').ok_or_else(malformed)?;
    if rest.contains('-') {
        return Err(malformed());
    }

    let (end_str, increment) = match rest.split_once('+') {
        Some((end_str, inc_str)) => {
            let inc: u32 = inc_str.trim().parse().map_err(|_| malformed())?;
            if inc == 0 {
                return Err(malformed());
            }
            (end_str, inc)
        }
        None => (rest, 1),
    };

    let start: u32 = start_str.trim().parse().map_err(|_| malformed())?;
    let end: u32 = match end_str.trim() {
        "N" => max_value.ok_or_else(|| RangeParseError::NoMaximum(expr.to_string()))?,
        s => s.parse().map_err(|_| malformed())?,
    };

    if start > end {
        return Err(RangeParseError::StartAfterEnd(expr.to_string()));
    }
    if start == 0 || end == 0 {
        return Err(RangeParseError::NonPositive(expr.to_string()));
    }
    if let Some(max) = max_value {
        if end > max {
            return Err(RangeParseError::ExceedsMax {
                expr: expr.to_string(),
                max,
            });
        }
    }

    Ok((start..=end).step_by(increment as usize).collect())
}

#[derive(Debug, thiserror::Error)]
pub enum RangeParseError {
    #[error("Invalid range expression: {0}")]
    Malformed(String),
    #[error("Range start cannot exceed range end: {0}")]
    StartAfterEnd(String),
    #[error("Range values must be positive: {0}")]
    NonPositive(String),
    #[error("Range end exceeds the maximum allowed value ({max}): {expr}")]
    ExceedsMax { expr: String, max: u32 },
    #[error("Open-ended range used where no maximum is defined: {0}")]
    NoMaximum(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_range() {
        assert_eq!(parse_range("1-5", None).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_range("7-7", None).unwrap(), vec![7]);
    }

    #[test]
    fn test_parse_with_increment() {
        assert_eq!(parse_range("1-10+2", None).unwrap(), vec![1, 3, 5, 7, 9]);
        // End point included when it lands on a step
        assert_eq!(parse_range("1-9+2", None).unwrap(), vec![1, 3, 5, 7, 9]);
        assert_eq!(parse_range("2-12+5", None).unwrap(), vec![2, 7, 12]);
    }

    #[test]
    fn test_parse_n_substitution() {
        assert_eq!(parse_range("1-N", Some(5)).unwrap(), vec![1, 2, 3, 4, 5]);
        assert!(matches!(
            parse_range("1-N", None),
            Err(RangeParseError::NoMaximum(_))
        ));
    }

    #[test]
    fn test_reversed_bounds() {
        assert!(matches!(
            parse_range("5-1", None),
            Err(RangeParseError::StartAfterEnd(_))
        ));
    }

    #[test]
    fn test_non_positive_bounds() {
        assert!(matches!(
            parse_range("0-3", None),
            Err(RangeParseError::NonPositive(_))
        ));
    }

    #[test]
    fn test_end_above_max() {
        assert!(matches!(
            parse_range("1-400", Some(366)),
            Err(RangeParseError::ExceedsMax { max: 366, .. })
        ));
        // At the maximum is fine
        assert_eq!(parse_range("365-366", Some(366)).unwrap(), vec![365, 366]);
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in ["17", "1-2-3", "a-5", "1-b", "1-5+", "1-5+x", "1-5+0", ""] {
            assert!(
                matches!(parse_range(expr, None), Err(RangeParseError::Malformed(_))),
                "expected malformed error for {:?}",
                expr
            );
        }
    }
}
