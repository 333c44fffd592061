use tokio::time::Duration;

/// Parses a run-time string such as "30s", "10m", "2h", "1d" or a compound
/// like "1h30m" / "2m30s".
///
/// Supported units:
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
///
/// Each unit may appear at most once and units must go from largest to
/// smallest.
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration string cannot be empty".to_string());
    }

    let mut total_secs: u64 = 0;
    let mut digits = String::new();
    // Rank of the last unit seen; units must strictly decrease.
    let mut last_rank = u8::MAX;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let (rank, multiplier) = match ch {
            'd' => (3, 24 * 60 * 60),
            'h' => (2, 60 * 60),
            'm' => (1, 60),
            's' => (0, 1),
            _ if ch.is_alphabetic() => {
                return Err(format!(
                    "Unknown duration unit: '{}'. Use 's', 'm', 'h', or 'd'.",
                    ch
                ))
            }
            _ => return Err(format!("Invalid numeric value in duration: '{}'", s)),
        };

        if digits.is_empty() {
            return Err(format!("Invalid numeric value in duration: '{}'", s));
        }
        if rank >= last_rank {
            return Err(format!(
                "Duration units must be in descending order without repeats: '{}'",
                s
            ));
        }

        let value: u64 = digits
            .parse()
            .map_err(|_| format!("Invalid numeric value in duration: '{}'", digits))?;
        total_secs = value
            .checked_mul(multiplier)
            .and_then(|v| total_secs.checked_add(v))
            .ok_or_else(|| format!("Duration is too large: '{}'", s))?;

        digits.clear();
        last_rank = rank;
    }

    if !digits.is_empty() {
        return Err(format!(
            "Missing duration unit after '{}'. Use 's', 'm', 'h', or 'd'.",
            digits
        ));
    }

    Ok(Duration::from_secs(total_secs))
}

/// Parses a non-negative number of seconds, allowing fractions ("0.5").
pub fn parse_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number of seconds: '{}'", s))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!(
            "Seconds must be a finite, non-negative number: '{}'",
            s
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod duration {
        use super::*;

        #[test]
        fn parse_single_units() {
            assert_eq!(parse_duration_string("30s").unwrap(), Duration::from_secs(30));
            assert_eq!(parse_duration_string("2m").unwrap(), Duration::from_secs(120));
            assert_eq!(parse_duration_string("5h").unwrap(), Duration::from_secs(18000));
            assert_eq!(parse_duration_string("3d").unwrap(), Duration::from_secs(259200));
        }

        #[test]
        fn parse_compound() {
            assert_eq!(
                parse_duration_string("1h30m").unwrap(),
                Duration::from_secs(5400)
            );
            assert_eq!(
                parse_duration_string("2m30s").unwrap(),
                Duration::from_secs(150)
            );
        }

        #[test]
        fn parse_zero() {
            assert_eq!(parse_duration_string("0s").unwrap(), Duration::ZERO);
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                parse_duration_string("  10m  ").unwrap(),
                Duration::from_secs(600)
            );
        }

        #[test]
        fn empty_string_errors() {
            let err = parse_duration_string("   ").unwrap_err();
            assert!(err.contains("empty"), "error was: {}", err);
        }

        #[test]
        fn unknown_suffix_errors() {
            let err = parse_duration_string("10x").unwrap_err();
            assert!(err.contains("Unknown duration unit"), "error was: {}", err);
        }

        #[test]
        fn no_suffix_errors() {
            let err = parse_duration_string("10").unwrap_err();
            assert!(err.contains("Missing duration unit"), "error was: {}", err);
        }

        #[test]
        fn no_number_errors() {
            let err = parse_duration_string("m").unwrap_err();
            assert!(err.contains("Invalid numeric"), "error was: {}", err);
        }

        #[test]
        fn fractional_and_negative_error() {
            assert!(parse_duration_string("5.5h").is_err());
            assert!(parse_duration_string("-5m").is_err());
        }

        #[test]
        fn out_of_order_units_error() {
            let err = parse_duration_string("30m1h").unwrap_err();
            assert!(err.contains("descending"), "error was: {}", err);
            assert!(parse_duration_string("1m1m").is_err());
        }
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1").unwrap(), 1.0);
        assert_eq!(parse_seconds(" 0.25 ").unwrap(), 0.25);
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("abc").is_err());
    }
}
