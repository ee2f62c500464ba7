use crate::error::InputParseError;

/// Parse a comma-separated batch of readings such as `"36.5, 38.1, 37.0"`
///
/// The batch is all-or-nothing: the first empty, non-numeric or non-finite
/// token rejects the whole input. Positions in errors are 1-based.
pub fn parse_readings(input: &str) -> Result<Vec<f64>, InputParseError> {
    if input.trim().is_empty() {
        return Err(InputParseError::Empty);
    }

    input
        .split(',')
        .enumerate()
        .map(|(index, raw)| {
            let position = index + 1;
            let token = raw.trim();
            if token.is_empty() {
                return Err(InputParseError::EmptyToken { position });
            }
            let value: f64 = token
                .parse()
                .map_err(|_| InputParseError::InvalidNumber {
                    position,
                    token: token.to_string(),
                })?;
            if !value.is_finite() {
                return Err(InputParseError::NonFinite {
                    position,
                    token: token.to_string(),
                });
            }
            Ok(value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        assert_eq!(
            parse_readings("36.5, 38.1,37.0").unwrap(),
            vec![36.5, 38.1, 37.0]
        );
        assert_eq!(parse_readings(" 37 ").unwrap(), vec![37.0]);
        assert_eq!(parse_readings("-1e1").unwrap(), vec![-10.0]);
    }

    #[test]
    fn test_rejects_non_numeric_token() {
        assert_eq!(
            parse_readings("36.5, abc, 37"),
            Err(InputParseError::InvalidNumber {
                position: 2,
                token: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_empty_input_and_tokens() {
        assert_eq!(parse_readings(""), Err(InputParseError::Empty));
        assert_eq!(parse_readings("  \t"), Err(InputParseError::Empty));
        assert_eq!(
            parse_readings("36.5,,37"),
            Err(InputParseError::EmptyToken { position: 2 })
        );
        assert_eq!(
            parse_readings("36.5,"),
            Err(InputParseError::EmptyToken { position: 2 })
        );
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(matches!(
            parse_readings("NaN"),
            Err(InputParseError::NonFinite { position: 1, .. })
        ));
        assert!(matches!(
            parse_readings("36.6, inf"),
            Err(InputParseError::NonFinite { position: 2, .. })
        ));
    }
}
