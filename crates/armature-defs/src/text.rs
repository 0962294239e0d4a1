//! Attribute value grammar: whitespace separated floats, `NaN` meaning unset.

use nalgebra::Vector3;

/// Parse a single float token. The literal `NaN` is accepted as the unset
/// sentinel; `inf` and friends are not.
pub(crate) fn parse_float(token: &str) -> Result<f64, String> {
    let token = token.trim();
    if token == "NaN" {
        return Ok(f64::NAN);
    }
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("'{token}' is not a number")),
    }
}

/// Parse exactly `N` whitespace separated floats.
pub(crate) fn parse_floats<const N: usize>(text: &str) -> Result<[f64; N], String> {
    let mut values = [0.0; N];
    let mut count = 0;
    for token in text.split_whitespace() {
        if count == N {
            return Err(format!("expected {N} components, found more in '{text}'"));
        }
        values[count] = parse_float(token)?;
        count += 1;
    }
    if count != N {
        return Err(format!("expected {N} components, found {count} in '{text}'"));
    }
    Ok(values)
}

pub(crate) fn parse_vector3(text: &str) -> Result<Vector3<f64>, String> {
    parse_floats::<3>(text).map(Vector3::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_token_is_unset() {
        assert!(parse_float("NaN").unwrap().is_nan());
        assert!(parse_float("nan").is_err());
    }

    #[test]
    fn test_component_count_is_exact() {
        assert_eq!(parse_floats::<3>(" 1 2.5\t-3 ").unwrap(), [1.0, 2.5, -3.0]);
        assert!(parse_floats::<3>("1 2").is_err());
        assert!(parse_floats::<3>("1 2 3 4").is_err());
        assert!(parse_floats::<1>("abc").is_err());
    }

    #[test]
    fn test_mixed_sentinel() {
        let v = parse_vector3("0.1 NaN 0.3").unwrap();
        assert_eq!(v.x, 0.1);
        assert!(v.y.is_nan());
    }
}
