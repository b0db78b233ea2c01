use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::str::FromStr;
use tabcompare_common::ValueError;
use tracing::trace;

/// Default value equality used for non-numeric columns
///
/// Besides plain string equality, an expected value can be an `@{...}`
/// expression checking the actual value, e.g. `@{isNotEmpty}`,
/// `@{pattern('[A-Z]{3}')}` or `@{asNumber(10.5, 0.01)}`. Expressions that are
/// not recognized are compared literally.
#[derive(Debug, Clone)]
pub struct ComparisonUtils {
    special_values: bool,
}

impl ComparisonUtils {
    pub fn new() -> Self {
        Self {
            special_values: true,
        }
    }

    pub fn with_special_values(mut self, enabled: bool) -> Self {
        self.special_values = enabled;
        self
    }

    pub fn compare_values(
        &self,
        column: &str,
        expected: Option<&str>,
        actual: Option<&str>,
    ) -> Result<bool, ValueError> {
        if self.special_values {
            if let Some(expression) = expected {
                trace!("Checking actual value {:?} using expression '{}'", actual, expression);
                if let Some(result) = self.evaluate(column, expression.trim(), actual)? {
                    return Ok(result);
                }
            }
        }
        Ok(expected == actual)
    }

    fn evaluate(
        &self,
        column: &str,
        expression: &str,
        actual: Option<&str>,
    ) -> Result<Option<bool>, ValueError> {
        let body = match expression.strip_prefix("@{").and_then(|e| e.strip_suffix('}')) {
            Some(body) => body,
            None => return Ok(None),
        };
        let (name, params) = match body.find('(') {
            Some(pos) if body.ends_with(')') => (&body[..pos], Some(&body[pos + 1..body.len() - 1])),
            _ => (body, None),
        };
        let invalid = |reason: String| ValueError::InvalidExpression {
            column: column.to_string(),
            expression: expression.to_string(),
            reason,
        };

        let result = match (name, params) {
            ("isNull" | "isNotPresent" | "isNotSet", None) => actual.is_none(),
            ("isNotNull" | "isPresent" | "isSet", None) => actual.is_some(),
            ("isEmpty", None) => actual == Some(""),
            ("isNotEmpty", None) => actual.map_or(false, |a| !a.is_empty()),
            ("isNullOrEmpty" | "isNotPresentOrEmpty" | "isNotSetOrEmpty", None) => {
                actual.map_or(true, str::is_empty)
            }
            ("isAnyValue", None) => true,
            ("isNumber", None) => actual.and_then(parse_number).is_some(),
            ("isInteger", None) => actual.map_or(false, is_integer),
            ("isFloat", None) => actual.map_or(false, is_float),
            ("pattern", Some(p)) => {
                let regex = Regex::new(&format!("^(?:{})$", unquote(p)))
                    .map_err(|e| invalid(e.to_string()))?;
                actual.map_or(false, |a| regex.is_match(a))
            }
            ("asNumber", Some(p)) => numbers_equal(p, actual, false, false).map_err(invalid)?,
            ("asAbsNumber", Some(p)) => numbers_equal(p, actual, true, false).map_err(invalid)?,
            ("isNotEqualNumber", Some(p)) => numbers_equal(p, actual, false, true).map_err(invalid)?,
            ("isNotEqualText", Some(p)) => actual != Some(unquote(p)),
            ("isGreaterThan", Some(p)) => compare_number(column, p, actual, &invalid)? == Ordering::Greater,
            ("isGreaterOrEqual", Some(p)) => compare_number(column, p, actual, &invalid)? != Ordering::Less,
            ("isLessThan", Some(p)) => compare_number(column, p, actual, &invalid)? == Ordering::Less,
            ("isLessOrEqual", Some(p)) => compare_number(column, p, actual, &invalid)? != Ordering::Greater,
            _ => return Ok(None),
        };
        Ok(Some(result))
    }
}

impl Default for ComparisonUtils {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a plain or scientific decimal number
pub fn parse_number(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let value = value.strip_prefix('+').unwrap_or(value);
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

const SIGNS: &[char] = &['+', '-'];

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn is_integer(value: &str) -> bool {
    all_digits(value.strip_prefix(SIGNS).unwrap_or(value))
}

fn is_float(value: &str) -> bool {
    let unsigned = value.strip_prefix(SIGNS).unwrap_or(value);
    match unsigned.split_once(&['.', ','][..]) {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => false,
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .unwrap_or(value)
}

/// `asNumber(expected[, error[, scale]])` and its variants
fn numbers_equal(
    params: &str,
    actual: Option<&str>,
    abs: bool,
    invert: bool,
) -> Result<bool, String> {
    let params: Vec<&str> = params.split(',').map(unquote).collect();
    if params.is_empty() || params.len() > 3 || params[0].is_empty() {
        return Err(format!("expected 1 to 3 parameters, got {}", params.len()));
    }
    let mut expected = parse_number(params[0])
        .ok_or_else(|| format!("expected value '{}' is not a number", params[0]))?;
    let error = match params.get(1).filter(|p| !p.is_empty()) {
        Some(p) => Some(parse_number(p).ok_or_else(|| format!("error '{}' is not a number", p))?),
        None => None,
    };
    let scale = match params.get(2).filter(|p| !p.is_empty()) {
        Some(p) => Some(
            p.parse::<u32>()
                .map_err(|_| format!("scale '{}' is not a non-negative integer", p))?,
        ),
        None => None,
    };

    let mut actual = match actual.and_then(parse_number) {
        Some(a) => a,
        None => return Ok(false),
    };

    if abs {
        expected = expected.abs();
        actual = actual.abs();
    }
    if let Some(scale) = scale {
        expected = expected.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
        actual = actual.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    }

    let equal = match error {
        None => expected == actual,
        Some(error) => expected
            .checked_sub(actual)
            .map_or(false, |diff| diff.abs() < error),
    };
    Ok(invert != equal)
}

/// Orders the actual value against the expression's single number
fn compare_number(
    column: &str,
    param: &str,
    actual: Option<&str>,
    invalid: &dyn Fn(String) -> ValueError,
) -> Result<Ordering, ValueError> {
    let param = unquote(param);
    let expected = parse_number(param)
        .ok_or_else(|| invalid(format!("'{}' is not a number", param)))?;
    let actual_value = actual.unwrap_or("");
    let actual = parse_number(actual_value).ok_or_else(|| ValueError::NotANumber {
        column: column.to_string(),
        value: actual_value.to_string(),
    })?;
    Ok(actual.cmp(&expected))
}
