//! `Condition`: a single-property predicate (§4.9).

use regex::Regex;

use crate::error::{EngineError, QueryError, Result};
use crate::value::{PropertyType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    IsNull,
    NotNull,
    Equal,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Contain,
    BeginWith,
    EndWith,
    Like,
    Regex,
    In,
    Between,
    BetweenNoUpper,
    BetweenNoLower,
    BetweenNoBound,
}

impl Comparator {
    /// Range-shaped comparators the planner can in principle serve from a
    /// numeric index's ordered sub-dbs. Kept distinct from the set the
    /// planner actually exploits today (`is_planner_indexable`, EQUAL-only
    /// per §9 open question (a)) so the two decisions stay independently
    /// greppable.
    pub fn is_range_shaped(self) -> bool {
        matches!(
            self,
            Comparator::Greater
                | Comparator::GreaterEqual
                | Comparator::Less
                | Comparator::LessEqual
                | Comparator::Between
                | Comparator::BetweenNoUpper
                | Comparator::BetweenNoLower
                | Comparator::BetweenNoBound
        )
    }

    /// The planner's actually-supported index comparator set. The reference
    /// implementation's `validComparators` table only ever registers EQUAL;
    /// we document rather than silently "fix" that restriction (§9 open
    /// question (a)). Range-capable index cursors still exist in
    /// `crate::index` for completeness, but the evaluator only calls them
    /// for EQUAL today.
    pub fn is_planner_indexable(self) -> bool {
        matches!(self, Comparator::Equal)
    }
}

/// A single predicate over one named property (§4.9).
#[derive(Debug, Clone)]
pub struct Condition {
    pub property_name: String,
    pub comparator: Comparator,
    pub value: Option<Value>,
    pub value_set: Vec<Value>,
    pub case_insensitive: bool,
    pub negative: bool,
}

impl Condition {
    pub fn new(property_name: impl Into<String>, comparator: Comparator) -> Self {
        Self {
            property_name: property_name.into(),
            comparator,
            value: None,
            value_set: Vec::new(),
            case_insensitive: false,
            negative: false,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_value_set(mut self, values: Vec<Value>) -> Self {
        self.value_set = values;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn negate(mut self) -> Self {
        self.negative = true;
        self
    }

    /// Evaluates this condition against an already-decoded property value.
    /// `stored` is `None` when the property is absent from the record
    /// (treated identically to an explicit `Value::Null`, §4.9 "empty bytes
    /// = null").
    pub fn evaluate(&self, stored: Option<&Value>, property_type: PropertyType) -> Result<bool> {
        let is_null = stored.map(Value::is_null).unwrap_or(true);
        let result = match self.comparator {
            Comparator::IsNull => is_null,
            Comparator::NotNull => !is_null,
            _ if is_null => false,
            _ => self.evaluate_non_null(stored.expect("checked is_null above"), property_type)?,
        };
        Ok(result ^ self.negative)
    }

    fn evaluate_non_null(&self, stored: &Value, property_type: PropertyType) -> Result<bool> {
        if property_type == PropertyType::Blob {
            return match self.comparator {
                Comparator::Equal => Ok(self.value.as_ref().map(|v| v.as_blob() == stored.as_blob()).unwrap_or(false)),
                _ => Err(QueryError::InvalidComparator.into()),
            };
        }

        match self.comparator {
            Comparator::Equal => Ok(self.numeric_or_text_cmp(stored)? == std::cmp::Ordering::Equal),
            Comparator::Greater => Ok(self.numeric_or_text_cmp(stored)? == std::cmp::Ordering::Less),
            Comparator::Less => Ok(self.numeric_or_text_cmp(stored)? == std::cmp::Ordering::Greater),
            Comparator::GreaterEqual => Ok(self.numeric_or_text_cmp(stored)? != std::cmp::Ordering::Greater),
            Comparator::LessEqual => Ok(self.numeric_or_text_cmp(stored)? != std::cmp::Ordering::Less),
            Comparator::Contain => self.text_test(stored, |h, n| h.contains(n)),
            Comparator::BeginWith => self.text_test(stored, |h, n| h.starts_with(n)),
            Comparator::EndWith => self.text_test(stored, |h, n| h.ends_with(n)),
            Comparator::Like => self.like_test(stored),
            Comparator::Regex => self.regex_test(stored),
            Comparator::In => Ok(self
                .value_set
                .iter()
                .any(|candidate| self.eq_values(candidate, stored))),
            Comparator::Between
            | Comparator::BetweenNoUpper
            | Comparator::BetweenNoLower
            | Comparator::BetweenNoBound => self.between_test(stored),
            Comparator::IsNull | Comparator::NotNull => unreachable!("handled before null check"),
        }
    }

    fn eq_values(&self, a: &Value, b: &Value) -> bool {
        if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
            return x == y;
        }
        match (a.as_text(), b.as_text()) {
            (Some(x), Some(y)) => self.text_eq(x, y),
            _ => false,
        }
    }

    fn text_eq(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.to_ascii_lowercase() == b.to_ascii_lowercase()
        } else {
            a == b
        }
    }

    fn numeric_or_text_cmp(&self, stored: &Value) -> Result<std::cmp::Ordering> {
        let value = self.value.as_ref().ok_or(QueryError::InvalidComparator)?;
        if let (Some(a), Some(b)) = (value.as_f64(), stored.as_f64()) {
            return a.partial_cmp(&b).ok_or_else(|| QueryError::InvalidComparator.into());
        }
        match (value.as_text(), stored.as_text()) {
            (Some(a), Some(b)) => {
                if self.case_insensitive {
                    Ok(a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()))
                } else {
                    Ok(a.cmp(b))
                }
            }
            _ => Err(QueryError::InvalidComparator.into()),
        }
    }

    fn text_test(&self, stored: &Value, test: impl Fn(&str, &str) -> bool) -> Result<bool> {
        let needle = self.value.as_ref().and_then(Value::as_text).ok_or(QueryError::InvalidComparator)?;
        let haystack = stored.as_text().ok_or(QueryError::InvalidComparator)?;
        if self.case_insensitive {
            Ok(test(&haystack.to_ascii_lowercase(), &needle.to_ascii_lowercase()))
        } else {
            Ok(test(haystack, needle))
        }
    }

    fn like_test(&self, stored: &Value) -> Result<bool> {
        let pattern = self.value.as_ref().and_then(Value::as_text).ok_or(QueryError::InvalidComparator)?;
        let haystack = stored.as_text().ok_or(QueryError::InvalidComparator)?;
        let regex = compile_like_pattern(pattern, self.case_insensitive)?;
        Ok(regex.is_match(haystack))
    }

    fn regex_test(&self, stored: &Value) -> Result<bool> {
        let pattern = self.value.as_ref().and_then(Value::as_text).ok_or(QueryError::InvalidComparator)?;
        let haystack = stored.as_text().ok_or(QueryError::InvalidComparator)?;
        let regex = compile_regex(pattern, self.case_insensitive)?;
        Ok(regex.is_match(haystack))
    }

    fn between_test(&self, stored: &Value) -> Result<bool> {
        if self.value_set.len() != 2 {
            return Err(QueryError::InvalidComparator.into());
        }
        let lo = self.value_set[0].as_f64().ok_or(QueryError::InvalidComparator)?;
        let hi = self.value_set[1].as_f64().ok_or(QueryError::InvalidComparator)?;
        let v = stored.as_f64().ok_or(QueryError::InvalidComparator)?;
        let above_lo = match self.comparator {
            Comparator::Between | Comparator::BetweenNoUpper => v >= lo,
            Comparator::BetweenNoLower | Comparator::BetweenNoBound => v > lo,
            _ => unreachable!(),
        };
        let below_hi = match self.comparator {
            Comparator::Between | Comparator::BetweenNoLower => v <= hi,
            Comparator::BetweenNoUpper | Comparator::BetweenNoBound => v < hi,
            _ => unreachable!(),
        };
        Ok(above_lo && below_hi)
    }
}

fn regex_from_pattern(pattern: &str, case_insensitive: bool) -> std::result::Result<Regex, regex::Error> {
    if case_insensitive {
        Regex::new(&format!("(?i){pattern}"))
    } else {
        Regex::new(pattern)
    }
}

fn regex_error(e: regex::Error) -> EngineError {
    EngineError::Query(QueryError::InvalidRegex(e.to_string()))
}

/// Compiles a REGEX condition's pattern. The whole stored value must match,
/// not merely contain a match, so the pattern is wrapped in start/end
/// anchors before compiling.
fn compile_regex(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    let anchored = format!("^(?:{pattern})$");
    regex_from_pattern(&anchored, case_insensitive).map_err(regex_error)
}

fn compile_like_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() * 2);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            c if "\\.+*?()|[]{}^$#&~".contains(c) => {
                translated.push('\\');
                translated.push(c);
            }
            c => translated.push(c),
        }
    }
    translated.push('$');
    regex_from_pattern(&translated, case_insensitive).map_err(regex_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_condition_matches_numeric_value() {
        let cond = Condition::new("age", Comparator::Equal).with_value(Value::Integer(5));
        assert!(cond.evaluate(Some(&Value::Integer(5)), PropertyType::Integer).unwrap());
        assert!(!cond.evaluate(Some(&Value::Integer(6)), PropertyType::Integer).unwrap());
    }

    #[test]
    fn negated_condition_flips_result() {
        let cond = Condition::new("age", Comparator::Equal).with_value(Value::Integer(5)).negate();
        assert!(!cond.evaluate(Some(&Value::Integer(5)), PropertyType::Integer).unwrap());
    }

    #[test]
    fn is_null_and_not_null() {
        let is_null = Condition::new("name", Comparator::IsNull);
        assert!(is_null.evaluate(None, PropertyType::Text).unwrap());
        assert!(is_null.evaluate(Some(&Value::Null), PropertyType::Text).unwrap());
        assert!(!is_null.evaluate(Some(&Value::Text("x".into())), PropertyType::Text).unwrap());

        let not_null = Condition::new("name", Comparator::NotNull);
        assert!(not_null.evaluate(Some(&Value::Text("x".into())), PropertyType::Text).unwrap());
    }

    #[test]
    fn like_translates_percent_and_underscore() {
        let cond = Condition::new("name", Comparator::Like).with_value(Value::Text("a%c_".into()));
        assert!(cond.evaluate(Some(&Value::Text("abcd".into())), PropertyType::Text).unwrap());
        assert!(!cond.evaluate(Some(&Value::Text("abc".into())), PropertyType::Text).unwrap());
    }

    #[test]
    fn case_insensitive_contain() {
        let cond = Condition::new("name", Comparator::Contain)
            .with_value(Value::Text("HEL".into()))
            .case_insensitive();
        assert!(cond.evaluate(Some(&Value::Text("hello".into())), PropertyType::Text).unwrap());
    }

    #[test]
    fn between_no_upper_excludes_upper_bound() {
        let cond = Condition::new("age", Comparator::BetweenNoUpper)
            .with_value_set(vec![Value::Integer(0), Value::Integer(10)]);
        assert!(cond.evaluate(Some(&Value::Integer(10)), PropertyType::Integer).unwrap());
        // BetweenNoUpper only excludes the *upper* sub-condition below_hi check;
        // verify a value at the boundary of BetweenNoBound is excluded on both ends.
        let strict = Condition::new("age", Comparator::BetweenNoBound)
            .with_value_set(vec![Value::Integer(0), Value::Integer(10)]);
        assert!(!strict.evaluate(Some(&Value::Integer(10)), PropertyType::Integer).unwrap());
        assert!(!strict.evaluate(Some(&Value::Integer(0)), PropertyType::Integer).unwrap());
        assert!(strict.evaluate(Some(&Value::Integer(5)), PropertyType::Integer).unwrap());
    }

    #[test]
    fn blob_only_supports_equal() {
        let cond = Condition::new("payload", Comparator::Contain).with_value(Value::Blob(vec![1]));
        let err = cond.evaluate(Some(&Value::Blob(vec![1])), PropertyType::Blob).unwrap_err();
        assert!(matches!(err, EngineError::Query(QueryError::InvalidComparator)));
    }
}
