//! Filter expression tree and its evaluation against attribute maps

use std::cmp::Ordering;

use crate::model::{AttributeValue, Attributes, Version};

/// Comparison operator of a simple filter item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

/// Piece of a substring pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuePart {
    Literal(String),
    Star,
}

/// Parsed match expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare {
        attr: String,
        op: CompareOp,
        value: String,
    },
    Present(String),
    Substring {
        attr: String,
        parts: Vec<ValuePart>,
    },
}

impl FilterExpr {
    /// Evaluate against `attributes`
    ///
    /// A missing attribute never matches a simple item.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            FilterExpr::And(items) => items.iter().all(|f| f.matches(attributes)),
            FilterExpr::Or(items) => items.iter().any(|f| f.matches(attributes)),
            FilterExpr::Not(inner) => !inner.matches(attributes),
            FilterExpr::Present(attr) => lookup(attributes, attr).is_some(),
            FilterExpr::Compare { attr, op, value } => lookup(attributes, attr)
                .map(|actual| compare(actual, *op, value))
                .unwrap_or(false),
            FilterExpr::Substring { attr, parts } => lookup(attributes, attr)
                .map(|actual| match actual {
                    AttributeValue::List(items) => {
                        items.iter().any(|item| substring_matches(item, parts))
                    }
                    other => substring_matches(&other.to_string(), parts),
                })
                .unwrap_or(false),
        }
    }
}

/// Attribute keys are matched exactly first, then case-insensitively
fn lookup<'a>(attributes: &'a Attributes, attr: &str) -> Option<&'a AttributeValue> {
    attributes.get(attr).or_else(|| {
        attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(attr))
            .map(|(_, v)| v)
    })
}

fn compare(actual: &AttributeValue, op: CompareOp, operand: &str) -> bool {
    match actual {
        AttributeValue::String(s) => compare_str(s, op, operand),
        AttributeValue::Long(n) => operand
            .trim()
            .parse::<i64>()
            .map(|o| ordering_satisfies(n.cmp(&o), op))
            .unwrap_or(false),
        AttributeValue::Version(v) => operand
            .parse::<Version>()
            .map(|o| ordering_satisfies(v.cmp(&o), op))
            .unwrap_or(false),
        AttributeValue::List(items) => items.iter().any(|item| compare_str(item, op, operand)),
    }
}

fn compare_str(actual: &str, op: CompareOp, operand: &str) -> bool {
    match op {
        CompareOp::Equal => actual == operand,
        CompareOp::Approx => normalize(actual) == normalize(operand),
        CompareOp::GreaterEq => actual >= operand,
        CompareOp::LessEq => actual <= operand,
    }
}

fn ordering_satisfies(ordering: Ordering, op: CompareOp) -> bool {
    match op {
        CompareOp::Equal | CompareOp::Approx => ordering == Ordering::Equal,
        CompareOp::GreaterEq => ordering != Ordering::Less,
        CompareOp::LessEq => ordering != Ordering::Greater,
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring_matches(actual: &str, parts: &[ValuePart]) -> bool {
    let mut rest = actual;
    let mut anchored = true;

    for (i, part) in parts.iter().enumerate() {
        match part {
            ValuePart::Star => anchored = false,
            ValuePart::Literal(lit) => {
                if anchored {
                    match rest.strip_prefix(lit.as_str()) {
                        Some(r) => rest = r,
                        None => return false,
                    }
                } else if i == parts.len() - 1 {
                    return rest.ends_with(lit.as_str());
                } else {
                    match rest.find(lit.as_str()) {
                        Some(pos) => rest = &rest[pos + lit.len()..],
                        None => return false,
                    }
                    anchored = true;
                }
            }
        }
    }

    matches!(parts.last(), Some(ValuePart::Star)) || rest.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn lit(s: &str) -> ValuePart {
        ValuePart::Literal(s.to_string())
    }

    #[test]
    fn test_substring() {
        let parts = vec![lit("org."), ValuePart::Star, lit(".api")];
        assert!(substring_matches("org.example.api", &parts));
        assert!(!substring_matches("org.example.impl", &parts));
        assert!(!substring_matches("com.example.api", &parts));

        let parts = vec![ValuePart::Star, lit("ex"), ValuePart::Star];
        assert!(substring_matches("org.example", &parts));
        assert!(!substring_matches("org.sample", &parts));
    }

    #[test]
    fn test_typed_comparison() {
        let a = attrs(&[
            ("version", AttributeValue::Version(Version::new(1, 5, 0))),
            ("size", AttributeValue::Long(10)),
        ]);
        let ge = FilterExpr::Compare {
            attr: "version".into(),
            op: CompareOp::GreaterEq,
            value: "1.10".into(),
        };
        // numeric, not lexicographic
        assert!(!ge.matches(&a));

        let le = FilterExpr::Compare {
            attr: "size".into(),
            op: CompareOp::LessEq,
            value: "9".into(),
        };
        assert!(!le.matches(&a));
        assert!(FilterExpr::Not(Box::new(le)).matches(&a));
    }

    #[test]
    fn test_approx_and_case_insensitive_keys() {
        let a = attrs(&[("Vendor", "Apache Software".into())]);
        let f = FilterExpr::Compare {
            attr: "vendor".into(),
            op: CompareOp::Approx,
            value: "apachesoftware".into(),
        };
        assert!(f.matches(&a));
    }

    #[test]
    fn test_missing_attribute() {
        let f = FilterExpr::Present("missing".into());
        assert!(!f.matches(&Attributes::new()));
    }
}
