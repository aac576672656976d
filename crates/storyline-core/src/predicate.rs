//! Compiles declarative conditions (`{"gt": 5, "lte": 20}`) into predicates.
//!
//! Operators form a closed set. A key outside that set compiles to a clause
//! that never matches, so a malformed table row contributes nothing instead of
//! aborting the build.

use crate::types::{Point, Properties};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Operator key to threshold; keys are ANDed.
pub type Condition = BTreeMap<String, Value>;

/// Anything a predicate can read named attributes from.
pub trait Attributed {
    fn attribute(&self, name: &str) -> Option<Value>;
}

impl Attributed for Properties {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Attributed for Point {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.field(name)
    }
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
}

impl Operator {
    pub fn parse(key: &str) -> Option<Operator> {
        match key {
            "eq" => Some(Operator::Eq),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "ne" => Some(Operator::Ne),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Ne => "ne",
        }
    }

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Ne => ord != Ordering::Equal,
            Operator::Lt => ord == Ordering::Less,
            Operator::Lte => ord != Ordering::Greater,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Gte => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Compare { op: Operator, threshold: Value },
    /// Unrecognized operator key.
    Never,
}

impl Clause {
    fn test(&self, value: &Value) -> bool {
        match self {
            Clause::Never => false,
            Clause::Compare { op, threshold } => match compare(value, threshold) {
                Some(ord) => op.accepts(ord),
                // Incomparable values only differ.
                None => *op == Operator::Ne,
            },
        }
    }
}

fn compare(value: &Value, threshold: &Value) -> Option<Ordering> {
    match (value, threshold) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// A compiled condition bound to one attribute name.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    attribute: String,
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Matches everything.
    pub fn always(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            clauses: Vec::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn matches<C: Attributed + ?Sized>(&self, candidate: &C) -> bool {
        if self.clauses.is_empty() {
            return true;
        }
        let Some(value) = candidate.attribute(&self.attribute) else {
            return false;
        };
        self.clauses.iter().all(|c| c.test(&value))
    }

    /// Keeps the candidates that satisfy every clause, in order.
    pub fn filter<T: Attributed>(&self, candidates: Vec<T>) -> Vec<T> {
        candidates.into_iter().filter(|c| self.matches(c)).collect()
    }
}

pub fn compile(condition: &Condition, attribute: &str) -> Predicate {
    let clauses = condition
        .iter()
        .map(|(key, threshold)| match Operator::parse(key) {
            Some(op) => Clause::Compare {
                op,
                threshold: threshold.clone(),
            },
            None => {
                tracing::warn!(operator = %key, attribute, "unknown condition operator; clause never matches");
                Clause::Never
            }
        })
        .collect();
    Predicate {
        attribute: attribute.to_string(),
        clauses,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
