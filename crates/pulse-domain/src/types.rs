//! Data-type tags and the `Value` variant, with the soft-cast combinators
//! that replace runtime type sniffing (spec §9 redesign: "soft casting
//! becomes explicit variant-conversion combinators").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed enumeration of port data types. `Domain(String)` covers the
/// "plus domain tags used by specific node families" clause without
/// requiring every node family to be known to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Flow,
    ProviderFlow,
    Any,
    String,
    Int,
    Float,
    Number,
    Boolean,
    List,
    Dict,
    Image,
    Bytes,
    Color,
    Domain(String),
}

impl DataType {
    pub fn is_flow_class(&self) -> bool {
        matches!(self, DataType::Flow | DataType::ProviderFlow)
    }
}

/// A runtime value flowing across a wire. Deliberately small: this is not
/// a general-purpose dynamic-typing system, just the handful of shapes the
/// engine needs to move between bridge keys and port-typed inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(HashMap<String, Value>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Lenient conversion of this value to `target`'s shape. Never panics
    /// or returns an error: a cast that can't succeed produces a
    /// type-appropriate default (spec §4.6.1, §GLOSSARY "Soft cast").
    pub fn soft_cast(&self, target: &DataType) -> Value {
        match target {
            DataType::Any | DataType::Flow | DataType::ProviderFlow => self.clone(),
            DataType::String => Value::String(self.to_display_string()),
            DataType::Int => Value::Int(self.to_lenient_f64() as i64),
            DataType::Float | DataType::Number => Value::Float(self.to_lenient_f64()),
            DataType::Boolean => Value::Bool(self.to_lenient_bool()),
            DataType::List => self.to_lenient_list(),
            DataType::Dict => match self {
                Value::Dict(_) => self.clone(),
                Value::String(s) => serde_json::from_str::<HashMap<String, Value>>(s)
                    .map(Value::Dict)
                    .unwrap_or_else(|_| Value::Dict(HashMap::new())),
                _ => Value::Dict(HashMap::new()),
            },
            DataType::Image | DataType::Bytes | DataType::Color | DataType::Domain(_) => {
                self.clone()
            }
        }
    }

    fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Dict(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Numeric soft-cast: strips thousands separators and currency
    /// symbols, falls back to scanning for an embedded numeric run, and
    /// returns `0.0` (never an error) when nothing parseable is found —
    /// spec §8: `"$1,234.5"` -> `1234.5`, `"abc"` -> `0.0`.
    fn to_lenient_f64(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => if *b { 1.0 } else { 0.0 },
            Value::String(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                cleaned.parse::<f64>().unwrap_or_else(|_| {
                    let digits: String = s
                        .chars()
                        .skip_while(|c| !c.is_ascii_digit())
                        .take_while(|c| c.is_ascii_digit() || *c == '.')
                        .collect();
                    digits.parse::<f64>().unwrap_or(0.0)
                })
            }
            _ => 0.0,
        }
    }

    fn to_lenient_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => matches!(
                s.to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "y" | "on"
            ),
            Value::Null => false,
            Value::List(l) => !l.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
        }
    }

    fn to_lenient_list(&self) -> Value {
        match self {
            Value::List(_) => self.clone(),
            Value::String(s) => {
                if let Ok(Value::List(items)) = serde_json::from_str::<Value>(s) {
                    Value::List(items)
                } else {
                    Value::List(
                        s.split(',')
                            .map(|piece| Value::String(piece.trim().to_string()))
                            .collect(),
                    )
                }
            }
            Value::Null => Value::List(Vec::new()),
            other => Value::List(vec![other.clone()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_cast_currency_string_to_float() {
        let v = Value::String("$1,234.5".to_string());
        assert_eq!(v.soft_cast(&DataType::Float), Value::Float(1234.5));
    }

    #[test]
    fn soft_cast_unparseable_string_to_float_is_zero() {
        let v = Value::String("abc".to_string());
        assert_eq!(v.soft_cast(&DataType::Float), Value::Float(0.0));
    }

    #[test]
    fn soft_cast_bool_tokens() {
        assert_eq!(
            Value::String("yes".into()).soft_cast(&DataType::Boolean),
            Value::Bool(true)
        );
        assert_eq!(
            Value::String("nope".into()).soft_cast(&DataType::Boolean),
            Value::Bool(false)
        );
    }

    #[test]
    fn soft_cast_comma_list() {
        let v = Value::String("a, b, c".into());
        assert_eq!(
            v.soft_cast(&DataType::List),
            Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into()),
                Value::String("c".into())
            ])
        );
    }
}
