//! Exchange envelope and fixture types
//!
//! A fixture is a flat mapping of builder model names to JSON scalars. The
//! envelope wraps it under the `builder_models` key, which is the only key a
//! demo process reads and the only key the harness requires in a response.
//! Responses keep arbitrary JSON values: a demo may echo models the harness
//! never sent, including nested ones.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::common::{Error, Result};

/// A JSON scalar stored in a fixture field
///
/// Numbers keep their JSON representation so an integer default like `0` is
/// sent as `0`, not `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// JSON type name, used in mismatch reports
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Number(_) => "number",
            Scalar::String(_) => "string",
        }
    }
}

/// Strict equality: booleans and strings compare exactly. Two integers
/// compare exactly as integers; once either side is a float both compare by
/// exact `f64` value, so `1` equals `1.0` but `1.234` never equals
/// `1.2340000001`.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::String(a), Scalar::String(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => numbers_equal(a, b),
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
    }
    // Negative integers only fit i64, those above i64::MAX only fit u64
    a.as_i64() == b.as_i64() && a.as_u64() == b.as_u64()
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl TryFrom<f64> for Scalar {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Number::from_f64(value)
            .map(Scalar::Number)
            .ok_or_else(|| Error::Config(format!("{} is not representable in JSON", value)))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value.into())
    }
}

impl TryFrom<Value> for Scalar {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            Value::Number(n) => Ok(Scalar::Number(n)),
            Value::String(s) => Ok(Scalar::String(s)),
            other => Err(Error::Config(format!(
                "fixture values must be JSON scalars, got {}",
                other
            ))),
        }
    }
}

/// Builder model values keyed by object id
///
/// Cloning a fixture is a deep copy: every value is owned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixture(BTreeMap<String, Scalar>);

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fixture from a JSON object of scalars
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::Config(format!(
                    "fixture must be a JSON object, got {}",
                    other
                )));
            }
        };
        map.into_iter()
            .map(|(k, v)| Ok((k, Scalar::try_from(v)?)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Self)
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.0.get(name)
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.0.insert(name.into(), value.into())
    }

    /// Overlay every field of `deltas` onto this fixture
    ///
    /// Fields not named in `deltas` keep their current value.
    pub fn apply(&mut self, deltas: &Fixture) {
        for (name, value) in &deltas.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The single JSON object exchanged per message
///
/// Requests carry a [`Fixture`]; responses are decoded as a [`Response`] so
/// that unexpected values are reported per field rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<M = Fixture> {
    pub builder_models: M,
}

impl Envelope {
    pub fn new(builder_models: Fixture) -> Self {
        Self { builder_models }
    }
}

/// An echoed envelope with its models left as raw JSON
pub type Response = Envelope<Map<String, Value>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_numbers_stay_integers_on_the_wire() {
        let fixture = Fixture::from_value(json!({"scale_adjustment": 1})).unwrap();
        assert_eq!(
            serde_json::to_string(&fixture).unwrap(),
            r#"{"scale_adjustment":1}"#
        );
    }

    #[test]
    fn test_number_equality_is_exact() {
        let a = Scalar::try_from(1.234).unwrap();
        assert_eq!(a, Scalar::try_from(1.234).unwrap());
        assert_ne!(a, Scalar::try_from(1.2340000001).unwrap());
        assert_eq!(Scalar::from(1i64), Scalar::try_from(1.0).unwrap());
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        // Both round to the same f64
        assert_ne!(
            Scalar::from(9007199254740993i64),
            Scalar::from(9007199254740992i64)
        );
        assert_eq!(
            Scalar::from(9007199254740993i64),
            Scalar::from(9007199254740993u64)
        );
        assert_ne!(Scalar::from(u64::MAX), Scalar::from(-1i64));
    }

    #[test]
    fn test_types_never_compare_equal() {
        assert_ne!(Scalar::from(true), Scalar::from("true"));
        assert_ne!(Scalar::from(1i64), Scalar::from("1"));
    }

    #[test]
    fn test_non_scalar_values_rejected() {
        assert!(Fixture::from_value(json!({"a": [1, 2]})).is_err());
        assert!(Fixture::from_value(json!({"a": null})).is_err());
        assert!(Fixture::from_value(json!([1])).is_err());
        assert!(serde_json::from_str::<Fixture>(r#"{"a": {"b": 1}}"#).is_err());
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(Scalar::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_apply_overlays_only_named_fields() {
        let mut fixture = Fixture::from_value(json!({"x": 0, "y": 0, "scale": 1})).unwrap();
        let deltas = Fixture::from_value(json!({"x": 0.3, "y": 0.3})).unwrap();
        fixture.apply(&deltas);
        assert_eq!(fixture.get("x"), Some(&Scalar::try_from(0.3).unwrap()));
        assert_eq!(fixture.get("scale"), Some(&Scalar::from(1i64)));
        assert_eq!(fixture.len(), 3);
    }

    #[test]
    fn test_envelope_requires_builder_models() {
        assert!(serde_json::from_str::<Envelope>(r#"{"models": {}}"#).is_err());
        let envelope: Envelope =
            serde_json::from_str(r#"{"builder_models": {"a": true}, "extra": 1}"#).unwrap();
        assert_eq!(envelope.builder_models.get("a"), Some(&Scalar::from(true)));
    }

    #[test]
    fn test_response_keeps_non_scalar_models() {
        let response: Response = serde_json::from_str(
            r#"{"builder_models": {"a": null, "panzoom": {"offset_x": 0}}}"#,
        )
        .unwrap();
        assert_eq!(response.builder_models.get("a"), Some(&Value::Null));
        assert_eq!(
            response.builder_models.get("panzoom"),
            Some(&json!({"offset_x": 0}))
        );
    }
}
