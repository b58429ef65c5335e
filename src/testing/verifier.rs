//! Outcome verification
//!
//! Round-tripped fields are compared here. Rendered output is not: the demo
//! computes its own digest and reports the comparison through its exit code,
//! so the harness only relays the expected digest and reads the exit status.

use serde_json::{Map, Value};
use std::fmt;

use crate::protocol::{Fixture, Scalar};

/// A field that did not survive the round trip
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: Scalar,
    /// `None` when the field is absent from the response
    pub actual: Option<Value>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            None => write!(f, "'{}': expected {}, missing from response", self.field, self.expected),
            Some(Value::Null) => write!(
                f,
                "'{}': expected {} {}, got null",
                self.field,
                self.expected.type_name(),
                self.expected
            ),
            Some(actual) if type_name(actual) != self.expected.type_name() => write!(
                f,
                "'{}': expected {} {}, got {} {}",
                self.field,
                self.expected.type_name(),
                self.expected,
                type_name(actual),
                actual
            ),
            Some(actual) => write!(
                f,
                "'{}': expected {}, got {}",
                self.field, self.expected, actual
            ),
        }
    }
}

/// Compare every field sent to the demo against its echo
///
/// All mismatching fields are returned. Fields present only in the response
/// are ignored, whatever their type; a sent field echoed as `null`, an array
/// or an object is a mismatch.
pub fn verify_round_trip(sent: &Fixture, received: &Map<String, Value>) -> Vec<FieldMismatch> {
    sent.iter()
        .filter_map(|(field, expected)| {
            let actual = received.get(field);
            let echoed = actual.and_then(|value| Scalar::try_from(value.clone()).ok());
            if echoed.as_ref() == Some(expected) {
                tracing::debug!("{}: OK", field);
                None
            } else {
                Some(FieldMismatch {
                    field: field.clone(),
                    expected: expected.clone(),
                    actual: actual.cloned(),
                })
            }
        })
        .collect()
}

/// Result of relaying a digest check to the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Digest mismatch or render failure; the two are indistinguishable
    /// from the exit code alone
    Fail { exit_code: i32 },
}

/// Interpret the exit code of a demo running its digest self-check
pub fn verify_exit(exit_code: i32) -> Verdict {
    if exit_code == 0 {
        Verdict::Pass
    } else {
        Verdict::Fail { exit_code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn echo(fixture: &Fixture) -> Map<String, Value> {
        response(serde_json::to_value(fixture).unwrap())
    }

    fn sent() -> Fixture {
        Fixture::from_value(json!({
            "adjustment": 1.234,
            "textbuffer": "Well, isn't this interesting\nA multiline piece of test!\n",
            "radio-1": true,
        }))
        .unwrap()
    }

    #[test]
    fn test_identical_echo_passes() {
        assert!(verify_round_trip(&sent(), &echo(&sent())).is_empty());
    }

    #[test]
    fn test_extra_response_fields_ignored() {
        let mut received = echo(&sent());
        received.insert("spinbutton".to_string(), json!(4));
        received.insert("panzoom".to_string(), json!({"offset_x": 0, "scale": [1, 2]}));
        received.insert("unset".to_string(), Value::Null);
        assert!(verify_round_trip(&sent(), &received).is_empty());
    }

    #[test]
    fn test_null_echo_is_a_field_mismatch() {
        let received = response(json!({
            "adjustment": null,
            "textbuffer": {"text": "nested"},
            "radio-1": true,
        }));

        let mismatches = verify_round_trip(&sent(), &received);
        let fields: Vec<_> = mismatches.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(fields, ["adjustment", "textbuffer"]);
        assert_eq!(mismatches[0].actual, Some(Value::Null));
        assert_eq!(
            mismatches[0].to_string(),
            "'adjustment': expected number 1.234, got null"
        );
        assert!(mismatches[1].to_string().contains("got object"));
    }

    #[test]
    fn test_all_mismatches_reported() {
        let received = response(json!({
            "adjustment": 1.2340001,
            "textbuffer": "Well, isn't this interesting\nA multiline piece of test!",
        }));

        let mismatches = verify_round_trip(&sent(), &received);
        let fields: Vec<_> = mismatches.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(fields, ["adjustment", "radio-1", "textbuffer"]);

        let missing = &mismatches[1];
        assert_eq!(missing.actual, None);
        assert_eq!(
            missing.to_string(),
            "'radio-1': expected true, missing from response"
        );
    }

    #[test]
    fn test_type_change_is_a_mismatch() {
        let received = response(json!({
            "adjustment": "1.234",
            "textbuffer": "Well, isn't this interesting\nA multiline piece of test!\n",
            "radio-1": 1,
        }));

        let mismatches = verify_round_trip(&sent(), &received);
        assert_eq!(mismatches.len(), 2);
        assert_eq!(
            mismatches[0].to_string(),
            "'adjustment': expected number 1.234, got string \"1.234\""
        );
    }

    #[test]
    fn test_exit_code_verdict() {
        assert_eq!(verify_exit(0), Verdict::Pass);
        assert_eq!(verify_exit(1), Verdict::Fail { exit_code: 1 });
        assert_eq!(verify_exit(139), Verdict::Fail { exit_code: 139 });
    }
}
