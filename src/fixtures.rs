//! Default builder model payloads
//!
//! Suites refer to these by name and always work on a clone, so the stored
//! defaults stay untouched for the whole run.

use serde_json::json;
use std::collections::BTreeMap;

use crate::common::{Error, Result};
use crate::protocol::Fixture;

/// Name of the pan/zoom transform defaults
pub const TRANSFORM: &str = "transform";
/// Name of the serialization widget-state defaults
pub const WIDGET_STATE: &str = "widget-state";

/// A stored default payload
#[derive(Debug, Clone)]
struct Entry {
    version: u32,
    fixture: Fixture,
}

/// Registry of named default fixtures
#[derive(Debug, Clone)]
pub struct FixtureSet {
    entries: BTreeMap<String, Entry>,
}

impl FixtureSet {
    /// The fixtures shipped with the harness
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            TRANSFORM.to_string(),
            Entry {
                version: 1,
                fixture: transform_defaults(),
            },
        );
        entries.insert(
            WIDGET_STATE.to_string(),
            Entry {
                version: 1,
                fixture: widget_state_defaults(),
            },
        );
        Self { entries }
    }

    /// Take an independent copy of the named default
    pub fn instantiate(&self, name: &str) -> Result<Fixture> {
        self.entries
            .get(name)
            .map(|entry| entry.fixture.clone())
            .ok_or_else(|| Error::UnknownFixture(name.to_string()))
    }

    /// Version of the named default
    pub fn version(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|entry| entry.version)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn transform_defaults() -> Fixture {
    literal(json!({
        "offset_x_adjustment": 0,
        "offset_y_adjustment": 0,
        "scale_adjustment": 1,
        "scale_rate_adjustment": 1.1,
    }))
}

fn widget_state_defaults() -> Fixture {
    literal(json!({
        "adjustment": 1.234,
        "entrybuffer": "Hello World",
        "textbuffer": "Well, isn't this interesting\nA multiline piece of test!\n",
        "togglebutton": true,
        "checkbutton": true,
        "radio-0": false,
        "radio-1": true,
        "radio-2": false,
        "colorbutton": "rgb(100,150,200)",
    }))
}

/// Build a fixture from a compiled-in JSON literal
///
/// Panics on a literal that is not an object of scalars. Only constant
/// inputs reach this, and every built-in one is exercised by the tests.
pub(crate) fn literal(value: serde_json::Value) -> Fixture {
    match Fixture::from_value(value) {
        Ok(fixture) => fixture,
        Err(e) => panic!("invalid built-in fixture: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Scalar;

    #[test]
    fn test_builtin_names() {
        let set = FixtureSet::builtin();
        assert_eq!(set.names().collect::<Vec<_>>(), vec![TRANSFORM, WIDGET_STATE]);
        assert_eq!(set.version(TRANSFORM), Some(1));
    }

    #[test]
    fn test_defaults_are_complete() {
        let set = FixtureSet::builtin();
        assert_eq!(set.instantiate(TRANSFORM).unwrap().len(), 4);
        let widgets = set.instantiate(WIDGET_STATE).unwrap();
        assert_eq!(widgets.len(), 9);
        assert_eq!(
            widgets.get("colorbutton"),
            Some(&Scalar::from("rgb(100,150,200)"))
        );
    }

    #[test]
    fn test_mutating_clone_leaves_default_untouched() {
        let set = FixtureSet::builtin();
        let mut first = set.instantiate(TRANSFORM).unwrap();
        let mut second = set.instantiate(TRANSFORM).unwrap();

        first.set("offset_x_adjustment", Scalar::try_from(0.3).unwrap());
        second.set("scale_adjustment", Scalar::try_from(2.0).unwrap());

        let fresh = set.instantiate(TRANSFORM).unwrap();
        assert_eq!(fresh.get("offset_x_adjustment"), Some(&Scalar::from(0i64)));
        assert_eq!(fresh.get("scale_adjustment"), Some(&Scalar::from(1i64)));
        assert_eq!(second.get("offset_x_adjustment"), Some(&Scalar::from(0i64)));
        assert_eq!(first.get("scale_adjustment"), Some(&Scalar::from(1i64)));
    }

    #[test]
    #[should_panic(expected = "invalid built-in fixture")]
    fn test_literal_rejects_non_scalars() {
        literal(json!({"scale_adjustment": null}));
    }

    #[test]
    fn test_unknown_fixture() {
        let err = FixtureSet::builtin().instantiate("missing").unwrap_err();
        assert!(matches!(err, Error::UnknownFixture(name) if name == "missing"));
    }
}
