//! Built-in suites for the panzoom and serialization demos

use serde_json::json;

use crate::fixtures;
use crate::protocol::Fixture;

use super::config::{FixtureSource, Scenario, Suite, Variant};

/// Pan/zoom rendering checks
///
/// The transform mutations accumulate: "scaled up" still has the offsets
/// from "offset", and "scaled down" only changes the scale again.
pub fn panzoom() -> Suite {
    Suite {
        name: "panzoom".to_string(),
        description: Some("Render the pan/zoom area under several transforms".to_string()),
        variant: Variant::Panzoom,
        binary: "gtk-panzoom-demo".to_string(),
        ui_files: vec!["panzoom.ui".to_string(), "panzoom-base.ui".to_string()],
        fixture: FixtureSource::Named(fixtures::TRANSFORM.to_string()),
        threshold: None,
        scenarios: vec![
            digest_scenario(
                "nominal",
                Fixture::new(),
                "af926b00b5fd9affc286b3b4b1b1a9cda9acc29cadc5a6b9b4a4b0b4b5b1a7bbaea8b6aeaeb4afb7",
            ),
            digest_scenario(
                "offset",
                fixtures::literal(json!({
                    "offset_x_adjustment": 0.3,
                    "offset_y_adjustment": 0.3,
                })),
                "860042ff6c5a8eb469769a8a77966ca1826f9b857c8f7c91847d8d888581888c80848a868781878c",
            ),
            digest_scenario(
                "scaled up",
                fixtures::literal(json!({"scale_adjustment": 0.5})),
                "87de700007bb79ffde2c890c78d597c86b557b8588929473a9906d6d749a91b57f5e8d6d939b858a",
            ),
            digest_scenario(
                "scaled down",
                fixtures::literal(json!({"scale_adjustment": 2.0})),
                "780450ff0093ab4679917a46b17140c35360b04f7c8f5d867670866a817b6b8672757e7579757c76",
            ),
        ],
    }
}

/// Builder model serialization round trip
pub fn serialize() -> Suite {
    Suite {
        name: "serialize".to_string(),
        description: Some("Echo every supported builder model through the demo".to_string()),
        variant: Variant::Serialize,
        binary: "gtk-serialize-demo".to_string(),
        ui_files: vec!["serialize.ui".to_string()],
        fixture: FixtureSource::Named(fixtures::WIDGET_STATE.to_string()),
        threshold: None,
        scenarios: vec![Scenario {
            name: "glade".to_string(),
            set: Fixture::new(),
            digest: None,
        }],
    }
}

fn digest_scenario(name: &str, set: Fixture, digest: &str) -> Scenario {
    Scenario {
        name: name.to_string(),
        set,
        digest: Some(digest.to_string()),
    }
}
