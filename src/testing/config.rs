//! Test suite configuration types
//!
//! Defines the data structures for built-in suites and for deserializing
//! YAML suite files.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::common::config::DemoOverrides;
use crate::common::{Error, Result};
use crate::fixtures::FixtureSet;
use crate::protocol::Fixture;

/// Which exchange the demo binary speaks
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Render to a file and self-check against an expected digest
    Panzoom,
    /// Echo the builder models back on stdout
    Serialize,
}

/// Base fixture of a suite: a named default or an inline mapping
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FixtureSource {
    Named(String),
    Inline(Fixture),
}

impl FixtureSource {
    /// Produce the working copy a test starts from
    pub fn instantiate(&self, set: &FixtureSet) -> Result<Fixture> {
        match self {
            FixtureSource::Named(name) => set.instantiate(name),
            FixtureSource::Inline(fixture) => Ok(fixture.clone()),
        }
    }
}

/// A complete test suite
#[derive(Deserialize, Debug, Clone)]
pub struct Suite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    pub description: Option<String>,
    /// Exchange variant spoken by the demo binary
    pub variant: Variant,
    /// Demo binary file name inside the binary directory
    pub binary: String,
    /// UI files to run the scenarios against, one test per file
    pub ui_files: Vec<String>,
    /// Base fixture cloned at the start of each test
    pub fixture: FixtureSource,
    /// Digest difference threshold passed to the demo's test mode
    pub threshold: Option<f64>,
    /// Ordered scenarios; mutations accumulate across the list
    pub scenarios: Vec<Scenario>,
}

/// One named step: fixture deltas plus the expected outcome
#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    pub name: String,
    /// Fields to overwrite on the working fixture before this step
    #[serde(default)]
    pub set: Fixture,
    /// Expected rendered digest (panzoom suites only)
    pub digest: Option<String>,
}

impl Suite {
    /// Load and validate a suite from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test suite '{}': {}",
                path.display(),
                e
            ))
        })?;

        let suite: Suite = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse test suite: {}", e)))?;
        suite.validate()?;
        Ok(suite)
    }

    /// Check the suite is runnable
    pub fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(Error::Config(format!("Suite '{}' has no scenarios", self.name)));
        }
        if self.ui_files.is_empty() {
            return Err(Error::Config(format!("Suite '{}' has no UI files", self.name)));
        }
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(Error::Config(format!(
                    "Suite '{}' has invalid threshold {}",
                    self.name, threshold
                )));
            }
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate scenario '{}' in suite '{}'",
                    scenario.name, self.name
                )));
            }
            match (self.variant, &scenario.digest) {
                (Variant::Panzoom, Some(digest)) => validate_digest(digest)?,
                (Variant::Panzoom, None) => {
                    return Err(Error::Config(format!(
                        "Scenario '{}' needs an expected digest",
                        scenario.name
                    )));
                }
                (Variant::Serialize, Some(_)) => {
                    return Err(Error::Config(format!(
                        "Scenario '{}' is a serialization check and cannot carry a digest",
                        scenario.name
                    )));
                }
                (Variant::Serialize, None) => {}
            }
        }
        Ok(())
    }

    /// Apply configuration file overrides for the binary and UI files
    pub fn with_overrides(mut self, overrides: &DemoOverrides) -> Self {
        if let Some(binary) = &overrides.binary {
            self.binary = binary.clone();
        }
        if let Some(ui_files) = &overrides.ui_files {
            self.ui_files = ui_files.clone();
        }
        self
    }
}

/// Expected digests are relayed to the demo, which decodes them byte-wise
pub fn validate_digest(digest: &str) -> Result<()> {
    if digest.is_empty() {
        return Err(Error::invalid_digest(digest, "empty"));
    }
    hex::decode(digest)
        .map(|_| ())
        .map_err(|e| Error::invalid_digest(digest, &e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Scalar;

    const SUITE: &str = r#"
name: custom
variant: panzoom
binary: gtk-panzoom-demo
ui_files: [panzoom.ui]
fixture: transform
threshold: 0.25
scenarios:
  - name: nominal
    digest: "00ff"
  - name: offset
    set:
      offset_x_adjustment: 0.3
      label: "moved"
    digest: "abcd"
"#;

    #[test]
    fn test_parse_suite() {
        let suite: Suite = serde_yaml::from_str(SUITE).unwrap();
        suite.validate().unwrap();
        assert_eq!(suite.variant, Variant::Panzoom);
        assert!(matches!(&suite.fixture, FixtureSource::Named(n) if n == "transform"));
        assert!(suite.scenarios[0].set.is_empty());
        assert_eq!(
            suite.scenarios[1].set.get("offset_x_adjustment"),
            Some(&Scalar::try_from(0.3).unwrap())
        );
        assert_eq!(suite.scenarios[1].set.get("label"), Some(&Scalar::from("moved")));
    }

    #[test]
    fn test_inline_fixture() {
        let yaml = r#"
name: inline
variant: serialize
binary: gtk-serialize-demo
ui_files: [serialize.ui]
fixture:
  entrybuffer: "Hi"
  checkbutton: false
scenarios:
  - name: round trip
"#;
        let suite: Suite = serde_yaml::from_str(yaml).unwrap();
        suite.validate().unwrap();
        let fixture = suite.fixture.instantiate(&FixtureSet::builtin()).unwrap();
        assert_eq!(fixture.get("checkbutton"), Some(&Scalar::from(false)));
    }

    #[test]
    fn test_digest_validation() {
        assert!(validate_digest("af926b00").is_ok());
        assert!(validate_digest("").is_err());
        assert!(validate_digest("abc").is_err());
        assert!(matches!(
            validate_digest("zz"),
            Err(Error::InvalidDigest { .. })
        ));
    }

    #[test]
    fn test_panzoom_scenario_requires_digest() {
        let mut suite: Suite = serde_yaml::from_str(SUITE).unwrap();
        suite.scenarios[1].digest = None;
        assert!(suite.validate().is_err());
    }

    #[test]
    fn test_duplicate_scenario_names_rejected() {
        let mut suite: Suite = serde_yaml::from_str(SUITE).unwrap();
        suite.scenarios[1].name = "nominal".to_string();
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate scenario 'nominal'"));
    }

    #[test]
    fn test_overrides() {
        let suite: Suite = serde_yaml::from_str(SUITE).unwrap();
        let suite = suite.with_overrides(&DemoOverrides {
            binary: Some("panzoom-mm-demo".to_string()),
            ui_files: None,
        });
        assert_eq!(suite.binary, "panzoom-mm-demo");
        assert_eq!(suite.ui_files, vec!["panzoom.ui".to_string()]);
    }
}
