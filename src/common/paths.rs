//! Configuration and binary directory paths

use std::path::{Path, PathBuf};

use super::{Error, Result};

/// Name used for the configuration directory
const APP_NAME: &str = "demo-harness";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/demo-harness/`
/// - macOS: `~/Library/Application Support/demo-harness/`
/// - Windows: `%APPDATA%\demo-harness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Validate and canonicalize the directory holding the demo binaries
///
/// Demo processes are started with this directory as their working directory,
/// so it has to exist before any scenario runs.
pub fn resolve_bindir(bindir: &Path) -> Result<PathBuf> {
    let resolved = bindir.canonicalize().map_err(|e| {
        Error::Config(format!(
            "Binary directory '{}' is not accessible: {}",
            bindir.display(),
            e
        ))
    })?;

    if !resolved.is_dir() {
        return Err(Error::Config(format!(
            "Binary directory '{}' is not a directory",
            bindir.display()
        )));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("demo-harness/config.toml"));
        }
    }

    #[test]
    fn test_resolve_bindir_rejects_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = resolve_bindir(file.path()).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn test_resolve_bindir_rejects_missing() {
        let err = resolve_bindir(Path::new("/nonexistent/demo/bindir")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
