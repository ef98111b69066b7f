//! Manifest loading and writing
//!
//! This module provides functionality to:
//! - Read package.json from a project directory or standard input
//! - Turn its dependency sections into declarations
//! - Write upgraded specifiers back without reformatting the file
//! - Build declarations for globally installed packages

mod package_json;

pub use package_json::{parse_declarations, rewrite_specifier};

use crate::domain::{Declaration, ResolutionResult, Section};
use crate::error::ManifestError;
use indexmap::IndexMap;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// A package.json document and where it came from
#[derive(Debug, Clone)]
pub struct PackageJson {
    /// File path; `None` when read from standard input
    path: Option<PathBuf>,
    content: String,
}

impl PackageJson {
    /// Read `package.json` from a project directory
    pub fn read(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(ManifestError::not_found(path));
        }
        let content =
            fs::read_to_string(&path).map_err(|e| ManifestError::read_error(&path, e))?;
        Ok(Self {
            path: Some(path),
            content,
        })
    }

    /// Wrap content that was not read from a file
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            path: None,
            content: content.into(),
        }
    }

    /// Path shown in messages
    pub fn display_path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new("<stdin>"))
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Every declaration of the dependency sections, in file order
    pub fn declarations(&self) -> Result<Vec<Declaration>, ManifestError> {
        parse_declarations(&self.content, self.display_path())
    }

    /// Apply every upgrade to the in-memory content
    ///
    /// A package declared with the same specifier in several sections is
    /// rewritten in each of them. Returns the number of rewritten entries.
    pub fn apply(&mut self, result: &ResolutionResult) -> Result<usize, ManifestError> {
        let mut rewritten = 0;
        for upgrade in result.upgrades.values() {
            let mut found = false;
            for section in Section::ALL {
                if let Some(updated) =
                    rewrite_specifier(&self.content, section, &upgrade.name, &upgrade.from, &upgrade.to)
                {
                    self.content = updated;
                    rewritten += 1;
                    found = true;
                }
            }
            if !found {
                return Err(ManifestError::update_failed(
                    self.display_path(),
                    &upgrade.name,
                    format!("no declaration with specifier '{}'", upgrade.from),
                ));
            }
        }
        Ok(rewritten)
    }

    /// Write the content back to the file it was read from
    pub fn write(&self) -> Result<(), ManifestError> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| ManifestError::not_found(self.display_path()))?;
        fs::write(path, &self.content).map_err(|e| ManifestError::write_error(path, e))
    }
}

/// Declarations for globally installed packages, pinned to their installed version
pub fn global_declarations(installed: &IndexMap<String, Version>) -> Vec<Declaration> {
    installed
        .iter()
        .map(|(name, version)| Declaration::prod(name.clone(), version.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Distance, Upgrade};
    use tempfile::TempDir;

    const CONTENT: &str = r#"{
  "dependencies": {
    "ncu-test-v2": "^1.0.0"
  },
  "devDependencies": {
    "ncu-test-v2": "^1.0.0",
    "left-pad": "1.3.0"
  }
}
"#;

    fn upgrade(name: &str, from: &str, to: &str) -> Upgrade {
        Upgrade {
            name: name.to_string(),
            section: Section::Prod,
            from: from.to_string(),
            to: to.to_string(),
            version: to.trim_start_matches('^').to_string(),
            distance: Distance::Major,
            published_at: None,
            repository: None,
        }
    }

    #[test]
    fn test_read_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let error = PackageJson::read(dir.path()).unwrap_err();
        assert!(matches!(error, ManifestError::NotFound { .. }));
    }

    #[test]
    fn test_read_and_declarations() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), CONTENT).unwrap();
        let manifest = PackageJson::read(dir.path()).unwrap();
        let declarations = manifest.declarations().unwrap();
        assert_eq!(declarations.len(), 3);
        assert_eq!(declarations[2], Declaration::dev("left-pad", "1.3.0"));
    }

    #[test]
    fn test_apply_rewrites_every_matching_section() {
        let mut manifest = PackageJson::from_content(CONTENT);
        let mut result = ResolutionResult::new();
        result.insert(upgrade("ncu-test-v2", "^1.0.0", "^2.0.0"));

        assert_eq!(manifest.apply(&result).unwrap(), 2);
        assert!(!manifest.content().contains("^1.0.0"));
        assert!(manifest.content().contains("\"left-pad\": \"1.3.0\""));
    }

    #[test]
    fn test_apply_then_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, CONTENT).unwrap();

        let mut manifest = PackageJson::read(dir.path()).unwrap();
        let mut result = ResolutionResult::new();
        result.insert(upgrade("left-pad", "1.3.0", "1.3.1"));
        manifest.apply(&result).unwrap();
        manifest.write().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, CONTENT.replace("1.3.0", "1.3.1"));
    }

    #[test]
    fn test_apply_unknown_declaration_fails() {
        let mut manifest = PackageJson::from_content(CONTENT);
        let mut result = ResolutionResult::new();
        result.insert(upgrade("ghost", "^1.0.0", "^2.0.0"));
        let error = manifest.apply(&result).unwrap_err();
        assert!(matches!(error, ManifestError::UpdateFailed { .. }));
    }

    #[test]
    fn test_write_without_path_fails() {
        let manifest = PackageJson::from_content(CONTENT);
        assert!(manifest.write().is_err());
    }

    #[test]
    fn test_global_declarations() {
        let mut installed = IndexMap::new();
        installed.insert("npm".to_string(), Version::new(6, 14, 0));
        let declarations = global_declarations(&installed);
        assert_eq!(declarations, vec![Declaration::prod("npm", "6.14.0")]);
    }
}
