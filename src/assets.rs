//! Visual asset resolution.
//!
//! [`AssetResolver`] maps a scene's [`Visual`] to a local file. AI image
//! generators plug in behind the same trait; the crate ships only the
//! local-path resolver.

use std::path::PathBuf;

use crate::error::{TetoError, TetoResult};
use crate::script::Visual;

pub trait AssetResolver: Send + Sync {
    /// Resolve a visual to a readable local file path.
    fn resolve(&self, visual: &Visual) -> TetoResult<PathBuf>;
}

/// Resolver for visuals that reference existing local files. Generation
/// requests are rejected; they need a generator-backed resolver.
#[derive(Clone, Debug, Default)]
pub struct LocalAssetResolver;

impl AssetResolver for LocalAssetResolver {
    fn resolve(&self, visual: &Visual) -> TetoResult<PathBuf> {
        let Some(path) = &visual.path else {
            return Err(TetoError::validation(format!(
                "local asset resolver requires a path; cannot generate from description {:?}",
                visual.description
            )));
        };
        if !path.exists() {
            return Err(TetoError::AssetNotFound(path.clone()));
        }
        Ok(path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_asset_not_found() {
        let resolver = LocalAssetResolver;
        let visual = Visual::from_path("/nonexistent/teto-test.png");
        assert!(matches!(
            resolver.resolve(&visual),
            Err(TetoError::AssetNotFound(_))
        ));
    }

    #[test]
    fn existing_file_resolves() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"png").unwrap();

        let resolver = LocalAssetResolver;
        let resolved = resolver.resolve(&Visual::from_path(&path)).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn generation_requests_are_rejected() {
        let resolver = LocalAssetResolver;
        let visual = Visual {
            kind: None,
            path: None,
            description: Some("a sunset".to_string()),
            generate: None,
        };
        assert!(matches!(
            resolver.resolve(&visual),
            Err(TetoError::Validation(_))
        ));
    }
}
