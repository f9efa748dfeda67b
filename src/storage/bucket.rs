// Bucket kinds and the registry of recognized bucket names
// Author: kelexine (https://github.com/kelexine)

use crate::config::BucketsConfig;
use std::collections::BTreeMap;

/// Lifecycle class of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    PersistentApp,
    PersistentAsset,
    ManualPage,
    EphemeralRuntime,
}

impl BucketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketKind::PersistentApp => "persistent-app",
            BucketKind::PersistentAsset => "persistent-asset",
            BucketKind::ManualPage => "manual-page",
            BucketKind::EphemeralRuntime => "ephemeral-runtime",
        }
    }

    /// Whether the background sweep may trim this bucket.
    pub fn is_evictable(&self) -> bool {
        matches!(self, BucketKind::ManualPage | BucketKind::EphemeralRuntime)
    }
}

/// The set of bucket names the current configuration recognizes.
#[derive(Debug, Clone)]
pub struct BucketRegistry {
    app: String,
    assets: String,
    runtime: String,
    /// page id -> bucket name
    pages: BTreeMap<String, String>,
}

impl BucketRegistry {
    pub fn new(config: &BucketsConfig) -> Self {
        Self {
            app: config.app.clone(),
            assets: config.assets.clone(),
            runtime: config.runtime.clone(),
            pages: config.pages.clone(),
        }
    }

    /// Bucket name for a singleton kind. Manual-page buckets are looked up by page id instead.
    pub fn name_for(&self, kind: BucketKind) -> Option<&str> {
        match kind {
            BucketKind::PersistentApp => Some(&self.app),
            BucketKind::PersistentAsset => Some(&self.assets),
            BucketKind::EphemeralRuntime => Some(&self.runtime),
            BucketKind::ManualPage => None,
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn assets(&self) -> &str {
        &self.assets
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn page_bucket(&self, page_id: &str) -> Option<&str> {
        self.pages.get(page_id).map(String::as_str)
    }

    pub fn kind_of(&self, name: &str) -> Option<BucketKind> {
        if name == self.app {
            Some(BucketKind::PersistentApp)
        } else if name == self.assets {
            Some(BucketKind::PersistentAsset)
        } else if name == self.runtime {
            Some(BucketKind::EphemeralRuntime)
        } else if self.pages.values().any(|p| p == name) {
            Some(BucketKind::ManualPage)
        } else {
            None
        }
    }

    pub fn is_recognized(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    pub fn recognized_names(&self) -> Vec<&str> {
        let mut names = vec![self.app.as_str(), self.assets.as_str(), self.runtime.as_str()];
        names.extend(self.pages.values().map(String::as_str));
        names
    }

    /// Buckets subject to the size-based sweep: runtime first, then pages.
    pub fn evictable_names(&self) -> Vec<&str> {
        self.recognized_names()
            .into_iter()
            .filter(|name| self.kind_of(name).is_some_and(|k| k.is_evictable()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BucketRegistry {
        let mut config = BucketsConfig::default();
        config.pages.insert("guide".to_string(), "vault-page-guide".to_string());
        BucketRegistry::new(&config)
    }

    #[test]
    fn test_kind_lookup() {
        let registry = registry();
        assert_eq!(registry.kind_of("vault-app-v1"), Some(BucketKind::PersistentApp));
        assert_eq!(registry.kind_of("vault-assets-v1"), Some(BucketKind::PersistentAsset));
        assert_eq!(registry.kind_of("vault-runtime-v1"), Some(BucketKind::EphemeralRuntime));
        assert_eq!(registry.kind_of("vault-page-guide"), Some(BucketKind::ManualPage));
        assert_eq!(registry.kind_of("vault-app-v0"), None);
    }

    #[test]
    fn test_evictable_names_exclude_persistent() {
        let registry = registry();
        assert_eq!(registry.evictable_names(), vec!["vault-runtime-v1", "vault-page-guide"]);
    }

    #[test]
    fn test_page_lookup() {
        let registry = registry();
        assert_eq!(registry.page_bucket("guide"), Some("vault-page-guide"));
        assert_eq!(registry.page_bucket("missing"), None);
    }
}
