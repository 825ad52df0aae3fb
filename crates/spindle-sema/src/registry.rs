// registry.rs
//! Manifestation registry shared by every file of a compilation.
//!
//! Files are analyzed on separate worker threads. Each file keeps its own
//! scope arena; the registry records which signatures have been manifested
//! and the field layout the first manifestation produced.

use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

/// Field layout of one manifestation, independent of any file's scope arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestedLayout {
    pub signature: String,
    /// Field names and type names, in declaration order.
    pub fields: Vec<(String, String)>,
    /// File whose request created the entry.
    pub first_file: String,
}

impl ManifestedLayout {
    pub fn new(signature: &str, fields: Vec<(String, String)>, first_file: &str) -> Self {
        Self {
            signature: signature.to_string(),
            fields,
            first_file: first_file.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManifestationRegistry {
    inner: Arc<Mutex<FxHashMap<String, Arc<ManifestedLayout>>>>,
}

impl ManifestationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `signature`, building it with `build` if absent. The lock is
    /// held while building, so concurrent first requests build exactly once.
    /// The flag reports whether this call created the entry.
    pub fn get_or_create(
        &self,
        signature: &str,
        build: impl FnOnce() -> ManifestedLayout,
    ) -> (Arc<ManifestedLayout>, bool) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(signature) {
            return (Arc::clone(existing), false);
        }
        let layout = Arc::new(build());
        map.insert(signature.to_string(), Arc::clone(&layout));
        (layout, true)
    }

    pub fn get(&self, signature: &str) -> Option<Arc<ManifestedLayout>> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(signature).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered signatures, sorted.
    pub fn signatures(&self) -> Vec<String> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<String> = map.keys().cloned().collect();
        out.sort();
        out
    }
}
