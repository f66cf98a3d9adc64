//! Shared display state.
//!
//! Poll tasks publish [`DisplayFragment`]s into the [`DisplayModel`]; the
//! renderer copies it out with [`DisplayModel::snapshot`]. Every fragment
//! write replaces the whole value under one lock, so a reader sees either the
//! old fragment or the new one and never a mix.

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One named, independently updated piece of display state.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFragment {
    pub text: String,
    pub updated_at: DateTime<Local>,
    /// Set when the last poll failed; `text` then holds the last known value.
    pub error: Option<String>,
}

/// Point-in-time copy of the model.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: u64,
    pub fragments: HashMap<String, DisplayFragment>,
}

/// Versioned map from fragment name to the latest fragment.
///
/// Cloning is cheap and yields a handle onto the same model.
#[derive(Debug, Clone, Default)]
pub struct DisplayModel {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    fragments: HashMap<String, DisplayFragment>,
    version: u64,
}

// === impl DisplayFragment ===

impl DisplayFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            updated_at: Local::now(),
            error: None,
        }
    }

    /// A fragment whose value was read at `updated_at`.
    pub fn at(text: impl Into<String>, updated_at: DateTime<Local>) -> Self {
        Self {
            text: text.into(),
            updated_at,
            error: None,
        }
    }

    /// A fragment that keeps `text` but marks it as degraded.
    pub fn degraded(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(text)
        }
    }

    /// Marks this fragment degraded, keeping its value and timestamp.
    pub fn into_degraded(self, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..self
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

// === impl Snapshot ===

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&DisplayFragment> {
        self.fragments.get(name)
    }
}

// === impl DisplayModel ===

impl DisplayModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the fragment stored under `name` and bumps the version.
    ///
    /// Returns the new version.
    pub fn update(&self, name: &str, fragment: DisplayFragment) -> u64 {
        let mut inner = self.lock();
        inner.fragments.insert(name.to_string(), fragment);
        inner.version += 1;
        inner.version
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            version: inner.version,
            fragments: inner.fragments.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn fragment(&self, name: &str) -> Option<DisplayFragment> {
        self.lock().fragments.get(name).cloned()
    }

    // Writers replace whole values, so a poisoned lock still guards
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_version_increases_on_update() {
        let model = DisplayModel::new();
        assert_eq!(model.version(), 0);

        assert_eq!(model.update("resources", DisplayFragment::new("a")), 1);
        assert_eq!(model.update("resources", DisplayFragment::new("b")), 2);
        assert_eq!(model.update("model_status", DisplayFragment::new("c")), 3);

        // reads leave the version alone
        let _ = model.snapshot();
        let _ = model.fragment("resources");
        assert_eq!(model.version(), 3);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let model = DisplayModel::new();
        model.update("resources", DisplayFragment::new("old"));

        let snapshot = model.snapshot();
        model.update("resources", DisplayFragment::new("new"));

        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.get("resources").unwrap().text, "old");
        assert_eq!(model.fragment("resources").unwrap().text, "new");
    }

    #[test]
    fn test_degraded_fragment() {
        let fragment = DisplayFragment::degraded("CPU: 1.0%", "source unavailable");
        assert!(fragment.is_degraded());
        assert_eq!(fragment.text, "CPU: 1.0%");
        assert!(!DisplayFragment::new("x").is_degraded());

        let fresh = DisplayFragment::new("CPU: 2.0%");
        let stale = fresh.clone().into_degraded("stat gone");
        assert_eq!(stale.text, fresh.text);
        assert_eq!(stale.updated_at, fresh.updated_at);
        assert_eq!(stale.error.as_deref(), Some("stat gone"));
    }

    #[test]
    fn test_concurrent_updates_are_never_torn() {
        let model = DisplayModel::new();
        let writers: Vec<_> = ["resources", "model_status"]
            .into_iter()
            .map(|name| {
                let model = model.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        // text and error always carry the same counter
                        let fragment = DisplayFragment::degraded(format!("{}", i), format!("{}", i));
                        model.update(name, fragment);
                    }
                })
            })
            .collect();

        let reader = {
            let model = model.clone();
            thread::spawn(move || {
                let mut last_version = 0;
                for _ in 0..500 {
                    let snapshot = model.snapshot();
                    assert!(snapshot.version >= last_version);
                    last_version = snapshot.version;
                    for fragment in snapshot.fragments.values() {
                        assert_eq!(Some(&fragment.text), fragment.error.as_ref());
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(model.version(), 1000);
    }
}
