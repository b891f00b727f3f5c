//! # Tuned Thresholds
//!
//! Externally tuned drift caps keyed by asset class and cadence pair.
//!
//! The file is produced offline and is read-only here:
//!
//! ```json
//! {"scale_caps": {"equity": {"hour↔day": 0.05}}}
//! ```
//!
//! Any other top-level keys (e.g. `calibration`) are ignored.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

/// Default refresh interval for [`TunedThresholds`].
pub const DEFAULT_THRESHOLD_TTL: Duration = Duration::from_secs(60);

// =============================================================================
// SCALE CAPS
// =============================================================================

/// Immutable snapshot of tuned caps: asset class -> cadence pair -> cap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleCaps {
    caps: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ScaleCaps {
    /// Insert one cap. Asset classes are stored lower-cased; non-finite or
    /// negative caps are ignored.
    pub fn insert(&mut self, asset: &str, pair: &str, cap: f64) {
        if !cap.is_finite() || cap < 0.0 {
            return;
        }
        self.caps
            .entry(asset.to_lowercase())
            .or_default()
            .insert(pair.trim().to_string(), cap);
    }

    /// Tuned cap for `(asset, pair)`, if any.
    #[must_use]
    pub fn lookup(&self, asset: &str, pair: &str) -> Option<f64> {
        self.caps
            .get(&asset.to_lowercase())
            .and_then(|pairs| pairs.get(pair.trim()))
            .copied()
    }

    /// Number of `(asset, pair)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caps.values().map(BTreeMap::len).sum()
    }

    /// Are there no overrides?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse the params document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(default)]
            scale_caps: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
        }

        let params: Params = serde_json::from_str(text)?;
        let mut caps = Self::default();
        for (asset, pairs) in &params.scale_caps {
            for (pair, value) in pairs {
                if let Some(cap) = value.as_f64() {
                    caps.insert(asset, pair, cap);
                }
            }
        }
        Ok(caps)
    }
}

// =============================================================================
// THRESHOLD SOURCES
// =============================================================================

/// Supplier of tuned cap snapshots.
///
/// Implementations must be cheap to call on every submission and must not
/// block on the stream store.
pub trait ThresholdSource: Send + Sync {
    /// Current snapshot.
    fn scale_caps(&self) -> Arc<ScaleCaps>;
}

/// Fixed caps, never refreshed.
#[derive(Debug, Clone, Default)]
pub struct StaticThresholds {
    caps: Arc<ScaleCaps>,
}

impl StaticThresholds {
    /// Wrap a fixed snapshot.
    #[must_use]
    pub fn new(caps: ScaleCaps) -> Self {
        Self {
            caps: Arc::new(caps),
        }
    }
}

impl ThresholdSource for StaticThresholds {
    fn scale_caps(&self) -> Arc<ScaleCaps> {
        Arc::clone(&self.caps)
    }
}

#[derive(Debug)]
struct CacheState {
    caps: Arc<ScaleCaps>,
    loaded_at: Option<Instant>,
    mtime: Option<SystemTime>,
}

/// File-backed caps with a TTL and modification-time check.
///
/// The cached snapshot is reused while it is younger than the TTL and the
/// file's mtime is unchanged. A missing file means no overrides; an unreadable
/// or corrupt file keeps the last good snapshot.
#[derive(Debug)]
pub struct TunedThresholds {
    path: PathBuf,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl TunedThresholds {
    /// Watch `path`, refreshing at most every `ttl`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            state: Mutex::new(CacheState {
                caps: Arc::new(ScaleCaps::default()),
                loaded_at: None,
                mtime: None,
            }),
        }
    }

    /// The watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
    }

    fn refresh(&self, mtime: Option<SystemTime>) -> Option<Arc<ScaleCaps>> {
        if mtime.is_none() && !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "threshold file absent; no overrides");
            return Some(Arc::new(ScaleCaps::default()));
        }

        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read threshold file; keeping last snapshot");
                return None;
            }
        };

        match ScaleCaps::from_json(&text) {
            Ok(caps) => {
                tracing::debug!(path = %self.path.display(), entries = caps.len(), "loaded tuned thresholds");
                Some(Arc::new(caps))
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt threshold file; keeping last snapshot");
                None
            }
        }
    }
}

impl ThresholdSource for TunedThresholds {
    fn scale_caps(&self) -> Arc<ScaleCaps> {
        let mtime = self.current_mtime();

        {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let fresh = state
                .loaded_at
                .is_some_and(|at| at.elapsed() < self.ttl);
            if fresh && state.mtime == mtime {
                return Arc::clone(&state.caps);
            }
        }

        // Read outside the lock; concurrent refreshes are harmless.
        let loaded = self.refresh(mtime);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(caps) = loaded {
            state.caps = caps;
        }
        state.loaded_at = Some(Instant::now());
        state.mtime = mtime;
        Arc::clone(&state.caps)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, text: &str) {
        let mut f = std::fs::File::create(path).expect("create");
        f.write_all(text.as_bytes()).expect("write");
    }

    #[test]
    fn parse_ignores_bad_entries() {
        let caps = ScaleCaps::from_json(
            r#"{"calibration": {"a": 1}, "scale_caps": {"Equity": {"min↔day": 0.05, "x": "nope", "y": -1}}}"#,
        )
        .expect("parse");
        assert_eq!(caps.len(), 1);
        assert_eq!(caps.lookup("equity", "min↔day"), Some(0.05));
        assert_eq!(caps.lookup("EQUITY", " min↔day "), Some(0.05));
        assert_eq!(caps.lookup("fx", "min↔day"), None);
    }

    #[test]
    fn parse_without_scale_caps_is_empty() {
        let caps = ScaleCaps::from_json(r#"{"calibration": {}}"#).expect("parse");
        assert!(caps.is_empty());
        assert!(ScaleCaps::from_json("[1, 2]").is_err());
    }

    #[test]
    fn missing_file_means_no_overrides() {
        let dir = TempDir::new().expect("tempdir");
        let source = TunedThresholds::new(dir.path().join("params.json"), Duration::ZERO);
        assert!(source.scale_caps().is_empty());
    }

    #[test]
    fn corrupt_file_keeps_last_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("params.json");
        write(&path, r#"{"scale_caps": {"fx": {"hour↔day": 0.02}}}"#);

        let source = TunedThresholds::new(&path, Duration::ZERO);
        assert_eq!(source.scale_caps().lookup("fx", "hour↔day"), Some(0.02));

        write(&path, "{not json");
        assert_eq!(source.scale_caps().lookup("fx", "hour↔day"), Some(0.02));
    }

    #[test]
    fn cache_reused_within_ttl() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("params.json");
        write(&path, r#"{"scale_caps": {"fx": {"hour↔day": 0.02}}}"#);

        let source = TunedThresholds::new(&path, Duration::from_secs(3600));
        let first = source.scale_caps();
        let second = source.scale_caps();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn zero_ttl_picks_up_changes() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("params.json");
        write(&path, r#"{"scale_caps": {"fx": {"hour↔day": 0.02}}}"#);

        let source = TunedThresholds::new(&path, Duration::ZERO);
        assert_eq!(source.scale_caps().lookup("fx", "hour↔day"), Some(0.02));

        write(&path, r#"{"scale_caps": {"fx": {"hour↔day": 0.07}}}"#);
        assert_eq!(source.scale_caps().lookup("fx", "hour↔day"), Some(0.07));

        std::fs::remove_file(&path).expect("remove");
        assert!(source.scale_caps().is_empty());
    }

    #[test]
    fn static_source_is_fixed() {
        let mut caps = ScaleCaps::default();
        caps.insert("bond", "day↔week", 0.5);
        caps.insert("bond", "bad", f64::NAN);
        let source = StaticThresholds::new(caps);
        assert_eq!(source.scale_caps().len(), 1);
    }
}
