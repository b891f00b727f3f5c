//! # Guard Engine
//!
//! Pure accept/reject decision for a proposed stream transition.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. Cycle cap
//! 2. Frontier non-erasure
//! 3. Holonomy spike
//! 4. Bounded drift
//!
//! The engine holds no state; tuned scale caps are passed in as a snapshot.

use crate::digest::holonomy_gap;
use crate::primitives::{CYCLE_PLUS_CAP, DELTA_HOL_CAP, DELTA_SCALE_CAP_DEFAULT};
use crate::thresholds::ScaleCaps;
use crate::{Digest, EdgeRel, Frame, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Attribute on the first Claim naming the asset class.
pub const ASSET_CLASS_ATTR: &str = "asset_class";

/// Attribute on the first Claim naming the cadence pair.
pub const CADENCE_PAIR_ATTR: &str = "cadence_pair";

/// Named cadence pairs and their drift-cap multipliers.
///
/// Pairs not listed here use the unscaled base cap.
const CADENCE_MULTIPLIERS: &[(&str, &str, f64)] = &[
    ("min", "hour", 1.0),
    ("hour", "day", 1.2),
    ("day", "week", 1.6),
];

/// Separators accepted between the two cadences of a pair, longest first.
const PAIR_SEPARATORS: &[&str] = &["<->", "->", "↔", "→", "/", "-"];

// =============================================================================
// VIOLATIONS
// =============================================================================

/// A rejected transition.
///
/// Every violation names the cap it breached and the observed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuardViolation {
    #[error("cycle_plus={observed} exceeds cap={cap} (self-reinforcing support loop)")]
    CycleCap { observed: usize, cap: usize },

    #[error(
        "x_frontier decreased from {prior} to {current} via deletions only; resolve contradictions by adding an Assumption/Counter"
    )]
    FrontierErasure { prior: usize, current: usize },

    #[error("delta_hol={gap:.2} exceeds cap={cap:.2} without an Assumption/Counter explaining the jump")]
    HolonomySpike { gap: f64, cap: f64 },

    #[error(
        "delta_scale={delta_scale:.3} exceeds cap={cap:.3} for {asset} {pair} without Counter/Assumption/edge/tolerance"
    )]
    ScaleDrift {
        delta_scale: f64,
        cap: f64,
        asset: String,
        pair: String,
    },
}

impl GuardViolation {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GuardViolation::CycleCap { .. } => "cycle_cap",
            GuardViolation::FrontierErasure { .. } => "frontier_erasure",
            GuardViolation::HolonomySpike { .. } => "holonomy_spike",
            GuardViolation::ScaleDrift { .. } => "scale_drift",
        }
    }

    /// The cap that was breached.
    ///
    /// For frontier erasure the cap is the prior frontier size.
    #[must_use]
    pub fn cap(&self) -> f64 {
        match self {
            GuardViolation::CycleCap { cap, .. } => *cap as f64,
            GuardViolation::FrontierErasure { prior, .. } => *prior as f64,
            GuardViolation::HolonomySpike { cap, .. } | GuardViolation::ScaleDrift { cap, .. } => {
                *cap
            }
        }
    }

    /// The observed value.
    #[must_use]
    pub fn observed(&self) -> f64 {
        match self {
            GuardViolation::CycleCap { observed, .. } => *observed as f64,
            GuardViolation::FrontierErasure { current, .. } => *current as f64,
            GuardViolation::HolonomySpike { gap, .. } => *gap,
            GuardViolation::ScaleDrift { delta_scale, .. } => *delta_scale,
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

fn default_cycle_cap() -> usize {
    CYCLE_PLUS_CAP
}

fn default_delta_hol_cap() -> f64 {
    DELTA_HOL_CAP
}

fn default_scale_cap() -> f64 {
    DELTA_SCALE_CAP_DEFAULT
}

fn default_asset_caps() -> BTreeMap<String, f64> {
    [
        ("equity", 0.03),
        ("fx", 0.015),
        ("crypto", 0.12),
        ("commodity", 0.04),
        ("bond", 0.01),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Guard caps and the per-asset drift table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    #[serde(default = "default_cycle_cap")]
    pub cycle_cap: usize,
    #[serde(default = "default_delta_hol_cap")]
    pub delta_hol_cap: f64,
    /// Base drift cap for assets missing from `asset_caps`.
    #[serde(default = "default_scale_cap")]
    pub default_scale_cap: f64,
    /// Base drift cap per lower-cased asset class.
    #[serde(default = "default_asset_caps")]
    pub asset_caps: BTreeMap<String, f64>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cycle_cap: default_cycle_cap(),
            delta_hol_cap: default_delta_hol_cap(),
            default_scale_cap: default_scale_cap(),
            asset_caps: default_asset_caps(),
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Stateless guard evaluator.
#[derive(Debug, Clone, Default)]
pub struct GuardEngine {
    config: GuardConfig,
}

impl GuardEngine {
    /// Create an engine with the given caps.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decide whether `frame`, whose recomputed digest is `digest`, may follow
    /// `prior` on its stream.
    pub fn check(
        &self,
        frame: &Frame,
        digest: &Digest,
        prior: Option<&Digest>,
        scale_caps: &ScaleCaps,
    ) -> Result<(), GuardViolation> {
        self.check_cycles(digest)?;
        if let Some(prior) = prior {
            Self::check_frontier(frame, digest, prior)?;
            self.check_holonomy(frame, digest, prior)?;
        }
        self.check_drift(frame, scale_caps)
    }

    fn check_cycles(&self, digest: &Digest) -> Result<(), GuardViolation> {
        if digest.cycle_plus > self.config.cycle_cap {
            return Err(GuardViolation::CycleCap {
                observed: digest.cycle_plus,
                cap: self.config.cycle_cap,
            });
        }
        Ok(())
    }

    fn check_frontier(frame: &Frame, digest: &Digest, prior: &Digest) -> Result<(), GuardViolation> {
        if digest.x_frontier < prior.x_frontier && frame.has_deletions() && !frame.adds_resolver() {
            return Err(GuardViolation::FrontierErasure {
                prior: prior.x_frontier,
                current: digest.x_frontier,
            });
        }
        Ok(())
    }

    fn check_holonomy(
        &self,
        frame: &Frame,
        digest: &Digest,
        prior: &Digest,
    ) -> Result<(), GuardViolation> {
        let gap = holonomy_gap(prior, digest);
        if gap > self.config.delta_hol_cap && !frame.adds_resolver() {
            return Err(GuardViolation::HolonomySpike {
                gap,
                cap: self.config.delta_hol_cap,
            });
        }
        Ok(())
    }

    fn check_drift(&self, frame: &Frame, scale_caps: &ScaleCaps) -> Result<(), GuardViolation> {
        let delta_scale = match frame.telemetry.delta_scale {
            Some(ds) if ds != 0.0 => ds,
            _ => return Ok(()),
        };

        let (asset, pair) = drift_context(frame);
        let cap = self.effective_scale_cap(&asset, &pair, scale_caps);

        if delta_scale.abs() > cap && !has_explanation(frame) {
            return Err(GuardViolation::ScaleDrift {
                delta_scale,
                cap,
                asset,
                pair,
            });
        }
        Ok(())
    }

    /// Drift cap for an asset class and cadence pair.
    ///
    /// A tuned override for `(asset, pair)` replaces the computed cap.
    #[must_use]
    pub fn effective_scale_cap(&self, asset: &str, pair: &str, scale_caps: &ScaleCaps) -> f64 {
        if let Some(tuned) = scale_caps.lookup(asset, pair) {
            return tuned;
        }
        let base = self
            .config
            .asset_caps
            .get(&asset.to_lowercase())
            .copied()
            .unwrap_or(self.config.default_scale_cap);
        base * cadence_multiplier(pair)
    }
}

/// Asset class (lower-cased, default `"default"`) and cadence pair from the
/// first Claim node.
fn drift_context(frame: &Frame) -> (String, String) {
    let claim = frame.nodes.iter().find(|n| n.node_type == NodeType::Claim);
    let attr = |key: &str| {
        claim
            .and_then(|n| n.attrs.get(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let asset = attr(ASSET_CLASS_ATTR)
        .map(|a| a.to_lowercase())
        .unwrap_or_else(|| "default".to_string());
    let pair = attr(CADENCE_PAIR_ATTR).unwrap_or_default();
    (asset, pair)
}

/// Does the frame already explain a drift overrun?
fn has_explanation(frame: &Frame) -> bool {
    frame.nodes.iter().any(|n| n.node_type.is_resolver())
        || frame
            .edges
            .iter()
            .any(|e| matches!(e.rel, EdgeRel::Supports | EdgeRel::Contradicts))
        || frame
            .telemetry
            .delta_scale_tolerance
            .is_some_and(|t| t >= 0.0)
}

/// Split a cadence pair on its separator into lower-cased halves.
///
/// `"Hour <-> Day"`, `"hour/day"` and `"hour↔day"` all give `("hour", "day")`.
#[must_use]
pub fn split_cadence_pair(pair: &str) -> Option<(String, String)> {
    let pair = pair.trim().to_lowercase();
    let (a, b) = PAIR_SEPARATORS
        .iter()
        .find_map(|sep| pair.split_once(sep))?;
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a.to_string(), b.to_string()))
}

/// Multiplier applied to the base drift cap for a cadence pair.
///
/// Matches the named pairs in either order; anything else is ×1.0.
#[must_use]
pub fn cadence_multiplier(pair: &str) -> f64 {
    let Some((a, b)) = split_cadence_pair(pair) else {
        return 1.0;
    };
    CADENCE_MULTIPLIERS
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map_or(1.0, |(_, _, m)| *m)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, MorphOp, Node, Telemetry};

    fn digest(x_frontier: usize, cycle_plus: usize) -> Digest {
        Digest {
            b0: 1,
            cycle_plus,
            x_frontier,
            s_over_c: 0.0,
            depth: 0,
        }
    }

    fn drift_frame(asset: &str, pair: &str, delta_scale: f64) -> Frame {
        let claim = Node::new("c1", NodeType::Claim, "price")
            .with_attr(ASSET_CLASS_ATTR, asset)
            .with_attr(CADENCE_PAIR_ATTR, pair);
        Frame::new("s", 1)
            .with_graph(vec![claim], Vec::new())
            .with_telemetry(Telemetry {
                delta_scale: Some(delta_scale),
                ..Telemetry::default()
            })
    }

    #[test]
    fn cadence_pairs_split_on_any_separator() {
        let hour_day = Some(("hour".to_string(), "day".to_string()));
        assert_eq!(split_cadence_pair("hour↔day"), hour_day);
        assert_eq!(split_cadence_pair("Hour <-> Day"), hour_day);
        assert_eq!(split_cadence_pair("hour->day"), hour_day);
        assert_eq!(split_cadence_pair("hour/day"), hour_day);
        assert_eq!(split_cadence_pair("hour-day"), hour_day);
        assert_eq!(split_cadence_pair("daily"), None);
        assert_eq!(split_cadence_pair("hour↔"), None);
    }

    #[test]
    fn cadence_multipliers_use_named_pairs() {
        assert!((cadence_multiplier("min↔hour") - 1.0).abs() < f64::EPSILON);
        assert!((cadence_multiplier("hour↔day") - 1.2).abs() < f64::EPSILON);
        assert!((cadence_multiplier("day↔week") - 1.6).abs() < f64::EPSILON);
        // Either order, any separator.
        assert!((cadence_multiplier("day/hour") - 1.2).abs() < f64::EPSILON);
        assert!((cadence_multiplier("week <-> day") - 1.6).abs() < f64::EPSILON);
        // Unlisted pairs keep the base cap.
        assert!((cadence_multiplier("min↔day") - 1.0).abs() < f64::EPSILON);
        assert!((cadence_multiplier("min↔week") - 1.0).abs() < f64::EPSILON);
        assert!((cadence_multiplier("unknown") - 1.0).abs() < f64::EPSILON);
        assert!((cadence_multiplier("") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn drift_cap_brackets_each_named_pair() {
        let engine = GuardEngine::default();
        let caps = ScaleCaps::default();
        // Equity base cap 0.03.
        for (pair, cap) in [
            ("min↔hour", 0.03),
            ("hour↔day", 0.036),
            ("day↔week", 0.048),
            ("min↔day", 0.03),
        ] {
            assert!((engine.effective_scale_cap("equity", pair, &caps) - cap).abs() < 1e-12);

            let below = drift_frame("equity", pair, cap - 0.001);
            assert!(
                engine.check(&below, &digest(0, 0), None, &caps).is_ok(),
                "{pair} below cap"
            );

            let above = drift_frame("equity", pair, cap + 0.001);
            let err = engine
                .check(&above, &digest(0, 0), None, &caps)
                .expect_err("above cap");
            assert_eq!(err.code(), "scale_drift");
            assert!((err.cap() - cap).abs() < 1e-12, "{pair} cap");
        }
    }

    #[test]
    fn negative_drift_compared_by_magnitude() {
        let engine = GuardEngine::default();
        let frame = drift_frame("equity", "day↔week", -0.05);
        assert!(
            engine
                .check(&frame, &digest(0, 0), None, &ScaleCaps::default())
                .is_err()
        );
    }

    #[test]
    fn cycle_cap_rejects() {
        let engine = GuardEngine::default();
        let frame = Frame::new("s", 1);
        let err = engine
            .check(&frame, &digest(0, 5), None, &ScaleCaps::default())
            .expect_err("rejected");
        assert_eq!(err.code(), "cycle_cap");
        assert!(err.to_string().contains("cap=4"));
        assert!((err.cap() - 4.0).abs() < f64::EPSILON);
        assert!((err.observed() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn frontier_erasure_requires_deletions() {
        let engine = GuardEngine::default();
        let prior = digest(2, 0);
        let current = digest(1, 0);

        // No deletions: accepted.
        let frame = Frame::new("s", 2);
        assert!(
            engine
                .check(&frame, &current, Some(&prior), &ScaleCaps::default())
                .is_ok()
        );

        // Deletions only: rejected.
        let frame = Frame::new("s", 2).with_morph(MorphOp::DelNode {
            id: "x1".to_string(),
        });
        let err = engine
            .check(&frame, &current, Some(&prior), &ScaleCaps::default())
            .expect_err("rejected");
        assert_eq!(err.code(), "frontier_erasure");

        // Deletions plus a resolver: accepted.
        let frame = frame.with_morph(MorphOp::AddNode {
            node: Node::new("a1", NodeType::Assumption, "scope"),
        });
        assert!(
            engine
                .check(&frame, &current, Some(&prior), &ScaleCaps::default())
                .is_ok()
        );
    }

    #[test]
    fn holonomy_spike() {
        let engine = GuardEngine::default();
        let prior = digest(0, 0);
        let current = Digest {
            b0: 4,
            ..digest(0, 0)
        };
        let frame = Frame::new("s", 2);
        let err = engine
            .check(&frame, &current, Some(&prior), &ScaleCaps::default())
            .expect_err("rejected");
        assert_eq!(err.code(), "holonomy_spike");
        assert!((err.observed() - 3.0).abs() < 1e-12);

        let frame = frame.with_morph(MorphOp::AddNode {
            node: Node::new("k1", NodeType::Counter, "explains"),
        });
        assert!(
            engine
                .check(&frame, &current, Some(&prior), &ScaleCaps::default())
                .is_ok()
        );
    }

    #[test]
    fn no_prior_skips_prior_checks() {
        let engine = GuardEngine::default();
        let frame = Frame::new("s", 1).with_morph(MorphOp::DelNode {
            id: "n".to_string(),
        });
        assert!(
            engine
                .check(&frame, &digest(0, 0), None, &ScaleCaps::default())
                .is_ok()
        );
    }

    #[test]
    fn drift_uses_asset_and_pair() {
        let engine = GuardEngine::default();
        let frame = drift_frame("Equity", "hour↔day", 0.15);
        let err = engine
            .check(&frame, &digest(0, 0), None, &ScaleCaps::default())
            .expect_err("rejected");
        assert_eq!(err.code(), "scale_drift");
        assert!((err.cap() - 0.036).abs() < 1e-12);
        assert!(err.to_string().contains("equity hour↔day"));

        // Within the crypto cap.
        let frame = drift_frame("crypto", "min↔hour", 0.10);
        assert!(
            engine
                .check(&frame, &digest(0, 0), None, &ScaleCaps::default())
                .is_ok()
        );
    }

    #[test]
    fn drift_excused_by_explanation() {
        let engine = GuardEngine::default();
        let caps = ScaleCaps::default();

        let mut frame = drift_frame("equity", "hour↔day", 0.15);
        frame.telemetry.delta_scale_tolerance = Some(0.0);
        assert!(engine.check(&frame, &digest(0, 0), None, &caps).is_ok());

        let mut frame = drift_frame("equity", "hour↔day", 0.15);
        frame.nodes.push(Node::new("e1", NodeType::Evidence, "obs"));
        frame.edges.push(Edge::new("e1", "c1", EdgeRel::Supports));
        assert!(engine.check(&frame, &digest(0, 0), None, &caps).is_ok());

        let mut frame = drift_frame("equity", "hour↔day", 0.15);
        frame.telemetry.delta_scale_tolerance = Some(-1.0);
        assert!(engine.check(&frame, &digest(0, 0), None, &caps).is_err());
    }

    #[test]
    fn zero_drift_skips_check() {
        let engine = GuardEngine::default();
        let frame = drift_frame("bond", "hour↔day", 0.0);
        assert!(
            engine
                .check(&frame, &digest(0, 0), None, &ScaleCaps::default())
                .is_ok()
        );
    }

    #[test]
    fn tuned_cap_overrides() {
        let engine = GuardEngine::default();
        let mut caps = ScaleCaps::default();
        caps.insert("equity", "hour↔day", 0.2);
        let frame = drift_frame("Equity", "hour↔day", 0.15);
        assert!(engine.check(&frame, &digest(0, 0), None, &caps).is_ok());
        assert!((engine.effective_scale_cap("EQUITY", "hour↔day", &caps) - 0.2).abs() < 1e-12);

        // A tighter tuned cap also wins over the multiplied cap.
        caps.insert("equity", "day↔week", 0.01);
        let frame = drift_frame("equity", "day↔week", 0.02);
        let err = engine
            .check(&frame, &digest(0, 0), None, &caps)
            .expect_err("tuned cap is tighter");
        assert!((err.cap() - 0.01).abs() < 1e-12);

        // Overrides are keyed by the exact pair string.
        assert!((engine.effective_scale_cap("equity", "week↔day", &caps) - 0.048).abs() < 1e-12);
    }

    #[test]
    fn config_deserializes_partially() {
        let config: GuardConfig = serde_json::from_str(r#"{"cycle_cap": 2}"#).expect("parse");
        assert_eq!(config.cycle_cap, 2);
        assert!((config.delta_hol_cap - DELTA_HOL_CAP).abs() < f64::EPSILON);
        assert_eq!(config.asset_caps.get("fx"), Some(&0.015));
    }
}
