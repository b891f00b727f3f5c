//! # Core Type Definitions
//!
//! This module contains the wire data model shared by the content-generation
//! path (extractor, metrics) and the acceptance path (digest, guards, store):
//! - Graph elements (`Node`, `NodeType`, `Edge`, `EdgeRel`)
//! - The structural fingerprint (`Digest`)
//! - Edit operations (`MorphOp`)
//! - Scalar signals (`Telemetry`)
//! - The unit of exchange (`Frame`)
//! - Error types (`ShapeError`, `OpenlineError`)
//!
//! Every shape here is validated once at the boundary (see
//! [`crate::validate::FrameValidator`]); internal functions assume the
//! validated form.

use crate::guard::GuardViolation;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

fn default_weight() -> f64 {
    1.0
}

// =============================================================================
// NODE TYPES & EDGE RELATIONS
// =============================================================================

/// Role of a node in the argumentation graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum NodeType {
    Claim,
    Evidence,
    Counter,
    Assumption,
    Constraint,
    PlanStep,
    Outcome,
    Principle,
    Motif,
    /// Citation target emitted by the text extractor.
    Source,
}

impl NodeType {
    /// Counter and Assumption are the only roles that explain a structural jump.
    #[must_use]
    pub fn is_resolver(self) -> bool {
        matches!(self, NodeType::Counter | NodeType::Assumption)
    }

    /// Wire name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Claim => "Claim",
            NodeType::Evidence => "Evidence",
            NodeType::Counter => "Counter",
            NodeType::Assumption => "Assumption",
            NodeType::Constraint => "Constraint",
            NodeType::PlanStep => "PlanStep",
            NodeType::Outcome => "Outcome",
            NodeType::Principle => "Principle",
            NodeType::Motif => "Motif",
            NodeType::Source => "Source",
        }
    }

    /// Single-letter prefix used for generated node ids.
    #[must_use]
    pub fn initial(self) -> char {
        self.as_str().chars().next().unwrap_or('N')
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed relation carried by a directed edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRel {
    Supports,
    Contradicts,
    DependsOn,
    Derives,
    Updates,
    Instantiates,
    Illustrates,
    /// Content node → Source citation, emitted by the text extractor.
    Cites,
}

impl EdgeRel {
    /// Wire name of this relation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeRel::Supports => "supports",
            EdgeRel::Contradicts => "contradicts",
            EdgeRel::DependsOn => "depends_on",
            EdgeRel::Derives => "derives",
            EdgeRel::Updates => "updates",
            EdgeRel::Instantiates => "instantiates",
            EdgeRel::Illustrates => "illustrates",
            EdgeRel::Cites => "cites",
        }
    }
}

impl std::fmt::Display for EdgeRel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// NODE & EDGE
// =============================================================================

/// A node of the argumentation graph.
///
/// Ids are unique within a frame. Once part of an accepted frame a node only
/// changes through explicit morphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub label: String,
    /// Confidence weight in `[0, 1]`.
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl Node {
    /// Create a node with weight 1.0 and no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            weight: 1.0,
            attrs: BTreeMap::new(),
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Add one attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// A directed, typed edge between two nodes of the same frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    pub rel: EdgeRel,
    /// Confidence weight in `[0, 1]`.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Edge {
    /// Create an edge with weight 1.0.
    #[must_use]
    pub fn new(src: impl Into<String>, dst: impl Into<String>, rel: EdgeRel) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            rel,
            weight: 1.0,
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

// =============================================================================
// DIGEST
// =============================================================================

/// Five-field structural fingerprint of a graph.
///
/// Derived, never hand-authored. The frame service recomputes it on every
/// submission; a client-supplied digest is only a hint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Digest {
    /// Weakly connected components.
    pub b0: usize,
    /// Back-edges found in the `supports`-only subgraph.
    pub cycle_plus: usize,
    /// Live contradictions (`contradicts` edges).
    pub x_frontier: usize,
    /// Supports : contradictions ratio (supports count when there are none).
    pub s_over_c: f64,
    /// Longest `depends_on` chain.
    pub depth: usize,
}

impl Digest {
    /// The five fields as a vector, in wire order.
    #[must_use]
    pub fn as_vector(&self) -> [f64; 5] {
        [
            self.b0 as f64,
            self.cycle_plus as f64,
            self.x_frontier as f64,
            self.s_over_c,
            self.depth as f64,
        ]
    }
}

// =============================================================================
// TELEMETRY
// =============================================================================

/// Advisory scalar signals attached to a frame.
///
/// Only `delta_scale` / `delta_scale_tolerance` take part in acceptance; the
/// rest is reported, never gated on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Telemetry {
    /// Semantic coherence in `[0, 1]`.
    pub phi_sem: f64,
    /// Topological coherence in `[0, 1]`.
    pub phi_topo: f64,
    /// Holonomy gap to the previous accepted digest.
    pub delta_hol: f64,
    /// Effective uncertainty in `[0, 1]`.
    pub kappa_eff: f64,
    pub cost_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commutator: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub da_drift: Option<f64>,
    /// Drift between two cadences of the same quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_scale: Option<f64>,
    /// Declared tolerance; any non-negative value excuses a drift overrun.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_scale_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rho: Option<f64>,
    #[serde(alias = "S_star", skip_serializing_if = "Option::is_none")]
    pub s_star: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cite_score: Option<f64>,
    /// Extraction confidence.
    #[serde(alias = "conf", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

// =============================================================================
// MORPHS
// =============================================================================

/// One incremental edit applied by a producer between two logical times.
///
/// Wire form: `{"op": "add_node", "payload": {"node": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", content = "payload", rename_all = "snake_case")]
pub enum MorphOp {
    AddNode {
        node: Node,
    },
    AddEdge(Edge),
    DelNode {
        id: String,
    },
    DelEdge {
        src: String,
        dst: String,
        rel: EdgeRel,
    },
    Retype {
        id: String,
        new_type: NodeType,
    },
    Reweight {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        weight: f64,
    },
    Merge {
        ids: Vec<String>,
        into: String,
    },
    Split {
        id: String,
        into_ids: Vec<String>,
    },
    Homotopy {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        control_points: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

impl MorphOp {
    /// Wire name of the operation.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            MorphOp::AddNode { .. } => "add_node",
            MorphOp::AddEdge(_) => "add_edge",
            MorphOp::DelNode { .. } => "del_node",
            MorphOp::DelEdge { .. } => "del_edge",
            MorphOp::Retype { .. } => "retype",
            MorphOp::Reweight { .. } => "reweight",
            MorphOp::Merge { .. } => "merge",
            MorphOp::Split { .. } => "split",
            MorphOp::Homotopy { .. } => "homotopy",
        }
    }

    /// `del_node` or `del_edge`.
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        matches!(self, MorphOp::DelNode { .. } | MorphOp::DelEdge { .. })
    }

    /// An `add_node` whose node is a Counter or Assumption.
    #[must_use]
    pub fn adds_resolver(&self) -> bool {
        matches!(self, MorphOp::AddNode { node } if node.node_type.is_resolver())
    }
}

// =============================================================================
// FRAME
// =============================================================================

/// Coordinate system of the frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Gauge {
    /// Symbolic only.
    #[default]
    Sym,
    /// Embedding / continuous coordinates.
    Emb,
}

/// One versioned snapshot of a stream's argumentation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Frame {
    #[serde(alias = "stream")]
    pub stream_id: String,
    #[serde(default, alias = "t_logical")]
    pub logical_time: u64,
    #[serde(default)]
    pub gauge: Gauge,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Client-supplied and untrusted; replaced on acceptance.
    #[serde(default)]
    pub digest: Option<Digest>,
    #[serde(default)]
    pub morphs: Vec<MorphOp>,
    #[serde(default, alias = "telem")]
    pub telemetry: Telemetry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Frame {
    /// Create an empty frame for a stream.
    #[must_use]
    pub fn new(stream_id: impl Into<String>, logical_time: u64) -> Self {
        Self {
            stream_id: stream_id.into(),
            logical_time,
            gauge: Gauge::Sym,
            units: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            digest: None,
            morphs: Vec::new(),
            telemetry: Telemetry::default(),
            signature: None,
        }
    }

    /// Set nodes and edges.
    #[must_use]
    pub fn with_graph(mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        self.nodes = nodes;
        self.edges = edges;
        self
    }

    /// Append a morph.
    #[must_use]
    pub fn with_morph(mut self, morph: MorphOp) -> Self {
        self.morphs.push(morph);
        self
    }

    /// Replace telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Does the morph batch add a Counter or Assumption node?
    #[must_use]
    pub fn adds_resolver(&self) -> bool {
        self.morphs.iter().any(MorphOp::adds_resolver)
    }

    /// Does the morph batch delete anything?
    #[must_use]
    pub fn has_deletions(&self) -> bool {
        self.morphs.iter().any(MorphOp::is_deletion)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// A frame whose shape violates the data model.
///
/// Reported before any guard runs; nothing is committed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("stream_id must not be empty")]
    EmptyStreamId,

    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("Node id must not be empty")]
    EmptyNodeId,

    #[error("Edge references unknown node: {src} -> {dst}")]
    UnknownEndpoint { src: String, dst: String },

    #[error("Edge cannot be a self-loop: {0} -> {0}")]
    SelfLoop(String),

    #[error("Weight of {item} must be in [0, 1], got {weight}")]
    WeightOutOfRange { item: String, weight: f64 },

    #[error("Invalid {op} payload: {reason}")]
    InvalidMorph { op: &'static str, reason: String },

    #[error("Telemetry field {field} out of range: {value}")]
    InvalidTelemetry { field: &'static str, value: f64 },

    #[error("Too many {what}: {count} exceeds maximum {max}")]
    TooLarge {
        what: &'static str,
        count: usize,
        max: usize,
    },
}

/// Errors that can occur in the OpenLine core.
///
/// - No silent failures
/// - Every failure is scoped to a single frame; nothing here is fatal
#[derive(Debug, Error)]
pub enum OpenlineError {
    /// The frame is malformed.
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] ShapeError),

    /// A guard rejected the transition.
    #[error("Guard violation: {0}")]
    GuardViolation(#[from] GuardViolation),

    /// Another frame for the same stream committed first, repeatedly.
    #[error("Stream {0} was updated concurrently; retry the frame")]
    StreamConflict(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
