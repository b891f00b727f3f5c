//! # Frame Validation
//!
//! Shape checks for frames arriving at the boundary.
//!
//! - Validate once, before any digest or guard work
//! - Reject malformed frames with a precise `ShapeError`
//! - Never repair or enrich the input

use crate::primitives::{MAX_FRAME_EDGES, MAX_FRAME_MORPHS, MAX_FRAME_NODES};
use crate::{Edge, Frame, MorphOp, Node, OpenlineError, ShapeError, Telemetry};
use serde_json::Value;
use std::collections::BTreeSet;

/// Envelope key producers may wrap a frame in.
pub const FRAME_ENVELOPE_KEY: &str = "frame";

/// Decode frame JSON, accepting both a bare frame and `{"frame": {...}}`.
///
/// Only decodes; call [`FrameValidator::validate`] before using the frame.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, OpenlineError> {
    let mut value: Value = serde_json::from_slice(bytes)
        .map_err(|e| OpenlineError::SerializationError(format!("Malformed JSON: {}", e)))?;
    if let Some(inner) = value.get_mut(FRAME_ENVELOPE_KEY) {
        value = inner.take();
    }
    serde_json::from_value(value)
        .map_err(|e| OpenlineError::SerializationError(format!("Invalid frame: {}", e)))
}

/// Stateless validator for [`Frame`] shapes.
pub struct FrameValidator;

impl FrameValidator {
    /// Validate a frame.
    ///
    /// A frame is valid if:
    /// - `stream_id` is non-empty
    /// - Node, edge and morph counts are within the frame limits
    /// - Node ids are non-empty and unique
    /// - Every edge references known nodes and is not a self-loop
    /// - Every weight is finite and in `[0, 1]`
    /// - Every morph payload is well-formed
    /// - Telemetry values are in range
    pub fn validate(frame: &Frame) -> Result<(), ShapeError> {
        if frame.stream_id.trim().is_empty() {
            return Err(ShapeError::EmptyStreamId);
        }

        Self::check_size("nodes", frame.nodes.len(), MAX_FRAME_NODES)?;
        Self::check_size("edges", frame.edges.len(), MAX_FRAME_EDGES)?;
        Self::check_size("morphs", frame.morphs.len(), MAX_FRAME_MORPHS)?;

        Self::validate_graph(&frame.nodes, &frame.edges)?;

        for morph in &frame.morphs {
            Self::validate_morph(morph)?;
        }

        Self::validate_telemetry(&frame.telemetry)
    }

    /// Validate nodes and edges as a standalone graph.
    pub fn validate_graph(nodes: &[Node], edges: &[Edge]) -> Result<(), ShapeError> {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for node in nodes {
            if node.id.is_empty() {
                return Err(ShapeError::EmptyNodeId);
            }
            if !ids.insert(node.id.as_str()) {
                return Err(ShapeError::DuplicateNodeId(node.id.clone()));
            }
            Self::check_weight(&node.id, node.weight)?;
        }

        for edge in edges {
            if edge.src == edge.dst {
                return Err(ShapeError::SelfLoop(edge.src.clone()));
            }
            if !ids.contains(edge.src.as_str()) || !ids.contains(edge.dst.as_str()) {
                return Err(ShapeError::UnknownEndpoint {
                    src: edge.src.clone(),
                    dst: edge.dst.clone(),
                });
            }
            Self::check_weight(&format!("{}->{}", edge.src, edge.dst), edge.weight)?;
        }

        Ok(())
    }

    /// Validate one morph payload.
    pub fn validate_morph(morph: &MorphOp) -> Result<(), ShapeError> {
        let op = morph.name();
        let invalid = |reason: &str| ShapeError::InvalidMorph {
            op,
            reason: reason.to_string(),
        };

        match morph {
            MorphOp::AddNode { node } => {
                if node.id.is_empty() {
                    return Err(invalid("node id must not be empty"));
                }
                Self::check_weight(&node.id, node.weight)
            }
            MorphOp::AddEdge(edge) => {
                if edge.src.is_empty() || edge.dst.is_empty() {
                    return Err(invalid("edge endpoints must not be empty"));
                }
                if edge.src == edge.dst {
                    return Err(invalid("edge cannot be a self-loop"));
                }
                Self::check_weight(&format!("{}->{}", edge.src, edge.dst), edge.weight)
            }
            MorphOp::DelNode { id } | MorphOp::Retype { id, .. } => {
                if id.is_empty() {
                    return Err(invalid("id must not be empty"));
                }
                Ok(())
            }
            MorphOp::DelEdge { src, dst, .. } => {
                if src.is_empty() || dst.is_empty() {
                    return Err(invalid("edge endpoints must not be empty"));
                }
                Ok(())
            }
            MorphOp::Reweight { id, weight } => {
                let item = id.as_deref().unwrap_or("reweight");
                if !(weight.is_finite() && (0.0..=1.0).contains(weight)) {
                    return Err(invalid(&format!("weight of {item} must be in [0, 1]")));
                }
                Ok(())
            }
            MorphOp::Merge { ids, into } => {
                if ids.is_empty() {
                    return Err(invalid("ids must not be empty"));
                }
                if into.is_empty() {
                    return Err(invalid("into must not be empty"));
                }
                Ok(())
            }
            MorphOp::Split { id, into_ids } => {
                if id.is_empty() {
                    return Err(invalid("id must not be empty"));
                }
                if into_ids.is_empty() {
                    return Err(invalid("into_ids must not be empty"));
                }
                Ok(())
            }
            MorphOp::Homotopy {
                path,
                control_points,
                note,
            } => {
                if path.is_none() && control_points.is_none() && note.is_none() {
                    return Err(invalid("one of path, control_points or note is required"));
                }
                Ok(())
            }
        }
    }

    /// Validate telemetry ranges.
    pub fn validate_telemetry(telemetry: &Telemetry) -> Result<(), ShapeError> {
        let unit = [
            ("phi_sem", telemetry.phi_sem),
            ("phi_topo", telemetry.phi_topo),
            ("kappa_eff", telemetry.kappa_eff),
        ];
        for (field, value) in unit {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ShapeError::InvalidTelemetry { field, value });
            }
        }

        let non_negative = [
            ("delta_hol", Some(telemetry.delta_hol)),
            ("commutator", telemetry.commutator),
            ("da_drift", telemetry.da_drift),
        ];
        for (field, value) in non_negative {
            if let Some(value) = value
                && !(value.is_finite() && value >= 0.0)
            {
                return Err(ShapeError::InvalidTelemetry { field, value });
            }
        }

        let finite = [
            ("delta_scale", telemetry.delta_scale),
            ("delta_scale_tolerance", telemetry.delta_scale_tolerance),
        ];
        for (field, value) in finite {
            if let Some(value) = value
                && !value.is_finite()
            {
                return Err(ShapeError::InvalidTelemetry { field, value });
            }
        }

        Ok(())
    }

    fn check_size(what: &'static str, count: usize, max: usize) -> Result<(), ShapeError> {
        if count > max {
            return Err(ShapeError::TooLarge { what, count, max });
        }
        Ok(())
    }

    fn check_weight(item: &str, weight: f64) -> Result<(), ShapeError> {
        if !(weight.is_finite() && (0.0..=1.0).contains(&weight)) {
            return Err(ShapeError::WeightOutOfRange {
                item: item.to_string(),
                weight,
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
