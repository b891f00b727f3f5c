//! # Schema Export
//!
//! JSON Schema bundle for the wire shapes, and its BLAKE3 fingerprint.

use crate::{Digest, Edge, Frame, MorphOp, Node, OpenlineError, Telemetry};
use schemars::{JsonSchema, schema_for};
use serde_json::{Map, Value};

/// Identifier embedded in the bundle.
pub const SCHEMA_ID: &str = "openline/frame";

fn schema_value<T: JsonSchema>() -> Result<Value, OpenlineError> {
    serde_json::to_value(schema_for!(T))
        .map_err(|e| OpenlineError::SerializationError(e.to_string()))
}

/// Schemas for `Frame` and its parts, keyed by type name.
pub fn frame_schema() -> Result<Value, OpenlineError> {
    let mut definitions = Map::new();
    definitions.insert("Node".to_string(), schema_value::<Node>()?);
    definitions.insert("Edge".to_string(), schema_value::<Edge>()?);
    definitions.insert("Digest".to_string(), schema_value::<Digest>()?);
    definitions.insert("Telemetry".to_string(), schema_value::<Telemetry>()?);
    definitions.insert("MorphOp".to_string(), schema_value::<MorphOp>()?);
    definitions.insert("Frame".to_string(), schema_value::<Frame>()?);

    let mut bundle = Map::new();
    bundle.insert("id".to_string(), Value::String(SCHEMA_ID.to_string()));
    bundle.insert(
        "version".to_string(),
        Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    bundle.insert("definitions".to_string(), Value::Object(definitions));
    Ok(Value::Object(bundle))
}

/// BLAKE3 hex digest of the serialized schema bundle.
#[cfg(feature = "crypto-hash")]
pub fn schema_hash() -> Result<String, OpenlineError> {
    let bytes = serde_json::to_vec(&frame_schema()?)
        .map_err(|e| OpenlineError::SerializationError(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
