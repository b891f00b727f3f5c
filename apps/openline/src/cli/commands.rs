//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::AppConfig;
use openline_core::{
    Digest, Frame, FrameBuilder, OpenlineError, compute_digest, decode_frame, schema,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), OpenlineError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| OpenlineError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(OpenlineError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, OpenlineError> {
    let canonical = path.canonicalize().map_err(|e| {
        OpenlineError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(OpenlineError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read a bounded input file as text.
fn read_input(path: &Path, max_size: usize) -> Result<String, OpenlineError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, max_size as u64)?;
    std::fs::read_to_string(&path)
        .map_err(|e| OpenlineError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), OpenlineError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| OpenlineError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), OpenlineError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!("OpenLine Frame Bus Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:            {}", config.server.host);
    println!("  Port:            {}", config.server.port);
    println!("  Max frame bytes: {}", config.server.max_frame_bytes);
    println!("  Cycle cap:       {}", config.guard.cycle_cap);
    println!("  Holonomy cap:    {}", config.guard.delta_hol_cap);
    if let Some(path) = &config.thresholds.params_path {
        println!("  Tuned params:    {}", path.display());
    }
    println!();
    println!("Endpoints:");
    println!("  POST /frame               - Submit a frame");
    println!("  POST /extract             - Build a frame from text");
    println!("  GET  /streams/{{stream_id}} - Latest stream digest");
    println!("  GET  /schema              - JSON Schema bundle");
    println!("  GET  /health              - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = config.server.addr();
    api::run_server(&addr, AppState::from_config(&config)).await
}

// =============================================================================
// EXTRACT COMMAND
// =============================================================================

/// Build a frame from text and print it.
pub fn cmd_extract(
    config: &AppConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    stream: &str,
    time: u64,
    verbose: bool,
) -> Result<(), OpenlineError> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(file)) => read_input(&file, config.server.max_frame_bytes)?,
        (None, None) => {
            return Err(OpenlineError::IoError(
                "Either --text or --file is required".to_string(),
            ));
        }
    };

    let frame = FrameBuilder::new(stream).logical_time(time).build(&text);
    if verbose {
        eprintln!(
            "extracted {} nodes, {} edges (confidence {:.2})",
            frame.nodes.len(),
            frame.edges.len(),
            frame.telemetry.confidence.unwrap_or_default()
        );
    }
    print_json(&frame)
}

// =============================================================================
// DIGEST COMMAND
// =============================================================================

/// Recomputed digest alongside the one the producer supplied.
#[derive(Debug, Serialize)]
pub struct DigestReport {
    pub digest: Digest,
    pub supplied: Option<Digest>,
    pub matches: bool,
}

/// Recompute a frame's digest.
pub fn digest_report(frame: &Frame) -> DigestReport {
    let digest = compute_digest(&frame.nodes, &frame.edges);
    DigestReport {
        matches: frame.digest.as_ref() == Some(&digest),
        supplied: frame.digest.clone(),
        digest,
    }
}

/// Print the recomputed digest of a frame file.
pub fn cmd_digest(config: &AppConfig, file: &Path, verbose: bool) -> Result<(), OpenlineError> {
    let frame = decode_frame(read_input(file, config.server.max_frame_bytes)?.as_bytes())?;
    let report = digest_report(&frame);
    if verbose {
        eprintln!("digest vector: {:?}", report.digest.as_vector());
    }
    print_json(&report)
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate a frame file and run the guards against an optional prior.
pub fn cmd_check(
    config: &AppConfig,
    file: &Path,
    prior: Option<&Path>,
    verbose: bool,
) -> Result<(), OpenlineError> {
    let frame = decode_frame(read_input(file, config.server.max_frame_bytes)?.as_bytes())?;
    let prior: Option<Digest> = match prior {
        Some(path) => Some(
            serde_json::from_str(&read_input(path, config.server.max_frame_bytes)?).map_err(
                |e| OpenlineError::SerializationError(format!("Invalid prior digest: {}", e)),
            )?,
        ),
        None => None,
    };

    let service = config.build_service();
    let acceptance = service.preview(frame, prior)?;
    if verbose {
        eprintln!(
            "accepted: delta_hol={} x_frontier={}",
            acceptance.telemetry.delta_hol, acceptance.digest.x_frontier
        );
    }
    print_json(&acceptance)
}

// =============================================================================
// SCHEMA COMMAND
// =============================================================================

/// Print or write the schema bundle.
pub fn cmd_schema(hash_only: bool, output: Option<&Path>) -> Result<(), OpenlineError> {
    if hash_only {
        println!("{}", schema::schema_hash()?);
        return Ok(());
    }

    let bundle = schema::frame_schema()?;
    match output {
        Some(path) => {
            let text = serde_json::to_string_pretty(&bundle)
                .map_err(|e| OpenlineError::SerializationError(e.to_string()))?;
            std::fs::write(path, text).map_err(|e| {
                OpenlineError::IoError(format!("Cannot write '{}': {}", path.display(), e))
            })?;
            println!("Schema written to {}", path.display());
            Ok(())
        }
        None => print_json(&bundle),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use openline_core::{Edge, EdgeRel, Node, NodeType};
    use std::io::Write;

    fn sample_frame() -> Frame {
        Frame::new("cli", 1).with_graph(
            vec![
                Node::new("c1", NodeType::Claim, "claim"),
                Node::new("e1", NodeType::Evidence, "evidence"),
            ],
            vec![Edge::new("e1", "c1", EdgeRel::Supports)],
        )
    }

    #[test]
    fn check_reads_wrapped_frame_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.json");
        std::fs::write(&path, r#"{"frame": {"stream_id": "x", "logical_time": 4}}"#)
            .expect("write");
        assert!(cmd_check(&AppConfig::default(), &path, None, false).is_ok());
    }

    #[test]
    fn digest_report_detects_mismatch() {
        let mut frame = sample_frame();
        assert!(!digest_report(&frame).matches);

        frame.digest = Some(compute_digest(&frame.nodes, &frame.edges));
        let report = digest_report(&frame);
        assert!(report.matches);
        assert_eq!(report.digest.b0, 1);
    }

    #[test]
    fn read_input_rejects_oversized_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(&[b'a'; 64]).expect("write");
        let err = read_input(file.path(), 16).expect_err("too large");
        assert!(matches!(err, OpenlineError::SerializationError(_)));
        assert!(read_input(file.path(), 64).is_ok());
    }

    #[test]
    fn read_input_rejects_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            read_input(dir.path(), 1024),
            Err(OpenlineError::IoError(_))
        ));
    }

    #[test]
    fn check_rejects_guard_violation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let frame_path = dir.path().join("frame.json");
        let prior_path = dir.path().join("prior.json");
        let frame = Frame::new("cli", 2).with_graph(
            ["a", "b", "c", "d"]
                .iter()
                .map(|id| Node::new(*id, NodeType::Claim, "claim"))
                .collect(),
            Vec::new(),
        );
        std::fs::write(&frame_path, serde_json::to_string(&frame).expect("json")).expect("write");
        let prior = Digest {
            b0: 1,
            ..Digest::default()
        };
        std::fs::write(&prior_path, serde_json::to_string(&prior).expect("json")).expect("write");

        let config = AppConfig::default();
        let err = cmd_check(&config, &frame_path, Some(&prior_path), false).expect_err("rejected");
        assert!(matches!(err, OpenlineError::GuardViolation(_)));
        assert!(cmd_check(&config, &frame_path, None, false).is_ok());
    }

    #[test]
    fn schema_written_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("schema.json");
        cmd_schema(false, Some(&out)).expect("schema");
        let text = std::fs::read_to_string(&out).expect("read");
        assert!(text.contains("openline/frame"));
    }
}
