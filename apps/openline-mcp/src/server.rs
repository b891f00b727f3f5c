//! # OpenLine MCP Server
//!
//! Implements `ServerHandler` with 4 MCP tools that proxy to the OpenLine HTTP API.

use crate::client::OpenlineClient;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use serde_json::Value;

// =============================================================================
// MCP SERVER
// =============================================================================

/// MCP server that bridges to an OpenLine HTTP API.
#[derive(Clone)]
pub struct OpenlineMcp {
    client: OpenlineClient,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

// =============================================================================
// TOOL PARAMETER STRUCTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StitchParams {
    /// The frame to submit.
    #[schemars(
        description = "Frame JSON: stream_id, logical_time, nodes, edges, morphs, telem. May also be wrapped as {\"frame\": ...}"
    )]
    pub frame: Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExtractParams {
    /// Text to turn into an argument graph.
    #[schemars(description = "Text to turn into an argument graph")]
    pub text: String,
    /// Stream id of the built frame.
    #[schemars(description = "Stream id of the built frame (default: 'default')")]
    pub stream_id: Option<String>,
    /// Logical time of the built frame.
    #[schemars(description = "Logical time of the built frame (default: 1)")]
    pub logical_time: Option<u64>,
    /// Measure the holonomy gap against the stream's latest digest.
    #[schemars(description = "Measure the holonomy gap against the stream's latest digest")]
    pub use_stream_prior: Option<bool>,
    /// Submit the built frame for acceptance.
    #[schemars(description = "Submit the built frame for acceptance after building it")]
    pub submit: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StreamParams {
    /// Stream to inspect.
    #[schemars(description = "Stream to inspect")]
    pub stream_id: String,
}

// =============================================================================
// TOOL IMPLEMENTATIONS
// =============================================================================

#[tool_router]
impl OpenlineMcp {
    pub fn new(client: OpenlineClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Submit a frame to the OpenLine bus; reports the digest or the guard that rejected it")]
    async fn openline_stitch(
        &self,
        params: Parameters<StitchParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.submit_frame(&params.0.frame).await {
            Ok(resp) => Ok(CallToolResult::success(vec![Content::text(
                format_frame_response(&resp),
            )])),
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }

    #[tool(description = "Build a frame (argument graph, digest, telemetry) from text, optionally submitting it")]
    async fn openline_extract(
        &self,
        params: Parameters<ExtractParams>,
    ) -> Result<CallToolResult, McpError> {
        let ExtractParams {
            text,
            stream_id,
            logical_time,
            use_stream_prior,
            submit,
        } = params.0;
        let request = serde_json::json!({
            "text": text,
            "stream_id": stream_id,
            "logical_time": logical_time,
            "use_stream_prior": use_stream_prior.unwrap_or(false),
        });

        let resp = self
            .client
            .extract(&request)
            .await
            .map_err(|e| McpError::internal_error(format!("{e}"), None))?;
        let Some(frame) = resp.get("frame") else {
            return Ok(CallToolResult::success(vec![Content::text(format_error(
                &resp,
            ))]));
        };

        let mut parts = vec![format_frame_summary(frame)];
        if submit.unwrap_or(false) {
            match self.client.submit_frame(frame).await {
                Ok(submitted) => parts.push(format_frame_response(&submitted)),
                Err(e) => return Err(McpError::internal_error(format!("{e}"), None)),
            }
        } else {
            parts.push(serde_json::to_string_pretty(frame).unwrap_or_default());
        }
        Ok(CallToolResult::success(vec![Content::text(
            parts.join("\n"),
        )]))
    }

    #[tool(description = "Get the latest accepted digest of a stream")]
    async fn openline_stream(
        &self,
        params: Parameters<StreamParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.stream(&params.0.stream_id).await {
            Ok(resp) => {
                let text = match resp.get("digest") {
                    Some(digest) => format!(
                        "Stream {}: {}",
                        params.0.stream_id,
                        format_digest(digest)
                    ),
                    None => format_error(&resp),
                };
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }

    #[tool(description = "Check that the OpenLine server is reachable")]
    async fn openline_health(&self) -> Result<CallToolResult, McpError> {
        match self.client.health().await {
            Ok(resp) => {
                let status = resp.get("status").and_then(|v| v.as_str()).unwrap_or("?");
                let version = resp.get("version").and_then(|v| v.as_str()).unwrap_or("?");
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "OpenLine {version}: {status}"
                ))]))
            }
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }
}

// =============================================================================
// SERVER HANDLER
// =============================================================================

#[tool_handler]
impl ServerHandler for OpenlineMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "OpenLine frame bus. Build argument-graph frames from text, submit them \
                 to a stream and inspect the stream's latest digest. Rejections name the \
                 guard, its cap and the observed value."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// =============================================================================
// RESPONSE FORMATTING
// =============================================================================

/// One-line digest: `b0=.. cycle_plus=.. x_frontier=.. s_over_c=.. depth=..`.
fn format_digest(digest: &Value) -> String {
    let int = |key: &str| digest.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
    let ratio = digest.get("s_over_c").and_then(|v| v.as_f64()).unwrap_or(0.0);
    format!(
        "b0={} cycle_plus={} x_frontier={} s_over_c={:.3} depth={}",
        int("b0"),
        int("cycle_plus"),
        int("x_frontier"),
        ratio,
        int("depth")
    )
}

/// Error body → `Rejected (code): message [cap=.., observed=..]`.
fn format_error(resp: &Value) -> String {
    let code = resp.get("code").and_then(|v| v.as_str()).unwrap_or("error");
    let error = resp
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error");
    let mut text = format!("Rejected ({code}): {error}");
    if let (Some(cap), Some(observed)) = (
        resp.get("cap").and_then(|v| v.as_f64()),
        resp.get("observed").and_then(|v| v.as_f64()),
    ) {
        text.push_str(&format!(" [cap={cap}, observed={observed}]"));
    }
    text
}

/// Format a `POST /frame` response.
fn format_frame_response(resp: &Value) -> String {
    let accepted = resp.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if !accepted {
        return format_error(resp);
    }

    let stream = resp.get("stream_id").and_then(|v| v.as_str()).unwrap_or("?");
    let t = resp.get("logical_time").and_then(|v| v.as_u64()).unwrap_or(0);
    let mut parts = vec![format!("Accepted on stream {stream} at t={t}")];
    if let Some(digest) = resp.get("digest") {
        parts.push(format!("Digest: {}", format_digest(digest)));
    }
    if let Some(delta_hol) = resp
        .get("telem")
        .and_then(|t| t.get("delta_hol"))
        .and_then(|v| v.as_f64())
    {
        parts.push(format!("delta_hol: {delta_hol:.3}"));
    }
    parts.join("\n")
}

/// Short description of a built frame.
fn format_frame_summary(frame: &Value) -> String {
    let count = |key: &str| {
        frame
            .get(key)
            .and_then(|v| v.as_array())
            .map_or(0, Vec::len)
    };
    let confidence = frame
        .get("telemetry")
        .and_then(|t| t.get("confidence"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let digest = frame
        .get("digest")
        .map(format_digest)
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Built frame: {} nodes, {} edges, confidence {:.2}\nDigest: {}",
        count("nodes"),
        count("edges"),
        confidence,
        digest
    )
}

// =============================================================================
// TESTS
// =============================================================================
