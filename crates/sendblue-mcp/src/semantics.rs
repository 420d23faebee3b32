//! HTTP semantics helpers.
//!
//! Every Sendblue tool is backed by exactly one GET or POST, so its MCP `ToolAnnotations` follow
//! from the method.

use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// Generate MCP tool annotations based on HTTP method semantics.
///
/// `openWorldHint` is always `true`: every tool talks to Sendblue.
#[must_use]
pub fn annotations_for_method(title: &str, method: &Method) -> ToolAnnotations {
    let open_world_hint = Some(true);
    let title = Some(title.to_string());

    if method == Method::GET {
        return ToolAnnotations {
            title,
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint,
        };
    }

    // POSTs here send messages or mutate groups: not idempotent, but nothing is deleted.
    ToolAnnotations {
        title,
        read_only_hint: Some(false),
        destructive_hint: Some(false),
        idempotent_hint: Some(false),
        open_world_hint,
    }
}
