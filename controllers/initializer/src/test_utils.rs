//! Test utilities for unit testing the admission pipeline.
//!
//! Helpers for building test objects and scripted watch lines.

use resource_client::mock::ScriptedLine;
use resource_client::{Initializer, Initializers, ObjectMeta, ResourceObject};

/// Builds a test object with the given pending-initializer names.
///
/// An empty `pending` slice produces an object with no `initializers`
/// block, i.e. a fully initialized object.
pub fn uninitialized_object(
    kind: &str,
    namespace: &str,
    name: &str,
    pending: &[&str],
) -> ResourceObject {
    let initializers = if pending.is_empty() {
        None
    } else {
        Some(Initializers {
            pending: pending.iter().map(|name| Initializer::named(*name)).collect(),
            result: None,
        })
    };
    ResourceObject {
        api_version: Some("v1".to_string()),
        kind: Some(kind.to_string()),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            initializers,
            extra: serde_json::Map::new(),
        },
        extra: serde_json::Map::new(),
    }
}

fn event_line(event_type: &str, object: &ResourceObject) -> ScriptedLine {
    ScriptedLine::Line(serde_json::json!({"type": event_type, "object": object}).to_string())
}

/// Raw watch line for an `ADDED` event.
pub fn added(object: &ResourceObject) -> ScriptedLine {
    event_line("ADDED", object)
}

/// Raw watch line for a `MODIFIED` event.
pub fn modified(object: &ResourceObject) -> ScriptedLine {
    event_line("MODIFIED", object)
}

/// Raw watch line for a `DELETED` event.
pub fn deleted(object: &ResourceObject) -> ScriptedLine {
    event_line("DELETED", object)
}

/// Raw watch line for a server-side `ERROR` event.
pub fn error_event(message: &str) -> ScriptedLine {
    ScriptedLine::Line(
        serde_json::json!({
            "type": "ERROR",
            "object": {"status": "Failure", "message": message}
        })
        .to_string(),
    )
}
