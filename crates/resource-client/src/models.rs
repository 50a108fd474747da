//! Object model for initializer traffic.
//!
//! Only the metadata the initializer protocol acts on is typed:
//! `metadata.name`, `metadata.namespace`, and `metadata.initializers`.
//! Every other field of an object (spec, status, labels, the rest of the
//! metadata) is kept in flattened maps so that a full-replace update sends
//! the object back exactly as the server delivered it.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource instance of any watched kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    /// API group/version of the object, echoed back on update.
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind of the object, echoed back on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Object metadata, including the pending-initializers queue.
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Everything else (spec, status, ...), preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceObject {
    /// The object name, or an empty string when the server omitted it.
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// The object namespace, or an empty string for unnamespaced objects.
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Name of the first pending initializer, if any.
    ///
    /// An absent `initializers` block and an empty pending list both mean
    /// the object is fully initialized and yield `None`.
    pub fn pending_head(&self) -> Option<&str> {
        self.metadata
            .initializers
            .as_ref()
            .and_then(|init| init.pending.first())
            .map(|entry| entry.name.as_str())
    }
}

/// Object metadata, typed only where the initializer protocol needs it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Object namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Pending initializers and the most recent initializer result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializers: Option<Initializers>,

    /// Remaining metadata (labels, annotations, resourceVersion, ...),
    /// preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `metadata.initializers` block of an object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Initializers {
    /// Initializers still owed to act on this object, in FIFO order.
    /// Only the first entry may be acted upon.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<Initializer>,

    /// Structured status written when an initializer rejects the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
}

/// One entry in the pending-initializers queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    /// Name of the initializer that must clear this entry.
    pub name: String,
}

impl Initializer {
    /// Convenience constructor for a pending entry.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
