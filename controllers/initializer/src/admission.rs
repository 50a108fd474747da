//! Admission gate and handler seam.
//!
//! The gate is the entire admission-authorization logic: an object may be
//! acted on iff this initializer is the first entry of its pending queue.
//! Type-specific accept/mutate/reject policy lives behind the [`Handler`]
//! trait, so resource kinds are configuration data, not subclasses.

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Status, StatusDetails};
use resource_client::ResourceObject;

/// Returns true iff the object's pending-initializers queue is non-empty
/// and its first entry names this initializer.
///
/// Pure, no I/O. Objects with an empty or absent queue, or with another
/// initializer at the head, are simply not ours to touch right now.
pub fn is_eligible(object: &ResourceObject, initializer_name: &str) -> bool {
    object.pending_head() == Some(initializer_name)
}

/// A handler's decision for one gated object.
#[derive(Clone, Debug, PartialEq)]
pub enum AdmissionOutcome {
    /// Admit the object, possibly mutated by the handler.
    Accepted(ResourceObject),
    /// Refuse admission; the rejection is recorded on the object.
    #[allow(dead_code)] // Built by rejecting handlers
    Rejected(Rejection),
}

/// The reason an object was refused admission.
///
/// Becomes the `initializers.result` status on the updated object, so a
/// human or another controller can see why admission failed.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    /// Human-readable message for this failure.
    pub message: String,
    /// Machine-readable reason; defaults to the message when unset.
    pub reason: Option<String>,
    /// HTTP status code for this failure.
    pub code: i32,
    /// Optional structured error details.
    pub details: Option<StatusDetails>,
}

#[allow(dead_code)] // Builder surface for rejecting handlers
impl Rejection {
    /// Creates a rejection with the given message, code 400, and the
    /// reason defaulting to the message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason: None,
            code: 400,
            details: None,
        }
    }

    /// Sets a machine-readable reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the HTTP status code.
    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Attaches structured error details.
    #[must_use]
    pub fn with_details(mut self, details: StatusDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Renders the rejection as the `Failure` status recorded on the object.
    pub fn into_status(self) -> Status {
        let reason = self.reason.unwrap_or_else(|| self.message.clone());
        Status {
            status: Some("Failure".to_string()),
            message: Some(self.message),
            reason: Some(reason),
            code: Some(self.code),
            details: self.details,
            ..Status::default()
        }
    }
}

/// Per-resource-type admission policy.
///
/// Invoked only for objects that passed the gate. The handler must leave
/// `metadata.initializers` alone; advancing the queue is the caller's job.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Decides whether to admit the (possibly mutated) object.
    async fn handle(&self, object: ResourceObject) -> AdmissionOutcome;
}

/// Handler that admits every object unchanged.
///
/// The default wiring; real policies replace this per resource type.
#[derive(Debug, Default)]
pub struct AcceptAll;

#[async_trait]
impl Handler for AcceptAll {
    async fn handle(&self, object: ResourceObject) -> AdmissionOutcome {
        AdmissionOutcome::Accepted(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::uninitialized_object;

    #[test]
    fn eligible_when_first_pending_entry_matches() {
        let object = uninitialized_object("Pod", "default", "one", &["initA", "initB"]);
        assert!(is_eligible(&object, "initA"));
    }

    #[test]
    fn not_eligible_when_another_initializer_is_head() {
        let object = uninitialized_object("Pod", "default", "one", &["otherInit", "initA"]);
        assert!(!is_eligible(&object, "initA"));
    }

    #[test]
    fn not_eligible_with_empty_or_absent_queue() {
        let empty = uninitialized_object("Pod", "default", "one", &[]);
        assert!(!is_eligible(&empty, "initA"));
    }

    #[test]
    fn rejection_reason_defaults_to_message() {
        let status = Rejection::new("bad image").into_status();
        assert_eq!(status.status.as_deref(), Some("Failure"));
        assert_eq!(status.message.as_deref(), Some("bad image"));
        assert_eq!(status.reason.as_deref(), Some("bad image"));
        assert_eq!(status.code, Some(400));
    }

    #[test]
    fn rejection_builders_override_defaults() {
        let status = Rejection::new("bad image")
            .with_reason("ImagePolicy")
            .with_code(403)
            .into_status();
        assert_eq!(status.reason.as_deref(), Some("ImagePolicy"));
        assert_eq!(status.code, Some(403));
    }
}
