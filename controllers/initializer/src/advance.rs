//! Queue advancer: computes the object state persisted after a decision.
//!
//! Whatever the handler decided, the initializer has now acted on this
//! object exactly once, so the matched head entry is always popped. The
//! remaining queue is always taken from the object as observed, never from
//! the handler's copy, so a handler cannot reorder admission.

use crate::admission::AdmissionOutcome;
use resource_client::{Initializer, Initializers, ResourceObject};

/// Returns the object to send as the full-replace update.
///
/// * `Accepted(mutated)` - the mutated object is the base.
/// * `Rejected(rejection)` - the original, unmutated object is the base and
///   the rejection is recorded as `initializers.result`.
///
/// In both cases the head pending entry (which the gate matched against
/// `initializer_name`) is removed and every other entry keeps its position.
pub fn advance(
    original: &ResourceObject,
    outcome: AdmissionOutcome,
    initializer_name: &str,
) -> ResourceObject {
    debug_assert_eq!(
        original.pending_head(),
        Some(initializer_name),
        "advance called for an object this initializer is not head of"
    );

    let remaining: Vec<Initializer> = original
        .metadata
        .initializers
        .as_ref()
        .map(|init| init.pending.iter().skip(1).cloned().collect())
        .unwrap_or_default();

    let mut updated = match outcome {
        AdmissionOutcome::Accepted(mutated) => mutated,
        AdmissionOutcome::Rejected(rejection) => {
            let mut object = original.clone();
            object
                .metadata
                .initializers
                .get_or_insert_with(Initializers::default)
                .result = Some(rejection.into_status());
            object
        }
    };

    updated
        .metadata
        .initializers
        .get_or_insert_with(Initializers::default)
        .pending = remaining;
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::Rejection;
    use crate::test_utils::uninitialized_object;
    use serde_json::json;

    #[test]
    fn accepted_pops_only_the_head_entry() {
        let original = uninitialized_object("Job", "default", "train", &["initA", "initB"]);
        let mut mutated = original.clone();
        mutated
            .extra
            .insert("spec".to_string(), json!({"parallelism": 2}));

        let updated = advance(&original, AdmissionOutcome::Accepted(mutated), "initA");

        let initializers = updated.metadata.initializers.unwrap();
        assert_eq!(initializers.pending, vec![Initializer::named("initB")]);
        assert!(initializers.result.is_none());
        // Handler mutation is kept on acceptance.
        assert_eq!(updated.extra["spec"]["parallelism"], 2);
    }

    #[test]
    fn round_trip_preserves_tail_position_and_identity() {
        let original = uninitialized_object("Pod", "default", "one", &["initA", "initB"]);
        let accepted = AdmissionOutcome::Accepted(original.clone());

        let updated = advance(&original, accepted, "initA");

        assert_eq!(
            updated.metadata.initializers.unwrap().pending,
            vec![Initializer::named("initB")]
        );
    }

    #[test]
    fn single_entry_queue_drains_to_empty() {
        let original = uninitialized_object("Pod", "default", "one", &["initA"]);

        let updated = advance(&original, AdmissionOutcome::Accepted(original.clone()), "initA");

        assert!(updated.metadata.initializers.as_ref().unwrap().pending.is_empty());
        assert_eq!(updated.pending_head(), None);
    }

    #[test]
    fn rejected_records_result_on_the_original_object() {
        let mut original = uninitialized_object("Pod", "default", "one", &["initA"]);
        original
            .extra
            .insert("spec".to_string(), json!({"image": "evil:latest"}));

        let rejection = Rejection::new("bad image").with_code(403);
        let updated = advance(&original, AdmissionOutcome::Rejected(rejection), "initA");

        // The unmutated object is the base.
        assert_eq!(updated.extra, original.extra);

        let initializers = updated.metadata.initializers.unwrap();
        assert!(initializers.pending.is_empty());
        let result = initializers.result.unwrap();
        assert_eq!(result.code, Some(403));
        assert_eq!(result.message.as_deref(), Some("bad image"));
        // Reason defaults to the message when unset.
        assert_eq!(result.reason.as_deref(), Some("bad image"));
        assert_eq!(result.status.as_deref(), Some("Failure"));
    }

    #[test]
    fn rejected_pops_the_head_even_with_entries_behind_it() {
        let original = uninitialized_object("Pod", "default", "one", &["initA", "initB"]);

        let updated = advance(
            &original,
            AdmissionOutcome::Rejected(Rejection::new("nope")),
            "initA",
        );

        assert_eq!(
            updated.metadata.initializers.unwrap().pending,
            vec![Initializer::named("initB")]
        );
    }
}
