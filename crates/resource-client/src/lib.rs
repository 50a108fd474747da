//! Kubernetes resource access for the initializer controller
//!
//! A small client library giving the controller exactly three capabilities
//! per watched resource type: a cluster-wide `list` that includes
//! not-yet-initialized objects, a long-lived `watch` stream over the same
//! collection, and a full-replace `update`.
//!
//! The requests are issued directly against the API server collection paths
//! because the `includeUninitialized=true` query parameter required for
//! initializer traffic is not carried by the typed client surfaces. The
//! object model only types the metadata the initializer protocol needs
//! (name, namespace, the pending-initializers queue); everything else in an
//! object round-trips untouched, so a replace never drops fields the
//! controller did not understand.
//!
//! # Example
//!
//! ```no_run
//! use resource_client::{KubeResourceClient, ResourceClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube = kube::Client::try_default().await?;
//! let pods = KubeResourceClient::pods(kube);
//!
//! // Snapshot of every pod, including uninitialized ones.
//! let items = pods.list_uninitialized().await?;
//!
//! // Live stream of raw watch lines, reconnected by the caller.
//! let lines = pods.watch_uninitialized(Duration::from_secs(30)).await?;
//! # let _ = (items, lines);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod resource_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeResourceClient;
pub use error::ClientError;
pub use models::{Initializer, Initializers, ObjectMeta, ResourceObject};
pub use resource_trait::{RawLineStream, ResourceClient};
#[cfg(feature = "test-util")]
pub use mock::MockResourceClient;
