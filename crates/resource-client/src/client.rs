//! Kubernetes-backed resource client
//!
//! Issues raw requests against the API server collection paths. The typed
//! `kube::Api` surface cannot carry the `includeUninitialized=true` query
//! parameter that initializer traffic requires, so the list, watch, and
//! replace calls are built by hand from a per-type route.

use crate::error::ClientError;
use crate::models::ResourceObject;
use crate::resource_trait::{RawLineStream, ResourceClient};
use futures::AsyncBufReadExt;
use http::header::CONTENT_TYPE;
use kube::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Collection paths for one resource type.
#[derive(Clone, Debug)]
pub struct ResourceRoute {
    /// User-friendly name for logging and error reporting.
    pub kind: &'static str,
    /// API group prefix, e.g. `/api/v1` or `/apis/batch/v1`.
    pub api_base: &'static str,
    /// Plural collection name, e.g. `pods`.
    pub plural: &'static str,
}

/// List response envelope; only the items are of interest.
#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    items: Vec<ResourceObject>,
}

/// Resource client backed by a live `kube::Client`.
///
/// The client is built once at startup and held for the process lifetime;
/// connection pooling is owned by `kube`.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    route: ResourceRoute,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient")
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    /// Creates a client for an arbitrary collection route.
    pub fn new(client: Client, route: ResourceRoute) -> Self {
        Self { client, route }
    }

    /// Constructs a client for pods.
    pub fn pods(client: Client) -> Self {
        Self::new(client, ResourceRoute { kind: "pod", api_base: "/api/v1", plural: "pods" })
    }

    /// Constructs a client for services.
    pub fn services(client: Client) -> Self {
        Self::new(client, ResourceRoute { kind: "service", api_base: "/api/v1", plural: "services" })
    }

    /// Constructs a client for config maps.
    pub fn config_maps(client: Client) -> Self {
        Self::new(
            client,
            ResourceRoute { kind: "configmap", api_base: "/api/v1", plural: "configmaps" },
        )
    }

    /// Constructs a client for jobs.
    pub fn jobs(client: Client) -> Self {
        Self::new(client, ResourceRoute { kind: "job", api_base: "/apis/batch/v1", plural: "jobs" })
    }

    /// Constructs a client for cron jobs.
    pub fn cron_jobs(client: Client) -> Self {
        Self::new(
            client,
            ResourceRoute { kind: "cronjob", api_base: "/apis/batch/v2alpha1", plural: "cronjobs" },
        )
    }

    /// Constructs a client for deployments.
    ///
    /// Initializers are an extensions/v1beta1-era feature, so the watched
    /// collections live under that group.
    pub fn deployments(client: Client) -> Self {
        Self::new(
            client,
            ResourceRoute {
                kind: "deployment",
                api_base: "/apis/extensions/v1beta1",
                plural: "deployments",
            },
        )
    }

    /// Constructs a client for daemon sets.
    pub fn daemon_sets(client: Client) -> Self {
        Self::new(
            client,
            ResourceRoute {
                kind: "daemonset",
                api_base: "/apis/extensions/v1beta1",
                plural: "daemonsets",
            },
        )
    }

    fn collection_path(&self) -> String {
        format!("{}/{}", self.route.api_base, self.route.plural)
    }

    fn object_path(&self, namespace: &str, name: &str) -> String {
        format!(
            "{}/namespaces/{}/{}/{}",
            self.route.api_base, namespace, self.route.plural, name
        )
    }
}

#[async_trait::async_trait]
impl ResourceClient for KubeResourceClient {
    fn kind(&self) -> &str {
        self.route.kind
    }

    async fn list_uninitialized(&self) -> Result<Vec<ResourceObject>, ClientError> {
        let path = format!("{}?includeUninitialized=true", self.collection_path());
        debug!("Listing {} collection at {}", self.route.kind, path);
        let request = http::Request::get(path).body(Vec::new())?;
        let list: ResourceList = self.client.request(request).await?;
        Ok(list.items)
    }

    async fn watch_uninitialized(&self, idle_timeout: Duration) -> Result<RawLineStream, ClientError> {
        let path = format!(
            "{}?includeUninitialized=true&watch=true&timeoutSeconds={}",
            self.collection_path(),
            idle_timeout.as_secs()
        );
        debug!("Opening {} watch at {}", self.route.kind, path);
        let request = http::Request::get(path).body(Vec::new())?;
        let reader = self.client.request_stream(request).await?;
        Ok(Box::pin(reader.lines()))
    }

    async fn replace(
        &self,
        name: &str,
        namespace: &str,
        body: &ResourceObject,
    ) -> Result<(), ClientError> {
        let path = self.object_path(namespace, name);
        debug!("Replacing {} {}/{}", self.route.kind, namespace, name);
        let request = http::Request::put(path)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)?;
        // The server echoes the stored object; nothing in it is needed here.
        let _stored: serde_json::Value = self.client.request(request).await?;
        Ok(())
    }
}
