//! Main controller implementation.
//!
//! One worker per watched resource type, each running the same pipeline:
//! admission gate, handler, queue advancer, full-replace update. A worker
//! performs an initial list pass over the snapshot and then holds a watch
//! session open indefinitely, reconnecting on idle timeouts and restarting
//! (with configurable backoff) on fatal stream errors. Workers share
//! nothing; the `Controller` only supervises their join handles.

use crate::admission::{AcceptAll, AdmissionOutcome, Handler, is_eligible};
use crate::advance::advance;
use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::watcher::{SessionOutcome, run_session};
use kube::Client;
use resource_client::{KubeResourceClient, ResourceClient, ResourceObject};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Process-level configuration for the controller.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Name matched against the head of each object's pending queue.
    pub initializer_name: String,
    /// Resource types to watch ("pods", "jobs", ...).
    pub resources: Vec<String>,
    /// Idle timeout for watch streams.
    pub idle_timeout: Duration,
    /// First backoff after a fatal watch error, in seconds.
    pub fatal_backoff_min_seconds: u64,
    /// Backoff cap in seconds; zero restores immediate unconditional
    /// reconnects.
    pub fatal_backoff_max_seconds: u64,
}

/// One resource type's admission worker.
pub(crate) struct Worker {
    client: Arc<dyn ResourceClient>,
    handler: Arc<dyn Handler>,
    initializer_name: String,
    idle_timeout: Duration,
    fatal_backoff_min_seconds: u64,
    fatal_backoff_max_seconds: u64,
}

impl Worker {
    pub(crate) fn new(
        client: Arc<dyn ResourceClient>,
        handler: Arc<dyn Handler>,
        initializer_name: impl Into<String>,
        idle_timeout: Duration,
        fatal_backoff_min_seconds: u64,
        fatal_backoff_max_seconds: u64,
    ) -> Self {
        Self {
            client,
            handler,
            initializer_name: initializer_name.into(),
            idle_timeout,
            fatal_backoff_min_seconds,
            fatal_backoff_max_seconds,
        }
    }

    /// Runs the full pipeline for one observed object.
    ///
    /// Update failures are logged and not retried: the object is still
    /// eligible and will be re-presented by the next watch event or list
    /// sync, where the gate's recheck of the queue head also prevents
    /// double admission of objects that did get updated.
    async fn process_object(&self, object: ResourceObject) {
        let kind = self.client.kind();
        if !is_eligible(&object, &self.initializer_name) {
            debug!(
                "Ignoring {} {}/{}: not first in the pending initializer queue",
                kind,
                object.namespace(),
                object.name()
            );
            return;
        }
        debug!("Processing {} {}/{}", kind, object.namespace(), object.name());

        let outcome = self.handler.handle(object.clone()).await;
        let rejection_message = match &outcome {
            AdmissionOutcome::Accepted(_) => None,
            AdmissionOutcome::Rejected(rejection) => Some(rejection.message.clone()),
        };
        let updated = advance(&object, outcome, &self.initializer_name);

        match self
            .client
            .replace(object.name(), object.namespace(), &updated)
            .await
        {
            Ok(()) => match rejection_message {
                None => info!("Admitted {} {}/{}", kind, object.namespace(), object.name()),
                Some(message) => info!(
                    "Rejected {} {}/{}: {}",
                    kind,
                    object.namespace(),
                    object.name(),
                    message
                ),
            },
            Err(err) => {
                error!(
                    "Update for {} {}/{} failed: {}",
                    kind,
                    object.namespace(),
                    object.name(),
                    err
                );
            }
        }
    }

    /// Applies the pipeline to one full-list snapshot, in server order.
    pub(crate) async fn initial_sync(&self) -> Result<(), ControllerError> {
        let items = self.client.list_uninitialized().await?;
        debug!("Got {} results from {} lookup", items.len(), self.client.kind());
        for item in items {
            self.process_object(item).await;
        }
        Ok(())
    }

    /// Initial sync, then the steady-state watch loop, until `shutdown`.
    pub(crate) async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ControllerError> {
        let kind = self.client.kind();

        if let Err(err) = self.initial_sync().await {
            // Objects missed here are re-presented by the watch.
            warn!("Initial {kind} sync failed (will continue to watch): {err}");
        }

        let mut backoff = FibonacciBackoff::new(
            self.fatal_backoff_min_seconds,
            self.fatal_backoff_max_seconds,
        );
        loop {
            if *shutdown.borrow() {
                info!("Stopping {kind} worker");
                return Ok(());
            }

            let outcome = tokio::select! {
                _ = shutdown.changed() => {
                    info!("Stopping {kind} worker");
                    return Ok(());
                }
                outcome = run_session(
                    self.client.as_ref(),
                    self.idle_timeout,
                    |object| self.process_object(object),
                ) => outcome,
            };

            match outcome {
                SessionOutcome::IdleTimeout => {
                    debug!("{kind} watch idle timeout; reconnecting");
                    backoff.reset();
                }
                SessionOutcome::Fatal(err) => {
                    error!("{kind} watch failed: {err}; restarting");
                    let delay = backoff.next_backoff();
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = shutdown.changed() => {
                                info!("Stopping {kind} worker");
                                return Ok(());
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }
}

/// Supervises one worker task per watched resource type.
pub struct Controller {
    workers: Vec<(String, JoinHandle<Result<(), ControllerError>>)>,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Creates the kube client, wires a worker per configured resource
    /// type, and starts them.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing controller as initializer {:?}", config.initializer_name);

        if config.resources.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "at least one resource type must be watched".to_string(),
            ));
        }

        // Built once, held for the process lifetime. Credentials come from
        // the cluster environment or the local kubeconfig.
        let kube_client = Client::try_default().await?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut workers = Vec::new();
        for resource in &config.resources {
            let client = resource_client_for(resource, kube_client.clone())?;
            let kind = client.kind().to_string();
            let worker = Worker::new(
                Arc::new(client),
                Arc::new(AcceptAll),
                config.initializer_name.clone(),
                config.idle_timeout,
                config.fatal_backoff_min_seconds,
                config.fatal_backoff_max_seconds,
            );
            let rx = shutdown_rx.clone();
            workers.push((kind, tokio::spawn(async move { worker.run(rx).await })));
        }

        Ok(Self { workers, shutdown })
    }

    /// Waits until any worker exits (they run until stopped) and surfaces
    /// its result.
    pub async fn wait(&mut self) -> Result<(), ControllerError> {
        if self.workers.is_empty() {
            return Ok(());
        }
        let handles = self.workers.iter_mut().map(|(_, handle)| handle);
        let (result, index, _) = futures::future::select_all(handles).await;
        let (kind, _) = self.workers.remove(index);
        result
            .map_err(|e| ControllerError::Watch(format!("{kind} worker panicked: {e}")))?
            .map_err(|e| ControllerError::Watch(format!("{kind} worker error: {e}")))?;
        Ok(())
    }

    /// Signals every worker to stop, closing in-flight watch sessions, and
    /// waits for them to finish.
    pub async fn stop(self) -> Result<(), ControllerError> {
        info!("Stopping initializer controller");
        let _ = self.shutdown.send(true);
        for (kind, handle) in self.workers {
            handle
                .await
                .map_err(|e| ControllerError::Watch(format!("{kind} worker panicked: {e}")))??;
        }
        Ok(())
    }
}

/// Maps a configured resource name to its API route.
fn resource_client_for(
    resource: &str,
    client: Client,
) -> Result<KubeResourceClient, ControllerError> {
    match resource {
        "pods" => Ok(KubeResourceClient::pods(client)),
        "services" => Ok(KubeResourceClient::services(client)),
        "configmaps" => Ok(KubeResourceClient::config_maps(client)),
        "jobs" => Ok(KubeResourceClient::jobs(client)),
        "cronjobs" => Ok(KubeResourceClient::cron_jobs(client)),
        "deployments" => Ok(KubeResourceClient::deployments(client)),
        "daemonsets" => Ok(KubeResourceClient::daemon_sets(client)),
        other => Err(ControllerError::InvalidConfig(format!(
            "unknown resource type {other:?}; supported: pods, services, configmaps, jobs, cronjobs, deployments, daemonsets"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::Rejection;
    use crate::test_utils::{added, uninitialized_object};
    use async_trait::async_trait;
    use resource_client::MockResourceClient;

    struct RejectWith {
        message: String,
        code: i32,
    }

    #[async_trait]
    impl Handler for RejectWith {
        async fn handle(&self, _object: ResourceObject) -> AdmissionOutcome {
            AdmissionOutcome::Rejected(Rejection::new(self.message.clone()).with_code(self.code))
        }
    }

    fn worker_for(client: &MockResourceClient, handler: Arc<dyn Handler>) -> Worker {
        Worker::new(
            Arc::new(client.clone()),
            handler,
            "initA",
            Duration::from_secs(30),
            0,
            0,
        )
    }

    #[tokio::test]
    async fn initial_sync_processes_only_queue_heads() {
        let client = MockResourceClient::new("pod");
        client.push_list(vec![
            uninitialized_object("Pod", "default", "ours", &["initA"]),
            uninitialized_object("Pod", "default", "not-yet-ours", &["otherInit", "initA"]),
        ]);
        let worker = worker_for(&client, Arc::new(AcceptAll));

        worker.initial_sync().await.unwrap();

        let replaced = client.replaced();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].name(), "ours");
        // Accepted: the queue drained and no result was recorded.
        let initializers = replaced[0].metadata.initializers.clone().unwrap();
        assert!(initializers.pending.is_empty());
        assert!(initializers.result.is_none());
    }

    #[tokio::test]
    async fn rejection_is_recorded_and_still_pops_the_queue() {
        let client = MockResourceClient::new("pod");
        client.push_list(vec![uninitialized_object("Pod", "default", "one", &["initA"])]);
        let handler = Arc::new(RejectWith { message: "bad image".to_string(), code: 403 });
        let worker = worker_for(&client, handler);

        worker.initial_sync().await.unwrap();

        let replaced = client.replaced();
        assert_eq!(replaced.len(), 1);
        let initializers = replaced[0].metadata.initializers.clone().unwrap();
        assert!(initializers.pending.is_empty());
        let result = initializers.result.clone().unwrap();
        assert_eq!(result.code, Some(403));
        assert_eq!(result.reason.as_deref(), Some("bad image"));
    }

    #[tokio::test]
    async fn update_failure_does_not_kill_the_worker() {
        let client = MockResourceClient::new("pod");
        client.fail_replaces(true);
        client.push_list(vec![
            uninitialized_object("Pod", "default", "one", &["initA"]),
            uninitialized_object("Pod", "default", "two", &["initA"]),
        ]);
        let worker = worker_for(&client, Arc::new(AcceptAll));

        // Both objects are attempted; neither failure is propagated.
        worker.initial_sync().await.unwrap();
        assert_eq!(client.replaced().len(), 2);
    }

    #[tokio::test]
    async fn worker_reconnects_after_idle_timeout_without_redelivery() {
        let client = MockResourceClient::new("pod");
        let one = uninitialized_object("Pod", "default", "one", &["initA"]);
        let two = uninitialized_object("Pod", "default", "two", &["initA"]);
        // Two sessions, each ending at the server's timeout boundary. After
        // both are consumed the mock serves a silent stream, so the worker
        // parks on its idle timer until shutdown.
        client.push_session(vec![added(&one)]);
        client.push_session(vec![added(&two)]);

        let worker = worker_for(&client, Arc::new(AcceptAll));
        let probe = client.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        // Wait until the worker has consumed both sessions and reconnected.
        tokio::time::timeout(Duration::from_secs(5), async {
            while probe.watch_timeouts().len() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        // Every reconnect used the same parameters.
        let timeouts = client.watch_timeouts();
        assert!(timeouts.len() >= 3);
        assert!(timeouts.iter().all(|t| *t == Duration::from_secs(30)));

        // Each event was delivered exactly once across reconnects.
        let names: Vec<String> =
            client.replaced().iter().map(|object| object.name().to_string()).collect();
        assert_eq!(names, vec!["one", "two"]);
    }
}
