use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::database::{DatabaseProbe, TenantStore};
use crate::inspector::ClusterInspector;
use crate::kubernetes::ClusterApi;
use crate::notifier::Notifier;
use crate::probe::ServiceProbe;
use crate::types::{ErrorCode, NO_POD};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The tenant could not be read; nothing else was checked.
    DatabaseUnavailable,
    NoCandidates,
    Completed { services: usize },
}

/// One health-check pass over the cluster.
pub struct Orchestrator<'a> {
    config: &'a Config,
    cluster: &'a dyn ClusterApi,
    store: &'a dyn TenantStore,
    notifier: &'a Notifier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        cluster: &'a dyn ClusterApi,
        store: &'a dyn TenantStore,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            config,
            cluster,
            store,
            notifier,
        }
    }

    pub async fn run(&self) -> RunOutcome {
        let namespace = self.config.namespace.as_str();

        let database = DatabaseProbe::new(self.cluster, self.store, self.notifier);
        let Some(customer) = database.probe(namespace, &self.config.db).await else {
            error!("Skipping further checks as MySQL is not reachable");
            return RunOutcome::DatabaseUnavailable;
        };

        let inspector = ClusterInspector::new(self.cluster, namespace);
        let services = inspector.list_candidate_services().await;
        if services.is_empty() {
            warn!(namespace, "No relevant services found in Kubernetes");
            return RunOutcome::NoCandidates;
        }
        info!(count = services.len(), "Checking services");

        let probe = ServiceProbe::new(self.cluster, self.notifier, namespace, &self.config.probe_domain);
        for service in &services {
            self.check_one(&inspector, &probe, &customer, service)
                .instrument(info_span!("service", name = %service))
                .await;
        }

        RunOutcome::Completed {
            services: services.len(),
        }
    }

    async fn check_one(
        &self,
        inspector: &ClusterInspector<'_>,
        probe: &ServiceProbe<'_>,
        customer: &str,
        service: &str,
    ) {
        match inspector.find_pod(service).await {
            Some(pod) => {
                probe
                    .check_service(customer, &pod.name, &pod.status, service)
                    .await;
            }
            None => {
                warn!(service, "Service pod not found or not running");
                self.notifier
                    .send(
                        customer,
                        service,
                        NO_POD,
                        ErrorCode::ServiceNotRunning,
                        &format!("No running pods found for service {service}"),
                    )
                    .await;
            }
        }
    }
}
