use tracing::{error, info, warn};

use crate::kubernetes::ClusterApi;
use crate::types::{PodRecord, ServiceKind};

const SERVICE_SUFFIX: &str = "-service";

/// Read-only view of the services and pods in one namespace.
pub struct ClusterInspector<'a> {
    cluster: &'a dyn ClusterApi,
    namespace: &'a str,
}

impl<'a> ClusterInspector<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, namespace: &'a str) -> Self {
        Self { cluster, namespace }
    }

    /// Services whose names route to a known probe, in listing order.
    pub async fn list_candidate_services(&self) -> Vec<String> {
        match self.cluster.list_services(self.namespace).await {
            Ok(services) => services
                .into_iter()
                .map(|svc| svc.name)
                .filter(|name| ServiceKind::classify(name).is_known())
                .collect(),
            Err(e) => {
                error!(namespace = self.namespace, error = %e, "Error retrieving services");
                Vec::new()
            }
        }
    }

    /// First pod whose name contains `service_name` minus a trailing `-service`.
    pub async fn find_pod(&self, service_name: &str) -> Option<PodRecord> {
        let pods = match self.cluster.list_pods(self.namespace).await {
            Ok(pods) => pods,
            Err(e) => {
                error!(namespace = self.namespace, error = %e, "Error checking pod status");
                return None;
            }
        };
        if pods.is_empty() {
            warn!(service = service_name, "No pods found for service");
            return None;
        }

        let base_name = pod_base_name(service_name);
        match pods.into_iter().find(|pod| pod.name.contains(base_name)) {
            Some(pod) => {
                info!(pod = %pod.name, status = %pod.status, "Found pod");
                Some(pod)
            }
            None => {
                warn!(service = service_name, "No pod found for service");
                None
            }
        }
    }
}

/// `service_name` with a trailing `-service` removed.
pub fn pod_base_name(service_name: &str) -> &str {
    service_name.strip_suffix(SERVICE_SUFFIX).unwrap_or(service_name)
}
