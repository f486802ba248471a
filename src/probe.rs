use tracing::{error, info, warn};

use crate::kubernetes::ClusterApi;
use crate::notifier::Notifier;
use crate::types::{ErrorCode, HEALTHY_CODE, RUNNING, ServiceKind};

/// Checks a service's health endpoint from inside one of its pods.
pub struct ServiceProbe<'a> {
    cluster: &'a dyn ClusterApi,
    notifier: &'a Notifier,
    namespace: &'a str,
    probe_domain: &'a str,
}

impl<'a> ServiceProbe<'a> {
    pub fn new(
        cluster: &'a dyn ClusterApi,
        notifier: &'a Notifier,
        namespace: &'a str,
        probe_domain: &'a str,
    ) -> Self {
        Self {
            cluster,
            notifier,
            namespace,
            probe_domain,
        }
    }

    /// Returns `true` only when the in-pod request answered exactly `200`.
    pub async fn check_service(&self, tenant: &str, pod: &str, pod_status: &str, service_name: &str) -> bool {
        if pod_status != RUNNING {
            warn!(pod, status = pod_status, "Pod is not Running, skipping health check");
            self.notifier
                .send(
                    tenant,
                    service_name,
                    pod,
                    ErrorCode::PodNotRunning,
                    &format!("Pod status is {pod_status}, service is unavailable"),
                )
                .await;
            return false;
        }

        let Some(url) = probe_url(service_name, self.probe_domain) else {
            warn!(service = service_name, "Unknown service");
            self.notifier
                .send(
                    tenant,
                    service_name,
                    pod,
                    ErrorCode::UnknownService,
                    &format!("Unknown service: {service_name}"),
                )
                .await;
            return false;
        };

        match self
            .cluster
            .exec_in_pod(self.namespace, pod, &curl_command(&url))
            .await
        {
            Ok(output) => {
                let code = output.trim();
                if code == HEALTHY_CODE {
                    info!(service = service_name, pod, "Service inside pod is healthy");
                    true
                } else {
                    error!(service = service_name, pod, code, "Service inside pod returned unexpected HTTP status");
                    self.notifier
                        .send(
                            tenant,
                            service_name,
                            pod,
                            ErrorCode::ServiceUnhealthy,
                            &format!("Received HTTP {code}"),
                        )
                        .await;
                    false
                }
            }
            Err(e) => {
                error!(pod, error = %e, "Error executing curl inside pod");
                self.notifier
                    .send(
                        tenant,
                        service_name,
                        pod,
                        ErrorCode::CurlNotFound,
                        "curl failed from within the pod",
                    )
                    .await;
                false
            }
        }
    }
}

/// `<service>.<domain><path>` for known services.
pub fn probe_url(service_name: &str, probe_domain: &str) -> Option<String> {
    ServiceKind::classify(service_name)
        .health_path()
        .map(|path| format!("{service_name}.{probe_domain}{path}"))
}

/// curl invocation that prints only the response status code.
pub fn curl_command(url: &str) -> Vec<String> {
    ["curl", "-s", "-o", "/dev/null", "-w", "%{http_code}", url]
        .map(String::from)
        .to_vec()
}
