use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ContainerStateTerminated, Pod, Service};
use kube::api::{AttachParams, ListParams};
use kube::{Api, Client, ResourceExt, config};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::error::{Error, Result, with_timeout};
use crate::types::{PodRecord, ServiceRecord};

/// The control-plane operations a health-check run needs.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>>;

    /// Run `command` in the pod's default container and return its stdout.
    async fn exec_in_pod(&self, namespace: &str, pod: &str, command: &[String]) -> Result<String>;
}

/// [`ClusterApi`] backed by the Kubernetes API.
pub struct KubeCluster {
    client: Client,
    timeout: Duration,
}

impl KubeCluster {
    pub async fn connect(context: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let config = match context {
            Some(ctx) => config::Config::from_kubeconfig(&config::KubeConfigOptions {
                context: Some(ctx.to_string()),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow::anyhow!("Context '{}' not found in kubeconfig: {}", ctx, e))?,
            None => config::Config::infer().await?,
        };
        let client = Client::try_from(config)?;
        info!(context = context.unwrap_or("<inferred>"), "Initialized Kubernetes client");
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = with_timeout("list services", self.timeout, async {
            Ok(api.list(&ListParams::default()).await?)
        })
        .await?;

        Ok(list
            .items
            .iter()
            .map(|svc| ServiceRecord {
                name: svc.name_any(),
                cluster_ip: svc.spec.as_ref().and_then(|s| s.cluster_ip.clone()),
            })
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = with_timeout("list pods", self.timeout, async {
            Ok(api.list(&ListParams::default()).await?)
        })
        .await?;

        Ok(list
            .items
            .iter()
            .map(|pod| PodRecord {
                name: pod.name_any(),
                status: pod_display_status(pod),
            })
            .collect())
    }

    async fn exec_in_pod(&self, namespace: &str, pod: &str, command: &[String]) -> Result<String> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        debug!(pod, ?command, "Executing in pod");

        with_timeout("exec in pod", self.timeout, async {
            let params = AttachParams::default().stdout(true).stderr(false);
            let mut attached = api.exec(pod, command, &params).await?;

            let mut output = String::new();
            if let Some(mut stdout) = attached.stdout() {
                stdout.read_to_string(&mut output).await?;
            }

            let status = match attached.take_status() {
                Some(status) => status.await,
                None => None,
            };
            match status {
                Some(s) if s.status.as_deref() == Some("Success") => Ok(output),
                Some(s) => Err(Error::ExecFailed(
                    s.message.unwrap_or_else(|| s.reason.unwrap_or_default()),
                )),
                None => Err(Error::ExecFailed(format!(
                    "no exit status reported by pod {pod}"
                ))),
            }
        })
        .await
    }
}

/// Status as shown in the STATUS column of `kubectl get pods`.
pub fn pod_display_status(pod: &Pod) -> String {
    let Some(status) = &pod.status else {
        return "Unknown".to_string();
    };
    let mut reason = non_empty(&status.reason)
        .or(status.phase.as_deref())
        .unwrap_or("Unknown")
        .to_string();

    let init_total = pod
        .spec
        .as_ref()
        .and_then(|s| s.init_containers.as_ref())
        .map_or(0, Vec::len);
    let mut initializing = false;
    for (i, cs) in status.init_container_statuses.iter().flatten().enumerate() {
        let state = cs.state.as_ref();
        let terminated = state.and_then(|s| s.terminated.as_ref());
        let waiting = state
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| non_empty(&w.reason));
        reason = match (terminated, waiting) {
            (Some(t), _) if t.exit_code == 0 => continue,
            (Some(t), _) => format!("Init:{}", terminated_reason(t)),
            (None, Some(w)) if w != "PodInitializing" => format!("Init:{w}"),
            _ => format!("Init:{i}/{init_total}"),
        };
        initializing = true;
        break;
    }

    if !initializing || has_true_condition(pod, "Initialized") {
        let mut has_running = false;
        // Walked from the last container so the first one wins.
        for cs in status.container_statuses.as_deref().unwrap_or_default().iter().rev() {
            let Some(state) = &cs.state else { continue };
            if let Some(waiting) = state.waiting.as_ref().and_then(|w| non_empty(&w.reason)) {
                reason = waiting.to_string();
            } else if let Some(terminated) = &state.terminated {
                reason = terminated_reason(terminated);
            } else if cs.ready && state.running.is_some() {
                has_running = true;
            }
        }
        // A finished sidecar next to a live container.
        if reason == "Completed" && has_running {
            reason = "Running".to_string();
        }
    }

    if pod.metadata.deletion_timestamp.is_some() {
        reason = if status.reason.as_deref() == Some("NodeLost") {
            "Unknown".to_string()
        } else {
            "Terminating".to_string()
        };
    }
    reason
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn terminated_reason(terminated: &ContainerStateTerminated) -> String {
    match (non_empty(&terminated.reason), terminated.signal) {
        (Some(reason), _) => reason.to_string(),
        (None, Some(signal)) if signal != 0 => format!("Signal:{signal}"),
        (None, _) => format!("ExitCode:{}", terminated.exit_code),
    }
}

fn has_true_condition(pod: &Pod, condition: &str) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conds| conds.iter().any(|c| c.type_ == condition && c.status == "True"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        Container, ContainerState, ContainerStateRunning, ContainerStateWaiting, ContainerStatus,
        PodCondition, PodSpec, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn pod_with(status: PodStatus) -> Pod {
        Pod {
            status: Some(status),
            ..Default::default()
        }
    }

    fn container(state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: "app".to_string(),
            state: Some(state),
            ..Default::default()
        }
    }

    #[test]
    fn test_running_phase() {
        let pod = pod_with(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![container(ContainerState {
                running: Some(Default::default()),
                ..Default::default()
            })]),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&pod), "Running");
    }

    #[test]
    fn test_waiting_reason_overrides_phase() {
        let pod = pod_with(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![container(ContainerState {
                waiting: Some(ContainerStateWaiting {
                    reason: Some("CrashLoopBackOff".to_string()),
                    message: None,
                }),
                ..Default::default()
            })]),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&pod), "CrashLoopBackOff");
    }

    fn running_ready() -> ContainerStatus {
        ContainerStatus {
            ready: true,
            ..container(ContainerState {
                running: Some(ContainerStateRunning::default()),
                ..Default::default()
            })
        }
    }

    fn terminated(exit_code: i32, reason: Option<&str>) -> ContainerStatus {
        container(ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                reason: reason.map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[test]
    fn test_terminated_container_reasons() {
        let completed = pod_with(PodStatus {
            phase: Some("Succeeded".to_string()),
            container_statuses: Some(vec![terminated(0, Some("Completed"))]),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&completed), "Completed");

        let no_reason = pod_with(PodStatus {
            phase: Some("Failed".to_string()),
            container_statuses: Some(vec![terminated(137, None)]),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&no_reason), "ExitCode:137");
    }

    #[test]
    fn test_completed_sidecar_with_running_app_is_running() {
        let pod = pod_with(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![terminated(0, Some("Completed")), running_ready()]),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&pod), "Running");
    }

    #[test]
    fn test_first_container_reason_wins() {
        let pod = pod_with(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![
                container(ContainerState {
                    waiting: Some(ContainerStateWaiting {
                        reason: Some("ImagePullBackOff".to_string()),
                        message: None,
                    }),
                    ..Default::default()
                }),
                terminated(1, Some("Error")),
            ]),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&pod), "ImagePullBackOff");
    }

    #[test]
    fn test_init_container_states() {
        let spec = PodSpec {
            init_containers: Some(vec![Container::default(), Container::default()]),
            ..Default::default()
        };
        let waiting_init = Pod {
            spec: Some(spec.clone()),
            ..pod_with(PodStatus {
                phase: Some("Pending".to_string()),
                init_container_statuses: Some(vec![
                    terminated(0, Some("Completed")),
                    container(ContainerState {
                        waiting: Some(ContainerStateWaiting {
                            reason: Some("CrashLoopBackOff".to_string()),
                            message: None,
                        }),
                        ..Default::default()
                    }),
                ]),
                ..Default::default()
            })
        };
        assert_eq!(pod_display_status(&waiting_init), "Init:CrashLoopBackOff");

        let running_init = Pod {
            spec: Some(spec),
            ..pod_with(PodStatus {
                phase: Some("Pending".to_string()),
                init_container_statuses: Some(vec![running_ready()]),
                ..Default::default()
            })
        };
        assert_eq!(pod_display_status(&running_init), "Init:0/2");
    }

    #[test]
    fn test_initialized_pod_reports_containers() {
        let status = PodStatus {
            phase: Some("Running".to_string()),
            init_container_statuses: Some(vec![running_ready()]),
            container_statuses: Some(vec![container(ContainerState {
                waiting: Some(ContainerStateWaiting {
                    reason: Some("CrashLoopBackOff".to_string()),
                    message: None,
                }),
                ..Default::default()
            })]),
            ..Default::default()
        };
        assert_eq!(pod_display_status(&pod_with(status.clone())), "Init:0/0");

        let initialized = pod_with(PodStatus {
            conditions: Some(vec![PodCondition {
                type_: "Initialized".to_string(),
                status: "True".to_string(),
                ..Default::default()
            }]),
            ..status
        });
        assert_eq!(pod_display_status(&initialized), "CrashLoopBackOff");
    }

    #[test]
    fn test_pod_reason_and_deletion() {
        let evicted = pod_with(PodStatus {
            phase: Some("Failed".to_string()),
            reason: Some("Evicted".to_string()),
            ..Default::default()
        });
        assert_eq!(pod_display_status(&evicted), "Evicted");

        let mut deleting = pod_with(PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        });
        deleting.metadata.deletion_timestamp = Some(Time(Default::default()));
        assert_eq!(pod_display_status(&deleting), "Terminating");
    }

    #[test]
    fn test_missing_status_is_unknown() {
        assert_eq!(pod_display_status(&Pod::default()), "Unknown");
        assert_eq!(pod_display_status(&pod_with(PodStatus::default())), "Unknown");
    }
}
