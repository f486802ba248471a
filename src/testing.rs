//! In-memory stand-ins for the control plane and the tenant store.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::DbCredentials;
use crate::database::{CustomerSetting, TenantStore};
use crate::error::{Error, Result};
use crate::kubectl::KubectlCluster;
use crate::kubernetes::ClusterApi;
use crate::types::{PodRecord, ServiceRecord};

#[derive(Default)]
pub struct FakeCluster {
    services: Vec<ServiceRecord>,
    pods: Vec<PodRecord>,
    fail_listings: bool,
    /// `None` makes every exec fail.
    exec_stdout: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn with_services(mut self, names: &[&str]) -> Self {
        self.services.extend(names.iter().map(|name| ServiceRecord {
            name: name.to_string(),
            cluster_ip: Some("10.0.0.1".to_string()),
        }));
        self
    }

    pub fn with_service_ip(mut self, name: &str, cluster_ip: Option<&str>) -> Self {
        self.services.push(ServiceRecord {
            name: name.to_string(),
            cluster_ip: cluster_ip.map(str::to_string),
        });
        self
    }

    pub fn with_pods(mut self, pods: &[(&str, &str)]) -> Self {
        self.pods.extend(pods.iter().map(|(name, status)| PodRecord {
            name: name.to_string(),
            status: status.to_string(),
        }));
        self
    }

    pub fn with_exec_stdout(mut self, stdout: &str) -> Self {
        self.exec_stdout = Some(stdout.to_string());
        self
    }

    pub fn failing_listings(mut self) -> Self {
        self.fail_listings = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn exec_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("exec "))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn listing_error(&self) -> Error {
        Error::CommandFailed {
            command: "kubectl get".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>> {
        self.record(format!("list_services {namespace}"));
        if self.fail_listings {
            return Err(self.listing_error());
        }
        Ok(self.services.clone())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        self.record(format!("list_pods {namespace}"));
        if self.fail_listings {
            return Err(self.listing_error());
        }
        Ok(self.pods.clone())
    }

    async fn exec_in_pod(&self, namespace: &str, pod: &str, command: &[String]) -> Result<String> {
        self.record(format!("exec {namespace}/{pod} {}", command.join(" ")));
        self.exec_stdout
            .clone()
            .ok_or_else(|| Error::ExecFailed("command terminated with exit code 127".to_string()))
    }
}

pub enum TenantReply {
    Found(&'static str),
    Missing,
    Empty,
    Fails,
}

pub struct FakeTenantStore {
    reply: TenantReply,
    hosts: Mutex<Vec<String>>,
}

impl FakeTenantStore {
    pub fn new(reply: TenantReply) -> Self {
        Self {
            reply,
            hosts: Mutex::new(Vec::new()),
        }
    }

    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TenantStore for FakeTenantStore {
    async fn fetch_customer(&self, host: &str, _credentials: &DbCredentials) -> Result<CustomerSetting> {
        self.hosts.lock().unwrap().push(host.to_string());
        match self.reply {
            TenantReply::Found(value) => Ok(CustomerSetting::Value(value.to_string())),
            TenantReply::Missing => Ok(CustomerSetting::Missing),
            TenantReply::Empty => Ok(CustomerSetting::Blank),
            TenantReply::Fails => Err(Error::Database(sqlx::Error::PoolTimedOut)),
        }
    }
}

/// A kubectl stand-in that runs `script` through `sh`, with the kubectl arguments as `$@`.
pub fn scripted_kubectl(script: &str, timeout: Duration) -> KubectlCluster {
    let command = ["sh", "-c", script, "kubectl"].map(String::from);
    KubectlCluster::new(None, timeout).with_command(&command)
}
