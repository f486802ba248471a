//! `kubectl`-backed control plane access and parsers for its `--no-headers` listings.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result, with_timeout};
use crate::kubernetes::ClusterApi;
use crate::types::{PodRecord, ServiceRecord};

pub struct KubectlCluster {
    program: String,
    leading_args: Vec<String>,
    context: Option<String>,
    timeout: Duration,
}

impl KubectlCluster {
    pub fn new(context: Option<String>, timeout: Duration) -> Self {
        Self {
            program: "kubectl".to_string(),
            leading_args: Vec::new(),
            context,
            timeout,
        }
    }

    /// Use `command` (program plus leading arguments, e.g. `k3s kubectl`) instead of `kubectl`.
    pub fn with_command(mut self, command: &[String]) -> Self {
        if let Some((program, leading)) = command.split_first() {
            self.program = program.clone();
            self.leading_args = leading.to_vec();
        }
        self
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = self.leading_args.clone();
        if let Some(ctx) = &self.context {
            args.extend(["--context".to_string(), ctx.clone()]);
        }
        args
    }

    async fn run(&self, operation: &'static str, args: Vec<String>) -> Result<String> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        debug!(command = %command_line, "Running kubectl");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = with_timeout(operation, self.timeout, async { Ok(cmd.output().await?) }).await?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ClusterApi for KubectlCluster {
    async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>> {
        let mut args = self.base_args();
        args.extend(["get", "svc", "-n", namespace, "--no-headers"].map(String::from));
        let text = self.run("list services", args).await?;
        Ok(parse_service_listing(&text))
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        let mut args = self.base_args();
        args.extend(["get", "pods", "-n", namespace, "--no-headers"].map(String::from));
        let text = self.run("list pods", args).await?;
        Ok(parse_pod_listing(&text))
    }

    async fn exec_in_pod(&self, namespace: &str, pod: &str, command: &[String]) -> Result<String> {
        let mut args = self.base_args();
        args.extend(["exec", "-n", namespace, pod, "--"].map(String::from));
        args.extend(command.iter().cloned());
        self.run("exec in pod", args).await
    }
}

/// Parse `kubectl get svc --no-headers`: NAME TYPE CLUSTER-IP ...
pub fn parse_service_listing(text: &str) -> Vec<ServiceRecord> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let cluster_ip = fields.nth(1).map(str::to_string);
            Some(ServiceRecord {
                name: name.to_string(),
                cluster_ip,
            })
        })
        .collect()
}

/// Parse `kubectl get pods --no-headers`: NAME READY STATUS ...
///
/// Lines with fewer than three fields are skipped.
pub fn parse_pod_listing(text: &str) -> Vec<PodRecord> {
    let mut pods = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            warn!(line, "Skipping invalid pod listing line");
            continue;
        }
        pods.push(PodRecord {
            name: fields[0].to_string(),
            status: fields[2].to_string(),
        });
    }
    pods
}
