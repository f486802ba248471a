use std::fmt;
use std::time::Duration;

use clap::ValueEnum;

use crate::cli::Cli;

/// How the control plane is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Kubernetes API through kube-rs
    Kube,
    /// `kubectl` subprocesses with text parsing
    Kubectl,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

/// Settings for one health-check run, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub collector_url: String,
    pub namespace: String,
    pub db: DbCredentials,
    pub probe_domain: String,
    pub environment: String,
    pub timeout: Duration,
    pub backend: Backend,
    pub kubectl_command: Vec<String>,
    pub context: Option<String>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            collector_url: cli.collector_url,
            namespace: cli.namespace,
            db: DbCredentials {
                user: cli.db_user,
                password: cli.db_password,
                database: cli.db_name,
                port: cli.db_port,
            },
            probe_domain: cli.probe_domain.trim_matches('.').to_string(),
            environment: cli.environment,
            timeout: Duration::from_secs(cli.timeout_secs),
            backend: cli.backend,
            kubectl_command: cli.kubectl.split_whitespace().map(str::to_string).collect(),
            context: cli.context,
        }
    }
}
