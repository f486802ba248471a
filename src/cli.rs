use clap::Parser;

use crate::config::Backend;

#[derive(Parser)]
#[command(name = "cluster-healthcheck")]
#[command(about = "Probe the database, pods and in-pod health endpoints of a Kubernetes service cluster")]
pub struct Cli {
    /// Collector endpoint receiving failure events
    #[arg(long, env = "COLLECTOR_URL")]
    pub collector_url: String,

    /// Namespace
    #[arg(short = 'n', long, env = "NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Database user
    #[arg(long, env = "DB_USER", default_value = "default_user")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = "default_password", hide_env_values = true)]
    pub db_password: String,

    /// Database name
    #[arg(long, env = "DB_NAME", default_value = "dimsdb")]
    pub db_name: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    /// DNS suffix appended to service names when building probe URLs
    #[arg(long, env = "PROBE_DOMAIN", default_value = "default.svc.cluster.local")]
    pub probe_domain: String,

    /// Environment suffix reported with the customer name
    #[arg(long, env = "ENVIRONMENT", default_value = "PROD")]
    pub environment: String,

    /// Timeout in seconds for every external call
    #[arg(long, env = "TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Control plane backend
    #[arg(long, env = "BACKEND", value_enum, default_value_t = Backend::Kube)]
    pub backend: Backend,

    /// kubectl command for the kubectl backend, e.g. "k3s kubectl"
    #[arg(long, env = "KUBECTL", default_value = "kubectl")]
    pub kubectl: String,

    /// Context
    #[arg(long, env = "KUBE_CONTEXT")]
    pub context: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
