mod cli;
mod config;
mod database;
mod error;
mod inspector;
mod kubectl;
mod kubernetes;
mod notifier;
mod orchestrator;
mod probe;
#[cfg(test)]
mod testing;
mod types;

use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use config::{Backend, Config};
use database::MySqlTenantStore;
use kubectl::KubectlCluster;
use kubernetes::{ClusterApi, KubeCluster};
use notifier::Notifier;
use orchestrator::{Orchestrator, RunOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from(cli);
    info!(
        namespace = %config.namespace,
        backend = ?config.backend,
        collector = %config.collector_url,
        "Starting health check"
    );

    let cluster: Box<dyn ClusterApi> = match config.backend {
        Backend::Kube => Box::new(KubeCluster::connect(config.context.as_deref(), config.timeout).await?),
        Backend::Kubectl => Box::new(
            KubectlCluster::new(config.context.clone(), config.timeout)
                .with_command(&config.kubectl_command),
        ),
    };
    let store = MySqlTenantStore::new(config.timeout);
    let notifier = Notifier::new(&config.collector_url, &config.environment, config.timeout)?;

    let outcome = Orchestrator::new(&config, cluster.as_ref(), &store, &notifier)
        .run()
        .await;
    match outcome {
        RunOutcome::DatabaseUnavailable => {
            error!("Health check aborted: tenant could not be read from the database");
            std::process::exit(1);
        }
        RunOutcome::NoCandidates => info!("Health check finished, nothing to probe"),
        RunOutcome::Completed { services } => info!(services, "Health check finished"),
    }
    Ok(())
}
