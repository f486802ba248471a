use async_trait::async_trait;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection, MySqlConnection};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::DbCredentials;
use crate::error::{Error, Result, with_timeout};
use crate::kubernetes::ClusterApi;
use crate::notifier::Notifier;
use crate::types::{ErrorCode, ServiceRecord, UNKNOWN_CUSTOMER};

const CUSTOMER_QUERY: &str = "SELECT value FROM project_settings WHERE settings_key = ?";
const CUSTOMER_KEY: &str = "customer";

/// The `customer` row of `project_settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerSetting {
    Missing,
    /// Row present with a NULL or empty value.
    Blank,
    Value(String),
}

impl From<Option<Option<String>>> for CustomerSetting {
    fn from(row: Option<Option<String>>) -> Self {
        match row {
            None => CustomerSetting::Missing,
            Some(Some(value)) if !value.is_empty() => CustomerSetting::Value(value),
            Some(_) => CustomerSetting::Blank,
        }
    }
}

/// Source of the tenant identifier.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn fetch_customer(&self, host: &str, credentials: &DbCredentials) -> Result<CustomerSetting>;
}

pub struct MySqlTenantStore {
    timeout: Duration,
}

impl MySqlTenantStore {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TenantStore for MySqlTenantStore {
    async fn fetch_customer(&self, host: &str, credentials: &DbCredentials) -> Result<CustomerSetting> {
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(credentials.port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database)
            .disable_statement_logging();

        let mut conn = with_timeout("database connect", self.timeout, async {
            Ok(MySqlConnection::connect_with(&options).await?)
        })
        .await?;

        let result = with_timeout("database query", self.timeout, async {
            let row: Option<Option<String>> = sqlx::query_scalar(CUSTOMER_QUERY)
                .bind(CUSTOMER_KEY)
                .fetch_optional(&mut conn)
                .await?;
            Ok(CustomerSetting::from(row))
        })
        .await;

        let closed = with_timeout("database close", self.timeout, async move {
            Ok(conn.close().await?)
        })
        .await;
        if let Err(e) = closed {
            warn!(error = %e, "Error closing database connection");
        }
        result
    }
}

/// Resolves the data store through the control plane and reads the tenant.
pub struct DatabaseProbe<'a> {
    cluster: &'a dyn ClusterApi,
    store: &'a dyn TenantStore,
    notifier: &'a Notifier,
}

impl<'a> DatabaseProbe<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, store: &'a dyn TenantStore, notifier: &'a Notifier) -> Self {
        Self {
            cluster,
            store,
            notifier,
        }
    }

    /// Tenant identifier for this run. `None` means the run must stop.
    pub async fn probe(&self, namespace: &str, credentials: &DbCredentials) -> Option<String> {
        match self.read_customer(namespace, credentials).await {
            Ok(Some(customer)) => {
                info!(customer = %customer, "MySQL project_settings customer");
                Some(customer)
            }
            Ok(None) => {
                error!("MySQL project_settings customer is empty");
                None
            }
            Err(e) => {
                error!(error = %e, "MySQL health check failed");
                self.notifier
                    .send("mysql", "MySQL_Service", "DB_ERROR", ErrorCode::MysqlError, "connection failed")
                    .await;
                None
            }
        }
    }

    async fn read_customer(&self, namespace: &str, credentials: &DbCredentials) -> Result<Option<String>> {
        let services = self.cluster.list_services(namespace).await?;
        let host = find_database_host(&services)
            .ok_or_else(|| Error::DatabaseServiceNotFound(namespace.to_string()))?;
        info!(host, database = %credentials.database, "Connecting to MySQL");

        Ok(match self.store.fetch_customer(host, credentials).await? {
            CustomerSetting::Value(customer) => Some(customer),
            CustomerSetting::Missing => Some(UNKNOWN_CUSTOMER.to_string()),
            CustomerSetting::Blank => None,
        })
    }
}

/// Cluster IP of the first service whose name mentions mysql, ignoring case.
pub fn find_database_host(services: &[ServiceRecord]) -> Option<&str> {
    services
        .iter()
        .filter(|svc| svc.name.to_lowercase().contains("mysql"))
        .filter_map(|svc| svc.cluster_ip.as_deref())
        .find(|ip| !ip.is_empty() && *ip != "None")
}
