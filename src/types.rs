use serde::Serialize;

/// Pod phase that allows an in-pod probe.
pub const RUNNING: &str = "Running";

/// Tenant reported when the settings row is missing.
pub const UNKNOWN_CUSTOMER: &str = "UnknownCustomer";

/// `appName` used when no pod exists for a service.
pub const NO_POD: &str = "N/A";

/// The only captured status code treated as healthy.
pub const HEALTHY_CODE: &str = "200";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub cluster_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    pub name: String,
    pub status: String,
}

/// Probe routing for a service, chosen by substring of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Dims,
    Scheduler,
    Unknown,
}

/// Checked in order; the first matching substring decides the kind.
const ROUTES: &[(&str, ServiceKind)] = &[
    ("dims", ServiceKind::Dims),
    ("scheduler", ServiceKind::Scheduler),
];

impl ServiceKind {
    pub fn classify(service_name: &str) -> Self {
        ROUTES
            .iter()
            .find(|(needle, _)| service_name.contains(needle))
            .map(|(_, kind)| *kind)
            .unwrap_or(ServiceKind::Unknown)
    }

    pub fn health_path(self) -> Option<&'static str> {
        match self {
            ServiceKind::Dims => Some("/health"),
            ServiceKind::Scheduler => Some("/get"),
            ServiceKind::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        self != ServiceKind::Unknown
    }
}

/// Failure codes forwarded to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MysqlError,
    PodNotRunning,
    UnknownService,
    ServiceUnhealthy,
    CurlNotFound,
    ServiceNotRunning,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MysqlError => "MYSQL_ERROR",
            ErrorCode::PodNotRunning => "POD_NOT_RUNNING",
            ErrorCode::UnknownService => "UNKNOWN_SERVICE",
            ErrorCode::ServiceUnhealthy => "SERVICE_UNHEALTHY",
            ErrorCode::CurlNotFound => "CURL_NOT_FOUND",
            ErrorCode::ServiceNotRunning => "SERVICE_NOT_RUNNING",
        }
    }
}

/// JSON body posted to the collector. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct EventPayload {
    pub customer: String,
    pub error: ErrorCode,
    pub message: String,
    #[serde(rename = "appName")]
    pub app_name: String,
}

impl EventPayload {
    pub fn new(
        customer: &str,
        environment: &str,
        error: ErrorCode,
        message: impl Into<String>,
        app_name: &str,
    ) -> Self {
        Self {
            customer: format!("{customer}-{environment}"),
            error,
            message: message.into(),
            app_name: app_name.to_string(),
        }
    }
}
