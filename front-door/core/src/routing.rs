use anyhow::Result;
use http::{Method, StatusCode};
use std::{fmt, num::NonZeroU16};

/// Models the lookup of the storage hosts that back a tenant.
#[async_trait::async_trait]
pub trait DestinationDirectory {
    /// Returns the tenant's hosts in a stable order, or an error if the tenant
    /// is unknown or the lookup failed.
    async fn hosts_for_tenant(&self, tenant: &str) -> Result<Vec<String>>;
}

/// Models the liveness view of storage hosts.
#[async_trait::async_trait]
pub trait AvailabilityProber {
    /// Returns the subset of `hosts` currently reachable on `port`.
    async fn available_hosts(&self, hosts: &[String], port: NonZeroU16) -> Result<Vec<String>>;
}

/// The backend service a request is destined for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortClass {
    Read,
    Write,
}

/// The ports served by each backend service.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DestinationPorts {
    pub read: NonZeroU16,
    pub write: NonZeroU16,
}

/// A request that could not be routed, classified by the HTTP status the
/// front door should answer with.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("HOST header not found")]
    MissingHost,

    #[error("invalid HOST '{0}'")]
    InvalidHost(String),

    #[error("unknown method '{0}'")]
    UnknownMethod(Method),

    #[error("no hosts for collection '{tenant}': {error}")]
    UnknownTenant {
        tenant: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("collection '{tenant}': {error}")]
    Availability {
        tenant: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("no hosts available for collection '{0}'")]
    NoAvailableHosts(String),

    #[error("collection '{tenant}': {error}")]
    Selection {
        tenant: String,
        #[source]
        error: anyhow::Error,
    },
}

// === impl PortClass ===

impl PortClass {
    pub fn for_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Self::Read),
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE => Some(Self::Write),
            _ => None,
        }
    }
}

impl fmt::Display for PortClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => "read".fmt(f),
            Self::Write => "write".fmt(f),
        }
    }
}

// === impl DestinationPorts ===

impl DestinationPorts {
    pub fn port(&self, class: PortClass) -> NonZeroU16 {
        match class {
            PortClass::Read => self.read,
            PortClass::Write => self.write,
        }
    }
}

// === impl RouteError ===

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHost | Self::UnknownMethod(_) => StatusCode::BAD_REQUEST,
            Self::InvalidHost(_) | Self::UnknownTenant { .. } => StatusCode::NOT_FOUND,
            Self::NoAvailableHosts(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Availability { .. } | Self::Selection { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Indicates that the condition is transient and the client may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoAvailableHosts(_))
    }
}
