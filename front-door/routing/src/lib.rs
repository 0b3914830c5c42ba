//! Routes front door requests to the storage hosts backing a tenant.
//!
//! A request's `Host` names either the service domain itself, in which case it is dispatched to a
//! management endpoint, or a tenant subdomain. Tenant requests are sent to one of the tenant's
//! available hosts: reads of a single object are placed with a [`ConsistentHash`] so that repeated
//! reads land on the same host; everything else is spread with a [`RoundRobin`] cursor.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod hash;
mod management;
pub mod metrics;
mod round_robin;


pub use self::{
    hash::{ConsistentHash, HashError, HashKey, HashKeyError, HASH_KEY_LEN, MAX_ITERATIONS},
    management::{ManagementDestinations, ManagementError},
    metrics::{RouteMetrics, Strategy},
    round_robin::RoundRobin,
};

use front_door_core::{
    request::DATA_PATH_PREFIX, AvailabilityProber, DestinationDirectory, DestinationPorts,
    PortClass, RouteError,
};
use http::{header, Method};

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Requests for this exact host are management requests; tenant hosts are
    /// its immediate subdomains.
    pub service_domain: String,
    pub ports: DestinationPorts,

    /// Always route to the first available host, bypassing hashing and round
    /// robin.
    pub always_first_host: bool,
}

#[derive(Debug)]
pub struct Router<D, A> {
    config: RouterConfig,
    management: ManagementDestinations,
    hash: ConsistentHash,
    round_robin: RoundRobin,
    directory: D,
    prober: A,
    metrics: RouteMetrics,
}

/// The parts of a request that determine its destination.
#[derive(Copy, Clone, Debug)]
pub struct RouteRequest<'r> {
    pub host: Option<&'r str>,
    pub method: &'r Method,
    pub path: &'r str,
}

// === impl Router ===

impl<D, A> Router<D, A>
where
    D: DestinationDirectory,
    A: AvailabilityProber,
{
    pub fn new(
        mut config: RouterConfig,
        management: ManagementDestinations,
        key: &HashKey,
        directory: D,
        prober: A,
        metrics: RouteMetrics,
    ) -> Self {
        config.service_domain.make_ascii_lowercase();
        Self {
            config,
            management,
            hash: ConsistentHash::new(key),
            round_robin: RoundRobin::default(),
            directory,
            prober,
            metrics,
        }
    }

    /// Returns the `host:port` the request should be forwarded to.
    pub async fn route(&self, req: RouteRequest<'_>) -> Result<String, RouteError> {
        match self.select(req).await {
            Ok((dest, strategy)) => {
                tracing::debug!(host = ?req.host, method = %req.method, path = %req.path, %dest, %strategy, "Routed");
                self.metrics.routed(strategy);
                Ok(dest)
            }
            Err(error) => {
                if error.status().is_server_error() {
                    tracing::warn!(host = ?req.host, method = %req.method, path = %req.path, %error, "Failed to route");
                } else {
                    tracing::debug!(host = ?req.host, method = %req.method, path = %req.path, %error, "Rejected");
                }
                self.metrics.failed(&error);
                Err(error)
            }
        }
    }

    async fn select(&self, req: RouteRequest<'_>) -> Result<(String, Strategy), RouteError> {
        let host = req
            .host
            .filter(|h| !h.is_empty())
            .ok_or(RouteError::MissingHost)?;
        let name = strip_port(host).to_ascii_lowercase();

        if name == self.config.service_domain {
            return Ok((self.management.next().to_string(), Strategy::Management));
        }

        let tenant = self
            .tenant_for(&name)
            .ok_or_else(|| RouteError::InvalidHost(host.to_string()))?;

        let class = PortClass::for_method(req.method)
            .ok_or_else(|| RouteError::UnknownMethod(req.method.clone()))?;
        let port = self.config.ports.port(class);

        let hosts = self
            .directory
            .hosts_for_tenant(tenant)
            .await
            .map_err(|error| RouteError::UnknownTenant {
                tenant: tenant.to_string(),
                error,
            })?;
        if hosts.is_empty() {
            return Err(RouteError::UnknownTenant {
                tenant: tenant.to_string(),
                error: anyhow::anyhow!("no hosts configured"),
            });
        }

        let available = self
            .prober
            .available_hosts(&hosts, port)
            .await
            .map_err(|error| RouteError::Availability {
                tenant: tenant.to_string(),
                error,
            })?;
        tracing::trace!(%tenant, ?hosts, ?available, %port);
        if available.is_empty() {
            return Err(RouteError::NoAvailableHosts(tenant.to_string()));
        }

        let (dest, strategy) = if self.config.always_first_host {
            match available.first() {
                Some(dest) => (dest.as_str(), Strategy::FirstHost),
                None => return Err(RouteError::NoAvailableHosts(tenant.to_string())),
            }
        } else if is_object_read(req.method, req.path) {
            let dest = self
                .hash
                .select(tenant, req.path, &hosts, &available)
                .map_err(|error| RouteError::Selection {
                    tenant: tenant.to_string(),
                    error: error.into(),
                })?;
            (dest, Strategy::Hash)
        } else {
            match self.round_robin.next_index(available.len()) {
                Some(i) => (available[i].as_str(), Strategy::RoundRobin),
                None => return Err(RouteError::NoAvailableHosts(tenant.to_string())),
            }
        };

        Ok((format!("{dest}:{port}"), strategy))
    }

    /// Returns the tenant label of an immediate subdomain of the service
    /// domain.
    fn tenant_for<'n>(&self, name: &'n str) -> Option<&'n str> {
        let tenant = name
            .strip_suffix(self.config.service_domain.as_str())?
            .strip_suffix('.')?;
        if tenant.is_empty() || tenant.contains('.') {
            return None;
        }
        Some(tenant)
    }
}

// === impl RouteRequest ===

impl<'r> RouteRequest<'r> {
    /// Reads the host of an absolute-form URI, falling back to the `Host`
    /// header. An absolute URI's authority overrides the header.
    pub fn from_request<B>(req: &'r http::Request<B>) -> Self {
        let host = req
            .uri()
            .authority()
            .map(|a| a.host())
            .or_else(|| req.headers().get(header::HOST).and_then(|v| v.to_str().ok()));
        Self {
            host,
            method: req.method(),
            path: req.uri().path(),
        }
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Reads of a single object are eligible for consistent hashing.
fn is_object_read(method: &Method, path: &str) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
        && path
            .strip_prefix(DATA_PATH_PREFIX)
            .is_some_and(|key| !key.is_empty())
}
