//! Assembles a front door from command-line configuration.
//!
//! The surrounding server supplies the [`DestinationDirectory`] and
//! [`AvailabilityProber`] it discovers hosts with and hands each request to a [`FrontDoor`] to be
//! authorized and routed.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use front_door_core as core;
pub use front_door_policy as policy;
pub use front_door_routing as routing;

mod args;
mod log;

#[cfg(test)]
mod tests;

pub use self::{
    args::{Args, IpNets, RouterArgs},
    log::{InvalidLogFormat, LogArgs, LogFilter, LogFormat},
};

use self::{
    core::{
        client_ip_from_forwarded_for, AvailabilityProber, DestinationDirectory, Operation,
        RouteError, Verdict, VersionMismatch,
    },
    policy::{index, IndexMetrics, SharedIndex},
    routing::{RouteRequest, Router},
};
use anyhow::Result;
use http::header;
use prometheus_client::registry::Registry;
use std::net::IpAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug)]
pub struct FrontDoor<D, A> {
    router: Router<D, A>,
    policies: SharedIndex,
    trusted_proxies: IpNets,
    prom: Registry,
}

// === impl FrontDoor ===

impl<D, A> FrontDoor<D, A>
where
    D: DestinationDirectory,
    A: AvailabilityProber,
{
    pub fn new(args: RouterArgs, directory: D, prober: A) -> Result<Self> {
        let trusted_proxies = args.trusted_proxies.clone().unwrap_or_default();
        if trusted_proxies.0.is_empty() {
            tracing::debug!("No trusted proxies; X-Forwarded-For is ignored");
        }

        let mut prom = <Registry>::default();
        let router = args.build(directory, prober, &mut prom)?;

        let policy_metrics = prom.sub_registry_with_prefix("policy_index");
        let policies = policy::Index::shared(IndexMetrics::register(policy_metrics));
        index::metrics::register(policy_metrics, policies.clone());

        Ok(Self {
            router,
            policies,
            trusted_proxies,
            prom,
        })
    }

    /// The tenant policy index, updated as tenants' access control documents
    /// change.
    pub fn policies(&self) -> &SharedIndex {
        &self.policies
    }

    pub fn metrics(&self) -> &Registry {
        &self.prom
    }

    /// Returns the `host:port` the request should be forwarded to.
    pub async fn route<B>(&self, req: &http::Request<B>) -> Result<String, RouteError> {
        self.router.route(RouteRequest::from_request(req)).await
    }

    /// Decides whether an object request for `tenant` may proceed.
    ///
    /// Returns `None` for requests that are not object operations. The caller
    /// is `peer` unless `peer` is a trusted proxy, in which case it is the
    /// first `X-Forwarded-For` entry when present.
    pub fn authorize<B>(
        &self,
        tenant: &str,
        req: &http::Request<B>,
        peer: IpAddr,
    ) -> Result<Option<Verdict>, VersionMismatch> {
        let uri = req.uri();
        let Some(op) = Operation::for_request(req.method(), uri.path(), uri.query()) else {
            return Ok(None);
        };

        let headers = req.headers();
        let caller = if self.trusted_proxies.contains(&peer) {
            headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(client_ip_from_forwarded_for)
                .unwrap_or(peer)
        } else {
            peer
        };
        let referer = headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok());

        self.policies
            .read()
            .decide(tenant, op, uri.path(), caller, referer)
            .map(Some)
    }
}
