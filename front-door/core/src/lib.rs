//! Front door governance model.
//!
//! Every request arriving at the front door of the storage cluster is subject to two independent
//! decisions:
//!
//! - Access: a tenant's [`Policy`] decides whether the request may proceed unauthenticated, must
//!   present credentials, or is forbidden outright.
//! - Destination: the request is routed to one of the storage hosts backing the tenant, discovered
//!   through a [`DestinationDirectory`] and filtered through an [`AvailabilityProber`].
//!
//! This crate holds the shared types and the pure decision procedure; loading and routing live in
//! their own crates.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod network_match;
mod path_match;
pub mod policy;
mod referrer_match;
pub mod request;
pub mod routing;

pub use self::{
    network_match::{NetworkMatch, NetworkParseError},
    path_match::{normalize_path, PathMatch},
    policy::{
        AccessRule, LocationRule, Operation, Policy, Verdict, VersionMismatch, SUPPORTED_VERSION,
    },
    referrer_match::ReferrerMatch,
    request::client_ip_from_forwarded_for,
    routing::{AvailabilityProber, DestinationDirectory, DestinationPorts, PortClass, RouteError},
};
pub use ipnet::Ipv4Net;
