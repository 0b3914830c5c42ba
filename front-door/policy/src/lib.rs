//! Tenant access control policies.
//!
//! Access control documents are loaded into typed [`Policy`](front_door_core::Policy) values by
//! [`load_policy`] and published per-tenant through a shared [`Index`].

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod document;
pub mod index;

pub use self::{
    document::{load_policy, Field, LoadError, MAX_DOCUMENT_LEN},
    index::{Index, IndexMetrics, SharedIndex},
};
