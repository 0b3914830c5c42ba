//! Keeps an index of tenant access control policies.
//!
//! Each tenant's policy is published on its own watch channel so that readers always observe a
//! complete snapshot: a document is fully loaded before it replaces the previous policy, and a
//! document that fails to load leaves the previous policy in place.

use crate::document::{load_policy, LoadError};
use ahash::AHashMap as HashMap;
use front_door_core::{Operation, Policy, Verdict, VersionMismatch};
use parking_lot::RwLock;
use std::{net::IpAddr, sync::Arc};
use tokio::sync::watch;

pub mod metrics;


pub use self::metrics::IndexMetrics;

#[derive(Debug)]
pub struct Index {
    tenants: HashMap<String, watch::Sender<Arc<Policy>>>,
    metrics: IndexMetrics,
}

pub type SharedIndex = Arc<RwLock<Index>>;

// === impl Index ===

impl Index {
    pub fn shared(metrics: IndexMetrics) -> SharedIndex {
        Arc::new(RwLock::new(Self {
            tenants: HashMap::default(),
            metrics,
        }))
    }

    /// Loads `document` and publishes it as the tenant's policy.
    ///
    /// An absent document publishes the zero-value policy. If the document
    /// cannot be loaded, the tenant's current policy is left untouched.
    pub fn apply(&mut self, tenant: &str, document: Option<&[u8]>) -> Result<(), LoadError> {
        let policy = match load_policy(document) {
            Ok(policy) => Arc::new(policy),
            Err(error) => {
                tracing::warn!(%tenant, %error, "Rejected access control document");
                self.metrics.load_failures.inc();
                return Err(error);
            }
        };

        match self.tenants.get(tenant) {
            Some(tx) => {
                let modified = tx.send_if_modified(|current| {
                    if **current == *policy {
                        return false;
                    }
                    *current = policy;
                    true
                });
                if !modified {
                    tracing::debug!(%tenant, "Access control policy unchanged");
                    return Ok(());
                }
            }
            None => {
                let (tx, _rx) = watch::channel(policy);
                self.tenants.insert(tenant.to_string(), tx);
            }
        }

        tracing::info!(%tenant, "Published access control policy");
        Ok(())
    }

    /// Drops the tenant's policy.
    ///
    /// Outstanding receivers observe the zero-value policy and then the
    /// closing of their channel.
    pub fn delete(&mut self, tenant: &str) {
        if let Some(tx) = self.tenants.remove(tenant) {
            tx.send_replace(Arc::new(Policy::default()));
            tracing::info!(%tenant, "Deleted access control policy");
        }
    }

    /// Subscribes to the tenant's policy, creating an entry holding the
    /// zero-value policy if the tenant has none yet.
    pub fn policy_rx(&mut self, tenant: &str) -> watch::Receiver<Arc<Policy>> {
        if let Some(tx) = self.tenants.get(tenant) {
            return tx.subscribe();
        }

        tracing::debug!(%tenant, "Subscribing to unindexed tenant");
        let (tx, rx) = watch::channel(Arc::new(Policy::default()));
        self.tenants.insert(tenant.to_string(), tx);
        rx
    }

    /// Returns the tenant's current policy snapshot.
    pub fn get(&self, tenant: &str) -> Arc<Policy> {
        self.tenants
            .get(tenant)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default()
    }

    /// Decides the request against the tenant's current policy. Tenants
    /// without a policy are governed by the zero-value policy.
    pub fn decide(
        &self,
        tenant: &str,
        op: Operation,
        path: &str,
        caller: IpAddr,
        referer: Option<&str>,
    ) -> Result<Verdict, VersionMismatch> {
        let verdict = self.get(tenant).decide(op, path, caller, referer);
        tracing::debug!(%tenant, %op, %path, %caller, ?verdict, "Decided access");
        verdict
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
