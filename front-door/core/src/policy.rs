use crate::{
    network_match::NetworkMatch,
    path_match::{normalize_path, PathMatch},
    referrer_match::{Referer, ReferrerMatch},
};
use std::{fmt, net::IpAddr};

/// The only access control document version this engine evaluates.
pub const SUPPORTED_VERSION: &str = "1.0";

/// The kind of access a request asks for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
    List,
    Delete,
}

/// The outcome of an access decision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Allowed,
    Forbidden,

    /// The request may proceed only if the caller's credentials check out.
    RequiresPasswordAuthentication,
}

/// A set of access controls applied to a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessRule {
    pub allow_unauth_read: bool,
    pub allow_unauth_write: bool,
    pub allow_unauth_list: bool,
    pub allow_unauth_delete: bool,

    /// When non-empty, every request (authenticated or not) must originate
    /// from one of these networks.
    pub ipv4_whitelist: Vec<NetworkMatch>,

    /// When non-empty, an unauthenticated request is only eligible for the
    /// `allow_unauth_*` flags if its `Referer` matches one of these prefixes.
    pub unauth_referrer_whitelist: Vec<ReferrerMatch>,
}

/// Overrides the default rule for the paths it matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationRule {
    pub path: PathMatch,
    pub rule: AccessRule,
}

/// A tenant's parsed access control document.
///
/// `Policy::default()` means "no custom policy": every request must present
/// credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    pub version: String,
    pub default: AccessRule,

    /// Evaluated in order; the first match wins.
    pub locations: Vec<LocationRule>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("version mismatch: expected {expected} found {found:?}")]
pub struct VersionMismatch {
    pub expected: &'static str,
    pub found: String,
}

// === impl Operation ===

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => "read".fmt(f),
            Self::Write => "write".fmt(f),
            Self::List => "list".fmt(f),
            Self::Delete => "delete".fmt(f),
        }
    }
}

// === impl Verdict ===

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => "allowed".fmt(f),
            Self::Forbidden => "forbidden".fmt(f),
            Self::RequiresPasswordAuthentication => "requires-password-authentication".fmt(f),
        }
    }
}

// === impl AccessRule ===

impl AccessRule {
    pub fn allows_unauthenticated(&self, op: Operation) -> bool {
        match op {
            Operation::Read => self.allow_unauth_read,
            Operation::Write => self.allow_unauth_write,
            Operation::List => self.allow_unauth_list,
            Operation::Delete => self.allow_unauth_delete,
        }
    }

    /// Applies the IPv4 whitelist, if any.
    pub fn admits(&self, caller: IpAddr) -> bool {
        self.ipv4_whitelist.is_empty() || self.ipv4_whitelist.iter().any(|n| n.contains(caller))
    }

    /// Applies the referrer whitelist, if any, to an unauthenticated request.
    pub fn admits_unauthenticated(&self, referer: Option<&str>) -> bool {
        if self.unauth_referrer_whitelist.is_empty() {
            return true;
        }
        let Some(referer) = referer.and_then(Referer::parse) else {
            return false;
        };
        self.unauth_referrer_whitelist
            .iter()
            .any(|prefix| referer.starts_with(prefix))
    }
}

// === impl Policy ===

impl Policy {
    /// True when no custom policy is configured.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Selects the rule that governs `path`: the first matching location's,
    /// or the default.
    pub fn effective_rule(&self, path: &str) -> &AccessRule {
        let normalized = normalize_path(path);
        for (i, location) in self.locations.iter().enumerate() {
            if location.path.matches(path, &normalized) {
                tracing::debug!(location = i + 1, %path, "Location matches");
                return &location.rule;
            }
        }
        &self.default
    }

    /// Decides whether a request may proceed without credentials.
    ///
    /// A version mismatch is an error rather than a verdict: the document was
    /// written for a schema this engine does not understand.
    pub fn decide(
        &self,
        op: Operation,
        path: &str,
        caller: IpAddr,
        referer: Option<&str>,
    ) -> Result<Verdict, VersionMismatch> {
        if self.is_empty() {
            return Ok(Verdict::RequiresPasswordAuthentication);
        }

        if self.version != SUPPORTED_VERSION {
            return Err(VersionMismatch {
                expected: SUPPORTED_VERSION,
                found: self.version.clone(),
            });
        }

        let rule = self.effective_rule(path);

        if !rule.admits(caller) {
            tracing::debug!(%caller, "Caller not in IPv4 whitelist");
            return Ok(Verdict::Forbidden);
        }

        if !rule.admits_unauthenticated(referer) {
            tracing::debug!(?referer, "Referer not in unauthenticated whitelist");
            return Ok(Verdict::RequiresPasswordAuthentication);
        }

        if rule.allows_unauthenticated(op) {
            tracing::debug!(%op, "Unauthenticated access allowed");
            return Ok(Verdict::Allowed);
        }

        Ok(Verdict::RequiresPasswordAuthentication)
    }
}
