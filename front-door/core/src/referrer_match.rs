use crate::path_match::normalize_path;
use std::fmt;

/// Matches the `Referer` header of an unauthenticated request.
///
/// The prefix is compared against the part of the referring URL following its
/// scheme, e.g. `example.com/myapp` matches `http://example.com/myapp/login`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferrerMatch(String);

// === impl ReferrerMatch ===

impl ReferrerMatch {
    pub fn new(prefix: &str) -> Self {
        Self(normalize_path(prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the referring URL, with its scheme removed, starts with
    /// this prefix. Referers that are not absolute URIs never match.
    pub fn matches(&self, referer: &str) -> bool {
        Referer::parse(referer).is_some_and(|r| r.starts_with(self))
    }
}

impl fmt::Display for ReferrerMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A referring URL in comparable form: `authority/normalized-path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Referer(String);

impl Referer {
    pub(crate) fn parse(header: &str) -> Option<Self> {
        let uri = header.trim().parse::<http::Uri>().ok()?;
        uri.scheme()?;
        let authority = uri.authority()?.as_str().to_ascii_lowercase();
        Some(Self(format!("{}/{}", authority, normalize_path(uri.path()))))
    }

    pub(crate) fn starts_with(&self, prefix: &ReferrerMatch) -> bool {
        self.0.starts_with(prefix.as_str())
    }
}
