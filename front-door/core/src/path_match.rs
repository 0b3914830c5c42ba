use regex::Regex;

/// Selects the request paths a location rule applies to.
#[derive(Clone, Debug)]
pub enum PathMatch {
    /// Matches paths whose normalized form starts with the (normalized) prefix.
    Prefix(String),

    /// Matches paths for which the pattern finds a match anywhere in the raw,
    /// unnormalized path.
    Regex(Regex),
}

/// Puts a path in comparable form: no leading slashes, lower case.
pub fn normalize_path(path: &str) -> String {
    path.trim_start_matches('/').to_lowercase()
}

// === impl PathMatch ===

impl PathMatch {
    pub fn prefix(prefix: &str) -> Self {
        Self::Prefix(normalize_path(prefix))
    }

    pub fn regex(s: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(s)?))
    }

    /// `normalized` must be `normalize_path(path)`; it is passed separately so
    /// that it is computed once per decision rather than once per location.
    pub fn matches(&self, path: &str, normalized: &str) -> bool {
        match self {
            Self::Prefix(prefix) => normalized.starts_with(prefix.as_str()),
            Self::Regex(re) => re.is_match(path),
        }
    }
}

impl PartialEq for PathMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Prefix(l0), Self::Prefix(r0)) => l0 == r0,
            (Self::Regex(l0), Self::Regex(r0)) => l0.as_str() == r0.as_str(),
            _ => false,
        }
    }
}

impl Eq for PathMatch {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        assert_eq!(normalize_path("///Data/Key"), "data/key");
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("abc/"), "abc/");
    }

    #[test]
    fn prefix_is_normalized() {
        let m = PathMatch::prefix("/ABC");
        assert_eq!(m, PathMatch::Prefix("abc".to_string()));

        let path = "//abc/def";
        assert!(m.matches(path, &normalize_path(path)));
        let path = "/xyz/abc";
        assert!(!m.matches(path, &normalize_path(path)));
    }

    #[test]
    fn regex_sees_raw_path() {
        let m = PathMatch::regex(r"^/Private/").unwrap();
        let path = "/Private/thing";
        assert!(m.matches(path, &normalize_path(path)));
        let path = "/private/thing";
        assert!(!m.matches(path, &normalize_path(path)));
    }
}
