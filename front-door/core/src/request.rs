use crate::policy::Operation;
use http::Method;
use std::net::IpAddr;

/// Object keys live beneath this path on tenant hosts.
pub const DATA_PATH_PREFIX: &str = "/data/";

// === impl Operation ===

impl Operation {
    /// Classifies an object API request.
    ///
    /// Returns `None` for requests that are not object operations (e.g.
    /// pings), which do not consult a tenant's access policy.
    pub fn for_request(method: &Method, path: &str, query: Option<&str>) -> Option<Self> {
        let key = path.strip_prefix(DATA_PATH_PREFIX)?;

        match *method {
            Method::GET | Method::HEAD if key.is_empty() => Some(Self::List),
            Method::GET | Method::HEAD => Some(Self::Read),
            _ if key.is_empty() => None,
            Method::POST if has_action(query, "delete") => Some(Self::Delete),
            Method::POST | Method::PUT | Method::PATCH => Some(Self::Write),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }
}

fn has_action(query: Option<&str>, action: &str) -> bool {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(k, v)| k == "action" && v == action)
}

/// Returns the originating client from an `X-Forwarded-For` header.
///
/// The header may list several hops (`client, proxy1, proxy2`); the first is
/// the original sender. A `:port` suffix on an IPv4 entry is ignored.
pub fn client_ip_from_forwarded_for(header: &str) -> Option<IpAddr> {
    let first = header.split(',').next()?.trim();
    if let Ok(ip) = first.parse() {
        return Some(ip);
    }
    let (addr, _port) = first.split_once(':')?;
    addr.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify() {
        let op = |m: Method, p: &str, q: Option<&str>| Operation::for_request(&m, p, q);

        assert_eq!(op(Method::GET, "/data/", None), Some(Operation::List));
        assert_eq!(op(Method::HEAD, "/data/", None), Some(Operation::List));
        assert_eq!(op(Method::GET, "/data/key", None), Some(Operation::Read));
        assert_eq!(op(Method::HEAD, "/data/key", None), Some(Operation::Read));
        assert_eq!(op(Method::POST, "/data/key", None), Some(Operation::Write));
        assert_eq!(op(Method::PUT, "/data/key", None), Some(Operation::Write));
        assert_eq!(op(Method::PATCH, "/data/key", None), Some(Operation::Write));
        assert_eq!(
            op(Method::POST, "/data/key", Some("action=delete")),
            Some(Operation::Delete)
        );
        assert_eq!(op(Method::DELETE, "/data/key", None), Some(Operation::Delete));

        assert_eq!(op(Method::GET, "/ping", None), None);
        assert_eq!(op(Method::POST, "/data/", None), None);
        assert_eq!(op(Method::OPTIONS, "/data/key", None), None);
    }

    #[test]
    fn forwarded_for() {
        let ip = |s| client_ip_from_forwarded_for(s);
        assert_eq!(ip("192.0.2.1"), Some("192.0.2.1".parse().unwrap()));
        assert_eq!(
            ip("192.0.2.1:4321, 10.0.0.1"),
            Some("192.0.2.1".parse().unwrap())
        );
        assert_eq!(ip("2001:db8::1, 10.0.0.1"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(ip(""), None);
        assert_eq!(ip("unknown"), None);
    }
}
