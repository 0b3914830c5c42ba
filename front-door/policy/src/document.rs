//! Decodes a tenant's access control document into a [`Policy`].
//!
//! The document is a JSON object. Keys are decoded explicitly, one by one, into typed fields; any
//! key this schema does not know is rejected so that documents written for a newer schema are
//! refused rather than partially honored.

use front_door_core::{
    AccessRule, LocationRule, NetworkMatch, NetworkParseError, PathMatch, Policy, ReferrerMatch,
};
use serde_json::{Map, Value};
use std::fmt;


/// Documents larger than this are rejected without being parsed.
pub const MAX_DOCUMENT_LEN: usize = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("document too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("unable to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("{field}: expected {expected}")]
    InvalidType {
        field: Field,
        expected: &'static str,
    },

    /// `index` is 1-based.
    #[error("{field}: #{index} expected a string")]
    InvalidEntry { field: Field, index: usize },

    /// `index` is 1-based.
    #[error("{}: #{index} {error}", Field::Ipv4Whitelist)]
    InvalidNetwork {
        index: usize,
        #[source]
        error: NetworkParseError,
    },

    #[error("regexp: unable to compile: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("one of 'prefix' or 'regexp' must be set")]
    LocationMatcher,

    /// `index` is 1-based.
    #[error("{}: #{index} {error}", Field::Locations)]
    Location {
        index: usize,
        #[source]
        error: Box<LoadError>,
    },
}

/// A key recognized in an access control document.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Version,
    AllowUnauthRead,
    AllowUnauthWrite,
    AllowUnauthList,
    AllowUnauthDelete,
    Ipv4Whitelist,
    UnauthReferrerWhitelist,
    Locations,
    Prefix,
    Regexp,
}

/// Loads an access control document.
///
/// An absent document means the tenant has no custom policy, which yields
/// `Policy::default()`.
pub fn load_policy(document: Option<&[u8]>) -> Result<Policy, LoadError> {
    let Some(document) = document else {
        return Ok(Policy::default());
    };

    if document.len() > MAX_DOCUMENT_LEN {
        return Err(LoadError::TooLarge {
            size: document.len(),
            limit: MAX_DOCUMENT_LEN,
        });
    }

    let object = serde_json::from_slice::<Map<String, Value>>(document)?;

    let mut policy = Policy::default();
    for (key, value) in &object {
        match Field::from_key(key) {
            Some(Field::Version) => policy.version = decode_string(Field::Version, value)?,
            Some(Field::Locations) => policy.locations = decode_locations(value)?,
            Some(field) if field.is_rule() => field.apply(&mut policy.default, value)?,
            _ => return Err(LoadError::UnknownKey(key.clone())),
        }
    }

    tracing::debug!(
        version = %policy.version,
        locations = policy.locations.len(),
        "Loaded access control document"
    );
    Ok(policy)
}

fn decode_locations(value: &Value) -> Result<Vec<LocationRule>, LoadError> {
    let items = match value {
        Value::Null => return Ok(vec![]),
        Value::Array(items) => items,
        _ => {
            return Err(LoadError::InvalidType {
                field: Field::Locations,
                expected: "a list",
            })
        }
    };

    let mut locations = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let location = decode_location(item).map_err(|error| LoadError::Location {
            index: i + 1,
            error: Box::new(error),
        })?;
        locations.extend(location);
    }
    Ok(locations)
}

fn decode_location(value: &Value) -> Result<Option<LocationRule>, LoadError> {
    let Value::Object(object) = value else {
        return Err(LoadError::InvalidType {
            field: Field::Locations,
            expected: "an object",
        });
    };
    if object.is_empty() {
        return Ok(None);
    }

    let mut prefix = None;
    let mut regexp = None;
    let mut rule = AccessRule::default();
    for (key, value) in object {
        match Field::from_key(key) {
            Some(Field::Prefix) => prefix = Some(decode_string(Field::Prefix, value)?),
            Some(Field::Regexp) => regexp = Some(decode_string(Field::Regexp, value)?),
            Some(field) if field.is_rule() => field.apply(&mut rule, value)?,
            _ => return Err(LoadError::UnknownKey(key.clone())),
        }
    }

    // A prefix takes precedence over a regexp.
    let path = match (prefix, regexp) {
        (Some(prefix), _) => PathMatch::prefix(&prefix),
        (None, Some(regexp)) => PathMatch::regex(&regexp)?,
        (None, None) => return Err(LoadError::LocationMatcher),
    };
    Ok(Some(LocationRule { path, rule }))
}

fn decode_string(field: Field, value: &Value) -> Result<String, LoadError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(LoadError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

fn decode_bool(field: Field, value: &Value) -> Result<bool, LoadError> {
    value.as_bool().ok_or(LoadError::InvalidType {
        field,
        expected: "a boolean",
    })
}

/// Decodes a list of strings; `null` is the empty list.
fn decode_strings(field: Field, value: &Value) -> Result<Vec<&str>, LoadError> {
    let items = match value {
        Value::Null => return Ok(vec![]),
        Value::Array(items) => items,
        _ => {
            return Err(LoadError::InvalidType {
                field,
                expected: "a list of strings",
            })
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .ok_or(LoadError::InvalidEntry { field, index: i + 1 })
        })
        .collect()
}

fn decode_ipv4_whitelist(value: &Value) -> Result<Vec<NetworkMatch>, LoadError> {
    decode_strings(Field::Ipv4Whitelist, value)?
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            s.parse()
                .map_err(|error| LoadError::InvalidNetwork { index: i + 1, error })
        })
        .collect()
}

// === impl Field ===

impl Field {
    const ALL: [Self; 10] = [
        Self::Version,
        Self::AllowUnauthRead,
        Self::AllowUnauthWrite,
        Self::AllowUnauthList,
        Self::AllowUnauthDelete,
        Self::Ipv4Whitelist,
        Self::UnauthReferrerWhitelist,
        Self::Locations,
        Self::Prefix,
        Self::Regexp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::AllowUnauthRead => "allow_unauth_read",
            Self::AllowUnauthWrite => "allow_unauth_write",
            Self::AllowUnauthList => "allow_unauth_list",
            Self::AllowUnauthDelete => "allow_unauth_delete",
            Self::Ipv4Whitelist => "ipv4_whitelist",
            Self::UnauthReferrerWhitelist => "unauth_referrer_whitelist",
            Self::Locations => "locations",
            Self::Prefix => "prefix",
            Self::Regexp => "regexp",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }

    /// Rule fields may appear both at the top level and within a location.
    fn is_rule(&self) -> bool {
        !matches!(
            self,
            Self::Version | Self::Locations | Self::Prefix | Self::Regexp
        )
    }

    fn apply(self, rule: &mut AccessRule, value: &Value) -> Result<(), LoadError> {
        match self {
            Self::AllowUnauthRead => rule.allow_unauth_read = decode_bool(self, value)?,
            Self::AllowUnauthWrite => rule.allow_unauth_write = decode_bool(self, value)?,
            Self::AllowUnauthList => rule.allow_unauth_list = decode_bool(self, value)?,
            Self::AllowUnauthDelete => rule.allow_unauth_delete = decode_bool(self, value)?,
            Self::Ipv4Whitelist => rule.ipv4_whitelist = decode_ipv4_whitelist(value)?,
            Self::UnauthReferrerWhitelist => {
                rule.unauth_referrer_whitelist = decode_strings(self, value)?
                    .into_iter()
                    .map(ReferrerMatch::new)
                    .collect()
            }
            Self::Version | Self::Locations | Self::Prefix | Self::Regexp => {
                return Err(LoadError::UnknownKey(self.as_str().to_string()))
            }
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}
