use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub const APPLICATION_ID: &str = "application_id";
pub const ISSUED_AT: &str = "iat";
pub const JWT_ID: &str = "jti";
pub const NOT_BEFORE: &str = "nbf";
pub const EXPIRES_AT: &str = "exp";
pub const SUBJECT: &str = "sub";

/// Claims whose timestamps are always sent as integer seconds since the epoch.
pub const NUMERIC_DATE_CLAIMS: [&str; 3] = [ISSUED_AT, EXPIRES_AT, NOT_BEFORE];

/// Claim set of a token, keyed by claim name.
///
/// Keys are kept ordered so two equal claim sets always serialize to the same payload.
pub type Claims = BTreeMap<String, ClaimValue>;

#[derive(Error, Debug, PartialEq)]
pub enum ClaimError {
    #[error("Claim {0} is not set.")]
    NotSet(String),
    #[error("claim `{claim}` is expected to be a {expected} but it is a {found}")]
    InvalidType {
        claim: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("claim `{0}` is null")]
    Null(String),
}

/// Value of a single claim.
///
/// `Timestamp` keeps the offset it was created with. The generator rewrites it into an
/// `Integer` for the numeric date claims (`iat`, `exp`, `nbf`); anywhere else it is
/// serialized as an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    #[serde(serialize_with = "serialize_rfc3339")]
    Timestamp(DateTime<FixedOffset>),
    Sequence(Vec<ClaimValue>),
    Map(BTreeMap<String, ClaimValue>),
}

fn serialize_rfc3339<S: Serializer>(
    value: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339())
}

impl ClaimValue {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimValue::String(_) => "string",
            ClaimValue::Integer(_) => "integer",
            ClaimValue::Float(_) => "float",
            ClaimValue::Bool(_) => "boolean",
            ClaimValue::Timestamp(_) => "timestamp",
            ClaimValue::Sequence(_) => "sequence",
            ClaimValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ClaimValue>> {
        match self {
            ClaimValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Integer(value)
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        ClaimValue::Integer(value.into())
    }
}

impl From<u32> for ClaimValue {
    fn from(value: u32) -> Self {
        ClaimValue::Integer(value.into())
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Float(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for ClaimValue {
    fn from(value: DateTime<Tz>) -> Self {
        ClaimValue::Timestamp(value.fixed_offset())
    }
}

impl<T: Into<ClaimValue>> From<Vec<T>> for ClaimValue {
    fn from(values: Vec<T>) -> Self {
        ClaimValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ClaimValue>> From<BTreeMap<String, T>> for ClaimValue {
    fn from(map: BTreeMap<String, T>) -> Self {
        ClaimValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl TryFrom<Value> for ClaimValue {
    type Error = ClaimError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        from_json(value, "")
    }
}

// `path` is only tracked to report where a null was found.
fn from_json(value: Value, path: &str) -> Result<ClaimValue, ClaimError> {
    match value {
        Value::Null => Err(ClaimError::Null(path.to_string())),
        Value::Bool(b) => Ok(ClaimValue::Bool(b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(ClaimValue::Integer(i)),
            (None, Some(f)) => Ok(ClaimValue::Float(f)),
            (None, None) => Ok(ClaimValue::String(n.to_string())),
        },
        Value::String(s) => Ok(ClaimValue::String(s)),
        Value::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(i, v)| from_json(v, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(ClaimValue::Sequence),
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                from_json(v, &child).map(|v| (k, v))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(ClaimValue::Map),
    }
}

/// Claims with a typed accessor on [`crate::Jwt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedClaim {
    IssuedAt,
    Id,
    NotBefore,
    ExpiresAt,
    Subject,
}

impl ReservedClaim {
    pub fn key(&self) -> &'static str {
        match self {
            ReservedClaim::IssuedAt => ISSUED_AT,
            ReservedClaim::Id => JWT_ID,
            ReservedClaim::NotBefore => NOT_BEFORE,
            ReservedClaim::ExpiresAt => EXPIRES_AT,
            ReservedClaim::Subject => SUBJECT,
        }
    }
}

impl TryFrom<&str> for ReservedClaim {
    type Error = ClaimError;

    /// Maps an accessor name to its claim. Both snake and camel case are accepted.
    fn try_from(property: &str) -> Result<Self, Self::Error> {
        match property {
            "issued_at" | "issuedAt" => Ok(ReservedClaim::IssuedAt),
            "id" => Ok(ReservedClaim::Id),
            "not_before" | "notBefore" => Ok(ReservedClaim::NotBefore),
            "expires_at" | "expiresAt" => Ok(ReservedClaim::ExpiresAt),
            "subject" => Ok(ReservedClaim::Subject),
            unknown => Err(ClaimError::NotSet(unknown.to_string())),
        }
    }
}
