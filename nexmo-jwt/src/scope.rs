//! Paths and methods of the API that a token can be granted access to.
use crate::claims::ClaimValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Claim holding the access control list.
pub const ACL: &str = "acl";

const PATHS: &str = "paths";
const METHODS: &str = "methods";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    AllUserAccess,
    ListUsers,
    CreateUser,
    RetrieveUser,
    UpdateUser,
    DeleteUser,
}

impl Scope {
    pub fn path(&self) -> &'static str {
        match self {
            Scope::AllUserAccess | Scope::RetrieveUser => "/v1/users/**",
            Scope::ListUsers | Scope::CreateUser => "/v1/users",
            Scope::UpdateUser | Scope::DeleteUser => "/v1/users/*",
        }
    }

    pub fn methods(&self) -> &'static [Method] {
        match self {
            Scope::AllUserAccess => &Method::ALL,
            Scope::ListUsers | Scope::RetrieveUser => &[Method::Get],
            Scope::CreateUser => &[Method::Post],
            Scope::UpdateUser => &[Method::Put],
            Scope::DeleteUser => &[Method::Delete],
        }
    }
}

/// Builds the `acl` claim value for a set of scopes:
/// `{"paths": {"/v1/users": {"methods": ["GET", "POST"]}}}`.
///
/// Scopes sharing a path have their methods merged.
pub fn acl_claim(scopes: &[Scope]) -> ClaimValue {
    let mut paths: BTreeMap<&str, BTreeSet<Method>> = BTreeMap::new();
    for scope in scopes {
        paths
            .entry(scope.path())
            .or_default()
            .extend(scope.methods().iter().copied());
    }

    let paths = paths
        .into_iter()
        .map(|(path, methods)| {
            let methods: Vec<ClaimValue> = methods.iter().map(|m| m.as_str().into()).collect();
            (
                path.to_string(),
                ClaimValue::Map(BTreeMap::from([(METHODS.to_string(), ClaimValue::Sequence(methods))])),
            )
        })
        .collect();
    ClaimValue::Map(BTreeMap::from([(PATHS.to_string(), ClaimValue::Map(paths))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_user_access_allows_every_method() {
        assert_eq!(Scope::AllUserAccess.methods(), &Method::ALL);
        assert_eq!(Scope::AllUserAccess.path(), "/v1/users/**");
    }

    #[test]
    fn test_acl_claim_merges_methods_by_path() {
        let acl = acl_claim(&[
            Scope::CreateUser,
            Scope::ListUsers,
            Scope::DeleteUser,
            Scope::UpdateUser,
            Scope::ListUsers,
        ]);

        assert_eq!(
            serde_json::to_value(&acl).unwrap(),
            json!({
                "paths": {
                    "/v1/users": {"methods": ["GET", "POST"]},
                    "/v1/users/*": {"methods": ["PUT", "DELETE"]},
                }
            })
        );
    }

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Method::Patch).unwrap(), json!("PATCH"));
    }

    #[test]
    fn test_empty_acl() {
        assert_eq!(
            serde_json::to_value(acl_claim(&[])).unwrap(),
            json!({"paths": {}})
        );
    }
}
