//! ACL entry types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whether an entry grants or revokes its permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Grant the permissions.
    Allow,
    /// Revoke the permissions.
    Deny,
}

impl Action {
    /// The wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Deny => "deny",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Action::Allow),
            "deny" => Ok(Action::Deny),
            other => Err(ValidationError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

/// One access-control entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Users or groups the entry applies to.
    pub subjects: Vec<String>,
    /// Grant or revoke.
    pub action: Action,
    /// Permission names; never empty.
    pub permissions: Vec<String>,
}

/// Permission names as passed to [`AclBuilder`](super::AclBuilder).
///
/// A single name converts to a one-element list, so callers can write
/// `allow("read", ..)` as well as `allow(["read", "write"], ..)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Permissions(Vec<String>);

impl Permissions {
    /// The permission names, in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consume into the underlying list.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Permissions {
    fn from(permission: &str) -> Self {
        Self(vec![permission.to_string()])
    }
}

impl From<String> for Permissions {
    fn from(permission: String) -> Self {
        Self(vec![permission])
    }
}

impl From<Vec<String>> for Permissions {
    fn from(permissions: Vec<String>) -> Self {
        Self(permissions)
    }
}

impl From<Vec<&str>> for Permissions {
    fn from(permissions: Vec<&str>) -> Self {
        Self(permissions.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Permissions {
    fn from(permissions: &[&str]) -> Self {
        Self(permissions.iter().map(|p| p.to_string()).collect())
    }
}

impl From<&[String]> for Permissions {
    fn from(permissions: &[String]) -> Self {
        Self(permissions.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for Permissions {
    fn from(permissions: [&str; N]) -> Self {
        Self(permissions.iter().map(|p| p.to_string()).collect())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!("allow".parse::<Action>().unwrap(), Action::Allow);
        assert_eq!("deny".parse::<Action>().unwrap(), Action::Deny);
        assert_eq!(
            "Allow".parse::<Action>().unwrap_err(),
            ValidationError::UnknownAction {
                action: "Allow".into()
            }
        );
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = AclEntry {
            subjects: vec!["alice".into()],
            action: Action::Allow,
            permissions: vec!["read".into(), "write".into()],
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "subjects": ["alice"],
                "action": "allow",
                "permissions": ["read", "write"],
            })
        );
    }

    #[test]
    fn test_permissions_normalization() {
        assert_eq!(Permissions::from("read").as_slice(), ["read"]);
        assert_eq!(
            Permissions::from(["read", "write"]).into_vec(),
            vec!["read", "write"]
        );
        assert_eq!(
            Permissions::from(vec!["use".to_string()]).as_slice(),
            ["use"]
        );
    }
}
