//! Fluent ACL builder.

use crate::error::ValidationError;

use super::entry::{AclEntry, Action, Permissions};

/// Permissions accepted on operation ACLs.
pub const OPERATION_PERMISSIONS: [&str; 3] = ["read", "manage", "administer"];

/// Builds an ACL one validated entry at a time.
///
/// Each call validates the whole entry before touching the list, so a
/// rejected call leaves the builder exactly as it was.
///
/// `build` does not reset the builder; later calls keep appending to the
/// same list.
#[derive(Clone, Debug, Default)]
pub struct AclBuilder {
    /// Restricting set of permission names (`None` = unrestricted).
    allowed: Option<Vec<String>>,
    entries: Vec<AclEntry>,
}

impl AclBuilder {
    /// Create a builder accepting any permission name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder that only accepts the given permission names.
    pub fn restricted<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(allowed.into_iter().map(Into::into).collect()),
            entries: Vec::new(),
        }
    }

    /// Create a builder for operation ACLs.
    pub fn for_operations() -> Self {
        Self::restricted(OPERATION_PERMISSIONS)
    }

    /// The restricting set, if any.
    pub fn allowed_permissions(&self) -> Option<&[String]> {
        self.allowed.as_deref()
    }

    /// Append an entry whose action is given by name (`"allow"` or `"deny"`).
    pub fn append<P, I, S>(
        &mut self,
        action: &str,
        permissions: P,
        subjects: I,
    ) -> Result<&mut Self, ValidationError>
    where
        P: Into<Permissions>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let permissions = self.check_permissions(permissions.into())?;
        let action: Action = action.parse()?;
        Ok(self.insert(action, permissions, subjects))
    }

    /// Append an entry with a typed action.
    pub fn push<P, I, S>(
        &mut self,
        action: Action,
        permissions: P,
        subjects: I,
    ) -> Result<&mut Self, ValidationError>
    where
        P: Into<Permissions>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let permissions = self.check_permissions(permissions.into())?;
        Ok(self.insert(action, permissions, subjects))
    }

    /// Append an `allow` entry.
    pub fn allow<P, I, S>(&mut self, permissions: P, subjects: I) -> Result<&mut Self, ValidationError>
    where
        P: Into<Permissions>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Action::Allow, permissions, subjects)
    }

    /// Append a `deny` entry.
    pub fn deny<P, I, S>(&mut self, permissions: P, subjects: I) -> Result<&mut Self, ValidationError>
    where
        P: Into<Permissions>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Action::Deny, permissions, subjects)
    }

    /// The entries accumulated so far.
    pub fn build(&self) -> Vec<AclEntry> {
        self.entries.clone()
    }

    /// Consume the builder, returning its entries.
    pub fn into_entries(self) -> Vec<AclEntry> {
        self.entries
    }

    /// Number of entries accumulated so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_permissions(&self, permissions: Permissions) -> Result<Vec<String>, ValidationError> {
        let permissions = permissions.into_vec();
        if let Some(allowed) = &self.allowed
            && let Some(bad) = permissions.iter().find(|p| !allowed.contains(p))
        {
            return Err(ValidationError::UnsupportedPermission {
                permission: bad.clone(),
                allowed: allowed.clone(),
            });
        }
        if permissions.is_empty() {
            return Err(ValidationError::EmptyPermissions);
        }
        Ok(permissions)
    }

    fn insert<I, S>(&mut self, action: Action, permissions: Vec<String>, subjects: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(AclEntry {
            subjects: subjects.into_iter().map(Into::into).collect(),
            action,
            permissions,
        });
        self
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_builds_single_entry() {
        let mut builder = AclBuilder::new();
        builder.allow(["read", "write"], ["alice"]).unwrap();

        assert_eq!(
            builder.build(),
            vec![AclEntry {
                subjects: vec!["alice".into()],
                action: Action::Allow,
                permissions: vec!["read".into(), "write".into()],
            }]
        );
    }

    #[test]
    fn test_unknown_action_appends_nothing() {
        let mut builder = AclBuilder::new();
        let err = builder.append("grant", ["read"], ["bob"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownAction {
                action: "grant".into()
            }
        );
        assert!(builder.is_empty());
    }

    #[test]
    fn test_scalar_permission_is_normalized() {
        let mut builder = AclBuilder::new();
        builder.allow("read", ["bob"]).unwrap();
        assert_eq!(builder.build()[0].permissions, vec!["read"]);
    }

    #[test]
    fn test_restricting_set_rejects_unknown_permission() {
        let mut builder = AclBuilder::restricted(["read", "write"]);
        let err = builder.allow(["delete"], ["bob"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedPermission {
                permission: "delete".into(),
                allowed: vec!["read".into(), "write".into()],
            }
        );
        assert!(err.to_string().contains("delete"));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_partially_invalid_permissions_append_nothing() {
        let mut builder = AclBuilder::restricted(["read", "write"]);
        builder.allow("read", ["alice"]).unwrap();
        assert!(builder.deny(["write", "remove"], ["bob"]).is_err());
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_permission_checked_before_action() {
        let mut builder = AclBuilder::restricted(["read"]);
        let err = builder.append("grant", "write", ["bob"]).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedPermission { .. }));
    }

    #[test]
    fn test_empty_permissions_rejected() {
        let mut builder = AclBuilder::new();
        let none: Vec<String> = Vec::new();
        assert_eq!(
            builder.allow(none, ["alice"]).unwrap_err(),
            ValidationError::EmptyPermissions
        );
        assert!(builder.is_empty());
    }

    #[test]
    fn test_chaining_preserves_order() {
        let mut builder = AclBuilder::new();
        builder
            .allow("read", ["everyone"])
            .unwrap()
            .deny(["write"], ["guests", "robots"])
            .unwrap()
            .append("allow", "administer", ["admins"])
            .unwrap();

        let acl = builder.build();
        let actions: Vec<_> = acl.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![Action::Allow, Action::Deny, Action::Allow]);
        assert_eq!(acl[1].subjects, vec!["guests", "robots"]);
    }

    #[test]
    fn test_build_does_not_reset() {
        let mut builder = AclBuilder::new();
        builder.allow("read", ["alice"]).unwrap();
        let first = builder.build();
        builder.deny("read", ["bob"]).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(builder.build().len(), 2);
        assert_eq!(builder.into_entries().len(), 2);
    }

    #[test]
    fn test_operation_builder() {
        let mut builder = AclBuilder::for_operations();
        builder.allow(["read", "manage"], ["ops"]).unwrap();
        assert!(builder.allow("write", ["ops"]).is_err());
        assert_eq!(
            builder.allowed_permissions().unwrap(),
            ["read", "manage", "administer"]
        );
    }
}
