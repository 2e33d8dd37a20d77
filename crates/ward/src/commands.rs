//! Permission commands.
//!
//! These only assemble parameters; the transport does the rest.

use serde::Serialize;
use serde_json::{Value, json};

use crate::acl::AclEntry;
use crate::error::TransportError;
use crate::transport::{Params, Transport};

/// Parameters of a `check_permission` request.
#[derive(Clone, Debug, Serialize)]
pub struct CheckPermission {
    /// User login.
    pub user: String,
    /// Permission to check, e.g. `read` or `administer`.
    pub permission: String,
    /// Node path.
    pub path: String,
    /// Restrict the check to these columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl CheckPermission {
    /// Check `permission` for `user` on `path`.
    pub fn new(
        user: impl Into<String>,
        permission: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            permission: permission.into(),
            path: path.into(),
            columns: None,
        }
    }

    /// Restrict the check to the given columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Serialize a struct into request params.
fn to_params<T: Serialize>(value: &T) -> Result<Params, TransportError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TransportError::new("request parameters must be an object")),
        Err(e) => Err(TransportError::new(format!("failed to encode parameters: {e}"))),
    }
}

fn member_params(member: &str, group: &str) -> Params {
    let mut params = Params::new();
    params.insert("member".into(), json!(member));
    params.insert("group".into(), json!(group));
    params
}

/// Check a permission; returns the transport's decoded answer.
pub async fn check_permission<T: Transport + ?Sized>(
    transport: &T,
    check: &CheckPermission,
) -> Result<Value, TransportError> {
    transport
        .request("check_permission", to_params(check)?)
        .await
}

/// Add `member` to `group`.
pub async fn add_member<T: Transport + ?Sized>(
    transport: &T,
    member: &str,
    group: &str,
) -> Result<(), TransportError> {
    tracing::debug!(member, group, "adding group member");
    transport
        .request("add_member", member_params(member, group))
        .await?;
    Ok(())
}

/// Remove `member` from `group`.
pub async fn remove_member<T: Transport + ?Sized>(
    transport: &T,
    member: &str,
    group: &str,
) -> Result<(), TransportError> {
    tracing::debug!(member, group, "removing group member");
    transport
        .request("remove_member", member_params(member, group))
        .await?;
    Ok(())
}

/// Replace the ACL of the node at `path`.
pub async fn set_acl<T: Transport + ?Sized>(
    transport: &T,
    path: &str,
    acl: &[AclEntry],
) -> Result<(), TransportError> {
    let value = serde_json::to_value(acl)
        .map_err(|e| TransportError::new(format!("failed to encode ACL: {e}")))?;
    let mut params = Params::new();
    params.insert("path".into(), json!(format!("{path}/@acl")));
    params.insert("value".into(), value);
    transport.request("set", params).await?;
    Ok(())
}
