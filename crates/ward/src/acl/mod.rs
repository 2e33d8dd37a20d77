//! Validated access-control lists.
//!
//! ACLs are assembled client side and shipped as a plain list of entries.
//! [`AclBuilder`] checks every entry as it is added, so a malformed ACL is
//! rejected before any request goes out.
//!
//! ## Example
//!
//! ```rust
//! use ward::acl::{AclBuilder, Action};
//!
//! let mut builder = AclBuilder::restricted(["read", "write"]);
//! builder
//!     .allow(["read", "write"], ["alice"])?
//!     .deny("write", ["guests"])?;
//!
//! let acl = builder.build();
//! assert_eq!(acl.len(), 2);
//! assert_eq!(acl[1].action, Action::Deny);
//!
//! // Outside the restricting set.
//! assert!(builder.allow("remove", ["bob"]).is_err());
//! # Ok::<(), ward::ValidationError>(())
//! ```

mod builder;
mod entry;

pub use builder::{AclBuilder, OPERATION_PERMISSIONS};
pub use entry::{AclEntry, Action, Permissions};
