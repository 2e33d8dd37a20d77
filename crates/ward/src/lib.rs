//! Ward: client-side safety primitives for RPC clients.
//!
//! Three independent pieces that client code combines around a risky call:
//!
//! - [`InterruptGuard`] runs a compensating action when a protected block is
//!   interrupted, tolerating repeated interrupts during the compensation.
//! - [`with_ephemeral_resource`] creates a throwaway remote object for the
//!   duration of a scope and always removes it afterwards.
//! - [`AclBuilder`] validates access-control entries before they are sent.
//!
//! The transport itself is out of scope; it is plugged in through the
//! [`Transport`] trait.

pub mod acl;
pub mod commands;
mod config;
mod error;
pub mod guard;
mod scope;
mod signal;
pub mod testing;
mod transport;

pub use acl::{AclBuilder, AclEntry, Action, Permissions};
pub use config::{EphemeralDefaults, WardConfig};
pub use error::{ConfigError, Error, NOT_FOUND_CODE, Result, TransportError, ValidationError};
pub use guard::{GuardPolicy, InterruptGuard};
pub use scope::{EphemeralScope, with_ephemeral_resource, with_interruptible_resource};
pub use signal::{Signal, SignalKind, interruptible};
pub use transport::{EphemeralSpec, Params, Transport};
