//! Selectable data tree consumed by the RESTCONF gateway.
//!
//! The gateway never stores or validates configuration data itself. It talks
//! to a device through the traits in this crate: a [`Device`] hands out one
//! [`Browser`] per module, a browser resolves a path into a [`Selection`], and
//! a selection exposes the read, write, action and subscription operations the
//! HTTP verbs map onto.
//!
//! The [`memory`] module provides a schema-checked, in-process implementation
//! used by the `restconfd` binary and by the gateway's tests.

mod device;
mod errors;
pub mod memory;
mod meta;
mod notification;
mod scope;
mod selection;

pub use device::{Device, DeviceMap, SourceOpener};
pub use errors::TreeError;
pub use meta::{NodeKind, NodeMeta};
pub use notification::{Notification, NotifyCallback, NotifyCloser};
pub use scope::RequestScope;
pub use selection::{Browser, Payload, Selection, TreeData, ValueNode};
