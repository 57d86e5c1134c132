//! The two service containers an audit run needs.
//!
//! Both are configurations of the generic container lifecycle:
//!
//! - [`DatabaseService`]: Postgres on a published loopback port, health polled
//! - [`ToolService`]: the introspector on the host network, driven by exec

pub mod introspector;
pub mod postgres;
pub mod support;

pub use introspector::{ToolOptions, ToolService};
pub use postgres::{Credential, DatabaseOptions, DatabaseService};
pub use support::SupportTable;
