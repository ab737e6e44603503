//! A filesystem-mirrored directory-service storage backend: every entry
//! under a configured suffix is kept as one `.ldif`-suffixed file plus a
//! same-named companion directory holding its children.
//!
//! Wire protocol, schema validation, access-control evaluation, and
//! password checking are all out of scope here; this crate is the
//! storage layer a directory server's front end would sit on top of,
//! exposed through the handlers in [`handlers`] and the offline batch
//! interface in [`tool`].

pub mod backend;
pub mod concurrency;
pub mod config;
pub mod dn;
pub mod entry;
pub mod entry_io;
pub mod enumerator;
pub mod error;
pub mod handlers;
pub mod modify;
pub mod parent_path;
pub mod path_codec;
pub mod sink;
pub mod tool;

pub use backend::{Backend, Capabilities, Stats, StatsSnapshot};
pub use config::Config;
pub use dn::{Dn, Rdn};
pub use entry::{Entry, EntrySerializer, LineSerializer};
pub use error::{LdapCode, ReferralInfo, Result};
pub use modify::ModOp;
pub use sink::{BufferingSink, Filter, MatchAll, ResultSink, Scope, ScopeRequest};
pub use tool::ToolSession;
