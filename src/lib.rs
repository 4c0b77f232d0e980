//! Poll Schema
//!
//! Declarative list schema for the polling backend, and the machinery to
//! load, check and exercise it.
//!
//! ## Lists
//!
//! ```text
//! User     >──  District       User.district / District.users
//! User     >──  AccountType    User.accountType / AccountType.users
//! User     ──<  Poll           User.polls / Poll.createdBy
//! User     ──<  Response       User.responses / Response.user
//! Poll     >──  PollAccess     Poll.access / PollAccess.polls
//! Poll     ──<  Answer         Poll.answers / Answer.poll
//! Poll     >─<  Tag            Poll.tags / Tag.polls
//! Answer   ──<  Response       Answer.responses / Response.answer
//! ```
//!
//! - **Declaration** ([`lists`]): the lists, built from per-kind field configs
//! - **Registry** ([`SchemaRegistry`]): validated arena of lists with every
//!   relationship resolved into one [`Relation`] holding both directions
//! - **Store** ([`ItemStore`]): in-memory CRUD that enforces the declared
//!   constraints, for tests and tooling

pub mod checksum;
pub mod config;
pub mod error;
pub mod field;
pub mod graph;
pub mod lint;
pub mod list;
pub mod lists;
pub mod registry;
pub mod store;
pub mod value;

pub use checksum::Checksum;
pub use config::{AppConfig, DeletePolicy};
pub use error::{ItemError, Result, SchemaError};
pub use field::{FieldDecl, FieldKind};
pub use graph::RelationGraph;
pub use lint::SchemaLinter;
pub use list::{ListDecl, ListUi};
pub use registry::{Cardinality, FieldId, ListId, Relation, SchemaRegistry};
pub use store::{Item, ItemStore, ListView};
pub use value::{ItemId, ItemInput, Value};
