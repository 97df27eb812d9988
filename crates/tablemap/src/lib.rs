//! # tablemap
//!
//! A lightweight struct-to-table mapper for Rust.
//!
//! ## Features
//!
//! - **Convention over configuration**: table and column names are derived
//!   from type and field names (`FooBar` → `foo_bar`), overridable per field
//! - **Entity descriptors**: field metadata is validated once per type and cached
//! - **Composable options**: `Where`, `In`, `And`, `Order`, `Limit` and `Offset`
//!   assemble into `WHERE` / `ORDER BY` / `LIMIT` / `OFFSET` clauses
//! - **Driver agnostic**: statements run through the [`Executor`] trait; a
//!   `tokio-postgres` implementation ships behind the `postgres` feature
//! - **Traced**: every statement is logged at target `tablemap.sql`
//!
//! ## Quick start
//!
//! ```ignore
//! use tablemap::options::{order, where_, limit};
//! use tablemap::{Direction, Entity, Mapper, params};
//!
//! #[derive(Debug, Default, Entity)]
//! struct User {
//!     #[orm(pk)]
//!     id: u64,
//!     name: String,
//!     profile: String,
//! }
//!
//! let mapper = Mapper::new(client);
//!
//! // INSERT INTO user(name,profile) VALUES(?,?)
//! mapper.insert(&User { id: 0, name: "alice".into(), profile: "".into() }).await?;
//!
//! // SELECT * FROM user WHERE name = ? ORDER BY `id` DESC LIMIT ?
//! let users: Vec<User> = mapper
//!     .select_all(&[
//!         where_("name = ?", params!["alice"]),
//!         order("id", Direction::Desc),
//!         limit(10),
//!     ])
//!     .await?;
//! ```

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod naming;
pub mod options;
pub mod prelude;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::{MapperConfig, PrimaryKeyPolicy};
pub use entity::{
    Entity, EntityDescriptor, FieldDef, FieldDescriptor, PrimaryKey, describe, describe_with_policy,
};
pub use error::{OrmError, OrmResult};
pub use executor::{ExecResult, Executor, MemoryCursor, RowCursor, Statement};
pub use mapper::{Mapper, RowElement};
pub use naming::{column_name_for, table_name_for};
pub use options::{Direction, Fragment, OptionKind, SelectOption};
pub use value::{FieldKind, SqlField, Value, ValueKind};

#[cfg(feature = "derive")]
pub use tablemap_derive::Entity;
