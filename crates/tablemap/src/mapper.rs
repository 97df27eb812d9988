//! Entity-level operations over an [`Executor`].
//!
//! ```ignore
//! use tablemap::options::{and, in_list, limit, where_};
//! use tablemap::{Entity, Mapper, params};
//!
//! #[derive(Debug, Default, Entity)]
//! struct User {
//!     #[orm(pk)]
//!     id: u64,
//!     name: String,
//!     active: bool,
//! }
//!
//! let mapper = Mapper::new(client);
//! mapper.insert(&User { id: 0, name: "alice".into(), active: true }).await?;
//!
//! let mut users: Vec<Box<User>> = Vec::new();
//! mapper
//!     .select(
//!         &mut users,
//!         &[and([where_("active = ?", params![true]), in_list("id", [1, 2])]), limit(10)],
//!     )
//!     .await?;
//! ```

use crate::builder;
use crate::config::{MapperConfig, PrimaryKeyPolicy};
use crate::entity::{Entity, EntityDescriptor, FieldDescriptor, describe_with_policy};
use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecResult, Executor, RowCursor, Statement};
use crate::options::{Fragment, SelectOption};
use crate::value::{Value, ValueKind};
use std::rc::Rc;
use std::sync::Arc;

/// An element type a multi-row select can collect into.
///
/// `#[derive(Entity)]` implements it for the entity itself; `Box<E>` and
/// `Arc<E>` are covered here.
pub trait RowElement: Sized {
    type Entity: Entity;

    fn from_entity(entity: Self::Entity) -> Self;
}

impl<E: Entity> RowElement for Box<E> {
    type Entity = E;

    fn from_entity(entity: E) -> Self {
        Box::new(entity)
    }
}

impl<E: Entity> RowElement for Arc<E> {
    type Entity = E;

    fn from_entity(entity: E) -> Self {
        Arc::new(entity)
    }
}

impl<E: Entity> RowElement for Rc<E> {
    type Entity = E;

    fn from_entity(entity: E) -> Self {
        Rc::new(entity)
    }
}

/// Maps entities to statements and rows back to entities.
pub struct Mapper<X> {
    executor: X,
    config: MapperConfig,
}

impl<X> Mapper<X> {
    /// Create a mapper with default configuration.
    pub fn new(executor: X) -> Self {
        Self::with_config(executor, MapperConfig::default())
    }

    pub fn with_config(executor: X, config: MapperConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn into_inner(self) -> X {
        self.executor
    }

    fn describe<E: Entity>(&self) -> OrmResult<Arc<EntityDescriptor>> {
        describe_with_policy::<E>(self.config.primary_key_policy)
    }

    // Multi-row reads and counts never touch the primary key, so an entity
    // with several tagged fields is still readable.
    fn describe_for_read<E: Entity>(&self) -> OrmResult<Arc<EntityDescriptor>> {
        describe_with_policy::<E>(PrimaryKeyPolicy::LastWins)
    }

    /// SQL and parameters [`Mapper::insert`] would execute.
    pub fn insert_sql<E: Entity>(&self, record: &E) -> OrmResult<Fragment> {
        let desc = self.describe::<E>()?;
        builder::insert_statement(&desc, record)
    }

    /// SQL and parameters [`Mapper::update`] would execute.
    pub fn update_sql<E: Entity>(&self, record: &E) -> OrmResult<Fragment> {
        let desc = self.describe::<E>()?;
        builder::update_statement(&desc, record)
    }

    /// SQL and parameters [`Mapper::select_one`] would execute.
    pub fn select_one_sql<E: Entity>(&self, record: &E) -> OrmResult<Fragment> {
        let desc = self.describe::<E>()?;
        builder::select_one_statement(&desc, record)
    }

    /// SQL and parameters [`Mapper::select`] would execute for entity `E`.
    pub fn select_sql<E: Entity>(&self, options: &[SelectOption]) -> OrmResult<Fragment> {
        let desc = self.describe_for_read::<E>()?;
        builder::select_statement(&desc, options)
    }

    /// SQL and parameters [`Mapper::count`] would execute for entity `E`.
    pub fn count_sql<E: Entity>(
        &self,
        function: &str,
        options: &[SelectOption],
    ) -> OrmResult<Fragment> {
        let desc = self.describe_for_read::<E>()?;
        builder::count_statement(&desc, function, options)
    }

    fn log(&self, op: &'static str, table: &str, stmt: &Fragment) {
        if !self.config.logging_enabled {
            return;
        }
        let sql = self.config.truncate_sql(&stmt.sql);
        tracing::debug!(
            target: "tablemap.sql",
            op,
            table,
            param_count = stmt.params.len(),
            sql = %sql,
            "executing statement"
        );
    }
}

impl<X: Executor> Mapper<X> {
    async fn execute(
        &self,
        op: &'static str,
        table: &str,
        stmt: Fragment,
    ) -> OrmResult<ExecResult> {
        self.log(op, table, &stmt);
        let prepared = self.executor.prepare(&stmt.sql).await?;
        prepared.execute(&stmt.params).await
    }

    async fn query(
        &self,
        op: &'static str,
        table: &str,
        stmt: Fragment,
    ) -> OrmResult<<X::Statement<'_> as Statement>::Rows> {
        self.log(op, table, &stmt);
        let prepared = self.executor.prepare(&stmt.sql).await?;
        prepared.query(&stmt.params).await
    }

    /// Insert `record`, binding every column except the primary key.
    pub async fn insert<E: Entity>(&self, record: &E) -> OrmResult<ExecResult> {
        let desc = self.describe::<E>()?;
        let stmt = builder::insert_statement(&desc, record)?;
        self.execute("insert", &desc.table, stmt).await
    }

    /// Update the row identified by `record`'s primary key.
    ///
    /// Fails with `NoPrimaryKey` before anything is prepared when the
    /// entity declares no key.
    pub async fn update<E: Entity>(&self, record: &E) -> OrmResult<ExecResult> {
        let desc = self.describe::<E>()?;
        let stmt = builder::update_statement(&desc, record)?;
        self.execute("update", &desc.table, stmt).await
    }

    /// Reload `record` from the row matching its current primary key.
    ///
    /// The row is decoded into a scratch entity first and only copied into
    /// `record` once every column decoded, so `record` is left untouched on
    /// error. Returns `NotFound` when no row matches.
    pub async fn select_one<E: Entity + Default>(&self, record: &mut E) -> OrmResult<()> {
        let desc = self.describe::<E>()?;
        let stmt = builder::select_one_statement(&desc, record)?;
        let mut rows = self.query("select_one", &desc.table, stmt).await?;

        let fields = match resolve_columns(&desc, rows.column_names()) {
            Ok(fields) => fields,
            Err(e) => {
                rows.close();
                return Err(e);
            }
        };
        if !rows.next() {
            rows.close();
            return Err(OrmError::not_found(format!(
                "{} with the given primary key",
                desc.entity
            )));
        }
        let raw = rows.scan();
        rows.close();
        let raw = check_width(raw?, fields.len())?;

        let mut scratch = E::default();
        for (field, value) in fields.iter().zip(raw) {
            let value = value.coerce(field.kind, &field.column)?;
            scratch.set_field(field.index, value)?;
        }
        for field in &fields {
            record.set_field(field.index, scratch.field_value(field.index)?)?;
        }
        Ok(())
    }

    /// Replace `dst` with every row matching `options`.
    ///
    /// `dst` may hold entities, `Box`es or `Arc`s of entities. It is always
    /// replaced by a freshly allocated vector, empty when nothing matched,
    /// and left untouched on error.
    pub async fn select<T>(&self, dst: &mut Vec<T>, options: &[SelectOption]) -> OrmResult<()>
    where
        T: RowElement,
        T::Entity: Default,
    {
        let desc = self.describe_for_read::<T::Entity>()?;
        let stmt = builder::select_statement(&desc, options)?;
        let mut rows = self.query("select", &desc.table, stmt).await?;

        let fields = match resolve_columns(&desc, rows.column_names()) {
            Ok(fields) => fields,
            Err(e) => {
                rows.close();
                return Err(e);
            }
        };

        let collected = collect_rows::<T, _>(&mut rows, &fields);
        rows.close();

        *dst = collected?;
        Ok(())
    }

    /// Collect every row matching `options` into a new vector.
    pub async fn select_all<T>(&self, options: &[SelectOption]) -> OrmResult<Vec<T>>
    where
        T: RowElement,
        T::Entity: Default,
    {
        let mut out = Vec::new();
        self.select(&mut out, options).await?;
        Ok(out)
    }

    /// `SELECT COUNT(<function>)` over `E`'s table, filtered by the WHERE
    /// options. `probe` only selects the entity type.
    pub async fn count<E: Entity>(
        &self,
        function: &str,
        _probe: &E,
        options: &[SelectOption],
    ) -> OrmResult<i64> {
        self.count_of::<E>(function, options).await
    }

    /// [`Mapper::count`] without a probe record.
    pub async fn count_of<E: Entity>(
        &self,
        function: &str,
        options: &[SelectOption],
    ) -> OrmResult<i64> {
        let desc = self.describe_for_read::<E>()?;
        let stmt = builder::count_statement(&desc, function, options)?;
        let mut rows = self.query("count", &desc.table, stmt).await?;

        if !rows.next() {
            rows.close();
            return Err(OrmError::not_found("COUNT returned no rows"));
        }
        let raw = rows.scan();
        rows.close();

        let value = raw?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::scan("cnt", "COUNT returned no columns"))?;
        match value.coerce(ValueKind::Int, "cnt")? {
            Value::Int(n) => Ok(n),
            other => Err(OrmError::scan("cnt", format!("unexpected {}", other.type_name()))),
        }
    }
}

// Decode every remaining row; the caller closes the cursor either way.
fn collect_rows<T, R>(rows: &mut R, fields: &[FieldDescriptor]) -> OrmResult<Vec<T>>
where
    T: RowElement,
    T::Entity: Default,
    R: RowCursor,
{
    let mut out = Vec::new();
    while rows.next() {
        let raw = check_width(rows.scan()?, fields.len())?;
        let mut entity = T::Entity::default();
        for (field, value) in fields.iter().zip(raw) {
            entity.set_field(field.index, value)?;
        }
        out.push(T::from_entity(entity));
    }
    Ok(out)
}

/// Map each result column to a field, reporting every column that has no
/// matching field.
fn resolve_columns(desc: &EntityDescriptor, columns: &[String]) -> OrmResult<Vec<FieldDescriptor>> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut missing = Vec::new();
    for column in columns {
        match desc.field_by_column(column) {
            Some(field) => fields.push(field.clone()),
            None => missing.push(column.clone()),
        }
    }
    if missing.is_empty() {
        Ok(fields)
    } else {
        Err(OrmError::MissingColumn {
            table: desc.table.clone(),
            columns: missing,
        })
    }
}

fn check_width(raw: Vec<Value>, expected: usize) -> OrmResult<Vec<Value>> {
    if raw.len() == expected {
        Ok(raw)
    } else {
        Err(OrmError::scan(
            "*",
            format!("row has {} values for {expected} columns", raw.len()),
        ))
    }
}
