//! Entity metadata: the per-type field table and the descriptor built from it.
//!
//! `#[derive(Entity)]` generates a static [`FieldDef`] table plus positional
//! accessors. [`describe`] turns that table into an [`EntityDescriptor`]
//! (table name, ordered columns, primary key) and memoizes the result per
//! type and primary-key policy.
//!
//! # Example
//!
//! ```ignore
//! use tablemap::Entity;
//!
//! #[derive(Debug, Default, Entity)]
//! struct UserProfile {
//!     #[orm(pk)]
//!     id: u64,
//!     display_name: String,
//! }
//!
//! let desc = tablemap::describe::<UserProfile>()?;
//! assert_eq!(desc.table, "user_profile");
//! assert_eq!(desc.column_list(true), "display_name");
//! ```

use crate::config::PrimaryKeyPolicy;
use crate::error::{OrmError, OrmResult};
use crate::naming::{column_name_for, table_name_for};
use crate::value::{FieldKind, Value, ValueKind};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Static description of one declared field, as generated by the derive.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Rust field name.
    pub name: &'static str,
    /// Explicit `#[orm(column = "...")]` override.
    pub column: Option<&'static str>,
    /// Whether the field carries `#[orm(pk)]`.
    pub primary_key: bool,
    pub kind: FieldKind,
}

/// A record type that maps to a table row.
///
/// Field indices used by the accessors are positions in [`Entity::fields`].
/// This trait is normally derived.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Explicit `#[orm(table = "...")]` override.
    const TABLE: Option<&'static str> = None;

    /// The type identifier the table name is derived from.
    fn type_identifier() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Declared fields in declaration order.
    fn fields() -> &'static [FieldDef];

    /// Read the field at `index` as a bindable value.
    fn field_value(&self, index: usize) -> OrmResult<Value>;

    /// Overwrite the field at `index` from a column value.
    fn set_field(&mut self, index: usize, value: Value) -> OrmResult<()>;
}

/// Primary-key identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub column: String,
    pub index: usize,
}

/// A mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub column: String,
    pub index: usize,
    pub kind: ValueKind,
}

/// Table metadata for one entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Bare type name, for error messages.
    pub entity: String,
    pub table: String,
    pub primary_key: Option<PrimaryKey>,
    pub fields: Vec<FieldDescriptor>,
    type_id: TypeId,
}

impl EntityDescriptor {
    /// Build a descriptor for `E` without consulting the cache.
    pub fn build<E: Entity>(policy: PrimaryKeyPolicy) -> OrmResult<Self> {
        let identifier = E::type_identifier();
        let entity = bare_type_name(identifier).to_string();
        let table = match E::TABLE {
            Some(table) => table.to_string(),
            None => table_name_for(identifier),
        };

        let defs = E::fields();
        let mut fields = Vec::with_capacity(defs.len());
        let mut tagged = Vec::new();

        for (index, def) in defs.iter().enumerate() {
            let kind = match def.kind {
                FieldKind::Scalar(kind) => kind,
                FieldKind::Unsupported(type_name) => {
                    return Err(OrmError::UnsupportedFieldKind {
                        entity,
                        field: def.name.to_string(),
                        type_name: type_name.to_string(),
                    });
                }
            };
            let column = match def.column {
                Some(column) => column.to_string(),
                None => column_name_for(def.name),
            };
            if def.primary_key {
                tagged.push(index);
            }
            fields.push(FieldDescriptor {
                name: def.name,
                column,
                index,
                kind,
            });
        }

        let pk_index = match (tagged.as_slice(), policy) {
            ([], _) => None,
            ([only], _) => Some(*only),
            (many, PrimaryKeyPolicy::Reject) => {
                return Err(OrmError::AmbiguousPrimaryKey {
                    entity,
                    fields: many.iter().map(|i| defs[*i].name.to_string()).collect(),
                });
            }
            (many, PrimaryKeyPolicy::LastWins) => many.last().copied(),
        };
        let primary_key = pk_index.map(|index| PrimaryKey {
            column: fields[index].column.clone(),
            index,
        });

        Ok(Self {
            entity,
            table,
            primary_key,
            fields,
            type_id: TypeId::of::<E>(),
        })
    }

    /// The primary key, or `NoPrimaryKey` when none is declared.
    pub fn require_primary_key(&self) -> OrmResult<&PrimaryKey> {
        self.primary_key
            .as_ref()
            .ok_or_else(|| OrmError::NoPrimaryKey(self.entity.clone()))
    }

    fn is_pk(&self, index: usize) -> bool {
        self.primary_key.as_ref().is_some_and(|pk| pk.index == index)
    }

    fn mapped(&self, exclude_pk: bool) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(move |f| !(exclude_pk && self.is_pk(f.index)))
    }

    /// Column names in declaration order.
    pub fn column_names(&self, exclude_pk: bool) -> Vec<&str> {
        self.mapped(exclude_pk).map(|f| f.column.as_str()).collect()
    }

    /// Comma-separated column names, e.g. `name,profile,created_at`.
    pub fn column_list(&self, exclude_pk: bool) -> String {
        self.column_names(exclude_pk).join(",")
    }

    /// One `?` per column, comma-separated.
    pub fn placeholders(&self, exclude_pk: bool) -> String {
        vec!["?"; self.mapped(exclude_pk).count()].join(",")
    }

    /// Bound values of `record` in column order.
    pub fn values<E: Entity>(&self, record: &E, exclude_pk: bool) -> OrmResult<Vec<Value>> {
        self.check_type::<E>()?;
        self.mapped(exclude_pk)
            .map(|f| record.field_value(f.index))
            .collect()
    }

    /// Current primary-key value of `record`.
    pub fn primary_key_value<E: Entity>(&self, record: &E) -> OrmResult<Value> {
        self.check_type::<E>()?;
        let pk = self.require_primary_key()?;
        record.field_value(pk.index)
    }

    /// Resolve a result column to a field, ignoring ASCII case.
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.column.eq_ignore_ascii_case(column))
    }

    fn check_type<E: Entity>(&self) -> OrmResult<()> {
        if self.type_id == TypeId::of::<E>() {
            Ok(())
        } else {
            Err(OrmError::Other(format!(
                "descriptor for {} used with {}",
                self.entity,
                bare_type_name(E::type_identifier())
            )))
        }
    }
}

fn bare_type_name(identifier: &str) -> &str {
    let base = identifier.split('<').next().unwrap_or(identifier);
    base.rsplit("::").next().unwrap_or(base)
}

type DescriptorCache = RwLock<HashMap<(TypeId, PrimaryKeyPolicy), Arc<EntityDescriptor>>>;

fn cache() -> &'static DescriptorCache {
    static CACHE: OnceLock<DescriptorCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Describe `E` under the default primary-key policy.
pub fn describe<E: Entity>() -> OrmResult<Arc<EntityDescriptor>> {
    describe_with_policy::<E>(PrimaryKeyPolicy::default())
}

/// Describe `E`, memoizing successful results per type and policy.
///
/// Failures are not cached; every call for a broken type re-derives and
/// reports the same error.
pub fn describe_with_policy<E: Entity>(
    policy: PrimaryKeyPolicy,
) -> OrmResult<Arc<EntityDescriptor>> {
    let key = (TypeId::of::<E>(), policy);

    if let Some(found) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(found));
    }

    let built = Arc::new(EntityDescriptor::build::<E>(policy)?);
    tracing::trace!(
        target: "tablemap.entity",
        entity = %built.entity,
        table = %built.table,
        columns = built.fields.len(),
        "described entity"
    );

    let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(map.entry(key).or_insert(built)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlField;

    // Hand-written impls mirror what the derive generates.
    #[derive(Debug, Default)]
    struct AuditEntry {
        id: i64,
        actor: String,
        archived: bool,
    }

    impl Entity for AuditEntry {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef {
                    name: "id",
                    column: None,
                    primary_key: true,
                    kind: <i64 as SqlField>::KIND,
                },
                FieldDef {
                    name: "actor",
                    column: Some("actor_name"),
                    primary_key: false,
                    kind: <String as SqlField>::KIND,
                },
                FieldDef {
                    name: "archived",
                    column: None,
                    primary_key: false,
                    kind: <bool as SqlField>::KIND,
                },
            ];
            FIELDS
        }

        fn field_value(&self, index: usize) -> OrmResult<Value> {
            match index {
                0 => self.id.to_param(),
                1 => self.actor.to_param(),
                2 => self.archived.to_param(),
                _ => Err(OrmError::Other(format!("no field {index}"))),
            }
        }

        fn set_field(&mut self, index: usize, value: Value) -> OrmResult<()> {
            match index {
                0 => self.id = SqlField::from_column(value, "id")?,
                1 => self.actor = SqlField::from_column(value, "actor_name")?,
                2 => self.archived = SqlField::from_column(value, "archived")?,
                _ => return Err(OrmError::Other(format!("no field {index}"))),
            }
            Ok(())
        }
    }

    struct TwoKeys;

    impl Entity for TwoKeys {
        const TABLE: Option<&'static str> = Some("pairs");

        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef {
                    name: "left",
                    column: None,
                    primary_key: true,
                    kind: <u32 as SqlField>::KIND,
                },
                FieldDef {
                    name: "right",
                    column: None,
                    primary_key: true,
                    kind: <u32 as SqlField>::KIND,
                },
            ];
            FIELDS
        }

        fn field_value(&self, _index: usize) -> OrmResult<Value> {
            Ok(Value::UInt(0))
        }

        fn set_field(&mut self, _index: usize, _value: Value) -> OrmResult<()> {
            Ok(())
        }
    }

    #[test]
    fn describes_columns_and_pk() {
        let desc = describe::<AuditEntry>().unwrap();
        assert_eq!(desc.entity, "AuditEntry");
        assert_eq!(desc.table, "audit_entry");
        assert_eq!(desc.column_list(false), "id,actor_name,archived");
        assert_eq!(desc.column_list(true), "actor_name,archived");
        assert_eq!(desc.placeholders(true), "?,?");
        assert_eq!(
            desc.primary_key,
            Some(PrimaryKey {
                column: "id".to_string(),
                index: 0
            })
        );
    }

    #[test]
    fn values_follow_column_order() {
        let desc = describe::<AuditEntry>().unwrap();
        let entry = AuditEntry {
            id: 9,
            actor: "root".to_string(),
            archived: true,
        };
        assert_eq!(
            desc.values(&entry, true).unwrap(),
            vec![Value::Text("root".into()), Value::Int(1)]
        );
        assert_eq!(desc.primary_key_value(&entry).unwrap(), Value::Int(9));
    }

    #[test]
    fn field_lookup_ignores_case() {
        let desc = describe::<AuditEntry>().unwrap();
        assert_eq!(desc.field_by_column("ACTOR_NAME").unwrap().name, "actor");
        assert!(desc.field_by_column("actor").is_none());
    }

    #[test]
    fn ambiguous_pk_rejected_by_default() {
        let err = describe::<TwoKeys>().unwrap_err();
        assert!(matches!(
            err,
            OrmError::AmbiguousPrimaryKey { ref fields, .. } if fields == &["left", "right"]
        ));
    }

    #[test]
    fn ambiguous_pk_last_wins_under_legacy_policy() {
        let desc = describe_with_policy::<TwoKeys>(PrimaryKeyPolicy::LastWins).unwrap();
        assert_eq!(desc.table, "pairs");
        assert_eq!(desc.require_primary_key().unwrap().column, "right");
    }

    #[test]
    fn cached_and_uncached_agree() {
        let cached = describe::<AuditEntry>().unwrap();
        let again = describe::<AuditEntry>().unwrap();
        assert!(Arc::ptr_eq(&cached, &again));

        let fresh = EntityDescriptor::build::<AuditEntry>(PrimaryKeyPolicy::Reject).unwrap();
        assert_eq!(fresh.fields, cached.fields);
        assert_eq!(fresh.primary_key, cached.primary_key);

        assert!(describe::<TwoKeys>().is_err());
        assert!(describe::<TwoKeys>().is_err());
    }

    #[test]
    fn descriptor_rejects_foreign_records() {
        let desc = describe_with_policy::<TwoKeys>(PrimaryKeyPolicy::LastWins).unwrap();
        let entry = AuditEntry::default();
        assert!(desc.values(&entry, false).is_err());
    }
}
