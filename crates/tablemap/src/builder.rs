//! Statement text generation from entity descriptors.
//!
//! Each builder returns a [`Fragment`] holding the full SQL and the values
//! for its `?` placeholders, in order. Nothing here touches the executor.

use crate::entity::{Entity, EntityDescriptor};
use crate::error::OrmResult;
use crate::options::{Fragment, SelectOption, build_clauses, where_clause};

/// `INSERT INTO <table>(<cols>) VALUES(<?,..>)`; the primary key is left to
/// the database.
pub fn insert_statement<E: Entity>(desc: &EntityDescriptor, record: &E) -> OrmResult<Fragment> {
    let params = desc.values(record, true)?;
    let sql = format!(
        "INSERT INTO {}({}) VALUES({})",
        desc.table,
        desc.column_list(true),
        desc.placeholders(true)
    );
    Ok(Fragment::new(sql, params))
}

/// `UPDATE <table> SET <col>=?,.. WHERE <pk>=?`; the pk value binds last.
pub fn update_statement<E: Entity>(desc: &EntityDescriptor, record: &E) -> OrmResult<Fragment> {
    let pk = desc.require_primary_key()?;
    let assignments: Vec<String> = desc
        .column_names(true)
        .into_iter()
        .map(|c| format!("{c}=?"))
        .collect();

    let mut params = desc.values(record, true)?;
    params.push(desc.primary_key_value(record)?);

    let sql = format!(
        "UPDATE {} SET {} WHERE {}=?",
        desc.table,
        assignments.join(","),
        pk.column
    );
    Ok(Fragment::new(sql, params))
}

/// `SELECT * FROM <table> WHERE <pk>=?` bound with the record's current key.
pub fn select_one_statement<E: Entity>(
    desc: &EntityDescriptor,
    record: &E,
) -> OrmResult<Fragment> {
    let pk = desc.require_primary_key()?;
    let sql = format!("SELECT * FROM {} WHERE {}=?", desc.table, pk.column);
    Ok(Fragment::new(sql, vec![desc.primary_key_value(record)?]))
}

/// `SELECT * FROM <table>` followed by the assembled option clauses.
pub fn select_statement(desc: &EntityDescriptor, options: &[SelectOption]) -> OrmResult<Fragment> {
    let mut out = Fragment::new(format!("SELECT * FROM {}", desc.table), Vec::new());
    out.append(build_clauses(options)?);
    Ok(out)
}

/// `SELECT COUNT(<function>) AS cnt FROM <table>` plus the WHERE segment.
pub fn count_statement(
    desc: &EntityDescriptor,
    function: &str,
    options: &[SelectOption],
) -> OrmResult<Fragment> {
    let mut out = Fragment::new(
        format!("SELECT COUNT({function}) AS cnt FROM {}", desc.table),
        Vec::new(),
    );
    out.append(where_clause(options)?);
    Ok(out)
}
