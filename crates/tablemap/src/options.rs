//! Select options: WHERE / IN / AND / ORDER / LIMIT / OFFSET.
//!
//! Every option renders its SQL fragment together with the parameters that
//! belong to it (see [`Fragment`]), so placeholder order in the final query
//! always matches the parameter list.
//!
//! # Example
//!
//! ```ignore
//! use tablemap::options::{and, in_list, limit, order, where_, Direction};
//! use tablemap::params;
//!
//! let opts = [
//!     and([where_("age = ?", params![20]), in_list("id", params![1, 2, 3])]),
//!     order("created_at", Direction::Desc),
//!     limit(10),
//! ];
//! let clauses = tablemap::options::build_clauses(&opts)?;
//! assert_eq!(
//!     clauses.sql,
//!     " WHERE age = ? AND id IN (?, ?, ?) ORDER BY `created_at` DESC LIMIT ?"
//! );
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Build a `Vec<Value>` from heterogeneous arguments.
///
/// ```ignore
/// let args = tablemap::params![1, "f", true];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

/// Discriminating tag of an option. Ordering follows clause order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKind {
    Where,
    Order,
    /// Reserved; no option produces it and the assembler emits nothing for it.
    Group,
    Limit,
    Offset,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Where => "where",
            OptionKind::Order => "order",
            OptionKind::Group => "group",
            OptionKind::Limit => "limit",
            OptionKind::Offset => "offset",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for [`order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A rendered SQL fragment and the parameters its placeholders consume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Append another fragment's text and parameters in one step.
    pub fn append(&mut self, other: Fragment) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.params.is_empty()
    }
}

/// Raw condition template; the caller owns the placeholder syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    template: String,
    args: Vec<Value>,
}

/// `<column> IN (?, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct In {
    column: String,
    args: Vec<Value>,
}

impl In {
    fn conditions(&self) -> String {
        let placeholders = vec!["?"; self.args.len()].join(", ");
        format!("{} IN ({placeholders})", self.column)
    }
}

/// Conjunction of WHERE-kind options.
#[derive(Debug, Clone)]
pub struct And {
    options: Vec<SelectOption>,
    // Sub-option positions grouped by kind, computed on first use.
    grouped: OnceLock<BTreeMap<OptionKind, Vec<usize>>>,
}

impl And {
    fn grouped(&self) -> &BTreeMap<OptionKind, Vec<usize>> {
        self.grouped.get_or_init(|| {
            let mut map: BTreeMap<OptionKind, Vec<usize>> = BTreeMap::new();
            for (i, option) in self.options.iter().enumerate() {
                map.entry(option.kind()).or_default().push(i);
            }
            map
        })
    }

    fn render(&self) -> OrmResult<Fragment> {
        if self.options.is_empty() {
            return Err(OrmError::Other(
                "and() requires at least one WHERE condition".to_string(),
            ));
        }
        let grouped = self.grouped();
        if let Some(kind) = grouped.keys().find(|k| **k != OptionKind::Where) {
            return Err(OrmError::MismatchedOptionKind {
                expected: OptionKind::Where.as_str(),
                found: kind.as_str(),
            });
        }

        let mut parts = Vec::new();
        let mut params = Vec::new();
        for i in grouped.get(&OptionKind::Where).into_iter().flatten() {
            let fragment = self.options[*i].render()?;
            parts.push(fragment.sql);
            params.extend(fragment.params);
        }
        Ok(Fragment::new(parts.join(" AND "), params))
    }
}

/// `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    column: String,
    direction: Direction,
}

impl Order {
    fn term(&self) -> String {
        format!("`{}` {}", self.column, self.direction.as_sql())
    }
}

/// A single select option.
#[derive(Debug, Clone)]
pub enum SelectOption {
    Where(Where),
    In(In),
    And(And),
    Order(Order),
    Limit(u64),
    Offset(u64),
}

impl SelectOption {
    pub fn kind(&self) -> OptionKind {
        match self {
            SelectOption::Where(_) | SelectOption::In(_) | SelectOption::And(_) => {
                OptionKind::Where
            }
            SelectOption::Order(_) => OptionKind::Order,
            SelectOption::Limit(_) => OptionKind::Limit,
            SelectOption::Offset(_) => OptionKind::Offset,
        }
    }

    /// Render the fragment and its parameters together.
    pub fn render(&self) -> OrmResult<Fragment> {
        match self {
            SelectOption::Where(w) => Ok(Fragment::new(w.template.clone(), w.args.clone())),
            SelectOption::In(i) => {
                if i.args.is_empty() {
                    tracing::warn!(
                        target: "tablemap.sql",
                        column = %i.column,
                        "IN option without arguments renders an empty list"
                    );
                }
                Ok(Fragment::new(i.conditions(), i.args.clone()))
            }
            SelectOption::And(a) => a.render(),
            SelectOption::Order(o) => Ok(Fragment::new(format!(" ORDER BY {}", o.term()), vec![])),
            SelectOption::Limit(n) => Ok(Fragment::new(" LIMIT ?", vec![Value::UInt(*n)])),
            SelectOption::Offset(n) => Ok(Fragment::new(" OFFSET ?", vec![Value::UInt(*n)])),
        }
    }

    /// Rendered SQL text.
    pub fn conditions(&self) -> OrmResult<String> {
        self.render().map(|f| f.sql)
    }

    /// Bound parameters, in placeholder order.
    pub fn params(&self) -> OrmResult<Vec<Value>> {
        self.render().map(|f| f.params)
    }
}

/// Raw WHERE condition, e.g. `where_("age >= ?", params![18])`.
pub fn where_(
    template: impl Into<String>,
    args: impl IntoIterator<Item = impl Into<Value>>,
) -> SelectOption {
    SelectOption::Where(Where {
        template: template.into(),
        args: args.into_iter().map(Into::into).collect(),
    })
}

/// `<column> IN (...)` with one placeholder per argument.
pub fn in_list(
    column: impl Into<String>,
    args: impl IntoIterator<Item = impl Into<Value>>,
) -> SelectOption {
    SelectOption::In(In {
        column: column.into(),
        args: args.into_iter().map(Into::into).collect(),
    })
}

/// Join WHERE-kind options with `AND`.
pub fn and(options: impl IntoIterator<Item = SelectOption>) -> SelectOption {
    SelectOption::And(And {
        options: options.into_iter().collect(),
        grouped: OnceLock::new(),
    })
}

pub fn order(column: impl Into<String>, direction: Direction) -> SelectOption {
    SelectOption::Order(Order {
        column: column.into(),
        direction,
    })
}

pub fn limit(count: u64) -> SelectOption {
    SelectOption::Limit(count)
}

pub fn offset(count: u64) -> SelectOption {
    SelectOption::Offset(count)
}

/// Extract the row count from a LIMIT option.
///
/// A caller-side helper for code that inspects option lists; clause
/// assembly renders LIMIT options directly.
pub fn expect_limit(option: &SelectOption) -> OrmResult<u64> {
    match option {
        SelectOption::Limit(n) => Ok(*n),
        other => Err(OrmError::MismatchedOptionKind {
            expected: OptionKind::Limit.as_str(),
            found: other.kind().as_str(),
        }),
    }
}

/// Options grouped by kind, insertion order preserved within a kind.
#[derive(Debug, Default)]
pub struct OptionMap<'a> {
    entries: BTreeMap<OptionKind, Vec<&'a SelectOption>>,
}

impl<'a> OptionMap<'a> {
    /// Kinds the clause assembler has a segment for.
    const ASSEMBLED: [OptionKind; 4] = [
        OptionKind::Where,
        OptionKind::Order,
        OptionKind::Limit,
        OptionKind::Offset,
    ];

    pub fn new(options: &'a [SelectOption]) -> Self {
        let mut entries: BTreeMap<OptionKind, Vec<&'a SelectOption>> = BTreeMap::new();
        for option in options {
            let kind = option.kind();
            if Self::ASSEMBLED.contains(&kind) {
                entries.entry(kind).or_default().push(option);
            }
        }
        Self { entries }
    }

    pub fn get(&self, kind: OptionKind) -> &[&'a SelectOption] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: OptionKind) -> bool {
        !self.get(kind).is_empty()
    }
}

/// Render only the WHERE segment.
pub fn where_clause(options: &[SelectOption]) -> OrmResult<Fragment> {
    where_segment(&OptionMap::new(options))
}

// Top-level WHERE-kind options are concatenated without a separator;
// conjunction is spelled with `and(...)`.
fn where_segment(map: &OptionMap<'_>) -> OrmResult<Fragment> {
    let mut out = Fragment::default();
    if !map.contains(OptionKind::Where) {
        return Ok(out);
    }
    out.sql.push_str(" WHERE ");
    for option in map.get(OptionKind::Where) {
        out.append(option.render()?);
    }
    Ok(out)
}

fn order_segment(map: &OptionMap<'_>) -> Fragment {
    let terms: Vec<String> = map
        .get(OptionKind::Order)
        .iter()
        .filter_map(|option| match option {
            SelectOption::Order(o) => Some(o.term()),
            _ => None,
        })
        .collect();
    if terms.is_empty() {
        Fragment::default()
    } else {
        Fragment::new(format!(" ORDER BY {}", terms.join(", ")), vec![])
    }
}

fn last_of(map: &OptionMap<'_>, kind: OptionKind) -> OrmResult<Fragment> {
    match map.get(kind).last() {
        Some(option) => option.render(),
        None => Ok(Fragment::default()),
    }
}

/// Assemble WHERE, ORDER, GROUP (reserved), LIMIT and OFFSET segments.
///
/// Several ORDER options merge into one clause; for LIMIT and OFFSET the
/// last option wins.
pub fn build_clauses(options: &[SelectOption]) -> OrmResult<Fragment> {
    let map = OptionMap::new(options);
    let mut out = where_segment(&map)?;
    out.append(order_segment(&map));
    out.append(last_of(&map, OptionKind::Limit)?);
    out.append(last_of(&map, OptionKind::Offset)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn in_renders_one_placeholder_per_arg() {
        let opt = in_list("id", params![1, 2]);
        assert_eq!(opt.conditions().unwrap(), "id IN (?, ?)");
        assert_eq!(opt.params().unwrap(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn in_without_args_renders_empty_list() {
        let opt = in_list("id", params![]);
        assert_eq!(opt.conditions().unwrap(), "id IN ()");
        assert!(opt.params().unwrap().is_empty());
    }

    #[test]
    fn where_template_is_verbatim() {
        let opt = where_("name LIKE ?", ["%abc%"]);
        assert_eq!(opt.kind(), OptionKind::Where);
        assert_eq!(opt.conditions().unwrap(), "name LIKE ?");
        assert_eq!(opt.params().unwrap(), vec![Value::Text("%abc%".into())]);
    }

    #[test]
    fn empty_and_is_rejected() {
        let err = and([]).conditions().unwrap_err();
        assert!(matches!(err, OrmError::Other(_)));

        let err = build_clauses(&[and([]), limit(1)]).unwrap_err();
        assert!(matches!(err, OrmError::Other(_)));
    }

    #[test]
    fn and_joins_where_options() {
        let opt = and([where_("age = ?", [1]), where_("gender = ?", ["f"])]);
        assert_eq!(opt.conditions().unwrap(), "age = ? AND gender = ?");
        assert_eq!(opt.params().unwrap(), params![1, "f"]);
    }

    #[test]
    fn and_with_in() {
        let opt = and([
            where_("age = ?", [1]),
            where_("gender = ?", ["f"]),
            in_list("id", [1, 2, 3]),
        ]);
        assert_eq!(
            opt.conditions().unwrap(),
            "age = ? AND gender = ? AND id IN (?, ?, ?)"
        );
        assert_eq!(opt.params().unwrap(), params![1, "f", 1, 2, 3]);
    }

    #[test]
    fn and_rejects_non_where_options() {
        let opt = and([where_("age = ?", [1]), limit(3)]);
        let err = opt.render().unwrap_err();
        assert!(matches!(
            err,
            OrmError::MismatchedOptionKind {
                expected: "where",
                found: "limit"
            }
        ));
    }

    #[test]
    fn and_memoizes_grouping() {
        let opt = and([where_("a = ?", [1]), where_("b = ?", [2])]);
        let SelectOption::And(inner) = &opt else {
            panic!("expected And");
        };
        let first = inner.grouped() as *const _;
        assert_eq!(opt.conditions().unwrap(), opt.conditions().unwrap());
        assert_eq!(first, inner.grouped() as *const _);
    }

    #[test]
    fn nested_and_is_where_kind() {
        let opt = and([and([where_("a = ?", [1]), where_("b = ?", [2])]), where_("c = ?", [3])]);
        assert_eq!(opt.conditions().unwrap(), "a = ? AND b = ? AND c = ?");
    }

    #[test]
    fn order_limit_offset_fragments() {
        assert_eq!(
            order("created_at", Direction::Desc).conditions().unwrap(),
            " ORDER BY `created_at` DESC"
        );
        assert!(order("id", Direction::Asc).params().unwrap().is_empty());
        assert_eq!(limit(5).render().unwrap(), Fragment::new(" LIMIT ?", params![5u64]));
        assert_eq!(offset(10).render().unwrap(), Fragment::new(" OFFSET ?", params![10u64]));
    }

    #[test]
    fn clauses_follow_fixed_segment_order() {
        let opts = [
            offset(20),
            limit(10),
            order("id", Direction::Asc),
            where_("age > ?", [18]),
        ];
        let clauses = build_clauses(&opts).unwrap();
        assert_eq!(clauses.sql, " WHERE age > ? ORDER BY `id` ASC LIMIT ? OFFSET ?");
        assert_eq!(clauses.params, params![18, 10u64, 20u64]);
    }

    #[test]
    fn no_where_options_means_no_where_keyword() {
        let clauses = build_clauses(&[limit(1)]).unwrap();
        assert_eq!(clauses.sql, " LIMIT ?");
        assert!(build_clauses(&[]).unwrap().is_empty());
    }

    #[test]
    fn top_level_predicates_concatenate_flat() {
        let opts = [where_("a = ?", [1]), where_(" OR b = ?", [2])];
        let clauses = build_clauses(&opts).unwrap();
        assert_eq!(clauses.sql, " WHERE a = ? OR b = ?");
        assert_eq!(clauses.params, params![1, 2]);
    }

    #[test]
    fn multiple_orders_merge_and_last_limit_wins() {
        let opts = [
            order("name", Direction::Asc),
            limit(1),
            order("id", Direction::Desc),
            limit(50),
        ];
        let clauses = build_clauses(&opts).unwrap();
        assert_eq!(clauses.sql, " ORDER BY `name` ASC, `id` DESC LIMIT ?");
        assert_eq!(clauses.params, params![50u64]);
    }

    #[test]
    fn option_map_preserves_insertion_order() {
        let opts = [where_("a", params![]), limit(1), where_("b", params![])];
        let map = OptionMap::new(&opts);
        let wheres: Vec<String> = map
            .get(OptionKind::Where)
            .iter()
            .map(|o| o.conditions().unwrap())
            .collect();
        assert_eq!(wheres, ["a", "b"]);
        assert!(!map.contains(OptionKind::Group));
    }

    #[test]
    fn expect_limit_checks_kind() {
        assert_eq!(expect_limit(&limit(7)).unwrap(), 7);
        assert!(matches!(
            expect_limit(&offset(7)),
            Err(OrmError::MismatchedOptionKind {
                expected: "limit",
                found: "offset"
            })
        ));
    }

    #[test]
    fn where_clause_ignores_pagination() {
        let opts = [in_list("id", [4, 5]), limit(2)];
        let clause = where_clause(&opts).unwrap();
        assert_eq!(clause.sql, " WHERE id IN (?, ?)");
        assert_eq!(clause.params, params![4, 5]);
    }
}
