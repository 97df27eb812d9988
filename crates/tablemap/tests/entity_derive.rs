#![allow(dead_code)]

use chrono::NaiveDateTime;
use tablemap::{
    Entity, EntityDescriptor, FieldKind, OrmError, PrimaryKeyPolicy, Value, ValueKind, describe,
    describe_with_policy,
};

#[derive(Debug, Default, Entity)]
struct FooBarHoge {
    #[orm(id)]
    record_id: i32,
    #[orm(column = "title_text")]
    title: String,
    score: f64,
    #[orm(skip)]
    scratch: Vec<u8>,
    seen_at: NaiveDateTime,
}

#[derive(Debug, Default, Entity)]
#[orm(table = "accounts")]
struct Account {
    #[orm(pk)]
    id: u64,
    owner: String,
}

#[derive(Debug, Default, Entity)]
struct Pair {
    #[orm(pk)]
    left: i64,
    #[orm(pk)]
    right: i64,
    label: String,
}

#[derive(Debug, Default, Entity)]
struct Nullable {
    #[orm(pk)]
    id: i64,
    nickname: Option<String>,
}

#[derive(Debug, Default, Entity)]
struct Document {
    #[orm(pk)]
    id: i64,
    body: serde_json::Value,
}

#[test]
fn derived_field_table_skips_marked_fields() {
    let fields = FooBarHoge::fields();
    let names: Vec<_> = fields.iter().map(|f| f.name).collect();
    assert_eq!(names, ["record_id", "title", "score", "seen_at"]);
    assert!(fields[0].primary_key);
    assert_eq!(fields[1].column, Some("title_text"));
    assert_eq!(fields[2].kind, FieldKind::Scalar(ValueKind::Float));
    assert_eq!(fields[3].kind, FieldKind::Scalar(ValueKind::Timestamp));
    assert_eq!(FooBarHoge::TABLE, None);
}

#[test]
fn descriptor_uses_naming_conventions() {
    let desc = describe::<FooBarHoge>().unwrap();
    assert_eq!(desc.entity, "FooBarHoge");
    assert_eq!(desc.table, "foo_bar_hoge");
    assert_eq!(desc.column_list(false), "record_id,title_text,score,seen_at");
    assert_eq!(desc.column_list(true), "title_text,score,seen_at");
    assert_eq!(desc.placeholders(true), "?,?,?");

    let pk = desc.require_primary_key().unwrap();
    assert_eq!(pk.column, "record_id");
    assert_eq!(pk.index, 0);
}

#[test]
fn table_override_wins() {
    let desc = describe::<Account>().unwrap();
    assert_eq!(Account::TABLE, Some("accounts"));
    assert_eq!(desc.table, "accounts");
}

#[test]
fn descriptors_are_cached_per_type() {
    let a = describe::<Account>().unwrap();
    let b = describe::<Account>().unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn field_accessors_round_trip_by_index() {
    let mut account = Account {
        id: 9,
        owner: "ops".into(),
    };
    assert_eq!(account.field_value(0).unwrap(), Value::UInt(9));
    assert_eq!(account.field_value(1).unwrap(), Value::Text("ops".into()));
    assert!(account.field_value(2).is_err());

    account.set_field(1, Value::Text("infra".into())).unwrap();
    account.set_field(0, Value::Int(10)).unwrap();
    assert_eq!(account.owner, "infra");
    assert_eq!(account.id, 10);

    let err = account.set_field(0, Value::Int(-1)).unwrap_err();
    assert!(matches!(err, OrmError::Scan { ref column, .. } if column == "id"));
}

#[test]
fn skipped_fields_keep_their_default() {
    let mut row = FooBarHoge {
        scratch: vec![1, 2, 3],
        ..FooBarHoge::default()
    };
    row.set_field(1, Value::Text("hello".into())).unwrap();
    assert_eq!(row.title, "hello");
    assert_eq!(row.scratch, vec![1, 2, 3]);
}

#[test]
fn several_keys_are_rejected_by_default() {
    let err = describe::<Pair>().unwrap_err();
    match err {
        OrmError::AmbiguousPrimaryKey { entity, fields } => {
            assert_eq!(entity, "Pair");
            assert_eq!(fields, vec!["left", "right"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn legacy_policy_takes_the_last_key() {
    let desc = describe_with_policy::<Pair>(PrimaryKeyPolicy::LastWins).unwrap();
    assert_eq!(desc.require_primary_key().unwrap().column, "right");
    assert_eq!(desc.column_list(true), "left,label");
}

#[test]
fn unsupported_kinds_fail_description() {
    let err = describe::<Nullable>().unwrap_err();
    assert!(err.is_unsupported_field_kind());
    assert!(err.to_string().contains("Nullable.nickname"));

    let row = Nullable {
        id: 1,
        nickname: Some("nick".into()),
    };
    let err = row.field_value(1).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported field kind on Nullable.nickname: Option<_>"
    );

    let err = EntityDescriptor::build::<Document>(PrimaryKeyPolicy::Reject).unwrap_err();
    assert!(matches!(
        err,
        OrmError::UnsupportedFieldKind { ref field, .. } if field == "body"
    ));
}
