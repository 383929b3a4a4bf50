//! Tests for sluice-rdbc values, records and SQL type tags

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sluice_rdbc::types::{Param, Record, SqlType, TypedValue, Value};

#[test]
fn test_value_null() {
    let v = Value::Null;
    assert!(v.is_null());
    assert_eq!(v.as_i64(), None);
    assert_eq!(v.to_string(), "NULL");
}

#[test]
fn test_value_integer_types() {
    assert_eq!(Value::Int8(42).as_i64(), Some(42));
    assert_eq!(Value::Int16(-100).as_i64(), Some(-100));
    assert_eq!(Value::Int32(1_000_000).as_i64(), Some(1_000_000));
    assert_eq!(
        Value::Int64(9_000_000_000_000).as_i64(),
        Some(9_000_000_000_000)
    );
}

#[test]
fn test_value_option_conversion() {
    let some: Value = Some("title").into();
    assert_eq!(some, Value::String("title".into()));

    let none: Value = Option::<i64>::None.into();
    assert!(none.is_null());
}

#[test]
fn test_value_serde() {
    let record: Record = vec![Value::Int32(1), Value::from("a"), Value::Null].into();
    let json = serde_json::to_string(&record).unwrap();
    let back: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_record_iteration_order() {
    let record: Record = (1..=3).map(Value::Int32).collect();
    let ids: Vec<i64> = record.iter().filter_map(Value::as_i64).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(!record.is_empty());
    assert!(Record::default().is_empty());
}

#[test]
fn test_sql_type_display() {
    assert_eq!(SqlType::LongNVarchar.to_string(), "LONGNVARCHAR");
    assert_eq!(SqlType::Other(2004).to_string(), "BLOB");
    assert_eq!(SqlType::Other(424242).to_string(), "type code 424242");
}

#[test]
fn test_sql_type_serde_accepts_names_and_codes() {
    let types: Vec<SqlType> = serde_json::from_str(r#"["varchar", 4, "SQLXML", -5]"#).unwrap();
    assert_eq!(
        types,
        vec![
            SqlType::Varchar,
            SqlType::Integer,
            SqlType::Other(2009),
            SqlType::BigInt
        ]
    );
    assert!(serde_json::from_str::<SqlType>(r#""VARCHAR2""#).is_err());
}

#[test]
fn test_typed_value_per_category() {
    let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
    let time = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
    let timestamp = date.and_time(time);

    let cases = vec![
        (SqlType::Boolean, Value::Bool(false), TypedValue::Boolean(false)),
        (SqlType::Char, Value::from("c"), TypedValue::String("c".into())),
        (SqlType::LongVarchar, Value::from("long"), TypedValue::String("long".into())),
        (SqlType::Integer, Value::Int32(5), TypedValue::Int(5)),
        (SqlType::Double, Value::Float64(0.25), TypedValue::Double(0.25)),
        (
            SqlType::Decimal,
            Value::Decimal(Decimal::new(105, 1)),
            TypedValue::Decimal(Decimal::new(105, 1)),
        ),
        (SqlType::Time, Value::Time(time), TypedValue::Time(time)),
        (
            SqlType::Timestamp,
            Value::DateTime(timestamp),
            TypedValue::Timestamp(timestamp),
        ),
        (SqlType::Binary, Value::Bytes(vec![0xff]), TypedValue::Bytes(vec![0xff])),
    ];

    for (tag, value, expected) in cases {
        let typed = TypedValue::from_value(tag, value.clone()).unwrap();
        assert_eq!(typed, expected, "{tag}");
        assert_eq!(typed.into_value(), value);
    }
}

#[test]
fn test_typed_value_is_strict() {
    // No widening: an int32 is not a BIGINT
    assert!(TypedValue::from_value(SqlType::BigInt, Value::Int32(1)).is_err());
    assert!(TypedValue::from_value(SqlType::Real, Value::Float64(1.0)).is_err());
    assert!(TypedValue::from_value(SqlType::Other(2003), Value::Int32(1)).is_err());
}

#[test]
fn test_param_is_null() {
    assert!(Param::Null(SqlType::Integer).is_null());
    assert!(Param::Object(Value::Null).is_null());
    assert!(!Param::Typed(SqlType::Integer, TypedValue::Int(0)).is_null());
}
