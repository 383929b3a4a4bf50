//! Value types for sluice-rdbc
//!
//! - [`Value`]: a nullable, dynamically typed field value
//! - [`Record`]: an ordered, fixed-arity tuple of values
//! - [`SqlType`]: the SQL type tag declared for a placeholder
//! - [`TypedValue`] / [`Param`]: what a driver receives for one placeholder

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// SQL value type that can hold any field of an incoming record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 8-bit signed integer (TINYINT)
    Int8(i8),
    /// 16-bit signed integer (SMALLINT)
    Int16(i16),
    /// 32-bit signed integer (INTEGER)
    Int32(i32),
    /// 64-bit signed integer (BIGINT)
    Int64(i64),
    /// 32-bit floating point (REAL)
    Float32(f32),
    /// 64-bit floating point (DOUBLE PRECISION)
    Float64(f64),
    /// Arbitrary precision decimal (NUMERIC, DECIMAL)
    Decimal(Decimal),
    /// Text string (VARCHAR, TEXT, CHAR)
    String(String),
    /// Binary data (BYTEA, BLOB, VARBINARY)
    Bytes(Vec<u8>),
    /// Date without time (DATE)
    Date(NaiveDate),
    /// Time without date (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    DateTime(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    DateTimeTz(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, used in diagnostics and mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::DateTimeTz(_) => "datetime_tz",
            Self::Uuid(_) => "uuid",
            Self::Json(_) => "json",
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(n) => Some(i64::from(*n)),
            Self::Int16(n) => Some(i64::from(*n)),
            Self::Int32(n) => Some(i64::from(*n)),
            Self::Int64(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int8(n) => write!(f, "{n}"),
            Self::Int16(n) => write!(f, "{n}"),
            Self::Int32(n) => write!(f, "{n}"),
            Self::Int64(n) => write!(f, "{n}"),
            Self::Float32(n) => write!(f, "{n}"),
            Self::Float64(n) => write!(f, "{n}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Date(d) => write!(f, "{d}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::DateTimeTz(dt) => write!(f, "{dt}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Json(j) => write!(f, "{j}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTimeTz(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Self::Null,
        }
    }
}

/// An ordered, fixed-arity tuple of field values produced upstream
///
/// Fields are addressed by position only; placeholder `n` (1-based) of the
/// insert statement receives field `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Create a record from its field values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of fields
    #[inline]
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field at a 0-based index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// All fields in order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterate over the fields in order
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Consume the record into its values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// SQL type tag declared for a placeholder
///
/// The recognized variants each select one typed bind. Anything else is
/// carried as [`SqlType::Other`] with its JDBC type code and is bound
/// generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SqlTypeRepr", into = "SqlTypeRepr")]
pub enum SqlType {
    /// NULL
    Null,
    /// BOOLEAN
    Boolean,
    /// BIT
    Bit,
    /// CHAR
    Char,
    /// NCHAR
    NChar,
    /// VARCHAR
    Varchar,
    /// LONGVARCHAR
    LongVarchar,
    /// LONGNVARCHAR
    LongNVarchar,
    /// TINYINT
    TinyInt,
    /// SMALLINT
    SmallInt,
    /// INTEGER
    Integer,
    /// BIGINT
    BigInt,
    /// REAL
    Real,
    /// FLOAT
    Float,
    /// DOUBLE
    Double,
    /// DECIMAL
    Decimal,
    /// NUMERIC
    Numeric,
    /// DATE
    Date,
    /// TIME
    Time,
    /// TIMESTAMP
    Timestamp,
    /// BINARY
    Binary,
    /// VARBINARY
    VarBinary,
    /// LONGVARBINARY
    LongVarBinary,
    /// Any other type code (ARRAY, BLOB, CLOB, OTHER, ...)
    ///
    /// Built directly, this may hold the code of a recognized tag; use
    /// [`SqlType::normalized`] before dispatching on it.
    Other(i32),
}

/// Name/code pairs for the recognized tags, in declaration order
const RECOGNIZED: &[(SqlType, &str, i32)] = &[
    (SqlType::Null, "NULL", 0),
    (SqlType::Boolean, "BOOLEAN", 16),
    (SqlType::Bit, "BIT", -7),
    (SqlType::Char, "CHAR", 1),
    (SqlType::NChar, "NCHAR", -15),
    (SqlType::Varchar, "VARCHAR", 12),
    (SqlType::LongVarchar, "LONGVARCHAR", -1),
    (SqlType::LongNVarchar, "LONGNVARCHAR", -16),
    (SqlType::TinyInt, "TINYINT", -6),
    (SqlType::SmallInt, "SMALLINT", 5),
    (SqlType::Integer, "INTEGER", 4),
    (SqlType::BigInt, "BIGINT", -5),
    (SqlType::Real, "REAL", 7),
    (SqlType::Float, "FLOAT", 6),
    (SqlType::Double, "DOUBLE", 8),
    (SqlType::Decimal, "DECIMAL", 3),
    (SqlType::Numeric, "NUMERIC", 2),
    (SqlType::Date, "DATE", 91),
    (SqlType::Time, "TIME", 92),
    (SqlType::Timestamp, "TIMESTAMP", 93),
    (SqlType::Binary, "BINARY", -2),
    (SqlType::VarBinary, "VARBINARY", -3),
    (SqlType::LongVarBinary, "LONGVARBINARY", -4),
];

/// Well-known type codes without a dedicated bind
const UNMANAGED: &[(&str, i32)] = &[
    ("NVARCHAR", SqlType::NVARCHAR),
    ("OTHER", SqlType::OTHER),
    ("JAVA_OBJECT", 2000),
    ("DISTINCT", 2001),
    ("STRUCT", 2002),
    ("ARRAY", 2003),
    ("BLOB", 2004),
    ("CLOB", 2005),
    ("REF", 2006),
    ("DATALINK", 70),
    ("ROWID", -8),
    ("NCLOB", 2011),
    ("SQLXML", 2009),
    ("TIMESTAMP_WITH_TIMEZONE", SqlType::TIMESTAMP_WITH_TIMEZONE),
];

impl SqlType {
    /// JDBC code for OTHER
    pub const OTHER: i32 = 1111;
    /// JDBC code for NVARCHAR
    pub const NVARCHAR: i32 = -9;
    /// JDBC code for TIMESTAMP_WITH_TIMEZONE
    pub const TIMESTAMP_WITH_TIMEZONE: i32 = 2014;

    /// Map a JDBC type code to a tag
    pub fn from_code(code: i32) -> Self {
        RECOGNIZED
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(t, _, _)| *t)
            .unwrap_or(Self::Other(code))
    }

    /// The recognized tag behind an `Other` code, or the tag itself
    pub fn normalized(self) -> Self {
        match self {
            Self::Other(code) => Self::from_code(code),
            tag => tag,
        }
    }

    /// The JDBC type code of this tag
    pub fn code(&self) -> i32 {
        match self {
            Self::Other(code) => *code,
            tag => RECOGNIZED
                .iter()
                .find(|(t, _, _)| t == tag)
                .map(|(_, _, c)| *c)
                .unwrap_or(Self::OTHER),
        }
    }

    /// Canonical upper-case name; `None` for codes nobody named
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Other(code) => UNMANAGED
                .iter()
                .find(|(_, c)| c == code)
                .map(|(n, _)| *n),
            tag => RECOGNIZED
                .iter()
                .find(|(t, _, _)| t == tag)
                .map(|(_, n, _)| *n),
        }
    }

    /// Whether this tag selects a dedicated typed bind
    #[inline]
    pub const fn is_managed(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "type code {}", self.code()),
        }
    }
}

impl FromStr for SqlType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if let Some((tag, _, _)) = RECOGNIZED
            .iter()
            .find(|(_, n, _)| n.eq_ignore_ascii_case(name))
        {
            return Ok(*tag);
        }
        if let Some((_, code)) = UNMANAGED.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Ok(Self::Other(*code));
        }
        name.parse::<i32>()
            .map(Self::from_code)
            .map_err(|_| Error::config(format!("unknown SQL type '{}'", name)))
    }
}

/// Serialized form of a tag: its name, or its numeric code
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SqlTypeRepr {
    Code(i32),
    Name(String),
}

impl TryFrom<SqlTypeRepr> for SqlType {
    type Error = Error;

    fn try_from(repr: SqlTypeRepr) -> Result<Self> {
        match repr {
            SqlTypeRepr::Code(code) => Ok(Self::from_code(code)),
            SqlTypeRepr::Name(name) => name.parse(),
        }
    }
}

impl From<SqlType> for SqlTypeRepr {
    fn from(tag: SqlType) -> Self {
        match tag.name() {
            Some(name) => Self::Name(name.to_string()),
            None => Self::Code(tag.code()),
        }
    }
}

/// A value already converted to the Rust type of its declared SQL tag
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TypedValue {
    Boolean(bool),
    String(String),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl TypedValue {
    /// Convert a non-null value for a managed tag
    ///
    /// Fails with a type conversion error when the value's variant is not
    /// the one the tag expects, or when the tag has no typed bind.
    pub fn from_value(sql_type: SqlType, value: Value) -> Result<Self> {
        let mismatch = |value: &Value| {
            Error::type_conversion(format!(
                "cannot bind {} value {} as {}",
                value.type_name(),
                value,
                sql_type
            ))
        };

        match (sql_type, value) {
            (SqlType::Boolean | SqlType::Bit, Value::Bool(b)) => Ok(Self::Boolean(b)),
            (
                SqlType::Char
                | SqlType::NChar
                | SqlType::Varchar
                | SqlType::LongVarchar
                | SqlType::LongNVarchar,
                Value::String(s),
            ) => Ok(Self::String(s)),
            (SqlType::TinyInt, Value::Int8(n)) => Ok(Self::Byte(n)),
            (SqlType::SmallInt, Value::Int16(n)) => Ok(Self::Short(n)),
            (SqlType::Integer, Value::Int32(n)) => Ok(Self::Int(n)),
            (SqlType::BigInt, Value::Int64(n)) => Ok(Self::Long(n)),
            (SqlType::Real, Value::Float32(n)) => Ok(Self::Float(n)),
            (SqlType::Float | SqlType::Double, Value::Float64(n)) => Ok(Self::Double(n)),
            (SqlType::Decimal | SqlType::Numeric, Value::Decimal(d)) => Ok(Self::Decimal(d)),
            (SqlType::Date, Value::Date(d)) => Ok(Self::Date(d)),
            (SqlType::Time, Value::Time(t)) => Ok(Self::Time(t)),
            (SqlType::Timestamp, Value::DateTime(dt)) => Ok(Self::Timestamp(dt)),
            (SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary, Value::Bytes(b)) => {
                Ok(Self::Bytes(b))
            }
            (SqlType::Null | SqlType::Other(_), _) => Err(Error::type_conversion(format!(
                "{} has no typed bind",
                sql_type
            ))),
            (_, value) => Err(mismatch(&value)),
        }
    }

    /// Convert back into the dynamically typed form
    pub fn into_value(self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(b),
            Self::String(s) => Value::String(s),
            Self::Byte(n) => Value::Int8(n),
            Self::Short(n) => Value::Int16(n),
            Self::Int(n) => Value::Int32(n),
            Self::Long(n) => Value::Int64(n),
            Self::Float(n) => Value::Float32(n),
            Self::Double(n) => Value::Float64(n),
            Self::Decimal(d) => Value::Decimal(d),
            Self::Date(d) => Value::Date(d),
            Self::Time(t) => Value::Time(t),
            Self::Timestamp(dt) => Value::DateTime(dt),
            Self::Bytes(b) => Value::Bytes(b),
        }
    }
}

/// One bound placeholder as handed to a driver
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// SQL NULL of a declared type
    Null(SqlType),
    /// A value converted for its declared type
    Typed(SqlType, TypedValue),
    /// A value bound without type information; the driver infers the type
    Object(Value),
}

impl Param {
    /// Whether this parameter binds a NULL (typed or not)
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_) | Self::Object(Value::Null))
    }
}
