//! Mapping of record fields onto statement parameters
//!
//! With declared column types every field is bound through the typed bind of
//! its tag, and NULLs carry the tag so the database sees a typed NULL. Tags
//! without a typed bind, and fields past the end of the declared types, fall
//! back to a generic bind the driver resolves on its own.

use sluice_rdbc::connection::PreparedStatement;
use sluice_rdbc::{Param, Record, SqlType, TypedValue, Value};
use tracing::warn;

use crate::error::WriteError;

/// Convert one field into the parameter bound at `position` (1-based)
pub fn to_param(position: usize, value: &Value, sql_type: Option<SqlType>) -> Result<Param, WriteError> {
    let Some(sql_type) = sql_type.map(SqlType::normalized) else {
        return Ok(Param::Object(value.clone()));
    };

    if value.is_null() {
        return Ok(Param::Null(sql_type));
    }

    match sql_type {
        SqlType::Null => Ok(Param::Null(SqlType::Null)),
        SqlType::Other(_) => {
            warn!(
                column = position,
                sql_type = %sql_type,
                value = %value,
                "Unmanaged SQL type, binding field without type information"
            );
            Ok(Param::Object(value.clone()))
        }
        _ => TypedValue::from_value(sql_type, value.clone())
            .map(|typed| Param::Typed(sql_type, typed))
            .map_err(|source| WriteError::BindTypeMismatch {
                position,
                expected: sql_type,
                actual: value.type_name(),
                source,
            }),
    }
}

/// Bind every field of `record` as the current row of `statement`
pub fn bind_record(
    statement: &mut dyn PreparedStatement,
    record: &Record,
    column_types: Option<&[SqlType]>,
) -> Result<(), WriteError> {
    for (index, value) in record.iter().enumerate() {
        let position = index + 1;
        let param = match column_types {
            None => {
                warn!(
                    position,
                    value = %value,
                    "No column types configured, binding field without type information"
                );
                to_param(position, value, None)?
            }
            Some(types) => match types.get(index) {
                Some(sql_type) => to_param(position, value, Some(*sql_type))?,
                None => {
                    warn!(
                        column = position,
                        sql_type = "undeclared",
                        value = %value,
                        "Unmanaged SQL type, binding field without type information"
                    );
                    to_param(position, value, None)?
                }
            },
        };

        statement
            .bind(position, param)
            .map_err(|source| WriteError::Bind { position, source })?;
    }
    Ok(())
}
