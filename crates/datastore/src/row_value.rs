//! An opaque value of a row, used for storing and loading data.
//!
//! Get one with [RowValue::new], which takes a table descriptor and a serde-serializable value, or with
//! [RowValue::from_rusqlite_row] when loading.
use rusqlite::types::{ToSqlOutput, ValueRef};
use smallvec::SmallVec;

use crate::descriptor::{ColumnDefault, ColumnDescriptor, ColumnType, TableDescriptor};
use crate::{Error, Result, Timestamp};

#[derive(Debug)]
enum ColumnValue {
    Null,
    String(String),
    Integer(i64),
    Timestamp(Timestamp),
}

impl ColumnValue {
    fn into_json(self) -> Result<serde_json::Value> {
        Ok(match self {
            ColumnValue::Null => serde_json::Value::Null,
            ColumnValue::String(s) => serde_json::Value::String(s),
            ColumnValue::Integer(i) => serde_json::Value::from(i),
            ColumnValue::Timestamp(t) => serde_json::Value::String(t.to_storage_text()?),
        })
    }
}

impl rusqlite::ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Owned(Sql::Null),
            ColumnValue::Integer(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            ColumnValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            ColumnValue::Timestamp(t) => ToSqlOutput::Owned(Sql::Text(
                t.to_storage_text()
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
            )),
        })
    }
}

/// Rows are small and short-lived, so instead of using a hashmap we use a `SmallVec` map.  These are the entries in
/// that map.
#[derive(Debug)]
struct RowMapEntry {
    name: String,
    value: ColumnValue,
}

#[derive(Debug, Default)]
struct RowMap {
    entries: SmallVec<[RowMapEntry; 8]>,
}

#[derive(Debug)]
pub(crate) struct RowValue {
    map: RowMap,
}

impl RowValue {
    /// Make a row for the specified table.
    pub(crate) fn new(descriptor: &TableDescriptor, value: &impl serde::Serialize) -> Result<RowValue> {
        // Going through serde_json is a convenient way to get something we can walk by field name.
        let mut json = serde_json::to_value(value)?;
        let mut map: RowMap = Default::default();

        for i in descriptor.iter_columns() {
            let v = json.get_mut(i.get_name()).ok_or_else(|| {
                Error::InvalidRow(format!(
                    "Input struct doesn't have field for column {}",
                    i.get_name()
                ))
            })?;

            let cval = if v.is_null() {
                if !i.is_nullable() && i.get_default().is_none() {
                    return Err(Error::InvalidRow(format!(
                        "{}: got null value but column isn't nullable",
                        i.get_name()
                    )));
                }
                ColumnValue::Null
            } else {
                match i.get_column_type() {
                    ColumnType::Integer => ColumnValue::Integer(v.as_i64().ok_or_else(|| {
                        Error::InvalidRow(format!(
                            "{}: integer isn't representable as i64",
                            i.get_name()
                        ))
                    })?),
                    ColumnType::String => ColumnValue::String(
                        v.as_str()
                            .ok_or_else(|| {
                                Error::InvalidRow(format!("{}: should be a string", i.get_name()))
                            })?
                            .to_string(),
                    ),
                    ColumnType::Timestamp => {
                        let text = v.as_str().ok_or_else(|| {
                            Error::InvalidRow(format!("{}: should be a timestamp", i.get_name()))
                        })?;
                        ColumnValue::Timestamp(Timestamp::parse(text)?)
                    }
                }
            };

            map.entries.push(RowMapEntry {
                name: i.get_name().to_string(),
                value: cval,
            });
        }

        Ok(RowValue { map })
    }

    /// Replace nulls with column defaults, as of `now`.
    pub(crate) fn fill_insert_defaults(&mut self, descriptor: &TableDescriptor, now: Timestamp) -> Result<()> {
        for entry in self.map.entries.iter_mut() {
            if !matches!(entry.value, ColumnValue::Null) {
                continue;
            }

            match descriptor.get_column(&entry.name)?.get_default() {
                Some(ColumnDefault::InsertTime) => entry.value = ColumnValue::Timestamp(now),
                None => {}
            }
        }

        Ok(())
    }

    /// Get an integer column, if it is present and not null.
    pub(crate) fn get_integer(&self, name: &str) -> Option<i64> {
        self.map.entries.iter().find_map(|e| match e.value {
            ColumnValue::Integer(i) if e.name == name => Some(i),
            _ => None,
        })
    }

    /// Bind every column to the parameter `:column` of the statement.
    ///
    /// Statements are prebuilt to take every column, so binding all of them leaves nothing stale from a previous
    /// execution.
    pub(crate) fn bind_params(&self, statement: &mut rusqlite::Statement) -> Result<()> {
        for entry in self.map.entries.iter() {
            let param = format!(":{}", entry.name);
            let index = statement.parameter_index(&param)?.ok_or_else(|| {
                Error::InvalidRow(format!("Statement has no parameter {}", param))
            })?;
            statement.raw_bind_parameter(index, &entry.value)?;
        }

        Ok(())
    }

    /// Read a row which was selected with the given columns, in order.
    pub(crate) fn from_rusqlite_row(
        columns: &[&ColumnDescriptor],
        row: &rusqlite::Row,
    ) -> Result<RowValue> {
        let mut map: RowMap = Default::default();

        for (index, column) in columns.iter().enumerate() {
            let value = match (row.get_ref(index)?, column.get_column_type()) {
                (ValueRef::Null, _) => ColumnValue::Null,
                (ValueRef::Integer(i), ColumnType::Integer) => ColumnValue::Integer(i),
                (ValueRef::Text(t), ColumnType::String) => ColumnValue::String(
                    std::str::from_utf8(t)
                        .map_err(|e| Error::InvalidRow(format!("{}: {}", column.get_name(), e)))?
                        .to_string(),
                ),
                (ValueRef::Text(t), ColumnType::Timestamp) => {
                    let text = std::str::from_utf8(t)
                        .map_err(|e| Error::InvalidRow(format!("{}: {}", column.get_name(), e)))?;
                    ColumnValue::Timestamp(Timestamp::parse(text)?)
                }
                (other, expected) => {
                    return Err(Error::InvalidRow(format!(
                        "{}: expected {:?} but the store has {:?}",
                        column.get_name(),
                        expected,
                        other.data_type()
                    )));
                }
            };

            map.entries.push(RowMapEntry {
                name: column.get_name().to_string(),
                value,
            });
        }

        Ok(RowValue { map })
    }

    /// Deserialize a whole row, with columns as fields.
    pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let mut object = serde_json::Map::new();
        for entry in self.map.entries.into_iter() {
            object.insert(entry.name, entry.value.into_json()?);
        }
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }

    /// Deserialize a projection: one column deserializes as that column's value, more than one as a sequence so that
    /// tuples work.
    pub(crate) fn deserialize_projection<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let mut values = self
            .map
            .entries
            .into_iter()
            .map(|e| e.value.into_json())
            .collect::<Result<Vec<_>>>()?;

        let json = if values.len() == 1 {
            values.remove(0)
        } else {
            serde_json::Value::Array(values)
        };
        Ok(serde_json::from_value(json)?)
    }
}
