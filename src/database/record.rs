//! Column-to-field mapping by naming convention.
//!
//! Every record type registers a static descriptor table (field name plus a
//! decode function) through [`record!`]. At scan time the descriptors and the
//! result columns are both normalised (lower-cased, underscores stripped) and
//! joined, so `last_login`, `LastLogin` and `lastlogin` all land in the same
//! slot. Columns without a matching field are absorbed and dropped; fields
//! without a matching column keep their `Default` value.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::database::executor::ResultRow;
use crate::database::manager::DatabaseError;
use crate::database::value::{SqlValue, ValueError};

/// Decodes one column value into one field of `R`
pub type Decoder<R> = fn(&mut R, SqlValue) -> Result<(), ValueError>;

pub struct Field<R> {
    pub name: &'static str,
    pub decode: Decoder<R>,
}

/// A struct that rows can be scanned into
pub trait Record: Default + Send + Sized + 'static {
    fn fields() -> &'static [Field<Self>];
}

/// Registers a struct as a [`Record`] by listing the fields that take part in scanning.
///
/// ```ignore
/// record!(User { id, fullname, email, last_login });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        impl $crate::database::record::Record for $ty {
            fn fields() -> &'static [$crate::database::record::Field<Self>] {
                const FIELDS: &[$crate::database::record::Field<$ty>] = &[
                    $(
                        $crate::database::record::Field {
                            name: stringify!($field),
                            decode: |record: &mut $ty, value: $crate::database::value::SqlValue| {
                                record.$field = $crate::database::value::FromSqlValue::from_sql_value(value)?;
                                Ok(())
                            },
                        },
                    )+
                ];
                FIELDS
            }
        }
    };
}

/// Lower-case and strip underscores
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Per-result-set lookup from column position to field slot
pub struct ColumnMap<R: Record> {
    columns: Vec<String>,
    slots: Vec<Option<usize>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> ColumnMap<R> {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Result<Self, DatabaseError> {
        let fields = R::fields();
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            if let Some(previous) = by_name.insert(normalize(field.name), index) {
                return Err(DatabaseError::InvalidArgument(format!(
                    "record fields '{}' and '{}' normalise to the same column name",
                    fields[previous].name, field.name
                )));
            }
        }

        let slots = columns
            .iter()
            .map(|column| by_name.get(&normalize(column.as_ref())).copied())
            .collect();

        Ok(Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            slots,
            _record: PhantomData,
        })
    }

    /// Number of result columns that found a field
    pub fn matched(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn map_row(&self, row: ResultRow) -> Result<R, DatabaseError> {
        let fields = R::fields();
        let mut record = R::default();

        for ((column, slot), value) in self.columns.iter().zip(&self.slots).zip(row.into_values()) {
            let Some(index) = slot else {
                // Unmatched column: absorbed
                continue;
            };
            (fields[*index].decode)(&mut record, value).map_err(|source| DatabaseError::Scan {
                column: column.clone(),
                source,
            })?;
        }

        Ok(record)
    }
}

/// Maps every row of a result set
pub fn map_rows<R: Record>(rows: Vec<ResultRow>) -> Result<Vec<R>, DatabaseError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let map = ColumnMap::<R>::new(first.columns())?;
    rows.into_iter().map(|row| map.map_row(row)).collect()
}

/// Maps a single row
pub fn map_one<R: Record>(row: ResultRow) -> Result<R, DatabaseError> {
    let map = ColumnMap::<R>::new(row.columns())?;
    map.map_row(row)
}
