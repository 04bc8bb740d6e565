/// Schema Introspection Module
///
/// This module enumerates tables and columns through the driver's catalog
/// primitives rather than by querying user data.

use crate::core::db::connection::Session;
use crate::core::db::driver::ColumnDescriptor;
use crate::core::Result;
use serde::Serialize;
use tracing::debug;

/// Represents a database column with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Declared type name (e.g., "INTEGER", "TEXT"); empty when undeclared
    #[serde(rename = "type")]
    pub type_name: String,
    /// Human-readable summary of the column's constraints
    pub description: String,
}

impl From<ColumnDescriptor> for ColumnMetadata {
    fn from(column: ColumnDescriptor) -> Self {
        let mut notes = Vec::new();
        if column.primary_key {
            notes.push("primary key".to_string());
        }
        if column.not_null {
            notes.push("not null".to_string());
        }
        if let Some(default) = column.default_value {
            notes.push(format!("default {}", default));
        }

        ColumnMetadata {
            name: column.name,
            type_name: column.type_name,
            description: notes.join(", "),
        }
    }
}

/// Represents a table together with its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnMetadata>,
}

/// Catalog introspection service bound to one session
pub struct SchemaIntrospector<'a> {
    session: &'a mut Session,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        SchemaIntrospector { session }
    }

    /// Lists table names in the order the catalog reports them.
    pub fn list_tables(&mut self) -> Result<Vec<String>> {
        let tables = self.session.cursor()?.tables()?;
        debug!(count = tables.len(), "Listed tables");
        Ok(tables.into_iter().map(|table| table.name).collect())
    }

    /// Lists the columns of one table in declaration order.
    ///
    /// An unknown table yields an empty list, mirroring the catalog primitive.
    pub fn list_columns(&mut self, table_name: &str) -> Result<Vec<ColumnMetadata>> {
        let columns = self.session.cursor()?.columns(table_name)?;
        debug!(table = table_name, count = columns.len(), "Listed columns");
        Ok(columns.into_iter().map(ColumnMetadata::from).collect())
    }

    /// Lists every table with its columns, one column lookup per table,
    /// preserving table discovery order.
    pub fn list_tables_with_columns(&mut self) -> Result<Vec<TableMetadata>> {
        let names = self.list_tables()?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.list_columns(&name)?;
            tables.push(TableMetadata { name, columns });
        }
        Ok(tables)
    }
}
