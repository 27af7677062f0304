//! Descriptors.
//!
//! A database consists of tables.  Each table has some number of columns, each of which may have one of 3 types: a
//! 64-bit signed integer, a string, or a timestamp.  Exactly one column is the key, an integer which sqlite assigns on
//! insert.
//!
//! Constraints and indexes are declared separately from the columns, by name, and are rendered into the table's DDL.
//! The names matter: sqlite reports them when a constraint fails, which is the only error message anyone will see.
use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{Error, Result};

/// Sqlite's keywords.  None of these may be used as a name, since names go into SQL unquoted.
const SQL_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC", "ATTACH",
    "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST", "CHECK", "COLLATE", "COLUMN",
    "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT", "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT",
    "DO", "DROP", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB", "GROUP", "GROUPS",
    "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED", "INITIALLY", "INNER", "INSERT", "INSTEAD",
    "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED",
    "NATURAL", "NO", "NOT", "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE", "RECURSIVE",
    "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE", "RESTRICT", "RETURNING", "RIGHT",
    "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET", "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO",
    "TRANSACTION", "TRIGGER", "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW",
    "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH", "WITHOUT",
];

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref KEYWORDS: HashSet<&'static str> = SQL_KEYWORDS.iter().copied().collect();
}

/// Names are spliced into SQL text without quoting, so they must be plain identifiers and not keywords.
fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        return Err(Error::InvalidDescriptor(format!(
            "{} name {:?} is not a valid identifier",
            kind, name
        )));
    }
    if KEYWORDS.contains(name.to_ascii_uppercase().as_str()) {
        return Err(Error::InvalidDescriptor(format!(
            "{} name {:?} is an SQL keyword",
            kind, name
        )));
    }
    Ok(())
}

/// Types of a row's columns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnType {
    /// This column is a 64-bit signed integer.
    Integer,
    /// This column is a string.
    String,
    /// This column is a [crate::Timestamp], stored as text.
    Timestamp,
}

impl ColumnType {
    pub(crate) fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::String | ColumnType::Timestamp => "TEXT",
        }
    }
}

/// What to put in a column when a row arrives with it null.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnDefault {
    /// The time at which the row was inserted.
    InsertTime,
}

/// A column in a table.
#[derive(Debug)]
pub struct ColumnDescriptor {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    default: Option<ColumnDefault>,
}

impl ColumnDescriptor {
    fn new(name: String, column_type: ColumnType, nullable: bool) -> Result<Self> {
        check_identifier("Column", &name)?;
        Ok(Self {
            name,
            column_type,
            nullable,
            default: None,
        })
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn get_default(&self) -> Option<ColumnDefault> {
        self.default
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum ConstraintKind {
    /// No two rows may share a value.
    Unique { column: String },
    /// `min <= value <= max`.
    Range { column: String, min: i64, max: i64 },
    /// The value is at most `max` characters long.
    MaxLength { column: String, max: u32 },
}

impl ConstraintKind {
    fn get_column(&self) -> &str {
        match self {
            ConstraintKind::Unique { column }
            | ConstraintKind::Range { column, .. }
            | ConstraintKind::MaxLength { column, .. } => column,
        }
    }

    /// The body of `CONSTRAINT name <body>` in a `CREATE TABLE`.
    pub(crate) fn sql_body(&self) -> String {
        match self {
            ConstraintKind::Unique { column } => format!("UNIQUE ({})", column),
            ConstraintKind::Range { column, min, max } => {
                format!("CHECK ({} BETWEEN {} AND {})", column, min, max)
            }
            ConstraintKind::MaxLength { column, max } => {
                format!("CHECK (length({}) <= {})", column, max)
            }
        }
    }
}

/// A named constraint on a table.
#[derive(Debug)]
pub struct ConstraintDescriptor {
    name: String,
    kind: ConstraintKind,
}

impl ConstraintDescriptor {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_kind(&self) -> &ConstraintKind {
        &self.kind
    }
}

/// A secondary index.  These only make things faster.
#[derive(Debug)]
pub struct IndexDescriptor {
    name: String,
    columns: Vec<String>,
}

impl IndexDescriptor {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|x| x.as_str())
    }
}

/// Description of a table.
#[derive(Debug)]
pub struct TableDescriptor {
    name: String,
    key_column: String,
    key_constraint: String,
    columns: Vec<ColumnDescriptor>,
    constraints: Vec<ConstraintDescriptor>,
    indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn iter_constraints(&self) -> impl Iterator<Item = &ConstraintDescriptor> {
        self.constraints.iter()
    }

    pub fn iter_indexes(&self) -> impl Iterator<Item = &IndexDescriptor> {
        self.indexes.iter()
    }

    pub fn get_column(&self, name: &str) -> Result<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|x| x.get_name() == name)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// The name of the auto-assigned integer key column.
    pub fn get_key_column(&self) -> &str {
        &self.key_column
    }

    /// The name of the primary key constraint.
    pub fn get_key_constraint(&self) -> &str {
        &self.key_constraint
    }
}

/// A helper to build tables.
pub struct TableBuilder {
    name: String,
    key: Option<(String, String)>,
    columns: Vec<ColumnDescriptor>,
    constraints: Vec<ConstraintDescriptor>,
    indexes: Vec<IndexDescriptor>,
}

impl TableBuilder {
    pub fn new(name: String) -> Self {
        Self {
            name,
            key: None,
            columns: vec![],
            constraints: vec![],
            indexes: vec![],
        }
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if self.columns.iter().map(|x| x.get_name()).any(|x| x == name) {
            return Err(Error::InvalidDescriptor(format!(
                "{}: duplicate column {}",
                self.name, name
            )));
        }
        Ok(())
    }

    fn check_constraint_name(&self, name: &str) -> Result<()> {
        check_identifier("Constraint", name)?;
        let key_name = self.key.as_ref().map(|x| x.1.as_str());
        if self.constraints.iter().any(|x| x.get_name() == name) || key_name == Some(name) {
            return Err(Error::InvalidDescriptor(format!(
                "{}: duplicate constraint {}",
                self.name, name
            )));
        }
        Ok(())
    }

    fn push_column(&mut self, name: String, column_type: ColumnType, nullable: bool) -> Result<()> {
        self.check_name(&name)?;
        self.columns
            .push(ColumnDescriptor::new(name, column_type, nullable)?);
        Ok(())
    }

    /// Add the key column.  Sqlite assigns it on insert and never hands the same value out twice.
    pub fn add_key_column(&mut self, name: String, constraint_name: String) -> Result<()> {
        if self.key.is_some() {
            return Err(Error::InvalidDescriptor(format!(
                "{}: tables have exactly one key column",
                self.name
            )));
        }
        self.check_constraint_name(&constraint_name)?;
        // Null on insert means "assign one", which is why this column is nullable from the row's point of view.
        self.push_column(name.clone(), ColumnType::Integer, true)?;
        self.key = Some((name, constraint_name));
        Ok(())
    }

    pub fn add_integer_column(&mut self, name: String, nullable: bool) -> Result<()> {
        self.push_column(name, ColumnType::Integer, nullable)
    }

    pub fn add_string_column(&mut self, name: String, nullable: bool) -> Result<()> {
        self.push_column(name, ColumnType::String, nullable)
    }

    pub fn add_timestamp_column(&mut self, name: String, nullable: bool) -> Result<()> {
        self.push_column(name, ColumnType::Timestamp, nullable)
    }

    /// Fill the given timestamp column with the insert time if a row arrives with it null.
    pub fn set_insert_time_default(&mut self, column: &str) -> Result<()> {
        let table = &self.name;
        let col = self
            .columns
            .iter_mut()
            .find(|x| x.get_name() == column)
            .ok_or_else(|| Error::UnknownColumn {
                table: table.clone(),
                column: column.to_string(),
            })?;
        if col.column_type != ColumnType::Timestamp {
            return Err(Error::InvalidDescriptor(format!(
                "{}.{}: only timestamp columns may default to the insert time",
                table, column
            )));
        }
        col.default = Some(ColumnDefault::InsertTime);
        Ok(())
    }

    fn push_constraint(&mut self, name: String, kind: ConstraintKind) -> Result<()> {
        self.check_constraint_name(&name)?;
        if !self.columns.iter().any(|x| x.get_name() == kind.get_column()) {
            return Err(Error::UnknownColumn {
                table: self.name.clone(),
                column: kind.get_column().to_string(),
            });
        }
        self.constraints.push(ConstraintDescriptor { name, kind });
        Ok(())
    }

    pub fn add_unique_constraint(&mut self, name: String, column: String) -> Result<()> {
        self.push_constraint(name, ConstraintKind::Unique { column })
    }

    pub fn add_range_constraint(
        &mut self,
        name: String,
        column: String,
        min: i64,
        max: i64,
    ) -> Result<()> {
        if min > max {
            return Err(Error::InvalidDescriptor(format!(
                "{}: range {}..={} is empty",
                name, min, max
            )));
        }
        self.push_constraint(name, ConstraintKind::Range { column, min, max })
    }

    pub fn add_max_length_constraint(&mut self, name: String, column: String, max: u32) -> Result<()> {
        self.push_constraint(name, ConstraintKind::MaxLength { column, max })
    }

    pub fn add_index(&mut self, name: String, columns: Vec<String>) -> Result<()> {
        check_identifier("Index", &name)?;
        if self.indexes.iter().any(|x| x.name == name) {
            return Err(Error::InvalidDescriptor(format!(
                "{}: duplicate index {}",
                self.name, name
            )));
        }
        if columns.is_empty() {
            return Err(Error::InvalidDescriptor(format!(
                "Index {} has no columns",
                name
            )));
        }
        for c in columns.iter() {
            if !self.columns.iter().any(|x| x.get_name() == c) {
                return Err(Error::UnknownColumn {
                    table: self.name.clone(),
                    column: c.clone(),
                });
            }
        }
        self.indexes.push(IndexDescriptor { name, columns });
        Ok(())
    }

    pub fn build(self) -> Result<TableDescriptor> {
        check_identifier("Table", &self.name)?;
        let (key_column, key_constraint) = self.key.ok_or_else(|| {
            Error::InvalidDescriptor(format!("{}: tables need a key column", self.name))
        })?;
        Ok(TableDescriptor {
            name: self.name,
            key_column,
            key_constraint,
            columns: self.columns,
            constraints: self.constraints,
            indexes: self.indexes,
        })
    }
}

/// Description of a database: a set of tables.
#[derive(Debug)]
pub struct DatabaseDescriptor {
    tables: Vec<TableDescriptor>,
}

impl DatabaseDescriptor {
    pub fn iter_tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter()
    }

    pub fn get_table(&self, name: &str) -> Result<&TableDescriptor> {
        self.tables
            .iter()
            .find(|x| x.get_name() == name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }
}

#[derive(Default)]
pub struct DatabaseDescriptorBuilder {
    tables: Vec<TableDescriptor>,
}

impl DatabaseDescriptorBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_table(
        &mut self,
        name: String,
        callback: impl FnOnce(&mut TableBuilder) -> Result<()>,
    ) -> Result<()> {
        if self.tables.iter().any(|x| x.get_name() == name) {
            return Err(Error::InvalidDescriptor(format!("Duplicate table {}", name)));
        }

        let mut builder = TableBuilder::new(name);
        callback(&mut builder)?;
        self.tables.push(builder.build()?);
        Ok(())
    }

    pub fn build(self) -> Result<DatabaseDescriptor> {
        let mut seen = HashSet::new();
        for index in self.tables.iter().flat_map(|x| x.iter_indexes()) {
            // Index names are global in sqlite.
            if !seen.insert(index.get_name()) {
                return Err(Error::InvalidDescriptor(format!(
                    "Duplicate index {}",
                    index.get_name()
                )));
            }
        }

        Ok(DatabaseDescriptor {
            tables: self.tables,
        })
    }
}
