//! Queries.
//!
//! A [Query] is a value: a table plus filters, ordering, and a limit.  Building one does nothing.  It is only run when
//! handed to a [crate::Transaction], which renders it to SQL against the table's descriptor.  Rendering checks every
//! column name against the descriptor and binds every value as a parameter, so the SQL text only ever contains
//! identifiers that passed descriptor validation.
use itertools::Itertools;
use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::{Error, Result, TableDescriptor, Timestamp};

/// A value which may be compared against a column or assigned to one.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    String(String),
    Timestamp(Timestamp),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Integer(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Timestamp(t) => ToSqlOutput::Owned(Sql::Text(
                t.to_storage_text()
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
            )),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean expression over the columns of one table.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// SQL `LIKE`: `%` matches any run of characters, `_` any single one.  Case-insensitive for ASCII.
    Like { column: String, pattern: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

macro_rules! comparison {
    ($name: ident, $op: ident) => {
        pub fn $name(column: impl Into<String>, value: impl Into<Value>) -> Predicate {
            Predicate::Compare {
                column: column.into(),
                op: CompareOp::$op,
                value: value.into(),
            }
        }
    };
}

impl Predicate {
    comparison!(eq, Eq);
    comparison!(ne, Ne);
    comparison!(lt, Lt);
    comparison!(le, Le);
    comparison!(gt, Gt);
    comparison!(ge, Ge);

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Predicate {
        Predicate::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut v) => {
                v.push(other);
                Predicate::And(v)
            }
            p => Predicate::And(vec![p, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut v) => {
                v.push(other);
                Predicate::Or(v)
            }
            p => Predicate::Or(vec![p, other]),
        }
    }

    fn render(&self, table: &TableDescriptor, out: &mut SqlBuilder) -> Result<()> {
        match self {
            Predicate::Compare { column, op, value } => {
                table.get_column(column)?;
                match (op, value) {
                    // `= NULL` is never true, which is not what anyone means.
                    (CompareOp::Eq, Value::Null) => out.push(&format!("{} IS NULL", column)),
                    (CompareOp::Ne, Value::Null) => out.push(&format!("{} IS NOT NULL", column)),
                    _ => {
                        out.push(&format!("{} {} ", column, op.sql()));
                        out.bind(value.clone());
                    }
                }
            }
            Predicate::Like { column, pattern } => {
                table.get_column(column)?;
                out.push(&format!("{} LIKE ", column));
                out.bind(Value::String(pattern.clone()));
            }
            Predicate::And(parts) => render_joined(table, out, parts, " AND ", "1")?,
            Predicate::Or(parts) => render_joined(table, out, parts, " OR ", "0")?,
        }

        Ok(())
    }
}

fn render_joined(
    table: &TableDescriptor,
    out: &mut SqlBuilder,
    parts: &[Predicate],
    sep: &str,
    empty: &str,
) -> Result<()> {
    if parts.is_empty() {
        out.push(empty);
        return Ok(());
    }

    out.push("(");
    for (i, p) in parts.iter().enumerate() {
        if i != 0 {
            out.push(sep);
        }
        p.render(table, out)?;
    }
    out.push(")");
    Ok(())
}

/// The right hand side of an assignment in a bulk update.  May refer to the row's current values.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(self, rhs: impl Into<Expr>) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs.into()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, rhs: impl Into<Expr>) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs.into()))
    }

    fn render(&self, table: &TableDescriptor, out: &mut SqlBuilder) -> Result<()> {
        match self {
            Expr::Column(c) => {
                table.get_column(c)?;
                out.push(c);
            }
            Expr::Literal(v) => out.bind(v.clone()),
            Expr::Add(l, r) | Expr::Sub(l, r) => {
                let op = if matches!(self, Expr::Add(..)) { " + " } else { " - " };
                out.push("(");
                l.render(table, out)?;
                out.push(op);
                r.render(table, out)?;
                out.push(")");
            }
        }
        Ok(())
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(v.into())
    }
}

/// `column = expr`.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    column: String,
    expr: Expr,
}

impl Assignment {
    pub fn new(column: impl Into<String>, expr: impl Into<Expr>) -> Assignment {
        Assignment {
            column: column.into(),
            expr: expr.into(),
        }
    }
}

/// SQL text plus its positional parameters, in order.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SqlBuilder {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl SqlBuilder {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    table: String,
    filters: Vec<Predicate>,
    order: Vec<(String, Direction)>,
    limit: Option<u64>,
}

impl Query {
    /// Everything in the given table.
    pub fn table(name: impl Into<String>) -> Query {
        Query {
            table: name.into(),
            filters: vec![],
            order: vec![],
            limit: None,
        }
    }

    /// Restrict to rows matching the predicate.  Filters accumulate: a row has to match all of them.
    pub fn filter(mut self, predicate: Predicate) -> Query {
        self.filters.push(predicate);
        self
    }

    /// Sort by the column.  Later calls break ties left by earlier ones; the key breaks any that remain.
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Query {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, count: u64) -> Query {
        self.limit = Some(count);
        self
    }

    pub fn get_table(&self) -> &str {
        &self.table
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    fn check_table(&self, table: &TableDescriptor) -> Result<()> {
        if table.get_name() != self.table {
            return Err(Error::UnknownTable(self.table.clone()));
        }
        Ok(())
    }

    fn render_where(&self, table: &TableDescriptor, out: &mut SqlBuilder) -> Result<()> {
        if self.filters.is_empty() {
            return Ok(());
        }
        out.push(" WHERE ");
        render_joined(table, out, &self.filters, " AND ", "1")
    }

    fn render_order_and_limit(&self, table: &TableDescriptor, out: &mut SqlBuilder) -> Result<()> {
        if !self.order.is_empty() {
            for (c, _) in self.order.iter() {
                table.get_column(c)?;
            }
            out.push(&format!(
                " ORDER BY {}, {} ASC",
                self.order
                    .iter()
                    .map(|(c, d)| format!("{} {}", c, d.sql()))
                    .join(", "),
                table.get_key_column()
            ));
        }

        if let Some(limit) = self.limit {
            out.push(" LIMIT ");
            out.bind(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        Ok(())
    }

    /// The filter for bulk statements, which can't take `ORDER BY` or `LIMIT` directly: if either is present, pick the
    /// keys with a subselect.
    fn render_bulk_where(&self, table: &TableDescriptor, out: &mut SqlBuilder) -> Result<()> {
        if self.order.is_empty() && self.limit.is_none() {
            return self.render_where(table, out);
        }

        let key = table.get_key_column();
        out.push(&format!(" WHERE {} IN (SELECT {} FROM {}", key, key, table.get_name()));
        self.render_where(table, out)?;
        self.render_order_and_limit(table, out)?;
        out.push(")");
        Ok(())
    }

    pub(crate) fn render_select(
        &self,
        table: &TableDescriptor,
        columns: &[&str],
    ) -> Result<SqlBuilder> {
        self.check_table(table)?;
        for c in columns.iter() {
            table.get_column(c)?;
        }

        let mut out = SqlBuilder::default();
        out.push(&format!(
            "SELECT {} FROM {}",
            columns.iter().join(", "),
            table.get_name()
        ));
        self.render_where(table, &mut out)?;
        self.render_order_and_limit(table, &mut out)?;
        Ok(out)
    }

    pub(crate) fn render_count(&self, table: &TableDescriptor) -> Result<SqlBuilder> {
        self.check_table(table)?;
        let mut out = SqlBuilder::default();
        if self.limit.is_some() {
            out.push(&format!("SELECT COUNT(*) FROM (SELECT 1 FROM {}", table.get_name()));
            self.render_where(table, &mut out)?;
            self.render_order_and_limit(table, &mut out)?;
            out.push(")");
        } else {
            out.push(&format!("SELECT COUNT(*) FROM {}", table.get_name()));
            self.render_where(table, &mut out)?;
        }
        Ok(out)
    }

    pub(crate) fn render_update(
        &self,
        table: &TableDescriptor,
        assignments: &[Assignment],
    ) -> Result<SqlBuilder> {
        self.check_table(table)?;
        if assignments.is_empty() {
            return Err(Error::InvalidRow("An update needs at least one assignment".into()));
        }

        let mut out = SqlBuilder::default();
        out.push(&format!("UPDATE {} SET ", table.get_name()));
        for (i, a) in assignments.iter().enumerate() {
            table.get_column(&a.column)?;
            if a.column == table.get_key_column() {
                return Err(Error::InvalidRow(format!(
                    "{}: key columns can't be assigned",
                    a.column
                )));
            }
            if i != 0 {
                out.push(", ");
            }
            out.push(&format!("{} = ", a.column));
            a.expr.render(table, &mut out)?;
        }
        self.render_bulk_where(table, &mut out)?;
        Ok(out)
    }

    pub(crate) fn render_delete(&self, table: &TableDescriptor) -> Result<SqlBuilder> {
        self.check_table(table)?;
        let mut out = SqlBuilder::default();
        out.push(&format!("DELETE FROM {}", table.get_name()));
        self.render_bulk_where(table, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::{DatabaseDescriptor, DatabaseDescriptorBuilder};

    fn build_descriptor() -> DatabaseDescriptor {
        let mut builder = DatabaseDescriptorBuilder::new();
        builder
            .add_table("t".into(), |tb| {
                tb.add_key_column("id".into(), "t_pk".into())?;
                tb.add_string_column("name".into(), false)?;
                tb.add_integer_column("n".into(), true)?;
                Ok(())
            })
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_select() {
        let desc = build_descriptor();
        let table = desc.get_table("t").unwrap();

        let q = Query::table("t")
            .filter(Predicate::like("name", "%a%"))
            .filter(Predicate::eq("n", 11))
            .order_by("name", Direction::Descending)
            .limit(3);
        let rendered = q.render_select(table, &["id", "name"]).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id, name FROM t WHERE (name LIKE ? AND n = ?) ORDER BY name DESC, id ASC LIMIT ?"
        );
        assert_eq!(
            rendered.params,
            vec![Value::from("%a%"), Value::Integer(11), Value::Integer(3)]
        );

        let rendered = Query::table("t").render_select(table, &["n"]).unwrap();
        assert_eq!(rendered.sql, "SELECT n FROM t");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn test_nested_predicates() {
        let desc = build_descriptor();
        let table = desc.get_table("t").unwrap();

        let p = Predicate::eq("n", 1)
            .or(Predicate::eq("n", 2))
            .and(Predicate::ne("name", Value::Null));
        let rendered = Query::table("t")
            .filter(p)
            .render_count(table)
            .unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT COUNT(*) FROM t WHERE (((n = ? OR n = ?) AND name IS NOT NULL))"
        );
        assert_eq!(rendered.params, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_update() {
        let desc = build_descriptor();
        let table = desc.get_table("t").unwrap();

        let rendered = Query::table("t")
            .filter(Predicate::eq("name", "x"))
            .render_update(table, &[Assignment::new("n", Expr::column("n").sub(1))])
            .unwrap();
        assert_eq!(
            rendered.sql,
            "UPDATE t SET n = (n - ?) WHERE (name = ?)"
        );
        assert_eq!(rendered.params, vec![Value::Integer(1), Value::from("x")]);

        // Limits turn into a subselect on the key.
        let rendered = Query::table("t")
            .order_by("n", Direction::Ascending)
            .limit(1)
            .render_delete(table)
            .unwrap();
        assert_eq!(
            rendered.sql,
            "DELETE FROM t WHERE id IN (SELECT id FROM t ORDER BY n ASC, id ASC LIMIT ?)"
        );
    }

    #[test]
    fn test_unknown_names() {
        let desc = build_descriptor();
        let table = desc.get_table("t").unwrap();

        let res = Query::table("t")
            .filter(Predicate::eq("missing", 1))
            .render_select(table, &["id"]);
        assert!(matches!(res, Err(Error::UnknownColumn { .. })));

        let res = Query::table("t")
            .order_by("missing", Direction::Ascending)
            .render_select(table, &["id"]);
        assert!(matches!(res, Err(Error::UnknownColumn { .. })));

        let res = Query::table("t").render_update(table, &[Assignment::new("id", 5)]);
        assert!(matches!(res, Err(Error::InvalidRow(_))));

        let res = Query::table("other").render_delete(table);
        assert!(matches!(res, Err(Error::UnknownTable(_))));
    }
}
