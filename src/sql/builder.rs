//! Statement builders
//!
//! Pure functions returning `(sql, args)` with `?` placeholders. SELECT columns are
//! always aliased `<qualifier>__<column>` so rows map back to fields without any
//! extra table context.
//!
//! Mutating statements refuse to run without a non-empty WHERE clause. There is no
//! fallback to a "safer" statement: the caller gets an error.

use serde_json::Value;

use crate::error::{MetaSqlError, Result};
use crate::schema::{Field, Schema};
use crate::sql::condition::Where;
use crate::sql::join::Joint;
use crate::value::ValueGetter;

/// Sort direction for paged selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering and window for [`select_page_sql`]
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    order_by: Vec<(Field, SortDirection)>,
    limit: u64,
    offset: u64,
}

impl Page {
    pub fn new(limit: u64) -> Self {
        Self {
            order_by: Vec::new(),
            limit,
            offset: 0,
        }
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, field: &Field, direction: SortDirection) -> Self {
        self.order_by.push((field.clone(), direction));
        self
    }
}

fn from_clause(schema: &Schema) -> String {
    if schema.is_aliased() {
        format!("{} AS {}", schema.table_name(), schema.qualifier())
    } else {
        schema.table_name().to_string()
    }
}

fn projection(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| format!("{} AS {}", f.qualified(), f.alias()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_where(sql: &mut String, args: &mut Vec<Value>, filter: Option<&Where>) {
    if let Some(filter) = filter {
        let (clause, where_args) = filter.build();
        if !clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
            args.extend(where_args);
        }
    }
}

fn required_where(statement: &'static str, filter: Option<&Where>) -> Result<(String, Vec<Value>)> {
    let (clause, args) = filter
        .map(Where::build)
        .ok_or(MetaSqlError::MissingWhere(statement))?;
    if clause.is_empty() {
        return Err(MetaSqlError::MissingWhere(statement));
    }
    Ok((clause, args))
}

/// UPDATE and DELETE name the bare table, so predicates on an alias would not bind
fn unaliased_target(statement: &'static str, schema: &Schema) -> Result<()> {
    if schema.is_aliased() {
        return Err(MetaSqlError::AliasedTarget {
            statement,
            table: schema.table_name().to_string(),
            alias: schema.qualifier().to_string(),
        });
    }
    Ok(())
}

fn non_empty(schema: Option<&Schema>) -> Result<&Schema> {
    match schema {
        Some(schema) if !schema.is_empty() => Ok(schema),
        _ => Err(MetaSqlError::EmptySchema),
    }
}

/// `SELECT <all fields> FROM <table> [WHERE ...]`
///
/// An empty `filter` is the same as no filter.
///
/// # Example
/// ```
/// use metasql::{FieldMeta, LogicalType, Schema};
/// use metasql::sql::select_sql;
///
/// let mut id = FieldMeta::new("ID", LogicalType::I64);
/// id.column_name = "ID".into();
/// let mut email = FieldMeta::new("Email", LogicalType::String);
/// email.column_name = "Email".into();
/// let accounts = Schema::new("accounts", vec![id, email]).unwrap();
///
/// let (sql, args) = select_sql(Some(&accounts), None).unwrap();
/// assert_eq!(
///     sql,
///     "SELECT accounts.ID AS accounts__ID, accounts.Email AS accounts__Email FROM accounts"
/// );
/// assert!(args.is_empty());
/// ```
pub fn select_sql(schema: Option<&Schema>, filter: Option<&Where>) -> Result<(String, Vec<Value>)> {
    let schema = non_empty(schema)?;
    let mut sql = format!(
        "SELECT {} FROM {}",
        projection(&schema.fields()),
        from_clause(schema)
    );
    let mut args = Vec::new();
    push_where(&mut sql, &mut args, filter);
    Ok((sql, args))
}

/// `SELECT <projection> FROM <base> <joins...> [WHERE ...]`
///
/// Joins render in the given order. ON-group filter arguments come before the
/// WHERE arguments, matching their textual position.
pub fn select_join_sql(
    base: &Schema,
    projection_fields: &[Field],
    joins: &[Joint],
    filter: Option<&Where>,
) -> Result<(String, Vec<Value>)> {
    if projection_fields.is_empty() {
        return Err(MetaSqlError::EmptySchema);
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        projection(projection_fields),
        from_clause(base)
    );
    let mut args = Vec::new();
    for joint in joins {
        let (clause, join_args) = joint.build();
        sql.push(' ');
        sql.push_str(&clause);
        args.extend(join_args);
    }
    push_where(&mut sql, &mut args, filter);
    Ok((sql, args))
}

/// `INSERT INTO <table> (...) VALUES (...)` for the fields the getter provides
pub fn insert_sql(schema: &Schema, values: &dyn ValueGetter) -> Result<(String, Vec<Value>)> {
    let mut columns = Vec::new();
    let mut args = Vec::new();
    for meta in schema.metas() {
        if let Some(value) = values.get_value(&meta.provider_name) {
            columns.push(meta.column_name.as_str());
            args.push(value);
        }
    }

    if columns.is_empty() {
        return Err(MetaSqlError::NoFields("INSERT"));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table_name(),
        columns.join(", "),
        placeholders
    );
    Ok((sql, args))
}

/// `UPDATE <table> SET ... WHERE ...`
///
/// Arguments are the SET values followed by the WHERE arguments. An aliased schema
/// is refused with [`MetaSqlError::AliasedTarget`].
pub fn update_sql(
    schema: &Schema,
    values: &dyn ValueGetter,
    filter: Option<&Where>,
) -> Result<(String, Vec<Value>)> {
    unaliased_target("UPDATE", schema)?;
    let (clause, where_args) = required_where("UPDATE", filter)?;

    let mut sets = Vec::new();
    let mut args = Vec::new();
    for meta in schema.metas() {
        if let Some(value) = values.get_value(&meta.provider_name) {
            sets.push(format!("{} = ?", meta.column_name));
            args.push(value);
        }
    }

    if sets.is_empty() {
        return Err(MetaSqlError::NoFields("UPDATE"));
    }

    args.extend(where_args);
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        schema.table_name(),
        sets.join(", "),
        clause
    );
    Ok((sql, args))
}

/// `DELETE FROM <table> WHERE ...`; refuses aliased schemas like [`update_sql`]
pub fn delete_sql(schema: &Schema, filter: Option<&Where>) -> Result<(String, Vec<Value>)> {
    unaliased_target("DELETE", schema)?;
    let (clause, args) = required_where("DELETE", filter)?;
    Ok((format!("DELETE FROM {} WHERE {}", schema.table_name(), clause), args))
}

/// `SELECT COUNT(*) AS count FROM <table> [WHERE ...]`
pub fn count_sql(schema: &Schema, filter: Option<&Where>) -> Result<(String, Vec<Value>)> {
    let mut sql = format!("SELECT COUNT(*) AS count FROM {}", from_clause(schema));
    let mut args = Vec::new();
    push_where(&mut sql, &mut args, filter);
    Ok((sql, args))
}

/// [`select_sql`] followed by `ORDER BY ... LIMIT ? OFFSET ?`
///
/// Without explicit ordering the primary keys are used, ascending. Limit and offset
/// are the last two arguments.
pub fn select_page_sql(
    schema: Option<&Schema>,
    filter: Option<&Where>,
    page: &Page,
) -> Result<(String, Vec<Value>)> {
    let (mut sql, mut args) = select_sql(schema, filter)?;
    let schema = non_empty(schema)?;

    let order: Vec<String> = if page.order_by.is_empty() {
        schema
            .primary_keys()
            .map(|meta| format!("{}.{} ASC", schema.qualifier(), meta.column_name))
            .collect()
    } else {
        page.order_by
            .iter()
            .map(|(field, dir)| format!("{} {}", field.qualified(), dir.as_sql()))
            .collect()
    };

    if !order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
    }
    sql.push_str(" LIMIT ? OFFSET ?");
    args.push(Value::from(page.limit));
    args.push(Value::from(page.offset));
    Ok((sql, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldMeta;
    use crate::sql::join;
    use crate::types::LogicalType;
    use serde_json::json;

    fn meta(name: &str, logical: LogicalType) -> FieldMeta {
        let mut m = FieldMeta::new(name, logical);
        m.column_name = name.to_string();
        m
    }

    fn accounts() -> Schema {
        let mut id = meta("ID", LogicalType::I64);
        id.is_pk = true;
        Schema::new("accounts", vec![id, meta("Email", LogicalType::String)]).unwrap()
    }

    fn profiles() -> Schema {
        Schema::new(
            "profiles",
            vec![meta("AccountID", LogicalType::I64), meta("Bio", LogicalType::String)],
        )
        .unwrap()
    }

    // ==================== SELECT ====================

    #[test]
    fn test_select_without_where() {
        let (sql, args) = select_sql(Some(&accounts()), None).unwrap();
        assert_eq!(
            sql,
            "SELECT accounts.ID AS accounts__ID, accounts.Email AS accounts__Email FROM accounts"
        );
        assert!(args.is_empty());
    }

    #[test]
    fn test_select_empty_where_is_no_where() {
        let empty = Where::and(Vec::<Where>::new());
        let (sql, _) = select_sql(Some(&accounts()), Some(&empty)).unwrap();
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_select_with_where() {
        let s = accounts();
        let w = Where::and([s.field("ID").unwrap().gt(10), s.field("Email").unwrap().like("%@x.io")]);
        let (sql, args) = select_sql(Some(&s), Some(&w)).unwrap();
        assert!(sql.ends_with("FROM accounts WHERE (accounts.ID > ? AND accounts.Email LIKE ?)"));
        assert_eq!(args, vec![json!(10), json!("%@x.io")]);
    }

    #[test]
    fn test_select_requires_schema() {
        assert!(matches!(select_sql(None, None), Err(MetaSqlError::EmptySchema)));
        let empty = Schema::new("empty", vec![]).unwrap();
        assert!(matches!(select_sql(Some(&empty), None), Err(MetaSqlError::EmptySchema)));
    }

    #[test]
    fn test_select_nested_and_keeps_arg_order() {
        let s = accounts();
        let inner = Where::and([s.field("ID").unwrap().eq(1), s.field("Email").unwrap().eq("b")]);
        let wrapped = Where::or([Where::and([None, Some(Where::or([inner]))])]);
        let (_, args) = select_sql(Some(&s), Some(&wrapped)).unwrap();
        assert_eq!(args, vec![json!(1), json!("b")]);
    }

    // ==================== JOIN SELECT ====================

    #[test]
    fn test_select_join() {
        let (a, p) = (accounts(), profiles());
        let joint = join::left_join(&a.field("ID").unwrap(), &p.field("AccountID").unwrap());
        let fields = [a.fields(), vec![p.field("Bio").unwrap()]].concat();

        let (sql, args) = select_join_sql(&a, &fields, &[joint], None).unwrap();
        assert_eq!(
            sql,
            "SELECT accounts.ID AS accounts__ID, accounts.Email AS accounts__Email, profiles.Bio AS profiles__Bio \
             FROM accounts LEFT JOIN profiles ON (accounts.ID = profiles.AccountID)"
        );
        assert!(args.is_empty());
    }

    #[test]
    fn test_select_join_on_filter_args_precede_where_args() {
        let (a, p) = (accounts(), profiles());
        let joint = join::left_join(&a.field("ID").unwrap(), &p.field("AccountID").unwrap())
            .filter(p.field("Bio").unwrap().eq("on-arg"));
        let w = a.field("Email").unwrap().eq("where-arg");

        let (sql, args) = select_join_sql(&a, &a.fields(), &[joint], Some(&w)).unwrap();
        assert!(sql.contains("AND profiles.Bio = ?) WHERE accounts.Email = ?"));
        assert_eq!(args, vec![json!("on-arg"), json!("where-arg")]);
    }

    #[test]
    fn test_select_join_empty_projection() {
        assert!(select_join_sql(&accounts(), &[], &[], None).is_err());
    }

    // ==================== INSERT ====================

    #[test]
    fn test_insert_only_present_fields() {
        let (sql, args) = insert_sql(&accounts(), &json!({"Email": "a@b.c"})).unwrap();
        assert_eq!(sql, "INSERT INTO accounts (Email) VALUES (?)");
        assert_eq!(args, vec![json!("a@b.c")]);
    }

    #[test]
    fn test_insert_uses_schema_order() {
        let (sql, args) = insert_sql(&accounts(), &json!({"Email": "a@b.c", "ID": 4})).unwrap();
        assert_eq!(sql, "INSERT INTO accounts (ID, Email) VALUES (?, ?)");
        assert_eq!(args, vec![json!(4), json!("a@b.c")]);
    }

    #[test]
    fn test_insert_without_fields_fails() {
        let err = insert_sql(&accounts(), &json!({"Other": 1})).unwrap_err();
        assert!(matches!(err, MetaSqlError::NoFields("INSERT")));
    }

    // ==================== UPDATE / DELETE ====================

    #[test]
    fn test_update_args_are_set_then_where() {
        let s = accounts();
        let w = s.field("ID").unwrap().eq(9);
        let (sql, args) = update_sql(&s, &json!({"Email": "new@x.io"}), Some(&w)).unwrap();
        assert_eq!(sql, "UPDATE accounts SET Email = ? WHERE accounts.ID = ?");
        assert_eq!(args, vec![json!("new@x.io"), json!(9)]);
    }

    #[test]
    fn test_update_requires_where() {
        let s = accounts();
        let values = json!({"Email": "x"});
        assert!(matches!(
            update_sql(&s, &values, None),
            Err(MetaSqlError::MissingWhere("UPDATE"))
        ));
        let empty = Where::or([None::<Where>]);
        assert!(matches!(
            update_sql(&s, &values, Some(&empty)),
            Err(MetaSqlError::MissingWhere("UPDATE"))
        ));
    }

    #[test]
    fn test_update_without_fields_fails() {
        let s = accounts();
        let w = s.field("ID").unwrap().eq(1);
        assert!(matches!(
            update_sql(&s, &json!({}), Some(&w)),
            Err(MetaSqlError::NoFields("UPDATE"))
        ));
    }

    #[test]
    fn test_delete() {
        let s = accounts();
        let w = s.field("ID").unwrap().is_in([1, 2]);
        let (sql, args) = delete_sql(&s, Some(&w)).unwrap();
        assert_eq!(sql, "DELETE FROM accounts WHERE accounts.ID IN (?, ?)");
        assert_eq!(args, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_delete_requires_where() {
        let s = accounts();
        assert!(delete_sql(&s, None).is_err());
        assert!(delete_sql(&s, Some(&Where::and([None::<Where>]))).is_err());
    }

    #[test]
    fn test_delete_with_empty_in_matches_nothing() {
        let s = accounts();
        let w = s.field("ID").unwrap().is_in(Vec::<i64>::new());
        let (sql, args) = delete_sql(&s, Some(&w)).unwrap();
        assert_eq!(sql, "DELETE FROM accounts WHERE 1=0");
        assert!(args.is_empty());
    }

    #[test]
    fn test_mutations_reject_aliased_schema() {
        let inner = accounts().aliased("accounts_2");
        let w = inner.field("ID").unwrap().eq(1);

        let err = delete_sql(&inner, Some(&w)).unwrap_err();
        assert!(matches!(
            err,
            MetaSqlError::AliasedTarget { statement: "DELETE", ref alias, .. } if alias == "accounts_2"
        ));
        assert!(matches!(
            update_sql(&inner, &json!({"Email": "x"}), Some(&w)),
            Err(MetaSqlError::AliasedTarget { statement: "UPDATE", .. })
        ));
    }

    // ==================== COUNT / paging ====================

    #[test]
    fn test_count() {
        let s = accounts();
        let (sql, args) = count_sql(&s, Some(&s.field("Email").unwrap().is_not_null())).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS count FROM accounts WHERE accounts.Email IS NOT NULL"
        );
        assert!(args.is_empty());
    }

    #[test]
    fn test_page_defaults_to_primary_key_order() {
        let s = accounts();
        let (sql, args) = select_page_sql(Some(&s), None, &Page::new(20).offset(40)).unwrap();
        assert!(sql.ends_with("FROM accounts ORDER BY accounts.ID ASC LIMIT ? OFFSET ?"));
        assert_eq!(args, vec![json!(20), json!(40)]);
    }

    #[test]
    fn test_page_explicit_order_and_where() {
        let s = accounts();
        let w = s.field("ID").unwrap().gt(5);
        let page = Page::new(10).order_by(&s.field("Email").unwrap(), SortDirection::Desc);
        let (sql, args) = select_page_sql(Some(&s), Some(&w), &page).unwrap();
        assert!(sql.ends_with("WHERE accounts.ID > ? ORDER BY accounts.Email DESC LIMIT ? OFFSET ?"));
        assert_eq!(args, vec![json!(5), json!(10), json!(0)]);
    }
}
