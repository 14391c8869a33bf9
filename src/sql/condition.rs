//! Predicate algebra for SQL WHERE clauses
//!
//! A [`Where`] compiles lazily into `(clause, args)` with `?` placeholders. Arguments
//! are always returned in the same left-to-right order as their placeholders.
//!
//! Leaf predicates come from [`Field`](crate::Field) methods (`eq`, `gt`, `is_in`, ...),
//! so every column a predicate mentions is bound to schema metadata.

use serde_json::Value;

use crate::schema::Field;
use crate::sql::join::Joint;

/// Comparison operator of a leaf predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logic {
    And,
    Or,
}

impl Logic {
    fn as_sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Compare {
        column: String,
        op: CmpOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    NullCheck {
        column: String,
        is_null: bool,
    },
    /// `left = right` between two qualified columns; used by join ON groups
    ColumnEq {
        left: String,
        right: String,
    },
    Group {
        logic: Logic,
        children: Vec<Where>,
    },
    Not(Box<Where>),
    Exists(Box<Joint>),
}

/// Composable predicate
///
/// Values can only be produced by this crate's constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Where(Node);

impl Where {
    pub(crate) fn compare(field: &Field, op: CmpOp, value: Value) -> Self {
        Self(Node::Compare {
            column: field.qualified(),
            op,
            value,
        })
    }

    pub(crate) fn is_in(field: &Field, values: Vec<Value>) -> Self {
        Self(Node::In {
            column: field.qualified(),
            values,
        })
    }

    pub(crate) fn null_check(field: &Field, is_null: bool) -> Self {
        Self(Node::NullCheck {
            column: field.qualified(),
            is_null,
        })
    }

    pub(crate) fn column_eq(left: &Field, right: &Field) -> Self {
        Self(Node::ColumnEq {
            left: left.qualified(),
            right: right.qualified(),
        })
    }

    pub(crate) fn exists(joint: Joint) -> Self {
        Self(Node::Exists(Box::new(joint)))
    }

    /// Conjunction; `None` and empty children are dropped
    pub fn and<I, W>(children: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Option<Where>>,
    {
        Self::group(Logic::And, children)
    }

    /// Disjunction; `None` and empty children are dropped
    pub fn or<I, W>(children: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Option<Where>>,
    {
        Self::group(Logic::Or, children)
    }

    /// Negation; negating an empty predicate stays empty
    pub fn not(inner: Where) -> Self {
        Self(Node::Not(Box::new(inner)))
    }

    fn group<I, W>(logic: Logic, children: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Option<Where>>,
    {
        let children = children
            .into_iter()
            .filter_map(Into::into)
            .filter(|w: &Where| !w.is_empty())
            .collect();
        Self(Node::Group { logic, children })
    }

    /// True when this predicate builds to an empty clause
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Node::Group { children, .. } => children.iter().all(Where::is_empty),
            Node::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Compile to clause text and positional arguments
    pub fn build(&self) -> (String, Vec<Value>) {
        match &self.0 {
            Node::Compare { column, op, value } => {
                (format!("{} {} ?", column, op.as_sql()), vec![value.clone()])
            }
            Node::In { column, values } => {
                if values.is_empty() {
                    return ("1=0".to_string(), Vec::new());
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                (format!("{} IN ({})", column, placeholders), values.clone())
            }
            Node::NullCheck { column, is_null } => {
                let check = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                (format!("{} {}", column, check), Vec::new())
            }
            Node::ColumnEq { left, right } => (format!("{} = {}", left, right), Vec::new()),
            Node::Group { logic, children } => {
                let mut clauses = Vec::new();
                let mut args = Vec::new();
                for child in children {
                    let (clause, child_args) = child.build();
                    if clause.is_empty() {
                        continue;
                    }
                    clauses.push(clause);
                    args.extend(child_args);
                }
                if clauses.is_empty() {
                    return (String::new(), Vec::new());
                }
                (format!("({})", clauses.join(logic.as_sql())), args)
            }
            Node::Not(inner) => {
                let (clause, args) = inner.build();
                if clause.is_empty() {
                    return (clause, args);
                }
                if matches!(inner.0, Node::Group { .. }) {
                    (format!("NOT {}", clause), args)
                } else {
                    (format!("NOT ({})", clause), args)
                }
            }
            Node::Exists(joint) => joint.exists_clause(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldMeta, Schema};
    use crate::types::LogicalType;
    use proptest::prelude::*;
    use serde_json::json;

    fn accounts() -> Schema {
        let mut id = FieldMeta::new("ID", LogicalType::I64);
        id.is_pk = true;
        id.column_name = "ID".into();
        let mut email = FieldMeta::new("Email", LogicalType::String);
        email.column_name = "Email".into();
        let mut age = FieldMeta::new("Age", LogicalType::I32);
        age.column_name = "Age".into();
        Schema::new("accounts", vec![id, email, age]).unwrap()
    }

    // ==================== Leaf predicates ====================

    #[test]
    fn test_comparison_operators() {
        let s = accounts();
        let age = s.field("Age").unwrap();

        let cases = [
            (age.eq(1), "accounts.Age = ?"),
            (age.ne(1), "accounts.Age != ?"),
            (age.gt(1), "accounts.Age > ?"),
            (age.gte(1), "accounts.Age >= ?"),
            (age.lt(1), "accounts.Age < ?"),
            (age.lte(1), "accounts.Age <= ?"),
            (s.field("Email").unwrap().like("%@x.io"), "accounts.Email LIKE ?"),
        ];
        for (w, expected) in cases {
            let (clause, args) = w.build();
            assert_eq!(clause, expected);
            assert_eq!(args.len(), 1);
        }
    }

    #[test]
    fn test_in_clause() {
        let id = accounts().field("ID").unwrap();
        let (clause, args) = id.is_in([1, 2, 3]).build();
        assert_eq!(clause, "accounts.ID IN (?, ?, ?)");
        assert_eq!(args, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_in_empty_is_always_false() {
        let id = accounts().field("ID").unwrap();
        let (clause, args) = id.is_in(Vec::<i64>::new()).build();
        assert_eq!(clause, "1=0");
        assert!(args.is_empty());
    }

    #[test]
    fn test_null_checks() {
        let email = accounts().field("Email").unwrap();
        assert_eq!(email.is_null().build().0, "accounts.Email IS NULL");
        assert_eq!(email.is_not_null().build().0, "accounts.Email IS NOT NULL");
        assert!(email.is_null().build().1.is_empty());
    }

    // ==================== Combinators ====================

    #[test]
    fn test_and_or_precedence_is_explicit() {
        let s = accounts();
        let a = s.field("ID").unwrap().eq(1);
        let b = s.field("Email").unwrap().eq("x");
        let c = s.field("Age").unwrap().gt(30);

        let left = Where::or([Where::and([a.clone(), b.clone()]), c.clone()]);
        let right = Where::and([a, Where::or([b, c])]);

        assert_eq!(
            left.build().0,
            "((accounts.ID = ? AND accounts.Email = ?) OR accounts.Age > ?)"
        );
        assert_eq!(
            right.build().0,
            "(accounts.ID = ? AND (accounts.Email = ? OR accounts.Age > ?))"
        );
    }

    #[test]
    fn test_single_child_still_parenthesized() {
        let id = accounts().field("ID").unwrap();
        let (clause, args) = Where::and([id.eq(5)]).build();
        assert_eq!(clause, "(accounts.ID = ?)");
        assert_eq!(args, vec![json!(5)]);
    }

    #[test]
    fn test_none_and_empty_children_dropped() {
        let id = accounts().field("ID").unwrap();
        let w = Where::and([
            None,
            Some(Where::or(Vec::<Where>::new())),
            Some(id.eq(1)),
            Some(Where::and([None::<Where>])),
        ]);
        assert_eq!(w.build(), ("(accounts.ID = ?)".to_string(), vec![json!(1)]));
    }

    #[test]
    fn test_all_empty_combinator_is_empty() {
        let w = Where::and([None::<Where>, None]);
        assert!(w.is_empty());
        assert_eq!(w.build(), (String::new(), Vec::new()));

        let nested = Where::or([Where::and(Vec::<Where>::new())]);
        assert!(nested.is_empty());
        assert_eq!(nested.build(), (String::new(), Vec::new()));
    }

    #[test]
    fn test_not() {
        let s = accounts();
        let id = s.field("ID").unwrap();
        assert_eq!(Where::not(id.eq(1)).build().0, "NOT (accounts.ID = ?)");
        assert_eq!(
            Where::not(Where::or([id.eq(1), id.eq(2)])).build().0,
            "NOT (accounts.ID = ? OR accounts.ID = ?)"
        );
        assert!(Where::not(Where::and(Vec::<Where>::new())).is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let s = accounts();
        let w = Where::and([
            s.field("ID").unwrap().is_in([1, 2]),
            s.field("Email").unwrap().like("a%"),
        ]);
        assert_eq!(w.build(), w.build());
    }

    // ==================== Argument order ====================

    #[derive(Debug, Clone)]
    enum Tree {
        Leaf,
        And(Vec<Tree>),
        Or(Vec<Tree>),
    }

    fn arb_tree() -> impl Strategy<Value = Tree> {
        Just(Tree::Leaf).prop_recursive(4, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Tree::And),
                prop::collection::vec(inner, 0..4).prop_map(Tree::Or),
            ]
        })
    }

    fn realize(tree: &Tree, field: &Field, next: &mut i64) -> Where {
        match tree {
            Tree::Leaf => {
                *next += 1;
                field.eq(*next)
            }
            Tree::And(children) => {
                Where::and(children.iter().map(|c| realize(c, field, next)).collect::<Vec<_>>())
            }
            Tree::Or(children) => {
                Where::or(children.iter().map(|c| realize(c, field, next)).collect::<Vec<_>>())
            }
        }
    }

    proptest! {
        #[test]
        fn args_follow_textual_order(tree in arb_tree()) {
            let field = accounts().field("Age").unwrap();
            let mut next = 0;
            let w = realize(&tree, &field, &mut next);
            let (clause, args) = w.build();

            let expected: Vec<Value> = (1..=next).map(Value::from).collect();
            prop_assert_eq!(args, expected);
            prop_assert_eq!(clause.matches('?').count() as i64, next);
        }

        #[test]
        fn nested_two_leaf_and_keeps_order(depth in 0usize..5) {
            let s = accounts();
            let mut w = Where::and([s.field("ID").unwrap().eq("left"), s.field("Age").unwrap().eq("right")]);
            for i in 0..depth {
                w = if i % 2 == 0 { Where::or([w]) } else { Where::and([None, Some(w)]) };
            }
            let (_, args) = w.build();
            prop_assert_eq!(args, vec![json!("left"), json!("right")]);
        }
    }
}
