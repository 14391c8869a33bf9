//! Two-table join model
//!
//! A [`Joint`] relates a base record type (E1) to a joined one (E2) through one or
//! more column-pair equalities. It renders either as a real join clause for
//! [`select_join_sql`](crate::sql::select_join_sql) or, through [`where_from_join`],
//! as a correlated `EXISTS` predicate usable anywhere a [`Where`] is accepted.
//!
//! # LEFT JOIN and top-level filters
//!
//! A filter on a LEFT-JOINed table's column placed in the statement's WHERE clause
//! turns the LEFT JOIN into an INNER JOIN: unmatched rows carry NULL in that column,
//! and no comparison against NULL is true, so those rows are dropped. This is plain
//! SQL semantics and nothing here rewrites it. To keep unmatched rows, put the
//! filter in the ON group with [`Joint::filter`].
//!
//! ```
//! use metasql::{Schema, FieldMeta, LogicalType};
//! use metasql::sql::join;
//!
//! let accounts = Schema::new("accounts", vec![FieldMeta::new("id", LogicalType::I64)]).unwrap();
//! let profiles = Schema::new(
//!     "profiles",
//!     vec![FieldMeta::new("account_id", LogicalType::I64), FieldMeta::new("bio", LogicalType::String)],
//! )
//! .unwrap();
//!
//! let joint = join::left_join(
//!     &accounts.field("id").unwrap(),
//!     &profiles.field("account_id").unwrap(),
//! )
//! .filter(profiles.field("bio").unwrap().is_not_null());
//!
//! assert_eq!(
//!     joint.clause(),
//!     "LEFT JOIN profiles ON (accounts.id = profiles.account_id AND profiles.bio IS NOT NULL)"
//! );
//! ```

use serde_json::Value;

use crate::error::{MetaSqlError, Result};
use crate::schema::Field;
use crate::sql::condition::Where;

/// Alias suffix for the inner occurrence of a self-joined table
pub const SELF_JOIN_SUFFIX: &str = "_2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// Join descriptor: keyword, joined table and its ON group
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    kind: JoinKind,
    table: String,
    alias: Option<String>,
    on: Vec<Where>,
}

/// `INNER JOIN` on `left = right`; the joined table is `right`'s
pub fn join(left: &Field, right: &Field) -> Joint {
    Joint::new(JoinKind::Inner, left, right, None)
}

/// `LEFT JOIN` on `left = right`; the joined table is `right`'s
pub fn left_join(left: &Field, right: &Field) -> Joint {
    Joint::new(JoinKind::Left, left, right, None)
}

/// [`join`] with a caller-chosen alias for the joined table
pub fn join_as(left: &Field, right: &Field, alias: impl Into<String>) -> Joint {
    Joint::new(JoinKind::Inner, left, right, Some(alias.into()))
}

/// [`left_join`] with a caller-chosen alias for the joined table
pub fn left_join_as(left: &Field, right: &Field, alias: impl Into<String>) -> Joint {
    Joint::new(JoinKind::Left, left, right, Some(alias.into()))
}

/// Fold a join's ON group into a correlated `EXISTS` predicate
///
/// Renders `EXISTS (SELECT 1 FROM <table> WHERE (<on predicates>))`. No FROM entry
/// is added to the outer statement, so this composes with real joins.
pub fn where_from_join(joint: &Joint) -> Where {
    Where::exists(joint.clone())
}

impl Joint {
    fn new(kind: JoinKind, left: &Field, right: &Field, alias: Option<String>) -> Self {
        let alias = alias.or_else(|| {
            if right.qualifier() != right.table() {
                Some(right.qualifier().to_string())
            } else if left.qualifier() == right.table() {
                Some(format!("{}{}", right.table(), SELF_JOIN_SUFFIX))
            } else {
                None
            }
        });

        let right = match &alias {
            Some(alias) => right.aliased(alias.clone()),
            None => right.clone(),
        };

        Self {
            kind,
            table: right.table().to_string(),
            alias,
            on: vec![Where::column_eq(left, &right)],
        }
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Joined table name
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name the joined table's columns are qualified with
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Merge another joint's ON predicates into this group
    ///
    /// Both joints must target the same table occurrence (same table and alias).
    pub fn and(mut self, other: Joint) -> Result<Joint> {
        if other.table != self.table || other.qualifier() != self.qualifier() {
            return Err(MetaSqlError::JoinTargetMismatch {
                expected: self.qualifier().to_string(),
                found: other.qualifier().to_string(),
            });
        }
        self.on.extend(other.on);
        Ok(self)
    }

    /// Add an arbitrary predicate to the ON group
    pub fn filter(mut self, predicate: Where) -> Joint {
        if !predicate.is_empty() {
            self.on.push(predicate);
        }
        self
    }

    fn target(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.table, alias),
            None => self.table.clone(),
        }
    }

    fn on_group(&self) -> (String, Vec<Value>) {
        Where::and(self.on.iter().cloned()).build()
    }

    /// Join clause text and the arguments of its ON-group filters
    pub fn build(&self) -> (String, Vec<Value>) {
        let (on, args) = self.on_group();
        (format!("{} {} ON {}", self.kind.as_sql(), self.target(), on), args)
    }

    /// Join clause text
    pub fn clause(&self) -> String {
        self.build().0
    }

    pub(crate) fn exists_clause(&self) -> (String, Vec<Value>) {
        let (on, args) = self.on_group();
        (format!("EXISTS (SELECT 1 FROM {} WHERE {})", self.target(), on), args)
    }
}
