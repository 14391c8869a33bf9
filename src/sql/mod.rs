//! SQL generation
//!
//! Predicates, joins, statement builders, DDL and identifier sanitization.

pub mod builder;
pub mod condition;
pub mod ddl;
pub mod join;
pub mod sanitize;

pub use builder::{
    Page, SortDirection, count_sql, delete_sql, insert_sql, select_join_sql, select_page_sql,
    select_sql, update_sql,
};
pub use condition::{CmpOp, Where};
pub use ddl::{DdlGenerator, DdlScript};
pub use join::{JoinKind, Joint, join, join_as, left_join, left_join_as, where_from_join};
pub use sanitize::{RESERVED_WORDS, is_reserved, quote_identifier, quote_if_reserved, validate_identifier};
