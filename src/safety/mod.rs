//! Statement classification.
//!
//! Parses SQL and decides whether it only reads data or writes it, so the
//! executor can pick the read path (materialize rows) or the write path
//! (run in a transaction and commit), and the front-ends can gate writes
//! behind the admin password.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

/// Whether a statement only reads data or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Returns rows without side effects (SELECT, plain EXPLAIN, SHOW).
    Read,
    /// Changes data or schema (INSERT, UPDATE, DELETE, DDL, GRANT...).
    Write,
}

impl StatementKind {
    /// Returns true for read statements.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Show,
    Merge,
    /// Multiple statements detected; contains the most impactful type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Merge => write!(f, "MERGE"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Read or write.
    pub kind: StatementKind,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
    /// True when the statement can remove data or schema.
    pub destructive: bool,
    /// False when the SQL could not be parsed and the leading keyword decided.
    pub parsed: bool,
}

impl Classification {
    /// Returns true if the statement only reads.
    pub fn is_read(&self) -> bool {
        self.kind.is_read()
    }

    /// Returns a warning to show before running the statement, if any.
    pub fn warning(&self) -> Option<&'static str> {
        if !self.parsed {
            Some("Could not parse SQL. Please review carefully.")
        } else if self.destructive {
            Some("This action cannot be undone.")
        } else {
            None
        }
    }
}
