//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with PostgreSQL dialect to parse SQL and classify
//! statements as reads or writes.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::{Classification, StatementKind, StatementType};

/// How much a statement changes. Ordered from least to most impactful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Impact {
    Read,
    Modify,
    Destroy,
}

type Verdict = (Impact, StatementType);

/// Keeps whichever verdict has the higher impact; ties keep the first.
fn worst(current: Verdict, candidate: Verdict) -> Verdict {
    if candidate.0 > current.0 {
        candidate
    } else {
        current
    }
}

/// SQL classifier that parses and classifies SQL statements.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: PostgreSqlDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Classifies a SQL string.
    ///
    /// SQL that cannot be parsed is classified by its leading keyword: only a
    /// leading `SELECT` counts as a read.
    pub fn classify(&self, sql: &str) -> Classification {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) if !statements.is_empty() => statements,
            _ => return classify_lexically(sql),
        };

        let (impact, statement_type) = if statements.len() == 1 {
            classify_statement(&statements[0])
        } else {
            let (impact, inner) = statements
                .iter()
                .map(classify_statement)
                .fold((Impact::Read, StatementType::Select), worst);
            (impact, StatementType::Multiple(Box::new(inner)))
        };

        Classification {
            kind: kind_of(impact),
            statement_type,
            destructive: impact == Impact::Destroy,
            parsed: true,
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> Classification {
    SqlClassifier::new().classify(sql)
}

fn kind_of(impact: Impact) -> StatementKind {
    match impact {
        Impact::Read => StatementKind::Read,
        Impact::Modify | Impact::Destroy => StatementKind::Write,
    }
}

/// Fallback for SQL the parser rejects: a leading `select` token means read.
fn classify_lexically(sql: &str) -> Classification {
    let leading = sql
        .split(|c: char| c.is_whitespace() || c == '(')
        .find(|token| !token.is_empty())
        .unwrap_or("");

    let is_select = leading.eq_ignore_ascii_case("select");
    Classification {
        kind: if is_select {
            StatementKind::Read
        } else {
            StatementKind::Write
        },
        statement_type: if is_select {
            StatementType::Select
        } else {
            StatementType::Unknown
        },
        destructive: false,
        parsed: false,
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> Verdict {
    match statement {
        // Query: may contain data-modifying CTEs or SELECT INTO, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE runs the statement
                let (inner, _) = classify_statement(statement);
                (inner, StatementType::Explain)
            } else {
                (Impact::Read, StatementType::Explain)
            }
        }
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. } => (Impact::Read, StatementType::Show),

        Statement::Insert { .. } => (Impact::Modify, StatementType::Insert),
        Statement::Update { .. } => (Impact::Modify, StatementType::Update),
        Statement::Merge { .. } => (Impact::Modify, StatementType::Merge),

        Statement::Delete { .. } => (Impact::Destroy, StatementType::Delete),
        Statement::Drop { .. } => (Impact::Destroy, StatementType::Drop),
        Statement::Truncate { .. } => (Impact::Destroy, StatementType::Truncate),
        Statement::AlterTable { .. } | Statement::AlterIndex { .. } | Statement::AlterView { .. } => {
            (Impact::Destroy, StatementType::Alter)
        }
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. } => (Impact::Destroy, StatementType::Create),
        Statement::Grant { .. } => (Impact::Destroy, StatementType::Grant),
        Statement::Revoke { .. } => (Impact::Destroy, StatementType::Revoke),

        // Anything else (SET, COPY, CALL, transaction control...) is treated as a write
        _ => (Impact::Destroy, StatementType::Unknown),
    }
}

/// Classifies a Query, including its CTEs.
fn classify_query(query: &Query) -> Verdict {
    let mut verdict = (Impact::Read, StatementType::Select);

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            verdict = worst(verdict, classify_query(&cte.query));
        }
    }

    worst(verdict, classify_set_expr(&query.body))
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
fn classify_set_expr(set_expr: &SetExpr) -> Verdict {
    match set_expr {
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            worst(classify_set_expr(left), classify_set_expr(right))
        }
        _ => (Impact::Read, StatementType::Select),
    }
}

/// Classifies a Select: `SELECT ... INTO` creates a table, and derived
/// tables in FROM may hide mutations.
fn classify_select(select: &Select) -> Verdict {
    if select.into.is_some() {
        return (Impact::Modify, StatementType::Create);
    }

    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .fold((Impact::Read, StatementType::Select), worst)
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> Verdict {
    twj.joins
        .iter()
        .map(|join| classify_table_factor(&join.relation))
        .fold(classify_table_factor(&twj.relation), worst)
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> Verdict {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => (Impact::Read, StatementType::Select),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_classification(sql: &str, kind: StatementKind, statement_type: StatementType) {
        let result = classify_sql(sql);
        assert_eq!(result.kind, kind, "SQL: '{}' - got {:?}", sql, result);
        assert_eq!(
            result.statement_type, statement_type,
            "SQL: '{}' - got {:?}",
            sql, result
        );
        assert!(result.parsed, "SQL: '{}' should parse", sql);
    }

    #[test]
    fn test_select_is_read() {
        assert_classification(
            "SELECT * FROM flights LIMIT 1000",
            StatementKind::Read,
            StatementType::Select,
        );
    }

    #[test]
    fn test_example_join_query_is_read() {
        assert_classification(
            "SELECT p.passenger_id, COUNT(b.baggage_id) AS num_bags, AVG(b.weight) AS avg_weight
             FROM passengers p
             JOIN baggage b ON p.passenger_id = b.passenger_id
             GROUP BY p.passenger_id
             HAVING COUNT(b.baggage_id) >= 2
             ORDER BY avg_weight DESC",
            StatementKind::Read,
            StatementType::Select,
        );
    }

    #[test]
    fn test_lowercase_select_is_read() {
        assert_classification(
            "select flight_number from flights where flight_status = 'Delayed'",
            StatementKind::Read,
            StatementType::Select,
        );
    }

    #[test]
    fn test_cte_select_is_read() {
        assert_classification(
            "WITH delayed AS (SELECT * FROM flights WHERE flight_status = 'Delayed') SELECT * FROM delayed",
            StatementKind::Read,
            StatementType::Select,
        );
    }

    #[test]
    fn test_subquery_is_read() {
        assert_classification(
            "SELECT * FROM (SELECT airline_id FROM airlines) a",
            StatementKind::Read,
            StatementType::Select,
        );
    }

    #[test]
    fn test_explain_is_read() {
        assert_classification(
            "EXPLAIN SELECT * FROM weather",
            StatementKind::Read,
            StatementType::Explain,
        );
        assert_classification(
            "EXPLAIN DELETE FROM weather",
            StatementKind::Read,
            StatementType::Explain,
        );
    }

    #[test]
    fn test_explain_analyze_delete_is_write() {
        let result = classify_sql("EXPLAIN ANALYZE DELETE FROM weather");
        assert_eq!(result.kind, StatementKind::Write);
        assert_eq!(result.statement_type, StatementType::Explain);
        assert!(result.destructive);
    }

    #[test]
    fn test_show_is_read() {
        assert_classification("SHOW search_path", StatementKind::Read, StatementType::Show);
    }

    #[test]
    fn test_insert_is_write() {
        assert_classification(
            "INSERT INTO countries (country_name) VALUES ('Iceland')",
            StatementKind::Write,
            StatementType::Insert,
        );
        assert!(!classify_sql("INSERT INTO countries (country_name) VALUES ('Iceland')").destructive);
    }

    #[test]
    fn test_update_is_write() {
        assert_classification(
            "UPDATE flights SET flight_status = 'Cancelled' WHERE flight_id = 7",
            StatementKind::Write,
            StatementType::Update,
        );
    }

    #[test]
    fn test_delete_is_destructive_write() {
        let result = classify_sql("DELETE FROM baggage WHERE baggage_id = -1");
        assert_eq!(result.kind, StatementKind::Write);
        assert_eq!(result.statement_type, StatementType::Delete);
        assert!(result.destructive);
    }

    #[test]
    fn test_ddl_is_write() {
        assert_classification("DROP TABLE routes", StatementKind::Write, StatementType::Drop);
        assert_classification(
            "TRUNCATE TABLE incidents",
            StatementKind::Write,
            StatementType::Truncate,
        );
        assert_classification(
            "ALTER TABLE crew ADD COLUMN license_no TEXT",
            StatementKind::Write,
            StatementType::Alter,
        );
        assert_classification(
            "CREATE TABLE scratch (id INT)",
            StatementKind::Write,
            StatementType::Create,
        );
        assert_classification(
            "GRANT SELECT ON flights TO analyst",
            StatementKind::Write,
            StatementType::Grant,
        );
    }

    #[test]
    fn test_select_into_is_write() {
        let result = classify_sql("SELECT * INTO flights_backup FROM flights");
        assert_eq!(result.kind, StatementKind::Write);
    }

    #[test]
    fn test_cte_with_delete_is_write() {
        // Either parsed as a data-modifying CTE or rejected by the parser;
        // both must end up on the write path.
        let result =
            classify_sql("WITH d AS (DELETE FROM baggage RETURNING *) SELECT * FROM d");
        assert_eq!(result.kind, StatementKind::Write);
    }

    #[test]
    fn test_multi_statement_uses_most_impactful() {
        let result = classify_sql("SELECT * FROM flights; DELETE FROM incidents");
        assert_eq!(result.kind, StatementKind::Write);
        assert!(result.destructive);
        assert_eq!(
            result.statement_type,
            StatementType::Multiple(Box::new(StatementType::Delete))
        );

        let result = classify_sql("SELECT 1; SELECT 2");
        assert_eq!(result.kind, StatementKind::Read);
    }

    #[test]
    fn test_unparseable_select_falls_back_to_read() {
        let result = classify_sql("SELECT FROM WHERE ((");
        assert!(!result.parsed);
        assert_eq!(result.kind, StatementKind::Read);
        assert!(result.warning().is_some());
    }

    #[test]
    fn test_unparseable_other_falls_back_to_write() {
        let result = classify_sql("THIS IS NOT VALID SQL AT ALL");
        assert!(!result.parsed);
        assert_eq!(result.kind, StatementKind::Write);
        assert_eq!(result.statement_type, StatementType::Unknown);
    }

    #[test]
    fn test_empty_sql_is_not_read() {
        let result = classify_sql("   \n\t  ");
        assert!(!result.parsed);
        assert_eq!(result.kind, StatementKind::Write);
    }

    #[test]
    fn test_classifier_default() {
        let classifier = SqlClassifier::default();
        assert!(classifier.classify("SELECT 1").is_read());
    }
}
