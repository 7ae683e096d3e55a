//! Keyword/operator registry.
//!
//! Pure static lookup tables: operation keyword -> statement group and
//! canonical [`Operation`], clause membership, operator -> category, window
//! function metadata, and per-backend operation-name translations. Built once
//! at startup and passed by reference into the lexer, parser, and
//! translators; never mutated afterwards, so sharing across threads is free.
//!
//! Also hosts the Levenshtein typo-suggestion used to decorate lex/parse
//! errors ("unknown token 'X'. Did you mean 'Y'?").

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;

/// Statement family a recognized operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Group {
    Crud,
    Ddl,
    Dql,
    Tcl,
    Dcl,
}

/// Closed set of operations the language understands. The parser dispatches
/// on this, never on raw keyword strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    // DQL
    Get,
    // CRUD writes
    Create,
    Update,
    Delete,
    Upsert,
    BulkInsert,
    Replace,
    // DDL
    CreateTable,
    AlterTable,
    DropTable,
    RenameTable,
    TruncateTable,
    CreateIndex,
    DropIndex,
    CreateDatabase,
    DropDatabase,
    CreateView,
    AlterView,
    DropView,
    CreateSequence,
    AlterSequence,
    DropSequence,
    CreateExtension,
    DropExtension,
    CreateSchema,
    DropSchema,
    CreateType,
    DropType,
    CreateDomain,
    AlterDomain,
    DropDomain,
    CreateFunction,
    DropFunction,
    CreateTrigger,
    DropTrigger,
    CreatePolicy,
    DropPolicy,
    CreateRule,
    DropRule,
    CommentOn,
    // TCL
    Begin,
    Commit,
    Rollback,
    RollbackTo,
    Savepoint,
    ReleaseSavepoint,
    SetTransaction,
    // DCL
    Grant,
    Revoke,
    CreateUser,
    AlterUser,
    DropUser,
    CreateRole,
    DropRole,
    AssignRole,
    RevokeRole,
}

impl Operation {
    pub fn group(self) -> Group {
        use Operation::*;
        match self {
            Get => Group::Dql,
            Create | Update | Delete | Upsert | BulkInsert | Replace => Group::Crud,
            Begin | Commit | Rollback | RollbackTo | Savepoint | ReleaseSavepoint
            | SetTransaction => Group::Tcl,
            Grant | Revoke | CreateUser | AlterUser | DropUser | CreateRole | DropRole
            | AssignRole | RevokeRole => Group::Dcl,
            _ => Group::Ddl,
        }
    }

    /// Canonical keyword spelling, as the lexer emits it.
    pub fn keyword(self) -> &'static str {
        use Operation::*;
        match self {
            Get => "GET",
            Create => "CREATE",
            Update => "UPDATE",
            Delete => "DELETE",
            Upsert => "UPSERT",
            BulkInsert => "BULK INSERT",
            Replace => "REPLACE",
            CreateTable => "CREATE TABLE",
            AlterTable => "ALTER TABLE",
            DropTable => "DROP TABLE",
            RenameTable => "RENAME TABLE",
            TruncateTable => "TRUNCATE TABLE",
            CreateIndex => "CREATE INDEX",
            DropIndex => "DROP INDEX",
            CreateDatabase => "CREATE DATABASE",
            DropDatabase => "DROP DATABASE",
            CreateView => "CREATE VIEW",
            AlterView => "ALTER VIEW",
            DropView => "DROP VIEW",
            CreateSequence => "CREATE SEQUENCE",
            AlterSequence => "ALTER SEQUENCE",
            DropSequence => "DROP SEQUENCE",
            CreateExtension => "CREATE EXTENSION",
            DropExtension => "DROP EXTENSION",
            CreateSchema => "CREATE SCHEMA",
            DropSchema => "DROP SCHEMA",
            CreateType => "CREATE TYPE",
            DropType => "DROP TYPE",
            CreateDomain => "CREATE DOMAIN",
            AlterDomain => "ALTER DOMAIN",
            DropDomain => "DROP DOMAIN",
            CreateFunction => "CREATE FUNCTION",
            DropFunction => "DROP FUNCTION",
            CreateTrigger => "CREATE TRIGGER",
            DropTrigger => "DROP TRIGGER",
            CreatePolicy => "CREATE POLICY",
            DropPolicy => "DROP POLICY",
            CreateRule => "CREATE RULE",
            DropRule => "DROP RULE",
            CommentOn => "COMMENT ON",
            Begin => "BEGIN",
            Commit => "COMMIT",
            Rollback => "ROLLBACK",
            RollbackTo => "ROLLBACK TO",
            Savepoint => "SAVEPOINT",
            ReleaseSavepoint => "RELEASE SAVEPOINT",
            SetTransaction => "SET TRANSACTION",
            Grant => "GRANT",
            Revoke => "REVOKE",
            CreateUser => "CREATE USER",
            AlterUser => "ALTER USER",
            DropUser => "DROP USER",
            CreateRole => "CREATE ROLE",
            DropRole => "DROP ROLE",
            AssignRole => "ASSIGN ROLE",
            RevokeRole => "REVOKE ROLE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Operator category, per the condition grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperatorCategory {
    /// `=`, `!=`, `<`, `<=`, `>`, `>=`, `LIKE`, `NOT LIKE`
    Comparison,
    /// `BETWEEN`, `NOT BETWEEN`
    Range,
    /// `IN`, `NOT IN`
    MultiValue,
    /// `IS NULL`, `IS NOT NULL`
    NullCheck,
}

/// Per-window-function shape: whether it takes a field before OVER, and
/// whether it requires a leading integer bucket count (NTILE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFnInfo {
    pub has_field: bool,
    pub has_buckets: bool,
}

/// How the lexer classifies a scanned word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Operation(Operation),
    Clause,
    Operator,
    Bool,
    Ident,
}

/// Immutable lookup tables shared by lexer, parser, and translators.
pub struct Registry {
    operations: IndexMap<&'static str, Operation>,
    clauses: IndexSet<&'static str>,
    operators: IndexMap<&'static str, OperatorCategory>,
    window_fns: IndexMap<&'static str, WindowFnInfo>,
    aggregates: IndexSet<&'static str>,
    /// Every folded two-word keyword, for the lexer's lookahead.
    two_word: IndexSet<&'static str>,
    pipeline_ops: IndexMap<Operation, &'static str>,
    keyvalue_commands: IndexMap<Operation, &'static str>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        use Operation::*;

        let operations: IndexMap<&'static str, Operation> = [
            ("GET", Get),
            ("CREATE", Create),
            ("UPDATE", Update),
            ("DELETE", Delete),
            ("UPSERT", Upsert),
            ("BULK INSERT", BulkInsert),
            ("REPLACE", Replace),
            ("CREATE TABLE", CreateTable),
            ("ALTER TABLE", AlterTable),
            ("DROP TABLE", DropTable),
            ("RENAME TABLE", RenameTable),
            ("TRUNCATE", TruncateTable),
            ("TRUNCATE TABLE", TruncateTable),
            ("CREATE INDEX", CreateIndex),
            ("DROP INDEX", DropIndex),
            ("CREATE DATABASE", CreateDatabase),
            ("DROP DATABASE", DropDatabase),
            ("CREATE VIEW", CreateView),
            ("ALTER VIEW", AlterView),
            ("DROP VIEW", DropView),
            ("CREATE SEQUENCE", CreateSequence),
            ("ALTER SEQUENCE", AlterSequence),
            ("DROP SEQUENCE", DropSequence),
            ("CREATE EXTENSION", CreateExtension),
            ("DROP EXTENSION", DropExtension),
            ("CREATE SCHEMA", CreateSchema),
            ("DROP SCHEMA", DropSchema),
            ("CREATE TYPE", CreateType),
            ("DROP TYPE", DropType),
            ("CREATE DOMAIN", CreateDomain),
            ("ALTER DOMAIN", AlterDomain),
            ("DROP DOMAIN", DropDomain),
            ("CREATE FUNCTION", CreateFunction),
            ("DROP FUNCTION", DropFunction),
            ("CREATE TRIGGER", CreateTrigger),
            ("DROP TRIGGER", DropTrigger),
            ("CREATE POLICY", CreatePolicy),
            ("DROP POLICY", DropPolicy),
            ("CREATE RULE", CreateRule),
            ("DROP RULE", DropRule),
            ("COMMENT ON", CommentOn),
            ("BEGIN", Begin),
            ("START TRANSACTION", Begin),
            ("COMMIT", Commit),
            ("ROLLBACK", Rollback),
            ("ROLLBACK TO", RollbackTo),
            ("SAVEPOINT", Savepoint),
            ("RELEASE SAVEPOINT", ReleaseSavepoint),
            ("SET TRANSACTION", SetTransaction),
            ("GRANT", Grant),
            ("REVOKE", Revoke),
            ("CREATE USER", CreateUser),
            ("ALTER USER", AlterUser),
            ("DROP USER", DropUser),
            ("CREATE ROLE", CreateRole),
            ("DROP ROLE", DropRole),
            ("ASSIGN ROLE", AssignRole),
            ("REVOKE ROLE", RevokeRole),
        ]
        .into_iter()
        .collect();

        let clauses: IndexSet<&'static str> = [
            "WHERE",
            "FROM",
            "ORDER BY",
            "GROUP BY",
            "HAVING",
            "LIMIT",
            "OFFSET",
            "DISTINCT",
            "WITH",
            "JOIN",
            "INNER JOIN",
            "LEFT JOIN",
            "RIGHT JOIN",
            "FULL JOIN",
            "ON",
            "AS",
            "VALUES",
            "ON CONFLICT",
            "OVER",
            "PARTITION BY",
            "ASC",
            "DESC",
            "CASE",
            "WHEN",
            "THEN",
            "ELSE",
            "END",
            "TO",
            "CASCADE",
            "PASSWORD",
            "ISOLATION LEVEL",
            "READ ONLY",
            "READ WRITE",
            "READ COMMITTED",
            "READ UNCOMMITTED",
            "REPEATABLE READ",
            "SERIALIZABLE",
            "UNION",
            "UNION ALL",
            "INTERSECT",
            "EXCEPT",
        ]
        .into_iter()
        .collect();

        let operators: IndexMap<&'static str, OperatorCategory> = [
            ("=", OperatorCategory::Comparison),
            ("!=", OperatorCategory::Comparison),
            ("<", OperatorCategory::Comparison),
            ("<=", OperatorCategory::Comparison),
            (">", OperatorCategory::Comparison),
            (">=", OperatorCategory::Comparison),
            ("LIKE", OperatorCategory::Comparison),
            ("NOT LIKE", OperatorCategory::Comparison),
            ("BETWEEN", OperatorCategory::Range),
            ("NOT BETWEEN", OperatorCategory::Range),
            ("IN", OperatorCategory::MultiValue),
            ("NOT IN", OperatorCategory::MultiValue),
            ("IS NULL", OperatorCategory::NullCheck),
            ("IS NOT", OperatorCategory::NullCheck),
        ]
        .into_iter()
        .collect();

        let window_fns: IndexMap<&'static str, WindowFnInfo> = [
            ("ROW_NUMBER", WindowFnInfo { has_field: false, has_buckets: false }),
            ("RANK", WindowFnInfo { has_field: false, has_buckets: false }),
            ("DENSE_RANK", WindowFnInfo { has_field: false, has_buckets: false }),
            ("LAG", WindowFnInfo { has_field: true, has_buckets: false }),
            ("LEAD", WindowFnInfo { has_field: true, has_buckets: false }),
            ("NTILE", WindowFnInfo { has_field: false, has_buckets: true }),
        ]
        .into_iter()
        .collect();

        let aggregates: IndexSet<&'static str> =
            ["COUNT", "SUM", "AVG", "MIN", "MAX"].into_iter().collect();

        let mut two_word: IndexSet<&'static str> = IndexSet::new();
        for key in operations.keys().chain(clauses.iter()) {
            if key.contains(' ') {
                two_word.insert(*key);
            }
        }
        for key in operators.keys() {
            if key.contains(' ') {
                two_word.insert(*key);
            }
        }

        let pipeline_ops: IndexMap<Operation, &'static str> = [
            (Get, "aggregate"),
            (Create, "insertOne"),
            (BulkInsert, "insertMany"),
            (Update, "updateMany"),
            (Delete, "deleteMany"),
            (Upsert, "updateOne"),
            (Replace, "replaceOne"),
            (CreateTable, "createCollection"),
            (DropTable, "drop"),
            (TruncateTable, "deleteMany"),
            (RenameTable, "renameCollection"),
            (CreateIndex, "createIndex"),
            (DropIndex, "dropIndex"),
            (CreateDatabase, "createDatabase"),
            (DropDatabase, "dropDatabase"),
            (CreateView, "createView"),
            (DropView, "drop"),
            (Begin, "startTransaction"),
            (Commit, "commitTransaction"),
            (Rollback, "abortTransaction"),
            (Grant, "grantRolesToUser"),
            (Revoke, "revokeRolesFromUser"),
            (CreateUser, "createUser"),
            (AlterUser, "updateUser"),
            (DropUser, "dropUser"),
            (CreateRole, "createRole"),
            (DropRole, "dropRole"),
            (AssignRole, "grantRolesToUser"),
            (RevokeRole, "revokeRolesFromUser"),
        ]
        .into_iter()
        .collect();

        let keyvalue_commands: IndexMap<Operation, &'static str> = [
            (Get, "HGETALL"),
            (Create, "HSET"),
            (Update, "HSET"),
            (Delete, "DEL"),
            (Upsert, "HSET"),
            (Replace, "HSET"),
            (DropTable, "DEL"),
            (TruncateTable, "DEL"),
            (Begin, "MULTI"),
            (Commit, "EXEC"),
            (Rollback, "DISCARD"),
            (Grant, "ACL SETUSER"),
            (Revoke, "ACL SETUSER"),
            (CreateUser, "ACL SETUSER"),
            (AlterUser, "ACL SETUSER"),
            (DropUser, "ACL DELUSER"),
        ]
        .into_iter()
        .collect();

        Registry {
            operations,
            clauses,
            operators,
            window_fns,
            aggregates,
            two_word,
            pipeline_ops,
            keyvalue_commands,
        }
    }

    /// Classify a single scanned word (already uppercased).
    pub fn classify(&self, upper: &str) -> WordClass {
        if let Some(op) = self.operations.get(upper) {
            WordClass::Operation(*op)
        } else if self.clauses.contains(upper) {
            WordClass::Clause
        } else if self.operators.contains_key(upper) {
            WordClass::Operator
        } else if upper == "TRUE" || upper == "FALSE" {
            WordClass::Bool
        } else {
            WordClass::Ident
        }
    }

    pub fn operation(&self, keyword: &str) -> Option<Operation> {
        self.operations.get(keyword).copied()
    }

    pub fn is_clause(&self, keyword: &str) -> bool {
        self.clauses.contains(keyword)
    }

    /// True if `combined` ("WORD WORD") folds into a single keyword token.
    pub fn is_two_word(&self, combined: &str) -> bool {
        self.two_word.contains(combined)
    }

    /// Category of a normalized operator token (symbolic or keyword).
    pub fn operator_category(&self, op: &str) -> Option<OperatorCategory> {
        self.operators.get(op).copied()
    }

    /// Normalize a symbolic operator scanned by the lexer. Unknown symbols
    /// return None, which the lexer reports as a LexError.
    pub fn normalize_symbol(&self, sym: &str) -> Option<&'static str> {
        match sym {
            "=" | "==" => Some("="),
            "!=" | "<>" => Some("!="),
            "<" => Some("<"),
            "<=" => Some("<="),
            ">" => Some(">"),
            ">=" => Some(">="),
            "+" => Some("+"),
            "-" => Some("-"),
            "*" => Some("*"),
            "/" => Some("/"),
            "%" => Some("%"),
            _ => None,
        }
    }

    pub fn is_aggregate(&self, word: &str) -> bool {
        self.aggregates.contains(word)
    }

    pub fn window_fn(&self, word: &str) -> Option<WindowFnInfo> {
        self.window_fns.get(word).copied()
    }

    /// Document-pipeline operation name for an operation, if one exists.
    pub fn pipeline_op(&self, op: Operation) -> Option<&'static str> {
        self.pipeline_ops.get(&op).copied()
    }

    /// Key-value command name for an operation, if one exists.
    pub fn keyvalue_command(&self, op: Operation) -> Option<&'static str> {
        self.keyvalue_commands.get(&op).copied()
    }

    // ============ Typo suggestion ============

    /// Best-effort "did you mean" lookup for an unknown token. Candidates are
    /// tried in fixed priority order: common operators, common operations,
    /// every remaining registry key, then first words of two-word clauses.
    pub fn suggest(&self, input: &str) -> Option<String> {
        let upper = input.to_ascii_uppercase();
        let max = if upper.len() < 6 { 2 } else { 3 };

        let common_operators = ["=", "!=", "<", "<=", ">", ">=", "LIKE", "BETWEEN", "IN"];
        let common_operations = ["GET", "CREATE", "UPDATE", "DELETE", "UPSERT"];

        let mut best: Option<(usize, &str)> = None;
        let consider = |candidate: &'static str, best: &mut Option<(usize, &'static str)>| {
            let d = levenshtein(&upper, candidate);
            if d <= max && best.map_or(true, |(bd, _)| d < bd) {
                *best = Some((d, candidate));
            }
        };

        for c in common_operators {
            consider(c, &mut best);
        }
        if let Some((0, hit)) = best {
            return Some(hit.to_string());
        }
        for c in common_operations {
            consider(c, &mut best);
        }
        for c in self.operations.keys().chain(self.clauses.iter()) {
            consider(c, &mut best);
        }
        for c in self.operators.keys().chain(self.window_fns.keys()) {
            consider(c, &mut best);
        }
        for c in &self.two_word {
            if let Some(first) = c.split(' ').next() {
                let d = levenshtein(&upper, first);
                if d <= max && best.map_or(true, |(bd, _)| d < bd) {
                    return Some(first.to_string());
                }
            }
        }

        best.map(|(_, hit)| hit.to_string())
    }
}

/// Classic two-row Levenshtein distance over bytes.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            cur[j + 1] = sub.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_stable() {
        let reg = Registry::new();
        for _ in 0..3 {
            assert_eq!(reg.classify("GET"), WordClass::Operation(Operation::Get));
            assert_eq!(reg.classify("WHERE"), WordClass::Clause);
            assert_eq!(reg.classify("BETWEEN"), WordClass::Operator);
            assert_eq!(reg.classify("TRUE"), WordClass::Bool);
            assert_eq!(reg.classify("FROBNICATE"), WordClass::Ident);
        }
    }

    #[test]
    fn operation_groups() {
        let reg = Registry::new();
        assert_eq!(reg.operation("GET").unwrap().group(), Group::Dql);
        assert_eq!(reg.operation("UPDATE").unwrap().group(), Group::Crud);
        assert_eq!(reg.operation("CREATE TABLE").unwrap().group(), Group::Ddl);
        assert_eq!(reg.operation("SAVEPOINT").unwrap().group(), Group::Tcl);
        assert_eq!(reg.operation("GRANT").unwrap().group(), Group::Dcl);
    }

    #[test]
    fn two_word_folding_table() {
        let reg = Registry::new();
        assert!(reg.is_two_word("CREATE TABLE"));
        assert!(reg.is_two_word("ORDER BY"));
        assert!(reg.is_two_word("NOT IN"));
        assert!(!reg.is_two_word("CREATE USERS"));
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("WHERE", "WHERE"), 0);
        assert_eq!(levenshtein("WHRE", "WHERE"), 1);
        assert_eq!(levenshtein("", "AB"), 2);
    }

    #[test]
    fn suggests_nearby_keywords() {
        let reg = Registry::new();
        assert_eq!(reg.suggest("WHRE").as_deref(), Some("WHERE"));
        assert_eq!(reg.suggest("GETT").as_deref(), Some("GET"));
        assert_eq!(reg.suggest("zzzzzzzzzz"), None);
    }
}
