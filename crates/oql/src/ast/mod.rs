//! Abstract syntax tree.
//!
//! One [`Query`] per parsed statement, a tagged union keyed by statement
//! family. Pure data: the parser builds it in one pass, a translator walks
//! it in one pass, nothing mutates it in between. Set operations and view
//! definitions own nested `Box<Query>` nodes, so the whole thing stays a
//! strict tree.

mod expr;

pub use expr::{
    BinaryOp, CaseBranch, CompareOp, Comparison, Condition, ConditionNode, Expr, Literal, Logic,
};

use crate::registry::{Group, Operation};
use crate::token::Position;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Query {
    Select(SelectQuery),
    Mutation(MutationQuery),
    /// UNION / UNION ALL / INTERSECT / EXCEPT over two nested queries.
    Compound(CompoundQuery),
    Ddl(DdlQuery),
    Tcl(TclQuery),
    Dcl(DclQuery),
}

impl Query {
    pub fn position(&self) -> Position {
        match self {
            Query::Select(q) => q.position,
            Query::Mutation(q) => q.position,
            Query::Compound(q) => q.position,
            Query::Ddl(q) => q.position,
            Query::Tcl(q) => q.position,
            Query::Dcl(q) => q.position,
        }
    }

    pub fn family(&self) -> Group {
        match self {
            Query::Select(_) | Query::Compound(_) => Group::Dql,
            Query::Mutation(_) => Group::Crud,
            Query::Ddl(_) => Group::Ddl,
            Query::Tcl(_) => Group::Tcl,
            Query::Dcl(_) => Group::Dcl,
        }
    }
}

// ============ DQL ============

/// `GET ...` with every read-side clause. Unused clauses stay empty/None.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectQuery {
    pub entity: String,
    pub position: Position,
    /// Explicit projection columns; empty means wildcard.
    pub columns: Vec<Expr>,
    /// `WITH <expr> [AS alias], ...` computed projections.
    pub projections: Vec<Projection>,
    pub distinct: Option<Distinct>,
    pub aggregate: Option<Aggregate>,
    pub windows: Vec<WindowFunc>,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub group_by: Vec<Expr>,
    pub having: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// `LIKE '<pattern>'` clause; key/name pattern for key-value targets.
    pub like_pattern: Option<String>,
}

impl SelectQuery {
    pub fn new(entity: impl Into<String>, position: Position) -> Self {
        SelectQuery {
            entity: entity.into(),
            position,
            columns: Vec::new(),
            projections: Vec::new(),
            distinct: None,
            aggregate: None,
            windows: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            like_pattern: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// `DISTINCT` flag; empty column list means distinct over the projection.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Distinct {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "COUNT" => AggFunc::Count,
            "SUM" => AggFunc::Sum,
            "AVG" => AggFunc::Avg,
            "MIN" => AggFunc::Min,
            "MAX" => AggFunc::Max,
            _ => return None,
        })
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub func: AggFunc,
    /// None means `COUNT` over whole rows.
    pub field: Option<String>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    pub kind: JoinKind,
    pub entity: String,
    pub left_field: String,
    pub right_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowFn {
    RowNumber,
    Rank,
    DenseRank,
    Lag,
    Lead,
    Ntile,
}

impl WindowFn {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "ROW_NUMBER" => WindowFn::RowNumber,
            "RANK" => WindowFn::Rank,
            "DENSE_RANK" => WindowFn::DenseRank,
            "LAG" => WindowFn::Lag,
            "LEAD" => WindowFn::Lead,
            "NTILE" => WindowFn::Ntile,
            _ => return None,
        })
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            WindowFn::RowNumber => "ROW_NUMBER",
            WindowFn::Rank => "RANK",
            WindowFn::DenseRank => "DENSE_RANK",
            WindowFn::Lag => "LAG",
            WindowFn::Lead => "LEAD",
            WindowFn::Ntile => "NTILE",
        }
    }

    pub fn default_alias(self) -> &'static str {
        match self {
            WindowFn::RowNumber => "row_number",
            WindowFn::Rank => "rank",
            WindowFn::DenseRank => "dense_rank",
            WindowFn::Lag => "lag",
            WindowFn::Lead => "lead",
            WindowFn::Ntile => "ntile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowFunc {
    pub func: WindowFn,
    /// LAG/LEAD operand field.
    pub field: Option<String>,
    /// LAG/LEAD lookback/lookahead distance (defaults to 1).
    pub offset: Option<i64>,
    /// NTILE bucket count.
    pub buckets: Option<u32>,
    pub partition_by: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetOpKind {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOpKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            SetOpKind::Union => "UNION",
            SetOpKind::UnionAll => "UNION ALL",
            SetOpKind::Intersect => "INTERSECT",
            SetOpKind::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundQuery {
    pub kind: SetOpKind,
    pub left: Box<Query>,
    pub right: Box<Query>,
    pub position: Position,
}

// ============ CRUD writes ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationOp {
    Create,
    Update,
    Delete,
    Upsert,
    BulkInsert,
    Replace,
}

impl MutationOp {
    pub fn operation(self) -> Operation {
        match self {
            MutationOp::Create => Operation::Create,
            MutationOp::Update => Operation::Update,
            MutationOp::Delete => Operation::Delete,
            MutationOp::Upsert => Operation::Upsert,
            MutationOp::BulkInsert => Operation::BulkInsert,
            MutationOp::Replace => Operation::Replace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub field: String,
    pub value: Expr,
}

/// `ON CONFLICT f1, f2 [UPDATE assignments]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictSpec {
    pub targets: Vec<String>,
    pub update: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationQuery {
    pub op: MutationOp,
    pub entity: String,
    pub position: Position,
    pub assignments: Vec<Assignment>,
    /// BULK INSERT column list.
    pub columns: Vec<String>,
    /// BULK INSERT row values, one inner vec per row.
    pub rows: Vec<Vec<Expr>>,
    pub conditions: Vec<Condition>,
    pub conflict: Option<ConflictSpec>,
}

impl MutationQuery {
    pub fn new(op: MutationOp, entity: impl Into<String>, position: Position) -> Self {
        MutationQuery {
            op,
            entity: entity.into(),
            position,
            assignments: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            conditions: Vec::new(),
            conflict: None,
        }
    }
}

// ============ DDL ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    ModifyColumn(ColumnDef),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SequenceAttrs {
    pub start: Option<i64>,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: Option<bool>,
    pub restart: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DomainAttrs {
    pub data_type: Option<String>,
    pub default: Option<String>,
    pub not_null: bool,
    pub check: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DdlQuery {
    pub position: Position,
    pub kind: DdlKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DdlKind {
    CreateTable { entity: String, columns: Vec<ColumnDef> },
    AlterTable { entity: String, action: AlterAction },
    DropTable { entity: String, cascade: bool },
    RenameTable { from: String, to: String },
    Truncate { entity: String },
    CreateIndex { name: String, entity: String, columns: Vec<String>, unique: bool },
    DropIndex { name: String },
    CreateDatabase { name: String },
    DropDatabase { name: String },
    CreateView { name: String, query: Box<Query> },
    AlterView { name: String, query: Box<Query> },
    DropView { name: String },
    CreateSequence { name: String, attrs: SequenceAttrs },
    AlterSequence { name: String, attrs: SequenceAttrs },
    DropSequence { name: String },
    CreateExtension { name: String, version: Option<String>, schema: Option<String> },
    DropExtension { name: String },
    CreateSchema { name: String, authorization: Option<String> },
    DropSchema { name: String, cascade: bool },
    CreateType { name: String, values: Vec<String> },
    DropType { name: String },
    CreateDomain { name: String, attrs: DomainAttrs },
    AlterDomain { name: String, attrs: DomainAttrs },
    DropDomain { name: String },
    CreateFunction {
        name: String,
        returns: Option<String>,
        language: Option<String>,
        body: String,
    },
    DropFunction { name: String },
    CreateTrigger {
        name: String,
        table: String,
        timing: String,
        event: String,
        function: String,
    },
    DropTrigger { name: String, table: String },
    CreatePolicy {
        name: String,
        table: String,
        for_op: Option<String>,
        to_role: Option<String>,
        using: Option<String>,
    },
    DropPolicy { name: String, table: String },
    CreateRule { name: String, table: String, event: String, action: String },
    DropRule { name: String, table: String },
    CommentOn { object_kind: String, name: String, comment: String },
}

impl DdlKind {
    pub fn operation(&self) -> Operation {
        match self {
            DdlKind::CreateTable { .. } => Operation::CreateTable,
            DdlKind::AlterTable { .. } => Operation::AlterTable,
            DdlKind::DropTable { .. } => Operation::DropTable,
            DdlKind::RenameTable { .. } => Operation::RenameTable,
            DdlKind::Truncate { .. } => Operation::TruncateTable,
            DdlKind::CreateIndex { .. } => Operation::CreateIndex,
            DdlKind::DropIndex { .. } => Operation::DropIndex,
            DdlKind::CreateDatabase { .. } => Operation::CreateDatabase,
            DdlKind::DropDatabase { .. } => Operation::DropDatabase,
            DdlKind::CreateView { .. } => Operation::CreateView,
            DdlKind::AlterView { .. } => Operation::AlterView,
            DdlKind::DropView { .. } => Operation::DropView,
            DdlKind::CreateSequence { .. } => Operation::CreateSequence,
            DdlKind::AlterSequence { .. } => Operation::AlterSequence,
            DdlKind::DropSequence { .. } => Operation::DropSequence,
            DdlKind::CreateExtension { .. } => Operation::CreateExtension,
            DdlKind::DropExtension { .. } => Operation::DropExtension,
            DdlKind::CreateSchema { .. } => Operation::CreateSchema,
            DdlKind::DropSchema { .. } => Operation::DropSchema,
            DdlKind::CreateType { .. } => Operation::CreateType,
            DdlKind::DropType { .. } => Operation::DropType,
            DdlKind::CreateDomain { .. } => Operation::CreateDomain,
            DdlKind::AlterDomain { .. } => Operation::AlterDomain,
            DdlKind::DropDomain { .. } => Operation::DropDomain,
            DdlKind::CreateFunction { .. } => Operation::CreateFunction,
            DdlKind::DropFunction { .. } => Operation::DropFunction,
            DdlKind::CreateTrigger { .. } => Operation::CreateTrigger,
            DdlKind::DropTrigger { .. } => Operation::DropTrigger,
            DdlKind::CreatePolicy { .. } => Operation::CreatePolicy,
            DdlKind::DropPolicy { .. } => Operation::DropPolicy,
            DdlKind::CreateRule { .. } => Operation::CreateRule,
            DdlKind::DropRule { .. } => Operation::DropRule,
            DdlKind::CommentOn { .. } => Operation::CommentOn,
        }
    }
}

// ============ TCL ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TclOp {
    Begin,
    Commit,
    Rollback,
    RollbackTo,
    Savepoint,
    ReleaseSavepoint,
    SetTransaction,
}

impl TclOp {
    pub fn operation(self) -> Operation {
        match self {
            TclOp::Begin => Operation::Begin,
            TclOp::Commit => Operation::Commit,
            TclOp::Rollback => Operation::Rollback,
            TclOp::RollbackTo => Operation::RollbackTo,
            TclOp::Savepoint => Operation::Savepoint,
            TclOp::ReleaseSavepoint => Operation::ReleaseSavepoint,
            TclOp::SetTransaction => Operation::SetTransaction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "READ UNCOMMITTED" => IsolationLevel::ReadUncommitted,
            "READ COMMITTED" => IsolationLevel::ReadCommitted,
            "REPEATABLE READ" => IsolationLevel::RepeatableRead,
            "SERIALIZABLE" => IsolationLevel::Serializable,
            _ => return None,
        })
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TclQuery {
    pub op: TclOp,
    pub position: Position,
    pub savepoint: Option<String>,
    pub isolation: Option<IsolationLevel>,
    pub read_only: Option<bool>,
}

// ============ DCL ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DclOp {
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

impl DclOp {
    pub fn operation(self) -> Operation {
        match self {
            DclOp::Grant => Operation::Grant,
            DclOp::Revoke => Operation::Revoke,
            DclOp::CreateUser => Operation::CreateUser,
            DclOp::AlterUser => Operation::AlterUser,
            DclOp::DropUser => Operation::DropUser,
            DclOp::CreateRole => Operation::CreateRole,
            DclOp::DropRole => Operation::DropRole,
            DclOp::AssignRole => Operation::AssignRole,
            DclOp::RevokeRole => Operation::RevokeRole,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DclQuery {
    pub op: DclOp,
    pub position: Position,
    /// GRANT/REVOKE permission keywords.
    pub permissions: Vec<String>,
    /// GRANT/REVOKE target entity, `*` for all.
    pub target: Option<String>,
    /// User names affected (grantee, created/dropped user).
    pub users: Vec<String>,
    pub roles: Vec<String>,
    pub password: Option<String>,
}

impl DclQuery {
    pub fn new(op: DclOp, position: Position) -> Self {
        DclQuery {
            op,
            position,
            permissions: Vec::new(),
            target: None,
            users: Vec::new(),
            roles: Vec::new(),
            password: None,
        }
    }
}
