//! CRUD statement grammars: `GET` reads (with the shared clause loop) and
//! the write operations (`CREATE`, `UPDATE`, `DELETE`, `UPSERT`,
//! `BULK INSERT`, `REPLACE`).

use crate::ast::{
    AggFunc, Aggregate, Assignment, ConflictSpec, Distinct, Expr, JoinKind, MutationOp,
    MutationQuery, OrderBy, Projection, Query, SelectQuery,
};
use crate::registry::Operation;
use crate::token::{Position, TokenKind};

use super::{ParseError, Parser};

impl Parser<'_> {
    // ============ GET ============

    /// `GET <Entity> ...` or `GET col, col FROM <Entity> ...`
    pub(crate) fn parse_get(&mut self, position: Position) -> Result<Query, ParseError> {
        self.advance(); // GET

        let first = self.expect_ident("entity or column name")?;
        let mut columns = Vec::new();
        let entity;

        if self.peek_kind() == Some(TokenKind::Comma)
            || self.peek().is_some_and(|t| t.is_word("FROM"))
        {
            columns.push(Expr::Field(first));
            while self.eat_kind(TokenKind::Comma) {
                columns.push(Expr::Field(self.expect_ident("column name")?));
            }
            self.expect_word("FROM")?;
            entity = self.expect_ident("entity name")?;
        } else {
            entity = first;
        }

        let mut query = SelectQuery::new(entity, position);
        query.columns = columns;

        // An aggregate keyword immediately after the entity promotes the
        // whole statement to an aggregate query.
        if let Some(func) = self.peek_aggregate() {
            self.advance();
            let distinct = self.eat_word("DISTINCT");
            let field = if self.peek_kind() == Some(TokenKind::Ident) {
                Some(self.advance().unwrap().text)
            } else {
                None
            };
            query.aggregate = Some(Aggregate {
                func,
                field,
                distinct,
            });
        }

        self.parse_select_clauses(&mut query)?;
        Ok(Query::Select(query))
    }

    fn peek_aggregate(&self) -> Option<AggFunc> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Ident {
            return None;
        }
        let upper = tok.text.to_ascii_uppercase();
        if self.registry.is_aggregate(&upper) {
            AggFunc::from_keyword(&upper)
        } else {
            None
        }
    }

    /// The common clause loop: classify the next token as a clause and
    /// dispatch until something that is not a clause shows up.
    fn parse_select_clauses(&mut self, query: &mut SelectQuery) -> Result<(), ParseError> {
        loop {
            let Some(tok) = self.peek().cloned() else {
                return Ok(());
            };

            match tok.kind {
                TokenKind::Clause => match tok.text.as_str() {
                    "WHERE" => {
                        self.advance();
                        query.conditions = self.parse_condition_list()?;
                    }
                    "ORDER BY" => {
                        self.advance();
                        query.order_by = self.parse_order_list()?;
                    }
                    "GROUP BY" => {
                        self.advance();
                        query.group_by = self.parse_field_exprs()?;
                    }
                    "HAVING" => {
                        self.advance();
                        query.having = self.parse_condition_list()?;
                    }
                    "LIMIT" => {
                        self.advance();
                        query.limit = Some(self.parse_count("LIMIT")?);
                    }
                    "OFFSET" => {
                        self.advance();
                        query.offset = Some(self.parse_count("OFFSET")?);
                    }
                    "DISTINCT" => {
                        self.advance();
                        query.distinct = Some(self.parse_distinct());
                    }
                    "WITH" => {
                        self.advance();
                        self.parse_projection_list(query)?;
                    }
                    "JOIN" | "INNER JOIN" => self.parse_join(query, JoinKind::Inner)?,
                    "LEFT JOIN" => self.parse_join(query, JoinKind::Left)?,
                    "RIGHT JOIN" => self.parse_join(query, JoinKind::Right)?,
                    "FULL JOIN" => self.parse_join(query, JoinKind::Full)?,
                    _ => {
                        return Err(self.error(format!("unexpected clause {tok} here")));
                    }
                },
                TokenKind::Operator if tok.text == "LIKE" => {
                    self.advance();
                    query.like_pattern = Some(self.expect_string("pattern string after LIKE")?);
                }
                TokenKind::RParen | TokenKind::Semicolon => return Ok(()),
                TokenKind::Ident => {
                    return Err(self.error_with_suggestion(
                        format!("unexpected token {tok}"),
                        &tok.text,
                    ));
                }
                _ => return Ok(()),
            }
        }
    }

    pub(crate) fn parse_order_list(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        let mut out = Vec::new();
        loop {
            let field = self.expect_ident("column name in ORDER BY")?;
            let descending = if self.eat_word("DESC") {
                true
            } else {
                self.eat_word("ASC");
                false
            };
            out.push(OrderBy { field, descending });
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(out)
    }

    fn parse_field_exprs(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut out = Vec::new();
        loop {
            out.push(self.parse_additive()?);
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(out)
    }

    fn parse_count(&mut self, clause: &str) -> Result<u64, ParseError> {
        let text = self.expect_number(&format!("number after {clause}"))?;
        text.parse::<u64>()
            .map_err(|_| self.error(format!("{clause} requires a non-negative integer")))
    }

    /// Optional bare column list after DISTINCT; stops before the next clause.
    fn parse_distinct(&mut self) -> Distinct {
        let mut columns = Vec::new();
        while self.peek_kind() == Some(TokenKind::Ident) {
            columns.push(self.advance().unwrap().text);
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Distinct { columns }
    }

    /// `WITH <expr> [AS alias], <WINFN> ... OVER (...) [AS alias], ...`
    fn parse_projection_list(&mut self, query: &mut SelectQuery) -> Result<(), ParseError> {
        loop {
            if self.peek_window_fn().is_some() {
                let window = self.parse_window_function()?;
                query.windows.push(window);
            } else {
                let expr = self.parse_expr()?;
                let alias = if self.eat_word("AS") {
                    Some(self.expect_ident("alias after AS")?)
                } else {
                    None
                };
                query.projections.push(Projection { expr, alias });
            }
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    // ============ Writes ============

    pub(crate) fn parse_mutation(
        &mut self,
        operation: Operation,
        position: Position,
    ) -> Result<Query, ParseError> {
        self.advance(); // operation token

        let op = match operation {
            Operation::Create => MutationOp::Create,
            Operation::Update => MutationOp::Update,
            Operation::Delete => MutationOp::Delete,
            Operation::Upsert => MutationOp::Upsert,
            Operation::BulkInsert => MutationOp::BulkInsert,
            Operation::Replace => MutationOp::Replace,
            other => {
                return Err(self.error(format!("{other} is not a CRUD operation")));
            }
        };

        let entity = self.expect_ident("entity name")?;
        let mut query = MutationQuery::new(op, entity, position);

        match op {
            MutationOp::Create | MutationOp::Replace => {
                query.assignments = self.parse_assignments()?;
            }
            MutationOp::Update => {
                query.assignments = self.parse_assignments()?;
                if self.eat_word("WHERE") {
                    query.conditions = self.parse_condition_list()?;
                }
            }
            MutationOp::Delete => {
                if self.eat_word("WHERE") {
                    query.conditions = self.parse_condition_list()?;
                }
            }
            MutationOp::Upsert => {
                query.assignments = self.parse_assignments()?;
                if self.eat_word("ON CONFLICT") {
                    let mut targets = vec![self.expect_ident("conflict column")?];
                    while self.eat_kind(TokenKind::Comma) {
                        targets.push(self.expect_ident("conflict column")?);
                    }
                    let update = if self.eat_word("UPDATE") {
                        self.parse_assignments()?
                    } else {
                        Vec::new()
                    };
                    query.conflict = Some(ConflictSpec { targets, update });
                }
            }
            MutationOp::BulkInsert => {
                self.expect_kind(TokenKind::LParen, "'(' before column list")?;
                loop {
                    query.columns.push(self.expect_ident("column name")?);
                    if !self.eat_kind(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect_kind(TokenKind::RParen, "')'")?;
                self.expect_word("VALUES")?;
                loop {
                    self.expect_kind(TokenKind::LParen, "'(' before row values")?;
                    let mut row = Vec::new();
                    loop {
                        row.push(self.parse_additive()?);
                        if !self.eat_kind(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect_kind(TokenKind::RParen, "')'")?;
                    if row.len() != query.columns.len() {
                        return Err(self.error(format!(
                            "row has {} values but {} columns were declared",
                            row.len(),
                            query.columns.len()
                        )));
                    }
                    query.rows.push(row);
                    if !self.eat_kind(TokenKind::Comma) {
                        break;
                    }
                }
            }
        }

        Ok(Query::Mutation(query))
    }

    pub(crate) fn parse_assignments(&mut self) -> Result<Vec<Assignment>, ParseError> {
        let mut out = Vec::new();
        loop {
            let field = self.expect_ident("field name")?;
            match self.peek() {
                Some(t) if t.kind == TokenKind::Operator && t.text == "=" => {
                    self.advance();
                }
                Some(t) => return Err(self.error(format!("expected '=', found {t}"))),
                None => return Err(self.error("expected '=', found end of input")),
            }
            let value = self.parse_additive()?;
            out.push(Assignment { field, value });
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(out)
    }
}
