//! Transaction-control statements.

use crate::ast::{IsolationLevel, Query, TclOp, TclQuery};
use crate::registry::Operation;
use crate::token::{Position, TokenKind};

use super::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_tcl(
        &mut self,
        operation: Operation,
        position: Position,
    ) -> Result<Query, ParseError> {
        self.advance(); // operation token

        let mut query = TclQuery {
            op: TclOp::Begin,
            position,
            savepoint: None,
            isolation: None,
            read_only: None,
        };

        match operation {
            Operation::Begin => {
                // BEGIN TRANSACTION and plain BEGIN are the same statement.
                self.eat_word("TRANSACTION");
                query.op = TclOp::Begin;
            }
            Operation::Commit => {
                query.op = TclOp::Commit;
            }
            Operation::Rollback => {
                query.op = TclOp::Rollback;
            }
            Operation::RollbackTo => {
                // ROLLBACK TO [SAVEPOINT] <name>
                self.eat_word("SAVEPOINT");
                query.op = TclOp::RollbackTo;
                query.savepoint = Some(self.expect_ident("savepoint name")?);
            }
            Operation::Savepoint => {
                query.op = TclOp::Savepoint;
                query.savepoint = Some(self.expect_ident("savepoint name")?);
            }
            Operation::ReleaseSavepoint => {
                query.op = TclOp::ReleaseSavepoint;
                query.savepoint = Some(self.expect_ident("savepoint name")?);
            }
            Operation::SetTransaction => {
                query.op = TclOp::SetTransaction;
                self.parse_transaction_modes(&mut query)?;
            }
            other => {
                return Err(self.error(format!("{other} is not a transaction operation")));
            }
        }

        Ok(Query::Tcl(query))
    }

    /// `[ISOLATION LEVEL <level>] [READ ONLY | READ WRITE]`, at least one.
    fn parse_transaction_modes(&mut self, query: &mut TclQuery) -> Result<(), ParseError> {
        if self.eat_word("ISOLATION LEVEL") {
            let Some(tok) = self.peek().cloned() else {
                return Err(self.error("expected isolation level, found end of input"));
            };
            if tok.kind != TokenKind::Clause {
                return Err(self.error_with_suggestion(
                    format!("expected isolation level, found {tok}"),
                    &tok.text,
                ));
            }
            let level = IsolationLevel::from_keyword(&tok.text)
                .ok_or_else(|| self.error(format!("'{}' is not an isolation level", tok.text)))?;
            self.advance();
            query.isolation = Some(level);
        }

        if self.eat_word("READ ONLY") {
            query.read_only = Some(true);
        } else if self.eat_word("READ WRITE") {
            query.read_only = Some(false);
        }

        if query.isolation.is_none() && query.read_only.is_none() {
            return Err(self.error(
                "SET TRANSACTION requires ISOLATION LEVEL, READ ONLY, or READ WRITE",
            ));
        }
        Ok(())
    }
}
