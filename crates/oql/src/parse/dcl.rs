//! Access-control statements.
//!
//! Permission words (SELECT, UPDATE, ALL, ...) may collide with operation
//! keywords, so the permission list accepts any word-shaped token. The
//! GRANT/REVOKE target is an entity name or `*` for everything.

use crate::ast::{DclOp, DclQuery, Query};
use crate::registry::Operation;
use crate::token::{Position, TokenKind};

use super::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_dcl(
        &mut self,
        operation: Operation,
        position: Position,
    ) -> Result<Query, ParseError> {
        self.advance(); // operation token

        let query = match operation {
            Operation::Grant => {
                let mut q = DclQuery::new(DclOp::Grant, position);
                self.parse_privilege_grant(&mut q, "TO")?;
                q
            }
            Operation::Revoke => {
                let mut q = DclQuery::new(DclOp::Revoke, position);
                self.parse_privilege_grant(&mut q, "FROM")?;
                q
            }
            Operation::CreateUser => {
                let mut q = DclQuery::new(DclOp::CreateUser, position);
                q.users.push(self.expect_ident("user name")?);
                if self.eat_word("PASSWORD") {
                    q.password = Some(self.expect_string("password string")?);
                }
                q
            }
            Operation::AlterUser => {
                let mut q = DclQuery::new(DclOp::AlterUser, position);
                q.users.push(self.expect_ident("user name")?);
                self.expect_word("PASSWORD")?;
                q.password = Some(self.expect_string("password string")?);
                q
            }
            Operation::DropUser => {
                let mut q = DclQuery::new(DclOp::DropUser, position);
                q.users.push(self.expect_ident("user name")?);
                q
            }
            Operation::CreateRole => {
                let mut q = DclQuery::new(DclOp::CreateRole, position);
                q.roles.push(self.expect_ident("role name")?);
                q
            }
            Operation::DropRole => {
                let mut q = DclQuery::new(DclOp::DropRole, position);
                q.roles.push(self.expect_ident("role name")?);
                q
            }
            Operation::AssignRole => {
                let mut q = DclQuery::new(DclOp::AssignRole, position);
                self.parse_role_assignment(&mut q, "TO")?;
                q
            }
            Operation::RevokeRole => {
                let mut q = DclQuery::new(DclOp::RevokeRole, position);
                self.parse_role_assignment(&mut q, "FROM")?;
                q
            }
            other => {
                return Err(self.error(format!("{other} is not an access-control operation")));
            }
        };

        Ok(Query::Dcl(query))
    }

    /// `<perm>[, <perm>] ON <target> TO|FROM <user>[, <user>]`
    fn parse_privilege_grant(
        &mut self,
        query: &mut DclQuery,
        user_intro: &str,
    ) -> Result<(), ParseError> {
        loop {
            query
                .permissions
                .push(self.expect_name("permission keyword")?.to_ascii_uppercase());
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }

        self.expect_word("ON")?;
        query.target = Some(self.expect_grant_target()?);

        self.expect_word(user_intro)?;
        loop {
            query.users.push(self.expect_ident("user name")?);
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    fn expect_grant_target(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Operator && t.text == "*" => {
                self.advance();
                Ok("*".to_string())
            }
            _ => self.expect_ident("target entity or '*'"),
        }
    }

    /// `<role>[, <role>] TO|FROM <user>[, <user>]`
    fn parse_role_assignment(
        &mut self,
        query: &mut DclQuery,
        user_intro: &str,
    ) -> Result<(), ParseError> {
        loop {
            query.roles.push(self.expect_ident("role name")?);
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        self.expect_word(user_intro)?;
        loop {
            query.users.push(self.expect_ident("user name")?);
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }
}
