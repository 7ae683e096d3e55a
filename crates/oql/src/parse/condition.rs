//! Condition-list grammar.
//!
//! Left-to-right scan. AND/OR tokens are consumed and stored as the `logic`
//! tag on the condition that *follows* them, so `a = 1 OR b = 2` yields
//! `[{a=1, logic:None}, {b=2, logic:Or}]`. A leading `(` is a nested group
//! unless the token after the matching `)` is an operator, in which case the
//! parens are a grouped arithmetic sub-expression on the left-hand side.

use crate::ast::{CompareOp, Comparison, Condition, Expr, Logic};
use crate::registry::OperatorCategory;
use crate::token::TokenKind;

use super::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_condition_list(&mut self) -> Result<Vec<Condition>, ParseError> {
        let mut out = Vec::new();
        loop {
            let logic = if out.is_empty() {
                Logic::None
            } else if self.eat_word("AND") {
                Logic::And
            } else if self.eat_word("OR") {
                Logic::Or
            } else {
                break;
            };
            out.push(self.parse_condition(logic)?);
        }
        if out.is_empty() {
            return Err(self.error("expected at least one condition"));
        }
        Ok(out)
    }

    fn parse_condition(&mut self, logic: Logic) -> Result<Condition, ParseError> {
        if self.peek_kind() == Some(TokenKind::LParen) && self.paren_opens_group() {
            self.enter()?;
            self.advance();
            let children = self.parse_condition_list()?;
            self.expect_kind(TokenKind::RParen, "')'")?;
            self.exit();
            return Ok(Condition::group(logic, children));
        }

        let cmp = self.parse_comparison()?;
        Ok(Condition::compare(logic, cmp))
    }

    /// Peek past the matching close paren: an operator there means the parens
    /// wrap an arithmetic sub-expression, not a condition group.
    fn paren_opens_group(&self) -> bool {
        match self.matching_paren(self.pos) {
            Some(close) => !matches!(
                self.tokens.get(close + 1).map(|t| t.kind),
                Some(TokenKind::Operator)
            ),
            // Unbalanced; let the recursive parse report it at the right spot.
            None => true,
        }
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseError> {
        let field = self.parse_additive()?;

        let Some(op_tok) = self.peek().cloned() else {
            return Err(self.error("expected comparison operator, found end of input"));
        };
        if op_tok.kind != TokenKind::Operator {
            return Err(self.error_with_suggestion(
                format!("expected comparison operator, found {op_tok}"),
                &op_tok.text,
            ));
        }
        self.advance();

        // Null checks take no operand.
        if op_tok.text == "IS NULL" {
            return Ok(leaf(field, CompareOp::IsNull));
        }
        if op_tok.text == "IS NOT" {
            self.expect_word("NULL")?;
            return Ok(leaf(field, CompareOp::IsNotNull));
        }

        let op = CompareOp::from_token(&op_tok.text).ok_or_else(|| {
            self.error(format!("'{}' is not a comparison operator", op_tok.text))
        })?;

        match self.registry.operator_category(&op_tok.text) {
            Some(OperatorCategory::Range) => {
                let value = self.parse_additive()?;
                self.expect_word("AND")?;
                let value2 = self.parse_additive()?;
                Ok(Comparison {
                    field,
                    op,
                    value: Some(value),
                    value2: Some(value2),
                    values: vec![],
                })
            }
            Some(OperatorCategory::MultiValue) => {
                self.expect_kind(TokenKind::LParen, "'(' after IN")?;
                let mut values = Vec::new();
                loop {
                    values.push(self.parse_additive()?);
                    if !self.eat_kind(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect_kind(TokenKind::RParen, "')'")?;
                Ok(Comparison {
                    field,
                    op,
                    value: None,
                    value2: None,
                    values,
                })
            }
            _ => {
                let value = self.parse_additive()?;
                Ok(Comparison {
                    field,
                    op,
                    value: Some(value),
                    value2: None,
                    values: vec![],
                })
            }
        }
    }
}

fn leaf(field: Expr, op: CompareOp) -> Comparison {
    Comparison {
        field,
        op,
        value: None,
        value2: None,
        values: vec![],
    }
}
