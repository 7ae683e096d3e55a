//! DQL extras: joins, window functions, and set operations over two fully
//! parenthesized sub-queries. Set operations re-enter the statement parser
//! recursively, so each side may carry its own clauses, joins, or further
//! set operations.

use crate::ast::{
    CompoundQuery, Join, JoinKind, Query, SelectQuery, SetOpKind, WindowFn, WindowFunc,
};
use crate::token::TokenKind;

use super::{ParseError, Parser};

impl Parser<'_> {
    // ============ Set operations ============

    /// `( <query> ) UNION|UNION ALL|INTERSECT|EXCEPT ( <query> ) [...]`
    pub(crate) fn parse_set_operation(&mut self) -> Result<Query, ParseError> {
        let position = self.current_position();
        let mut result = self.parse_parenthesized_query()?;
        let mut combined = false;

        loop {
            let kind = if self.eat_word("UNION ALL") {
                SetOpKind::UnionAll
            } else if self.eat_word("UNION") {
                SetOpKind::Union
            } else if self.eat_word("INTERSECT") {
                SetOpKind::Intersect
            } else if self.eat_word("EXCEPT") {
                SetOpKind::Except
            } else {
                break;
            };

            let right = self.parse_parenthesized_query()?;
            result = Query::Compound(CompoundQuery {
                kind,
                left: Box::new(result),
                right: Box::new(right),
                position,
            });
            combined = true;
        }

        if !combined {
            return Err(self.error(
                "expected UNION, UNION ALL, INTERSECT, or EXCEPT after parenthesized sub-query",
            ));
        }
        Ok(result)
    }

    fn parse_parenthesized_query(&mut self) -> Result<Query, ParseError> {
        self.enter()?;
        self.expect_kind(TokenKind::LParen, "'(' before sub-query")?;
        let query = self.parse_query()?;
        self.expect_kind(TokenKind::RParen, "')' after sub-query")?;
        self.exit();
        Ok(query)
    }

    // ============ Joins ============

    pub(crate) fn parse_join(
        &mut self,
        query: &mut SelectQuery,
        kind: JoinKind,
    ) -> Result<(), ParseError> {
        self.advance(); // join clause token
        let entity = self.expect_ident("joined entity name")?;
        self.expect_word("ON")?;
        let left_field = self.expect_ident("join field")?;
        match self.peek() {
            Some(t) if t.kind == TokenKind::Operator && t.text == "=" => {
                self.advance();
            }
            Some(t) => return Err(self.error(format!("expected '=' in join condition, found {t}"))),
            None => return Err(self.error("expected '=' in join condition, found end of input")),
        }
        let right_field = self.expect_ident("join field")?;

        query.joins.push(Join {
            kind,
            entity,
            left_field,
            right_field,
        });
        Ok(())
    }

    // ============ Window functions ============

    pub(crate) fn peek_window_fn(&self) -> Option<WindowFn> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Ident {
            return None;
        }
        let upper = tok.text.to_ascii_uppercase();
        self.registry.window_fn(&upper)?;
        WindowFn::from_keyword(&upper)
    }

    /// `<FUNC> [n] [field] [offset] OVER ( [PARTITION BY f,...] [ORDER BY f [ASC|DESC],...] )`
    pub(crate) fn parse_window_function(&mut self) -> Result<WindowFunc, ParseError> {
        let tok = self.advance().expect("caller peeked a window function");
        let upper = tok.text.to_ascii_uppercase();
        let func = WindowFn::from_keyword(&upper)
            .ok_or_else(|| self.error(format!("unknown window function '{}'", tok.text)))?;
        let info = self
            .registry
            .window_fn(&upper)
            .ok_or_else(|| self.error(format!("unknown window function '{}'", tok.text)))?;

        let mut window = WindowFunc {
            func,
            field: None,
            offset: None,
            buckets: None,
            partition_by: Vec::new(),
            order_by: Vec::new(),
            alias: None,
        };

        if info.has_buckets {
            let text = self.expect_number("bucket count after NTILE")?;
            window.buckets = Some(
                text.parse::<u32>()
                    .map_err(|_| self.error("NTILE requires a positive integer bucket count"))?,
            );
        }

        if info.has_field {
            if self.peek_kind() == Some(TokenKind::Ident) {
                window.field = Some(self.advance().unwrap().text);
            }
            if self.peek_kind() == Some(TokenKind::Number) {
                let text = self.advance().unwrap().text;
                window.offset = Some(
                    text.parse::<i64>()
                        .map_err(|_| self.error("window offset must be an integer"))?,
                );
            }
        }

        self.expect_word("OVER")?;
        self.expect_kind(TokenKind::LParen, "'(' after OVER")?;

        if self.eat_word("PARTITION BY") {
            loop {
                window.partition_by.push(self.expect_ident("partition column")?);
                if !self.eat_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        if self.eat_word("ORDER BY") {
            window.order_by = self.parse_order_list()?;
        }
        self.expect_kind(TokenKind::RParen, "')' after window specification")?;

        if self.eat_word("AS") {
            window.alias = Some(self.expect_ident("window alias")?);
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Query;
    use crate::lexer::tokenize;
    use crate::registry::Registry;

    fn parse_ok(text: &str) -> Query {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        super::super::parse(tokens, &reg).unwrap()
    }

    #[test]
    fn inner_join_on_equality() {
        let Query::Select(q) = parse_ok("GET User JOIN Orders ON id = user_id") else {
            panic!("expected select");
        };
        assert_eq!(q.joins.len(), 1);
        assert_eq!(q.joins[0].kind, JoinKind::Inner);
        assert_eq!(q.joins[0].entity, "Orders");
    }

    #[test]
    fn left_join_folds_and_routes() {
        let Query::Select(q) = parse_ok("GET User LEFT JOIN Orders ON id = user_id") else {
            panic!("expected select");
        };
        assert_eq!(q.joins[0].kind, JoinKind::Left);
    }

    #[test]
    fn window_function_with_partition_and_order() {
        let q = parse_ok(
            "GET Employee WITH ROW_NUMBER OVER (PARTITION BY dept ORDER BY salary DESC) AS rn",
        );
        let Query::Select(q) = q else { panic!() };
        assert_eq!(q.windows.len(), 1);
        let w = &q.windows[0];
        assert_eq!(w.func, WindowFn::RowNumber);
        assert_eq!(w.partition_by, vec!["dept"]);
        assert!(w.order_by[0].descending);
        assert_eq!(w.alias.as_deref(), Some("rn"));
    }

    #[test]
    fn lag_takes_optional_field_and_offset() {
        let q = parse_ok("GET Tick WITH LAG price 2 OVER (ORDER BY ts)");
        let Query::Select(q) = q else { panic!() };
        let w = &q.windows[0];
        assert_eq!(w.func, WindowFn::Lag);
        assert_eq!(w.field.as_deref(), Some("price"));
        assert_eq!(w.offset, Some(2));
    }

    #[test]
    fn ntile_requires_bucket_count() {
        let q = parse_ok("GET Score WITH NTILE 4 OVER (ORDER BY points)");
        let Query::Select(q) = q else { panic!() };
        assert_eq!(q.windows[0].buckets, Some(4));

        let reg = Registry::new();
        let tokens = tokenize("GET Score WITH NTILE OVER (ORDER BY points)", &reg).unwrap();
        assert!(super::super::parse(tokens, &reg).is_err());
    }

    #[test]
    fn union_of_two_subqueries() {
        let q = parse_ok("(GET User WHERE age > 30) UNION (GET Admin)");
        let Query::Compound(c) = q else {
            panic!("expected compound");
        };
        assert_eq!(c.kind, SetOpKind::Union);
        assert!(matches!(*c.left, Query::Select(_)));
        assert!(matches!(*c.right, Query::Select(_)));
    }

    #[test]
    fn chained_set_operations_nest_left() {
        let q = parse_ok("(GET A) UNION ALL (GET B) EXCEPT (GET C)");
        let Query::Compound(c) = q else { panic!() };
        assert_eq!(c.kind, SetOpKind::Except);
        assert!(matches!(*c.left, Query::Compound(_)));
    }

    #[test]
    fn lone_parenthesized_query_is_an_error() {
        let reg = Registry::new();
        let tokens = tokenize("(GET User)", &reg).unwrap();
        assert!(super::super::parse(tokens, &reg).is_err());
    }

    #[test]
    fn mismatched_parens_fail() {
        let reg = Registry::new();
        let tokens = tokenize("GET User WHERE (a = 1 OR b = 2 AND c = 3", &reg).unwrap();
        assert!(super::super::parse(tokens, &reg).is_err());
    }
}
