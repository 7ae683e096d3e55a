//! DDL sub-grammars.
//!
//! Each operation has a fixed shape built from identifiers plus
//! `name:value` colon-delimited attribute tokens (`start:1`, `cycle:true`,
//! `check:'value > 0'`). Quoted and dollar-quoted attribute values arrive as
//! a separate string token right after the bare `name:` word.

use crate::ast::{
    AlterAction, ColumnDef, DdlKind, DdlQuery, DomainAttrs, Query, SequenceAttrs,
};
use crate::registry::Operation;
use crate::token::{Position, TokenKind};

use super::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_ddl(
        &mut self,
        operation: Operation,
        position: Position,
    ) -> Result<Query, ParseError> {
        self.advance(); // operation token

        let kind = match operation {
            Operation::CreateTable => self.parse_create_table()?,
            Operation::AlterTable => self.parse_alter_table()?,
            Operation::DropTable => DdlKind::DropTable {
                entity: self.expect_ident("table name")?,
                cascade: self.eat_word("CASCADE"),
            },
            Operation::RenameTable => DdlKind::RenameTable {
                from: self.expect_ident("current table name")?,
                to: self.expect_ident("new table name")?,
            },
            Operation::TruncateTable => DdlKind::Truncate {
                entity: self.expect_ident("table name")?,
            },
            Operation::CreateIndex => self.parse_create_index()?,
            Operation::DropIndex => DdlKind::DropIndex {
                name: self.expect_ident("index name")?,
            },
            Operation::CreateDatabase => DdlKind::CreateDatabase {
                name: self.expect_ident("database name")?,
            },
            Operation::DropDatabase => DdlKind::DropDatabase {
                name: self.expect_ident("database name")?,
            },
            Operation::CreateView => {
                let name = self.expect_ident("view name")?;
                DdlKind::CreateView {
                    name,
                    query: self.parse_view_body()?,
                }
            }
            Operation::AlterView => {
                let name = self.expect_ident("view name")?;
                DdlKind::AlterView {
                    name,
                    query: self.parse_view_body()?,
                }
            }
            Operation::DropView => DdlKind::DropView {
                name: self.expect_ident("view name")?,
            },
            Operation::CreateSequence => {
                let name = self.expect_ident("sequence name")?;
                DdlKind::CreateSequence {
                    name,
                    attrs: self.parse_sequence_attrs()?,
                }
            }
            Operation::AlterSequence => {
                let name = self.expect_ident("sequence name")?;
                DdlKind::AlterSequence {
                    name,
                    attrs: self.parse_sequence_attrs()?,
                }
            }
            Operation::DropSequence => DdlKind::DropSequence {
                name: self.expect_ident("sequence name")?,
            },
            Operation::CreateExtension => self.parse_create_extension()?,
            Operation::DropExtension => DdlKind::DropExtension {
                name: self.expect_ident("extension name")?,
            },
            Operation::CreateSchema => self.parse_create_schema()?,
            Operation::DropSchema => DdlKind::DropSchema {
                name: self.expect_ident("schema name")?,
                cascade: self.eat_word("CASCADE"),
            },
            Operation::CreateType => self.parse_create_type()?,
            Operation::DropType => DdlKind::DropType {
                name: self.expect_ident("type name")?,
            },
            Operation::CreateDomain => {
                let name = self.expect_ident("domain name")?;
                DdlKind::CreateDomain {
                    name,
                    attrs: self.parse_domain_attrs()?,
                }
            }
            Operation::AlterDomain => {
                let name = self.expect_ident("domain name")?;
                DdlKind::AlterDomain {
                    name,
                    attrs: self.parse_domain_attrs()?,
                }
            }
            Operation::DropDomain => DdlKind::DropDomain {
                name: self.expect_ident("domain name")?,
            },
            Operation::CreateFunction => self.parse_create_function()?,
            Operation::DropFunction => DdlKind::DropFunction {
                name: self.expect_ident("function name")?,
            },
            Operation::CreateTrigger => self.parse_create_trigger()?,
            Operation::DropTrigger => {
                let name = self.expect_ident("trigger name")?;
                let table = self.expect_required_attr("on")?;
                DdlKind::DropTrigger { name, table }
            }
            Operation::CreatePolicy => self.parse_create_policy()?,
            Operation::DropPolicy => {
                let name = self.expect_ident("policy name")?;
                let table = self.expect_required_attr("on")?;
                DdlKind::DropPolicy { name, table }
            }
            Operation::CreateRule => self.parse_create_rule()?,
            Operation::DropRule => {
                let name = self.expect_ident("rule name")?;
                let table = self.expect_required_attr("on")?;
                DdlKind::DropRule { name, table }
            }
            Operation::CommentOn => DdlKind::CommentOn {
                object_kind: self.expect_name("object kind after COMMENT ON")?,
                name: self.expect_name("object name")?,
                comment: self.expect_string("comment string")?,
            },
            other => {
                return Err(self.error(format!("{other} is not a DDL operation")));
            }
        };

        Ok(Query::Ddl(DdlQuery { position, kind }))
    }

    // ============ Attribute primitives ============

    fn peek_attr(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text.contains(':'))
    }

    /// Take the next `name:value` attribute. A bare `name:` word pulls its
    /// value from the following string token.
    fn take_attr(&mut self) -> Result<(String, String), ParseError> {
        let tok = self.expect_kind(TokenKind::Ident, "name:value attribute")?;
        let Some((key, value)) = tok.text.split_once(':') else {
            return Err(self.error(format!(
                "expected name:value attribute, found '{}'",
                tok.text
            )));
        };
        let key = key.to_ascii_lowercase();
        if value.is_empty() {
            let value = self.expect_string(&format!("quoted value for attribute '{key}'"))?;
            Ok((key, value))
        } else {
            Ok((key, value.to_string()))
        }
    }

    fn expect_required_attr(&mut self, wanted: &str) -> Result<String, ParseError> {
        let (key, value) = self.take_attr()?;
        if key != wanted {
            return Err(self.error(format!("expected attribute '{wanted}:', found '{key}:'")));
        }
        Ok(value)
    }

    fn attr_int(&self, key: &str, value: &str) -> Result<i64, ParseError> {
        value
            .parse::<i64>()
            .map_err(|_| self.error(format!("attribute '{key}' requires an integer value")))
    }

    fn attr_bool(&self, key: &str, value: &str) -> Result<bool, ParseError> {
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(self.error(format!("attribute '{key}' requires true or false")))
        }
    }

    // ============ Tables ============

    fn parse_create_table(&mut self) -> Result<DdlKind, ParseError> {
        let entity = self.expect_ident("table name")?;
        let mut columns = Vec::new();
        while self.peek_attr() {
            columns.push(self.parse_column_def()?);
        }
        if columns.is_empty() {
            return Err(self.error("CREATE TABLE requires at least one column definition"));
        }
        Ok(DdlKind::CreateTable { entity, columns })
    }

    /// `name:type[(n)][:constraint...]`
    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let tok = self.expect_kind(TokenKind::Ident, "column definition")?;
        let Some((name, rest)) = tok.text.split_once(':') else {
            return Err(self.error(format!(
                "expected name:type column definition, found '{}'",
                tok.text
            )));
        };
        if rest.is_empty() {
            return Err(self.error(format!("column '{name}' is missing a type")));
        }

        let mut parts = rest.split(':');
        let mut data_type = parts.next().unwrap_or_default().to_string();
        let mut constraints: Vec<String> =
            parts.map(|c| c.to_ascii_lowercase()).collect();

        // Parameterized type: varchar(50) splits around the parens, with any
        // further constraints arriving as `:word` token pairs.
        if self.peek_kind() == Some(TokenKind::LParen) {
            self.advance();
            let size = self.expect_number("type size")?;
            self.expect_kind(TokenKind::RParen, "')' after type size")?;
            data_type.push_str(&format!("({size})"));
            while self.eat_kind(TokenKind::Colon) {
                constraints.push(self.expect_name("column constraint")?.to_ascii_lowercase());
            }
        }

        Ok(ColumnDef {
            name: name.to_string(),
            data_type,
            constraints,
        })
    }

    fn parse_alter_table(&mut self) -> Result<DdlKind, ParseError> {
        let entity = self.expect_ident("table name")?;
        let action_word = self.expect_name("ADD, DROP, RENAME, or MODIFY")?;

        let action = match action_word.to_ascii_uppercase().as_str() {
            "ADD" => AlterAction::AddColumn(self.parse_column_def()?),
            "MODIFY" => AlterAction::ModifyColumn(self.parse_column_def()?),
            "DROP" => AlterAction::DropColumn(self.expect_ident("column name")?),
            "RENAME" => {
                let tok = self.expect_kind(TokenKind::Ident, "old:new column pair")?;
                let Some((from, to)) = tok.text.split_once(':') else {
                    return Err(
                        self.error(format!("expected old:new column pair, found '{}'", tok.text))
                    );
                };
                if from.is_empty() || to.is_empty() {
                    return Err(self.error("RENAME requires both old and new column names"));
                }
                AlterAction::RenameColumn {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            other => {
                return Err(self.error(format!(
                    "expected ADD, DROP, RENAME, or MODIFY, found '{other}'"
                )));
            }
        };

        Ok(DdlKind::AlterTable { entity, action })
    }

    fn parse_create_index(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("index name")?;
        self.expect_word("ON")?;
        let entity = self.expect_ident("table name")?;

        let mut columns = vec![self.expect_ident("indexed column")?];
        while self.eat_kind(TokenKind::Comma) {
            columns.push(self.expect_ident("indexed column")?);
        }

        let mut unique = false;
        if self.peek_attr() {
            let (key, value) = self.take_attr()?;
            if key != "unique" {
                return Err(self.error(format!("unknown CREATE INDEX attribute '{key}'")));
            }
            unique = self.attr_bool(&key, &value)?;
        }

        Ok(DdlKind::CreateIndex {
            name,
            entity,
            columns,
            unique,
        })
    }

    // ============ Views ============

    fn parse_view_body(&mut self) -> Result<Box<Query>, ParseError> {
        self.expect_word("AS")?;
        self.enter()?;
        let query = self.parse_query()?;
        self.exit();
        Ok(Box::new(query))
    }

    // ============ Sequences / extensions / schemas / types / domains ============

    fn parse_sequence_attrs(&mut self) -> Result<SequenceAttrs, ParseError> {
        let mut attrs = SequenceAttrs::default();
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "start" => attrs.start = Some(self.attr_int(&key, &value)?),
                "increment" => attrs.increment = Some(self.attr_int(&key, &value)?),
                "minvalue" => attrs.min_value = Some(self.attr_int(&key, &value)?),
                "maxvalue" => attrs.max_value = Some(self.attr_int(&key, &value)?),
                "cycle" => attrs.cycle = Some(self.attr_bool(&key, &value)?),
                "restart" => attrs.restart = Some(self.attr_int(&key, &value)?),
                other => {
                    return Err(self.error(format!("unknown sequence attribute '{other}'")));
                }
            }
        }
        Ok(attrs)
    }

    fn parse_create_extension(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("extension name")?;
        let mut version = None;
        let mut schema = None;
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "version" => version = Some(value),
                "schema" => schema = Some(value),
                other => {
                    return Err(self.error(format!("unknown extension attribute '{other}'")));
                }
            }
        }
        Ok(DdlKind::CreateExtension {
            name,
            version,
            schema,
        })
    }

    fn parse_create_schema(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("schema name")?;
        let mut authorization = None;
        if self.peek_attr() {
            let (key, value) = self.take_attr()?;
            if key != "authorization" {
                return Err(self.error(format!("unknown schema attribute '{key}'")));
            }
            authorization = Some(value);
        }
        Ok(DdlKind::CreateSchema {
            name,
            authorization,
        })
    }

    /// `CREATE TYPE mood values:happy,sad,ok`
    fn parse_create_type(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("type name")?;
        let (key, first) = self.take_attr()?;
        if key != "values" {
            return Err(self.error(format!("expected 'values:' attribute, found '{key}:'")));
        }
        let mut values = vec![first];
        while self.eat_kind(TokenKind::Comma) {
            values.push(self.expect_name("enum value")?);
        }
        Ok(DdlKind::CreateType { name, values })
    }

    fn parse_domain_attrs(&mut self) -> Result<DomainAttrs, ParseError> {
        let mut attrs = DomainAttrs::default();
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "type" => attrs.data_type = Some(value),
                "default" => attrs.default = Some(value),
                "notnull" => attrs.not_null = self.attr_bool(&key, &value)?,
                "check" => attrs.check = Some(value),
                other => {
                    return Err(self.error(format!("unknown domain attribute '{other}'")));
                }
            }
        }
        Ok(attrs)
    }

    // ============ Functions / triggers / policies / rules ============

    fn parse_create_function(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("function name")?;
        let mut returns = None;
        let mut language = None;
        let mut body = None;
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "returns" => returns = Some(value),
                "language" => language = Some(value),
                "body" => body = Some(value),
                other => {
                    return Err(self.error(format!("unknown function attribute '{other}'")));
                }
            }
        }
        let Some(body) = body else {
            return Err(self.error("CREATE FUNCTION requires a 'body:' attribute"));
        };
        Ok(DdlKind::CreateFunction {
            name,
            returns,
            language,
            body,
        })
    }

    fn parse_create_trigger(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("trigger name")?;
        let mut table = None;
        let mut timing = None;
        let mut event = None;
        let mut function = None;
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "on" => table = Some(value),
                "timing" => timing = Some(value),
                "event" => event = Some(value),
                "function" => function = Some(value),
                other => {
                    return Err(self.error(format!("unknown trigger attribute '{other}'")));
                }
            }
        }
        match (table, timing, event, function) {
            (Some(table), Some(timing), Some(event), Some(function)) => {
                Ok(DdlKind::CreateTrigger {
                    name,
                    table,
                    timing,
                    event,
                    function,
                })
            }
            _ => Err(self.error(
                "CREATE TRIGGER requires 'on:', 'timing:', 'event:', and 'function:' attributes",
            )),
        }
    }

    fn parse_create_policy(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("policy name")?;
        let mut table = None;
        let mut for_op = None;
        let mut to_role = None;
        let mut using = None;
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "on" => table = Some(value),
                "for" => for_op = Some(value),
                "to" => to_role = Some(value),
                "using" => using = Some(value),
                other => {
                    return Err(self.error(format!("unknown policy attribute '{other}'")));
                }
            }
        }
        let Some(table) = table else {
            return Err(self.error("CREATE POLICY requires an 'on:' attribute"));
        };
        Ok(DdlKind::CreatePolicy {
            name,
            table,
            for_op,
            to_role,
            using,
        })
    }

    fn parse_create_rule(&mut self) -> Result<DdlKind, ParseError> {
        let name = self.expect_ident("rule name")?;
        let mut table = None;
        let mut event = None;
        let mut action = None;
        while self.peek_attr() {
            let (key, value) = self.take_attr()?;
            match key.as_str() {
                "on" => table = Some(value),
                "event" => event = Some(value),
                "action" => action = Some(value),
                other => {
                    return Err(self.error(format!("unknown rule attribute '{other}'")));
                }
            }
        }
        match (table, event, action) {
            (Some(table), Some(event), Some(action)) => Ok(DdlKind::CreateRule {
                name,
                table,
                event,
                action,
            }),
            _ => Err(self.error(
                "CREATE RULE requires 'on:', 'event:', and 'action:' attributes",
            )),
        }
    }
}
