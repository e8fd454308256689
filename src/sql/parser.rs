//! SQL Parser
//!
//! This module parses tokens into a [`Statement`] by recursive descent.
//! Parsing finishes before anything is executed, so a malformed statement
//! never reaches the engine.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{SpannedToken, Token};
use crate::catalog::{DataType, ForeignKey, OnDelete};
use crate::error::{Error, Result};
use crate::storage::{CompareOp, JoinKind};

/// SQL Parser
pub struct Parser {
    sql: String,
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let tokens = Lexer::new(sql).tokenize()?;

        Ok(Self {
            sql: sql.to_string(),
            tokens,
            position: 0,
        })
    }

    /// Parse a single SQL statement
    ///
    /// A trailing semicolon is optional; anything after it is an error.
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        if self.check(&Token::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(self.unexpected("end of statement"));
        }

        Ok(stmt)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            Token::Drop => self.parse_drop().map(Statement::DropTable),
            Token::Show => {
                self.advance();
                self.expect(&Token::Tables)?;
                Ok(Statement::ShowTables)
            }
            Token::Begin => {
                self.advance();
                if self.check(&Token::Transaction) {
                    self.advance();
                }
                Ok(Statement::BeginTransaction)
            }
            Token::Commit => {
                self.advance();
                Ok(Statement::Commit)
            }
            Token::Rollback => {
                self.advance();
                Ok(Statement::Rollback)
            }
            _ => Err(self.unexpected(
                "SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, SHOW, BEGIN, COMMIT or ROLLBACK",
            )),
        }
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let columns = if self.check(&Token::Asterisk) {
            self.advance();
            None
        } else {
            let mut columns = vec![self.parse_column_ref()?];
            while self.check(&Token::Comma) {
                self.advance();
                columns.push(self.parse_column_ref()?);
            }
            Some(columns)
        };

        self.expect(&Token::From)?;
        let from = self.expect_identifier()?;

        let join = if matches!(
            self.current(),
            Token::Join | Token::Inner | Token::Left | Token::Right
        ) {
            Some(self.parse_join()?)
        } else {
            None
        };

        let where_clause = self.parse_where()?;

        Ok(SelectStatement {
            columns,
            from,
            join,
            where_clause,
        })
    }

    /// `[INNER | LEFT [OUTER] | RIGHT [OUTER]] JOIN t ON a.c = b.c [LEFT | RIGHT]`
    fn parse_join(&mut self) -> Result<JoinClause> {
        let prefix = match self.current() {
            Token::Inner => Some(JoinKind::Inner),
            Token::Left => Some(JoinKind::Left),
            Token::Right => Some(JoinKind::Right),
            _ => None,
        };
        if prefix.is_some() {
            self.advance();
            if prefix != Some(JoinKind::Inner) && self.check(&Token::Outer) {
                self.advance();
            }
        }

        self.expect(&Token::Join)?;
        let table = self.expect_identifier()?;
        self.expect(&Token::On)?;
        let left = self.parse_column_ref()?;
        self.expect(&Token::Eq)?;
        let right = self.parse_column_ref()?;

        // trailing join kind, as the web layer writes it
        let suffix_position = self.current_position();
        let suffix = match self.current() {
            Token::Left => Some(JoinKind::Left),
            Token::Right => Some(JoinKind::Right),
            _ => None,
        };
        if suffix.is_some() {
            self.advance();
        }

        let kind = match (prefix, suffix) {
            (Some(p), Some(s)) if p != s => {
                return Err(Error::parse(
                    format!("conflicting join kinds {} and {}", p, s),
                    &self.sql,
                    Some(suffix_position),
                ))
            }
            (Some(kind), _) | (None, Some(kind)) => kind,
            (None, None) => JoinKind::Inner,
        };

        Ok(JoinClause {
            kind,
            table,
            left,
            right,
        })
    }

    // ========== WHERE Clause ==========

    fn parse_where(&mut self) -> Result<Vec<Comparison>> {
        if !self.check(&Token::Where) {
            return Ok(Vec::new());
        }
        self.advance();

        let mut comparisons = vec![self.parse_comparison()?];
        loop {
            match self.current() {
                Token::And => {
                    self.advance();
                    comparisons.push(self.parse_comparison()?);
                }
                Token::Or => {
                    return Err(self.error_here("OR is not supported, only AND"));
                }
                _ => break,
            }
        }

        Ok(comparisons)
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        if self.check(&Token::LParen) {
            return Err(self.error_here("parentheses are not supported in WHERE"));
        }

        let column = self.parse_column_ref()?;
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Neq => CompareOp::Neq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        let value = self.parse_literal()?;

        Ok(Comparison { column, op, value })
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier()?;
        if self.check(&Token::Dot) {
            self.advance();
            let column = self.expect_identifier()?;
            return Ok(ColumnRef::qualified(first, column));
        }
        Ok(ColumnRef::new(first))
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match self.current() {
            Token::IntegerLiteral(n) => Literal::Integer(*n),
            Token::FloatLiteral(n) => Literal::Float(*n),
            Token::StringLiteral(s) | Token::QuotedLiteral(s) => Literal::String(s.clone()),
            Token::True => Literal::Boolean(true),
            Token::False => Literal::Boolean(false),
            Token::Null => Literal::Null,
            _ => return Err(self.unexpected("literal value")),
        };
        self.advance();
        Ok(literal)
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        let columns = if self.check(&Token::LParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect(&Token::Values)?;

        let mut values = Vec::new();
        loop {
            let row_position = self.current_position();
            self.expect(&Token::LParen)?;
            let mut row = vec![self.parse_literal()?];
            while self.check(&Token::Comma) {
                self.advance();
                row.push(self.parse_literal()?);
            }
            self.expect(&Token::RParen)?;

            if let Some(cols) = &columns {
                if cols.len() != row.len() {
                    return Err(Error::parse(
                        format!("{} columns but {} values", cols.len(), row.len()),
                        &self.sql,
                        Some(row_position),
                    ));
                }
            }
            values.push(row);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_literal()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    // ========== CREATE / DROP Statements ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            if matches!(
                self.current(),
                Token::Primary | Token::Foreign | Token::Unique
            ) {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
            constraints,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut def = ColumnDef {
            name,
            data_type,
            not_null: false,
            primary_key: false,
            unique: false,
            references: None,
        };

        // Parse column constraints
        loop {
            match self.current() {
                Token::Not => {
                    self.advance();
                    self.expect(&Token::Null)?;
                    def.not_null = true;
                }
                Token::Null => {
                    // NULL is allowed (default)
                    self.advance();
                }
                Token::Primary => {
                    self.advance();
                    self.expect(&Token::Key)?;
                    def.primary_key = true;
                    def.not_null = true;
                }
                Token::Unique => {
                    self.advance();
                    def.unique = true;
                }
                Token::References => {
                    self.advance();
                    def.references = Some(self.parse_references_target()?);
                }
                _ => break,
            }
        }

        Ok(def)
    }

    /// Type name, with an optional ignored length such as `VARCHAR(255)`
    fn parse_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current() {
            Token::Identifier(name) => DataType::from_name(name),
            _ => None,
        };
        let data_type = data_type.ok_or_else(|| self.unexpected("data type"))?;
        self.advance();

        if self.check(&Token::LParen) {
            self.advance();
            self.expect_integer()?;
            self.expect(&Token::RParen)?;
        }

        Ok(data_type)
    }

    /// `t(c) [ON DELETE CASCADE | RESTRICT]`
    fn parse_references_target(&mut self) -> Result<ForeignKey> {
        let table = self.expect_identifier()?;
        self.expect(&Token::LParen)?;
        let column = self.expect_identifier()?;
        self.expect(&Token::RParen)?;

        let mut on_delete = OnDelete::default();
        if self.check(&Token::On) {
            self.advance();
            self.expect(&Token::Delete)?;
            on_delete = self.parse_on_delete()?;
        }

        Ok(ForeignKey::new(table, column, on_delete))
    }

    fn parse_on_delete(&mut self) -> Result<OnDelete> {
        let policy = match self.current() {
            Token::Cascade => OnDelete::Cascade,
            Token::Restrict => OnDelete::Restrict,
            _ => return Err(self.unexpected("CASCADE or RESTRICT")),
        };
        self.advance();
        Ok(policy)
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        match self.current() {
            Token::Primary => {
                self.advance();
                self.expect(&Token::Key)?;
                Ok(TableConstraint::PrimaryKey(self.parse_single_column()?))
            }
            Token::Unique => {
                self.advance();
                Ok(TableConstraint::Unique(self.parse_single_column()?))
            }
            Token::Foreign => {
                self.advance();
                self.expect(&Token::Key)?;

                if self.check(&Token::LParen) {
                    let column = self.parse_single_column()?;
                    self.expect(&Token::References)?;
                    let references = self.parse_references_target()?;
                    return Ok(TableConstraint::ForeignKey { column, references });
                }

                // shorthand: FOREIGN KEY c -> t.c [CASCADE | RESTRICT]
                let column = self.expect_identifier()?;
                self.expect(&Token::Arrow)?;
                let table = self.expect_identifier()?;
                self.expect(&Token::Dot)?;
                let target = self.expect_identifier()?;
                let on_delete = if matches!(self.current(), Token::Cascade | Token::Restrict) {
                    self.parse_on_delete()?
                } else {
                    OnDelete::default()
                };

                Ok(TableConstraint::ForeignKey {
                    column,
                    references: ForeignKey::new(table, target, on_delete),
                })
            }
            _ => Err(self.unexpected("PRIMARY, UNIQUE or FOREIGN")),
        }
    }

    /// `(c)`; composite keys are not supported
    fn parse_single_column(&mut self) -> Result<String> {
        self.expect(&Token::LParen)?;
        let column = self.expect_identifier()?;
        if self.check(&Token::Comma) {
            return Err(self.error_here("composite keys are not supported"));
        }
        self.expect(&Token::RParen)?;
        Ok(column)
    }

    fn parse_drop(&mut self) -> Result<DropTableStatement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;
        let table_names = self.parse_identifier_list()?;
        Ok(DropTableStatement { table_names })
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut names = vec![self.expect_identifier()?];
        while self.check(&Token::Comma) {
            self.advance();
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    // ========== Helper Methods ==========

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        Error::parse(message, &self.sql, Some(self.current_position()))
    }

    fn unexpected(&self, expected: &str) -> Error {
        self.error_here(format!("expected {}, found {}", expected, self.current()))
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) | Token::QuotedLiteral(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("integer")),
        }
    }
}

/// Parse one statement
pub fn parse(sql: &str) -> Result<Statement> {
    Parser::new(sql)?.parse()
}
