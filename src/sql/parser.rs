//! SQL parser using recursive descent.
//!
//! The [`Parser`] converts a stream of tokens into an Abstract Syntax Tree.
//! Statements use recursive descent; expressions use precedence climbing.

use crate::datum::Type;

use super::ast::*;
use super::error::{ParseError, Span};
use super::lexer::Lexer;
use super::token::{Keyword, Token, TokenKind};

/// SQL parser that converts tokens into an AST.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Creates a new parser for the given SQL input.
    ///
    /// # Errors
    ///
    /// Returns the first lexer error, if any.
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize();
        let mut errors = lexer.take_errors();
        if !errors.is_empty() {
            return Err(errors.remove(0));
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Parses the input and returns a statement.
    ///
    /// Returns `Ok(None)` for empty input (whitespace/comments only).
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the input is not a valid statement.
    pub fn parse(&mut self) -> Result<Option<Statement>, ParseError> {
        if self.is_eof() {
            return Ok(None);
        }

        let stmt = self.parse_statement()?;

        // Optional trailing semicolon
        self.consume_token(&TokenKind::Semicolon);

        if !self.is_eof() {
            return Err(self.unexpected("end of input"));
        }

        Ok(Some(stmt))
    }

    /// Parses a single SQL string into a statement, rejecting empty input.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for invalid or empty input.
    pub fn parse_sql(input: &str) -> Result<Statement, ParseError> {
        let mut parser = Self::new(input)?;
        parser
            .parse()?
            .ok_or_else(|| ParseError::new("empty statement", Span::at(0)))
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if self.consume_keyword(Keyword::Create) {
            if self.consume_keyword(Keyword::Database) {
                let name = self.expect_identifier()?;
                return Ok(Statement::CreateDatabase { name });
            }
            if self.consume_keyword(Keyword::Table) {
                return self.parse_create_table();
            }
            if self.consume_keyword(Keyword::Index) {
                self.expect_keyword(Keyword::On)?;
                let (table, column) = self.parse_indexed_column()?;
                return Ok(Statement::CreateIndex { table, column });
            }
            return Err(self.unexpected("DATABASE, TABLE or INDEX"));
        }

        if self.consume_keyword(Keyword::Drop) {
            if self.consume_keyword(Keyword::Database) {
                let name = self.expect_identifier()?;
                return Ok(Statement::DropDatabase { name });
            }
            if self.consume_keyword(Keyword::Table) {
                let name = self.expect_identifier()?;
                return Ok(Statement::DropTable { name });
            }
            if self.consume_keyword(Keyword::Index) {
                self.expect_keyword(Keyword::On)?;
                let (table, column) = self.parse_indexed_column()?;
                return Ok(Statement::DropIndex { table, column });
            }
            return Err(self.unexpected("DATABASE, TABLE or INDEX"));
        }

        if self.consume_keyword(Keyword::Use) {
            let name = self.expect_identifier()?;
            return Ok(Statement::UseDatabase { name });
        }

        if self.consume_keyword(Keyword::Show) {
            if self.consume_keyword(Keyword::Database) {
                let name = self.expect_identifier()?;
                return Ok(Statement::ShowDatabase { name });
            }
            if self.consume_keyword(Keyword::Table) {
                let name = self.expect_identifier()?;
                return Ok(Statement::ShowTable { name });
            }
            return Err(self.unexpected("DATABASE or TABLE"));
        }

        if self.consume_keyword(Keyword::Rename) {
            self.expect_keyword(Keyword::Table)?;
            let old = self.expect_identifier()?;
            self.expect_keyword(Keyword::To)?;
            let new = self.expect_identifier()?;
            return Ok(Statement::RenameTable { old, new });
        }

        if self.consume_keyword(Keyword::Alter) {
            self.expect_keyword(Keyword::Table)?;
            return self.parse_alter_table();
        }

        if self.consume_keyword(Keyword::Insert) {
            return self.parse_insert();
        }

        if self.consume_keyword(Keyword::Delete) {
            self.expect_keyword(Keyword::From)?;
            let table = self.expect_identifier()?;
            let where_clause = self.parse_opt_where()?;
            return Ok(Statement::Delete(Box::new(DeleteStmt {
                table,
                where_clause,
            })));
        }

        if self.consume_keyword(Keyword::Update) {
            return self.parse_update();
        }

        if self.check_keyword(Keyword::Select) {
            let select = self.parse_select()?;
            return Ok(Statement::Select(Box::new(select)));
        }

        if self.consume_keyword(Keyword::Output) {
            self.expect_keyword(Keyword::To)?;
            if self.consume_keyword(Keyword::Stdout) {
                return Ok(Statement::Output {
                    target: OutputTarget::Stdout,
                });
            }
            let path = self.expect_string()?;
            return Ok(Statement::Output {
                target: OutputTarget::File(path),
            });
        }

        if self.consume_keyword(Keyword::Exit) || self.consume_keyword(Keyword::Quit) {
            return Ok(Statement::Exit);
        }

        Err(self.unexpected("statement"))
    }

    /// Parses `table(column)` as used by CREATE/DROP INDEX.
    fn parse_indexed_column(&mut self) -> Result<(String, String), ParseError> {
        let table = self.expect_identifier()?;
        self.expect_token(&TokenKind::LParen)?;
        let column = self.expect_identifier()?;
        self.expect_token(&TokenKind::RParen)?;
        Ok((table, column))
    }

    fn parse_create_table(&mut self) -> Result<Statement, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_token(&TokenKind::LParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_def()?);
            if !self.consume_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RParen)?;

        Ok(Statement::CreateTable(Box::new(CreateTableStmt {
            name,
            columns,
        })))
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.expect_identifier()?;
        let ty = self.parse_type()?;

        let mut def = ColumnDef {
            name,
            ty,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        };

        loop {
            if self.consume_keyword(Keyword::Not) {
                self.expect_keyword(Keyword::Null)?;
                def.not_null = true;
            } else if self.consume_keyword(Keyword::Unique) {
                def.unique = true;
            } else if self.consume_keyword(Keyword::Primary) {
                self.expect_keyword(Keyword::Key)?;
                def.primary_key = true;
            } else if self.consume_keyword(Keyword::Default) {
                def.default = Some(self.parse_expr()?);
            } else {
                break;
            }
        }

        Ok(def)
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        if self.consume_keyword(Keyword::Int) || self.consume_keyword(Keyword::Integer) {
            return Ok(Type::Int);
        }
        if self.consume_keyword(Keyword::Float) {
            return Ok(Type::Float);
        }
        if self.consume_keyword(Keyword::Bool) || self.consume_keyword(Keyword::Boolean) {
            return Ok(Type::Bool);
        }
        if self.consume_keyword(Keyword::Date) {
            return Ok(Type::Date);
        }
        if self.consume_keyword(Keyword::Char) {
            let n = self.parse_type_capacity()?;
            return Ok(Type::Char(n));
        }
        if self.consume_keyword(Keyword::Varchar) {
            let n = self.parse_type_capacity()?;
            return Ok(Type::Varchar(n));
        }
        Err(self.unexpected("type name"))
    }

    fn parse_type_capacity(&mut self) -> Result<u16, ParseError> {
        self.expect_token(&TokenKind::LParen)?;
        let span = self.current_span();
        let n = match self.current_kind() {
            TokenKind::Integer(n) if *n > 0 && *n <= u16::MAX as i64 => *n as u16,
            _ => return Err(ParseError::new("expected a positive length", span)),
        };
        self.advance();
        self.expect_token(&TokenKind::RParen)?;
        Ok(n)
    }

    fn parse_alter_table(&mut self) -> Result<Statement, ParseError> {
        let table = self.expect_identifier()?;

        let action = if self.consume_keyword(Keyword::Add) {
            self.consume_keyword(Keyword::Column);
            AlterAction::AddColumn(self.parse_column_def()?)
        } else if self.consume_keyword(Keyword::Drop) {
            self.consume_keyword(Keyword::Column);
            AlterAction::DropColumn(self.expect_identifier()?)
        } else if self.consume_keyword(Keyword::Modify) {
            self.consume_keyword(Keyword::Column);
            AlterAction::ModifyColumn(self.parse_column_def()?)
        } else if self.consume_keyword(Keyword::Rename) {
            self.consume_keyword(Keyword::Column);
            let old = self.expect_identifier()?;
            self.expect_keyword(Keyword::To)?;
            let new = self.expect_identifier()?;
            AlterAction::RenameColumn { old, new }
        } else {
            return Err(self.unexpected("ADD, DROP, MODIFY or RENAME"));
        };

        Ok(Statement::AlterTable { table, action })
    }

    fn parse_insert(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier()?;

        let mut columns = Vec::new();
        if self.consume_token(&TokenKind::LParen) {
            loop {
                columns.push(self.expect_identifier()?);
                if !self.consume_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_token(&TokenKind::RParen)?;
        }

        self.expect_keyword(Keyword::Values)?;
        let mut rows = Vec::new();
        loop {
            self.expect_token(&TokenKind::LParen)?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_expr()?);
                if !self.consume_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_token(&TokenKind::RParen)?;
            rows.push(row);
            if !self.consume_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Statement::Insert(Box::new(InsertStmt {
            table,
            columns,
            rows,
        })))
    }

    fn parse_update(&mut self) -> Result<Statement, ParseError> {
        let table = self.expect_identifier()?;
        self.expect_keyword(Keyword::Set)?;
        let column = self.expect_identifier()?;
        self.expect_token(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let where_clause = self.parse_opt_where()?;

        Ok(Statement::Update(Box::new(UpdateStmt {
            table,
            column,
            value,
            where_clause,
        })))
    }

    fn parse_select(&mut self) -> Result<SelectStmt, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let distinct = self.consume_keyword(Keyword::Distinct);

        let mut items = Vec::new();
        if self.consume_token(&TokenKind::Asterisk) {
            items.push(SelectItem::Wildcard);
        } else {
            loop {
                items.push(SelectItem::Expr(self.parse_expr()?));
                if !self.consume_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect_keyword(Keyword::From)?;
        let mut tables = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let alias = if self.consume_keyword(Keyword::As) {
                Some(self.expect_identifier()?)
            } else if let TokenKind::Identifier(_) = self.current_kind() {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            tables.push(TableRef { name, alias });
            if !self.consume_token(&TokenKind::Comma) {
                break;
            }
        }

        let where_clause = self.parse_opt_where()?;

        let mut order_by = Vec::new();
        if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            loop {
                let column = self.expect_identifier()?;
                let ascending = if self.consume_keyword(Keyword::Desc) {
                    false
                } else {
                    self.consume_keyword(Keyword::Asc);
                    true
                };
                order_by.push(OrderByItem { column, ascending });
                if !self.consume_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(SelectStmt {
            distinct,
            items,
            tables,
            where_clause,
            order_by,
        })
    }

    fn parse_opt_where(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.consume_keyword(Keyword::Where) {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // --- Expression parsing (precedence climbing) ---

    /// Parses an expression. Grammar, loosest binding first:
    /// `OR`, `AND`, `NOT`, comparisons / `IS NULL` / `LIKE`,
    /// `+ -`, `* / %`, unary `-`, primary.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.consume_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.consume_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.consume_keyword(Keyword::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        // IS [NOT] NULL
        if self.consume_keyword(Keyword::Is) {
            let negated = self.consume_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        // [NOT] LIKE
        let negated_like = self.check_keyword(Keyword::Not)
            && matches!(
                self.peek_kind(1),
                Some(TokenKind::Keyword(Keyword::Like))
            );
        if negated_like {
            self.advance();
        }
        if self.consume_keyword(Keyword::Like) {
            let pattern = self.parse_additive()?;
            return Ok(Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                negated: negated_like,
            });
        }

        let op = match self.current_kind() {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Neq => BinaryOp::Neq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Asterisk => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.consume_token(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            // Fold literal negation so `-1` is a literal, not an expression
            return Ok(match operand {
                Expr::Int(n) => Expr::Int(-n),
                Expr::Float(n) => Expr::Float(-n),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current_kind().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect_token(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier(name) => {
                self.advance();

                // Aggregate call: COUNT(*) / SUM(e) / ...
                if let Some(func) = AggregateFunc::from_name(&name) {
                    if self.consume_token(&TokenKind::LParen) {
                        let arg = if self.consume_token(&TokenKind::Asterisk) {
                            None
                        } else {
                            Some(Box::new(self.parse_expr()?))
                        };
                        self.expect_token(&TokenKind::RParen)?;
                        return Ok(Expr::Aggregate { func, arg });
                    }
                }

                // Qualified column: table.column
                if self.consume_token(&TokenKind::Dot) {
                    let column = self.expect_identifier()?;
                    return Ok(Expr::Column(ColumnRef {
                        table: Some(name),
                        column,
                    }));
                }

                Ok(Expr::Column(ColumnRef {
                    table: None,
                    column: name,
                }))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    // --- Token helpers ---

    fn current_token(&self) -> &Token {
        // The token stream always ends with EOF, so pos is clamped by advance
        &self.tokens[self.pos]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current_token().kind
    }

    fn peek_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn current_span(&self) -> Span {
        self.current_token().span
    }

    fn is_eof(&self) -> bool {
        self.current_token().is_eof()
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.current_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn consume_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.consume_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(kw.as_str()))
        }
    }

    fn consume_token(&mut self, kind: &TokenKind) -> bool {
        if self.current_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.consume_token(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.display_name()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.current_kind() {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected_token(
            expected,
            &self.current_kind().display_name(),
            self.current_span(),
        )
    }
}
