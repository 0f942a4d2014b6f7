use crate::tokenizer::{Token, Tokenizer};
use crate::{ColumnDef, DataType, Value, ast::*, error::Error};

/// Tokenizes and parses one statement.
pub fn parse(sql: &str) -> crate::error::Result<Statement> {
    let tokens = Tokenizer::new(sql).tokenize().map_err(Error::Syntax)?;
    Parser::new(tokens).parse().map_err(Error::Syntax)
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Appends [Token::Eof] when `tokens` does not already end with it.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last() != Some(&Token::Eof) {
            tokens.push(Token::Eof);
        }
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Statement, String> {
        let statement = match self.current_token() {
            Token::Create => self.parse_create_table(),
            Token::Drop => self.parse_drop_table(),
            Token::Explain | Token::Describe | Token::Desc => self.parse_describe(),
            Token::Show => self.parse_show_tables(),
            Token::Insert => self.parse_insert(),
            Token::Delete => self.parse_delete(),
            Token::Select => self.parse_select(),
            Token::Exit => {
                self.advance();
                Ok(Statement::Exit)
            }
            _ => Err(format!("Unexpected token: {:?}", self.current_token())),
        }?;

        // semicolon is optional in SQL so skip it
        if matches!(self.current_token(), Token::Semicolon) {
            self.advance();
        }

        // Check we are at the end of the statement
        if !self.is_at_end() {
            return Err(format!(
                "Unexpected token after statement: {:?}",
                self.current_token()
            ));
        }

        Ok(statement)
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    /// Advances past the current token if it is `expected`.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: Token) -> Result<(), String> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(format!(
                "Expected {:?}, found {:?}",
                expected,
                self.current_token()
            ))
        }
    }

    fn consume_ident(&mut self) -> Result<String, String> {
        match self.current_token() {
            Token::Ident(string) => {
                let string = string.clone();
                self.advance();
                Ok(string)
            }
            _ => Err(format!(
                "Expected identifier, found {:?}",
                self.current_token()
            )),
        }
    }

    /// `'(' ident (',' ident)* ')'`
    fn parse_ident_list(&mut self) -> Result<Vec<String>, String> {
        self.consume(Token::LeftParen)?;
        let mut names = vec![self.consume_ident()?];
        while self.eat(&Token::Comma) {
            names.push(self.consume_ident()?);
        }
        self.consume(Token::RightParen)?;
        Ok(names)
    }

    fn consume_data_type(&mut self) -> Result<DataType, String> {
        match self.current_token() {
            Token::Int => {
                self.advance();
                Ok(DataType::Int)
            }
            Token::Date => {
                self.advance();
                Ok(DataType::Date)
            }
            Token::Char => {
                self.advance();
                self.consume(Token::LeftParen)?;
                let len = match self.current_token() {
                    Token::Number(n) => u32::try_from(*n)
                        .map_err(|_| format!("char length {n} is too large"))?,
                    other => return Err(format!("Expected char length, found {other:?}")),
                };
                self.advance();
                self.consume(Token::RightParen)?;
                Ok(DataType::Char(len))
            }
            _ => Err(format!(
                "current token {:?} is not a column type",
                self.current_token()
            )),
        }
    }

    // --- DDL ---

    fn parse_create_table(&mut self) -> Result<Statement, String> {
        self.consume(Token::Create)?;
        self.consume(Token::Table)?;
        let name = self.consume_ident()?;
        self.consume(Token::LeftParen)?;

        let mut create = CreateTable {
            name,
            ..Default::default()
        };
        loop {
            match self.current_token() {
                Token::Primary => {
                    self.advance();
                    self.consume(Token::Key)?;
                    create.primary_keys.push(self.parse_ident_list()?);
                }
                Token::Foreign => create.foreign_keys.push(self.parse_foreign_key()?),
                _ => {
                    let (column, not_null) = self.parse_column_def()?;
                    if not_null {
                        create.not_null.insert(column.name.clone());
                    }
                    create.columns.push(column);
                }
            }
            match self.current_token() {
                Token::RightParen => {
                    self.advance();
                    break;
                }
                Token::Comma => {
                    self.advance();
                    continue;
                }
                _ => return Err("Expected ',' or ')'".into()),
            }
        }
        Ok(Statement::CreateTable(create))
    }

    /// `name type [NOT NULL]`; the flag tells whether NOT NULL was written.
    fn parse_column_def(&mut self) -> Result<(ColumnDef, bool), String> {
        let name = self.consume_ident()?;
        let data_type = self.consume_data_type()?;

        let not_null = self.eat(&Token::Not);
        if not_null {
            self.consume(Token::Null)?;
        }
        Ok((ColumnDef { name, data_type }, not_null))
    }

    fn parse_foreign_key(&mut self) -> Result<ForeignKeyDef, String> {
        self.consume(Token::Foreign)?;
        self.consume(Token::Key)?;
        let columns = self.parse_ident_list()?;
        self.consume(Token::References)?;
        let ref_table = self.consume_ident()?;
        let ref_columns = self.parse_ident_list()?;

        match (columns.as_slice(), ref_columns.as_slice()) {
            ([column], [ref_column]) => Ok(ForeignKeyDef {
                column: column.clone(),
                ref_table,
                ref_column: ref_column.clone(),
            }),
            _ => Err("foreign keys must name exactly one column on each side".into()),
        }
    }

    fn parse_drop_table(&mut self) -> Result<Statement, String> {
        self.consume(Token::Drop)?;
        self.consume(Token::Table)?;
        Ok(Statement::DropTable(self.consume_ident()?))
    }

    fn parse_describe(&mut self) -> Result<Statement, String> {
        self.advance(); // EXPLAIN, DESCRIBE or DESC
        Ok(Statement::DescribeTable(self.consume_ident()?))
    }

    fn parse_show_tables(&mut self) -> Result<Statement, String> {
        self.consume(Token::Show)?;
        self.consume(Token::Tables)?;
        Ok(Statement::ShowTables)
    }

    // --- DML ---

    fn parse_insert(&mut self) -> Result<Statement, String> {
        self.consume(Token::Insert)?;
        self.consume(Token::Into)?;
        let table = self.consume_ident()?;

        let columns = if matches!(self.current_token(), Token::LeftParen) {
            Some(self.parse_ident_list()?)
        } else {
            None
        };

        self.consume(Token::Values)?;
        self.consume(Token::LeftParen)?;
        let mut values = vec![self.parse_literal()?];
        while self.eat(&Token::Comma) {
            values.push(self.parse_literal()?);
        }
        self.consume(Token::RightParen)?;

        Ok(Statement::InsertInto(InsertInto {
            table,
            columns,
            values,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement, String> {
        self.consume(Token::Delete)?;
        self.consume(Token::From)?;
        let table = self.consume_ident()?;
        let where_clause = self.parse_where()?;
        Ok(Statement::Delete(Delete {
            table,
            where_clause,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement, String> {
        self.consume(Token::Select)?;

        let columns = if self.eat(&Token::Star) {
            ColumnsSelect::Star
        } else {
            let mut refs = vec![self.parse_column_ref()?];
            while self.eat(&Token::Comma) {
                refs.push(self.parse_column_ref()?);
            }
            ColumnsSelect::Columns(refs)
        };

        self.consume(Token::From)?;
        let mut tables = vec![self.consume_ident()?];
        while self.eat(&Token::Comma) {
            tables.push(self.consume_ident()?);
        }

        let where_clause = self.parse_where()?;
        Ok(Statement::Select(Select {
            columns,
            tables,
            where_clause,
        }))
    }

    fn parse_where(&mut self) -> Result<Option<Expr>, String> {
        if self.eat(&Token::Where) {
            self.parse_expr().map(Some)
        } else {
            Ok(None)
        }
    }

    // --- Expressions ---
    //
    // OR binds loosest, then AND, then NOT.

    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_term()?;
        while self.eat(&Token::Or) {
            let right = self.parse_term()?;
            left = Expr::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_factor()?;
        while self.eat(&Token::And) {
            let right = self.parse_factor()?;
            left = Expr::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_factor()?)));
        }
        if self.eat(&Token::LeftParen) {
            let expr = self.parse_expr()?;
            self.consume(Token::RightParen)?;
            return Ok(expr);
        }

        let left = self.parse_operand()?;
        if self.eat(&Token::Is) {
            let negated = self.eat(&Token::Not);
            self.consume(Token::Null)?;
            return Ok(Expr::IsNull {
                operand: left,
                negated,
            });
        }

        let op = self.parse_comparison_op()?;
        let right = self.parse_operand()?;
        Ok(Expr::Comparison { left, op, right })
    }

    fn parse_comparison_op(&mut self) -> Result<ComparisonOp, String> {
        let op = match self.current_token() {
            Token::Lower => ComparisonOp::Lt,
            Token::LowerEqual => ComparisonOp::LtEq,
            Token::Greater => ComparisonOp::Gt,
            Token::GreaterEqual => ComparisonOp::GtEq,
            Token::Equal => ComparisonOp::Eq,
            Token::NotEqual => ComparisonOp::NotEq,
            other => return Err(format!("Expected comparison operator, found {other:?}")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        if matches!(self.current_token(), Token::Ident(_)) {
            self.parse_column_ref().map(Operand::Column)
        } else {
            self.parse_literal().map(Operand::Literal)
        }
    }

    /// `[table '.'] column`
    fn parse_column_ref(&mut self) -> Result<ColumnRef, String> {
        let first = self.consume_ident()?;
        if self.eat(&Token::Dot) {
            let column = self.consume_ident()?;
            Ok(ColumnRef::qualified(first, column))
        } else {
            Ok(ColumnRef::bare(first))
        }
    }

    fn parse_literal(&mut self) -> Result<Value, String> {
        let value = match self.current_token() {
            Token::Number(n) => Value::Int(*n),
            Token::String(s) => Value::Char(s.as_str().into()),
            Token::Null => Value::Null,
            Token::Minus => {
                self.advance();
                return match self.current_token() {
                    Token::Number(n) => {
                        let value = Value::Int(-n);
                        self.advance();
                        Ok(value)
                    }
                    other => Err(format!("Expected number after '-', found {other:?}")),
                };
            }
            other => return Err(format!("Expected a value, found {other:?}")),
        };
        self.advance();
        Ok(value)
    }
}
