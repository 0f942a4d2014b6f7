/// Represents the smallest meaningful units (atoms) of the SQL language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- SQL Keywords ---
    Create,
    Table,
    Drop,
    Explain,
    Describe,
    Desc,
    Show,
    Tables,
    Insert,
    Into,
    Values,
    Delete,
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    Is,
    Null,
    Primary,
    Foreign,
    Key,
    References,
    Exit,

    // --- Data Types ---
    Int,
    Char,
    Date,

    // --- Identifiers & Literals ---
    /// A table or column name, lower-cased (e.g., `users`, `dept_id`).
    Ident(String),
    /// A non-negative 64-bit integer literal (e.g., `42`). The sign is a
    /// separate [Token::Minus].
    Number(i64),
    /// A string literal, defined between single quotes (e.g., `'Alice'`).
    /// A doubled quote inside stands for one quote.
    String(String),

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Multiplication or wildcard symbol `*`
    Star,
    /// Qualifier separator `.`
    Dot,
    /// Minus sign `-`
    Minus,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `<`
    Lower,
    /// `<=`
    LowerEqual,
    /// `=`
    Equal,
    /// `!=` or `<>`
    NotEqual,

    // --- Special ---
    /// Represents the End Of File/Input.
    Eof,
}

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens, always
    /// terminated by [Token::Eof].
    ///
    /// # Errors
    /// Returns an error if an invalid character is encountered or if a literal
    /// (like a string) is malformed.
    ///
    /// # Example
    /// ```
    /// # use reldb::tokenizer::{Tokenizer, Token};
    /// let mut t = Tokenizer::new("SELECT * FROM Emp");
    /// let tokens = t.tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Select);
    /// assert_eq!(tokens[3], Token::Ident("emp".into()));
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token, String> {
        let ch = self.current_char();

        let single = match ch {
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '*' => Some(Token::Star),
            '.' => Some(Token::Dot),
            '-' => Some(Token::Minus),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '>' => {
                self.advance();
                Ok(self.follow('=', Token::GreaterEqual, Token::Greater))
            }
            '<' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::LowerEqual)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::NotEqual)
                    }
                    _ => Ok(Token::Lower),
                }
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::NotEqual)
                } else {
                    Err("expected '=' after '!'".into())
                }
            }
            c if c.is_alphabetic() => Ok(self.read_identifier()),
            c if c.is_ascii_digit() => self.read_number(),
            '\'' => self.read_string(),
            _ => Err(format!("character: {:?} is not supported", ch)),
        }
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// `matched` if the next character is `next` (consuming it), `otherwise`
    /// if not.
    fn follow(&mut self, next: char, matched: Token, otherwise: Token) -> Token {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            otherwise
        }
    }

    /// Moves the cursor forward by one character.
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes any whitespace characters (spaces, tabs, newlines).
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads a sequence of alphanumeric characters and determines if it's
    /// a reserved SQL keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively and identifiers are
    /// lower-cased.
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            ident.push(self.current_char());
            self.advance();
        }

        match ident.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "TABLE" => Token::Table,
            "DROP" => Token::Drop,
            "EXPLAIN" => Token::Explain,
            "DESCRIBE" => Token::Describe,
            "DESC" => Token::Desc,
            "SHOW" => Token::Show,
            "TABLES" => Token::Tables,
            "INSERT" => Token::Insert,
            "INTO" => Token::Into,
            "VALUES" => Token::Values,
            "DELETE" => Token::Delete,
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "IS" => Token::Is,
            "NULL" => Token::Null,
            "PRIMARY" => Token::Primary,
            "FOREIGN" => Token::Foreign,
            "KEY" => Token::Key,
            "REFERENCES" => Token::References,
            "EXIT" => Token::Exit,
            "INT" => Token::Int,
            "CHAR" => Token::Char,
            "DATE" => Token::Date,
            _ => Token::Ident(ident.to_lowercase()),
        }
    }

    /// Reads an unsigned integer literal.
    fn read_number(&mut self) -> Result<Token, String> {
        let mut number = String::new();

        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            number.push(self.current_char());
            self.advance();
        }

        if !self.is_at_end() && self.current_char() == '.' {
            return Err("only integer literals are supported".into());
        }

        number
            .parse::<i64>()
            .map(Token::Number)
            .map_err(|e| format!("invalid number {number}: {e}"))
    }

    /// Reads a string literal enclosed in single quotes.
    fn read_string(&mut self) -> Result<Token, String> {
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        loop {
            if self.is_at_end() {
                return Err("Unterminated string".into());
            }
            let c = self.current_char();
            self.advance();
            if c != '\'' {
                string.push(c);
                continue;
            }
            if self.peek() == Some('\'') {
                self.advance();
                string.push('\'');
                continue;
            }
            break;
        }

        Ok(Token::String(string))
    }
}
