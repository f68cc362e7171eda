//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens.

use crate::error::XPathError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),     // NCName
    NameTest(String), // prefix:* or prefix:local
    NodeType(String), // node(), text(), comment(), processing-instruction()

    // Axis
    Axis(String), // child::, descendant::, etc.

    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    Eof,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Single-character token, consuming it
    fn single(&mut self, token: Token) -> Token {
        self.advance(1);
        token
    }

    /// Two-character token when the next char matches, else the single one
    fn pair(&mut self, next: char, double: Token, single: Token) -> Token {
        self.advance(1);
        if self.peek() == Some(next) {
            self.advance(1);
            double
        } else {
            single
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, XPathError> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '/' => self.pair('/', Token::DoubleSlash, Token::Slash),
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()
                } else {
                    self.pair('.', Token::DoubleDot, Token::Dot)
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Eq),
            '!' => {
                self.advance(1);
                if self.peek() != Some('=') {
                    return Err(self.unexpected('!'));
                }
                self.advance(1);
                Token::NotEq
            }
            '<' => self.pair('=', Token::LtEq, Token::Lt),
            '>' => self.pair('=', Token::GtEq, Token::Gt),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '$' => self.single(Token::Dollar),
            ':' => {
                self.advance(1);
                if self.peek() != Some(':') {
                    return Err(self.unexpected(':'));
                }
                self.advance(1);
                Token::DoubleColon
            }
            '"' | '\'' => self.read_string(c)?,
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => return Err(self.unexpected(c)),
        };
        Ok(token)
    }

    fn unexpected(&self, c: char) -> XPathError {
        XPathError::Syntax(format!(
            "Unexpected character '{}' at offset {} in '{}'",
            c, self.pos, self.input
        ))
    }

    /// Read a number literal
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }

        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    /// Read a string literal delimited by `quote`
    fn read_string(&mut self, quote: char) -> Result<Token, XPathError> {
        let open = self.pos;
        self.advance(1);
        let start = self.pos;

        let Some(len) = self.remaining().find(quote) else {
            return Err(XPathError::Syntax(format!(
                "Unterminated string literal at offset {} in '{}'",
                open, self.input
            )));
        };
        let value = self.input[start..start + len].to_string();
        self.advance(len + 1);
        Ok(Token::String(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name, keyword, axis name, node type or qualified name test
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        match name {
            "and" => Token::And,
            "or" => Token::Or,
            "mod" => Token::Mod,
            "div" => Token::Div,
            _ => {
                // Whitespace may separate a name from "::" or "("
                let after_name = self.pos;
                self.skip_whitespace();
                if self.remaining().starts_with("::") {
                    return Token::Axis(name.to_string());
                }
                if self.peek() == Some('(') {
                    return match name {
                        "node" | "text" | "comment" | "processing-instruction" => {
                            Token::NodeType(name.to_string())
                        }
                        _ => Token::Name(name.to_string()),
                    };
                }
                self.pos = after_name;

                if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
                    self.advance(1);
                    if self.peek() == Some('*') {
                        self.advance(1);
                        return Token::NameTest(format!("{}:*", name));
                    }
                    let local = self.read_ncname();
                    return Token::NameTest(format!("{}:{}", name, local));
                }
                Token::Name(name.to_string())
            }
        }
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, XPathError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/root/child"),
            vec![
                Token::Slash,
                Token::Name("root".to_string()),
                Token::Slash,
                Token::Name("child".to_string()),
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::String("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis() {
        let mut lexer = Lexer::new("child::element");
        assert_eq!(lexer.next_token().unwrap(), Token::Axis("child".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::DoubleColon);
        assert_eq!(lexer.next_token().unwrap(), Token::Name("element".to_string()));
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(tokens("p:item"), vec![Token::NameTest("p:item".to_string())]);
        assert_eq!(tokens("p:*"), vec![Token::NameTest("p:*".to_string())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("1.5"), vec![Token::Number(1.5)]);
        assert_eq!(tokens(".5"), vec![Token::Number(0.5)]);
        assert!(matches!(tokens("position() = 1").last(), Some(Token::Number(n)) if *n == 1.0));
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("'open").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
        assert!(Lexer::new("a # b").tokenize().is_err());
    }
}
