//! SQL tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes SQL input.
pub struct Lexer<'a> {
    /// The input source text.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            // -- line comment
            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            // /* block comment */
            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '#')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        Keyword::from_str(text).map_or_else(
            || self.make_token(TokenKind::Identifier(text.to_string())),
            |keyword| self.make_token(TokenKind::Keyword(keyword)),
        )
    }

    /// Scans quoted content, doubling the quote character to escape it.
    fn scan_quoted(&mut self, quote: char) -> Result<String, Token> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    if self.peek_next() == Some(quote) {
                        value.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return Ok(value);
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return Err(self.make_token(TokenKind::Error(format!(
                        "Unterminated literal starting with {quote}"
                    ))));
                }
            }
        }
    }

    /// Scans a number (integer or float).
    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E')
            && self
                .peek_next()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_float {
            match text.parse::<f64>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid float: {e}"))),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid integer: {e}"))),
            }
        }
    }

    /// Scans `?` or `?N`.
    fn scan_placeholder(&mut self) -> Token {
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if digits_start == self.pos {
            return self.make_token(TokenKind::Placeholder(None));
        }
        match self.input[digits_start..self.pos].parse::<usize>() {
            Ok(0) => self.make_token(TokenKind::Error(String::from(
                "Bind placeholders are numbered from ?1",
            ))),
            Ok(n) => self.make_token(TokenKind::Placeholder(Some(n))),
            Err(e) => self.make_token(TokenKind::Error(format!("Invalid placeholder: {e}"))),
        }
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '-' => self.make_token(TokenKind::Minus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '=' => self.make_token(TokenKind::Eq),
            '?' => self.scan_placeholder(),
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos = self.start;
                    self.scan_number_with_leading_dot()
                } else {
                    self.make_token(TokenKind::Dot)
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                } else if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.make_token(TokenKind::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.make_token(TokenKind::Error(String::from("Unexpected character: !")))
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::Concat)
                } else {
                    self.make_token(TokenKind::Error(String::from("Unexpected character: |")))
                }
            }

            '\'' | '"' => {
                self.pos = self.start;
                match self.scan_quoted(c) {
                    Ok(value) => self.make_token(TokenKind::String(value)),
                    Err(token) => token,
                }
            }
            '`' => {
                self.pos = self.start;
                match self.scan_quoted('`') {
                    Ok(value) => self.make_token(TokenKind::Identifier(value)),
                    Err(token) => token,
                }
            }

            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }

            c if c.is_alphabetic() || c == '_' => {
                self.pos = self.start;
                self.scan_identifier()
            }

            _ => self.make_token(TokenKind::Error(format!("Unexpected character: {c}"))),
        }
    }

    /// Scans `.5` style floats.
    fn scan_number_with_leading_dot(&mut self) -> Token {
        self.advance();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];
        match format!("0{text}").parse::<f64>() {
            Ok(f) => self.make_token(TokenKind::Float(f)),
            Err(e) => self.make_token(TokenKind::Error(format!("Invalid float: {e}"))),
        }
    }

    /// Tokenizes the entire input. The last token is always `Eof`.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(token_kinds("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            token_kinds("SELECT -- comment\n /* block */ id"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier(String::from("id")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_qualified_identifier() {
        assert_eq!(
            token_kinds("books.author_id"),
            vec![
                TokenKind::Identifier(String::from("books")),
                TokenKind::Dot,
                TokenKind::Identifier(String::from("author_id")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_all_quote_styles() {
        assert_eq!(
            token_kinds("'it''s' \"AS x\" `first name`"),
            vec![
                TokenKind::String(String::from("it's")),
                TokenKind::String(String::from("AS x")),
                TokenKind::Identifier(String::from("first name")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            token_kinds("42 3.5 .25 1e3"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Float(3.5),
                TokenKind::Float(0.25),
                TokenKind::Float(1000.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            token_kinds("= != <> < <= > >= ||"),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Concat,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            token_kinds("? ?2 ?10"),
            vec![
                TokenKind::Placeholder(None),
                TokenKind::Placeholder(Some(2)),
                TokenKind::Placeholder(Some(10)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let kinds = token_kinds("'abc");
        assert!(matches!(kinds[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_span_tracking() {
        let tokens = Lexer::new("SELECT id").tokenize();
        assert_eq!(tokens[0].span, Span::new(0, 6));
        assert_eq!(tokens[1].span, Span::new(7, 9));
    }
}
