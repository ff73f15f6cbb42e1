//! Lexer (tokenizer) for source expressions.

use super::ast::{supported_identifiers, Function, CONSTANTS, TIME_VARIABLE};
use crate::error::{LumpedError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal, already scanned
    Number(f64),
    /// Known function name
    Function,
    /// `e` or `pi`
    Constant(f64),
    /// The time variable
    Variable,
    /// Binary operator or sign
    Operator,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// End of input
    Eof,
}

const OPERATOR_CHARS: &str = "*/%+-<>=!&^|";

/// Lexer for tokenizing expression input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            column: 1,
        }
    }

    /// Tokenize the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let column = self.column;
        let ch = match self.peek() {
            Some(ch) => ch,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    column,
                })
            }
        };

        let (kind, text) = match ch {
            '(' => {
                self.advance();
                (TokenKind::OpenParen, "(".to_string())
            }
            ')' => {
                self.advance();
                (TokenKind::CloseParen, ")".to_string())
            }
            '0'..='9' | '.' => {
                let text = self.read_number();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| LumpedError::BadNumber {
                        text: text.clone(),
                        column,
                    })?;
                (TokenKind::Number(value), text)
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let text = self.read_identifier();
                (classify_identifier(&text)?, text)
            }
            _ if OPERATOR_CHARS.contains(ch) => {
                let text = self.read_operator(column)?;
                (TokenKind::Operator, text)
            }
            _ => {
                return Err(LumpedError::UnexpectedCharacter {
                    character: ch,
                    column,
                })
            }
        };

        Ok(Token { kind, text, column })
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        self.column += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    fn take_while(&mut self, text: &mut String, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        self.take_while(&mut text, |ch| ch.is_alphanumeric() || ch == '_');
        text
    }

    /// Greedy scan of a decimal or scientific literal. The text is validated
    /// by the caller, so `3.3.3` is read whole and then rejected.
    fn read_number(&mut self) -> String {
        let mut text = String::new();
        self.take_while(&mut text, |ch| ch.is_ascii_digit() || ch == '.');
        if matches!(self.peek(), Some('e' | 'E')) {
            self.take_while(&mut text, |ch| ch == 'e' || ch == 'E');
            self.take_while(&mut text, |ch| ch == '+' || ch == '-');
            self.take_while(&mut text, |ch| ch.is_ascii_digit() || ch == '.');
        }
        text
    }

    fn read_operator(&mut self, column: usize) -> Result<String> {
        let mut text = String::new();
        if let Some(first) = self.advance() {
            text.push(first);
        }
        // Two-character operators
        if let Some(second) = self.peek() {
            let pair = format!("{}{}", text, second);
            if matches!(pair.as_str(), "**" | "<=" | ">=" | "==" | "!=") {
                self.advance();
                return Ok(pair);
            }
        }
        if text == "=" || text == "!" {
            let character = text.chars().next().unwrap_or('=');
            return Err(LumpedError::UnexpectedCharacter { character, column });
        }
        Ok(text)
    }
}

fn classify_identifier(name: &str) -> Result<TokenKind> {
    if Function::from_name(name).is_some() {
        return Ok(TokenKind::Function);
    }
    if let Some(&(_, value)) = CONSTANTS.iter().find(|(n, _)| *n == name) {
        return Ok(TokenKind::Constant(value));
    }
    if name == TIME_VARIABLE {
        return Ok(TokenKind::Variable);
    }
    Err(LumpedError::UnknownIdentifier {
        name: name.to_string(),
        supported: supported_identifiers(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_mixed_expression() {
        assert_eq!(
            kinds("2*sin(t) <= pi"),
            vec![
                TokenKind::Number(2.0),
                TokenKind::Operator,
                TokenKind::Function,
                TokenKind::OpenParen,
                TokenKind::Variable,
                TokenKind::CloseParen,
                TokenKind::Operator,
                TokenKind::Constant(std::f64::consts::PI),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_scientific_numbers() {
        assert_eq!(kinds("3e3")[0], TokenKind::Number(3000.0));
        assert_eq!(kinds("1.5e-2")[0], TokenKind::Number(0.015));
        assert_eq!(kinds(".5")[0], TokenKind::Number(0.5));
    }

    #[test]
    fn test_two_character_operators() {
        let tokens = Lexer::new("2**3 != 1").tokenize().unwrap();
        assert_eq!(tokens[1].text, "**");
        assert_eq!(tokens[3].text, "!=");
        assert_eq!(tokens[3].column, 6);
    }

    #[test]
    fn test_bad_numbers() {
        assert!(matches!(
            Lexer::new("3.3.3").tokenize(),
            Err(LumpedError::BadNumber { .. })
        ));
        match Lexer::new("1 + 3e3.3").tokenize() {
            Err(LumpedError::BadNumber { text, column }) => {
                assert_eq!(text, "3e3.3");
                assert_eq!(column, 5);
            }
            other => panic!("expected bad number, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_character() {
        match Lexer::new("3 + @").tokenize() {
            Err(LumpedError::UnexpectedCharacter { character, column }) => {
                assert_eq!(character, '@');
                assert_eq!(column, 5);
            }
            other => panic!("expected unexpected character, got {:?}", other),
        }
        assert!(Lexer::new("1 = 1").tokenize().is_err());
    }

    #[test]
    fn test_unknown_identifier() {
        match Lexer::new("son(3)").tokenize() {
            Err(LumpedError::UnknownIdentifier { name, supported }) => {
                assert_eq!(name, "son");
                assert!(supported.contains("sin"));
            }
            other => panic!("expected unknown identifier, got {:?}", other),
        }
    }
}
