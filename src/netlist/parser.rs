//! Parser for the netlist format.

use super::lexer::{parse_value, Token, TokenKind};
use super::Netlist;
use crate::circuit::{ElementKind, Point};
use crate::error::{LumpedError, Result};
use crate::solver::Scheme;

/// Line-oriented parser over a token list.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<Netlist> {
        let mut netlist = Netlist::default();

        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Newline => continue,
                TokenKind::Directive => self.parse_directive(&token, &mut netlist)?,
                TokenKind::Word => self.parse_element(&token, &mut netlist)?,
                TokenKind::Quoted => {
                    return Err(LumpedError::netlist(
                        token.line,
                        format!("unexpected expression \"{}\"", token.text),
                    ))
                }
            }
            self.end_of_line(token.line)?;
        }

        Ok(netlist)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn end_of_line(&mut self, line: usize) -> Result<()> {
        if self.at_line_end() {
            return Ok(());
        }
        Err(LumpedError::netlist(
            line,
            format!("unexpected trailing '{}'", self.current().text),
        ))
    }

    /// Next bare word on this line.
    fn word(&mut self, line: usize, what: &str) -> Result<String> {
        if self.current().kind == TokenKind::Word {
            Ok(self.advance().text)
        } else {
            Err(LumpedError::netlist(line, format!("expected {}", what)))
        }
    }

    fn number(&mut self, line: usize, what: &str) -> Result<f64> {
        let text = self.word(line, what)?;
        parse_value(&text)
            .ok_or_else(|| LumpedError::netlist(line, format!("invalid {} '{}'", what, text)))
    }

    fn point(&mut self, line: usize) -> Result<Point> {
        let x = self.number(line, "x coordinate")?;
        let y = self.number(line, "y coordinate")?;
        Ok(Point::new(x, y))
    }

    fn optional_word(&mut self) -> Option<String> {
        (self.current().kind == TokenKind::Word).then(|| self.advance().text)
    }

    fn parse_directive(&mut self, directive: &Token, netlist: &mut Netlist) -> Result<()> {
        let line = directive.line;
        match directive.text.to_lowercase().as_str() {
            ".dt" => netlist.dt = Some(self.number(line, "time step")?),
            ".maxtime" => netlist.maxtime = Some(self.number(line, "end time")?),
            ".scheme" => {
                let name = self.word(line, "scheme name")?;
                let scheme = name
                    .parse::<Scheme>()
                    .map_err(|e| LumpedError::netlist(line, e.to_string()))?;
                netlist.scheme = Some(scheme);
            }
            ".listen_p" => {
                let at = self.point(line)?;
                let name = self
                    .optional_word()
                    .unwrap_or_else(|| format!("P({},{})", at.x, at.y));
                if !netlist.schematic.listen_pressure(at, name) {
                    return Err(LumpedError::netlist(
                        line,
                        format!("no endpoint at {}", at),
                    ));
                }
            }
            ".listen_q" => {
                let element = self.word(line, "element name")?;
                let id = netlist.schematic.find_element(&element).ok_or_else(|| {
                    LumpedError::netlist(line, format!("element '{}' not found", element))
                })?;
                let name = self.optional_word().unwrap_or_else(|| format!("Q({})", element));
                netlist.schematic.listen_flow(id, name);
            }
            other => {
                return Err(LumpedError::netlist(
                    line,
                    format!("unknown directive: {}", other),
                ))
            }
        }
        Ok(())
    }

    fn parse_element(&mut self, keyword: &Token, netlist: &mut Netlist) -> Result<()> {
        let line = keyword.line;
        let kind = ElementKind::from_keyword(&keyword.text).ok_or_else(|| {
            LumpedError::netlist(line, format!("unknown element type '{}'", keyword.text))
        })?;
        let name = self.word(line, "element name")?;
        if netlist.schematic.find_element(&name).is_some() {
            return Err(LumpedError::netlist(
                line,
                format!("duplicate element name '{}'", name),
            ));
        }
        let from = self.point(line)?;
        let to = self.point(line)?;

        let mut expression = None;
        let value = match self.current().kind {
            TokenKind::Word => self.number(line, "value")?,
            TokenKind::Quoted => {
                expression = Some(self.advance().text);
                0.0
            }
            _ => 0.0,
        };

        if expression.is_some() && !kind.is_source() {
            return Err(LumpedError::netlist(
                line,
                format!("a {} cannot take an expression", kind),
            ));
        }

        let id = netlist.schematic.add_element(kind, &name, from, to, value);
        if let Some(expression) = expression {
            netlist.schematic.set_expression(id, expression);
        }
        Ok(())
    }
}
