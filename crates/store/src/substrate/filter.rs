//! Filter language parser and evaluator.
//!
//! Grammar:
//!
//! ```text
//! union        := intersection ('|' intersection)*
//! intersection := unary+
//! unary        := '-' unary | primary
//! primary      := '*' | '(' union ')' | '@' field ':' (tag | range)
//! tag          := '{' value ('|' value)* '}'      value may end in '*' (prefix)
//! range        := '[' bound bound ']'             bound: number | -inf | inf, '(' = exclusive
//! ```
//!
//! A backslash escapes the following character inside tag values.

use super::{FieldKind, IndexDefinition};
use crate::error::{StoreError, StoreResult};
use serde_json::Value;

/// One alternative of a tag condition.
#[derive(Clone, Debug, PartialEq)]
pub enum TagMatch {
    Exact(String),
    Prefix(String),
}

/// Numeric range bound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

/// Parsed filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Tag { field: String, any: Vec<TagMatch> },
    Range { field: String, min: Bound, max: Bound },
}

impl Filter {
    /// Parse a filter string.
    pub fn parse(input: &str) -> StoreResult<Self> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
            input,
        };
        parser.skip_ws();
        if parser.at_end() {
            return Err(StoreError::Query("empty query".to_string()));
        }
        let filter = parser.union()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(filter)
    }

    /// Check every referenced field exists in the index with a matching type.
    pub fn check(&self, index: &IndexDefinition) -> StoreResult<()> {
        match self {
            Filter::All => Ok(()),
            Filter::And(items) | Filter::Or(items) => {
                items.iter().try_for_each(|item| item.check(index))
            }
            Filter::Not(inner) => inner.check(index),
            Filter::Tag { field, .. } => expect_kind(index, field, FieldKind::Tag),
            Filter::Range { field, .. } => expect_kind(index, field, FieldKind::Numeric),
        }
    }

    /// Evaluate against a document. Fields are resolved through the index schema.
    pub fn matches(&self, index: &IndexDefinition, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::And(items) => items.iter().all(|item| item.matches(index, document)),
            Filter::Or(items) => items.iter().any(|item| item.matches(index, document)),
            Filter::Not(inner) => !inner.matches(index, document),
            Filter::Tag { field, any } => {
                let Some(schema) = index.field(field) else {
                    return false;
                };
                let values = schema.tag_values(document);
                values.iter().any(|value| {
                    any.iter().any(|m| tag_matches(m, value, schema.case_sensitive))
                })
            }
            Filter::Range { field, min, max } => index
                .field(field)
                .and_then(|schema| schema.numeric_value(document))
                .is_some_and(|value| in_range(value, *min, *max)),
        }
    }
}

fn expect_kind(index: &IndexDefinition, field: &str, kind: FieldKind) -> StoreResult<()> {
    match index.field(field) {
        Some(schema) if schema.kind == kind => Ok(()),
        Some(_) => Err(StoreError::Query(format!(
            "field @{field} is not a {} field",
            match kind {
                FieldKind::Tag => "tag",
                FieldKind::Numeric => "numeric",
            }
        ))),
        None => Err(StoreError::Query(format!("unknown field @{field}"))),
    }
}

fn tag_matches(pattern: &TagMatch, value: &str, case_sensitive: bool) -> bool {
    let fold = |s: &str| {
        if case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };
    match pattern {
        TagMatch::Exact(expected) => fold(value) == fold(expected),
        TagMatch::Prefix(prefix) => fold(value).starts_with(&fold(prefix)),
    }
}

fn in_range(value: f64, min: Bound, max: Bound) -> bool {
    let above = if min.exclusive {
        value > min.value
    } else {
        value >= min.value
    };
    let below = if max.exclusive {
        value < max.value
    } else {
        value <= max.value
    };
    above && below
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> StoreResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{expected}'"))),
        }
    }

    fn error(&self, message: &str) -> StoreError {
        StoreError::Query(format!(
            "{message} at offset {} in '{}'",
            self.pos, self.input
        ))
    }

    fn union(&mut self) -> StoreResult<Filter> {
        let mut branches = vec![self.intersection()?];
        loop {
            self.skip_ws();
            if self.peek() != Some('|') {
                break;
            }
            self.bump();
            branches.push(self.intersection()?);
        }
        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            Filter::Or(branches)
        })
    }

    fn intersection(&mut self) -> StoreResult<Filter> {
        let mut terms = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None | Some(')') | Some('|') => break,
                _ => terms.push(self.unary()?),
            }
        }
        match terms.len() {
            0 => Err(self.error("expected a term")),
            1 => Ok(terms.remove(0)),
            _ => Ok(Filter::And(terms)),
        }
    }

    fn unary(&mut self) -> StoreResult<Filter> {
        if self.peek() == Some('-') {
            self.bump();
            return Ok(Filter::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> StoreResult<Filter> {
        match self.peek() {
            Some('*') => {
                self.bump();
                Ok(Filter::All)
            }
            Some('(') => {
                self.bump();
                let inner = self.union()?;
                self.skip_ws();
                self.expect(')')?;
                Ok(inner)
            }
            Some('@') => {
                self.bump();
                let field = self.field_name()?;
                self.expect(':')?;
                self.skip_ws();
                match self.peek() {
                    Some('{') => {
                        self.bump();
                        let any = self.tag_body()?;
                        Ok(Filter::Tag { field, any })
                    }
                    Some('[') => {
                        self.bump();
                        let (min, max) = self.range_body()?;
                        Ok(Filter::Range { field, min, max })
                    }
                    _ => Err(self.error("expected '{' or '['")),
                }
            }
            _ => Err(self.error("unexpected character")),
        }
    }

    fn field_name(&mut self) -> StoreResult<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a field name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn tag_body(&mut self) -> StoreResult<Vec<TagMatch>> {
        let mut alternatives = Vec::new();
        // (char, escaped) pairs of the alternative being read
        let mut current: Vec<(char, bool)> = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated tag")),
                Some('\\') => match self.bump() {
                    Some(c) => current.push((c, true)),
                    None => return Err(self.error("dangling escape")),
                },
                Some('|') => {
                    alternatives.push(self.tag_match(std::mem::take(&mut current))?);
                }
                Some('}') => {
                    alternatives.push(self.tag_match(current)?);
                    return Ok(alternatives);
                }
                Some(c) => current.push((c, false)),
            }
        }
    }

    fn tag_match(&self, mut chars: Vec<(char, bool)>) -> StoreResult<TagMatch> {
        while chars.last().is_some_and(|(c, escaped)| !escaped && c.is_whitespace()) {
            chars.pop();
        }
        let leading = chars
            .iter()
            .take_while(|(c, escaped)| !escaped && c.is_whitespace())
            .count();
        chars.drain(..leading);

        let prefix = chars.last() == Some(&('*', false));
        if prefix {
            chars.pop();
        }
        if chars.is_empty() {
            return Err(self.error("empty tag value"));
        }
        let text: String = chars.into_iter().map(|(c, _)| c).collect();
        Ok(if prefix {
            TagMatch::Prefix(text)
        } else {
            TagMatch::Exact(text)
        })
    }

    fn range_body(&mut self) -> StoreResult<(Bound, Bound)> {
        self.skip_ws();
        let min = self.bound()?;
        self.skip_ws();
        let max = self.bound()?;
        self.skip_ws();
        self.expect(']')?;
        Ok((min, max))
    }

    fn bound(&mut self) -> StoreResult<Bound> {
        let exclusive = self.peek() == Some('(');
        if exclusive {
            self.bump();
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != ']')
        {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        let value = match token.as_str() {
            "-inf" => f64::NEG_INFINITY,
            "inf" | "+inf" => f64::INFINITY,
            "" => return Err(self.error("expected a range bound")),
            other => other
                .parse()
                .map_err(|_| self.error(&format!("invalid range bound '{other}'")))?,
        };
        Ok(Bound { value, exclusive })
    }
}
