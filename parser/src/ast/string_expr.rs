use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::lexer::{escape_ident, quote};
use crate::parser::{ParseError, ParseResult};

/// A single operand of a string concatenation.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringSegment {
    Literal(String),
    Ident(String),
}

impl Display for StringSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StringSegment::Literal(lit) => write!(f, "{}", quote(lit)),
            StringSegment::Ident(ident) => write!(f, "{}", escape_ident(ident)),
        }
    }
}

/// StringExpr is a `+` concatenation of string literals and WITH template names,
/// i.e. `"foo" + x + "bar"`. Adjacent literals are merged as they are pushed.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringExpr {
    segments: Vec<StringSegment>,
}

impl StringExpr {
    pub fn new<S: Into<String>>(s: S) -> Self {
        StringExpr {
            segments: vec![StringSegment::Literal(s.into())],
        }
    }

    pub fn new_identifier<S: Into<String>>(ident: S) -> Self {
        StringExpr {
            segments: vec![StringSegment::Ident(ident.into())],
        }
    }

    pub fn push_str(&mut self, tok: &str) {
        if let Some(StringSegment::Literal(value)) = self.segments.last_mut() {
            value.push_str(tok);
            return;
        }
        self.segments.push(StringSegment::Literal(tok.to_string()));
    }

    pub fn push_ident(&mut self, tok: &str) {
        self.segments.push(StringSegment::Ident(tok.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_literal_only(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, StringSegment::Literal(_)))
    }

    /// Returns the template name if the expression is a lone identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [StringSegment::Ident(ident)] => Some(ident),
            _ => None,
        }
    }

    /// Returns the concatenated value if no segment refers to a template.
    pub fn get_literal(&self) -> Option<String> {
        let mut res = String::new();
        for s in &self.segments {
            match s {
                StringSegment::Literal(lit) => res.push_str(lit),
                StringSegment::Ident(_) => return None,
            }
        }
        Some(res)
    }

    /// Concatenates the segments, resolving template names with `resolve_fn`.
    pub fn resolve<F>(&self, mut resolve_fn: F) -> ParseResult<String>
    where
        F: FnMut(&str) -> ParseResult<Option<String>>,
    {
        let mut res = String::new();
        for s in &self.segments {
            match s {
                StringSegment::Literal(lit) => res.push_str(lit),
                StringSegment::Ident(ident) => match resolve_fn(ident)? {
                    Some(value) => res.push_str(&value),
                    None => {
                        let msg = format!(
                            "cannot expand {:?} to string in string expression {self}",
                            ident
                        );
                        return Err(ParseError::WithExprExpansionError(msg));
                    }
                },
            }
        }
        Ok(res)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StringSegment> + '_ {
        self.segments.iter()
    }
}

impl From<String> for StringExpr {
    fn from(s: String) -> Self {
        StringExpr::new(s)
    }
}

impl From<&str> for StringExpr {
    fn from(s: &str) -> Self {
        StringExpr::new(s)
    }
}

impl Display for StringExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "\"\"");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
