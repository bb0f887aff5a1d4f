//! Positional scanning of labeled pseudo-file lines
//!
//! Many procfs files consist of lines made of a label, followed by a fixed
//! number of values, sometimes followed by a unit. For example, here are a few
//! lines from /proc/<pid>/status:
//!
//! ```text
//! Uid:	1000	1000	1000	1000
//! VmRSS:	    2048 kB
//! ```
//!
//! A FieldScanner recognizes one such kind of line. It is described by a
//! compact template like "VmRSS: %d kB", where the first token is the label,
//! "%d", "%u" and "%s" respectively denote signed, unsigned and string value
//! slots, and any other token is a literal which must be present as is.
//! Matching is anchored at the start of the line, and proceeds left to right
//! one column at a time: there is no backtracking, and columns which follow
//! the end of the template are ignored.

use crate::error::TemplateError;
use crate::splitter::SplitColumns;


/// A value extracted from a pseudo-file line
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// Signed integer, from a "%d" slot
    Signed(i64),

    /// Unsigned integer, from a "%u" slot
    Unsigned(u64),

    /// Arbitrary column, from a "%s" slot
    Text(String),
}
//
impl Value {
    /// Interpret this value as a signed integer, if it is one
    pub fn as_signed(&self) -> Option<i64> {
        match *self {
            Value::Signed(value) => Some(value),
            _ => None,
        }
    }

    /// Interpret this value as an unsigned integer, if it is one
    pub fn as_unsigned(&self) -> Option<u64> {
        match *self {
            Value::Unsigned(value) => Some(value),
            _ => None,
        }
    }

    /// Interpret this value as text, if it is some
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Value::Text(ref text) => Some(text),
            _ => None,
        }
    }
}


/// Kind of value that a template slot extracts
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotKind {
    /// Signed integer ("%d")
    Signed,

    /// Unsigned integer ("%u")
    Unsigned,

    /// Free-form column ("%s")
    Text,
}


/// One element of a field scanner template, after the label
#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    /// Column holding a value
    Slot(SlotKind),

    /// Column which must be present verbatim (e.g. a "kB" unit)
    Literal(String),
}
//
impl Token {
    /// Decode a template token
    fn parse(template: &str, token: &str) -> Result<Self, TemplateError> {
        match token {
            "%d" => Ok(Token::Slot(SlotKind::Signed)),
            "%u" => Ok(Token::Slot(SlotKind::Unsigned)),
            "%s" => Ok(Token::Slot(SlotKind::Text)),
            marker if marker.starts_with('%') => {
                Err(TemplateError::UnknownSlot {
                    template: template.to_owned(),
                    marker: marker.to_owned(),
                })
            },
            literal => Ok(Token::Literal(literal.to_owned())),
        }
    }

    /// Try to match a column against this token. Slots produce a value,
    /// literals produce nothing, mismatches are reported as Err(()).
    fn scan(&self, column: &str) -> Result<Option<Value>, ()> {
        match *self {
            Token::Slot(SlotKind::Signed) => {
                column.parse().map(|v| Some(Value::Signed(v))).map_err(|_| ())
            },
            Token::Slot(SlotKind::Unsigned) => {
                column.parse().map(|v| Some(Value::Unsigned(v))).map_err(|_| ())
            },
            Token::Slot(SlotKind::Text) => {
                Ok(Some(Value::Text(column.to_owned())))
            },
            Token::Literal(ref literal) => {
                if column == literal { Ok(None) } else { Err(()) }
            },
        }
    }
}


/// Template-based matcher for one kind of labeled line
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldScanner {
    /// Label which the line must start with (e.g. "VmRSS:")
    label: String,

    /// What must follow the label, in order
    tokens: Vec<Token>,
}
//
impl FieldScanner {
    /// Build a field scanner from a template such as "Uid: %d %d %d %d"
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        let mut columns = SplitColumns::new(template);

        // The first column is the label, which cannot be a slot
        let label = columns.next().ok_or(TemplateError::Empty)?;
        if label.starts_with('%') {
            return Err(TemplateError::SlotAsLabel(template.to_owned()));
        }

        // Everything else is slots and literals
        let tokens = columns.map(|token| Token::parse(template, token))
                            .collect::<Result<Vec<_>, _>>()?;
        Ok(
            Self {
                label: label.to_owned(),
                tokens,
            }
        )
    }

    /// Label which lines must start with
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Kinds of the values that a successful scan produces, in order
    pub fn slots(&self) -> Vec<SlotKind> {
        self.tokens.iter()
                   .filter_map(|token| match *token {
                       Token::Slot(kind) => Some(kind),
                       Token::Literal(_) => None,
                   })
                   .collect()
    }

    /// Number of values that a successful scan produces
    pub fn arity(&self) -> usize {
        self.slots().len()
    }

    /// Try to match a line, extracting its values if it matches
    ///
    /// Nothing is extracted unless the line matches the whole template, so
    /// callers never observe a partial scan.
    ///
    pub fn scan(&self, line: &str) -> Option<Vec<Value>> {
        // Check the label first, as most lines will be rejected there
        let mut columns = SplitColumns::new(line);
        if columns.next() != Some(self.label.as_str()) {
            return None;
        }

        // Match the remaining template tokens one column at a time
        let mut values = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            let column = columns.next()?;
            if let Some(value) = token.scan(column).ok()? {
                values.push(value);
            }
        }
        Some(values)
    }
}
