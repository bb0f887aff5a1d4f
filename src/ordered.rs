//! Parsing of pseudo-files made of labeled lines in a fixed order
//!
//! Some pseudo-files, like /proc/<pid>/status, are a sequence of labeled lines
//! whose relative order is fixed by the kernel, but which new kernel releases
//! keep extending with extra lines in between. We parse those by going through
//! the file exactly once, with an ordered list of field scanners: for each
//! scanner, lines are read until one matches, and any line that does not match
//! the current scanner is dropped.
//!
//! There is no look-ahead and no backtracking. So the scanners must be listed
//! in the kernel's emission order, and a line which the kernel stopped emitting
//! makes the whole parse fail instead of leaving a silently zeroed field.

use crate::error::{Error, Result, TemplateError};
use crate::reader::LineReader;
use crate::scanner::{FieldScanner, SlotKind, Value};
use std::io::BufRead;
use tracing::trace;


/// Where one scanned value should be stored in a record of type R
pub enum Target<R> {
    /// Signed integer member
    Signed(fn(&mut R) -> &mut i64),

    /// Unsigned integer member
    Unsigned(fn(&mut R) -> &mut u64),

    /// Text member
    Text(fn(&mut R) -> &mut String),
}
//
impl<R> Target<R> {
    /// Kind of value slot which this target can receive
    fn kind(&self) -> SlotKind {
        match *self {
            Target::Signed(_) => SlotKind::Signed,
            Target::Unsigned(_) => SlotKind::Unsigned,
            Target::Text(_) => SlotKind::Text,
        }
    }

    /// Store a scanned value into the record
    fn store(&self, record: &mut R, value: Value) {
        match (self, value) {
            (Target::Signed(member), Value::Signed(v)) => *member(record) = v,
            (Target::Unsigned(member), Value::Unsigned(v)) => *member(record) = v,
            (Target::Text(member), Value::Text(v)) => *member(record) = v,
            _ => unreachable!("Targets are checked against slots on binding"),
        }
    }
}


/// A field scanner, along with the record members that receive its values
struct FieldBinding<R> {
    /// Matcher for the line
    scanner: FieldScanner,

    /// One target per value slot of the scanner, in order
    targets: Vec<Target<R>>,
}


/// Parser for records spread over a fixed sequence of labeled lines
pub struct OrderedParser<R> {
    /// Field bindings, in the order in which lines appear in the file
    bindings: Vec<FieldBinding<R>>,
}
//
impl<R: Default> OrderedParser<R> {
    /// Start building a parser with no field
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Append a field, described by a scanner template and the record members
    /// which its value slots should be stored into
    pub fn field(mut self,
                 template: &str,
                 targets: Vec<Target<R>>) -> std::result::Result<Self, TemplateError>
    {
        // Check that each value slot has a target of the right kind
        let scanner = FieldScanner::new(template)?;
        let target_kinds = targets.iter().map(Target::kind).collect::<Vec<_>>();
        if scanner.slots() != target_kinds {
            return Err(TemplateError::TargetMismatch(template.to_owned()));
        }

        // Record the binding
        self.bindings.push(FieldBinding { scanner, targets });
        Ok(self)
    }

    /// Number of labeled lines which this parser expects
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Tell whether this parser expects no line at all
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Labels of the expected lines, in order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.scanner.label())
    }

    /// Read a record from a buffered stream positioned at its beginning
    pub fn parse<B: BufRead>(&self, reader: B) -> Result<R> {
        self.parse_lines(&mut LineReader::new(reader))
    }

    /// Read a record from a stream of lines
    pub(crate) fn parse_lines<B: BufRead>(&self,
                                          lines: &mut LineReader<B>) -> Result<R> {
        let mut record = R::default();
        for binding in &self.bindings {
            // Read lines until one matches the current scanner
            let values = loop {
                let line = match lines.next_line()? {
                    Some(line) => line,
                    None => return Err(Error::UnexpectedEof {
                        label: binding.scanner.label().to_owned(),
                    }),
                };
                match binding.scanner.scan(line) {
                    Some(values) => break values,
                    None => trace!(label = binding.scanner.label(),
                                   skipped = line,
                                   "Line does not match"),
                }
            };

            // Store the scanned values into the record
            for (target, value) in binding.targets.iter().zip(values) {
                target.store(&mut record, value);
            }
        }
        Ok(record)
    }
}
//
impl<R: Default> Default for OrderedParser<R> {
    fn default() -> Self {
        Self::new()
    }
}
