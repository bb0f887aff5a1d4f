//! Parsers for Linux pseudo-files that expose process and NFS server metrics
//!
//! Two families of pseudo-files are covered here:
//!
//! - Files made of labeled lines in a kernel-defined order, such as
//!   /proc/<pid>/status. These are handled by the ordered record parser, which
//!   is built out of field scanners (see the scanner and ordered modules).
//! - Files made of tagged lines of counters, such as /proc/net/rpc/nfsd, where
//!   each line is decoded independently according to its tag.
//!
//! In both cases the parsers accept any buffered stream, so that they can be
//! tested on canned data, and also provide loaders that read the live files.

mod reader;
mod splitter;

pub mod error;
pub mod ordered;
pub mod procfs;
pub mod scanner;

pub use crate::error::{Error, LineFault, Result, TemplateError};
pub use crate::procfs::nfsd::{MalformedLinePolicy, NfsdStats, ParseOptions,
                              Record, RejectedLine, Tag};
pub use crate::procfs::status::ProcessStatus;
