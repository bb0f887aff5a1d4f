//! This module contains a parser for /proc/net/rpc/nfsd
//!
//! The NFS server statistics file is a list of tagged lines, for example:
//!
//! ```text
//! rc 0 6 18622
//! fh 0 0 0 0 0
//! io 157286400 0
//! th 8 0 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000
//! net 18628 0 18628 6
//! rpc 18628 0 0 0 0
//! proc3 22 2 112 0 2719 111 0 0 0 0 0 0 0 0 0 0 0 27 216 0 2 1 0
//! proc4 2 2 10853
//! proc4ops 72 0 0 0 1098 2 0 0 0 0 8179 5896 0 0 0 0 5900 ...
//! ```
//!
//! Each tag is decoded independently of the others, and tags that we do not
//! know are skipped, since new kernels may add some. See the records module
//! for the layout of each line.

pub mod records;

use crate::error::{Error, LineFault, Result};
use crate::procfs::NFSD_STATS_PATH;
use crate::reader::{LineReader, ProcFileReader};
use crate::splitter::SplitColumns;
use self::records::{FileHandles, InputOutput, Network, NfsV2Stats, NfsV3Stats,
                    NfsV4Ops, NfsV4Stats, ReadAheadCache, ReplyCache, Rpc,
                    Threads};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, trace, warn};


/// Tags of the lines of /proc/net/rpc/nfsd that we know how to decode
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Tag {
    /// Reply cache ("rc")
    ReplyCache,

    /// File handles ("fh")
    FileHandles,

    /// Disk I/O ("io")
    InputOutput,

    /// Server threads ("th")
    Threads,

    /// Read-ahead cache ("ra")
    ReadAheadCache,

    /// Network ("net")
    Network,

    /// RPC ("rpc")
    Rpc,

    /// NFSv2 procedures ("proc2")
    NfsV2,

    /// NFSv3 procedures ("proc3")
    NfsV3,

    /// NFSv4 procedures ("proc4")
    NfsV4,

    /// NFSv4 operations ("proc4ops")
    NfsV4Ops,
}
//
impl Tag {
    /// All known tags, in kernel order
    pub const ALL: [Tag; 11] = [
        Tag::ReplyCache,
        Tag::FileHandles,
        Tag::InputOutput,
        Tag::Threads,
        Tag::ReadAheadCache,
        Tag::Network,
        Tag::Rpc,
        Tag::NfsV2,
        Tag::NfsV3,
        Tag::NfsV4,
        Tag::NfsV4Ops,
    ];

    /// Identify the tag of a line from its first column
    pub fn from_header(header: &str) -> Option<Self> {
        match header {
            "rc" => Some(Tag::ReplyCache),
            "fh" => Some(Tag::FileHandles),
            "io" => Some(Tag::InputOutput),
            "th" => Some(Tag::Threads),
            "ra" => Some(Tag::ReadAheadCache),
            "net" => Some(Tag::Network),
            "rpc" => Some(Tag::Rpc),
            "proc2" => Some(Tag::NfsV2),
            "proc3" => Some(Tag::NfsV3),
            "proc4" => Some(Tag::NfsV4),
            "proc4ops" => Some(Tag::NfsV4Ops),
            _ => None,
        }
    }

    /// First column of the lines bearing this tag
    pub fn header(self) -> &'static str {
        match self {
            Tag::ReplyCache => "rc",
            Tag::FileHandles => "fh",
            Tag::InputOutput => "io",
            Tag::Threads => "th",
            Tag::ReadAheadCache => "ra",
            Tag::Network => "net",
            Tag::Rpc => "rpc",
            Tag::NfsV2 => "proc2",
            Tag::NfsV3 => "proc3",
            Tag::NfsV4 => "proc4",
            Tag::NfsV4Ops => "proc4ops",
        }
    }

    /// Decode the columns that follow this tag
    fn parse(self, columns: &mut SplitColumns) -> std::result::Result<Record, LineFault> {
        Ok(
            match self {
                Tag::ReplyCache => Record::ReplyCache(ReplyCache::parse(columns)?),
                Tag::FileHandles => Record::FileHandles(FileHandles::parse(columns)?),
                Tag::InputOutput => Record::InputOutput(InputOutput::parse(columns)?),
                Tag::Threads => Record::Threads(Threads::parse(columns)?),
                Tag::ReadAheadCache => {
                    Record::ReadAheadCache(ReadAheadCache::parse(columns)?)
                },
                Tag::Network => Record::Network(Network::parse(columns)?),
                Tag::Rpc => Record::Rpc(Rpc::parse(columns)?),
                Tag::NfsV2 => Record::NfsV2(NfsV2Stats::parse(columns)?),
                Tag::NfsV3 => Record::NfsV3(NfsV3Stats::parse(columns)?),
                Tag::NfsV4 => Record::NfsV4(NfsV4Stats::parse(columns)?),
                Tag::NfsV4Ops => Record::NfsV4Ops(NfsV4Ops::parse(columns)?),
            }
        )
    }
}


/// Decoded line of /proc/net/rpc/nfsd
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Record {
    ReplyCache(ReplyCache),
    FileHandles(FileHandles),
    InputOutput(InputOutput),
    Threads(Threads),
    ReadAheadCache(ReadAheadCache),
    Network(Network),
    Rpc(Rpc),
    NfsV2(NfsV2Stats),
    NfsV3(NfsV3Stats),
    NfsV4(NfsV4Stats),
    NfsV4Ops(NfsV4Ops),
}
//
impl Record {
    /// Tag of the line which this record was decoded from
    pub fn tag(&self) -> Tag {
        match *self {
            Record::ReplyCache(_) => Tag::ReplyCache,
            Record::FileHandles(_) => Tag::FileHandles,
            Record::InputOutput(_) => Tag::InputOutput,
            Record::Threads(_) => Tag::Threads,
            Record::ReadAheadCache(_) => Tag::ReadAheadCache,
            Record::Network(_) => Tag::Network,
            Record::Rpc(_) => Tag::Rpc,
            Record::NfsV2(_) => Tag::NfsV2,
            Record::NfsV3(_) => Tag::NfsV3,
            Record::NfsV4(_) => Tag::NfsV4,
            Record::NfsV4Ops(_) => Tag::NfsV4Ops,
        }
    }

    /// Number of counters which the kernel provided, but we do not know about
    fn ignored_counters(&self) -> u64 {
        match *self {
            Record::NfsV2(ref stats) => stats.ignored(),
            Record::NfsV3(ref stats) => stats.ignored(),
            Record::NfsV4(ref stats) => stats.ignored(),
            Record::NfsV4Ops(ref ops) => ops.ignored(),
            _ => 0,
        }
    }
}


/// What to do with a line that bears a known tag, but cannot be decoded
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MalformedLinePolicy {
    /// Skip the line, and list it in NfsdStats::rejected
    Skip,

    /// Fail the whole parse
    Abort,
}
//
impl Default for MalformedLinePolicy {
    fn default() -> Self {
        MalformedLinePolicy::Skip
    }
}


/// Tunables of the /proc/net/rpc/nfsd parser
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParseOptions {
    /// Handling of malformed lines
    pub on_malformed_line: MalformedLinePolicy,
}


/// A line of /proc/net/rpc/nfsd which was skipped for being malformed
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RejectedLine {
    /// Position of the line in the file, starting at 1
    pub line_number: usize,

    /// Tag of the line
    pub tag: Tag,

    /// What was wrong with it
    pub fault: LineFault,
}


/// Contents of /proc/net/rpc/nfsd
///
/// Every line is optional: some are only emitted by some kernel versions, and
/// the NFSv2 line disappears from kernels built without NFSv2 support. If a tag
/// appears more than once, the last well-formed line wins.
///
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NfsdStats {
    pub reply_cache: Option<ReplyCache>,
    pub file_handles: Option<FileHandles>,
    pub input_output: Option<InputOutput>,
    pub threads: Option<Threads>,
    pub read_ahead_cache: Option<ReadAheadCache>,
    pub network: Option<Network>,
    pub rpc: Option<Rpc>,
    pub v2_stats: Option<NfsV2Stats>,
    pub v3_stats: Option<NfsV3Stats>,
    pub v4_stats: Option<NfsV4Stats>,
    pub v4_ops: Option<NfsV4Ops>,

    /// Lines with a known tag which could not be decoded
    pub rejected: Vec<RejectedLine>,
}
//
impl NfsdStats {
    /// Parse the statistics file from a stream, skipping malformed lines
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        Self::parse_with(reader, &ParseOptions::default())
    }

    /// Parse the statistics file from a stream, with custom options
    pub fn parse_with<R: BufRead>(reader: R,
                                  options: &ParseOptions) -> Result<Self> {
        Self::parse_lines(&mut LineReader::new(reader), options)
    }

    /// Load the statistics of the local NFS server
    pub fn load() -> Result<Self> {
        Self::load_from(NFSD_STATS_PATH)
    }

    /// Load a statistics file from an arbitrary location
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, &ParseOptions::default())
    }

    /// Load a statistics file from an arbitrary location, with custom options
    pub fn load_with<P: AsRef<Path>>(path: P,
                                     options: &ParseOptions) -> Result<Self> {
        ProcFileReader::open(path)?.parse(|lines| {
            Self::parse_lines(lines, options)
        })
    }

    /// Tell whether a record was decoded for some tag
    pub fn has(&self, tag: Tag) -> bool {
        self.get(tag).is_some()
    }

    /// Record decoded for some tag, if any
    pub fn get(&self, tag: Tag) -> Option<Record> {
        match tag {
            Tag::ReplyCache => self.reply_cache.clone().map(Record::ReplyCache),
            Tag::FileHandles => {
                self.file_handles.clone().map(Record::FileHandles)
            },
            Tag::InputOutput => {
                self.input_output.clone().map(Record::InputOutput)
            },
            Tag::Threads => self.threads.clone().map(Record::Threads),
            Tag::ReadAheadCache => {
                self.read_ahead_cache.clone().map(Record::ReadAheadCache)
            },
            Tag::Network => self.network.clone().map(Record::Network),
            Tag::Rpc => self.rpc.clone().map(Record::Rpc),
            Tag::NfsV2 => self.v2_stats.clone().map(Record::NfsV2),
            Tag::NfsV3 => self.v3_stats.clone().map(Record::NfsV3),
            Tag::NfsV4 => self.v4_stats.clone().map(Record::NfsV4),
            Tag::NfsV4Ops => self.v4_ops.clone().map(Record::NfsV4Ops),
        }
    }

    /// All decoded records, in kernel order
    pub fn records(&self) -> Vec<Record> {
        Tag::ALL.iter().filter_map(|&tag| self.get(tag)).collect()
    }

    /// Store a decoded record, replacing any previous record with that tag
    fn insert(&mut self, record: Record) {
        match record {
            Record::ReplyCache(r) => self.reply_cache = Some(r),
            Record::FileHandles(r) => self.file_handles = Some(r),
            Record::InputOutput(r) => self.input_output = Some(r),
            Record::Threads(r) => self.threads = Some(r),
            Record::ReadAheadCache(r) => self.read_ahead_cache = Some(r),
            Record::Network(r) => self.network = Some(r),
            Record::Rpc(r) => self.rpc = Some(r),
            Record::NfsV2(r) => self.v2_stats = Some(r),
            Record::NfsV3(r) => self.v3_stats = Some(r),
            Record::NfsV4(r) => self.v4_stats = Some(r),
            Record::NfsV4Ops(r) => self.v4_ops = Some(r),
        }
    }

    /// Go through the lines of the statistics file
    fn parse_lines<R: BufRead>(lines: &mut LineReader<R>,
                               options: &ParseOptions) -> Result<Self> {
        let mut stats = Self::default();
        while let Some(line) = lines.next_line()? {
            // Identify and decode the line, skipping blank and unknown ones
            let (tag, outcome) = match parse_line(line) {
                Some(parsed) => parsed,
                None => continue,
            };

            // Store the record, or deal with the malformed line
            match outcome {
                Ok(record) => stats.insert(record),
                Err(fault) => {
                    let line_number = lines.line_number();
                    match options.on_malformed_line {
                        MalformedLinePolicy::Abort => {
                            return Err(Error::MalformedLine {
                                line_number,
                                tag: tag.header().to_owned(),
                                fault,
                            });
                        },
                        MalformedLinePolicy::Skip => {
                            warn!(line_number,
                                  tag = tag.header(),
                                  %fault,
                                  "Skipping malformed nfsd record");
                            stats.rejected.push(RejectedLine {
                                line_number,
                                tag,
                                fault,
                            });
                        },
                    }
                },
            }
        }
        Ok(stats)
    }
}


/// Identify and decode one line of the statistics file. Blank lines and
/// unknown tags produce nothing.
fn parse_line(line: &str) -> Option<(Tag, std::result::Result<Record, LineFault>)> {
    let mut columns = SplitColumns::new(line);
    let header = columns.next()?;
    let tag = match Tag::from_header(header) {
        Some(tag) => tag,
        None => {
            debug!(tag = header, "Ignoring unknown nfsd record");
            return None;
        },
    };

    let outcome = tag.parse(&mut columns);
    if let Ok(ref record) = outcome {
        let ignored = record.ignored_counters();
        if ignored > 0 {
            debug!(tag = header, ignored, "Ignoring unknown nfsd counters");
        }
        let trailing = columns.col_count();
        if trailing > 0 {
            trace!(tag = header, trailing, "Ignoring trailing nfsd columns");
        }
    }
    Some((tag, outcome))
}


/// Unit tests
#[cfg(test)]
mod tests {
    use crate::error::{Error, LineFault};
    use crate::reader::FailingReader;
    use std::io::{BufReader, Cursor, Write};
    use super::{MalformedLinePolicy, NfsdStats, ParseOptions, Record,
                RejectedLine, Tag};
    use super::records::{InputOutput, Network, NfsV4Ops, ReplyCache, Rpc,
                         Threads};
    use tempfile::NamedTempFile;

    /// Statistics file of a server with NFSv4.2 support
    pub(super) const SERVER_STATS: &str = "rc 0 6 18622
fh 0 0 0 0 0
io 157286400 0
th 8 0 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000
ra 32 0 0 0 0 0 0 0 0 0 0 0
net 18628 0 18628 6
rpc 18628 0 0 0 0
proc2 18 2 69 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
proc3 22 2 112 0 2719 111 0 0 0 0 0 0 0 0 0 0 0 27 216 0 2 1 0
proc4 2 2 10853
proc4ops 72 0 0 0 1098 2 0 0 0 0 8179 5896 0 0 0 0 5900 0 0 2 0 2 0 9609 0 2 150 1272 0 0 0 1236 0 0 0 0 3 3 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";

    /// Build a line made of a prefix followed by counters 1..=count
    fn numbered_line(prefix: &str, count: usize) -> String {
        let mut line = prefix.to_owned();
        for value in 1..=count {
            line.push(' ');
            line.push_str(&value.to_string());
        }
        line
    }

    /// Parse a string with the default options
    fn parse(input: &str) -> NfsdStats {
        NfsdStats::parse(Cursor::new(input)).expect("Parsing should succeed")
    }

    /// Check that tags and headers map to each other
    #[test]
    fn tag_headers() {
        for &tag in Tag::ALL.iter() {
            assert_eq!(Tag::from_header(tag.header()), Some(tag));
        }
        assert_eq!(Tag::from_header("proc5"), None);
        assert_eq!(Tag::from_header(""), None);
    }

    /// Check that a full statistics file is decoded
    #[test]
    fn parse_server_stats() {
        let stats = parse(SERVER_STATS);
        assert!(stats.rejected.is_empty());
        assert_eq!(stats.records().len(), 11);
        for &tag in Tag::ALL.iter() {
            assert!(stats.has(tag), "Missing record for {:?}", tag);
        }

        assert_eq!(stats.reply_cache,
                   Some(ReplyCache { hits: 0, misses: 6, no_cache: 18622 }));
        assert_eq!(stats.input_output,
                   Some(InputOutput { read: 157286400, write: 0 }));
        assert_eq!(stats.threads, Some(Threads { threads: 8, full_cnt: 0 }));
        assert_eq!(stats.read_ahead_cache.as_ref().map(|ra| ra.cache_size),
                   Some(32));
        assert_eq!(stats.network,
                   Some(Network {
                       net_count: 18628,
                       udp_count: 0,
                       tcp_count: 18628,
                       tcp_connect: 6,
                   }));
        assert_eq!(stats.rpc.as_ref().map(Rpc::counters),
                   Some(vec![18628, 0, 0, 0, 0]));

        let v2 = stats.v2_stats.as_ref().unwrap();
        assert_eq!((v2.values, v2.null, v2.get_attr), (18, 2, 69));

        let v4 = stats.v4_stats.as_ref().unwrap();
        assert_eq!((v4.values, v4.null, v4.compound), (2, 2, 10853));

        let ops = stats.v4_ops.as_ref().unwrap();
        assert_eq!(ops.values, 72);
        assert_eq!(ops.populated(), 72);
        assert_eq!(ops.access, 1098);
        assert_eq!(ops.get_attr, 8179);
        assert_eq!(ops.put_fh, 9609);
        assert_eq!(ops.get("sequence"), Some(0));
        assert_eq!(ops.remove_xattr, 0);
    }

    /// A full NFSv3 line is decoded in declared order
    #[test]
    fn parse_v3_line() {
        let stats = parse(&numbered_line("proc3 22", 22));
        let v3 = stats.v3_stats.as_ref().expect("Missing NFSv3 record");
        assert_eq!(v3.values, 22);
        assert_eq!(v3.counters(), (1..=22).collect::<Vec<u64>>());
        assert_eq!(stats.records().len(), 1);
    }

    /// One more NFSv4 operation than an NFSv4.0 server knows is fine
    #[test]
    fn parse_v4_ops_extra() {
        let stats = parse(&numbered_line("proc4ops 39", 39));
        let ops = stats.v4_ops.expect("Missing NFSv4 operations");
        assert_eq!(ops.values, 39);
        assert_eq!(ops.counters()[..38], (1..=38).collect::<Vec<u64>>()[..]);
        assert_eq!(ops.write, 39);
        assert_eq!(ops.release_lockowner, 0);
        assert!(stats.rejected.is_empty());
    }

    /// More NFSv4 operations than we know of are ignored
    #[test]
    fn parse_v4_ops_future() {
        let stats = parse(&numbered_line("proc4ops 90", 90));
        let ops = stats.v4_ops.expect("Missing NFSv4 operations");
        assert_eq!(ops.values, 90);
        assert_eq!(ops.populated(), NfsV4Ops::FIELD_NAMES.len());
        assert_eq!(ops.ignored(), 14);
        assert_eq!(ops.counters(), (1..=76).collect::<Vec<u64>>());
    }

    /// A short fixed line is rejected, without harming other lines
    #[test]
    fn skip_short_line() {
        let stats = parse("io 1 2\nrc 5 1\nth 4 0\n");
        assert_eq!(stats.reply_cache, None);
        assert_eq!(stats.input_output, Some(InputOutput { read: 1, write: 2 }));
        assert_eq!(stats.threads, Some(Threads { threads: 4, full_cnt: 0 }));
        assert_eq!(stats.rejected, vec![RejectedLine {
            line_number: 2,
            tag: Tag::ReplyCache,
            fault: LineFault::MissingCounter {
                field: "no_cache",
                expected: 3,
                found: 2,
            },
        }]);
    }

    /// The abort policy turns malformed lines into errors
    #[test]
    fn abort_on_short_line() {
        let options = ParseOptions {
            on_malformed_line: MalformedLinePolicy::Abort,
        };
        let result = NfsdStats::parse_with(Cursor::new("io 1 2\nrc 5 1\n"),
                                           &options);
        match result {
            Err(error @ Error::MalformedLine { .. }) => {
                assert!(error.is_malformed());
                if let Error::MalformedLine { line_number, tag, fault } = error {
                    assert_eq!(line_number, 2);
                    assert_eq!(tag, "rc");
                    assert_eq!(fault, LineFault::MissingCounter {
                        field: "no_cache",
                        expected: 3,
                        found: 2,
                    });
                }
            },
            other => panic!("Unexpected parse result: {:?}", other),
        }

        let stats = NfsdStats::parse_with(Cursor::new(SERVER_STATS), &options)
                              .expect("Well-formed input should parse");
        assert_eq!(stats, parse(SERVER_STATS));
    }

    /// A versioned line that declares more counters than it has is rejected
    #[test]
    fn skip_truncated_versioned_line() {
        let stats = parse("proc3 22 1 2 3\nproc4 2 5 6\n");
        assert_eq!(stats.v3_stats, None);
        assert_eq!(stats.v4_stats.map(|v4| v4.compound), Some(6));
        assert_eq!(stats.rejected.len(), 1);
        assert_eq!(stats.rejected[0].tag, Tag::NfsV3);
        assert_eq!(stats.rejected[0].fault, LineFault::MissingCounter {
            field: "lookup",
            expected: 22,
            found: 3,
        });
    }

    /// Unknown tags and blank lines are ignored
    #[test]
    fn skip_unknown_lines() {
        let stats = parse("\n   \nwdeleg_getattr 12\nrc 1 2 3\nproc9 3 1 2 3\n");
        assert!(stats.rejected.is_empty());
        assert_eq!(stats.records(),
                   vec![Record::ReplyCache(ReplyCache {
                       hits: 1,
                       misses: 2,
                       no_cache: 3,
                   })]);
    }

    /// The last occurrence of a tag wins
    #[test]
    fn duplicate_tags() {
        let stats = parse("th 1 0\nth 2 5\nth 3\n");
        assert_eq!(stats.threads, Some(Threads { threads: 2, full_cnt: 5 }));
        assert_eq!(stats.rejected.len(), 1);
        assert_eq!(stats.rejected[0].line_number, 3);
    }

    /// A stream that breaks down midway fails the parse, whatever the policy
    #[test]
    fn parse_read_error() {
        let reader = BufReader::new(FailingReader::new("rc 1 2 3\nio 4 5\n"));
        match NfsdStats::parse(reader) {
            Err(error @ Error::Io(_)) => assert!(error.is_input_failure()),
            other => panic!("Unexpected parse result: {:?}", other),
        }
    }

    /// An empty file has no record
    #[test]
    fn parse_empty() {
        let stats = parse("");
        assert_eq!(stats, NfsdStats::default());
        assert!(stats.records().is_empty());
    }

    /// Parsing the same content twice gives the same result
    #[test]
    fn parse_idempotent() {
        assert_eq!(parse(SERVER_STATS), parse(SERVER_STATS));
    }

    /// Check that statistics files are loaded from the filesystem
    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(SERVER_STATS.as_bytes()).expect("Failed to write stats");
        let stats = NfsdStats::load_from(file.path()).unwrap();
        assert_eq!(stats, parse(SERVER_STATS));
    }

    /// Check that a missing statistics file is reported as an I/O error
    #[test]
    fn load_missing_file() {
        match NfsdStats::load_from("/proc/this/does/not/exist") {
            Err(error @ Error::Io(_)) => assert!(error.is_input_failure()),
            other => panic!("Unexpected result: {:?}", other),
        }
    }
}
