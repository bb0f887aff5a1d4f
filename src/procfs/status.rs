//! This module contains a parser for /proc/<pid>/status
//!
//! The status file of a process (or of one of its threads, from
//! /proc/<pid>/task/<tid>/status) is a list of labeled lines such as:
//!
//! ```text
//! Name:	bash
//! Pid:	1234
//! Uid:	1000	1000	1000	1000
//! VmRSS:	    2048 kB
//! voluntary_ctxt_switches:	42
//! ```
//!
//! Kernel releases regularly add new lines to this file, but the relative
//! order of existing lines has been stable. So we only pick the lines that we
//! are interested in, in their kernel order, and skip everything else.
//!
//! Beware that kernel threads have no memory map, and hence no "Vm" lines:
//! their status cannot be parsed into a ProcessStatus.

use bytesize::ByteSize;
use crate::error::{Result, TemplateError};
use crate::ordered::{OrderedParser, Target};
use crate::reader::ProcFileReader;
use crate::procfs::PROC_ROOT;
use lazy_static::lazy_static;
use libc::pid_t;
use std::io::BufRead;
use std::path::{Path, PathBuf};


/// Status information about a process (or thread), from its status file
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ProcessStatus {
    /// Thread ID (the "Pid" line, which is the thread ID for task files)
    pub tid: i64,

    /// PID of the process tracing this one (0 if not traced)
    pub tracer_pid: i64,

    /// User IDs: real, effective, saved set, and filesystem
    pub uid_real: i64,
    pub uid_effective: i64,
    pub uid_saved_set: i64,
    pub uid_filesystem: i64,

    /// Group IDs: real, effective, saved set, and filesystem
    pub gid_real: i64,
    pub gid_effective: i64,
    pub gid_saved_set: i64,
    pub gid_filesystem: i64,

    /// Number of file descriptor slots currently allocated
    pub fd_size: i64,

    /// Peak virtual memory size (kB)
    pub vm_peak_kb: i64,

    /// Virtual memory size (kB)
    pub vm_size_kb: i64,

    /// Locked memory size (kB)
    pub vm_lck_kb: i64,

    /// Peak resident set size, aka "high water mark" (kB)
    pub vm_hwm_kb: i64,

    /// Resident set size (kB)
    pub vm_rss_kb: i64,

    /// Size of the data segment (kB)
    pub vm_data_kb: i64,

    /// Size of the stack segment (kB)
    pub vm_stk_kb: i64,

    /// Size of the text segment (kB)
    pub vm_exe_kb: i64,

    /// Shared library code size (kB)
    pub vm_lib_kb: i64,

    /// Page table entries size (kB)
    pub vm_pte_kb: i64,

    /// Swapped-out virtual memory size (kB)
    pub vm_swap_kb: i64,

    /// Number of voluntary context switches
    pub voluntary_ctxt_switches: i64,

    /// Number of involuntary context switches
    pub nonvoluntary_ctxt_switches: i64,
}


/// Target for a signed member of ProcessStatus
macro_rules! member {
    ($field:ident) => {
        Target::Signed(|status: &mut ProcessStatus| &mut status.$field)
    };
}

/// Target for a memory volume of ProcessStatus ("<label>: <n> kB")
macro_rules! volume_field {
    ($parser:expr, $label:literal, $field:ident) => {
        $parser.field(concat!($label, ": %d kB"), vec![member!($field)])
    };
}


lazy_static! {
    /// Scanners for the lines of a status file that we are interested in, in
    /// kernel order. These templates never change, so they are only built once.
    static ref STATUS_PARSER: OrderedParser<ProcessStatus> =
        build_status_parser().expect("Built-in status templates are valid");
}

/// Build the status file parser
fn build_status_parser()
    -> std::result::Result<OrderedParser<ProcessStatus>, TemplateError>
{
    let mut parser = OrderedParser::<ProcessStatus>::new()
        .field("Pid: %d", vec![member!(tid)])?
        .field("TracerPid: %d", vec![member!(tracer_pid)])?
        .field("Uid: %d %d %d %d", vec![member!(uid_real),
                                        member!(uid_effective),
                                        member!(uid_saved_set),
                                        member!(uid_filesystem)])?
        .field("Gid: %d %d %d %d", vec![member!(gid_real),
                                        member!(gid_effective),
                                        member!(gid_saved_set),
                                        member!(gid_filesystem)])?
        .field("FDSize: %d", vec![member!(fd_size)])?;
    parser = volume_field!(parser, "VmPeak", vm_peak_kb)?;
    parser = volume_field!(parser, "VmSize", vm_size_kb)?;
    parser = volume_field!(parser, "VmLck", vm_lck_kb)?;
    parser = volume_field!(parser, "VmHWM", vm_hwm_kb)?;
    parser = volume_field!(parser, "VmRSS", vm_rss_kb)?;
    parser = volume_field!(parser, "VmData", vm_data_kb)?;
    parser = volume_field!(parser, "VmStk", vm_stk_kb)?;
    parser = volume_field!(parser, "VmExe", vm_exe_kb)?;
    parser = volume_field!(parser, "VmLib", vm_lib_kb)?;
    parser = volume_field!(parser, "VmPTE", vm_pte_kb)?;
    parser = volume_field!(parser, "VmSwap", vm_swap_kb)?;
    parser.field("voluntary_ctxt_switches: %d",
                 vec![member!(voluntary_ctxt_switches)])?
          .field("nonvoluntary_ctxt_switches: %d",
                 vec![member!(nonvoluntary_ctxt_switches)])
}


impl ProcessStatus {
    /// Parse a status file from a stream positioned at its beginning
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        STATUS_PARSER.parse(reader)
    }

    /// Load the status of a process, from /proc/<pid>/status
    pub fn load(pid: pid_t) -> Result<Self> {
        Self::load_from(process_dir(pid).join("status"))
    }

    /// Load the status of a thread, from /proc/<pid>/task/<tid>/status
    pub fn load_thread(pid: pid_t, tid: pid_t) -> Result<Self> {
        Self::load_from(process_dir(pid).join("task")
                                        .join(tid.to_string())
                                        .join("status"))
    }

    /// Load the status of the calling process, from /proc/self/status
    pub fn load_self() -> Result<Self> {
        Self::load_from(Path::new(PROC_ROOT).join("self").join("status"))
    }

    /// Load a status file from an arbitrary location
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        ProcFileReader::open(path)?.parse(|lines| STATUS_PARSER.parse_lines(lines))
    }

    /// Peak virtual memory size
    pub fn vm_peak(&self) -> ByteSize { kib(self.vm_peak_kb) }

    /// Virtual memory size
    pub fn vm_size(&self) -> ByteSize { kib(self.vm_size_kb) }

    /// Locked memory size
    pub fn vm_lck(&self) -> ByteSize { kib(self.vm_lck_kb) }

    /// Peak resident set size
    pub fn vm_hwm(&self) -> ByteSize { kib(self.vm_hwm_kb) }

    /// Resident set size
    pub fn vm_rss(&self) -> ByteSize { kib(self.vm_rss_kb) }

    /// Size of the data segment
    pub fn vm_data(&self) -> ByteSize { kib(self.vm_data_kb) }

    /// Size of the stack segment
    pub fn vm_stk(&self) -> ByteSize { kib(self.vm_stk_kb) }

    /// Size of the text segment
    pub fn vm_exe(&self) -> ByteSize { kib(self.vm_exe_kb) }

    /// Shared library code size
    pub fn vm_lib(&self) -> ByteSize { kib(self.vm_lib_kb) }

    /// Page table entries size
    pub fn vm_pte(&self) -> ByteSize { kib(self.vm_pte_kb) }

    /// Swapped-out virtual memory size
    pub fn vm_swap(&self) -> ByteSize { kib(self.vm_swap_kb) }
}


/// Directory of a process in procfs
fn process_dir(pid: pid_t) -> PathBuf {
    Path::new(PROC_ROOT).join(pid.to_string())
}

/// The kernel says "kB", but means KiB. Negative sizes cannot come out of a
/// well-behaved kernel, and are clamped to zero.
fn kib(kilobytes: i64) -> ByteSize {
    ByteSize::kib(kilobytes.max(0) as u64)
}
