//! This module contains parsers for the contents of procfs.
//!
//! Each submodule corresponds to one kind of file in /proc, and is named as
//! close to that file as allowed by the Rust module system.

pub mod nfsd;
pub mod status;


/// Mount point of procfs
pub const PROC_ROOT: &str = "/proc";

/// Location of the NFS server statistics
pub const NFSD_STATS_PATH: &str = "/proc/net/rpc/nfsd";
