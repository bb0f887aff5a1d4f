//! Record types for the lines of /proc/net/rpc/nfsd
//!
//! Each line of the NFS server statistics file starts with a tag, followed by
//! unsigned counters. There are two families of lines:
//!
//! - Fixed lines ("rc", "fh", "io", "th", "ra", "net", "rpc") always carry the
//!   same counters, in the same order.
//! - Versioned lines ("proc2", "proc3", "proc4", "proc4ops") first declare how
//!   many counters follow, because the set of NFS procedures and operations
//!   grows with protocol revisions. NFSv4 minor versions, in particular, keep
//!   adding operations to "proc4ops".
//!
//! A versioned record holds one named counter per procedure or operation that
//! we know of, plus the declared count. Counters past the declared count are
//! zero because the kernel did not provide them, not because they were zero:
//! use populated() to tell these cases apart. Counters that the kernel
//! provides beyond the ones we know of are ignored.

use crate::error::LineFault;
use crate::splitter::SplitColumns;
use std::cmp;


/// Parse the next column of a line as a counter
///
/// "index" is the position of the counter among the "expected" counters which
/// the line should carry, which is used to report missing counters.
///
fn next_counter(columns: &mut SplitColumns,
                field: &'static str,
                index: usize,
                expected: usize) -> Result<u64, LineFault> {
    let token = columns.next().ok_or(LineFault::MissingCounter {
        field,
        expected,
        found: index,
    })?;
    token.parse().map_err(|_| LineFault::InvalidCounter {
        field,
        token: token.to_owned(),
    })
}


/// Define a record made of a fixed list of counters
///
/// Lines must carry at least all the counters. Trailing columns, such as the
/// obsolete thread usage histogram of the "th" line, are ignored.
///
macro_rules! fixed_record {
    (
        $(#[$attr:meta])*
        $name:ident {
            $(
                $(#[$field_attr:meta])*
                $field:ident,
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
        pub struct $name {
            $(
                $(#[$field_attr])*
                pub $field: u64,
            )*
        }
        //
        impl $name {
            /// Names of the counters, in line order
            pub const FIELD_NAMES: &'static [&'static str] =
                &[$(stringify!($field)),*];

            /// Counters, in line order
            pub fn counters(&self) -> Vec<u64> {
                vec![$(self.$field),*]
            }

            /// Look up a counter by name
            pub fn get(&self, name: &str) -> Option<u64> {
                match name {
                    $(stringify!($field) => Some(self.$field),)*
                    _ => None,
                }
            }

            /// Decode the columns that follow the tag
            pub(crate) fn parse(columns: &mut SplitColumns)
                -> Result<Self, LineFault>
            {
                let expected = Self::FIELD_NAMES.len();
                let mut index = 0;
                let mut next = |field| {
                    let counter = next_counter(columns, field, index, expected);
                    index += 1;
                    counter
                };
                Ok(
                    Self {
                        $($field: next(stringify!($field))?,)*
                    }
                )
            }
        }
    };
}


/// Define a record whose line declares how many counters it carries
macro_rules! versioned_record {
    (
        $(#[$attr:meta])*
        $name:ident {
            $(
                $(#[$field_attr:meta])*
                $field:ident,
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
        pub struct $name {
            /// Number of counters which the kernel declared on this line
            pub values: u64,

            $(
                $(#[$field_attr])*
                pub $field: u64,
            )*
        }
        //
        impl $name {
            /// Names of the known counters, in line order
            pub const FIELD_NAMES: &'static [&'static str] =
                &[$(stringify!($field)),*];

            /// Number of leading counters which were actually provided by the
            /// kernel. Counters after these hold a default zero.
            pub fn populated(&self) -> usize {
                cmp::min(self.values, Self::FIELD_NAMES.len() as u64) as usize
            }

            /// Number of counters provided by the kernel which we do not know
            pub fn ignored(&self) -> u64 {
                self.values.saturating_sub(Self::FIELD_NAMES.len() as u64)
            }

            /// Known counters, in line order
            pub fn counters(&self) -> Vec<u64> {
                vec![$(self.$field),*]
            }

            /// Look up a counter by name
            pub fn get(&self, name: &str) -> Option<u64> {
                match name {
                    $(stringify!($field) => Some(self.$field),)*
                    _ => None,
                }
            }

            /// Decode the columns that follow the tag
            pub(crate) fn parse(columns: &mut SplitColumns)
                -> Result<Self, LineFault>
            {
                // The first column tells how many counters follow
                let count = columns.next().ok_or(LineFault::MissingCount)?;
                let values = count.parse::<u64>().map_err(|_| {
                    LineFault::InvalidCounter {
                        field: "values",
                        token: count.to_owned(),
                    }
                })?;

                // Decode the counters that we know of, up to the declared count
                let expected =
                    cmp::min(values, Self::FIELD_NAMES.len() as u64) as usize;
                let mut index = 0;
                let mut next = |field| {
                    if index >= expected {
                        return Ok(0);
                    }
                    let counter = next_counter(columns, field, index, expected);
                    index += 1;
                    counter
                };
                Ok(
                    Self {
                        values,
                        $($field: next(stringify!($field))?,)*
                    }
                )
            }
        }
    };
}


fixed_record! {
    /// Reply cache statistics ("rc" line)
    ReplyCache {
        /// Requests answered from the reply cache
        hits,
        /// Requests which needed processing and were cached
        misses,
        /// Requests which needed processing and are not cacheable
        no_cache,
    }
}

fixed_record! {
    /// File handle statistics ("fh" line)
    ///
    /// Only the stale file handle counter is maintained by modern kernels.
    ///
    FileHandles {
        /// Stale file handle errors
        stale,
        total_lookups,
        anon_lookups,
        dir_no_cache,
        no_dir_no_cache,
    }
}

fixed_record! {
    /// Disk I/O statistics ("io" line), in bytes
    InputOutput {
        /// Bytes read from disk by the server
        read,
        /// Bytes written to disk by the server
        write,
    }
}

fixed_record! {
    /// Server thread statistics ("th" line)
    Threads {
        /// Number of nfsd threads
        threads,
        /// Number of times all threads were busy
        full_cnt,
    }
}

fixed_record! {
    /// Network statistics ("net" line)
    Network {
        /// Total packets received
        net_count,
        /// UDP packets received
        udp_count,
        /// TCP packets received
        tcp_count,
        /// TCP connections accepted
        tcp_connect,
    }
}

fixed_record! {
    /// RPC statistics ("rpc" line)
    Rpc {
        /// Total RPC calls received
        rpc_count,
        /// Rejected calls (the sum of the three following counters)
        bad_cnt,
        /// Calls rejected for being malformed
        bad_fmt,
        /// Calls rejected for failing authentication
        bad_auth,
        /// Calls rejected for an unknown client
        badc_int,
    }
}


/// Number of buckets in the read-ahead cache histogram
pub const READ_AHEAD_BUCKETS: usize = 10;

/// Read-ahead cache statistics ("ra" line), dropped by recent kernels
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ReadAheadCache {
    /// Size of the read-ahead cache
    pub cache_size: u64,

    /// How deep in the cache entries were found, in tenths of the cache
    pub cache_histogram: [u64; READ_AHEAD_BUCKETS],

    /// Lookups which were not found in the cache
    pub not_found: u64,
}
//
impl ReadAheadCache {
    /// Names of the counters, in line order
    pub const FIELD_NAMES: &'static [&'static str] = &[
        "cache_size",
        "cache_histogram_0", "cache_histogram_1", "cache_histogram_2",
        "cache_histogram_3", "cache_histogram_4", "cache_histogram_5",
        "cache_histogram_6", "cache_histogram_7", "cache_histogram_8",
        "cache_histogram_9",
        "not_found",
    ];

    /// Counters, in line order
    pub fn counters(&self) -> Vec<u64> {
        let mut counters = Vec::with_capacity(Self::FIELD_NAMES.len());
        counters.push(self.cache_size);
        counters.extend_from_slice(&self.cache_histogram);
        counters.push(self.not_found);
        counters
    }

    /// Look up a counter by name
    pub fn get(&self, name: &str) -> Option<u64> {
        Self::FIELD_NAMES.iter()
                         .position(|&field| field == name)
                         .map(|index| self.counters()[index])
    }

    /// Decode the columns that follow the tag
    pub(crate) fn parse(columns: &mut SplitColumns) -> Result<Self, LineFault> {
        let expected = Self::FIELD_NAMES.len();
        let mut counters = [0; 12];
        for (index, counter) in counters.iter_mut().enumerate() {
            *counter = next_counter(columns,
                                    Self::FIELD_NAMES[index],
                                    index,
                                    expected)?;
        }

        let mut cache_histogram = [0; READ_AHEAD_BUCKETS];
        cache_histogram.copy_from_slice(&counters[1..=READ_AHEAD_BUCKETS]);
        Ok(
            Self {
                cache_size: counters[0],
                cache_histogram,
                not_found: counters[READ_AHEAD_BUCKETS + 1],
            }
        )
    }
}


versioned_record! {
    /// NFSv2 procedure call counters ("proc2" line, declares 18 counters)
    NfsV2Stats {
        null,
        get_attr,
        set_attr,
        root,
        lookup,
        read_link,
        read,
        wr_cache,
        write,
        create,
        remove,
        rename,
        link,
        sym_link,
        mk_dir,
        rm_dir,
        read_dir,
        fs_stat,
    }
}

versioned_record! {
    /// NFSv3 procedure call counters ("proc3" line, declares 22 counters)
    NfsV3Stats {
        null,
        get_attr,
        set_attr,
        lookup,
        access,
        read_link,
        read,
        write,
        create,
        mk_dir,
        sym_link,
        mk_nod,
        remove,
        rm_dir,
        rename,
        link,
        read_dir,
        read_dir_plus,
        fs_stat,
        fs_info,
        path_conf,
        commit,
    }
}

versioned_record! {
    /// NFSv4 procedure call counters ("proc4" line, declares 2 counters)
    NfsV4Stats {
        null,
        compound,
    }
}

versioned_record! {
    /// NFSv4 operation counters ("proc4ops" line)
    ///
    /// Counters are indexed by operation number. NFSv4.0 (RFC 7530) defines
    /// operations up to 39, NFSv4.1 (RFC 5661) up to 58, NFSv4.2 (RFC 7862)
    /// up to 71, and the extended attribute extension (RFC 8276) up to 75.
    ///
    NfsV4Ops {
        /// Operation numbers 0 and 1 are not assigned
        op0_unused,
        op1_unused,
        /// Operation number 2 is reserved
        op2_future,
        access,
        close,
        commit,
        create,
        deleg_purge,
        deleg_return,
        get_attr,
        get_fh,
        link,
        lock,
        lockt,
        locku,
        lookup,
        /// LOOKUPP, lookup of the parent directory
        lookup_root,
        nverify,
        open,
        open_attr,
        open_confirm,
        open_downgrade,
        put_fh,
        put_pub_fh,
        put_root_fh,
        read,
        read_dir,
        read_link,
        remove,
        rename,
        renew,
        restore_fh,
        save_fh,
        sec_info,
        set_attr,
        set_client_id,
        set_client_id_confirm,
        verify,
        write,
        release_lockowner,
        /// First NFSv4.1 operation
        backchannel_ctl,
        bind_conn_to_session,
        exchange_id,
        create_session,
        destroy_session,
        free_state_id,
        get_dir_delegation,
        get_device_info,
        get_device_list,
        layout_commit,
        layout_get,
        layout_return,
        sec_info_no_name,
        sequence,
        set_ssv,
        test_state_id,
        want_delegation,
        destroy_client_id,
        reclaim_complete,
        /// First NFSv4.2 operation
        allocate,
        copy,
        copy_notify,
        deallocate,
        io_advise,
        layout_error,
        layout_stats,
        offload_cancel,
        offload_status,
        read_plus,
        seek,
        write_same,
        clone,
        /// First extended attribute operation
        get_xattr,
        set_xattr,
        list_xattrs,
        remove_xattr,
    }
}
//
impl NfsV4Ops {
    /// Number of operation counters emitted by an NFSv4.0 server
    pub const V4_0_OPS: usize = 40;

    /// Number of operation counters emitted by an NFSv4.1 server
    pub const V4_1_OPS: usize = 59;

    /// Number of operation counters emitted by an NFSv4.2 server
    pub const V4_2_OPS: usize = 72;
}
