//! bincode settings shared by block and proof encoding.

use bincode::config::Config;

/// Upper bound on bytes a single decode may allocate.
pub(crate) const DECODE_LIMIT: usize = 100 * 1024 * 1024;

pub(crate) fn encode_config() -> impl Config {
    bincode::config::standard()
        .with_big_endian()
        .with_no_limit()
}

pub(crate) fn decode_config() -> impl Config {
    bincode::config::standard()
        .with_big_endian()
        .with_limit::<DECODE_LIMIT>()
}
