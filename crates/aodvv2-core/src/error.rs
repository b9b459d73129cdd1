//! Error taxonomy for the core. A tagged sum type per spec's own "error
//! taxonomy as sum type" design note, rather than integer sentinels.

use thiserror::Error;

/// Wire-decode errors from the RFC 5444 codec (spec §4.3/§7 category 1).
/// The offending TLV, address, message, or packet is dropped with no state
/// change; the enclosing decode aborts.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rfc5444Error {
    #[error("malformed TLV index/flags")]
    BadTlvIdxFlags,
    #[error("malformed TLV value flags")]
    BadTlvValueFlags,
    #[error("malformed TLV length")]
    BadTlvLength,
    #[error("address block has zero addresses")]
    EmptyAddrBlock,
    #[error("malformed message tail flags")]
    BadMsgTailFlags,
    #[error("malformed message prefix flags")]
    BadMsgPrefixFlags,
    #[error("ran past the end of the buffer")]
    EndOfBuffer,
    #[error("unsupported packet version")]
    UnsupportedVersion,
}

/// Resource-exhaustion errors from a bounded set store (spec §7 category 2).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SetError {
    #[error("set is at capacity")]
    Full,
    #[error("no entry matches")]
    NotFound,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("invalid key (prefix length or address)")]
    InvalidKey,
}

/// Top-level core error: wraps the above plus host-trait/transport failures.
#[derive(Debug, Error)]
pub enum Aodvv2Error {
    #[error("RFC 5444 decode error: {0}")]
    Wire(#[from] Rfc5444Error),
    #[error("set store error: {0}")]
    Set(#[from] SetError),
    #[error("host transport error: {0}")]
    Host(String),
    #[error("message is not fragmentable into target MTU")]
    MessageTooLarge,
}

pub type Result<T> = std::result::Result<T, Aodvv2Error>;
