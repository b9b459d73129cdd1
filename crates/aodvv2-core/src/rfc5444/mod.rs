//! RFC 5444 generalized packet/message format: wire codec (packet, message,
//! address block, TLV layers) plus a reader dispatch engine and a
//! per-target writer/aggregator built on top of it.

pub mod addrblock;
pub mod cursor;
pub mod message;
pub mod packet;
pub mod reader;
pub mod tlv;
pub mod writer;

pub use addrblock::AddrEntry;
pub use message::{AddrBlock, Message};
pub use packet::Packet;
pub use reader::{AddrRef, DispatchOutcome, MessageConsumer, MessageOutcome, Reader, ReaderAction, ReaderContext};
pub use tlv::{AddrIndex, Tlv};
pub use writer::{Target, Writer};
