//! AODVv2 (draft-perkins-manet-aodvv2-03) reactive routing core over an
//! RFC 5444 multi-message carrier. Transport- and FIB-agnostic: a node
//! binds [`host`]'s traits to a real socket and forwarding table and
//! drives the protocol through [`core::Aodvv2Core`].

pub mod config;
pub mod core;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod host;
pub mod metric;
pub mod rfc5444;
pub mod scheduler;
pub mod seqnum;
pub mod sets;

pub use crate::core::Aodvv2Core;
pub use config::Constants;
pub use error::{Aodvv2Error, Result};
pub use host::{Fib, IcmpV6, OriginatorLookup, UdpTransport};
