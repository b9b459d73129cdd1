//! Message codec (RFC 5444 §5.2): type, address-length, optional
//! originator/hop-limit/hop-count/seqnum header fields, a message-level TLV
//! block, then zero or more (address block, address-TLV block) pairs.

use crate::error::Rfc5444Error;
use crate::rfc5444::addrblock::{self, AddrEntry};
use crate::rfc5444::cursor::{Cursor, Emitter};
use crate::rfc5444::tlv::{self, Tlv};

mod flag {
    pub const HAS_ORIGINATOR: u8 = 0x80;
    pub const HAS_HOP_LIMIT: u8 = 0x40;
    pub const HAS_HOP_COUNT: u8 = 0x20;
    pub const HAS_SEQ_NUM: u8 = 0x10;
}

/// One address block paired with the address-TLV block that follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrBlock {
    pub addrs: Vec<AddrEntry>,
    pub tlvs: Vec<Tlv>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: u8,
    /// Address length in octets, 1..=16. AODVv2-over-IPv6 always uses 16.
    pub addr_len: u8,
    pub originator: Option<Vec<u8>>,
    pub hop_limit: Option<u8>,
    pub hop_count: Option<u8>,
    pub seq_num: Option<u16>,
    pub tlvs: Vec<Tlv>,
    pub addr_blocks: Vec<AddrBlock>,
}

impl Message {
    pub fn new(msg_type: u8, addr_len: u8) -> Self {
        Self {
            msg_type,
            addr_len,
            originator: None,
            hop_limit: None,
            hop_count: None,
            seq_num: None,
            tlvs: Vec::new(),
            addr_blocks: Vec::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, Rfc5444Error> {
        if !(1..=16).contains(&self.addr_len) {
            return Err(Rfc5444Error::BadMsgPrefixFlags);
        }
        let mut flags = 0u8;
        if self.originator.is_some() {
            flags |= flag::HAS_ORIGINATOR;
        }
        if self.hop_limit.is_some() {
            flags |= flag::HAS_HOP_LIMIT;
        }
        if self.hop_count.is_some() {
            flags |= flag::HAS_HOP_COUNT;
        }
        if self.seq_num.is_some() {
            flags |= flag::HAS_SEQ_NUM;
        }

        let mut body = Emitter::new();
        if let Some(originator) = &self.originator {
            if originator.len() != self.addr_len as usize {
                return Err(Rfc5444Error::BadMsgPrefixFlags);
            }
            body.push_bytes(originator);
        }
        if let Some(hop_limit) = self.hop_limit {
            body.push_u8(hop_limit);
        }
        if let Some(hop_count) = self.hop_count {
            body.push_u8(hop_count);
        }
        if let Some(seq_num) = self.seq_num {
            body.push_u16(seq_num);
        }
        body.push_bytes(&tlv::encode_block(&self.tlvs)?);
        for block in &self.addr_blocks {
            body.push_bytes(&addrblock::encode(&block.addrs, self.addr_len as usize)?);
            body.push_bytes(&tlv::encode_block(&block.tlvs)?);
        }

        let header_len = 4; // type + flags/addrlen + 2-byte size
        let total_size = header_len + body.len();
        if total_size > u16::MAX as usize {
            return Err(Rfc5444Error::BadMsgTailFlags);
        }

        let mut out = Emitter::new();
        out.push_u8(self.msg_type);
        out.push_u8(flags | (self.addr_len - 1));
        out.push_u16(total_size as u16);
        out.push_bytes(&body.buf);
        Ok(out.buf)
    }

    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, Rfc5444Error> {
        let msg_type = cur.read_u8()?;
        let flags_and_len = cur.read_u8()?;
        let addr_len = (flags_and_len & 0x0f) + 1;
        let flags = flags_and_len & 0xf0;
        let total_size = cur.read_u16()? as usize;
        if total_size < 4 {
            return Err(Rfc5444Error::BadMsgTailFlags);
        }
        let mut body = cur.sub_cursor(total_size - 4)?;

        let originator = if flags & flag::HAS_ORIGINATOR != 0 {
            Some(body.read_bytes(addr_len as usize)?.to_vec())
        } else {
            None
        };
        let hop_limit = if flags & flag::HAS_HOP_LIMIT != 0 { Some(body.read_u8()?) } else { None };
        let hop_count = if flags & flag::HAS_HOP_COUNT != 0 { Some(body.read_u8()?) } else { None };
        let seq_num = if flags & flag::HAS_SEQ_NUM != 0 { Some(body.read_u16()?) } else { None };

        let tlvs = tlv::decode_block(&mut body)?;

        let mut addr_blocks = Vec::new();
        while body.remaining() > 0 {
            let addrs = addrblock::decode(&mut body, addr_len as usize)?;
            let block_tlvs = tlv::decode_block(&mut body)?;
            addr_blocks.push(AddrBlock { addrs, tlvs: block_tlvs });
        }

        Ok(Self {
            msg_type,
            addr_len,
            originator,
            hop_limit,
            hop_count,
            seq_num,
            tlvs,
            addr_blocks,
        })
    }
}
