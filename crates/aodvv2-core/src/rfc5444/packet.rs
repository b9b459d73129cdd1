//! Packet codec (RFC 5444 §5.1): a version+flags octet, optional packet
//! sequence number, an optional packet-level TLV block, then zero or more
//! self-delimited messages.

use crate::error::Rfc5444Error;
use crate::rfc5444::cursor::{Cursor, Emitter};
use crate::rfc5444::message::Message;
use crate::rfc5444::tlv::{self, Tlv};

const VERSION: u8 = 0;

mod flag {
    pub const HAS_SEQ_NUM: u8 = 0x08;
    pub const HAS_TLV: u8 = 0x04;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub seq_num: Option<u16>,
    pub tlvs: Vec<Tlv>,
    pub messages: Vec<Message>,
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, Rfc5444Error> {
        let mut flags = 0u8;
        if self.seq_num.is_some() {
            flags |= flag::HAS_SEQ_NUM;
        }
        if !self.tlvs.is_empty() {
            flags |= flag::HAS_TLV;
        }

        let mut out = Emitter::new();
        out.push_u8((VERSION << 4) | flags);
        if let Some(seq_num) = self.seq_num {
            out.push_u16(seq_num);
        }
        if flags & flag::HAS_TLV != 0 {
            out.push_bytes(&tlv::encode_block(&self.tlvs)?);
        }
        for msg in &self.messages {
            out.push_bytes(&msg.encode()?);
        }
        Ok(out.buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, Rfc5444Error> {
        let mut cur = Cursor::new(buf);
        let version_flags = cur.read_u8()?;
        let version = version_flags >> 4;
        if version != VERSION {
            return Err(Rfc5444Error::UnsupportedVersion);
        }
        let flags = version_flags & 0x0f;

        let seq_num = if flags & flag::HAS_SEQ_NUM != 0 { Some(cur.read_u16()?) } else { None };
        let tlvs = if flags & flag::HAS_TLV != 0 { tlv::decode_block(&mut cur)? } else { Vec::new() };

        let mut messages = Vec::new();
        while cur.remaining() > 0 {
            messages.push(Message::decode(&mut cur)?);
        }

        Ok(Self { seq_num, tlvs, messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc5444::message::Message;

    #[test]
    fn roundtrip_empty_packet() {
        let pkt = Packet::default();
        let encoded = pkt.encode().unwrap();
        assert_eq!(Packet::decode(&encoded).unwrap(), pkt);
    }

    #[test]
    fn roundtrip_with_seqnum_and_messages() {
        let mut pkt = Packet { seq_num: Some(99), ..Default::default() };
        pkt.messages.push(Message::new(10, 16));
        pkt.messages.push(Message::new(11, 16));
        let encoded = pkt.encode().unwrap();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn bad_version_is_rejected() {
        let bytes = [0x10u8]; // version 1
        assert_eq!(Packet::decode(&bytes), Err(Rfc5444Error::UnsupportedVersion));
    }

    #[test]
    fn aggregates_multiple_messages_in_one_packet() {
        let mut pkt = Packet::default();
        for t in [10u8, 11, 13] {
            pkt.messages.push(Message::new(t, 16));
        }
        let encoded = pkt.encode().unwrap();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.messages.len(), 3);
    }
}
