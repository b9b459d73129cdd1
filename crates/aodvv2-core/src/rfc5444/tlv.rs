//! TLV codec (RFC 5444 §5.4). A TLV carries a type, flags, an optional
//! type-extension, an optional index or index range (address TLVs only),
//! and an optional value with optional extended length. The same
//! `(type, type_ext)` may appear multiple times in one block; readers see
//! each occurrence in registration order.

use crate::error::Rfc5444Error;
use crate::rfc5444::cursor::{Cursor, Emitter};

mod flag {
    pub const HAS_TYPE_EXT: u8 = 0x80;
    pub const HAS_SINGLE_INDEX: u8 = 0x40;
    pub const HAS_MULTI_INDEX: u8 = 0x20;
    pub const HAS_VALUE: u8 = 0x10;
    pub const HAS_EXT_LEN: u8 = 0x08;
    pub const IS_MULTIVALUE: u8 = 0x04;
}

/// Which addresses in the enclosing address block a TLV applies to.
/// `None` (no index flags set) means "all addresses in the block".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrIndex {
    Single(u8),
    Range(u8, u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: u8,
    pub type_ext: Option<u8>,
    pub index: Option<AddrIndex>,
    /// `true` when `value` holds one concatenated value per addressed
    /// address rather than a single shared value (address TLVs only).
    pub multivalue: bool,
    pub value: Option<Vec<u8>>,
}

impl Tlv {
    pub fn new(tlv_type: u8) -> Self {
        Self { tlv_type, type_ext: None, index: None, multivalue: false, value: None }
    }

    pub fn with_value(mut self, value: Vec<u8>) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_type_ext(mut self, ext: u8) -> Self {
        self.type_ext = Some(ext);
        self
    }

    pub fn with_index(mut self, index: AddrIndex) -> Self {
        self.index = Some(index);
        self
    }

    fn encode(&self, out: &mut Emitter) -> Result<(), Rfc5444Error> {
        let mut flags = 0u8;
        if self.type_ext.is_some() {
            flags |= flag::HAS_TYPE_EXT;
        }
        match self.index {
            Some(AddrIndex::Single(_)) => flags |= flag::HAS_SINGLE_INDEX,
            Some(AddrIndex::Range(_, _)) => flags |= flag::HAS_MULTI_INDEX,
            None => {}
        }
        let ext_len = matches!(&self.value, Some(v) if v.len() > 255);
        if self.value.is_some() {
            flags |= flag::HAS_VALUE;
            if ext_len {
                flags |= flag::HAS_EXT_LEN;
            }
        }
        if self.multivalue {
            flags |= flag::IS_MULTIVALUE;
        }

        out.push_u8(self.tlv_type);
        out.push_u8(flags);
        if let Some(ext) = self.type_ext {
            out.push_u8(ext);
        }
        match self.index {
            Some(AddrIndex::Single(i)) => out.push_u8(i),
            Some(AddrIndex::Range(start, stop)) => {
                out.push_u8(start);
                out.push_u8(stop);
            }
            None => {}
        }
        if let Some(value) = &self.value {
            if ext_len {
                out.push_u16(value.len() as u16);
            } else {
                out.push_u8(value.len() as u8);
            }
            out.push_bytes(value);
        }
        Ok(())
    }

    fn decode(cur: &mut Cursor<'_>) -> Result<Self, Rfc5444Error> {
        let tlv_type = cur.read_u8()?;
        let flags = cur.read_u8()?;

        // Reserved bits must be zero; a set reserved bit is a malformed flags byte.
        if flags & 0x03 != 0 {
            return Err(Rfc5444Error::BadTlvIdxFlags);
        }
        let has_single = flags & flag::HAS_SINGLE_INDEX != 0;
        let has_multi = flags & flag::HAS_MULTI_INDEX != 0;
        if has_single && has_multi {
            return Err(Rfc5444Error::BadTlvIdxFlags);
        }

        let type_ext = if flags & flag::HAS_TYPE_EXT != 0 {
            Some(cur.read_u8()?)
        } else {
            None
        };

        let index = if has_single {
            Some(AddrIndex::Single(cur.read_u8()?))
        } else if has_multi {
            let start = cur.read_u8()?;
            let stop = cur.read_u8()?;
            if start > stop {
                return Err(Rfc5444Error::BadTlvIdxFlags);
            }
            Some(AddrIndex::Range(start, stop))
        } else {
            None
        };

        let multivalue = flags & flag::IS_MULTIVALUE != 0;
        if multivalue && flags & flag::HAS_VALUE == 0 {
            return Err(Rfc5444Error::BadTlvValueFlags);
        }

        let value = if flags & flag::HAS_VALUE != 0 {
            let len = if flags & flag::HAS_EXT_LEN != 0 {
                cur.read_u16()? as usize
            } else {
                cur.read_u8()? as usize
            };
            Some(cur.read_bytes(len)?.to_vec())
        } else {
            if flags & flag::HAS_EXT_LEN != 0 {
                return Err(Rfc5444Error::BadTlvLength);
            }
            None
        };

        Ok(Self { tlv_type, type_ext, index, multivalue, value })
    }
}

/// A TLV block: a 16-bit byte length followed by that many bytes of
/// sequential TLVs. Used for both message-level and address-level blocks.
pub fn encode_block(tlvs: &[Tlv]) -> Result<Vec<u8>, Rfc5444Error> {
    let mut body = Emitter::new();
    for tlv in tlvs {
        tlv.encode(&mut body)?;
    }
    let mut out = Emitter::new();
    out.push_u16(body.len() as u16);
    out.push_bytes(&body.buf);
    Ok(out.buf)
}

pub fn decode_block(cur: &mut Cursor<'_>) -> Result<Vec<Tlv>, Rfc5444Error> {
    let len = cur.read_u16()? as usize;
    let mut inner = cur.sub_cursor(len)?;
    let mut tlvs = Vec::new();
    while inner.remaining() > 0 {
        tlvs.push(Tlv::decode(&mut inner)?);
    }
    Ok(tlvs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_plain_tlv() {
        let tlv = Tlv::new(7).with_value(vec![1, 2, 3]);
        let encoded = encode_block(&[tlv.clone()]).unwrap();
        let mut cur = Cursor::new(&encoded);
        let decoded = decode_block(&mut cur).unwrap();
        assert_eq!(decoded, vec![tlv]);
    }

    #[test]
    fn roundtrip_indexed_with_ext() {
        let tlv = Tlv::new(9)
            .with_type_ext(3)
            .with_index(AddrIndex::Range(0, 2))
            .with_value(vec![42]);
        let encoded = encode_block(&[tlv.clone()]).unwrap();
        let mut cur = Cursor::new(&encoded);
        let decoded = decode_block(&mut cur).unwrap();
        assert_eq!(decoded, vec![tlv]);
    }

    #[test]
    fn multiple_occurrences_preserve_order() {
        let a = Tlv::new(1).with_value(vec![1]);
        let b = Tlv::new(1).with_value(vec![2]);
        let encoded = encode_block(&[a.clone(), b.clone()]).unwrap();
        let mut cur = Cursor::new(&encoded);
        let decoded = decode_block(&mut cur).unwrap();
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn both_index_flags_is_an_error() {
        // byte 0 = type, byte 1 = flags with both HAS_SINGLE_INDEX | HAS_MULTI_INDEX set
        let bytes = [0u8, flag::HAS_SINGLE_INDEX | flag::HAS_MULTI_INDEX];
        let mut cur = Cursor::new(&bytes);
        assert_eq!(Tlv::decode(&mut cur), Err(Rfc5444Error::BadTlvIdxFlags));
    }

    #[test]
    fn ext_len_without_value_is_an_error() {
        let bytes = [0u8, flag::HAS_EXT_LEN];
        let mut cur = Cursor::new(&bytes);
        assert_eq!(Tlv::decode(&mut cur), Err(Rfc5444Error::BadTlvLength));
    }
}
