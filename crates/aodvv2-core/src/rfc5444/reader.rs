//! Reader dispatch engine (RFC 5444 consumer side). Registered consumers,
//! keyed by `(msg_id, is_default)`, see a start-callback, then for each
//! address a start-callback and for each of its applicable TLVs a
//! tlv-callback, then an end-callback — in registration order. A callback's
//! `ReaderAction` can drop the TLV/address/message/packet it was called
//! for; later consumers never see what an earlier one dropped.

use std::net::Ipv6Addr;

use crate::error::Rfc5444Error;
use crate::rfc5444::message::Message;
use crate::rfc5444::packet::Packet;
use crate::rfc5444::tlv::{AddrIndex, Tlv};

/// Outcome of a single callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderAction {
    Ok,
    DropTlv,
    DropAddress,
    DropMessage,
    DropMessageButForward,
    DropPacket,
}

/// Identifies one address within the message being dispatched: the address
/// block it came from, and its position within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRef {
    pub block: usize,
    pub index: usize,
}

/// Caller-supplied context passed into every callback instead of a
/// back-pointer into the reader (breaks the reader/target callback cycle
/// per the source's own design note).
#[derive(Debug, Clone, Copy)]
pub struct ReaderContext {
    pub sender: Ipv6Addr,
    pub iface: u32,
}

/// A registered message consumer. `msg_id() == None` makes it a *default*
/// consumer, invoked for every message regardless of type; `Some(t)` scopes
/// it to messages of type `t`. Specific consumers run before default ones;
/// within each group, registration order is preserved.
pub trait MessageConsumer: Send {
    fn msg_id(&self) -> Option<u8>;

    fn start_message(&mut self, _ctx: &ReaderContext, _msg: &Message) -> ReaderAction {
        ReaderAction::Ok
    }
    fn start_address(&mut self, _ctx: &ReaderContext, _addr: AddrRef, _prefix: &[u8], _pfx_len: u8) -> ReaderAction {
        ReaderAction::Ok
    }
    fn handle_tlv(&mut self, _ctx: &ReaderContext, _addr: AddrRef, _tlv: &Tlv) -> ReaderAction {
        ReaderAction::Ok
    }
    fn end_message(&mut self, _ctx: &ReaderContext, _msg: &Message, _outcome: MessageOutcome) -> ReaderAction {
        ReaderAction::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Delivered,
    Dropped,
    DroppedButForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    MessageDropped,
    MessageDroppedButForward,
    PacketDropped,
}

#[derive(Default)]
pub struct Reader {
    consumers: Vec<Box<dyn MessageConsumer>>,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, consumer: Box<dyn MessageConsumer>) {
        self.consumers.push(consumer);
    }

    /// Parse a packet and dispatch each message to registered consumers.
    /// Returns one outcome per message actually reached (a `DropPacket`
    /// anywhere short-circuits the whole packet and is reported once).
    pub fn handle_packet(
        &mut self,
        ctx: &ReaderContext,
        bytes: &[u8],
    ) -> Result<Vec<DispatchOutcome>, Rfc5444Error> {
        let packet = Packet::decode(bytes)?;
        let mut outcomes = Vec::with_capacity(packet.messages.len());
        for msg in &packet.messages {
            let outcome = self.dispatch_message(ctx, msg);
            let abort = outcome == DispatchOutcome::PacketDropped;
            outcomes.push(outcome);
            if abort {
                break;
            }
        }
        Ok(outcomes)
    }

    fn order(&self, msg_type: u8) -> Vec<usize> {
        let mut specific = Vec::new();
        let mut default = Vec::new();
        for (i, c) in self.consumers.iter().enumerate() {
            match c.msg_id() {
                Some(t) if t == msg_type => specific.push(i),
                Some(_) => {}
                None => default.push(i),
            }
        }
        specific.extend(default);
        specific
    }

    fn dispatch_message(&mut self, ctx: &ReaderContext, msg: &Message) -> DispatchOutcome {
        let order = self.order(msg.msg_type);

        let mut addr_dropped: Vec<Vec<bool>> =
            msg.addr_blocks.iter().map(|b| vec![false; b.addrs.len()]).collect();
        let mut tlv_dropped: Vec<Vec<bool>> =
            msg.addr_blocks.iter().map(|b| vec![false; b.tlvs.len()]).collect();

        for &ci in &order {
            let outcome = self.run_consumer(ci, ctx, msg, &mut addr_dropped, &mut tlv_dropped);
            match outcome {
                ReaderAction::DropPacket => return DispatchOutcome::PacketDropped,
                ReaderAction::DropMessage => return DispatchOutcome::MessageDropped,
                ReaderAction::DropMessageButForward => return DispatchOutcome::MessageDroppedButForward,
                _ => {}
            }
        }
        DispatchOutcome::Delivered
    }

    fn run_consumer(
        &mut self,
        ci: usize,
        ctx: &ReaderContext,
        msg: &Message,
        addr_dropped: &mut [Vec<bool>],
        tlv_dropped: &mut [Vec<bool>],
    ) -> ReaderAction {
        let consumer = &mut self.consumers[ci];

        let start = consumer.start_message(ctx, msg);
        match start {
            ReaderAction::DropMessage | ReaderAction::DropMessageButForward | ReaderAction::DropPacket => {
                return start;
            }
            _ => {}
        }

        for (bi, block) in msg.addr_blocks.iter().enumerate() {
            for (ai, addr) in block.addrs.iter().enumerate() {
                if addr_dropped[bi][ai] {
                    continue;
                }
                let aref = AddrRef { block: bi, index: ai };
                let addr_action = consumer.start_address(ctx, aref, &addr.addr, addr.pfx_len);
                match addr_action {
                    ReaderAction::DropAddress => {
                        addr_dropped[bi][ai] = true;
                        continue;
                    }
                    ReaderAction::DropMessage
                    | ReaderAction::DropMessageButForward
                    | ReaderAction::DropPacket => return addr_action,
                    _ => {}
                }

                for (ti, tlv) in block.tlvs.iter().enumerate() {
                    if tlv_dropped[bi][ti] || !tlv_applies_to(tlv, ai) {
                        continue;
                    }
                    let tlv_action = consumer.handle_tlv(ctx, aref, tlv);
                    match tlv_action {
                        ReaderAction::DropTlv => tlv_dropped[bi][ti] = true,
                        ReaderAction::DropAddress => {
                            addr_dropped[bi][ai] = true;
                            break;
                        }
                        ReaderAction::DropMessage
                        | ReaderAction::DropMessageButForward
                        | ReaderAction::DropPacket => return tlv_action,
                        ReaderAction::Ok => {}
                    }
                }
            }
        }

        let end = consumer.end_message(ctx, msg, MessageOutcome::Delivered);
        end
    }
}

pub(crate) fn tlv_applies_to(tlv: &Tlv, local_addr_index: usize) -> bool {
    match tlv.index {
        None => true,
        Some(AddrIndex::Single(i)) => i as usize == local_addr_index,
        Some(AddrIndex::Range(start, stop)) => {
            (start as usize..=stop as usize).contains(&local_addr_index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc5444::addrblock::AddrEntry;
    use crate::rfc5444::message::AddrBlock;
    use std::sync::{Arc, Mutex};

    struct RecordingConsumer {
        msg_id: Option<u8>,
        seen_addrs: Arc<Mutex<Vec<Vec<u8>>>>,
        seen_tlvs: Arc<Mutex<Vec<u8>>>,
        drop_first_tlv: bool,
    }

    impl MessageConsumer for RecordingConsumer {
        fn msg_id(&self) -> Option<u8> {
            self.msg_id
        }
        fn start_address(&mut self, _ctx: &ReaderContext, _a: AddrRef, prefix: &[u8], _pfx: u8) -> ReaderAction {
            self.seen_addrs.lock().unwrap().push(prefix.to_vec());
            ReaderAction::Ok
        }
        fn handle_tlv(&mut self, _ctx: &ReaderContext, _a: AddrRef, tlv: &Tlv) -> ReaderAction {
            self.seen_tlvs.lock().unwrap().push(tlv.tlv_type);
            if self.drop_first_tlv {
                self.drop_first_tlv = false;
                return ReaderAction::DropTlv;
            }
            ReaderAction::Ok
        }
    }

    fn sample_message() -> Message {
        let mut msg = Message::new(10, 16);
        msg.addr_blocks.push(AddrBlock {
            addrs: vec![
                AddrEntry { addr: vec![1; 16], pfx_len: 64 },
                AddrEntry { addr: vec![2; 16], pfx_len: 64 },
            ],
            tlvs: vec![Tlv::new(5), Tlv::new(6)],
        });
        msg
    }

    #[test]
    fn dispatches_to_matching_consumer_in_order() {
        let seen_addrs = Arc::new(Mutex::new(Vec::new()));
        let seen_tlvs = Arc::new(Mutex::new(Vec::new()));
        let mut reader = Reader::new();
        reader.register(Box::new(RecordingConsumer {
            msg_id: Some(10),
            seen_addrs: seen_addrs.clone(),
            seen_tlvs: seen_tlvs.clone(),
            drop_first_tlv: false,
        }));

        let ctx = ReaderContext { sender: Ipv6Addr::LOCALHOST, iface: 1 };
        let outcome = reader.dispatch_message(&ctx, &sample_message());
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(seen_addrs.lock().unwrap().len(), 2);
        // both addresses see both tlvs (no index restriction) == 4 calls
        assert_eq!(seen_tlvs.lock().unwrap().len(), 4);
    }

    #[test]
    fn later_consumer_does_not_see_dropped_tlv() {
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_a_tlvs = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));
        let seen_b_tlvs = Arc::new(Mutex::new(Vec::new()));

        let mut reader = Reader::new();
        reader.register(Box::new(RecordingConsumer {
            msg_id: Some(10),
            seen_addrs: seen_a.clone(),
            seen_tlvs: seen_a_tlvs.clone(),
            drop_first_tlv: true,
        }));
        reader.register(Box::new(RecordingConsumer {
            msg_id: Some(10),
            seen_addrs: seen_b.clone(),
            seen_tlvs: seen_b_tlvs.clone(),
            drop_first_tlv: false,
        }));

        let ctx = ReaderContext { sender: Ipv6Addr::LOCALHOST, iface: 1 };
        reader.dispatch_message(&ctx, &sample_message());

        // first consumer saw all 4 (2 addrs * 2 tlvs), dropped one occurrence
        assert_eq!(seen_a_tlvs.lock().unwrap().len(), 4);
        // second consumer sees one fewer tlv occurrence than the first did
        assert_eq!(seen_b_tlvs.lock().unwrap().len(), 3);
    }

    #[test]
    fn drop_message_short_circuits_remaining_consumers() {
        struct DropperConsumer;
        impl MessageConsumer for DropperConsumer {
            fn msg_id(&self) -> Option<u8> {
                Some(10)
            }
            fn start_message(&mut self, _ctx: &ReaderContext, _msg: &Message) -> ReaderAction {
                ReaderAction::DropMessage
            }
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_tlvs = Arc::new(Mutex::new(Vec::new()));
        let mut reader = Reader::new();
        reader.register(Box::new(DropperConsumer));
        reader.register(Box::new(RecordingConsumer {
            msg_id: Some(10),
            seen_addrs: seen.clone(),
            seen_tlvs: seen_tlvs.clone(),
            drop_first_tlv: false,
        }));

        let ctx = ReaderContext { sender: Ipv6Addr::LOCALHOST, iface: 1 };
        let outcome = reader.dispatch_message(&ctx, &sample_message());
        assert_eq!(outcome, DispatchOutcome::MessageDropped);
        assert!(seen.lock().unwrap().is_empty());
    }
}
