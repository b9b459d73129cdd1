//! Linux UDP/multicast transport (MANET port 269). Construction sequence
//! mirrors the core crate's receiver: `Socket::new` -> `set_reuse_address`
//! -> `bind` -> `join_multicast_v6`. A dedicated receive thread forwards
//! datagrams into a bounded channel the carrier task drains.

use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;

use anyhow::{Context, Result};
use aodvv2_core::host::UdpTransport;
use crossbeam_channel::{Receiver, Sender};
use socket2::{Domain, Protocol, Socket, Type};

const MANET_PORT: u16 = 269;
const PKT_CAP: usize = 1500;

pub struct LinuxUdpTransport {
    socket: Arc<Socket>,
    rx: Receiver<(Ipv6Addr, u32, Vec<u8>)>,
}

impl LinuxUdpTransport {
    pub fn bind(iface_index: u32) -> Result<Self> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))
            .context("failed to create UDP socket")?;
        socket.set_reuse_address(true).context("SO_REUSEADDR")?;
        let bind_addr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, MANET_PORT, 0, 0);
        socket.bind(&bind_addr.into()).context("bind to MANET port")?;
        socket
            .join_multicast_v6(&aodvv2_core::config::LL_MANET_ROUTERS, iface_index)
            .context("join ff02::6d")?;

        let socket = Arc::new(socket);
        let (tx, rx): (Sender<(Ipv6Addr, u32, Vec<u8>)>, _) = crossbeam_channel::bounded(256);
        spawn_receive_thread(Arc::clone(&socket), iface_index, tx);

        Ok(Self { socket, rx })
    }
}

fn spawn_receive_thread(socket: Arc<Socket>, iface_index: u32, tx: Sender<(Ipv6Addr, u32, Vec<u8>)>) {
    std::thread::Builder::new()
        .name("aodvv2-udp-recv".into())
        .spawn(move || {
            tracing::info!("aodvv2 UDP receiver started");
            let mut buf = vec![std::mem::MaybeUninit::new(0u8); PKT_CAP];
            loop {
                match socket.recv_from(&mut buf) {
                    Ok((n, addr)) => {
                        let Some(addr) = addr.as_socket_ipv6() else { continue };
                        let bytes: Vec<u8> = buf[..n].iter().map(|b| unsafe { b.assume_init() }).collect();
                        if tx.try_send((*addr.ip(), iface_index, bytes)).is_err() {
                            tracing::warn!("inbound queue full, dropping datagram");
                        }
                    }
                    Err(err) => tracing::warn!(%err, "udp recv failed"),
                }
            }
        })
        .expect("failed to spawn UDP receive thread");
}

impl UdpTransport for LinuxUdpTransport {
    fn send_to(&self, dst: Ipv6Addr, iface: u32, bytes: &[u8]) -> std::io::Result<()> {
        let addr = SocketAddrV6::new(dst, MANET_PORT, 0, iface);
        self.socket.send_to(bytes, &addr.into())?;
        Ok(())
    }

    fn recv_from(&self) -> Receiver<(Ipv6Addr, u32, Vec<u8>)> {
        self.rx.clone()
    }

    fn join_link_local_multicast(&self, iface: u32) -> std::io::Result<()> {
        self.socket.join_multicast_v6(&aodvv2_core::config::LL_MANET_ROUTERS, iface)
    }
}
