//! aodvv2d — AODVv2 reactive routing node for IPv6 mesh networks.
//!
//! Wires `aodvv2-core`'s `Aodvv2Core` to a real Linux UDP/multicast
//! transport and an in-memory loopback FIB. Run `aodvv2d --help` for usage.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod fib;
mod transport;

use cli::{Cli, Commands};
use config::NodeConfig;
use fib::{IdentityOriginator, LoggingIcmp, LoopbackFib};
use transport::LinuxUdpTransport;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let example = NodeConfig::default_example();
            print!("{}", toml::to_string_pretty(&example)?);
        }
        Commands::Run => run(&cli.config)?,
        Commands::Status => status(&cli.config)?,
    }

    Ok(())
}

fn run(config_path: &std::path::Path) -> Result<()> {
    let config = NodeConfig::load(config_path)?;
    let iface_index = resolve_interface_index(&config.interface)?;
    let constants = config.constants.apply(aodvv2_core::Constants::default());

    let transport = LinuxUdpTransport::bind(iface_index).context("binding AODVv2 UDP transport")?;
    let core = aodvv2_core::Aodvv2Core::<_, _, _, _, std::sync::Arc<[u8]>>::new(
        constants,
        transport,
        LoopbackFib::default(),
        IdentityOriginator,
        LoggingIcmp,
    );

    for client in &config.router_clients {
        let addr: std::net::Ipv6Addr = client
            .addr
            .parse()
            .with_context(|| format!("invalid router client address: {}", client.addr))?;
        core.add_router_client(addr, client.pfx_len, client.cost)
            .with_context(|| format!("registering router client {}/{}", client.addr, client.pfx_len))?;
    }

    tracing::info!(interface = %config.interface, "aodvv2 node starting");
    let (routing, carrier) = core.spawn();
    routing.join().expect("routing task panicked");
    carrier.join().expect("carrier task panicked");
    Ok(())
}

fn status(config_path: &std::path::Path) -> Result<()> {
    let config = NodeConfig::load(config_path)?;
    println!("interface: {}", config.interface);
    println!("link-local: {}", config.link_local_addr);
    println!("router clients:");
    for client in &config.router_clients {
        println!("  {}/{} cost={}", client.addr, client.pfx_len, client.cost);
    }
    Ok(())
}

fn resolve_interface_index(name: &str) -> Result<u32> {
    let cname = std::ffi::CString::new(name).context("interface name has an interior NUL")?;
    let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
    if index == 0 {
        anyhow::bail!("interface {} not found", name);
    }
    Ok(index)
}
