//! # Meadow Soak Run
//!
//! Spawns a world of random bots and drives it through the full sync
//! pipeline, then prints the totals.
//!
//! ```text
//! meadow_soak --config config/meadow.toml --bots 300 --ticks 3600
//! meadow_soak --udp --realtime
//! RUST_LOG=meadow_server=debug meadow_soak
//! ```
//!
//! With `--udp` the packets leave through a socket bound to the configured
//! `bind_address`, addressed to each bot's loopback port.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use meadow_server::{BotSimulation, ServerConfig, SoakConfig, TickLoop, Transport, UdpTransport};

#[derive(Parser)]
#[command(name = "meadow_soak", about = "Soak test for the Meadow sync pipeline")]
struct Cli {
    /// Server config file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of bots
    #[arg(short, long, default_value = "100")]
    bots: usize,

    /// Ticks to run
    #[arg(short, long, default_value = "600")]
    ticks: u64,

    /// Arena edge length
    #[arg(long, default_value = "10000")]
    arena: f32,

    /// RNG seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Pace ticks at the configured tick rate instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Send over a UDP socket bound to the configured address
    #[arg(long)]
    udp: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server_config = ServerConfig::load(cli.config.as_deref())?;
    let tick_rate = server_config.tick_rate;
    let soak = SoakConfig {
        bot_count: cli.bots,
        ticks: cli.ticks,
        arena_size: cli.arena,
        seed: cli.seed,
        ..SoakConfig::default()
    };

    if cli.udp {
        let transport = UdpTransport::bind(server_config.bind_address)?;
        tracing::info!("Sending over UDP from {}", transport.local_addr());
        let mut simulation = BotSimulation::with_transport(server_config, soak, transport)?;
        let (elapsed, tick_loop) = drive(&mut simulation, tick_rate, cli.realtime);
        report(&simulation, elapsed, &tick_loop);

        let udp = simulation.server().dispatcher().transport().stats();
        println!(
            "  udp:          {} packets, {} bytes, {} errors",
            udp.packets_sent, udp.bytes_sent, udp.send_errors
        );
    } else {
        let mut simulation = BotSimulation::new(server_config, soak)?;
        let (elapsed, tick_loop) = drive(&mut simulation, tick_rate, cli.realtime);
        report(&simulation, elapsed, &tick_loop);
    }
    Ok(())
}

/// Runs every tick, paced or flat out.
fn drive<T: Transport>(simulation: &mut BotSimulation<T>, tick_rate: u32, realtime: bool) -> (Duration, TickLoop) {
    let mut tick_loop = TickLoop::new(tick_rate);
    let started = Instant::now();

    loop {
        if realtime {
            tick_loop.wait_for_next_tick();
            if !tick_loop.should_tick() {
                continue;
            }
        }
        let start = tick_loop.begin_tick();
        let more = simulation.tick();
        tick_loop.end_tick(start);
        if !more {
            break;
        }
    }
    (started.elapsed(), tick_loop)
}

fn report<T: Transport>(simulation: &BotSimulation<T>, elapsed: Duration, tick_loop: &TickLoop) {
    let stats = simulation.stats();
    let timing = tick_loop.stats();

    println!("Soak run finished in {:.2}s", elapsed.as_secs_f64());
    println!("  ticks:        {}", stats.ticks);
    println!("  stat writes:  {}", stats.stat_writes);
    println!("  deaths:       {}", stats.deaths);
    println!("  respawns:     {}", stats.respawns);
    println!("  views:        {}", stats.views);
    println!("  delivered:    {}", stats.delivered);
    println!("  dropped:      {}", stats.dropped);
    println!("  bytes:        {}", stats.bytes);
    println!(
        "  tick time:    min {}us / avg {}us / max {}us, {} late",
        timing.min_tick_us, timing.avg_tick_us, timing.max_tick_us, timing.late_ticks
    );
}
