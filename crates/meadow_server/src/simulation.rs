//! # Soak Simulation
//!
//! Drives a [`GameServer`] with random bots for stress testing.
//!
//! Each tick the bots wander, gather resources and hurt each other. A bot
//! that reaches zero health dies and respawns a little later. Everything
//! goes through the normal write pipeline and is flushed to the transport,
//! so the run exercises the same paths a live server does. The default
//! transport records in memory; [`BotSimulation::with_transport`] takes any
//! other, such as a bound [`UdpTransport`](crate::transport::UdpTransport).

use std::net::SocketAddr;

use meadow_shared::{GameObjectType, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ServerConfig;
use crate::connection::OwnerId;
use crate::entity::{EntityId, GameObject};
use crate::error::WorldResult;
use crate::player::Player;
use crate::protocol::PacketSerializer;
use crate::server::{GameServer, TickReport};
use crate::transport::{MemoryTransport, Transport};

/// Parameters of a soak run.
#[derive(Clone, Debug)]
pub struct SoakConfig {
    /// Number of bots.
    pub bot_count: usize,
    /// Ticks to run.
    pub ticks: u64,
    /// Arena edge length, centered on the origin.
    pub arena_size: f32,
    /// Trees scattered over the arena.
    pub tree_count: usize,
    /// Distance a bot covers per tick.
    pub bot_speed: f32,
    /// Percent chance per bot per tick of a gather or hit.
    pub action_percent: u32,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            bot_count: 100,
            ticks: 600,
            arena_size: 10_000.0,
            tree_count: 200,
            bot_speed: 12.0,
            action_percent: 5,
            seed: 0x6d65_6164_6f77,
        }
    }
}

/// Totals of a soak run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoakStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Stat writes made.
    pub stat_writes: u64,
    /// Deaths.
    pub deaths: u64,
    /// Respawns.
    pub respawns: u64,
    /// `UpdatePlayers` views queued.
    pub views: u64,
    /// Messages handed to the transport.
    pub delivered: u64,
    /// Messages dropped for lack of a connection.
    pub dropped: u64,
    /// Bytes handed to the transport.
    pub bytes: u64,
}

impl SoakStats {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.views += report.views as u64;
        self.delivered += report.dispatch.delivered;
        self.dropped += report.dispatch.dropped;
        self.bytes += report.dispatch.bytes;
    }
}

/// First loopback port handed to bot clients.
const BOT_BASE_PORT: u16 = 40_000;

/// Bot-driven soak run over a server.
pub struct BotSimulation<T = MemoryTransport> {
    config: SoakConfig,
    server: GameServer<PacketSerializer, T>,
    bots: Vec<EntityId>,
    rng: StdRng,
    stats: SoakStats,
}

impl BotSimulation<MemoryTransport> {
    /// Builds a run over an in-memory transport.
    pub fn new(server_config: ServerConfig, config: SoakConfig) -> WorldResult<Self> {
        Self::with_transport(server_config, config, MemoryTransport::new())
    }
}

impl<T: Transport> BotSimulation<T> {
    /// Builds the world: trees first, then one connected bot per client slot.
    ///
    /// Bots beyond the slot count play without a connection. Each bot's
    /// client sits on its own loopback port.
    pub fn with_transport(server_config: ServerConfig, config: SoakConfig, transport: T) -> WorldResult<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut server = GameServer::new(server_config, PacketSerializer::new(), transport);
        let half = config.arena_size / 2.0;

        let mut next_id: EntityId = 1;
        for _ in 0..config.tree_count {
            let location = random_point(&mut rng, half);
            server.add_object(GameObject::new(next_id, GameObjectType::Tree, location))?;
            next_id += 1;
        }

        let mut bots = Vec::with_capacity(config.bot_count);
        for n in 0..config.bot_count {
            let owner = OwnerId(format!("bot-{n}"));
            let span = usize::from(u16::MAX - BOT_BASE_PORT);
            let port = BOT_BASE_PORT + u16::try_from(n % span).unwrap_or(0);
            let addr = SocketAddr::from(([127, 0, 0, 1], port));

            let mut player = Player::new(next_id, owner.clone(), random_point(&mut rng, half))
                .with_angle(rng.gen_range(0.0..std::f32::consts::TAU))
                .with_name(owner.0.clone());
            if let Some(conn) = server.connect(addr, owner) {
                player = player.with_client(conn);
            }
            player.move_toward(rng.gen_range(0.0..std::f32::consts::TAU));
            server.spawn_player(player)?;

            bots.push(next_id);
            next_id += 1;
        }

        tracing::info!(
            "Soak world ready: {} bots, {} trees, {} ticks",
            bots.len(),
            config.tree_count,
            config.ticks
        );

        Ok(Self {
            config,
            server,
            bots,
            rng,
            stats: SoakStats::default(),
        })
    }

    /// Runs one tick. Returns false once the configured tick count is done.
    pub fn tick(&mut self) -> bool {
        if self.stats.ticks >= self.config.ticks {
            return false;
        }

        self.resolve_movement();
        for slot in 0..self.bots.len() {
            if self.rng.gen_range(0..100) < self.config.action_percent {
                self.act(self.bots[slot]);
            }
        }

        let report = self.server.tick();
        self.stats.record(&report);
        // Nobody reads the packets; keep memory flat.
        self.server.dispatcher_mut().transport_mut().discard_recorded();
        true
    }

    /// Runs every remaining tick and returns the totals.
    pub fn run(&mut self) -> SoakStats {
        while self.tick() {}
        self.stats
    }

    /// Totals so far.
    #[must_use]
    pub const fn stats(&self) -> &SoakStats {
        &self.stats
    }

    /// The server being driven.
    #[must_use]
    pub const fn server(&self) -> &GameServer<PacketSerializer, T> {
        &self.server
    }

    /// Moves every live bot along its heading, turning at the arena edge.
    fn resolve_movement(&mut self) {
        let half = self.config.arena_size / 2.0;
        let speed = self.config.bot_speed;
        let mut world = self.server.world().write();

        for player in world.players_mut() {
            if player.is_dead() {
                continue;
            }
            if self.rng.gen_range(0..60) == 0 {
                player.move_toward(self.rng.gen_range(0.0..std::f32::consts::TAU));
            }
            let Some(direction) = player.move_direction else {
                continue;
            };

            let velocity = Vec2::from_angle(direction) * speed;
            let next = player.entity.location + velocity;
            if next.x.abs() > half || next.y.abs() > half {
                player.move_toward(direction + std::f32::consts::PI);
                player.entity.velocity = Vec2::ZERO;
            } else {
                player.entity.location = next;
                player.entity.velocity = velocity;
                player.entity.angle = direction;
            }
        }
    }

    /// One random action for `bot`: respawn if dead, otherwise gather or
    /// take a hit.
    fn act(&mut self, bot: EntityId) {
        let half = self.config.arena_size / 2.0;
        let roll = self.rng.gen_range(0..4);
        let amount: i32 = self.rng.gen_range(1..=25);
        let spawn = random_point(&mut self.rng, half);
        let killer = self.bots[self.rng.gen_range(0..self.bots.len())];

        let outcome = self.server.with_player(bot, |p| {
            if p.is_dead() {
                return Action::Respawned(p.respawn(spawn));
            }
            match roll {
                0 => p.set_wood(p.wood().saturating_add(amount.unsigned_abs())),
                1 => p.set_stone(p.stone().saturating_add(amount.unsigned_abs())),
                2 => p.set_food(p.food().saturating_add(amount.unsigned_abs())),
                _ => {
                    let health = p.health() - amount;
                    p.set_health(health);
                    if health <= 0 {
                        p.die();
                        return Action::Died;
                    }
                    return Action::Hit;
                }
            };
            Action::Gathered
        });

        match outcome {
            Some(Action::Respawned(true)) => self.stats.respawns += 1,
            Some(Action::Died) => {
                self.stats.stat_writes += 1;
                self.stats.deaths += 1;
                if killer != bot {
                    self.server.with_player(killer, |p| p.kills += 1);
                }
            }
            Some(Action::Gathered | Action::Hit) => self.stats.stat_writes += 1,
            Some(Action::Respawned(false)) | None => {}
        }
    }
}

enum Action {
    Gathered,
    Hit,
    Died,
    Respawned(bool),
}

fn random_point(rng: &mut StdRng, half: f32) -> Vec2 {
    Vec2::new(rng.gen_range(-half..half), rng.gen_range(-half..half))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::UdpTransport;
    use meadow_shared::MAX_HEALTH;

    fn small() -> SoakConfig {
        SoakConfig {
            bot_count: 20,
            ticks: 120,
            arena_size: 2000.0,
            tree_count: 10,
            action_percent: 50,
            ..SoakConfig::default()
        }
    }

    #[test]
    fn test_soak_runs_to_completion() {
        let mut sim = BotSimulation::new(ServerConfig::default(), small()).unwrap();
        let stats = sim.run();

        assert_eq!(stats.ticks, 120);
        assert!(stats.stat_writes > 0);
        assert!(stats.delivered > 0);
        assert!(!sim.tick());

        // Bots stay inside the arena
        let world = sim.server().world().read();
        for player in world.players() {
            assert!(player.entity.location.x.abs() <= 1000.0);
            assert!(player.entity.location.y.abs() <= 1000.0);
            assert!((0..=MAX_HEALTH).contains(&player.health()));
        }
    }

    #[test]
    fn test_bots_beyond_capacity_play_detached() {
        let server_config = ServerConfig {
            max_clients: 5,
            ..ServerConfig::default()
        };
        let sim = BotSimulation::new(server_config, small()).unwrap();

        let world = sim.server().world().read();
        assert_eq!(world.players().len(), 20);
        assert_eq!(world.players().iter().filter(|p| p.has_client()).count(), 5);
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = BotSimulation::new(ServerConfig::default(), small()).unwrap().run();
        let b = BotSimulation::new(ServerConfig::default(), small()).unwrap().run();

        assert_eq!(a.deaths, b.deaths);
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_soak_over_udp_at_bind_address() {
        let server_config = ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let transport = UdpTransport::bind(server_config.bind_address).unwrap();
        let config = SoakConfig {
            ticks: 5,
            ..small()
        };

        let mut sim = BotSimulation::with_transport(server_config, config, transport).unwrap();
        let stats = sim.run();

        let udp = sim.server().dispatcher().transport().stats();
        assert_eq!(stats.ticks, 5);
        assert!(stats.delivered > 0);
        assert_eq!(udp.packets_sent + udp.send_errors, stats.delivered);
    }
}
