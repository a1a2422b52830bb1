//! # Sync Pipeline Tests
//!
//! End to end: stat write → outbox → dispatcher → serializer → transport.
//! Packets are read back off the recording transport.
//!
//! Run with: cargo test --package meadow_server --test sync_pipeline_test

use std::net::SocketAddr;

use meadow_server::{
    ClientRegistry, ConnectionId, Delivery, Dispatcher, GameServer, MemoryTransport, NetworkEvent,
    Outbox, OwnerId, PacketSerializer, Player, ServerConfig, WorldRegistry,
};
use meadow_shared::{PacketType, Vec2, WeaponVariant, MAX_HEALTH, STAT_FORMAT_FLAG};

// ============================================================================
// HELPERS
// ============================================================================

struct Harness {
    world: WorldRegistry,
    outbox: Outbox,
    dispatcher: Dispatcher<PacketSerializer, MemoryTransport>,
}

impl Harness {
    fn new() -> Self {
        Self {
            world: WorldRegistry::new(8),
            outbox: Outbox::new(),
            dispatcher: Dispatcher::new(PacketSerializer::new(), MemoryTransport::new()),
        }
    }

    fn connect(&mut self, port: u16, owner: &str) -> ConnectionId {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        self.world.clients_mut().connect(addr, owner.into(), 0).unwrap()
    }

    fn spawn(&mut self, id: u32, owner: &str, client: Option<ConnectionId>) {
        let mut player = Player::new(id, owner, Vec2::ZERO);
        player.client = client;
        self.world.add_player(player).unwrap();
    }

    fn flush(&mut self) -> Vec<(ConnectionId, Vec<u8>)> {
        self.dispatcher.flush(&self.outbox, self.world.clients_mut());
        self.dispatcher
            .transport_mut()
            .take_sent()
            .into_iter()
            .map(|p| (p.to, p.bytes))
            .collect()
    }
}

/// Decodes an `UpdateStats` payload into (name, value, format).
fn decode_stat(bytes: &[u8]) -> (String, u32, u8) {
    assert_eq!(bytes[0], PacketType::UpdateStats as u8);
    let len = bytes[1] as usize;
    let name = String::from_utf8(bytes[2..2 + len].to_vec()).unwrap();
    let value = u32::from_le_bytes(bytes[2 + len..6 + len].try_into().unwrap());
    (name, value, bytes[6 + len])
}

/// Decodes a `HealthUpdate` payload into (player, health).
fn decode_health(bytes: &[u8]) -> (u32, i32) {
    assert_eq!(bytes[0], PacketType::HealthUpdate as u8);
    (
        u32::from_le_bytes(bytes[1..5].try_into().unwrap()),
        i32::from_le_bytes(bytes[5..9].try_into().unwrap()),
    )
}

// ============================================================================
// PRIVATE STATS
// ============================================================================

#[test]
fn test_private_stat_reaches_owner_only() {
    let mut h = Harness::new();
    let owner = h.connect(1, "a");
    let other = h.connect(2, "b");
    h.spawn(1, "a", Some(owner));
    h.spawn(2, "b", Some(other));

    let delivery = h.world.writer(1, &h.outbox).unwrap().set_wood(75);
    assert_eq!(delivery, Delivery::Queued);

    let sent = h.flush();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, owner);
    assert_eq!(decode_stat(&sent[0].1), ("wood".to_owned(), 75, STAT_FORMAT_FLAG));
}

#[test]
fn test_private_stat_without_connection_is_silent() {
    let mut h = Harness::new();
    h.spawn(1, "a", None);

    let mut writer = h.world.writer(1, &h.outbox).unwrap();
    assert_eq!(writer.set_food(10), Delivery::NoConnection);
    assert_eq!(writer.set_points(3), Delivery::NoConnection);
    // The value is stored regardless
    assert_eq!(writer.food(), 10);

    assert!(h.outbox.is_empty());
    assert!(h.flush().is_empty());
}

#[test]
fn test_same_value_write_still_sends() {
    let mut h = Harness::new();
    let owner = h.connect(1, "a");
    h.spawn(1, "a", Some(owner));

    let mut writer = h.world.writer(1, &h.outbox).unwrap();
    writer.set_stone(5);
    writer.set_stone(5);

    let sent = h.flush();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(_, b)| decode_stat(b) == ("stone".to_owned(), 5, 1)));
}

#[test]
fn test_writes_delivered_in_write_order() {
    let mut h = Harness::new();
    let owner = h.connect(1, "a");
    h.spawn(1, "a", Some(owner));

    {
        let mut writer = h.world.writer(1, &h.outbox).unwrap();
        for value in [3, 1, 4, 1, 5] {
            writer.set_points(value);
        }
        writer.set_health(40);
        writer.set_food(9);
    }

    let sent = h.flush();
    let order: Vec<String> = sent
        .iter()
        .map(|(_, b)| match PacketType::from_u8(b[0]).unwrap() {
            PacketType::UpdateStats => {
                let (name, value, _) = decode_stat(b);
                format!("{name}={value}")
            }
            PacketType::HealthUpdate => format!("health={}", decode_health(b).1),
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(
        order,
        vec!["points=3", "points=1", "points=4", "points=1", "points=5", "health=40", "food=9"]
    );
}

// ============================================================================
// HEALTH
// ============================================================================

#[test]
fn test_health_broadcast_to_every_connection() {
    let mut h = Harness::new();
    let a = h.connect(1, "a");
    let b = h.connect(2, "b");
    let c = h.connect(3, "c");
    h.spawn(1, "a", Some(a));
    h.spawn(2, "b", Some(b));

    // Same as the current value; still one event per connection
    let queued = h.world.writer(2, &h.outbox).unwrap().set_health(MAX_HEALTH);
    assert_eq!(queued, 3);

    let sent = h.flush();
    let mut receivers: Vec<ConnectionId> = sent.iter().map(|(to, _)| *to).collect();
    receivers.sort();
    assert_eq!(receivers, vec![a, b, c]);
    assert!(sent.iter().all(|(_, bytes)| decode_health(bytes) == (2, MAX_HEALTH)));
}

#[test]
fn test_health_clamped_before_broadcast() {
    let mut h = Harness::new();
    let a = h.connect(1, "a");
    h.spawn(1, "a", Some(a));

    let mut writer = h.world.writer(1, &h.outbox).unwrap();
    writer.set_health(-30);
    assert_eq!(writer.health(), 0);
    writer.set_health(500);
    assert_eq!(writer.health(), MAX_HEALTH);

    let values: Vec<i32> = h.flush().iter().map(|(_, b)| decode_health(b).1).collect();
    assert_eq!(values, vec![0, MAX_HEALTH]);
}

#[test]
fn test_health_broadcast_skips_closing_connection() {
    let mut h = Harness::new();
    let a = h.connect(1, "a");
    let b = h.connect(2, "b");
    let c = h.connect(3, "c");
    h.spawn(1, "a", Some(a));
    h.world.clients_mut().close(b);

    assert_eq!(h.world.writer(1, &h.outbox).unwrap().set_health(60), 2);

    let receivers: Vec<ConnectionId> = h.flush().iter().map(|(to, _)| *to).collect();
    assert_eq!(receivers, vec![a, c]);
}

#[test]
fn test_health_with_no_connections() {
    let mut h = Harness::new();
    h.spawn(1, "a", None);
    assert_eq!(h.world.writer(1, &h.outbox).unwrap().set_health(50), 0);
    assert!(h.flush().is_empty());
}

// ============================================================================
// DEATH
// ============================================================================

#[test]
fn test_die_is_idempotent_but_notifies_each_call() {
    let mut h = Harness::new();
    let owner = h.connect(1, "a");
    let other = h.connect(2, "b");
    h.spawn(1, "a", Some(owner));
    h.spawn(2, "b", Some(other));

    {
        let mut writer = h.world.writer(1, &h.outbox).unwrap();
        writer.kills = 7;
        writer.weapon = Some(3);
        writer.weapon_variant = WeaponVariant::Ruby;
        writer.build_item = Some(2);
        writer.auto_attack_on = true;
        writer.disable_rotation = true;
        writer.move_toward(1.0);

        for _ in 0..3 {
            assert_eq!(writer.die(), Delivery::Queued);
            assert!(writer.is_dead());
            assert_eq!(writer.kills, 0);
            assert_eq!(writer.weapon, None);
            assert_eq!(writer.weapon_variant, WeaponVariant::Normal);
            assert_eq!(writer.build_item, None);
            assert!(!writer.auto_attack_on);
            assert!(!writer.disable_rotation);
            assert_eq!(writer.move_direction, None);
        }
    }

    let sent = h.flush();
    assert_eq!(sent.len(), 3);
    assert!(sent
        .iter()
        .all(|(to, bytes)| *to == owner && bytes.as_slice() == [PacketType::Death as u8]));
}

#[test]
fn test_respawn_broadcasts_full_health() {
    let mut h = Harness::new();
    let owner = h.connect(1, "a");
    let other = h.connect(2, "b");
    h.spawn(1, "a", Some(owner));

    let mut writer = h.world.writer(1, &h.outbox).unwrap();
    writer.set_wood(40);
    writer.set_health(0);
    writer.die();
    assert!(writer.respawn(Vec2::new(100.0, 200.0)));
    assert!(!writer.respawn(Vec2::ZERO));
    assert_eq!(writer.wood(), 40);
    assert_eq!(writer.health(), MAX_HEALTH);

    let sent = h.flush();
    let last_two: Vec<(ConnectionId, (u32, i32))> = sent[sent.len() - 2..]
        .iter()
        .map(|(to, b)| (*to, decode_health(b)))
        .collect();
    assert_eq!(last_two, vec![(owner, (1, MAX_HEALTH)), (other, (1, MAX_HEALTH))]);
}

// ============================================================================
// CONNECTION CHURN
// ============================================================================

#[test]
fn test_event_dropped_when_connection_closes_before_flush() {
    let mut h = Harness::new();
    let owner = h.connect(1, "a");
    h.spawn(1, "a", Some(owner));

    h.world.writer(1, &h.outbox).unwrap().set_wood(1);
    h.world.clients_mut().close(owner);

    let stats = h.dispatcher.flush(&h.outbox, h.world.clients_mut());
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.delivered, 0);
    assert!(h.dispatcher.transport().sent().is_empty());
}

#[test]
fn test_event_not_delivered_to_next_occupant_of_slot() {
    let mut h = Harness::new();
    let alice = h.connect(1, "alice");
    h.spawn(1, "alice", Some(alice));

    h.world.writer(1, &h.outbox).unwrap().set_wood(999);
    h.world.clients_mut().disconnect(alice);
    let bob = h.connect(2, "bob");
    assert_eq!(bob.index(), alice.index());
    assert_ne!(bob, alice);

    let stats = h.dispatcher.flush(&h.outbox, h.world.clients_mut());
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.delivered, 0);
    assert_eq!(h.dispatcher.transport().sent_to(bob).count(), 0);
}

fn server() -> GameServer<PacketSerializer, MemoryTransport> {
    GameServer::new(ServerConfig::default(), PacketSerializer::new(), MemoryTransport::new())
}

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[test]
fn test_server_churn_keeps_private_stats_with_owner() {
    let mut server = server();
    let alice = server.connect(addr(1), OwnerId::from("alice")).unwrap();
    server.spawn_player(Player::new(1, "alice", Vec2::ZERO).with_client(alice)).unwrap();
    server.tick();
    server.dispatcher_mut().transport_mut().take_sent();

    server.with_player(1, |p| p.set_wood(999));
    let events = server.event_sender();
    events.send(NetworkEvent::ClientDisconnected(alice)).unwrap();
    events
        .send(NetworkEvent::ClientConnected {
            addr: addr(2),
            owner_id: OwnerId::from("bob"),
        })
        .unwrap();

    let report = server.tick();
    assert_eq!(report.events, 2);
    assert_eq!(report.dispatch.dropped, 1);
    assert_eq!(report.dispatch.delivered, 0);

    let bob = server.world().read().clients().find_by_addr(addr(2)).unwrap();
    assert_eq!(bob.index(), alice.index());
    assert!(server.dispatcher().transport().sent_to(bob).next().is_none());
}

#[test]
fn test_reconnect_resumes_delivery_on_new_connection() {
    let mut server = server();
    let first = server.connect(addr(1), OwnerId::from("alice")).unwrap();
    server.spawn_player(Player::new(1, "alice", Vec2::ZERO).with_client(first)).unwrap();
    server.tick();

    assert!(server.disconnect(first));
    assert_eq!(server.with_player(1, |p| p.set_wood(5)), Some(Delivery::NoConnection));

    let second = server.connect(addr(2), OwnerId::from("alice")).unwrap();
    server.dispatcher_mut().transport_mut().take_sent();
    assert_eq!(server.with_player(1, |p| p.set_wood(6)), Some(Delivery::Queued));
    server.tick();

    let transport = server.dispatcher().transport();
    assert!(transport.sent_to(first).next().is_none());
    let stats: Vec<(String, u32, u8)> = transport
        .sent_to(second)
        .filter(|bytes| bytes[0] == PacketType::UpdateStats as u8)
        .map(decode_stat)
        .collect();
    assert_eq!(stats, vec![("wood".to_owned(), 6, STAT_FORMAT_FLAG)]);
}

#[test]
fn test_registry_counts_messages() {
    let mut clients = ClientRegistry::new(2);
    let id = clients
        .connect(SocketAddr::from(([127, 0, 0, 1], 1)), "a".into(), 0)
        .unwrap();
    let outbox = Outbox::new();
    let mut dispatcher = Dispatcher::new(PacketSerializer::new(), MemoryTransport::new());

    let mut player = Player::new(1, "a", Vec2::ZERO).with_client(id);
    let sync = meadow_server::SyncContext::new(&outbox, &clients);
    player.set_food(1, sync);
    player.set_health(50, sync);

    dispatcher.flush(&outbox, &mut clients);
    assert_eq!(clients.get(id).unwrap().messages_sent, 2);
    assert_eq!(dispatcher.totals().delivered, 2);
}
