//! End-to-end scenarios over the in-memory transport.
//!
//! Every vehicle holds a certificate issued by a shared test authority and
//! all engines read the same manual clock. "Radio range" is whatever each
//! test chooses to deliver: frames are drained from one vehicle's outbox
//! and handed to the engines that should hear them.

use std::sync::Arc;
use std::time::Duration;

use vanet_common::{Clock, ManualClock, Timestamp, VehicleId};
use vanet_crypto::{PrivateKey, PublicKey, SignatureAlgorithm, TbsCertificate};
use vanet_routing::protocol::{encode_message, HelloBody, MessageBody, RoutingMessage};
use vanet_routing::{
    ForwardingCounters, MemoryTransport, MessageType, Position, ProtocolConfig, RoutingError,
    SecureRoutingEngine, SendOutcome, VehicleInfo,
};

const T0: u64 = 1_700_000_000_000;
const CA_NAME: &str = "vanet-test-ca";

// ============================================
// Harness
// ============================================

struct Authority {
    name: &'static str,
    key: PrivateKey,
    public: PublicKey,
}

impl Authority {
    fn new(name: &'static str) -> Self {
        let key = PrivateKey::generate(SignatureAlgorithm::Ed25519, 2048).unwrap();
        let public = key.public_key().unwrap();
        Self { name, key, public }
    }

    fn certify(&self, vehicle: &mut SecureRoutingEngine) {
        let tbs = TbsCertificate {
            subject: vehicle.id().as_str().to_string(),
            issuer: self.name.to_string(),
            public_key: vehicle.crypto().public_key().unwrap().clone(),
            valid_from: Timestamp::from_millis(T0 - 3_600_000),
            valid_until: Timestamp::from_millis(T0 + 3_600_000),
        };
        let signature = self.key.sign(&tbs.encode()).unwrap();
        vehicle.install_certificate(tbs.into_certificate(signature)).unwrap();
    }
}

struct Vehicle {
    engine: SecureRoutingEngine,
    radio: MemoryTransport,
}

impl Vehicle {
    fn id(&self) -> VehicleId {
        self.engine.id().clone()
    }
}

fn id(s: &str) -> VehicleId {
    VehicleId::new(s).unwrap()
}

fn new_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Timestamp::from_millis(T0)))
}

fn vehicle_with(name: &str, x: f64, clock: &Arc<ManualClock>, ca: &Authority, trusted: &Authority) -> Vehicle {
    let radio = MemoryTransport::new();
    let mut engine = SecureRoutingEngine::new(
        id(name),
        ProtocolConfig::default(),
        clock.clone(),
        Box::new(radio.clone()),
    )
    .unwrap();
    engine
        .initialize_vehicle(VehicleInfo::new(id(name), Position::new(x, 0.0, 0.0, clock.now())))
        .unwrap();
    ca.certify(&mut engine);
    engine
        .crypto_mut()
        .add_trust_anchor(trusted.name, trusted.public.clone());
    Vehicle { engine, radio }
}

fn vehicle(name: &str, x: f64, clock: &Arc<ManualClock>, ca: &Authority) -> Vehicle {
    vehicle_with(name, x, clock, ca, ca)
}

/// Drains `from`'s outbox and delivers every frame to each listener whose
/// id it is addressed to (or all of them, for broadcasts).
fn transmit(from: &Vehicle, listeners: &mut [&mut Vehicle]) -> Vec<Result<MessageType, RoutingError>> {
    let mut results = Vec::new();
    for frame in from.radio.take_sent() {
        for listener in listeners.iter_mut() {
            let addressed = match &frame.destination {
                vanet_routing::Destination::Broadcast => true,
                vanet_routing::Destination::Unicast(to) => *to == listener.id(),
            };
            if addressed {
                results.push(listener.engine.receive_message(&frame.bytes));
            }
        }
    }
    results
}

fn beacon(from: &mut Vehicle, listeners: &mut [&mut Vehicle]) {
    from.engine.send_beacon().unwrap();
    for result in transmit(from, listeners) {
        assert_eq!(result.unwrap(), MessageType::Hello);
    }
}

// ============================================
// Scenarios
// ============================================

#[test]
fn test_certified_beacon_then_data_is_delivered() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);

    beacon(&mut a, &mut [&mut b]);
    beacon(&mut b, &mut [&mut a]);

    let neighbor = b.engine.neighbor(&a.id()).unwrap();
    assert_eq!(neighbor.info.certificate, a.engine.crypto().certificate_bytes());
    assert_eq!(a.engine.route(&b.id()).unwrap().hop_count, 1);

    assert_eq!(a.engine.send_data(&b.id(), b"hello").unwrap(), SendOutcome::Sent);
    let results = transmit(&a, &mut [&mut b]);
    assert_eq!(results.len(), 1);
    assert_eq!(*results[0].as_ref().unwrap(), MessageType::Data);

    let delivered = b.engine.take_delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].source, a.id());
    assert_eq!(delivered[0].payload, b"hello");
    assert!(b.engine.take_delivered().is_empty());
}

#[test]
fn test_replayed_data_is_rejected() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);

    beacon(&mut b, &mut [&mut a]);
    a.engine.send_data(&b.id(), b"pay once").unwrap();
    let frame = a.radio.take_sent().pop().unwrap();

    assert_eq!(b.engine.receive_message(&frame.bytes).unwrap(), MessageType::Data);
    assert!(matches!(
        b.engine.receive_message(&frame.bytes),
        Err(RoutingError::VerificationFailure)
    ));
    assert_eq!(b.engine.take_delivered().len(), 1);
    assert_eq!(b.engine.stats().delivered, 1);
}

#[test]
fn test_stale_envelope_is_rejected() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);

    a.engine.send_beacon().unwrap();
    let frame = a.radio.take_sent().pop().unwrap();

    clock.advance(Duration::from_millis(5_001));
    assert!(matches!(
        b.engine.receive_message(&frame.bytes),
        Err(RoutingError::VerificationFailure)
    ));
    assert_eq!(b.engine.crypto().stats().stale, 1);
}

#[test]
fn test_detect_replay() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);

    a.engine.send_beacon().unwrap();
    let frame = a.radio.take_sent().pop().unwrap();

    assert!(!b.engine.detect_replay(&frame.bytes));
    assert!(b.engine.detect_replay(&frame.bytes));
    assert!(b.engine.receive_message(&frame.bytes).is_err());
}

#[test]
fn test_certificate_from_unknown_authority_is_rejected() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let rogue = Authority::new("rogue-ca");
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);
    let mut m = vehicle_with("veh-m", 0.0, &clock, &rogue, &ca);

    m.engine.send_beacon().unwrap();
    let results = transmit(&m, &mut [&mut b]);
    assert!(matches!(results[0], Err(RoutingError::VerificationFailure)));
    assert!(b.engine.neighbor(&m.id()).is_none());
    assert_eq!(b.engine.crypto().stats().bad_certificate, 1);
}

#[test]
fn test_certificate_subject_must_match_sender() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);
    let mut m = vehicle("veh-m", 0.0, &clock, &ca);

    // Valid certificate for veh-m, frame claiming to come from veh-a
    let forged = RoutingMessage::new(
        id("veh-a"),
        VehicleId::broadcast(),
        clock.now(),
        MessageBody::Hello(HelloBody {
            position: Position::new(10.0, 0.0, 0.0, clock.now()),
            speed: 0.0,
            direction: 0.0,
        }),
    );
    let envelope = m
        .engine
        .crypto_mut()
        .create_secure_message(&encode_message(&forged))
        .unwrap();

    assert!(matches!(
        b.engine.receive_message(&envelope.encode()),
        Err(RoutingError::VerificationFailure)
    ));
    assert!(b.engine.neighbor(&id("veh-a")).is_none());
}

#[test]
fn test_install_certificate_rejects_foreign_subject() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);

    let tbs = TbsCertificate {
        subject: "veh-z".to_string(),
        issuer: CA_NAME.to_string(),
        public_key: a.engine.crypto().public_key().unwrap().clone(),
        valid_from: Timestamp::from_millis(T0),
        valid_until: Timestamp::from_millis(T0 + 1_000),
    };
    let signature = ca.key.sign(&tbs.encode()).unwrap();

    let err = a.engine.install_certificate(tbs.into_certificate(signature)).unwrap_err();
    assert!(matches!(err, RoutingError::Crypto(_)));
    assert_eq!(a.engine.crypto().certificate().unwrap().subject(), "veh-a");
}

#[test]
fn test_multi_hop_discovery_and_relay() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut r = vehicle("veh-r", 150.0, &clock, &ca);
    let mut d = vehicle("veh-d", 300.0, &clock, &ca);

    // a <-> r <-> d
    beacon(&mut a, &mut [&mut r]);
    beacon(&mut r, &mut [&mut a, &mut d]);
    beacon(&mut d, &mut [&mut r]);
    assert!(a.engine.route(&d.id()).is_none());

    assert_eq!(
        a.engine.send_data(&d.id(), b"over the hill").unwrap(),
        SendOutcome::RouteDiscoveryStarted
    );
    assert_eq!(a.engine.pending_count(&d.id()), 1);

    // ROUTE_REQUEST reaches r, which knows d directly
    let results = transmit(&a, &mut [&mut r]);
    assert_eq!(*results[0].as_ref().unwrap(), MessageType::RouteRequest);
    assert_eq!(r.engine.stats().route_replies_sent, 1);

    // ROUTE_REPLY installs a -> d via r and flushes the buffered payload
    let results = transmit(&r, &mut [&mut a]);
    assert_eq!(*results[0].as_ref().unwrap(), MessageType::RouteReply);
    let route = a.engine.route(&d.id()).unwrap();
    assert_eq!(route.next_hop, r.id());
    assert_eq!(route.hop_count, 2);
    assert_eq!(a.engine.pending_count(&d.id()), 0);
    assert_eq!(a.engine.stats().data_sent, 1);

    // DATA goes to r, which relays it unchanged
    let results = transmit(&a, &mut [&mut r]);
    assert_eq!(*results[0].as_ref().unwrap(), MessageType::Data);
    assert_eq!(r.engine.stats().relayed, 1);
    assert!(r.engine.take_delivered().is_empty());

    // d receives the relay; a overhears it and credits r
    let relay = r.radio.take_sent().pop().unwrap();
    assert!(matches!(
        a.engine.receive_message(&relay.bytes),
        Err(RoutingError::Loopback)
    ));
    assert_eq!(d.engine.receive_message(&relay.bytes).unwrap(), MessageType::Data);

    let delivered = d.engine.take_delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].source, a.id());
    assert_eq!(delivered[0].payload, b"over the hill");

    assert_eq!(
        a.engine.forwarding_counters(&r.id()),
        ForwardingCounters {
            advertisements: 1,
            handed: 1,
            forwarded: 1,
        }
    );
    assert_eq!(a.engine.stats().forwards_overheard, 1);
    assert!(!a.engine.detect_black_hole(&r.id()));
}

#[test]
fn test_black_hole_is_flagged() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut hole = vehicle("veh-hole", 150.0, &clock, &ca);
    let mut d = vehicle("veh-d", 300.0, &clock, &ca);

    beacon(&mut a, &mut [&mut hole]);
    beacon(&mut hole, &mut [&mut a]);
    beacon(&mut d, &mut [&mut hole]);

    // First advertisement, with the buffered payload handed over
    a.engine.send_data(&d.id(), b"0").unwrap();
    transmit(&a, &mut [&mut hole]);
    transmit(&hole, &mut [&mut a]);

    for i in 1..5u8 {
        assert_eq!(a.engine.send_data(&d.id(), &[i]).unwrap(), SendOutcome::Sent);
    }
    // Two more advertisements
    for _ in 0..2 {
        a.engine.find_route(&d.id()).unwrap();
        transmit(&a, &mut [&mut hole]);
        transmit(&hole, &mut [&mut a]);
    }

    // Everything handed to the hole was swallowed
    let counters = a.engine.forwarding_counters(&hole.id());
    assert_eq!(counters.advertisements, 3);
    assert_eq!(counters.handed, 5);
    assert_eq!(counters.forwarded, 0);

    assert!(a.engine.detect_black_hole(&hole.id()));
    let stored = a.engine.trust_scores()[&hole.id()];
    assert!((a.engine.calculate_trust(&hole.id()) - stored / 2.0).abs() < 1e-12);

    // One more poor observation is enough to stop routing through it
    a.engine.update_trust_score(&hole.id(), 0.9);
    let err = a.engine.send_data(&d.id(), b"blocked").unwrap_err();
    assert!(matches!(err, RoutingError::UntrustedNextHop { .. }));
    assert!(a.engine.route(&d.id()).is_none());
}

#[test]
fn test_sybil_identities_are_penalised() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut observer = vehicle("veh-o", 0.0, &clock, &ca);
    let mut ghost_1 = vehicle("ghost-1", 100.0, &clock, &ca);
    let mut ghost_2 = vehicle("ghost-2", 100.3, &clock, &ca);
    let mut honest = vehicle("veh-h", 300.0, &clock, &ca);

    beacon(&mut ghost_1, &mut [&mut observer]);
    beacon(&mut ghost_2, &mut [&mut observer]);
    beacon(&mut honest, &mut [&mut observer]);

    assert!(observer.engine.detect_sybil(&ghost_1.id()));
    assert!(observer.engine.detect_sybil(&ghost_2.id()));
    assert!(!observer.engine.detect_sybil(&honest.id()));

    let stored = observer.engine.trust_scores()[&ghost_1.id()];
    assert!((observer.engine.calculate_trust(&ghost_1.id()) - stored / 2.0).abs() < 1e-12);
    assert!(
        (observer.engine.calculate_trust(&honest.id()) - observer.engine.trust_scores()[&honest.id()]).abs()
            < 1e-12
    );
}

#[test]
fn test_routes_expire_and_rediscovery_starts() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);

    beacon(&mut b, &mut [&mut a]);
    assert!(a.engine.route(&b.id()).is_some());

    clock.advance(Duration::from_secs(61));
    let report = a.engine.prune_expired_entries();
    assert_eq!(report.routes, 1);
    assert_eq!(report.neighbors, 1);
    assert!(a.engine.prune_expired_entries().is_empty());

    assert_eq!(
        a.engine.send_data(&b.id(), b"still there?").unwrap(),
        SendOutcome::RouteDiscoveryStarted
    );
}

#[test]
fn test_position_ticks_prune_stale_neighbors() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut b = vehicle("veh-b", 50.0, &clock, &ca);

    beacon(&mut b, &mut [&mut a]);
    assert!(a.engine.neighbor(&b.id()).is_some());

    clock.advance(Duration::from_secs(11));
    a.engine
        .update_position(Position::new(110.0, 0.0, 0.0, clock.now()))
        .unwrap();
    assert!(a.engine.neighbor(&b.id()).is_none());
    // Route lives longer than the neighbour entry
    assert!(a.engine.route(&b.id()).is_some());
}

#[test]
fn test_route_error_only_drops_routes_through_reporter() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut r = vehicle("veh-r", 150.0, &clock, &ca);
    let mut d = vehicle("veh-d", 300.0, &clock, &ca);

    beacon(&mut a, &mut [&mut r]);
    beacon(&mut r, &mut [&mut a, &mut d]);
    beacon(&mut d, &mut [&mut r]);

    a.engine.send_data(&d.id(), b"x").unwrap();
    transmit(&a, &mut [&mut r]);
    transmit(&r, &mut [&mut a]);
    a.radio.clear();

    // a stops trusting r: the route is refused and withdrawn
    a.engine.update_trust_score(&r.id(), 0.0);
    a.engine.update_trust_score(&r.id(), 0.0);
    assert!(!a.engine.is_vehicle_trusted(&r.id()));
    assert!(matches!(
        a.engine.send_data(&d.id(), b"y"),
        Err(RoutingError::UntrustedNextHop { .. })
    ));
    assert_eq!(a.engine.stats().route_errors_sent, 1);

    // r's own route to d does not go through a, so it survives
    let results = transmit(&a, &mut [&mut r]);
    assert_eq!(*results[0].as_ref().unwrap(), MessageType::RouteError);
    assert!(r.engine.route(&d.id()).is_some());

    // d tells r it can no longer reach a; r's direct route to a is kept
    // because it does not go through d
    d.engine
        .update_route(&a.id(), vanet_routing::RouteEntry::new(r.id(), 2, clock.now(), 1.0))
        .unwrap();
    assert!(d.engine.invalidate_route(&a.id()).unwrap());
    transmit(&d, &mut [&mut r]);
    assert!(r.engine.route(&a.id()).is_some());

    // d loses veh-x, which r reaches through d
    r.engine
        .update_route(&id("veh-x"), vanet_routing::RouteEntry::new(d.id(), 2, clock.now(), 1.0))
        .unwrap();
    d.engine
        .update_route(&id("veh-x"), vanet_routing::RouteEntry::new(id("veh-y"), 1, clock.now(), 1.0))
        .unwrap();
    assert!(d.engine.invalidate_route(&id("veh-x")).unwrap());
    transmit(&d, &mut [&mut r]);
    assert!(r.engine.route(&id("veh-x")).is_none());
}

#[test]
fn test_parked_vehicle_stays_a_trusted_neighbor() {
    let clock = new_clock();
    let ca = Authority::new(CA_NAME);
    let mut a = vehicle("veh-a", 0.0, &clock, &ca);
    let mut parked = vehicle("veh-p", 30.0, &clock, &ca);

    for _ in 0..10 {
        beacon(&mut parked, &mut [&mut a]);
        clock.advance(Duration::from_secs(2));
        a.engine.prune_expired_entries();
        assert!(a.engine.neighbor(&parked.id()).is_some());
        assert!(a.engine.is_vehicle_trusted(&parked.id()));
    }
    assert_eq!(a.engine.stats().falsified_positions, 0);
}
