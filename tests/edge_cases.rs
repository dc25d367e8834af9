//! Edge case and boundary condition tests for the gateway core

use ir_trainz::hal::{MockDelay, MockTransmitter};
use ir_trainz::parsing::{split_cmd_path, to_int};
use ir_trainz::registry::NoopHandler;
use ir_trainz::{
    CommandRouter, GatewayCommand, IrEncoder, IrFunction, LocoAddress, LocoRecord, LocoRegistry,
    RouterAction, SpeedCode, ThrottleProtocol,
};

fn encoder() -> IrEncoder<MockTransmitter, MockDelay> {
    IrEncoder::new(MockTransmitter::new(), MockDelay::new())
}

fn reply(protocol: &mut ThrottleProtocol, line: &str) -> String {
    let mut out = String::new();
    protocol.handle_line(line.as_bytes(), &mut out);
    out
}

// ============================================================================
// Channels without an IR family
// ============================================================================

#[test]
fn channels_i_and_j_transmit_nothing() {
    let mut enc = encoder();
    for address in [LocoAddress::I, LocoAddress::J] {
        enc.send(address, IrFunction::Forward.raw()).unwrap();
        enc.set_speed(address, 2).unwrap();
        enc.toggle_sound_light(address, IrFunction::Light).unwrap();
    }
    assert!(enc.transmitter().frames.is_empty());
    assert!(enc.delay().delays_ms.is_empty());
}

#[test]
fn router_on_channel_i_selects_but_sends_nothing() {
    let mut router = CommandRouter::default();
    let mut enc = encoder();
    let action = router
        .dispatch(&mut enc, &GatewayCommand::new("I", "speed", "2"))
        .unwrap();
    assert_eq!(action, RouterAction::Speed(2));
    assert_eq!(router.current_address(), LocoAddress::I);
    assert!(enc.transmitter().frames.is_empty());
}

// ============================================================================
// Boundary Value Tests
// ============================================================================

#[test]
fn speed_outside_three_steps_is_stop() {
    for speed in [4, -4, i32::MAX, i32::MIN] {
        let mut enc = encoder();
        enc.set_speed(LocoAddress::A, speed).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 1, "speed {speed}");
    }
}

#[test]
fn invalid_function_byte_is_dropped() {
    let mut enc = encoder();
    enc.send(LocoAddress::A, 7).unwrap();
    enc.send(LocoAddress::D, 0xff).unwrap();
    assert!(enc.transmitter().frames.is_empty());
}

#[test]
fn to_int_edge_cases() {
    assert_eq!(to_int("   7"), 7);
    assert_eq!(to_int("--1"), 0);
    assert_eq!(to_int("+-1"), 0);
    assert_eq!(to_int("-0"), 0);
    assert_eq!(to_int("2147483648"), i32::MAX);
}

#[test]
fn huge_speed_argument_stops() {
    let mut router = CommandRouter::default();
    let mut enc = encoder();
    router
        .dispatch(&mut enc, &GatewayCommand::new("G", "speed", "99999999999"))
        .unwrap();
    assert_eq!(enc.transmitter().frames.len(), 1);
    assert_eq!(enc.state().gh_last(LocoAddress::G), Some(SpeedCode::Stop.raw()));
}

#[test]
fn path_split_rejects_empty_and_long() {
    assert_eq!(split_cmd_path(&[]), None);
    assert_eq!(split_cmd_path(&["A", "speed", "1", "x"]), None);
    // Lower-case first segment is a command, not a channel
    assert_eq!(split_cmd_path(&["light", "x"]), Some(("", "light", "x")));
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn duplicate_addresses_first_match_wins() {
    let mut registry = LocoRegistry::new();
    registry.add_loco(LocoRecord::new(3, Box::new(NoopHandler)));
    registry.add_loco(LocoRecord::new(3, Box::new(NoopHandler)).with_long_address(true));
    assert_eq!(registry.len(), 2);
    assert!(!registry.find_by_address(3).unwrap().long_address);

    let mut protocol = ThrottleProtocol::new(registry);
    reply(&mut protocol, "M1AS3<;>V10");
    let speeds: Vec<u8> = protocol.registry().iter().map(|l| l.state.speed).collect();
    assert_eq!(speeds, vec![10, 0]);
}

#[test]
fn non_positive_addresses_never_match() {
    let mut registry = LocoRegistry::new();
    registry.add_loco(LocoRecord::new(0, Box::new(NoopHandler)));
    assert!(registry.find_by_address(0).is_none());
    assert!(registry.find_by_address(-1).is_none());
}

// ============================================================================
// Throttle lines
// ============================================================================

fn one_loco() -> ThrottleProtocol {
    let mut registry = LocoRegistry::new();
    registry.add_loco(LocoRecord::new(1, Box::new(NoopHandler)));
    ThrottleProtocol::new(registry)
}

#[test]
fn function_index_above_27_is_ignored() {
    let mut p = one_loco();
    assert_eq!(reply(&mut p, "M1AS1<;>F128"), "");
    assert_eq!(reply(&mut p, "M1AS1<;>F127"), "M1AS1<;>F127\n");
    assert_eq!(p.registry().iter().next().unwrap().state.function_mask, 1 << 27);
}

#[test]
fn speed_is_clamped_to_126() {
    let mut p = one_loco();
    assert_eq!(reply(&mut p, "M1AS1<;>V999"), "M1AS1<;>V126\n");
    assert_eq!(reply(&mut p, "M1AS1<;>V"), "M1AS1<;>V0\n");
}

#[test]
fn empty_and_truncated_lines_are_ignored() {
    let mut p = one_loco();
    for line in ["", "\r\n", "M", "M1", "M1A", "P", "PP", "MTAX1<;>V5"] {
        assert_eq!(reply(&mut p, line), "", "{line:?}");
    }
    assert!(!p.track_power());
}

#[test]
fn action_without_separator_is_ignored() {
    let mut p = one_loco();
    assert_eq!(reply(&mut p, "M1AS1V10"), "");
    assert_eq!(p.registry().iter().next().unwrap().state.speed, 0);
}
