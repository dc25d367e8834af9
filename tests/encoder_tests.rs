//! Integration tests for the IR encoder.
//!
//! Frames are decoded back from the recorded pulse trains, and the mock
//! delay doubles as a record of how long each call blocks.

use ir_trainz::hal::{MockDelay, MockTransmitter};
use ir_trainz::ir::encoder::{
    BURST_INTERVAL_MS, INTER_COMMAND_GAP_MS, KEEPALIVE_INTERVAL_MS, KEEPALIVE_REPEATS, SETTLE_MS,
};
use ir_trainz::ir::pulse::{
    decode_ab_frame, decode_cd_frame, decode_gh_frame, gh_frame, gh_payload, gh_payload_valid,
    GH_FRAME_SLOTS,
};
use ir_trainz::{IrEncoder, IrFunction, LocoAddress, SpeedCode};

fn encoder() -> IrEncoder<MockTransmitter, MockDelay> {
    IrEncoder::new(MockTransmitter::new(), MockDelay::new())
}

fn gh_semantics(enc: &IrEncoder<MockTransmitter, MockDelay>) -> Vec<u8> {
    enc.transmitter()
        .frames
        .iter()
        .map(|f| (decode_gh_frame(f).unwrap() >> 7) as u8)
        .collect()
}

// ============================================================================
// Toggle alternation
// ============================================================================

#[test]
fn ab_repeats_alternate_between_code_pair() {
    let mut enc = encoder();
    for _ in 0..4 {
        enc.send(LocoAddress::B, IrFunction::Sound1.raw()).unwrap();
    }
    let codes: Vec<u16> = enc
        .transmitter()
        .frames
        .iter()
        .map(|f| decode_ab_frame(f).unwrap())
        .collect();
    assert_eq!(codes, vec![0x3232, 0xb2b2, 0x3232, 0xb2b2]);
}

#[test]
fn changing_address_resets_toggle() {
    let mut enc = encoder();
    enc.send(LocoAddress::A, IrFunction::Stop.raw()).unwrap();
    enc.send(LocoAddress::B, IrFunction::Stop.raw()).unwrap();
    enc.send(LocoAddress::A, IrFunction::Stop.raw()).unwrap();
    let codes: Vec<u16> = enc
        .transmitter()
        .frames
        .iter()
        .map(|f| decode_ab_frame(f).unwrap())
        .collect();
    assert_eq!(codes, vec![0x0101, 0x0202, 0x0101]);
}

#[test]
fn cd_toggle_is_high_bit() {
    let mut enc = encoder();
    enc.send(LocoAddress::C, IrFunction::Light.raw()).unwrap();
    enc.send(LocoAddress::C, IrFunction::Light.raw()).unwrap();
    enc.send(LocoAddress::C, IrFunction::Backward.raw()).unwrap();
    let bytes: Vec<u8> = enc
        .transmitter()
        .frames
        .iter()
        .map(|f| decode_cd_frame(f).unwrap())
        .collect();
    assert_eq!(bytes, vec![0x65, 0xe5, 0x15]);
}

// ============================================================================
// Speed
// ============================================================================

#[test]
fn ab_cd_speed_emits_stop_then_steps() {
    for (address, speed, expected) in [
        (LocoAddress::A, 0, 1),
        (LocoAddress::A, 3, 4),
        (LocoAddress::D, -2, 3),
        (LocoAddress::C, 9, 1),
    ] {
        let mut enc = encoder();
        enc.set_speed(address, speed).unwrap();
        assert_eq!(
            enc.transmitter().frames.len(),
            expected,
            "{:?} at {}",
            address,
            speed
        );
    }
}

#[test]
fn backward_steps_use_backward_code() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::D, -2).unwrap();
    let bytes: Vec<u8> = enc
        .transmitter()
        .frames
        .iter()
        .map(|f| decode_cd_frame(f).unwrap())
        .collect();
    // Stop, Backward, Backward (toggled)
    assert_eq!(bytes, vec![0x0a, 0x1a, 0x9a]);
}

#[test]
fn gh_speed_is_one_frame_and_out_of_range_stops() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::G, 2).unwrap();
    assert_eq!(enc.transmitter().frames.len(), 1);

    let mut a = encoder();
    let mut b = encoder();
    a.set_speed(LocoAddress::H, 7).unwrap();
    b.set_speed(LocoAddress::H, 0).unwrap();
    assert_eq!(a.transmitter().frames, b.transmitter().frames);
    assert_eq!(a.state().gh_last(LocoAddress::H), Some(SpeedCode::Stop.raw()));
}

// ============================================================================
// Timing contract
// ============================================================================

#[test]
fn ab_and_cd_block_for_settle_and_gap() {
    let mut enc = encoder();
    enc.send(LocoAddress::A, IrFunction::Forward.raw()).unwrap();
    enc.send(LocoAddress::C, IrFunction::Forward.raw()).unwrap();
    assert_eq!(
        enc.delay().delays_ms,
        vec![SETTLE_MS, INTER_COMMAND_GAP_MS, SETTLE_MS, INTER_COMMAND_GAP_MS]
    );
}

#[test]
fn gh_blocks_for_settle_only() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::G, 1).unwrap();
    assert_eq!(enc.delay().delays_ms, vec![SETTLE_MS]);
}

#[test]
fn set_speed_three_on_ab_blocks_four_frames() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::B, 3).unwrap();
    assert_eq!(
        enc.delay().total_ms(),
        4 * u64::from(SETTLE_MS + INTER_COMMAND_GAP_MS)
    );
}

// ============================================================================
// GH repeats
// ============================================================================

#[test]
fn function_burst_then_trailing_drive_repeats() {
    let mut enc = encoder();
    enc.toggle_sound_light(LocoAddress::G, IrFunction::Sound2).unwrap();

    for now in [10, 20, 40, 60, 80, 100, 120, 140] {
        enc.update(now).unwrap();
    }

    // 0x74 = stop nibble + Sound2 (semantic function 3); 0x70 = stop only
    let with_sound = (7 << 3) | 3;
    let drive = 7 << 3;
    assert_eq!(
        gh_semantics(&enc),
        vec![with_sound, with_sound, with_sound, with_sound, drive, drive]
    );
    assert!(!enc.state().repeat.is_active());
}

#[test]
fn speed_keepalive_repeats_ten_times() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::H, 1).unwrap();
    for i in 1..=(u32::from(KEEPALIVE_REPEATS) + 3) {
        enc.update(i * KEEPALIVE_INTERVAL_MS).unwrap();
    }
    assert_eq!(
        enc.transmitter().frames.len(),
        1 + usize::from(KEEPALIVE_REPEATS)
    );
    let h_forward1 = (1 << 6) | (1 << 3);
    assert!(gh_semantics(&enc).iter().all(|&s| s == h_forward1));
}

#[test]
fn speed_change_drains_pending_burst() {
    let mut enc = encoder();
    enc.toggle_sound_light(LocoAddress::G, IrFunction::Light).unwrap();
    enc.set_speed(LocoAddress::G, 3).unwrap();

    // light frame, three drained repeats, then the speed frame
    assert_eq!(enc.transmitter().frames.len(), 5);
    let waits: Vec<u32> = enc
        .delay()
        .delays_ms
        .iter()
        .copied()
        .filter(|&d| d == BURST_INTERVAL_MS)
        .collect();
    assert_eq!(waits.len(), 3);
    assert_eq!(gh_semantics(&enc).last(), Some(&(3 << 3)));
}

#[test]
fn function_keeps_current_speed_nibble() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::G, 2).unwrap();
    enc.toggle_sound_light(LocoAddress::G, IrFunction::Sound1).unwrap();
    assert_eq!(gh_semantics(&enc)[1], (2 << 3) | 1);
}

#[test]
fn update_survives_clock_wrap() {
    let mut enc = encoder();
    enc.update(u32::MAX - 50).unwrap();
    enc.set_speed(LocoAddress::G, 1).unwrap();
    enc.update(u32::MAX).unwrap();
    assert_eq!(enc.transmitter().frames.len(), 1);
    // 50 ms before the wrap plus 150 after
    enc.update(150).unwrap();
    assert_eq!(enc.transmitter().frames.len(), 2);
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn gh_max_forward_round_trip() {
    let mut enc = encoder();
    enc.set_speed(LocoAddress::G, 3).unwrap();

    let frame = &enc.transmitter().frames[0];
    assert_eq!(frame.len(), GH_FRAME_SLOTS);

    // channel G, speed nibble 3, no function
    let semantic = 3 << 3;
    let payload = decode_gh_frame(frame).unwrap();
    assert_eq!(payload, gh_payload(semantic));
    assert!(gh_payload_valid(payload));
    assert_eq!(gh_frame(payload).as_slice(), frame.as_slice());
}
