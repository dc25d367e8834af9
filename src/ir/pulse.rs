//! Pulse-train framing for each protocol family.
//!
//! Every frame is a list of alternating mark/space durations in
//! microseconds, starting with a mark. Builders here are pure; the
//! [`IrEncoder`](super::IrEncoder) decides what to send and when.

use heapless::Vec;

/// Upper bound on slots in any frame.
pub const MAX_FRAME_SLOTS: usize = 35;

/// One transmit buffer of mark/space durations (µs).
pub type PulseSequence = Vec<u16, MAX_FRAME_SLOTS>;

// ============================================================================
// Timing constants
// ============================================================================

/// Long cell half for AB/CD bits.
pub const BIT_LONG_US: u16 = 1700;
/// Short cell half for AB/CD bits.
pub const BIT_SHORT_US: u16 = 600;

/// AB lead-in mark.
pub const AB_LEAD_US: u16 = 20000;
/// AB space between the high and low byte.
pub const AB_GAP_US: u16 = 45000;
/// AB trailing mark.
pub const AB_TRAILER_US: u16 = 20000;

/// CD lead-in mark.
pub const CD_LEAD_US: u16 = 5400;
/// CD space between the two copies of a frame.
pub const CD_GAP_US: u16 = 10000;
/// Slots in one CD frame (lead plus 8 bit cells).
pub const CD_FRAME_SLOTS: usize = 17;

/// GH lead-in mark.
pub const GH_LEAD_US: u16 = 4100;
/// GH mark for a one bit.
pub const GH_ONE_US: u16 = 1500;
/// GH short slot (zero mark and every space).
pub const GH_SHORT_US: u16 = 550;
/// GH stop marker replacing the last space.
pub const GH_STOP_US: u16 = 1700;
/// Slots in a GH frame (lead plus 14 bit cells).
pub const GH_FRAME_SLOTS: usize = 29;

/// Cells read as a one when their first slot exceeds this.
const DECODE_THRESHOLD_US: u16 = 1000;

#[inline]
fn push(seq: &mut PulseSequence, duration: u16) {
    // Every builder stays within MAX_FRAME_SLOTS.
    let _ = seq.push(duration);
}

fn push_byte(seq: &mut PulseSequence, byte: u8) {
    for bit in (0..8).rev() {
        if byte & (1 << bit) != 0 {
            push(seq, BIT_LONG_US);
            push(seq, BIT_SHORT_US);
        } else {
            push(seq, BIT_SHORT_US);
            push(seq, BIT_LONG_US);
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Frame a 16-bit AB code: lead, high byte, gap, low byte, trailer.
///
/// ```
/// use ir_trainz::ir::pulse::{ab_frame, AB_GAP_US, AB_LEAD_US};
///
/// let frame = ab_frame(0x2121);
/// assert_eq!(frame.len(), 35);
/// assert_eq!(frame[0], AB_LEAD_US);
/// assert_eq!(frame[17], AB_GAP_US);
/// ```
pub fn ab_frame(code: u16) -> PulseSequence {
    let mut seq = PulseSequence::new();
    push(&mut seq, AB_LEAD_US);
    push_byte(&mut seq, (code >> 8) as u8);
    push(&mut seq, AB_GAP_US);
    push_byte(&mut seq, (code & 0xff) as u8);
    push(&mut seq, AB_TRAILER_US);
    seq
}

/// Frame a CD command byte, sent twice around a gap.
pub fn cd_frame(command: u8) -> PulseSequence {
    let mut seq = PulseSequence::new();
    push(&mut seq, CD_LEAD_US);
    push_byte(&mut seq, command);
    push(&mut seq, CD_GAP_US);
    push(&mut seq, CD_LEAD_US);
    push_byte(&mut seq, command);
    seq
}

/// Build the 14-bit GH payload: semantic bits above their complement.
///
/// ```
/// use ir_trainz::ir::pulse::gh_payload;
///
/// assert_eq!(gh_payload(0b011_1000), 0b011_1000_100_0111);
/// ```
#[inline]
pub const fn gh_payload(semantic: u8) -> u16 {
    let semantic = (semantic & 0x7f) as u16;
    (semantic << 7) | (!semantic & 0x7f)
}

/// True when the low 7 bits of `payload` complement the upper 7.
#[inline]
pub const fn gh_payload_valid(payload: u16) -> bool {
    let semantic = (payload >> 7) & 0x7f;
    (payload & 0x7f) == (!semantic & 0x7f)
}

/// Frame a 14-bit GH payload.
pub fn gh_frame(payload: u16) -> PulseSequence {
    let mut seq = PulseSequence::new();
    push(&mut seq, GH_LEAD_US);
    for bit in (0..14).rev() {
        if payload & (1 << bit) != 0 {
            push(&mut seq, GH_ONE_US);
        } else {
            push(&mut seq, GH_SHORT_US);
        }
        push(&mut seq, GH_SHORT_US);
    }
    if let Some(last) = seq.last_mut() {
        *last = GH_STOP_US;
    }
    seq
}

// ============================================================================
// Decoders
// ============================================================================

fn read_byte(cells: &[u16]) -> u8 {
    cells
        .chunks_exact(2)
        .take(8)
        .fold(0u8, |acc, cell| (acc << 1) | u8::from(cell[0] > DECODE_THRESHOLD_US))
}

/// Recover the 16-bit code from an AB frame.
pub fn decode_ab_frame(frame: &[u16]) -> Option<u16> {
    if frame.len() != MAX_FRAME_SLOTS || frame[0] != AB_LEAD_US || frame[17] != AB_GAP_US {
        return None;
    }
    let high = read_byte(&frame[1..17]);
    let low = read_byte(&frame[18..34]);
    Some(((high as u16) << 8) | low as u16)
}

/// Recover the command byte from a CD frame; both copies must agree.
pub fn decode_cd_frame(frame: &[u16]) -> Option<u8> {
    if frame.len() != MAX_FRAME_SLOTS || frame[0] != CD_LEAD_US || frame[17] != CD_GAP_US {
        return None;
    }
    let first = read_byte(&frame[1..CD_FRAME_SLOTS]);
    let second = read_byte(&frame[CD_FRAME_SLOTS + 2..]);
    (first == second).then_some(first)
}

/// Recover the 14-bit payload from a GH frame.
pub fn decode_gh_frame(frame: &[u16]) -> Option<u16> {
    if frame.len() != GH_FRAME_SLOTS || frame[0] != GH_LEAD_US {
        return None;
    }
    let payload = frame[1..]
        .chunks_exact(2)
        .fold(0u16, |acc, cell| (acc << 1) | u16::from(cell[0] > DECODE_THRESHOLD_US));
    Some(payload)
}
