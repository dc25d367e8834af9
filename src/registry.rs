//! Loco registry shared by the throttle protocol.
//!
//! Each [`LocoRecord`] couples the state a throttle client sees (speed,
//! direction, function mask) with a [`LocoHandler`] that turns changes
//! into real-world actions. A [`LocoFactory`] may supply records on demand
//! when a client acquires an address the registry does not know yet.

use alloc::boxed::Box;
use alloc::vec::Vec;

/// Speed, direction and function state of one loco.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocoState {
    /// Direction, `true` = forward.
    pub forward: bool,
    /// Speed 0..=126.
    pub speed: u8,
    /// Bit `n` set when function `n` is on.
    pub function_mask: u32,
}

impl Default for LocoState {
    fn default() -> Self {
        Self {
            forward: true,
            speed: 0,
            function_mask: 0,
        }
    }
}

impl LocoState {
    /// True if function `index` (0..=31) is on.
    pub fn function(&self, index: u8) -> bool {
        index < 32 && self.function_mask & (1 << index) != 0
    }

    /// Flip function `index` (0..=31).
    pub fn toggle_function(&mut self, index: u8) {
        if index < 32 {
            self.function_mask ^= 1 << index;
        }
    }
}

/// Reacts to throttle changes on one loco.
///
/// Handlers run before the registry stores the new speed or direction, so
/// `state` still holds the previous values.
pub trait LocoHandler {
    /// Speed or direction changed to `(forward, speed)`.
    fn on_speed_changed(&mut self, address: u32, state: &mut LocoState, forward: bool, speed: u8);

    /// Function `function` was pressed.
    ///
    /// The handler flips the mask bit itself when it accepts the press.
    fn on_function_toggled(&mut self, address: u32, state: &mut LocoState, function: u8) -> bool;
}

/// Handler that only tracks the function mask.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

impl LocoHandler for NoopHandler {
    fn on_speed_changed(&mut self, _: u32, _: &mut LocoState, _: bool, _: u8) {}

    fn on_function_toggled(&mut self, _: u32, state: &mut LocoState, function: u8) -> bool {
        state.toggle_function(function);
        true
    }
}

/// A registered loco.
pub struct LocoRecord {
    /// DCC-style address; values <= 0 never match a lookup.
    pub address: u32,
    /// Long (`L`) rather than short (`S`) address.
    pub long_address: bool,
    /// Current state.
    pub state: LocoState,
    /// Change handler.
    pub handler: Box<dyn LocoHandler + Send>,
}

impl core::fmt::Debug for LocoRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocoRecord")
            .field("address", &self.address)
            .field("long_address", &self.long_address)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LocoRecord {
    /// Create a short-address record with default state.
    pub fn new(address: u32, handler: Box<dyn LocoHandler + Send>) -> Self {
        Self {
            address,
            long_address: false,
            state: LocoState::default(),
            handler,
        }
    }

    /// Builder: mark as long address.
    pub fn with_long_address(mut self, long_address: bool) -> Self {
        self.long_address = long_address;
        self
    }

    /// `L` or `S`.
    pub fn address_kind(&self) -> char {
        if self.long_address {
            'L'
        } else {
            'S'
        }
    }

    /// Run the speed handler, then store `(forward, speed)`.
    pub fn apply_speed(&mut self, forward: bool, speed: u8) {
        self.handler
            .on_speed_changed(self.address, &mut self.state, forward, speed);
        self.state.forward = forward;
        self.state.speed = speed;
    }

    /// Run the function handler.
    pub fn press_function(&mut self, function: u8) -> bool {
        self.handler
            .on_function_toggled(self.address, &mut self.state, function)
    }
}

/// Supplies records for addresses the registry does not know.
pub trait LocoFactory {
    /// Create a record for `address`, or `None` to refuse.
    fn create_loco(&mut self, address: u32, long_address: bool) -> Option<LocoRecord>;
}

/// Ordered collection of locos.
///
/// Duplicates are allowed; lookups return the first match.
#[derive(Debug, Default)]
pub struct LocoRegistry {
    locos: Vec<LocoRecord>,
}

impl LocoRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn add_loco(&mut self, record: LocoRecord) {
        self.locos.push(record);
    }

    /// First record with `address`.
    pub fn find_by_address(&self, address: i64) -> Option<&LocoRecord> {
        if address <= 0 {
            return None;
        }
        self.locos.iter().find(|l| i64::from(l.address) == address)
    }

    /// First record with `address`, mutably.
    pub fn find_by_address_mut(&mut self, address: i64) -> Option<&mut LocoRecord> {
        if address <= 0 {
            return None;
        }
        self.locos
            .iter_mut()
            .find(|l| i64::from(l.address) == address)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LocoRecord> {
        self.locos.iter()
    }

    /// Records in insertion order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LocoRecord> {
        self.locos.iter_mut()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.locos.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.locos.is_empty()
    }
}
