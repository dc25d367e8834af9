//! IR-backed loco handlers.
//!
//! Bridges the throttle protocol's 0..=126 speed scale and function
//! numbers onto the handful of commands an IR receiver understands.

use alloc::boxed::Box;

use tracing::{debug, warn};

use crate::ir::{IrEncoder, IrFunction, LocoAddress};
use crate::registry::{LocoFactory, LocoHandler, LocoRecord, LocoRegistry, LocoState};
use crate::traits::{DelayNs, PulseTransmitter};

/// Number of locos registered at startup (addresses 1..=10).
pub const DEFAULT_LOCO_COUNT: u32 = 10;

/// The two IR operations a loco handler needs.
///
/// Failures are the driver's to report; throttle callbacks have no error path.
pub trait IrDriver {
    /// Drive `address` at a signed step in `-3..=3`.
    fn set_speed(&mut self, address: LocoAddress, step: i32);

    /// Trigger a sound or the headlight.
    fn toggle_sound_light(&mut self, address: LocoAddress, function: IrFunction);
}

impl<T, D> IrDriver for IrEncoder<T, D>
where
    T: PulseTransmitter,
    D: DelayNs,
{
    fn set_speed(&mut self, address: LocoAddress, step: i32) {
        if let Err(e) = IrEncoder::set_speed(self, address, step) {
            warn!(channel = %address.channel(), error = ?e, "IR speed command failed");
        }
    }

    fn toggle_sound_light(&mut self, address: LocoAddress, function: IrFunction) {
        if let Err(e) = IrEncoder::toggle_sound_light(self, address, function) {
            warn!(channel = %address.channel(), error = ?e, "IR function command failed");
        }
    }
}

#[cfg(feature = "std")]
impl<D: IrDriver> IrDriver for std::sync::Arc<std::sync::Mutex<D>> {
    fn set_speed(&mut self, address: LocoAddress, step: i32) {
        match self.lock() {
            Ok(mut driver) => driver.set_speed(address, step),
            Err(_) => warn!("IR driver lock poisoned"),
        }
    }

    fn toggle_sound_light(&mut self, address: LocoAddress, function: IrFunction) {
        match self.lock() {
            Ok(mut driver) => driver.toggle_sound_light(address, function),
            Err(_) => warn!("IR driver lock poisoned"),
        }
    }
}

/// Map a 0..=126 throttle speed to an IR step.
///
/// ```
/// use ir_trainz::locos::speed_step;
///
/// assert_eq!(speed_step(true, 0), 0);
/// assert_eq!(speed_step(true, 1), 1);
/// assert_eq!(speed_step(true, 42), 1);
/// assert_eq!(speed_step(true, 43), 2);
/// assert_eq!(speed_step(false, 126), -3);
/// ```
pub fn speed_step(forward: bool, speed: u8) -> i32 {
    let step = (i32::from(speed) + 41) / 42;
    if forward {
        step
    } else {
        -step
    }
}

/// Map a throttle function number to an IR function.
pub fn function_for(index: u8) -> Option<IrFunction> {
    match index {
        0 => Some(IrFunction::Light),
        1 => Some(IrFunction::Sound1),
        2 => Some(IrFunction::Sound2),
        3 => Some(IrFunction::Sound3),
        _ => None,
    }
}

/// Loco handler that drives an IR receiver.
pub struct IrLocoHandler<S> {
    driver: S,
    last_step: i32,
}

impl<S: IrDriver> IrLocoHandler<S> {
    /// Create a handler that has sent nothing yet.
    pub fn new(driver: S) -> Self {
        Self {
            driver,
            last_step: 0,
        }
    }
}

impl<S: IrDriver> LocoHandler for IrLocoHandler<S> {
    fn on_speed_changed(&mut self, address: u32, _: &mut LocoState, forward: bool, speed: u8) {
        let step = speed_step(forward, speed);
        debug!(address, speed, step, "loco speed");
        // Stop is always resent.
        if step == self.last_step && step != 0 {
            return;
        }
        self.last_step = step;
        if let Some(channel) = LocoAddress::from_number(address) {
            self.driver.set_speed(channel, step);
        }
    }

    fn on_function_toggled(&mut self, address: u32, state: &mut LocoState, function: u8) -> bool {
        debug!(address, function, "loco function");
        state.toggle_function(function);
        if let (Some(channel), Some(ir)) = (LocoAddress::from_number(address), function_for(function))
        {
            self.driver.toggle_sound_light(channel, ir);
        }
        true
    }
}

/// Factory creating IR-backed locos on demand.
#[derive(Clone, Debug)]
pub struct IrLocoFactory<S> {
    driver: S,
}

impl<S> IrLocoFactory<S>
where
    S: IrDriver + Clone + Send + 'static,
{
    /// Factory handing each new loco a clone of `driver`.
    pub fn new(driver: S) -> Self {
        Self { driver }
    }

    /// Build a record for `address`.
    pub fn record(&self, address: u32, long_address: bool) -> LocoRecord {
        LocoRecord::new(address, Box::new(IrLocoHandler::new(self.driver.clone())))
            .with_long_address(long_address)
    }

    /// Register the startup locos: short addresses 1..=10, forward, stopped.
    pub fn populate(&self, registry: &mut LocoRegistry) {
        for address in 1..=DEFAULT_LOCO_COUNT {
            registry.add_loco(self.record(address, false));
        }
    }
}

impl<S> LocoFactory for IrLocoFactory<S>
where
    S: IrDriver + Clone + Send + 'static,
{
    fn create_loco(&mut self, address: u32, long_address: bool) -> Option<LocoRecord> {
        if address == 0 {
            return None;
        }
        Some(self.record(address, long_address))
    }
}
