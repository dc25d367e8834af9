//! Command routing and single-hop peer forwarding.
//!
//! A command arrives as a textual `(channel, command, args)` triple, from
//! HTTP JSON, from an HTTP path, or from a sibling gateway. The router
//! remembers the selected channel, turns the command into encoder calls,
//! and decides whether a copy goes out to the peers.
//!
//! # Commands
//!
//! | Command | Args | Encoder call |
//! |---------|------|--------------|
//! | `sound` | `motor`/`3`, `horn`/`2`, `coupler`/`1` | `toggle_sound_light(Sound1/2/3)` |
//! | `speed` | signed integer | `set_speed` |
//! | `forward`, `stop`, `backward` | | `send` |
//! | `light` | | `toggle_sound_light(Light)` |
//! | `keepalive` | | nothing |
//!
//! # Mesh
//!
//! Every gateway forwards commands it received directly to all its peers,
//! marked `repeated`. A repeated command is executed but never forwarded
//! again, so each command crosses at most one hop.

use alloc::string::String;

use tracing::{debug, warn};

use crate::ir::{IrEncoder, IrFunction, LocoAddress};
use crate::parsing::to_int;
use crate::traits::{DelayNs, PeerDiscovery, PeerTransport, PulseTransmitter};

/// A command triple plus its forwarding flag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatewayCommand {
    /// Channel letter `A`..`J`, or empty to keep the current one.
    pub channel: String,
    /// Command name.
    pub command: String,
    /// Command argument, possibly empty.
    pub args: String,
    /// Set on copies received from a peer.
    pub repeated: bool,
}

impl GatewayCommand {
    /// A locally received command.
    pub fn new(
        channel: impl Into<String>,
        command: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            command: command.into(),
            args: args.into(),
            repeated: false,
        }
    }

    /// Builder: set the repeated flag.
    pub fn with_repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }

    /// The copy sent to peers.
    pub fn forwarded(&self) -> Self {
        self.clone().with_repeated(true)
    }

    /// True if this command should be sent on to peers.
    pub fn should_forward(&self) -> bool {
        !self.repeated
    }
}

/// What a command asks the encoder to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterAction {
    /// Trigger a sound.
    Sound(IrFunction),
    /// Set a signed speed step.
    Speed(i32),
    /// Send a single function byte.
    Send(IrFunction),
    /// Toggle the headlight.
    Light,
    /// Connection keep-alive, nothing to transmit.
    KeepAlive,
    /// Unknown command or argument.
    Ignore,
}

impl RouterAction {
    /// Interpret a command name and argument.
    ///
    /// ```
    /// use ir_trainz::ir::IrFunction;
    /// use ir_trainz::router::RouterAction;
    ///
    /// assert_eq!(RouterAction::parse("sound", "horn"), RouterAction::Sound(IrFunction::Sound2));
    /// assert_eq!(RouterAction::parse("speed", "-2"), RouterAction::Speed(-2));
    /// assert_eq!(RouterAction::parse("fly", ""), RouterAction::Ignore);
    /// ```
    pub fn parse(command: &str, args: &str) -> Self {
        match command {
            "sound" => match args {
                "motor" | "3" => RouterAction::Sound(IrFunction::Sound1),
                "horn" | "2" => RouterAction::Sound(IrFunction::Sound2),
                "coupler" | "1" => RouterAction::Sound(IrFunction::Sound3),
                _ => RouterAction::Ignore,
            },
            "speed" => RouterAction::Speed(to_int(args)),
            "forward" => RouterAction::Send(IrFunction::Forward),
            "stop" => RouterAction::Send(IrFunction::Stop),
            "backward" => RouterAction::Send(IrFunction::Backward),
            "light" => RouterAction::Light,
            "keepalive" => RouterAction::KeepAlive,
            _ => RouterAction::Ignore,
        }
    }
}

/// Outcome of forwarding one command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForwardReport {
    /// Peers a copy was addressed to.
    pub attempted: usize,
    /// Peers that accepted it.
    pub delivered: usize,
}

/// Resolves channels and dispatches commands to an [`IrEncoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandRouter {
    current: LocoAddress,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(LocoAddress::A)
    }
}

impl CommandRouter {
    /// Router starting on `default_address`.
    pub fn new(default_address: LocoAddress) -> Self {
        Self {
            current: default_address,
        }
    }

    /// Address commands currently go to.
    pub fn current_address(&self) -> LocoAddress {
        self.current
    }

    /// Select `channel` if it names a known channel; otherwise keep the current one.
    pub fn select_channel(&mut self, channel: &str) -> LocoAddress {
        if let Some(address) = LocoAddress::from_channel(channel) {
            self.current = address;
        }
        self.current
    }

    /// Execute `command` on the encoder.
    pub fn dispatch<T, D>(
        &mut self,
        encoder: &mut IrEncoder<T, D>,
        command: &GatewayCommand,
    ) -> Result<RouterAction, T::Error>
    where
        T: PulseTransmitter,
        D: DelayNs,
    {
        let address = self.select_channel(&command.channel);
        let action = RouterAction::parse(&command.command, &command.args);
        debug!(
            channel = %address.channel(),
            command = %command.command,
            args = %command.args,
            repeated = command.repeated,
            ?action,
            "dispatch"
        );
        match action {
            RouterAction::Sound(function) => encoder.toggle_sound_light(address, function)?,
            RouterAction::Speed(step) => encoder.set_speed(address, step)?,
            RouterAction::Send(function) => encoder.send(address, function.raw())?,
            RouterAction::Light => encoder.toggle_sound_light(address, IrFunction::Light)?,
            RouterAction::KeepAlive | RouterAction::Ignore => {}
        }
        Ok(action)
    }
}

/// Send `command` to every discovered peer unless it is itself a forwarded copy.
///
/// Delivery is best-effort: failures are logged and skipped.
pub fn forward_to_peers<P, X>(
    command: &GatewayCommand,
    peers: &P,
    transport: &mut X,
) -> ForwardReport
where
    P: PeerDiscovery + ?Sized,
    X: PeerTransport + ?Sized,
{
    let mut report = ForwardReport::default();
    if !command.should_forward() {
        return report;
    }
    let copy = command.forwarded();
    for index in 0..peers.count() {
        let Some(peer) = peers.address_at(index) else {
            continue;
        };
        report.attempted += 1;
        match transport.forward(peer, &copy) {
            Ok(()) => report.delivered += 1,
            Err(e) => warn!(peer, error = ?e, "forward failed"),
        }
    }
    report
}
