//! Lamp controller: the single actuator.
//!
//! Owns the logical lamp state.  A valid command drives the output and
//! notifies the display in one call, so the physical pin and the rendered
//! panel never disagree across a loop iteration.

use log::{debug, info};

use super::commands::LampCommand;
use super::events::DisplayEvent;
use super::ports::{DisplaySink, OutputPort};

/// Logical lamp state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LampState {
    On,
    #[default]
    Off,
}

impl LampState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Owns [`LampState`] and applies inbound commands to it.
pub struct LampController {
    state: LampState,
    applied: u32,
    ignored: u32,
}

impl Default for LampController {
    fn default() -> Self {
        Self::new()
    }
}

impl LampController {
    pub fn new() -> Self {
        Self {
            state: LampState::Off,
            applied: 0,
            ignored: 0,
        }
    }

    /// Drive the output and display to the initial state (off).
    pub fn start(&mut self, out: &mut impl OutputPort, display: &mut impl DisplaySink) {
        self.drive(out, display);
    }

    /// Apply a raw command payload.
    ///
    /// Returns the new state when the payload was a command, `None` when it
    /// was ignored.  Repeating a command re-drives the output and re-emits
    /// the notification with the same value.
    pub fn apply_command(
        &mut self,
        payload: &[u8],
        out: &mut impl OutputPort,
        display: &mut impl DisplaySink,
    ) -> Option<LampState> {
        let Some(cmd) = LampCommand::parse(payload) else {
            self.ignored = self.ignored.wrapping_add(1);
            debug!("Lamp: ignoring payload ({} bytes)", payload.len());
            return None;
        };

        let prev = self.state;
        self.state = cmd.target();
        self.applied = self.applied.wrapping_add(1);
        self.drive(out, display);

        if prev != self.state {
            info!("Lamp: {:?} -> {:?}", prev, self.state);
        }
        Some(self.state)
    }

    pub fn state(&self) -> LampState {
        self.state
    }

    /// Commands applied since boot (including repeats).
    pub fn applied_count(&self) -> u32 {
        self.applied
    }

    /// Payloads ignored since boot.
    pub fn ignored_count(&self) -> u32 {
        self.ignored
    }

    fn drive(&self, out: &mut impl OutputPort, display: &mut impl DisplaySink) {
        out.set_lamp(self.state.is_on());
        display.notify(&DisplayEvent::Lamp(self.state));
    }
}
