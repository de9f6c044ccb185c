//! Inbound commands to the application service.
//!
//! Commands arrive as raw MQTT payloads on the command topic.  Only the
//! first byte carries meaning; the rest of the payload is ignored.

use super::lamp::LampState;

/// A parsed lamp command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LampCommand {
    /// Drive the lamp to the given state.
    Set(LampState),
}

impl LampCommand {
    /// Parse a command payload.
    ///
    /// `b'1'` switches the lamp on, `b'0'` switches it off.  Any other
    /// first byte, or an empty payload, is not a command and yields `None`.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload.first()? {
            b'1' => Some(Self::Set(LampState::On)),
            b'0' => Some(Self::Set(LampState::Off)),
            _ => None,
        }
    }

    /// Target state of the command.
    pub fn target(self) -> LampState {
        match self {
            Self::Set(state) => state,
        }
    }
}
