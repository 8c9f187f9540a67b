//! Command-based control for channels.

use crate::channel::Token;
use crate::color::Color;
use crate::time::TimeDuration;

/// Actions for controlling channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelAction<D: TimeDuration> {
    /// Set a color immediately.
    Set { color: Color, notify: Option<Token> },
    /// Fade linearly to a color.
    Fade {
        target: Color,
        duration: D,
        notify: Option<Token>,
    },
    /// Fade to `start`, then oscillate between `end` and `start`.
    Pulse {
        start: Color,
        end: Color,
        fade_time: D,
        pulse_time: D,
    },
    /// Stop pulsing.
    EndPulse { notify: Option<Token> },
    /// Alternate between off and a color.
    Strobe {
        color: Color,
        pulse_length: D,
        duration: D,
        notify: Option<Token>,
    },
    /// Turn all lines off.
    Close,
}

/// Command targeting a specific channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelCommand<Id, D: TimeDuration> {
    pub channel_id: Id,
    pub action: ChannelAction<D>,
}

impl<Id, D: TimeDuration> ChannelCommand<Id, D> {
    /// Creates command.
    pub fn new(channel_id: Id, action: ChannelAction<D>) -> Self {
        Self { channel_id, action }
    }
}
