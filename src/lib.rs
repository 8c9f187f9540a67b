#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Color`**: An immutable RGB intensity triple, each component clamped to `0..=100`
//! - **`Channel`**: Drives one three-line output through fades, strobes and pulses
//! - **`IntensityOutput`**: Trait to implement for your output hardware
//! - **`PwmOutput`**: Ready-made `IntensityOutput` over three `embedded-hal` PWM channels
//! - **`TimeSource`**: Trait to implement for your timing system
//! - **`ServiceTiming`**: When the channel needs to be serviced again
//! - **`Token`**: Caller-chosen tag reported when an operation completes
//! - **`ChannelAction`**: Commands that can be sent to control channels
//!
//! Intensities are percentages. Fades accumulate in `f32` and write the
//! floor of each accumulator at a fixed 50 Hz tick; the last tick of a fade
//! always lands exactly on the target.

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod channel;
pub mod color;
pub mod command;
pub mod output;
mod plan;
pub mod time;

pub use channel::{Channel, ChannelError, ChannelState, ServiceTiming, Serviced, Token};
pub use color::{Color, MAX_INTENSITY};
pub use command::{ChannelAction, ChannelCommand};
pub use output::{IntensityOutput, Line, PwmOutput};
pub use plan::FADE_TICK_MS;
#[cfg(feature = "std")]
pub use time::StdTimeSource;
pub use time::{TimeDuration, TimeInstant, TimeSource};
