//! Output driver abstraction.
//!
//! Defines the [`IntensityOutput`] trait a [`Channel`](crate::Channel) writes
//! through, and [`PwmOutput`], an implementation over three
//! `embedded-hal` PWM channels.

use embedded_hal::pwm::SetDutyCycle;

/// One of the three output lines of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    Red,
    Green,
    Blue,
}

impl Line {
    /// All lines in write order.
    pub const ALL: [Line; 3] = [Line::Red, Line::Green, Line::Blue];
}

/// Trait for abstracting the intensity output hardware.
///
/// Implement this for your driver (PWM, DAC, GPIO expander, ...) to let a
/// channel control it. Writes happen at up to 50 Hz per line and must not
/// block.
pub trait IntensityOutput {
    /// Error reported by the driver. Channels propagate it unchanged.
    type Error;

    /// Sets `line` to `value`, a percentage in `0..=100`.
    fn set_intensity(&mut self, line: Line, value: u8) -> Result<(), Self::Error>;
}

/// RGB output over three PWM channels.
///
/// Converts percentages to duty cycles and handles common anode wiring,
/// where a line is fully on at zero duty.
pub struct PwmOutput<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle<Error = R::Error>,
    B: SetDutyCycle<Error = R::Error>,
{
    red: R,
    green: G,
    blue: B,
    common_anode: bool,
}

impl<R, G, B> PwmOutput<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle<Error = R::Error>,
    B: SetDutyCycle<Error = R::Error>,
{
    /// Creates a new PWM output.
    ///
    /// # Arguments
    /// * `red` - PWM channel for the red line
    /// * `green` - PWM channel for the green line
    /// * `blue` - PWM channel for the blue line
    /// * `common_anode` - true for common anode LEDs (inverted logic), false for common cathode
    pub fn new(red: R, green: G, blue: B, common_anode: bool) -> Self {
        Self {
            red,
            green,
            blue,
            common_anode,
        }
    }

    /// Releases the PWM channels.
    pub fn into_inner(self) -> (R, G, B) {
        (self.red, self.green, self.blue)
    }
}

impl<R, G, B> IntensityOutput for PwmOutput<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle<Error = R::Error>,
    B: SetDutyCycle<Error = R::Error>,
{
    type Error = R::Error;

    fn set_intensity(&mut self, line: Line, value: u8) -> Result<(), Self::Error> {
        let percent = value.min(crate::MAX_INTENSITY);
        let percent = if self.common_anode {
            crate::MAX_INTENSITY - percent
        } else {
            percent
        };

        match line {
            Line::Red => self.red.set_duty_cycle_percent(percent),
            Line::Green => self.green.set_duty_cycle_percent(percent),
            Line::Blue => self.blue.set_duty_cycle_percent(percent),
        }
    }
}
