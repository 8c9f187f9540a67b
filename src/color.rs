//! Clamped intensity triples.
//!
//! A [`Color`] holds one intensity per line in percent (`0..=100`), the unit
//! the output driver speaks. Values are clamped once, at construction, and
//! never change afterwards.
//!
//! Conversions to and from `palette::Srgb` only rescale between percent and
//! the `0.0-1.0` range; no color-space math is involved.

use palette::Srgb;

/// Highest intensity a line accepts.
pub const MAX_INTENSITY: u8 = 100;

/// An RGB intensity triple, each component in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    red: u8,
    green: u8,
    blue: u8,
}

impl Color {
    /// All lines off.
    pub const OFF: Color = Color::new(0, 0, 0);
    /// All lines at full intensity.
    pub const WHITE: Color = Color::new(100, 100, 100);
    pub const RED: Color = Color::new(100, 0, 0);
    pub const GREEN: Color = Color::new(0, 100, 0);
    pub const BLUE: Color = Color::new(0, 0, 100);

    /// Creates a color, clamping each component independently to `0..=100`.
    ///
    /// Out-of-range inputs are clamped, never rejected.
    pub const fn new(red: i32, green: i32, blue: i32) -> Self {
        Self {
            red: clamp_intensity(red),
            green: clamp_intensity(green),
            blue: clamp_intensity(blue),
        }
    }

    #[inline]
    pub const fn red(&self) -> u8 {
        self.red
    }

    #[inline]
    pub const fn green(&self) -> u8 {
        self.green
    }

    #[inline]
    pub const fn blue(&self) -> u8 {
        self.blue
    }

    /// Returns `[red, green, blue]`.
    #[inline]
    pub const fn components(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Returns the components as floating intensities, the unit fades accumulate in.
    pub(crate) fn to_intensities(self) -> [f32; 3] {
        [self.red as f32, self.green as f32, self.blue as f32]
    }

    /// Builds a color from floating intensities, truncating toward zero.
    pub(crate) fn from_intensities(values: [f32; 3]) -> Self {
        Self {
            red: truncate_intensity(values[0]),
            green: truncate_intensity(values[1]),
            blue: truncate_intensity(values[2]),
        }
    }
}

const fn clamp_intensity(value: i32) -> u8 {
    if value < 0 {
        0
    } else if value > MAX_INTENSITY as i32 {
        MAX_INTENSITY
    } else {
        value as u8
    }
}

/// Floors a floating intensity into `0..=100`.
///
/// Near-zero negatives left over from incremental updates floor to `-1` and
/// are clamped back to zero.
pub(crate) fn floor_intensity(value: f32) -> u8 {
    libm::floorf(value).clamp(0.0, MAX_INTENSITY as f32) as u8
}

fn truncate_intensity(value: f32) -> u8 {
    libm::truncf(value).clamp(0.0, MAX_INTENSITY as f32) as u8
}

impl From<Color> for Srgb {
    fn from(color: Color) -> Self {
        let scale = MAX_INTENSITY as f32;
        Srgb::new(
            color.red as f32 / scale,
            color.green as f32 / scale,
            color.blue as f32 / scale,
        )
    }
}

impl From<Srgb> for Color {
    fn from(color: Srgb) -> Self {
        let scale = MAX_INTENSITY as f32;
        Color::new(
            libm::roundf(color.red * scale) as i32,
            libm::roundf(color.green * scale) as i32,
            libm::roundf(color.blue * scale) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_intensity_clamps_near_zero_negatives() {
        assert_eq!(floor_intensity(-0.000_01), 0);
        assert_eq!(floor_intensity(-0.0), 0);
        assert_eq!(floor_intensity(45.99), 45);
        assert_eq!(floor_intensity(100.4), 100);
    }

    #[test]
    fn from_intensities_truncates_toward_zero() {
        let color = Color::from_intensities([12.9, 0.2, 99.999]);
        assert_eq!(color.components(), [12, 0, 99]);
    }
}
