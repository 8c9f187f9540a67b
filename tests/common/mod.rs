//! Shared test infrastructure for rgb-channel integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use rgb_channel::{
    Channel, IntensityOutput, Line, ServiceTiming, Serviced, TimeDuration, TimeInstant,
    TimeSource, Token,
};

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    const ZERO: Self = TestDuration(0);

    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }

    fn checked_add(self, duration: Self::Duration) -> Option<Self> {
        self.0.checked_add(duration.0).map(TestInstant)
    }
}

// ============================================================================
// Mock Output
// ============================================================================

/// Mock output that records every line write
pub struct MockOutput {
    writes: heapless::Vec<(Line, u8), 2048>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self {
            writes: heapless::Vec::new(),
        }
    }

    pub fn writes(&self) -> &[(Line, u8)] {
        &self.writes
    }

    /// Writes grouped into `[red, green, blue]` frames.
    pub fn frames(&self) -> Vec<[u8; 3]> {
        self.writes
            .chunks_exact(3)
            .map(|chunk| {
                assert_eq!(chunk[0].0, Line::Red);
                assert_eq!(chunk[1].0, Line::Green);
                assert_eq!(chunk[2].0, Line::Blue);
                [chunk[0].1, chunk[1].1, chunk[2].1]
            })
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.writes.len() / 3
    }

    pub fn last_frame(&self) -> Option<[u8; 3]> {
        self.frames().last().copied()
    }
}

impl IntensityOutput for MockOutput {
    type Error = core::convert::Infallible;

    fn set_intensity(&mut self, line: Line, value: u8) -> Result<(), Self::Error> {
        assert!(value <= 100, "intensity {value} out of range");
        self.writes
            .push((line, value))
            .expect("write history full");
        Ok(())
    }
}

/// Error reported by `FailingOutput`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFailed;

/// Output that accepts a fixed number of writes, then fails
pub struct FailingOutput {
    remaining: usize,
}

impl FailingOutput {
    pub fn after(writes: usize) -> Self {
        Self { remaining: writes }
    }
}

impl IntensityOutput for FailingOutput {
    type Error = WriteFailed;

    fn set_intensity(&mut self, _line: Line, _value: u8) -> Result<(), Self::Error> {
        if self.remaining == 0 {
            return Err(WriteFailed);
        }
        self.remaining -= 1;
        Ok(())
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: core::cell::Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: core::cell::Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: TestDuration) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + duration.0));
    }

    pub fn elapsed(&self) -> u64 {
        self.current_time.get().0
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

pub type TestChannel<'t, O = MockOutput> = Channel<'t, TestInstant, O, MockTimeSource>;

/// Follows the returned timing like an executor would, advancing the mock
/// clock by each delay, until the channel goes idle or `max_services` calls
/// have been made. Returns the completions seen, with their timestamps.
pub fn drive(
    channel: &mut TestChannel<'_>,
    timer: &MockTimeSource,
    mut serviced: Serviced<TestDuration>,
    max_services: usize,
) -> Vec<(u64, Token)> {
    let mut completions = Vec::new();
    if let Some(token) = serviced.completed {
        completions.push((timer.elapsed(), token));
    }

    for _ in 0..max_services {
        match serviced.timing {
            ServiceTiming::Idle => break,
            ServiceTiming::Delay(delay) => timer.advance(delay),
        }
        serviced = channel.service().unwrap();
        if let Some(token) = serviced.completed {
            completions.push((timer.elapsed(), token));
        }
    }

    completions
}
