//! Channel animation engine.
//!
//! Provides [`Channel`], which owns one three-line output and animates it
//! through fades, strobes and pulses. A channel never sleeps: each operation
//! writes its first frame right away and returns a [`ServiceTiming`] telling
//! the caller when to call [`Channel::service`] next.

use crate::color::{self, Color};
use crate::command::ChannelAction;
use crate::output::{IntensityOutput, Line};
use crate::plan::{self, FADE_TICK_MS, FadePlan, FadeStep, StrobePlan};
use crate::time::{TimeDuration, TimeInstant, TimeSource};
use defmt_or_log::{debug, trace};

/// Caller-chosen tag reported back in [`Serviced::completed`] when an
/// operation finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Token(pub u32);

/// The current animation state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    /// No animation running. Output holds the last written color.
    Idle,
    /// Linear fade in progress, including the lead-in of a pulse.
    Fading,
    /// Oscillating between the two colors of a pulse.
    Pulsing,
    /// Strobe sequence in progress.
    Strobing,
}

/// When the channel needs to be serviced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceTiming<D> {
    /// Call [`Channel::service`] after this delay.
    ///
    /// A zero delay means a deferred request is ready to start.
    Delay(D),

    /// Nothing scheduled. No servicing needed until the next operation.
    Idle,
}

/// Result of an operation or a service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Serviced<D> {
    /// When to service next.
    pub timing: ServiceTiming<D>,
    /// Token of the operation that finished during this call, if any.
    pub completed: Option<Token>,
}

/// Errors that can occur during channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError<E> {
    /// The output driver rejected a write.
    Output(E),
    /// Strobe pulse length shorter than one millisecond.
    ZeroPulseLength,
}

impl<E: core::fmt::Debug> core::fmt::Display for ChannelError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ChannelError::Output(err) => {
                write!(f, "output write failed: {:?}", err)
            }
            ChannelError::ZeroPulseLength => {
                write!(f, "strobe pulse length must be at least one millisecond")
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for ChannelError<E> {}

/// What a fade does once it reaches its target.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FadeTask<D> {
    /// Report the token, if any, and go idle.
    Plain(Option<Token>),
    /// First half of a pulse: continue with an oscillating fade to `end`.
    PulseLeadIn { end: Color, leg: D },
    /// Oscillating leg of a pulse. Never finishes on its own.
    Pulse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FadeRequest<D> {
    target: Color,
    duration: D,
    task: FadeTask<D>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StrobeRequest<D> {
    color: Color,
    half_period: D,
    duration: D,
    notify: Option<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode<D> {
    Idle,
    Fading {
        plan: FadePlan,
        task: FadeTask<D>,
    },
    Strobing {
        plan: StrobePlan,
        half_period: D,
        notify: Option<Token>,
    },
}

/// Drives one RGB output through timed fades, strobes and pulses.
///
/// The channel owns the output driver and a single pending deadline. Every
/// operation replaces that deadline; there is no other pending work except the
/// requests deferred behind a strobe.
///
/// Strobes take priority: a fade or pulse requested while a strobe runs is
/// held back and starts once the strobe ends, and a second strobe waits for
/// the first. A strobe requested during a fade or pulse replaces it.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `I` - Time instant type
/// * `O` - Output driver type
/// * `T` - Time source implementation type
pub struct Channel<'t, I: TimeInstant, O: IntensityOutput, T: TimeSource<I>> {
    output: O,
    time_source: &'t T,
    current: [f32; 3],
    mode: Mode<I::Duration>,
    deadline: Option<I>,
    deferred_fade: Option<FadeRequest<I::Duration>>,
    deferred_strobe: Option<StrobeRequest<I::Duration>>,
}

impl<'t, I: TimeInstant, O: IntensityOutput, T: TimeSource<I>> Channel<'t, I, O, T> {
    /// Creates an idle channel and turns all lines off.
    pub fn new(output: O, time_source: &'t T) -> Result<Self, ChannelError<O::Error>> {
        let mut channel = Self {
            output,
            time_source,
            current: [0.0; 3],
            mode: Mode::Idle,
            deadline: None,
            deferred_fade: None,
            deferred_strobe: None,
        };
        channel.write(Color::OFF.components())?;

        Ok(channel)
    }

    /// Handles a channel action by dispatching to the matching operation.
    ///
    /// # Returns
    /// * `Ok(Serviced)` - Whatever the dispatched operation returns
    /// * `Err` - Output write failed or invalid strobe pulse length
    pub fn handle_action(
        &mut self,
        action: ChannelAction<I::Duration>,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        match action {
            ChannelAction::Set { color, notify } => self.set_rgb(color, notify),
            ChannelAction::Fade {
                target,
                duration,
                notify,
            } => self.fade_rgb(target, duration, notify),
            ChannelAction::Pulse {
                start,
                end,
                fade_time,
                pulse_time,
            } => self.pulse_rgb(start, end, fade_time, pulse_time),
            ChannelAction::EndPulse { notify } => self.end_pulse(notify),
            ChannelAction::Strobe {
                color,
                pulse_length,
                duration,
                notify,
            } => self.strobe_rgb(color, pulse_length, duration, notify),
            ChannelAction::Close => {
                self.close()?;
                Ok(self.serviced(self.time_source.now(), None))
            }
        }
    }

    /// Sets a color immediately.
    ///
    /// Cancels every running animation and every deferred request, writes
    /// `color` and reports `notify` as completed right away.
    pub fn set_rgb(
        &mut self,
        color: Color,
        notify: Option<Token>,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        if self.mode != Mode::Idle || self.has_deferred() {
            debug!("set_rgb cancels running animation");
        }
        self.cancel_all();
        self.apply(color)?;

        Ok(Serviced {
            timing: ServiceTiming::Idle,
            completed: notify,
        })
    }

    /// Fades linearly from the current color to `target` over `duration`.
    ///
    /// The first step is written immediately, then one step every 20 ms.
    /// A running fade or pulse is replaced and its token is never reported.
    /// While a strobe runs the request is deferred until the strobe ends.
    /// Durations shorter than one tick set the target immediately.
    ///
    /// # Returns
    /// * `Ok(Serviced)` - When to service next; `completed` carries `notify`
    ///   only for fades shorter than one tick
    /// * `Err` - Output write failed, the channel is idle
    pub fn fade_rgb(
        &mut self,
        target: Color,
        duration: I::Duration,
        notify: Option<Token>,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        trace!(
            "fade_rgb to ({}, {}, {}) over {} ms",
            target.red(),
            target.green(),
            target.blue(),
            duration.as_millis()
        );
        self.request_fade(FadeRequest {
            target,
            duration,
            task: FadeTask::Plain(notify),
        })
    }

    /// Fades to `start` over `fade_time`, then oscillates between `end` and
    /// `start`, each leg taking `pulse_time`, until [`Channel::end_pulse`].
    pub fn pulse_rgb(
        &mut self,
        start: Color,
        end: Color,
        fade_time: I::Duration,
        pulse_time: I::Duration,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        trace!(
            "pulse_rgb lead-in {} ms, legs {} ms",
            fade_time.as_millis(),
            pulse_time.as_millis()
        );
        self.request_fade(FadeRequest {
            target: start,
            duration: fade_time,
            task: FadeTask::PulseLeadIn {
                end,
                leg: pulse_time,
            },
        })
    }

    /// Stops a pulse, whether still fading in, oscillating or deferred.
    ///
    /// The accumulators are rounded and written so the output holds the
    /// settled color. Other animations are left alone. `notify` is reported
    /// right away.
    pub fn end_pulse(
        &mut self,
        notify: Option<Token>,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        let now = self.time_source.now();

        if let Some(FadeRequest {
            task: FadeTask::PulseLeadIn { .. },
            ..
        }) = self.deferred_fade
        {
            self.deferred_fade = None;
        }

        if matches!(
            self.mode,
            Mode::Fading {
                task: FadeTask::PulseLeadIn { .. } | FadeTask::Pulse,
                ..
            }
        ) {
            debug!("pulse retired");
            self.mode = Mode::Idle;
            self.deadline = None;
            plan::settle(&mut self.current);
            let result = self.write_current();
            self.guard(result)?;
        }

        Ok(self.serviced(now, notify))
    }

    /// Alternates between off and `color` every `pulse_length` for about
    /// `duration`, always starting and ending off.
    ///
    /// A running fade or pulse is replaced. While another strobe runs the
    /// request is deferred until it ends; only the latest deferred strobe is
    /// kept.
    ///
    /// # Returns
    /// * `Ok(Serviced)` - When to service next, half a period from now
    /// * `Err(ChannelError::ZeroPulseLength)` - `pulse_length` is zero, nothing changes
    /// * `Err(ChannelError::Output)` - Output write failed, the channel is idle
    pub fn strobe_rgb(
        &mut self,
        color: Color,
        pulse_length: I::Duration,
        duration: I::Duration,
        notify: Option<Token>,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        if pulse_length.as_millis() == 0 {
            return Err(ChannelError::ZeroPulseLength);
        }

        let now = self.time_source.now();
        let request = StrobeRequest {
            color,
            half_period: pulse_length,
            duration,
            notify,
        };

        if self.strobe_engaged() {
            debug!("strobe deferred until running strobe ends");
            self.deferred_strobe = Some(request);
            return Ok(self.serviced(now, None));
        }

        if matches!(self.mode, Mode::Fading { .. }) {
            debug!("strobe preempts running fade");
        }

        let result = self.begin_strobe(request, now);
        let completed = self.guard(result)?;
        Ok(self.serviced(now, completed))
    }

    /// Turns all lines off.
    ///
    /// Does not stop a running animation; its next service writes again.
    /// Stop animations first, or use [`Channel::release`].
    pub fn close(&mut self) -> Result<(), ChannelError<O::Error>> {
        self.write(Color::OFF.components())
    }

    /// Turns all lines off and hands the output driver back.
    pub fn release(mut self) -> Result<O, ChannelError<O::Error>> {
        self.close()?;
        Ok(self.output)
    }

    /// Services the channel, advancing the running animation by one step if
    /// its deadline has passed.
    ///
    /// Calling early is harmless: nothing changes and the remaining delay is
    /// returned. If a write fails the channel goes idle and the error is
    /// returned.
    ///
    /// # Returns
    /// * `Ok(Serviced)` - `timing` is `Delay` while work is scheduled, `Idle`
    ///   otherwise; `completed` holds at most one finished token
    /// * `Err` - Output write failed
    pub fn service(&mut self) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        let now = self.time_source.now();

        let Some(deadline) = self.deadline else {
            return Ok(self.serviced(now, None));
        };
        if now < deadline {
            return Ok(self.serviced(now, None));
        }

        self.deadline = None;
        let result = match self.mode {
            Mode::Idle => self.start_deferred(now),
            Mode::Fading { .. } => self.fade_tick(now),
            Mode::Strobing { .. } => self.strobe_tick(now),
        };
        let completed = self.guard(result)?;

        Ok(self.serviced(now, completed))
    }

    /// Returns the current animation state.
    pub fn state(&self) -> ChannelState {
        match self.mode {
            Mode::Idle => ChannelState::Idle,
            Mode::Fading {
                task: FadeTask::Pulse,
                ..
            } => ChannelState::Pulsing,
            Mode::Fading { .. } => ChannelState::Fading,
            Mode::Strobing { .. } => ChannelState::Strobing,
        }
    }

    /// Returns true while oscillating between the two colors of a pulse.
    pub fn is_pulsing(&self) -> bool {
        self.state() == ChannelState::Pulsing
    }

    /// Returns the current color, truncating fractional intensities.
    pub fn color(&self) -> Color {
        Color::from_intensities(self.current)
    }

    /// Returns the raw intensity accumulators.
    pub fn intensities(&self) -> [f32; 3] {
        self.current
    }

    /// Returns true if a fade, pulse or strobe is waiting for a strobe to end.
    pub fn has_deferred(&self) -> bool {
        self.deferred_fade.is_some() || self.deferred_strobe.is_some()
    }

    /// Returns a reference to the output driver.
    pub fn output(&self) -> &O {
        &self.output
    }

    fn request_fade(
        &mut self,
        request: FadeRequest<I::Duration>,
    ) -> Result<Serviced<I::Duration>, ChannelError<O::Error>> {
        let now = self.time_source.now();

        if self.strobe_engaged() {
            debug!("fade deferred until strobe ends");
            self.deferred_fade = Some(request);
            return Ok(self.serviced(now, None));
        }

        self.deferred_fade = None;
        let result = self.begin_fade(request, now);
        let completed = self.guard(result)?;
        Ok(self.serviced(now, completed))
    }

    fn begin_fade(
        &mut self,
        request: FadeRequest<I::Duration>,
        now: I,
    ) -> Result<Option<Token>, ChannelError<O::Error>> {
        let oscillate = matches!(request.task, FadeTask::Pulse);
        let mut steps = plan::fade_steps(request.duration.as_millis());
        if oscillate {
            steps = steps.max(1);
        }

        if steps == 0 {
            self.mode = Mode::Idle;
            self.deadline = None;
            self.apply(request.target)?;
            return self.finish_fade(request.task, now);
        }

        self.mode = Mode::Fading {
            plan: FadePlan::new(self.current, request.target, steps, oscillate),
            task: request.task,
        };
        self.fade_tick(now)
    }

    fn fade_tick(&mut self, now: I) -> Result<Option<Token>, ChannelError<O::Error>> {
        let Mode::Fading { plan, task } = &mut self.mode else {
            return Ok(None);
        };
        let step = plan.advance(&mut self.current);
        trace!("fade step {}/{}", plan.steps_done(), plan.total_steps());
        let task = *task;

        self.write_current()?;

        match step {
            FadeStep::Continue | FadeStep::Reversed => {
                self.schedule(now, I::Duration::from_millis(FADE_TICK_MS));
                Ok(None)
            }
            FadeStep::Finished => {
                plan::settle(&mut self.current);
                self.mode = Mode::Idle;
                self.deadline = None;
                self.finish_fade(task, now)
            }
        }
    }

    fn finish_fade(
        &mut self,
        task: FadeTask<I::Duration>,
        now: I,
    ) -> Result<Option<Token>, ChannelError<O::Error>> {
        match task {
            FadeTask::Plain(notify) => {
                debug!("fade complete");
                Ok(notify)
            }
            FadeTask::PulseLeadIn { end, leg } => {
                debug!("pulse lead-in complete");
                self.begin_fade(
                    FadeRequest {
                        target: end,
                        duration: leg,
                        task: FadeTask::Pulse,
                    },
                    now,
                )
            }
            // Oscillating legs reverse instead of finishing.
            FadeTask::Pulse => Ok(None),
        }
    }

    fn begin_strobe(
        &mut self,
        request: StrobeRequest<I::Duration>,
        now: I,
    ) -> Result<Option<Token>, ChannelError<O::Error>> {
        let steps = plan::strobe_steps(
            request.duration.as_millis(),
            request.half_period.as_millis(),
        );
        trace!(
            "strobe {} half-periods of {} ms",
            steps,
            request.half_period.as_millis()
        );

        self.mode = Mode::Strobing {
            plan: StrobePlan::new(request.color, steps),
            half_period: request.half_period,
            notify: request.notify,
        };
        self.strobe_tick(now)
    }

    fn strobe_tick(&mut self, now: I) -> Result<Option<Token>, ChannelError<O::Error>> {
        let Mode::Strobing {
            plan,
            half_period,
            notify,
        } = &mut self.mode
        else {
            return Ok(None);
        };
        let step = plan.advance();
        let half_period = *half_period;
        let notify = *notify;

        self.apply(step.color)?;

        if !step.finished {
            self.schedule(now, half_period);
            return Ok(None);
        }

        debug!("strobe complete");
        self.mode = Mode::Idle;
        // Deferred requests start on the next service, one completion per call.
        self.deadline = if self.has_deferred() { Some(now) } else { None };
        Ok(notify)
    }

    fn start_deferred(&mut self, now: I) -> Result<Option<Token>, ChannelError<O::Error>> {
        if let Some(request) = self.deferred_strobe.take() {
            debug!("starting deferred strobe");
            return self.begin_strobe(request, now);
        }
        if let Some(request) = self.deferred_fade.take() {
            debug!("starting deferred fade");
            return self.begin_fade(request, now);
        }
        Ok(None)
    }

    fn strobe_engaged(&self) -> bool {
        matches!(self.mode, Mode::Strobing { .. }) || self.deferred_strobe.is_some()
    }

    fn schedule(&mut self, now: I, delay: I::Duration) {
        // On instant overflow fall back to servicing right away rather than never.
        self.deadline = Some(now.checked_add(delay).unwrap_or(now));
    }

    fn serviced(&self, now: I, completed: Option<Token>) -> Serviced<I::Duration> {
        let timing = match self.deadline {
            None => ServiceTiming::Idle,
            Some(deadline) if deadline > now => ServiceTiming::Delay(deadline.duration_since(now)),
            Some(_) => ServiceTiming::Delay(I::Duration::ZERO),
        };

        Serviced { timing, completed }
    }

    fn cancel_all(&mut self) {
        self.mode = Mode::Idle;
        self.deadline = None;
        self.deferred_fade = None;
        self.deferred_strobe = None;
    }

    /// Stops everything if `result` carries an output error.
    fn guard<R>(
        &mut self,
        result: Result<R, ChannelError<O::Error>>,
    ) -> Result<R, ChannelError<O::Error>> {
        if result.is_err() {
            debug!("output error, channel stopped");
            self.cancel_all();
        }
        result
    }

    fn apply(&mut self, color: Color) -> Result<(), ChannelError<O::Error>> {
        self.current = color.to_intensities();
        self.write(color.components())
    }

    fn write_current(&mut self) -> Result<(), ChannelError<O::Error>> {
        let [red, green, blue] = self.current;
        self.write([
            color::floor_intensity(red),
            color::floor_intensity(green),
            color::floor_intensity(blue),
        ])
    }

    fn write(&mut self, levels: [u8; 3]) -> Result<(), ChannelError<O::Error>> {
        for (line, value) in Line::ALL.into_iter().zip(levels) {
            self.output
                .set_intensity(line, value)
                .map_err(ChannelError::Output)?;
        }
        Ok(())
    }
}
