//! Periodic indicator.
//!
//! Every time a core's LED timer expires: arm it again, toggle that core's
//! LED, and (on the core with the WS2812) send the next colour.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) the esp32s3-bringup Developers, 2025
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::convert::Infallible;
use embedded_hal::digital::v2::{OutputPin, ToggleableOutputPin};

use crate::infallible;
use crate::port::{CoreId, TimerPort};
use crate::timer::{Ticks, TimerId};
use crate::ws2812::{ColourPhase, Ws2812};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One core's LED, and optionally the WS2812.
///
/// The colour phase lives here, so it belongs to whichever core owns the
/// strip and nobody else can move it.
pub struct Indicator<L, S> {
	core: CoreId,
	period: Ticks,
	led: L,
	strip: Option<Ws2812<S>>,
	phase: ColourPhase,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The timer every indicator runs on.
pub const INDICATOR_TIMER: TimerId = TimerId::Timer1;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<L, S> Indicator<L, S>
where
	L: OutputPin<Error = Infallible> + ToggleableOutputPin<Error = Infallible>,
	S: OutputPin<Error = Infallible>,
{
	/// An indicator for `core`, blinking `led` every `period`.
	///
	/// Pass a strip only on the core it is wired to. Whether there is one is
	/// decided here, once; the expiry path never asks which core it is on.
	pub fn new(core: CoreId, period: Ticks, led: L, strip: Option<Ws2812<S>>) -> Indicator<L, S> {
		Indicator {
			core,
			period,
			led,
			strip,
			phase: ColourPhase::Green,
		}
	}

	/// Drive the LED to its known starting level. Do this before
	/// [`Indicator::start`], because from then on it only ever toggles.
	pub fn init_output(&mut self) {
		infallible(self.led.set_high());
	}

	/// Arm the first period.
	pub fn start<T: TimerPort>(&mut self, timers: &mut T) {
		timers.arm(INDICATOR_TIMER, self.period);
	}

	/// Our timer has expired.
	pub fn on_expiry<T: TimerPort>(&mut self, timers: &mut T) {
		timers.arm(INDICATOR_TIMER, self.period);

		infallible(self.led.toggle());

		if let Some(strip) = self.strip.as_mut() {
			strip.write(self.phase.colour());
			self.phase = self.phase.next();
		}
	}

	/// Which core this indicator belongs to.
	pub fn core(&self) -> CoreId {
		self.core
	}

	/// The colour the next expiry will send.
	pub fn phase(&self) -> ColourPhase {
		self.phase
	}

	/// Does this indicator drive the WS2812?
	pub fn has_strip(&self) -> bool {
		self.strip.is_some()
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{CORE0_LED, CORE1_LED, LED_BLINK_PERIOD, WS2812_PIN};
	use crate::sim::{Journal, Op, SimPin, SimTimers};
	use crate::ws2812::{decode_frame, WRITES_PER_FRAME};

	#[test]
	fn rearms_before_touching_the_led() {
		let journal = Journal::new();
		let mut timers = SimTimers::new(&journal);
		let mut indicator: Indicator<SimPin, SimPin> =
			Indicator::new(CoreId::Core0, LED_BLINK_PERIOD, SimPin::new(&journal, CORE0_LED), None);

		indicator.on_expiry(&mut timers);

		assert_eq!(
			&*journal.ops(),
			&[
				Op::Arm {
					timer: TimerId::Timer1,
					ticks: 40_000_000
				},
				Op::PinWrite {
					pin: CORE0_LED,
					high: true
				},
			]
		);
		assert!(timers.is_armed(TimerId::Timer1));
	}

	#[test]
	fn two_expiries_restore_the_led() {
		let journal = Journal::new();
		let mut timers = SimTimers::new(&journal);
		let mut indicator: Indicator<SimPin, SimPin> =
			Indicator::new(CoreId::Core0, LED_BLINK_PERIOD, SimPin::new(&journal, CORE0_LED), None);
		indicator.init_output();
		let before = journal.pin_level(CORE0_LED);

		indicator.on_expiry(&mut timers);
		assert_ne!(journal.pin_level(CORE0_LED), before);
		indicator.on_expiry(&mut timers);
		assert_eq!(journal.pin_level(CORE0_LED), before);
	}

	#[test]
	fn core0_never_touches_the_strip() {
		let journal = Journal::new();
		let mut timers = SimTimers::new(&journal);
		let mut indicator: Indicator<SimPin, SimPin> =
			Indicator::new(CoreId::Core0, LED_BLINK_PERIOD, SimPin::new(&journal, CORE0_LED), None);
		for _ in 0..4 {
			indicator.on_expiry(&mut timers);
		}
		assert_eq!(journal.pin_writes(WS2812_PIN).count(), 0);
		assert_eq!(indicator.phase(), ColourPhase::Green);
		assert!(!indicator.has_strip());
	}

	#[test]
	fn phase_follows_invocation_count() {
		let journal = Journal::new();
		let mut timers = SimTimers::new(&journal);
		let mut indicator = Indicator::new(
			CoreId::Core1,
			LED_BLINK_PERIOD,
			SimPin::new(&journal, CORE1_LED),
			Some(Ws2812::new(SimPin::new(&journal, WS2812_PIN))),
		);

		for n in 0..10u8 {
			assert_eq!(indicator.phase().index(), n % 3);
			journal.clear();
			indicator.on_expiry(&mut timers);

			// One whole frame per expiry, never more or less
			let writes: std::vec::Vec<bool> = journal.pin_writes(WS2812_PIN).collect();
			assert_eq!(writes.len(), WRITES_PER_FRAME);
			let mut expected = ColourPhase::Green;
			for _ in 0..n % 3 {
				expected = expected.next();
			}
			assert_eq!(decode_frame(&writes), Ok(expected.colour()));
		}
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
