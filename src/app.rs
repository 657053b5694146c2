//! Everything one core runs.
//!
//! A [`CoreApp`] owns that core's private timers, its indicator and its tick
//! counters. The core's level handlers hand it every interrupt; it never
//! sees the other core's.

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

use crate::dispatch::{self, Cause, Event, EventSink, Level};
use crate::indicator::Indicator;
use crate::port::{CoreId, TimerPort};
use crate::timer::SysTicks;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One core's components.
pub struct CoreApp<T, L, S> {
	timers: T,
	indicator: Indicator<L, S>,
	ticks: SysTicks,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<T, L, S> CoreApp<T, L, S>
where
	T: TimerPort,
	L: OutputPin<Error = Infallible> + ToggleableOutputPin<Error = Infallible>,
	S: OutputPin<Error = Infallible>,
{
	/// Bundle a core's timers and indicator. The tick counters start at zero
	/// and stay idle until [`CoreApp::start_ticks`].
	pub fn new(timers: T, indicator: Indicator<L, S>) -> CoreApp<T, L, S> {
		CoreApp {
			timers,
			indicator,
			ticks: SysTicks::new(),
		}
	}

	/// Which core this is.
	pub fn core(&self) -> CoreId {
		self.indicator.core()
	}

	/// Put the LED at its known level.
	pub fn init_outputs(&mut self) {
		self.indicator.init_output();
	}

	/// Arm the LED timer.
	pub fn start(&mut self) {
		self.indicator.start(&mut self.timers);
	}

	/// Arm the millisecond counter, and the microsecond one too if asked.
	///
	/// A microsecond tick is 80 APB ticks, which is barely enough time to get
	/// in and out of the handler, so it is off unless asked for.
	pub fn start_ticks(&mut self, microseconds: bool) {
		self.ticks.ms.start(&mut self.timers);
		if microseconds {
			self.ticks.us.start(&mut self.timers);
		}
	}

	/// The body of this core's level handlers.
	pub fn on_interrupt(&mut self, level: Level, cause: Cause) {
		dispatch::dispatch(level, cause, self);
	}

	/// The tick counters.
	pub fn ticks(&self) -> &SysTicks {
		&self.ticks
	}

	/// The indicator.
	pub fn indicator(&self) -> &Indicator<L, S> {
		&self.indicator
	}

	/// The timer port, for poking at a simulated one.
	pub fn timers(&mut self) -> &mut T {
		&mut self.timers
	}
}

impl<T, L, S> EventSink for CoreApp<T, L, S>
where
	T: TimerPort,
	L: OutputPin<Error = Infallible> + ToggleableOutputPin<Error = Infallible>,
	S: OutputPin<Error = Infallible>,
{
	fn handle(&mut self, event: Event) {
		match event {
			Event::MicrosecondTick => self.ticks.us.on_expiry(&mut self.timers),
			Event::Indicator => self.indicator.on_expiry(&mut self.timers),
			Event::MillisecondTick => self.ticks.ms.on_expiry(&mut self.timers),
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{CORE0_LED, LED_BLINK_PERIOD};
	use crate::sim::{Journal, Op, SimPin, SimTimers};
	use crate::timer::TimerId;

	fn core0(journal: &Journal) -> CoreApp<SimTimers<'_>, SimPin<'_>, SimPin<'_>> {
		CoreApp::new(
			SimTimers::new(journal),
			Indicator::new(
				CoreId::Core0,
				LED_BLINK_PERIOD,
				SimPin::new(journal, CORE0_LED),
				None,
			),
		)
	}

	fn arms(journal: &Journal, timer: TimerId) -> usize {
		journal
			.ops()
			.iter()
			.filter(|op| matches!(op, Op::Arm { timer: t, .. } if *t == timer))
			.count()
	}

	#[test]
	fn one_expiry_is_one_dispatch() {
		let journal = Journal::new();
		let mut app = core0(&journal);
		app.start();
		assert_eq!(arms(&journal, TimerId::Timer1), 1);

		let (level, cause) = app.timers().expire(TimerId::Timer1).unwrap();
		assert_eq!(level, Level::Level3);
		// Expired, and not re-armed yet, so nothing more is coming
		assert!(app.timers().expire(TimerId::Timer1).is_none());

		app.on_interrupt(level, cause);
		assert_eq!(arms(&journal, TimerId::Timer1), 2);
		assert_eq!(journal.pin_writes(CORE0_LED).count(), 1);
	}

	#[test]
	fn tick_counters_follow_their_timers() {
		let journal = Journal::new();
		let mut app = core0(&journal);
		app.start_ticks(true);

		for _ in 0..3 {
			let (level, cause) = app.timers().expire(TimerId::Timer2).unwrap();
			app.on_interrupt(level, cause);
		}
		let (level, cause) = app.timers().expire(TimerId::Timer0).unwrap();
		app.on_interrupt(level, cause);

		assert_eq!(app.ticks().ms.count(), 3);
		assert_eq!(app.ticks().us.count(), 1);
		// Neither counter touches the LED
		assert_eq!(journal.pin_writes(CORE0_LED).count(), 0);
	}

	#[test]
	fn microsecond_tick_is_opt_in() {
		let journal = Journal::new();
		let mut app = core0(&journal);
		app.start_ticks(false);
		assert!(app.timers().is_armed(TimerId::Timer2));
		assert!(!app.timers().is_armed(TimerId::Timer0));
	}

	#[test]
	fn stray_cause_on_an_assigned_level_does_nothing() {
		let journal = Journal::new();
		let mut app = core0(&journal);
		app.on_interrupt(Level::Level5, Cause::from_bits(1 << 26));
		assert!(journal.ops().is_empty());
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
