//! Timer service and tick counters.
//!
//! Each Xtensa core has three private compare timers (`CCOMPARE0..=2`)
//! against its cycle counter. Writing a compare value arms the timer and
//! acknowledges any cause it already raised. Nothing cancels a timer: once
//! armed it fires exactly once, and it is up to the expiry handler to arm it
//! again if it wants another one.

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

use crate::config::APB_FREQ_HZ;
use crate::dispatch::{Cause, Level};
use crate::port::TimerPort;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A span of APB clock ticks.
///
/// Timer periods only exist in this unit, so a period worked out against some
/// other clock does not type-check.
pub type Ticks = fugit::TimerDurationU32<APB_FREQ_HZ>;

/// A busy-wait of a fixed number of loop iterations.
///
/// How long that takes depends on the clock the spinning core runs at, so it
/// is only ever approximate. It never yields.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CalibratedDelay {
	iterations: u32,
}

/// One of the per-core compare timers.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerId {
	/// `CCOMPARE0`, interrupt 6, level 1. Drives the microsecond counter.
	Timer0,
	/// `CCOMPARE1`, interrupt 15, level 3. Drives the LEDs.
	Timer1,
	/// `CCOMPARE2`, interrupt 16, level 5. Drives the millisecond counter.
	Timer2,
}

impl CalibratedDelay {
	/// No delay at all.
	pub const NONE: CalibratedDelay = CalibratedDelay::new(0);

	/// A delay of `iterations` trips round a spin loop.
	pub const fn new(iterations: u32) -> CalibratedDelay {
		CalibratedDelay { iterations }
	}

	/// How many trips round the loop.
	pub const fn iterations(self) -> u32 {
		self.iterations
	}

	/// Spin.
	#[inline(always)]
	pub fn spin(self) {
		for i in 0..self.iterations {
			// Keeps the otherwise empty loop from being optimised away
			core::hint::black_box(i);
			core::hint::spin_loop();
		}
	}
}

impl TimerId {
	/// Every timer, in `CCOMPAREn` order.
	pub const ALL: [TimerId; 3] = [TimerId::Timer0, TimerId::Timer1, TimerId::Timer2];

	/// The Xtensa interrupt number this timer raises.
	pub const fn interrupt(self) -> u32 {
		match self {
			TimerId::Timer0 => 6,
			TimerId::Timer1 => 15,
			TimerId::Timer2 => 16,
		}
	}

	/// The priority level that interrupt is wired to. Fixed by the core
	/// configuration, not by us.
	pub const fn level(self) -> Level {
		match self {
			TimerId::Timer0 => Level::Level1,
			TimerId::Timer1 => Level::Level3,
			TimerId::Timer2 => Level::Level5,
		}
	}

	/// The cause bitmask delivered to [`TimerId::level`] when this timer
	/// expires.
	pub const fn cause(self) -> Cause {
		Cause::from_bits(1 << self.interrupt())
	}
}

/// A self-rearming periodic counter on one timer.
///
/// The count only ever goes up, by exactly one per expiry. At 64 bits it
/// outlives the hardware even when counting microseconds.
pub struct SysTick {
	timer: TimerId,
	period: Ticks,
	count: u64,
}

impl SysTick {
	/// A counter at zero on `timer`. Nothing happens until [`SysTick::start`].
	pub const fn new(timer: TimerId, period: Ticks) -> SysTick {
		SysTick {
			timer,
			period,
			count: 0,
		}
	}

	/// Arm the first period.
	pub fn start<T: TimerPort>(&mut self, timers: &mut T) {
		timers.arm(self.timer, self.period);
	}

	/// Call when our timer has expired. Re-arms, then counts.
	pub fn on_expiry<T: TimerPort>(&mut self, timers: &mut T) {
		timers.arm(self.timer, self.period);
		self.count += 1;
	}

	/// The timer this counter runs on.
	pub fn timer(&self) -> TimerId {
		self.timer
	}

	/// How many periods have elapsed.
	pub fn count(&self) -> u64 {
		self.count
	}

	/// Elapsed time, assuming every expiry was serviced.
	pub fn elapsed(&self) -> fugit::TimerDurationU64<APB_FREQ_HZ> {
		fugit::TimerDurationU64::from_ticks(self.count * u64::from(self.period.ticks()))
	}
}

/// The microsecond and millisecond counters one core keeps.
pub struct SysTicks {
	/// Counts microseconds on timer 0.
	pub us: SysTick,
	/// Counts milliseconds on timer 2.
	pub ms: SysTick,
}

impl SysTicks {
	/// Both counters at zero, on their usual timers.
	pub const fn new() -> SysTicks {
		SysTicks {
			us: SysTick::new(TimerId::Timer0, crate::config::SYSTICK_US_PERIOD),
			ms: SysTick::new(TimerId::Timer2, crate::config::SYSTICK_MS_PERIOD),
		}
	}
}

impl Default for SysTicks {
	fn default() -> Self {
		SysTicks::new()
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sim::{Journal, Op, SimTimers};

	#[test]
	fn timer_causes_match_the_level_table() {
		assert_eq!(TimerId::Timer0.cause().bits(), 1 << 6);
		assert_eq!(TimerId::Timer1.cause().bits(), 1 << 15);
		assert_eq!(TimerId::Timer2.cause().bits(), 1 << 16);
		for timer in TimerId::ALL {
			assert!(timer.level().mask() & timer.cause().bits() != 0);
		}
	}

	#[test]
	fn systick_rearms_before_counting() {
		let journal = Journal::new();
		let mut timers = SimTimers::new(&journal);
		let mut tick = SysTick::new(TimerId::Timer2, Ticks::from_ticks(80_000));
		tick.start(&mut timers);
		assert_eq!(tick.count(), 0);

		for expected in 1..=5 {
			assert!(timers.expire(TimerId::Timer2).is_some());
			tick.on_expiry(&mut timers);
			assert_eq!(tick.count(), expected);
			assert!(timers.is_armed(TimerId::Timer2));
		}

		let arms = journal
			.ops()
			.iter()
			.filter(|op| matches!(op, Op::Arm { timer: TimerId::Timer2, ticks: 80_000 }))
			.count();
		assert_eq!(arms, 6);
		let elapsed: fugit::MillisDurationU64 = tick.elapsed().convert();
		assert_eq!(elapsed.to_millis(), 5);
	}

	#[test]
	fn delays_keep_their_length() {
		assert_eq!(CalibratedDelay::NONE.iterations(), 0);
		let delay = CalibratedDelay::new(250);
		assert_eq!(delay.iterations(), 250);
		// Returns, and touches nothing
		delay.spin();
		CalibratedDelay::NONE.spin();
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
