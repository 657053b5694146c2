//! Platform bring-up.
//!
//! Straight-line register programming that has to happen before anything
//! else runs: watchdogs off, clocks up, every GPIO an output driven low. None
//! of it can fail and none of it is ever undone.

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
// Types
// -----------------------------------------------------------------------------

/// The chip-level set-up the rest of the crate assumes has been done.
pub trait Platform {
	/// Stop the RTC super-watchdog and the timer group 0 watchdog, both of
	/// which the boot ROM leaves running.
	fn disable_watchdogs(&mut self);

	/// Set up the clock tree so the APB runs at
	/// [`APB_FREQ_HZ`](crate::config::APB_FREQ_HZ).
	fn init_clocks(&mut self);

	/// Make every GPIO an output and drive it low.
	///
	/// The LED toggling relies on this: it only ever inverts.
	fn init_outputs(&mut self);
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Run the platform bring-up. Call once, first thing, on core 0.
pub fn init<P: Platform>(platform: &mut P) {
	platform.disable_watchdogs();
	platform.init_clocks();
	platform.init_outputs();
	#[cfg(feature = "defmt")]
	defmt::debug!("Platform OK");
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sim::{Journal, Op, PlatformStep, SimPlatform};

	#[test]
	fn steps_run_once_in_order() {
		let journal = Journal::new();
		init(&mut SimPlatform::new(&journal));
		assert_eq!(
			&*journal.ops(),
			&[
				Op::Platform(PlatformStep::DisableWatchdogs),
				Op::Platform(PlatformStep::InitClocks),
				Op::Platform(PlatformStep::InitOutputs),
			]
		);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
