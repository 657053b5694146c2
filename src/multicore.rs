//! Multi-core support.
//!
//! Functions for launching code onto Core 1.
//!
//! Out of reset, core 1 is stalled, clock-gated and held in reset. Once it is
//! released it runs the boot ROM, which parks it in a trap until someone
//! writes an entry address into `SYSTEM_CORE_1_CONTROL_1_REG`. Core 0 does
//! all of that, once, in a fixed order. Nothing comes back: if core 1 never
//! starts, the only symptom is an LED that never blinks.

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

use core::sync::atomic::{fence, Ordering};

use crate::port::CoreControl;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Where core 1 starts executing.
///
/// Only constructible from a function that never returns, so the address is
/// always a linked, valid entry point.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntryPoint(u32);

impl EntryPoint {
	/// The entry point of `function`.
	pub fn new(function: unsafe extern "C" fn() -> !) -> EntryPoint {
		EntryPoint(function as usize as u32)
	}

	/// The raw address, as written to the hand-off register.
	pub const fn address(self) -> u32 {
		self.0
	}

	#[cfg(test)]
	pub(crate) const fn from_address(address: u32) -> EntryPoint {
		EntryPoint(address)
	}
}

/// The right to start core 1.
///
/// There is one of these. [`SecondaryCore::launch`] consumes it, so core 1
/// can't be started twice.
pub struct SecondaryCore<C> {
	control: C,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<C> SecondaryCore<C>
where
	C: CoreControl,
{
	/// Take control of core 1.
	pub fn new(control: C) -> SecondaryCore<C> {
		SecondaryCore { control }
	}

	/// Starts core 1 running at `entry`.
	///
	/// Returns as soon as the entry address is written; it does not wait for
	/// core 1 to arrive.
	pub fn launch(mut self, entry: EntryPoint) {
		#[cfg(feature = "defmt")]
		defmt::debug!("Unstalling CPU1...");
		self.control.release_stall();

		#[cfg(feature = "defmt")]
		defmt::debug!("Clocking CPU1...");
		self.control.enable_clock();

		#[cfg(feature = "defmt")]
		defmt::debug!("Resetting CPU1...");
		// The reset is edge-triggered: both writes must reach the hardware,
		// in this order, with nothing moved in between.
		fence(Ordering::SeqCst);
		self.control.assert_reset();
		fence(Ordering::SeqCst);
		self.control.deassert_reset();
		fence(Ordering::SeqCst);

		// CPU1 is now in the ROM, spinning until this register is non-zero.
		#[cfg(feature = "defmt")]
		defmt::debug!("CPU1 entry is 0x{:08x}", entry.address());
		self.control.write_entry_address(entry.address());
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sim::{CoreStep, Journal, Op, SimCoreControl};

	#[test]
	fn launch_sequence_is_ordered_and_complete() {
		let journal = Journal::new();
		SecondaryCore::new(SimCoreControl::new(&journal))
			.launch(EntryPoint::from_address(0x4037_5000));
		assert_eq!(
			&*journal.ops(),
			&[
				Op::Core(CoreStep::ReleaseStall),
				Op::Core(CoreStep::EnableClock),
				Op::Core(CoreStep::AssertReset),
				Op::Core(CoreStep::DeassertReset),
				Op::Core(CoreStep::EntryAddress(0x4037_5000)),
			]
		);
	}

	#[test]
	fn entry_point_comes_from_the_function() {
		unsafe extern "C" fn park() -> ! {
			loop {}
		}
		let entry = EntryPoint::new(park);
		assert_eq!(entry.address() as usize, park as usize as u32 as usize);
		assert_ne!(entry.address(), 0);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
