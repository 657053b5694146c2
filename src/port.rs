//! Peripheral ports.
//!
//! Each component depends only on the narrow slice of hardware it touches.
//! The firmware implements these traits with volatile register accesses; the
//! [`sim`](crate::sim) module implements them by writing to a journal.
//!
//! Digital outputs are not described here: anything that toggles or drives a
//! line takes an `embedded-hal` pin instead.

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

use crate::timer::{Ticks, TimerId};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Identifies one of the two main cores.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoreId {
	/// The PRO CPU. Runs first, starts everything else.
	Core0,
	/// The APP CPU. Held in the boot ROM until core 0 hands it an entry point.
	Core1,
}

impl CoreId {
	/// Work out which core we are from the Xtensa `PRID` special register.
	///
	/// The ESP32-S3 reads `0xCDCD` on core 0 and `0xABAB` on core 1; bit 13
	/// is the only one that matters.
	pub const fn from_prid(prid: u32) -> CoreId {
		if (prid >> 13) & 1 == 0 {
			CoreId::Core0
		} else {
			CoreId::Core1
		}
	}

	/// Index into per-core tables.
	pub const fn index(self) -> usize {
		match self {
			CoreId::Core0 => 0,
			CoreId::Core1 => 1,
		}
	}
}

/// A GPIO on the main GPIO matrix (0..=48).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pin(u8);

impl Pin {
	/// The highest GPIO number on the ESP32-S3.
	pub const MAX: u8 = 48;

	/// Name a GPIO. Numbers above [`Pin::MAX`] fail to build when used in a
	/// `const`.
	pub const fn new(number: u8) -> Pin {
		assert!(number <= Pin::MAX);
		Pin(number)
	}

	/// The GPIO number.
	pub const fn number(self) -> u8 {
		self.0
	}

	/// Which 32-bit output bank (`OUT` or `OUT1`) holds this pin.
	pub const fn bank(self) -> usize {
		(self.0 / 32) as usize
	}

	/// This pin's bit within its bank.
	pub const fn mask(self) -> u32 {
		1 << (self.0 % 32)
	}
}

/// A GPIO in the RTC domain, which is all the coprocessor can reach.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RtcPin(u8);

impl RtcPin {
	/// Name an RTC GPIO (0..=21).
	pub const fn new(number: u8) -> RtcPin {
		assert!(number <= 21);
		RtcPin(number)
	}

	/// The RTC GPIO number.
	pub const fn number(self) -> u8 {
		self.0
	}

	/// This pin's bit in `RTC_GPIO_OUT_REG`, where the outputs start at bit 10.
	pub const fn mask(self) -> u32 {
		1 << (10 + self.0)
	}
}

/// Asks the hardware which core this code is running on.
pub trait CoreIdentity {
	/// The core executing the call.
	fn core_id(&self) -> CoreId;
}

/// The private countdown timers of the core that owns this port.
pub trait TimerPort {
	/// Raise the interrupt cause of `timer` once, `ticks` from now.
	///
	/// Reprogramming a timer also acknowledges its pending cause.
	fn arm(&mut self, timer: TimerId, ticks: Ticks);
}

/// The interrupt-enable mask of the core that owns this port.
pub trait InterruptEnable {
	/// Set the bits in `mask` in this core's interrupt-enable register.
	fn enable(&mut self, mask: u32);
}

/// The run-stall, clock-gate, reset and boot-address controls of core 1.
pub trait CoreControl {
	/// Clear every stall source holding core 1.
	fn release_stall(&mut self);
	/// Open core 1's clock gate.
	fn enable_clock(&mut self);
	/// Hold core 1 in reset.
	fn assert_reset(&mut self);
	/// Let core 1 out of reset. It runs the boot ROM and waits in a trap.
	fn deassert_reset(&mut self);
	/// Hand the boot ROM the address to jump to. This is what lets core 1 go.
	fn write_entry_address(&mut self, address: u32);
}

/// Main-core control over the ULP RISC-V coprocessor.
pub trait CoprocessorControl {
	/// Copy the coprocessor program into RTC slow memory.
	fn load_program(&mut self, image: &[u8]);
	/// Drive the coprocessor reset line.
	fn set_reset(&mut self, asserted: bool);
	/// Route the ULP wake-up timer to the RISC-V coprocessor (rather than the
	/// FSM one).
	fn select_riscv(&mut self);
	/// Open the coprocessor clock gate.
	fn enable_clock(&mut self);
	/// Start the coprocessor's wake-up timer, which starts the program.
	fn start(&mut self);
	/// Raise the coprocessor's software interrupt.
	fn raise_software_interrupt(&mut self);
}

/// What the coprocessor program can see of the hardware.
pub trait AuxIo {
	/// Make `pin` an output, driven low.
	fn configure_output(&mut self, pin: RtcPin);
	/// Invert `pin`.
	fn toggle(&mut self, pin: RtcPin);
	/// Load the coprocessor countdown timer.
	fn set_timer(&mut self, ticks: u32);
	/// Let the software interrupt through to the coprocessor.
	fn enable_software_interrupt(&mut self);
	/// Raise the software interrupt on ourselves.
	fn trigger_software_interrupt(&mut self);
	/// Acknowledge the software interrupt.
	fn clear_software_interrupt(&mut self);
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prid_decoding() {
		assert_eq!(CoreId::from_prid(0xCDCD), CoreId::Core0);
		assert_eq!(CoreId::from_prid(0xABAB), CoreId::Core1);
	}

	#[test]
	fn pin_banks() {
		assert_eq!(Pin::new(7).bank(), 0);
		assert_eq!(Pin::new(7).mask(), 1 << 7);
		assert_eq!(Pin::new(48).bank(), 1);
		assert_eq!(Pin::new(48).mask(), 1 << 16);
		assert_eq!(RtcPin::new(18).mask(), 1 << 28);
		assert_eq!(RtcPin::new(17).mask(), 1 << 27);
	}

	#[test]
	#[should_panic]
	fn no_gpio_49() {
		let _ = Pin::new(49);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
