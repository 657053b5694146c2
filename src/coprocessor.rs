//! The ULP RISC-V coprocessor.
//!
//! Two halves live here. [`Coprocessor`] is what core 0 uses to load and start
//! the coprocessor. [`AuxProgram`] is what then runs on it: a free-running
//! loop that interrupts itself two different ways and shows each on its own
//! RTC GPIO.

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

use crate::config::{
	AUX_SOFTWARE_LED, AUX_SPIN_COUNT, AUX_TIMER_LED, AUX_TIMER_TIMEOUT, ULP_MEMORY_SIZE,
};
use crate::port::{AuxIo, CoprocessorControl};
use crate::timer::CalibratedDelay;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Core 0's handle on the coprocessor.
pub struct Coprocessor<X> {
	control: X,
}

/// Why the coprocessor was left in reset.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoprocessorError {
	/// There is no program to run.
	EmptyImage,
	/// The program, this many bytes long, does not fit in RTC slow memory.
	ImageTooLarge(usize),
}

/// The coprocessor's interrupt cause word, as its handler receives it.
///
/// These bits mean nothing on the main cores.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuxCause(u32);

/// The program the coprocessor runs.
pub struct AuxProgram<P> {
	io: P,
	delay: CalibratedDelay,
	timeout: u32,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Cause bits raised by the coprocessor's own timer.
const TIMER_CAUSES: u32 = 0x7;

/// Cause bit raised by a software interrupt.
const SOFTWARE_CAUSE: u32 = 1 << 31;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<X> Coprocessor<X>
where
	X: CoprocessorControl,
{
	/// Take control of the coprocessor. It is not touched until
	/// [`Coprocessor::start`].
	pub fn new(control: X) -> Coprocessor<X> {
		Coprocessor { control }
	}

	/// Load `image` and set the coprocessor running it.
	///
	/// An image that can't be run is refused before anything is touched, so
	/// the coprocessor stays in whatever state the ROM left it.
	pub fn start(&mut self, image: &[u8]) -> Result<(), CoprocessorError> {
		if image.is_empty() {
			return Err(CoprocessorError::EmptyImage);
		}
		if image.len() > ULP_MEMORY_SIZE {
			return Err(CoprocessorError::ImageTooLarge(image.len()));
		}
		self.control.load_program(image);
		self.control.set_reset(true);
		self.control.set_reset(false);
		self.control.select_riscv();
		self.control.enable_clock();
		self.control.start();
		#[cfg(feature = "defmt")]
		defmt::debug!("Coprocessor started ({} bytes)", image.len());
		Ok(())
	}

	/// Raise the coprocessor's software interrupt once.
	///
	/// The program above never waits for this, but it will act on it.
	pub fn wake(&mut self) {
		self.control.raise_software_interrupt();
	}
}

impl AuxCause {
	/// Wrap a raw cause word.
	pub const fn from_bits(bits: u32) -> AuxCause {
		AuxCause(bits)
	}

	/// Did the countdown timer expire?
	pub const fn is_timer(self) -> bool {
		self.0 & TIMER_CAUSES != 0
	}

	/// Was the software interrupt raised?
	pub const fn is_software(self) -> bool {
		self.0 & SOFTWARE_CAUSE != 0
	}
}

impl<P> AuxProgram<P>
where
	P: AuxIo,
{
	/// The program as built: RTC GPIO 18 on the timer, RTC GPIO 17 on the
	/// software interrupt.
	pub fn new(io: P) -> AuxProgram<P> {
		AuxProgram::with_timing(io, CalibratedDelay::new(AUX_SPIN_COUNT), AUX_TIMER_TIMEOUT)
	}

	/// The program with a different spin length and countdown.
	pub fn with_timing(io: P, delay: CalibratedDelay, timeout: u32) -> AuxProgram<P> {
		AuxProgram { io, delay, timeout }
	}

	/// Run once at program start, before the first idle step.
	pub fn init(&mut self) {
		self.io.configure_output(AUX_TIMER_LED);
		self.io.configure_output(AUX_SOFTWARE_LED);
		self.io.set_timer(self.timeout);
		self.io.enable_software_interrupt();
	}

	/// One pass of the idle loop: spin, then interrupt ourselves.
	pub fn idle_step(&mut self) {
		self.delay.spin();
		self.io.trigger_software_interrupt();
	}

	/// The interrupt handler. A single call may carry both causes, and each
	/// is handled independently.
	pub fn on_interrupt(&mut self, cause: AuxCause) {
		if cause.is_timer() {
			self.io.toggle(AUX_TIMER_LED);
			self.io.set_timer(self.timeout);
		}
		if cause.is_software() {
			self.io.toggle(AUX_SOFTWARE_LED);
			self.io.clear_software_interrupt();
		}
	}

	/// The hardware the program runs on.
	pub fn io(&self) -> &P {
		&self.io
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
