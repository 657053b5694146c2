//! Simulated peripheral ports.
//!
//! Every port here appends what it was asked to do to one shared [`Journal`],
//! in order, so a test can check not just that a register was written but
//! what came before and after it. Nothing here touches real hardware. The
//! module is only built for tests, or with the `sim` feature.

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

use core::cell::{Ref, RefCell};
use core::convert::Infallible;

use embedded_hal::digital::v2::{OutputPin, ToggleableOutputPin};

use crate::dispatch::{Cause, Level};
use crate::platform::Platform;
use crate::port::{
	AuxIo, CoprocessorControl, CoreControl, InterruptEnable, Pin, RtcPin, TimerPort,
};
use crate::timer::{Ticks, TimerId};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One thing a simulated port was asked to do.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Op {
	/// A GPIO output was written.
	PinWrite {
		/// Which one
		pin: Pin,
		/// `true` for high
		high: bool,
	},
	/// A compare timer was armed.
	Arm {
		/// Which one
		timer: TimerId,
		/// For how long
		ticks: u32,
	},
	/// Bits were set in the interrupt-enable register.
	InterruptEnable(u32),
	/// A core 1 control step.
	Core(CoreStep),
	/// A coprocessor control step, from the main core's side.
	Coprocessor(CoprocessorStep),
	/// Something the coprocessor program did.
	Aux(AuxStep),
	/// A platform bring-up step.
	Platform(PlatformStep),
}

/// See [`CoreControl`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoreStep {
	ReleaseStall,
	EnableClock,
	AssertReset,
	DeassertReset,
	EntryAddress(u32),
}

/// See [`CoprocessorControl`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoprocessorStep {
	/// Carries the image length
	LoadProgram(usize),
	Reset(bool),
	SelectRiscv,
	EnableClock,
	Start,
	SoftwareInterrupt,
}

/// See [`AuxIo`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuxStep {
	ConfigureOutput(RtcPin),
	Toggle(RtcPin),
	SetTimer(u32),
	EnableSoftwareInterrupt,
	TriggerSoftwareInterrupt,
	ClearSoftwareInterrupt,
}

/// See [`Platform`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlatformStep {
	DisableWatchdogs,
	InitClocks,
	InitOutputs,
}

/// The ordered record every simulated port writes to.
pub struct Journal {
	ops: RefCell<heapless::Vec<Op, JOURNAL_CAPACITY>>,
}

/// A GPIO output. Starts low, as `platform::init` leaves every pin.
pub struct SimPin<'a> {
	journal: &'a Journal,
	pin: Pin,
	high: bool,
}

/// A core's three compare timers.
pub struct SimTimers<'a> {
	journal: &'a Journal,
	armed: [bool; 3],
}

/// A core's interrupt-enable register.
pub struct SimInterrupts<'a> {
	journal: &'a Journal,
	enabled: u32,
}

/// Core 1's control registers.
pub struct SimCoreControl<'a> {
	journal: &'a Journal,
}

/// The main core's view of the coprocessor.
pub struct SimCoprocessor<'a> {
	journal: &'a Journal,
}

/// The coprocessor's view of its own hardware.
pub struct SimAuxIo<'a> {
	journal: &'a Journal,
	out: u32,
}

/// The platform bring-up collaborator.
pub struct SimPlatform<'a> {
	journal: &'a Journal,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// How many operations a [`Journal`] holds.
pub const JOURNAL_CAPACITY: usize = 2048;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl Journal {
	/// An empty journal.
	pub const fn new() -> Journal {
		Journal {
			ops: RefCell::new(heapless::Vec::new()),
		}
	}

	/// Append an operation.
	///
	/// Panics when full; a test that writes this much is broken.
	pub fn record(&self, op: Op) {
		if self.ops.borrow_mut().push(op).is_err() {
			panic!("journal full");
		}
	}

	/// Everything recorded so far, oldest first.
	pub fn ops(&self) -> Ref<'_, [Op]> {
		Ref::map(self.ops.borrow(), |ops| ops.as_slice())
	}

	/// Forget everything recorded so far.
	pub fn clear(&self) {
		self.ops.borrow_mut().clear();
	}

	/// Every level written to `pin`, oldest first.
	pub fn pin_writes(&self, pin: Pin) -> impl Iterator<Item = bool> {
		let writes: heapless::Vec<bool, JOURNAL_CAPACITY> = self
			.ops
			.borrow()
			.iter()
			.filter_map(|op| match op {
				Op::PinWrite { pin: p, high } if *p == pin => Some(*high),
				_ => None,
			})
			.collect();
		writes.into_iter()
	}

	/// The last level written to `pin`, if it was ever written.
	pub fn pin_level(&self, pin: Pin) -> Option<bool> {
		self.pin_writes(pin).last()
	}

	/// How many times the coprocessor toggled `pin`.
	pub fn aux_toggles(&self, pin: RtcPin) -> usize {
		self.ops
			.borrow()
			.iter()
			.filter(|op| **op == Op::Aux(AuxStep::Toggle(pin)))
			.count()
	}
}

impl Default for Journal {
	fn default() -> Self {
		Journal::new()
	}
}

impl<'a> SimPin<'a> {
	/// A low output.
	pub fn new(journal: &'a Journal, pin: Pin) -> SimPin<'a> {
		SimPin {
			journal,
			pin,
			high: false,
		}
	}

	fn write(&mut self, high: bool) {
		self.high = high;
		self.journal.record(Op::PinWrite {
			pin: self.pin,
			high,
		});
	}
}

impl<'a> OutputPin for SimPin<'a> {
	type Error = Infallible;

	fn set_low(&mut self) -> Result<(), Infallible> {
		self.write(false);
		Ok(())
	}

	fn set_high(&mut self) -> Result<(), Infallible> {
		self.write(true);
		Ok(())
	}
}

impl<'a> ToggleableOutputPin for SimPin<'a> {
	type Error = Infallible;

	fn toggle(&mut self) -> Result<(), Infallible> {
		let high = !self.high;
		self.write(high);
		Ok(())
	}
}

impl<'a> SimTimers<'a> {
	/// Three disarmed timers.
	pub fn new(journal: &'a Journal) -> SimTimers<'a> {
		SimTimers {
			journal,
			armed: [false; 3],
		}
	}

	/// Is `timer` counting down?
	pub fn is_armed(&self, timer: TimerId) -> bool {
		self.armed[Self::slot(timer)]
	}

	/// Let `timer` run out.
	///
	/// Gives the level and cause the hardware would deliver, once per arm.
	/// A disarmed timer raises nothing.
	pub fn expire(&mut self, timer: TimerId) -> Option<(Level, Cause)> {
		let slot = Self::slot(timer);
		if self.armed[slot] {
			self.armed[slot] = false;
			Some((timer.level(), timer.cause()))
		} else {
			None
		}
	}

	fn slot(timer: TimerId) -> usize {
		match timer {
			TimerId::Timer0 => 0,
			TimerId::Timer1 => 1,
			TimerId::Timer2 => 2,
		}
	}
}

impl<'a> TimerPort for SimTimers<'a> {
	fn arm(&mut self, timer: TimerId, ticks: Ticks) {
		self.armed[Self::slot(timer)] = true;
		self.journal.record(Op::Arm {
			timer,
			ticks: ticks.ticks(),
		});
	}
}

impl<'a> SimInterrupts<'a> {
	/// Everything masked.
	pub fn new(journal: &'a Journal) -> SimInterrupts<'a> {
		SimInterrupts {
			journal,
			enabled: 0,
		}
	}

	/// The current enable mask.
	pub fn enabled(&self) -> u32 {
		self.enabled
	}
}

impl<'a> InterruptEnable for SimInterrupts<'a> {
	fn enable(&mut self, mask: u32) {
		self.enabled |= mask;
		self.journal.record(Op::InterruptEnable(mask));
	}
}

impl<'a> SimCoreControl<'a> {
	/// Core 1, stalled in reset.
	pub fn new(journal: &'a Journal) -> SimCoreControl<'a> {
		SimCoreControl { journal }
	}
}

impl<'a> CoreControl for SimCoreControl<'a> {
	fn release_stall(&mut self) {
		self.journal.record(Op::Core(CoreStep::ReleaseStall));
	}

	fn enable_clock(&mut self) {
		self.journal.record(Op::Core(CoreStep::EnableClock));
	}

	fn assert_reset(&mut self) {
		self.journal.record(Op::Core(CoreStep::AssertReset));
	}

	fn deassert_reset(&mut self) {
		self.journal.record(Op::Core(CoreStep::DeassertReset));
	}

	fn write_entry_address(&mut self, address: u32) {
		self.journal.record(Op::Core(CoreStep::EntryAddress(address)));
	}
}

impl<'a> SimCoprocessor<'a> {
	/// A coprocessor that hasn't been started.
	pub fn new(journal: &'a Journal) -> SimCoprocessor<'a> {
		SimCoprocessor { journal }
	}
}

impl<'a> CoprocessorControl for SimCoprocessor<'a> {
	fn load_program(&mut self, image: &[u8]) {
		self.journal
			.record(Op::Coprocessor(CoprocessorStep::LoadProgram(image.len())));
	}

	fn set_reset(&mut self, asserted: bool) {
		self.journal
			.record(Op::Coprocessor(CoprocessorStep::Reset(asserted)));
	}

	fn select_riscv(&mut self) {
		self.journal
			.record(Op::Coprocessor(CoprocessorStep::SelectRiscv));
	}

	fn enable_clock(&mut self) {
		self.journal
			.record(Op::Coprocessor(CoprocessorStep::EnableClock));
	}

	fn start(&mut self) {
		self.journal.record(Op::Coprocessor(CoprocessorStep::Start));
	}

	fn raise_software_interrupt(&mut self) {
		self.journal
			.record(Op::Coprocessor(CoprocessorStep::SoftwareInterrupt));
	}
}

impl<'a> SimAuxIo<'a> {
	/// All RTC outputs low.
	pub fn new(journal: &'a Journal) -> SimAuxIo<'a> {
		SimAuxIo { journal, out: 0 }
	}

	/// Current level of `pin`.
	pub fn is_high(&self, pin: RtcPin) -> bool {
		self.out & pin.mask() != 0
	}
}

impl<'a> AuxIo for SimAuxIo<'a> {
	fn configure_output(&mut self, pin: RtcPin) {
		self.out &= !pin.mask();
		self.journal.record(Op::Aux(AuxStep::ConfigureOutput(pin)));
	}

	fn toggle(&mut self, pin: RtcPin) {
		self.out ^= pin.mask();
		self.journal.record(Op::Aux(AuxStep::Toggle(pin)));
	}

	fn set_timer(&mut self, ticks: u32) {
		self.journal.record(Op::Aux(AuxStep::SetTimer(ticks)));
	}

	fn enable_software_interrupt(&mut self) {
		self.journal.record(Op::Aux(AuxStep::EnableSoftwareInterrupt));
	}

	fn trigger_software_interrupt(&mut self) {
		self.journal
			.record(Op::Aux(AuxStep::TriggerSoftwareInterrupt));
	}

	fn clear_software_interrupt(&mut self) {
		self.journal.record(Op::Aux(AuxStep::ClearSoftwareInterrupt));
	}
}

impl<'a> SimPlatform<'a> {
	/// A chip fresh out of reset.
	pub fn new(journal: &'a Journal) -> SimPlatform<'a> {
		SimPlatform { journal }
	}
}

impl<'a> Platform for SimPlatform<'a> {
	fn disable_watchdogs(&mut self) {
		self.journal
			.record(Op::Platform(PlatformStep::DisableWatchdogs));
	}

	fn init_clocks(&mut self) {
		self.journal.record(Op::Platform(PlatformStep::InitClocks));
	}

	fn init_outputs(&mut self) {
		self.journal.record(Op::Platform(PlatformStep::InitOutputs));
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
