//! Interrupt dispatch.
//!
//! The LX7 delivers every interrupt at a fixed priority level, and each level
//! has one handler slot. The slot receives a bitmask of which interrupts at
//! that level are pending and enabled; this module turns that mask into
//! exactly one downstream [`Event`].
//!
//! Levels 2 and 4 have nothing wired to them. A cause arriving there means
//! the interrupt setup is wrong, and the only sensible thing to do about it
//! is stop where a debugger can see it.
//!
//! Dispatch owns no state. Arbitration between levels is done by the
//! hardware; a handler here only has to test its bit, call through, and
//! return.

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

use crate::timer::TimerId;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// An interrupt priority level with its own handler slot.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
	/// Lowest priority.
	Level1,
	/// Unassigned.
	Level2,
	/// LED timer.
	Level3,
	/// Unassigned.
	Level4,
	/// Highest priority we use.
	Level5,
}

impl Level {
	/// All five levels, lowest priority first.
	pub const ALL: [Level; 5] = [
		Level::Level1,
		Level::Level2,
		Level::Level3,
		Level::Level4,
		Level::Level5,
	];

	/// Map the number the vector code passes us to a level.
	pub const fn from_number(level: u32) -> Option<Level> {
		match level {
			1 => Some(Level::Level1),
			2 => Some(Level::Level2),
			3 => Some(Level::Level3),
			4 => Some(Level::Level4),
			5 => Some(Level::Level5),
			_ => None,
		}
	}

	/// The level as a number.
	pub const fn number(self) -> u32 {
		match self {
			Level::Level1 => 1,
			Level::Level2 => 2,
			Level::Level3 => 3,
			Level::Level4 => 4,
			Level::Level5 => 5,
		}
	}

	/// Which of the 32 interrupt numbers the ESP32-S3 configuration wires to
	/// this level.
	pub const fn mask(self) -> u32 {
		match self {
			Level::Level1 => 0b0000_0000_0000_0110_0011_0111_1111_1111,
			Level::Level2 => 0b0000_0000_0011_1000_0000_0000_0000_0000,
			Level::Level3 => 0b0010_1000_1100_0000_1000_1000_0000_0000,
			Level::Level4 => 0b0101_0011_0000_0000_0000_0000_0000_0000,
			Level::Level5 => 0b1000_0100_0000_0001_0000_0000_0000_0000,
		}
	}
}

/// The pending-interrupt bitmask handed to a level handler.
///
/// Bit `n` is interrupt number `n`. It is only meaningful on the core that
/// read it.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cause(u32);

impl Cause {
	/// Wrap a raw mask.
	pub const fn from_bits(bits: u32) -> Cause {
		Cause(bits)
	}

	/// Build the mask a level handler sees from the `INTERRUPT` and
	/// `INTENABLE` special registers.
	pub const fn pending(level: Level, interrupt: u32, intenable: u32) -> Cause {
		Cause(interrupt & intenable & level.mask())
	}

	/// The raw mask.
	pub const fn bits(self) -> u32 {
		self.0
	}

	/// Is any bit of `other` set in us?
	pub const fn contains(self, other: Cause) -> bool {
		self.0 & other.0 != 0
	}
}

/// Work a level handler passes on.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
	/// Timer 0 expired.
	MicrosecondTick,
	/// Timer 1 expired.
	Indicator,
	/// Timer 2 expired.
	MillisecondTick,
}

impl Event {
	/// The timer behind this event.
	pub const fn timer(self) -> TimerId {
		match self {
			Event::MicrosecondTick => TimerId::Timer0,
			Event::Indicator => TimerId::Timer1,
			Event::MillisecondTick => TimerId::Timer2,
		}
	}
}

/// A cause arrived at a level with no assigned meaning.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnassignedLevel {
	/// Where it arrived.
	pub level: Level,
	/// What arrived.
	pub cause: Cause,
}

/// Something that can carry out the work a level handler decodes.
pub trait EventSink {
	/// Handle one event. Must not block.
	fn handle(&mut self, event: Event);
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The one event each assigned level recognises. `None` means unassigned.
const ROUTES: [Option<Event>; 5] = [
	Some(Event::MicrosecondTick),
	None,
	Some(Event::Indicator),
	None,
	Some(Event::MillisecondTick),
];

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Decode what a level handler should do about `cause`.
///
/// `Ok(None)` is an assigned level woken by something it doesn't recognise;
/// the handler returns without doing anything.
pub const fn decode(level: Level, cause: Cause) -> Result<Option<Event>, UnassignedLevel> {
	match ROUTES[level.number() as usize - 1] {
		None => Err(UnassignedLevel { level, cause }),
		Some(event) => {
			if cause.contains(event.timer().cause()) {
				Ok(Some(event))
			} else {
				Ok(None)
			}
		}
	}
}

/// The body of every level handler.
///
/// Routes a recognised cause to `sink`, ignores an unrecognised cause on an
/// assigned level, and never returns for an unassigned level.
pub fn dispatch<S: EventSink>(level: Level, cause: Cause, sink: &mut S) {
	match decode(level, cause) {
		Ok(Some(event)) => sink.handle(event),
		Ok(None) => {}
		Err(unassigned) => fault(unassigned),
	}
}

/// Stop here, forever.
#[cold]
pub fn fault(unassigned: UnassignedLevel) -> ! {
	#[cfg(feature = "defmt")]
	defmt::error!(
		"Interrupt at unassigned level {}, cause {:08x}",
		unassigned.level.number(),
		unassigned.cause.bits()
	);
	let _ = unassigned;
	loop {
		core::hint::spin_loop();
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
