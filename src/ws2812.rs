//! # Bit-banged WS2812 driver
//!
//! The WS2812 takes 24 bits (green, red, blue, each most-significant bit
//! first) on a single wire. Every bit is a high pulse followed by a low gap,
//! and the LED tells a one from a zero by how long the line stays high:
//!
//! ```text
//!        one:  ‾‾‾‾‾‾‾‾‾‾‾‾|___        three writes high, one low
//!        zero: ‾‾‾‾|___________        one write high, three low
//! ```
//!
//! There is no RMT or SPI helping us here. Each symbol is exactly four writes
//! to the output register, each followed by the same short spin, and one
//! write plus its spin is the time unit. The firmware's spin is
//! [`WS2812_WRITE_SPACING`](crate::config::WS2812_WRITE_SPACING), which also
//! shows where its length comes from. That only works at the core clock
//! `platform::init` selects, and only if nothing lands between two writes.
//! So the whole frame goes out inside a critical section. The LED latches
//! the colour once the line has been low for a while, which the next expiry
//! is a long way from disturbing.

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
use embedded_hal::digital::v2::OutputPin;

use crate::infallible;
use crate::timer::CalibratedDelay;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Represents a 24-bit colour value.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RGBColour {
	/// Red channel
	pub red: u8,
	/// Green channel
	pub green: u8,
	/// Blue channel
	pub blue: u8,
}

impl RGBColour {
	/// Black (LED off)
	pub const BLACK: RGBColour = RGBColour::from_24bit(0x00, 0x00, 0x00);

	/// Make an [`RGBColour`] from a 24-bit RGB triplet.
	pub const fn from_24bit(red: u8, green: u8, blue: u8) -> RGBColour {
		RGBColour { red, green, blue }
	}

	/// The three channel bytes in the order the WS2812 wants them.
	pub const fn wire_order(self) -> [u8; 3] {
		[self.green, self.red, self.blue]
	}

	/// The inverse of [`RGBColour::wire_order`].
	pub const fn from_wire_order(bytes: [u8; 3]) -> RGBColour {
		RGBColour::from_24bit(bytes[1], bytes[0], bytes[2])
	}
}

/// Which colour the indicator shows next.
///
/// Cycles green, red, blue, green... one step per timer expiry. Each colour
/// is a single channel at a quarter brightness, which is plenty at arm's
/// length.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ColourPhase {
	/// Phase 0
	#[default]
	Green,
	/// Phase 1
	Red,
	/// Phase 2
	Blue,
}

impl ColourPhase {
	/// Channel value for whichever channel is lit.
	pub const INTENSITY: u8 = 0x40;

	/// The phase after this one.
	pub const fn next(self) -> ColourPhase {
		match self {
			ColourPhase::Green => ColourPhase::Red,
			ColourPhase::Red => ColourPhase::Blue,
			ColourPhase::Blue => ColourPhase::Green,
		}
	}

	/// 0, 1 or 2.
	pub const fn index(self) -> u8 {
		match self {
			ColourPhase::Green => 0,
			ColourPhase::Red => 1,
			ColourPhase::Blue => 2,
		}
	}

	/// The colour sent to the LED in this phase.
	pub const fn colour(self) -> RGBColour {
		match self {
			ColourPhase::Green => RGBColour::from_24bit(0, ColourPhase::INTENSITY, 0),
			ColourPhase::Red => RGBColour::from_24bit(ColourPhase::INTENSITY, 0, 0),
			ColourPhase::Blue => RGBColour::from_24bit(0, 0, ColourPhase::INTENSITY),
		}
	}
}

/// One WS2812 on one output pin.
pub struct Ws2812<P> {
	pin: P,
	spacing: CalibratedDelay,
}

/// Why a captured trace isn't a frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
	/// A frame is exactly [`WRITES_PER_FRAME`] writes.
	WrongLength(usize),
	/// The symbol at this index had neither one nor three high writes, or
	/// didn't start high and end low.
	BadSymbol(usize),
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Line writes per bit.
pub const WRITES_PER_SYMBOL: usize = 4;

/// Bits per frame.
pub const SYMBOLS_PER_FRAME: usize = 24;

/// Line writes per frame.
pub const WRITES_PER_FRAME: usize = WRITES_PER_SYMBOL * SYMBOLS_PER_FRAME;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<P> Ws2812<P>
where
	P: OutputPin<Error = Infallible>,
{
	/// Take ownership of the data line, with no padding between writes. It
	/// should already be low.
	pub fn new(pin: P) -> Ws2812<P> {
		Ws2812::with_spacing(pin, CalibratedDelay::NONE)
	}

	/// Take ownership of the data line, spinning for `spacing` after every
	/// write.
	pub fn with_spacing(pin: P, spacing: CalibratedDelay) -> Ws2812<P> {
		Ws2812 { pin, spacing }
	}

	/// Send one colour.
	///
	/// Runs with interrupts masked on this core, for about 100 writes.
	pub fn write(&mut self, colour: RGBColour) {
		critical_section::with(|_cs| {
			for byte in colour.wire_order() {
				self.write_byte(byte);
			}
		});
	}

	#[inline(always)]
	fn write_byte(&mut self, byte: u8) {
		for bit in (0..8).rev() {
			if byte & (1 << bit) != 0 {
				self.one();
			} else {
				self.zero();
			}
		}
	}

	#[inline(always)]
	fn one(&mut self) {
		self.high();
		self.high();
		self.high();
		self.low();
	}

	#[inline(always)]
	fn zero(&mut self) {
		self.high();
		self.low();
		self.low();
		self.low();
	}

	#[inline(always)]
	fn high(&mut self) {
		infallible(self.pin.set_high());
		self.spacing.spin();
	}

	#[inline(always)]
	fn low(&mut self) {
		infallible(self.pin.set_low());
		self.spacing.spin();
	}
}

/// Turn a captured sequence of line writes back into the colour it carries.
///
/// `levels` is every write to the data line for one frame, `true` for high,
/// in order.
pub fn decode_frame(levels: &[bool]) -> Result<RGBColour, DecodeError> {
	if levels.len() != WRITES_PER_FRAME {
		return Err(DecodeError::WrongLength(levels.len()));
	}
	let mut bytes = [0u8; 3];
	for (index, symbol) in levels.chunks_exact(WRITES_PER_SYMBOL).enumerate() {
		let bit = match symbol {
			[true, true, true, false] => 1,
			[true, false, false, false] => 0,
			_ => return Err(DecodeError::BadSymbol(index)),
		};
		bytes[index / 8] = (bytes[index / 8] << 1) | bit;
	}
	Ok(RGBColour::from_wire_order(bytes))
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::nesting;
	use crate::port::Pin;
	use crate::sim::{Journal, SimPin};
	use std::cell::RefCell;

	const DATA: Pin = Pin::new(48);

	fn send(colour: RGBColour) -> std::vec::Vec<bool> {
		let journal = Journal::new();
		let mut led = Ws2812::new(SimPin::new(&journal, DATA));
		led.write(colour);
		journal.pin_writes(DATA).collect()
	}

	#[test]
	fn phases_cycle() {
		let mut phase = ColourPhase::default();
		for n in 0..30u8 {
			assert_eq!(phase.index(), n % 3);
			phase = phase.next();
		}
	}

	#[test]
	fn green_frame_is_0x40_0x00_0x00_on_the_wire() {
		let levels = send(ColourPhase::Green.colour());
		assert_eq!(levels.len(), WRITES_PER_FRAME);

		let zero = [true, false, false, false];
		let one = [true, true, true, false];
		let symbols: std::vec::Vec<&[bool]> = levels.chunks(WRITES_PER_SYMBOL).collect();
		// 0x40 is 0b0100_0000: only the second symbol is a one
		assert_eq!(symbols[0], zero);
		assert_eq!(symbols[1], one);
		for symbol in &symbols[2..] {
			assert_eq!(*symbol, zero);
		}
	}

	#[test]
	fn symbol_duty_cycles() {
		// Green is sent first, so only the middle byte is zeros
		let levels = send(RGBColour::from_wire_order([0xFF, 0x00, 0xFF]));
		for (index, symbol) in levels.chunks(WRITES_PER_SYMBOL).enumerate() {
			let high = symbol.iter().filter(|level| **level).count();
			let expected = if (8..16).contains(&index) { 1 } else { 3 };
			assert_eq!(high, expected, "symbol {}", index);
			assert_eq!(symbol[0], true);
			assert_eq!(symbol[3], false);
		}
	}

	#[test]
	fn every_phase_decodes_to_its_colour() {
		let expected = [
			RGBColour::from_wire_order([0x40, 0x00, 0x00]),
			RGBColour::from_wire_order([0x00, 0x40, 0x00]),
			RGBColour::from_wire_order([0x00, 0x00, 0x40]),
		];
		let mut phase = ColourPhase::Green;
		for colour in expected {
			assert_eq!(decode_frame(&send(phase.colour())), Ok(colour));
			phase = phase.next();
		}
	}

	#[test]
	fn arbitrary_colour_decodes() {
		let colour = RGBColour::from_24bit(0x12, 0xA5, 0x7E);
		assert_eq!(decode_frame(&send(colour)), Ok(colour));
	}

	#[test]
	fn short_trace_is_rejected() {
		let levels = send(RGBColour::BLACK);
		assert_eq!(
			decode_frame(&levels[..WRITES_PER_FRAME - 1]),
			Err(DecodeError::WrongLength(WRITES_PER_FRAME - 1))
		);
	}

	/// Remembers how deep in critical sections it was at every write.
	struct NestingPin<'a> {
		depths: &'a RefCell<std::vec::Vec<u32>>,
	}

	impl<'a> OutputPin for NestingPin<'a> {
		type Error = Infallible;

		fn set_low(&mut self) -> Result<(), Infallible> {
			self.depths.borrow_mut().push(nesting::depth());
			Ok(())
		}

		fn set_high(&mut self) -> Result<(), Infallible> {
			self.depths.borrow_mut().push(nesting::depth());
			Ok(())
		}
	}

	#[test]
	fn whole_frame_is_one_critical_section() {
		let depths = RefCell::new(std::vec::Vec::new());
		let mut led = Ws2812::new(NestingPin { depths: &depths });
		assert_eq!(nesting::depth(), 0);
		led.write(ColourPhase::Blue.colour());
		assert_eq!(nesting::depth(), 0);
		drop(led);

		let depths = depths.into_inner();
		assert_eq!(depths.len(), WRITES_PER_FRAME);
		assert!(depths.iter().all(|depth| *depth == 1));
	}

	#[test]
	fn spacing_leaves_the_frame_alone() {
		let journal = Journal::new();
		let colour = RGBColour::from_24bit(0x3C, 0x81, 0x07);
		let mut led = Ws2812::with_spacing(
			SimPin::new(&journal, DATA),
			crate::config::WS2812_WRITE_SPACING,
		);
		led.write(colour);
		let levels: std::vec::Vec<bool> = journal.pin_writes(DATA).collect();
		assert_eq!(levels, send(colour));
		assert_eq!(decode_frame(&levels), Ok(colour));
	}

	#[test]
	fn corrupted_symbol_is_rejected() {
		let mut levels = send(RGBColour::BLACK);
		// Symbol 5 now has two high writes
		levels[5 * WRITES_PER_SYMBOL + 1] = true;
		assert_eq!(decode_frame(&levels), Err(DecodeError::BadSymbol(5)));
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
