//! The coprocessor's own peripherals, for the program that runs on it.
//!
//! The registers are only touched when built for the ULP RISC-V
//! (`--features ulp` on a `riscv32` target). The coprocessor sees its RTC
//! peripherals at low addresses, not at the `0x6000_xxxx` addresses the main
//! cores use.

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

// Host builds only check the register map
#![cfg_attr(not(target_arch = "riscv32"), allow(dead_code))]

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

#[cfg(target_arch = "riscv32")]
use crate::port::AuxIo;
use crate::port::RtcPin;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// RTC GPIO, the software interrupt and the countdown timer, as seen from
/// the coprocessor.
#[cfg(target_arch = "riscv32")]
pub struct UlpIo;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const RTC_GPIO_BASE: usize = 0xA400;
const RTC_CNTL_BASE: usize = 0x8000;
const SENS_BASE: usize = 0xC800;

const RTC_GPIO_OUT: usize = RTC_GPIO_BASE + 0x00;
const RTC_GPIO_ENABLE: usize = RTC_GPIO_BASE + 0x0C;
/// `RTC_GPIO_PINn` are one word apart from here.
const RTC_GPIO_PIN0: usize = RTC_GPIO_BASE + 0x28;
/// `RTC_IO_RTC_PADn` are one word apart from here.
const RTC_IO_PAD0: usize = RTC_GPIO_BASE + 0x84;
/// Route the pad to the RTC side rather than the GPIO matrix.
const PAD_MUX_SEL: u32 = 1 << 19;

const RTC_CNTL_COCPU_CTRL: usize = RTC_CNTL_BASE + 0x104;
const COCPU_SW_INT_TRIGGER: u32 = 1 << 26;

const SENS_SAR_COCPU_INT_ENA: usize = SENS_BASE + 0xEC;
const SENS_SAR_COCPU_INT_CLR: usize = SENS_BASE + 0xF4;
const COCPU_SW_INT: u32 = 1 << 7;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// `RTC_GPIO_PINn` for `pin`.
const fn pin_register(pin: RtcPin) -> usize {
	RTC_GPIO_PIN0 + pin.number() as usize * 4
}

/// `RTC_IO_RTC_PADn` for `pin`.
const fn pad_register(pin: RtcPin) -> usize {
	RTC_IO_PAD0 + pin.number() as usize * 4
}

#[cfg(target_arch = "riscv32")]
fn read(address: usize) -> u32 {
	// Safety: only ever called with the register addresses above
	unsafe { (address as *const u32).read_volatile() }
}

#[cfg(target_arch = "riscv32")]
fn write(address: usize, value: u32) {
	// Safety: only ever called with the register addresses above
	unsafe { (address as *mut u32).write_volatile(value) }
}

#[cfg(target_arch = "riscv32")]
fn set_bits(address: usize, bits: u32) {
	write(address, read(address) | bits);
}

#[cfg(target_arch = "riscv32")]
impl AuxIo for UlpIo {
	fn configure_output(&mut self, pin: RtcPin) {
		set_bits(pad_register(pin), PAD_MUX_SEL);
		write(pin_register(pin), 0);
		write(RTC_GPIO_OUT, read(RTC_GPIO_OUT) & !pin.mask());
		set_bits(RTC_GPIO_ENABLE, pin.mask());
	}

	fn toggle(&mut self, pin: RtcPin) {
		write(RTC_GPIO_OUT, read(RTC_GPIO_OUT) ^ pin.mask());
	}

	/// Loads the core's own countdown with the custom `timer zero, a0`
	/// instruction, which the assembler doesn't know.
	fn set_timer(&mut self, ticks: u32) {
		// Safety: only reloads the countdown
		unsafe {
			core::arch::asm!(".word 0x0A05600B", in("a0") ticks, options(nomem, nostack));
		}
	}

	fn enable_software_interrupt(&mut self) {
		set_bits(SENS_SAR_COCPU_INT_ENA, COCPU_SW_INT);
	}

	fn trigger_software_interrupt(&mut self) {
		set_bits(RTC_CNTL_COCPU_CTRL, COCPU_SW_INT_TRIGGER);
	}

	fn clear_software_interrupt(&mut self) {
		set_bits(SENS_SAR_COCPU_INT_CLR, COCPU_SW_INT);
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
