//! ESP32-S3 register access.
//!
//! The real implementations of the library's peripheral ports. Everything
//! here is a raw volatile access to a fixed address; there is no PAC for the
//! handful of registers we need.

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

use esp32s3_bringup::config::ULP_MEMORY_SIZE;
use esp32s3_bringup::platform::Platform;
use esp32s3_bringup::port::{
	CoprocessorControl, CoreControl, CoreId, CoreIdentity, InterruptEnable, Pin, TimerPort,
};
use esp32s3_bringup::timer::{Ticks, TimerId};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One 32-bit memory-mapped register.
#[derive(Copy, Clone)]
struct Reg(usize);

/// A GPIO driven through the `OUT`/`OUT1` set and clear registers.
pub struct GpioOutput {
	pin: Pin,
}

/// The three `CCOMPAREn` registers of whichever core holds this.
///
/// Zero-sized; each core makes its own, and each only ever touches its own
/// core's special registers.
pub struct CpuTimers;

/// This core's `INTENABLE`.
pub struct Interrupts;

/// Reads `PRID`.
pub struct Identity;

/// Core 1's stall, clock, reset and boot-address controls.
pub struct Core1Control;

/// The ULP RISC-V controls in `RTC_CNTL`.
pub struct UlpControl;

/// Watchdogs, clocks and GPIO directions.
pub struct Esp32s3Platform;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const SYSTEM_BASE: usize = 0x600C_0000;
const RTC_CNTL_BASE: usize = 0x6000_8000;
const GPIO_BASE: usize = 0x6000_4000;
const TIMG0_BASE: usize = 0x6001_F000;

/// Where the ULP program is loaded and runs from. It is address 0 to the
/// coprocessor.
const RTC_SLOW_MEM: usize = 0x5000_0000;

const SYSTEM_CORE_1_CONTROL_0: Reg = Reg(SYSTEM_BASE + 0x00);
const SYSTEM_CORE_1_CONTROL_1: Reg = Reg(SYSTEM_BASE + 0x04);
const SYSTEM_CPU_PERI_CLK_EN: Reg = Reg(SYSTEM_BASE + 0x08);
const SYSTEM_SYSCLK_CONF: Reg = Reg(SYSTEM_BASE + 0x60);

const CONTROL_CORE_1_RUNSTALL: u32 = 1 << 0;
const CONTROL_CORE_1_CLKGATE_EN: u32 = 1 << 1;
const CONTROL_CORE_1_RESETING: u32 = 1 << 2;

const RTC_CNTL_OPTIONS0: Reg = Reg(RTC_CNTL_BASE + 0x00);
const RTC_CNTL_WDTCONFIG1: Reg = Reg(RTC_CNTL_BASE + 0x9C);
const RTC_CNTL_SWD_CONF: Reg = Reg(RTC_CNTL_BASE + 0xB4);
const RTC_CNTL_SWD_WPROTECT: Reg = Reg(RTC_CNTL_BASE + 0xB8);
const RTC_CNTL_SW_CPU_STALL: Reg = Reg(RTC_CNTL_BASE + 0xBC);
const RTC_CNTL_ULP_CP_TIMER: Reg = Reg(RTC_CNTL_BASE + 0xF8);
const RTC_CNTL_COCPU_CTRL: Reg = Reg(RTC_CNTL_BASE + 0x104);

const SW_STALL_APPCPU_C0: u32 = 0b11;
const SW_STALL_APPCPU_C1: u32 = 0b11_1111 << 20;
const SWD_DISABLE: u32 = 1 << 30;
const SWD_WKEY: u32 = 0x8F1D_312A;
const ULP_CP_SLP_TIMER_EN: u32 = 1 << 31;

const COCPU_CLK_FO: u32 = 1 << 0;
const COCPU_SHUT_RESET_EN: u32 = 1 << 22;
const COCPU_SEL: u32 = 1 << 23;
const COCPU_SW_INT_TRIGGER: u32 = 1 << 26;
const COCPU_CLKGATE_EN: u32 = 1 << 27;

const GPIO_OUT: [Reg; 2] = [Reg(GPIO_BASE + 0x04), Reg(GPIO_BASE + 0x10)];
const GPIO_OUT_W1TS: [Reg; 2] = [Reg(GPIO_BASE + 0x08), Reg(GPIO_BASE + 0x14)];
const GPIO_OUT_W1TC: [Reg; 2] = [Reg(GPIO_BASE + 0x0C), Reg(GPIO_BASE + 0x18)];
const GPIO_ENABLE_W1TS: [Reg; 2] = [Reg(GPIO_BASE + 0x24), Reg(GPIO_BASE + 0x30)];

const TIMG0_WDTCONFIG0: Reg = Reg(TIMG0_BASE + 0x48);
const TIMG0_WDTWPROTECT: Reg = Reg(TIMG0_BASE + 0x64);
const TIMG_WDT_WKEY: u32 = 0x50D8_3AA1;

/// `CPU_PERI_CLK_EN`: every CPU peripheral clock on.
const CPU_PERI_CLOCKS: u32 = 7;
/// `SYSCLK_CONF`: PLL as the system clock, no pre-divider.
const SYSCLK_PLL: u32 = 0x401;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl Reg {
	fn read(self) -> u32 {
		// Safety: every `Reg` names a register of this chip
		unsafe { (self.0 as *const u32).read_volatile() }
	}

	fn write(self, value: u32) {
		// Safety: every `Reg` names a register of this chip
		unsafe { (self.0 as *mut u32).write_volatile(value) }
	}

	fn set_bits(self, bits: u32) {
		self.write(self.read() | bits);
	}

	fn clear_bits(self, bits: u32) {
		self.write(self.read() & !bits);
	}
}

impl GpioOutput {
	/// Take `pin`. [`Platform::init_outputs`] has already made it an output.
	pub fn new(pin: Pin) -> GpioOutput {
		GpioOutput { pin }
	}
}

impl OutputPin for GpioOutput {
	type Error = Infallible;

	fn set_low(&mut self) -> Result<(), Infallible> {
		GPIO_OUT_W1TC[self.pin.bank()].write(self.pin.mask());
		Ok(())
	}

	fn set_high(&mut self) -> Result<(), Infallible> {
		GPIO_OUT_W1TS[self.pin.bank()].write(self.pin.mask());
		Ok(())
	}
}

impl ToggleableOutputPin for GpioOutput {
	type Error = Infallible;

	/// Both cores write `OUT`. Toggling through the set and clear registers
	/// only ever changes our own bit, so they can't undo each other's.
	fn toggle(&mut self) -> Result<(), Infallible> {
		if GPIO_OUT[self.pin.bank()].read() & self.pin.mask() != 0 {
			GPIO_OUT_W1TC[self.pin.bank()].write(self.pin.mask());
		} else {
			GPIO_OUT_W1TS[self.pin.bank()].write(self.pin.mask());
		}
		Ok(())
	}
}

impl TimerPort for CpuTimers {
	/// `CCOUNT` runs at the CPU clock, which [`Esp32s3Platform`] sets to the
	/// APB rate, so a period in APB ticks is also a period in cycles.
	fn arm(&mut self, timer: TimerId, ticks: Ticks) {
		let deadline = xtensa_lx::timer::get_cycle_count().wrapping_add(ticks.ticks());
		match timer {
			TimerId::Timer0 => xtensa_lx::timer::set_ccompare0(deadline),
			TimerId::Timer1 => xtensa_lx::timer::set_ccompare1(deadline),
			TimerId::Timer2 => xtensa_lx::timer::set_ccompare2(deadline),
		}
	}
}

impl InterruptEnable for Interrupts {
	fn enable(&mut self, mask: u32) {
		// Safety: the handlers for every level are installed before this runs
		unsafe {
			xtensa_lx::interrupt::enable_mask(mask);
		}
	}
}

impl CoreIdentity for Identity {
	fn core_id(&self) -> CoreId {
		CoreId::from_prid(xtensa_lx::get_processor_id())
	}
}

impl CoreControl for Core1Control {
	fn release_stall(&mut self) {
		RTC_CNTL_OPTIONS0.clear_bits(SW_STALL_APPCPU_C0);
		RTC_CNTL_SW_CPU_STALL.clear_bits(SW_STALL_APPCPU_C1);
		SYSTEM_CORE_1_CONTROL_0.clear_bits(CONTROL_CORE_1_RUNSTALL);
	}

	fn enable_clock(&mut self) {
		SYSTEM_CORE_1_CONTROL_0.set_bits(CONTROL_CORE_1_CLKGATE_EN);
	}

	fn assert_reset(&mut self) {
		SYSTEM_CORE_1_CONTROL_0.set_bits(CONTROL_CORE_1_RESETING);
	}

	fn deassert_reset(&mut self) {
		SYSTEM_CORE_1_CONTROL_0.clear_bits(CONTROL_CORE_1_RESETING);
	}

	fn write_entry_address(&mut self, address: u32) {
		SYSTEM_CORE_1_CONTROL_1.write(address);
	}
}

impl CoprocessorControl for UlpControl {
	/// `Coprocessor::start` has already checked the image fits.
	fn load_program(&mut self, image: &[u8]) {
		for (offset, byte) in image.iter().take(ULP_MEMORY_SIZE).enumerate() {
			// Safety: offset is inside RTC slow memory, which nothing else
			// uses while the coprocessor is held in reset
			unsafe { ((RTC_SLOW_MEM + offset) as *mut u8).write_volatile(*byte) }
		}
	}

	fn set_reset(&mut self, asserted: bool) {
		if asserted {
			RTC_CNTL_COCPU_CTRL.set_bits(COCPU_SHUT_RESET_EN);
		} else {
			RTC_CNTL_COCPU_CTRL.clear_bits(COCPU_SHUT_RESET_EN);
		}
	}

	fn select_riscv(&mut self) {
		RTC_CNTL_COCPU_CTRL.clear_bits(COCPU_SEL);
	}

	fn enable_clock(&mut self) {
		RTC_CNTL_COCPU_CTRL.set_bits(COCPU_CLK_FO | COCPU_CLKGATE_EN);
	}

	fn start(&mut self) {
		RTC_CNTL_ULP_CP_TIMER.set_bits(ULP_CP_SLP_TIMER_EN);
	}

	fn raise_software_interrupt(&mut self) {
		RTC_CNTL_COCPU_CTRL.set_bits(COCPU_SW_INT_TRIGGER);
	}
}

impl Platform for Esp32s3Platform {
	fn disable_watchdogs(&mut self) {
		RTC_CNTL_SWD_WPROTECT.write(SWD_WKEY);
		RTC_CNTL_WDTCONFIG1.write(0);
		RTC_CNTL_SWD_CONF.write(SWD_DISABLE);
		RTC_CNTL_SWD_WPROTECT.write(0);

		TIMG0_WDTWPROTECT.write(TIMG_WDT_WKEY);
		TIMG0_WDTCONFIG0.write(0);
		TIMG0_WDTWPROTECT.write(0);
	}

	fn init_clocks(&mut self) {
		SYSTEM_CPU_PERI_CLK_EN.write(CPU_PERI_CLOCKS);
		SYSTEM_SYSCLK_CONF.write(SYSCLK_PLL);
	}

	fn init_outputs(&mut self) {
		for bank in 0..2 {
			GPIO_ENABLE_W1TS[bank].write(0xFFFF_FFFF);
			GPIO_OUT[bank].write(0);
		}
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
