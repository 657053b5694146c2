//! # ESP32-S3 Bring-up Firmware
//!
//! This is the firmware image. It:
//!
//! * disables the watchdogs and sets up the clocks and GPIOs,
//! * starts core 1 (and, if built with `coprocessor`, the ULP RISC-V),
//! * installs the five Xtensa level-interrupt handlers, and
//! * blinks one LED per core, with core 1 also cycling the WS2812 on GPIO48.
//!
//! Everything except the register access and the interrupt plumbing lives in
//! the `esp32s3_bringup` library, where it is tested on the host.

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

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

mod hw;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use defmt::*;
use defmt_rtt as _;
use esp_backtrace as _;
use xtensa_lx_rt::exception::Context;

use esp32s3_bringup::{
	app::CoreApp,
	boot,
	cell::HandlerCell,
	config,
	dispatch::{self, Cause, Level},
	indicator::Indicator,
	lock::{CoreLock, Entry},
	multicore::{EntryPoint, SecondaryCore},
	platform,
	port::CoreIdentity,
	ws2812::Ws2812,
};

use hw::{
	Core1Control, CpuTimers, Esp32s3Platform, GpioOutput, Identity, Interrupts, UlpControl,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// What each core runs, wired to the real hardware.
type App = CoreApp<CpuTimers, GpioOutput, GpioOutput>;

/// Core 1's stack.
#[repr(C, align(16))]
struct Stack([u32; CORE1_STACK_WORDS]);

/// Masks this core's interrupts by raising `PS.INTLEVEL` to 5, then takes
/// [`CS_LOCK`] to keep the other core out.
///
/// `INTENABLE` is left alone, so bits enabled inside the section stay
/// enabled after it. The logger is shared between the cores, so masking
/// alone is not enough.
struct MulticoreCriticalSection;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Firmware version, from `git describe`
const VERSION: &str = include_str!(concat!(env!("OUT_DIR"), "/version.txt"));

/// The ULP program, as placed by the build script.
#[cfg(feature = "coprocessor")]
static ULP_IMAGE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/ulp.bin"));

const CORE1_STACK_WORDS: usize = 2048;

static mut CORE1_STACK: Stack = Stack([0; CORE1_STACK_WORDS]);

/// Each core's components, indexed by core number. Only ever touched by
/// the core that owns the slot.
static APPS: [HandlerCell<App>; 2] = [HandlerCell::new(), HandlerCell::new()];

/// Held by whichever core is inside a critical section.
static CS_LOCK: CoreLock = CoreLock::new();

critical_section::set_impl!(MulticoreCriticalSection);

extern "C" {
	/// Start of the vector table, from the `xtensa-lx-rt` linker script.
	static _init_start: u32;
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// This is the entry-point for core 0. It is called by `xtensa-lx-rt` once
/// the `.bss` and `.data` sections have been initialised.
#[xtensa_lx_rt::entry]
fn main() -> ! {
	info!("esp32s3-bringup {} starting...", VERSION);

	platform::init(&mut Esp32s3Platform);

	let core = Identity.core_id();
	let mut app = App::new(
		CpuTimers,
		Indicator::new(
			core,
			config::LED_BLINK_PERIOD,
			GpioOutput::new(config::CORE0_LED),
			None,
		),
	);

	#[cfg(feature = "coprocessor")]
	let coprocessor = Some(boot::CoprocessorBoot {
		coprocessor: esp32s3_bringup::coprocessor::Coprocessor::new(UlpControl),
		image: ULP_IMAGE,
	});
	#[cfg(not(feature = "coprocessor"))]
	let coprocessor: Option<boot::CoprocessorBoot<'_, UlpControl>> = None;

	// Masked until the app is installed, so the first expiry can't find an
	// empty slot and go un-rearmed.
	critical_section::with(|_| {
		let started = boot::primary(
			&mut app,
			&mut Interrupts,
			SecondaryCore::new(Core1Control),
			EntryPoint::new(core1_start),
			coprocessor,
		);
		if let Err(e) = started {
			error!("Coprocessor not started: {}", e);
		}
		APPS[core.index()].install(app);
	});

	loop {
		core::hint::spin_loop();
	}
}

/// Where core 1 comes out of the boot ROM.
///
/// The ROM leaves us on its own stack with its own vector table, so swap
/// both before running anything else.
unsafe extern "C" fn core1_start() -> ! {
	let stack_top = core::ptr::addr_of_mut!(CORE1_STACK.0)
		.cast::<u32>()
		.add(CORE1_STACK_WORDS);
	xtensa_lx::set_stack_pointer(stack_top);
	xtensa_lx::set_vecbase(core::ptr::addr_of!(_init_start));
	core1_main()
}

#[inline(never)]
fn core1_main() -> ! {
	let core = Identity.core_id();
	let strip = if config::WS2812_ENABLED {
		Some(Ws2812::with_spacing(
			GpioOutput::new(config::WS2812_PIN),
			config::WS2812_WRITE_SPACING,
		))
	} else {
		None
	};
	let mut app = App::new(
		CpuTimers,
		Indicator::new(
			core,
			config::LED_BLINK_PERIOD,
			GpioOutput::new(config::CORE1_LED),
			strip,
		),
	);

	critical_section::with(|_| {
		boot::secondary(&mut app, &mut Interrupts);
		APPS[core.index()].install(app);
	});

	loop {
		core::hint::spin_loop();
	}
}

/// The body of all five level handlers.
///
/// An unassigned level stops here whether or not bring-up has finished.
/// The rest of the handler runs masked, so a higher level can't land on a
/// component the lower one is part way through with.
fn on_level(level: Level) {
	let cause = Cause::pending(
		level,
		xtensa_lx::interrupt::get(),
		xtensa_lx::interrupt::get_mask(),
	);
	if let Err(unassigned) = dispatch::decode(level, cause) {
		dispatch::fault(unassigned);
	}
	let core = Identity.core_id();
	critical_section::with(|_| match APPS[core.index()].borrow() {
		Some(mut app) => app.on_interrupt(level, cause),
		None => {
			warn!("Level {} interrupt on {} before bring-up", level.number(), core);
		}
	});
}

macro_rules! level_handler {
	($name:ident, $level:expr) => {
		#[no_mangle]
		#[link_section = ".rwtext"]
		extern "C" fn $name(_level: u32, _frame: &mut Context) {
			on_level($level);
		}
	};
}

level_handler!(__level_1_interrupt, Level::Level1);
level_handler!(__level_2_interrupt, Level::Level2);
level_handler!(__level_3_interrupt, Level::Level3);
level_handler!(__level_4_interrupt, Level::Level4);
level_handler!(__level_5_interrupt, Level::Level5);

unsafe impl critical_section::Impl for MulticoreCriticalSection {
	unsafe fn acquire() -> critical_section::RawRestoreState {
		let previous: u32;
		core::arch::asm!("rsil {0}, 5", out(reg) previous);
		let entry = CS_LOCK.acquire(Identity.core_id());
		entry.pack(previous)
	}

	unsafe fn release(state: critical_section::RawRestoreState) {
		let (entry, previous) = Entry::unpack(state);
		CS_LOCK.release(entry);
		core::arch::asm!("wsr.ps {0}", "rsync", in(reg) previous);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
