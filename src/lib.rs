//! # ESP32-S3 bring-up
//!
//! Brings both Xtensa LX7 cores and the ULP RISC-V coprocessor of an ESP32-S3
//! out of reset and keeps them busy blinking:
//!
//! * core 0 starts core 1 (and, optionally, the coprocessor),
//! * each core arms its private CPU timer 1 and toggles its own LED on every
//!   expiry,
//! * core 1 also sends a new colour to the WS2812 on GPIO48 every expiry,
//!   bit-banged with no peripheral assistance,
//! * the coprocessor toggles two RTC GPIOs, one from its timer interrupt and
//!   one from a software interrupt it raises on itself.
//!
//! Everything in this library talks to hardware through the traits in
//! [`port`], so the firmware binary provides register-backed ports and the
//! tests use the recording ports in `sim` (built for tests, or with the `sim`
//! feature).

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

pub mod app;
pub mod boot;
pub mod cell;
pub mod config;
pub mod coprocessor;
pub mod dispatch;
pub mod indicator;
pub mod lock;
pub mod multicore;
pub mod platform;
pub mod port;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod timer;
#[cfg(any(test, all(feature = "ulp", target_arch = "riscv32")))]
pub mod ulp;
pub mod ws2812;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

pub use port::CoreId;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Discharge the result of an `embedded-hal` pin operation that cannot fail.
#[inline(always)]
pub(crate) fn infallible(result: Result<(), core::convert::Infallible>) {
	if let Err(e) = result {
		match e {}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

/// A host critical section that keeps nothing out, but counts how deeply
/// the calling thread is nested inside one.
#[cfg(test)]
pub(crate) mod nesting {
	use std::cell::Cell;

	std::thread_local! {
		static DEPTH: Cell<u32> = Cell::new(0);
	}

	struct CountingCriticalSection;

	critical_section::set_impl!(CountingCriticalSection);

	unsafe impl critical_section::Impl for CountingCriticalSection {
		unsafe fn acquire() -> critical_section::RawRestoreState {
			DEPTH.with(|depth| depth.set(depth.get() + 1));
			Default::default()
		}

		unsafe fn release(_state: critical_section::RawRestoreState) {
			DEPTH.with(|depth| depth.set(depth.get() - 1));
		}
	}

	/// How many critical sections this thread is inside right now.
	pub(crate) fn depth() -> u32 {
		DEPTH.with(|depth| depth.get())
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
