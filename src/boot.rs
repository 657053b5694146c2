//! Per-core boot sequences.
//!
//! What each core does between the runtime handing over and its idle loop.
//! Core 0 also starts everyone else.

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

use crate::app::CoreApp;
use crate::coprocessor::{Coprocessor, CoprocessorError};
use crate::multicore::{EntryPoint, SecondaryCore};
use crate::port::{CoprocessorControl, CoreControl, InterruptEnable, TimerPort};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The coprocessor, and the program to load into it.
pub struct CoprocessorBoot<'i, X> {
	/// The coprocessor's controls
	pub coprocessor: Coprocessor<X>,
	/// The program image, as linked for RTC slow memory
	pub image: &'i [u8],
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Every interrupt line. Levels with nothing assigned are enabled too, so a
/// stray cause there is caught and reported rather than lost.
pub const ALL_INTERRUPTS: u32 = u32::MAX;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Core 0's bring-up. The platform must already be initialised.
///
/// Returns once this core's timers are armed; the caller then idles. A
/// coprocessor image that can't be started doesn't stop the rest of
/// bring-up, but is handed back as an error.
pub fn primary<T, L, S, I, C, X>(
	app: &mut CoreApp<T, L, S>,
	interrupts: &mut I,
	secondary: SecondaryCore<C>,
	entry: EntryPoint,
	coprocessor: Option<CoprocessorBoot<'_, X>>,
) -> Result<(), CoprocessorError>
where
	T: TimerPort,
	L: OutputPin<Error = Infallible> + ToggleableOutputPin<Error = Infallible>,
	S: OutputPin<Error = Infallible>,
	I: InterruptEnable,
	C: CoreControl,
	X: CoprocessorControl,
{
	app.init_outputs();
	interrupts.enable(ALL_INTERRUPTS);

	secondary.launch(entry);

	let started = match coprocessor {
		Some(mut boot) => boot.coprocessor.start(boot.image),
		None => Ok(()),
	};

	arm(app);

	#[cfg(feature = "defmt")]
	defmt::info!("core {} alive", app.core());
	started
}

/// Core 1's bring-up. Same as core 0's, minus starting anyone.
pub fn secondary<T, L, S, I>(app: &mut CoreApp<T, L, S>, interrupts: &mut I)
where
	T: TimerPort,
	L: OutputPin<Error = Infallible> + ToggleableOutputPin<Error = Infallible>,
	S: OutputPin<Error = Infallible>,
	I: InterruptEnable,
{
	app.init_outputs();
	interrupts.enable(ALL_INTERRUPTS);
	arm(app);

	#[cfg(feature = "defmt")]
	defmt::info!("core {} alive", app.core());
}

fn arm<T, L, S>(app: &mut CoreApp<T, L, S>)
where
	T: TimerPort,
	L: OutputPin<Error = Infallible> + ToggleableOutputPin<Error = Infallible>,
	S: OutputPin<Error = Infallible>,
{
	app.start_ticks(false);
	app.start();
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{CORE0_LED, CORE1_LED, LED_BLINK_PERIOD, WS2812_PIN};
	use crate::indicator::Indicator;
	use crate::port::CoreId;
	use crate::sim::{
		CoprocessorStep, CoreStep, Journal, Op, SimCoprocessor, SimCoreControl, SimInterrupts,
		SimPin, SimTimers,
	};
	use crate::timer::TimerId;
	use crate::ws2812::Ws2812;

	fn position(journal: &Journal, wanted: Op) -> usize {
		journal
			.ops()
			.iter()
			.position(|op| *op == wanted)
			.unwrap()
	}

	#[test]
	fn primary_orders_its_steps() {
		let journal = Journal::new();
		let mut app: CoreApp<_, _, SimPin> = CoreApp::new(
			SimTimers::new(&journal),
			Indicator::new(
				CoreId::Core0,
				LED_BLINK_PERIOD,
				SimPin::new(&journal, CORE0_LED),
				None,
			),
		);
		let mut interrupts = SimInterrupts::new(&journal);
		let image = [0u8; 64];

		let started = primary(
			&mut app,
			&mut interrupts,
			SecondaryCore::new(SimCoreControl::new(&journal)),
			EntryPoint::from_address(0x4037_0400),
			Some(CoprocessorBoot {
				coprocessor: Coprocessor::new(SimCoprocessor::new(&journal)),
				image: &image,
			}),
		);
		assert_eq!(started, Ok(()));

		let led = position(
			&journal,
			Op::PinWrite {
				pin: CORE0_LED,
				high: true,
			},
		);
		let enable = position(&journal, Op::InterruptEnable(ALL_INTERRUPTS));
		let handoff = position(&journal, Op::Core(CoreStep::EntryAddress(0x4037_0400)));
		let load = position(&journal, Op::Coprocessor(CoprocessorStep::LoadProgram(64)));
		let blink = position(
			&journal,
			Op::Arm {
				timer: TimerId::Timer1,
				ticks: LED_BLINK_PERIOD.ticks(),
			},
		);
		assert!(led < enable);
		assert!(enable < handoff);
		assert!(handoff < load);
		assert!(load < blink);
		assert_eq!(interrupts.enabled(), u32::MAX);
		assert!(app.timers().is_armed(TimerId::Timer2));
		assert!(!app.timers().is_armed(TimerId::Timer0));
	}

	#[test]
	fn primary_without_coprocessor() {
		let journal = Journal::new();
		let mut app: CoreApp<_, _, SimPin> = CoreApp::new(
			SimTimers::new(&journal),
			Indicator::new(
				CoreId::Core0,
				LED_BLINK_PERIOD,
				SimPin::new(&journal, CORE0_LED),
				None,
			),
		);
		let started = primary::<_, _, _, _, _, SimCoprocessor>(
			&mut app,
			&mut SimInterrupts::new(&journal),
			SecondaryCore::new(SimCoreControl::new(&journal)),
			EntryPoint::from_address(0x4037_0400),
			None,
		);
		assert_eq!(started, Ok(()));
		assert!(!journal
			.ops()
			.iter()
			.any(|op| matches!(op, Op::Coprocessor(_))));
	}

	#[test]
	fn empty_coprocessor_image_still_brings_the_core_up() {
		let journal = Journal::new();
		let mut app: CoreApp<_, _, SimPin> = CoreApp::new(
			SimTimers::new(&journal),
			Indicator::new(
				CoreId::Core0,
				LED_BLINK_PERIOD,
				SimPin::new(&journal, CORE0_LED),
				None,
			),
		);
		let started = primary(
			&mut app,
			&mut SimInterrupts::new(&journal),
			SecondaryCore::new(SimCoreControl::new(&journal)),
			EntryPoint::from_address(0x4037_0400),
			Some(CoprocessorBoot {
				coprocessor: Coprocessor::new(SimCoprocessor::new(&journal)),
				image: &[],
			}),
		);
		assert_eq!(started, Err(CoprocessorError::EmptyImage));
		assert!(!journal
			.ops()
			.iter()
			.any(|op| matches!(op, Op::Coprocessor(_))));
		assert!(app.timers().is_armed(TimerId::Timer1));
		assert_eq!(journal.pin_level(CORE0_LED), Some(true));
	}

	#[test]
	fn secondary_starts_nobody() {
		let journal = Journal::new();
		let mut app = CoreApp::new(
			SimTimers::new(&journal),
			Indicator::new(
				CoreId::Core1,
				LED_BLINK_PERIOD,
				SimPin::new(&journal, CORE1_LED),
				Some(Ws2812::new(SimPin::new(&journal, WS2812_PIN))),
			),
		);
		let mut interrupts = SimInterrupts::new(&journal);
		secondary(&mut app, &mut interrupts);

		assert_eq!(journal.pin_level(CORE1_LED), Some(true));
		assert_eq!(interrupts.enabled(), u32::MAX);
		assert!(app.timers().is_armed(TimerId::Timer1));
		assert!(!journal
			.ops()
			.iter()
			.any(|op| matches!(op, Op::Core(_) | Op::Coprocessor(_))));
		// The strip is idle until the first expiry
		assert_eq!(journal.pin_writes(WS2812_PIN).count(), 0);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
