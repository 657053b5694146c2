//! Both cores brought up against simulated hardware, then left to blink.

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

use std::cell::Cell;
use std::convert::Infallible;

use embedded_hal::digital::v2::OutputPin;

use esp32s3_bringup::{
	app::CoreApp,
	boot,
	cell::HandlerCell,
	config::{
		APB_FREQ_HZ, AUX_SOFTWARE_LED, AUX_TIMER_LED, CORE0_LED, CORE1_LED, LED_BLINK_PERIOD,
		WS2812_PIN,
	},
	coprocessor::{AuxCause, AuxProgram, Coprocessor},
	dispatch::Level,
	indicator::Indicator,
	multicore::{EntryPoint, SecondaryCore},
	platform,
	sim::{
		CoreStep, Journal, Op, PlatformStep, SimAuxIo, SimCoprocessor, SimCoreControl,
		SimInterrupts, SimPin, SimPlatform, SimTimers,
	},
	timer::{CalibratedDelay, TimerId},
	ws2812::{decode_frame, RGBColour, Ws2812, WRITES_PER_FRAME},
	CoreId,
};

type SimApp<'a> = CoreApp<SimTimers<'a>, SimPin<'a>, MaskedPin<'a>>;

/// The WS2812 data line. Every write must happen inside a critical section.
struct MaskedPin<'a>(SimPin<'a>);

/// Counts how deeply the calling thread is nested in critical sections.
struct CountingCriticalSection;

std::thread_local! {
	static DEPTH: Cell<u32> = Cell::new(0);
}

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

impl<'a> OutputPin for MaskedPin<'a> {
	type Error = Infallible;

	fn set_low(&mut self) -> Result<(), Infallible> {
		assert!(DEPTH.with(|depth| depth.get()) >= 1, "WS2812 written unmasked");
		self.0.set_low()
	}

	fn set_high(&mut self) -> Result<(), Infallible> {
		assert!(DEPTH.with(|depth| depth.get()) >= 1, "WS2812 written unmasked");
		self.0.set_high()
	}
}

unsafe extern "C" fn core1_entry() -> ! {
	loop {
		core::hint::spin_loop();
	}
}

fn core0(journal: &Journal) -> SimApp<'_> {
	CoreApp::new(
		SimTimers::new(journal),
		Indicator::new(
			CoreId::Core0,
			LED_BLINK_PERIOD,
			SimPin::new(journal, CORE0_LED),
			None,
		),
	)
}

fn core1(journal: &Journal) -> SimApp<'_> {
	CoreApp::new(
		SimTimers::new(journal),
		Indicator::new(
			CoreId::Core1,
			LED_BLINK_PERIOD,
			SimPin::new(journal, CORE1_LED),
			Some(Ws2812::new(MaskedPin(SimPin::new(journal, WS2812_PIN)))),
		),
	)
}

/// Let the blink timer run out and deliver the interrupt.
fn blink(app: &mut SimApp<'_>) {
	let (level, cause) = app
		.timers()
		.expire(TimerId::Timer1)
		.expect("blink timer not armed");
	assert_eq!(level, Level::Level3);
	app.on_interrupt(level, cause);
}

#[test]
fn both_cores_come_up_in_order() {
	let journal = Journal::new();
	let mut app0 = core0(&journal);
	let mut app1 = core1(&journal);

	platform::init(&mut SimPlatform::new(&journal));
	let started = boot::primary(
		&mut app0,
		&mut SimInterrupts::new(&journal),
		SecondaryCore::new(SimCoreControl::new(&journal)),
		EntryPoint::new(core1_entry),
		Some(boot::CoprocessorBoot {
			coprocessor: Coprocessor::new(SimCoprocessor::new(&journal)),
			image: &[0x13, 0x00, 0x00, 0x00],
		}),
	);
	assert_eq!(started, Ok(()));
	boot::secondary(&mut app1, &mut SimInterrupts::new(&journal));

	let ops = journal.ops();
	assert_eq!(ops[0], Op::Platform(PlatformStep::DisableWatchdogs));
	let core_steps: Vec<CoreStep> = ops
		.iter()
		.filter_map(|op| match op {
			Op::Core(step) => Some(*step),
			_ => None,
		})
		.collect();
	assert_eq!(
		core_steps,
		vec![
			CoreStep::ReleaseStall,
			CoreStep::EnableClock,
			CoreStep::AssertReset,
			CoreStep::DeassertReset,
			CoreStep::EntryAddress(EntryPoint::new(core1_entry).address()),
		]
	);
	drop(ops);

	assert_eq!(journal.pin_level(CORE0_LED), Some(true));
	assert_eq!(journal.pin_level(CORE1_LED), Some(true));
}

#[test]
fn blink_cadence_and_colours() {
	let journal = Journal::new();
	let mut app = core1(&journal);
	boot::secondary(&mut app, &mut SimInterrupts::new(&journal));

	// 40,000,000 ticks at 80 MHz is half a second between toggles
	assert_eq!(LED_BLINK_PERIOD.ticks(), 40_000_000);
	assert_eq!(APB_FREQ_HZ, 80_000_000);
	assert_eq!(LED_BLINK_PERIOD.to_millis(), 500);

	let mut colours = Vec::new();
	let mut levels = Vec::new();
	for _ in 0..3 {
		journal.clear();
		blink(&mut app);
		let frame: Vec<bool> = journal.pin_writes(WS2812_PIN).collect();
		assert_eq!(frame.len(), WRITES_PER_FRAME);
		colours.push(decode_frame(&frame).expect("frame should decode"));
		levels.push(journal.pin_level(CORE1_LED).expect("LED not written"));
	}

	assert_eq!(
		colours,
		vec![
			RGBColour::from_24bit(0x00, 0x40, 0x00),
			RGBColour::from_24bit(0x40, 0x00, 0x00),
			RGBColour::from_24bit(0x00, 0x00, 0x40),
		]
	);
	// Bring-up left the LED high, so it goes low, high, low
	assert_eq!(levels, vec![false, true, false]);
	assert_eq!(DEPTH.with(|depth| depth.get()), 0);
}

#[test]
#[should_panic(expected = "WS2812 written unmasked")]
fn unmasked_strip_write_is_caught() {
	let journal = Journal::new();
	let mut pin = MaskedPin(SimPin::new(&journal, WS2812_PIN));
	let _ = pin.set_high();
}

#[test]
fn one_arm_one_dispatch() {
	let journal = Journal::new();
	let mut app = core0(&journal);
	app.start();

	for _ in 0..5 {
		// Exactly one interrupt per arm; the handler's re-arm allows the next
		assert!(app.timers().is_armed(TimerId::Timer1));
		blink(&mut app);
	}
	let toggles = journal.pin_writes(CORE0_LED).count();
	assert_eq!(toggles, 5);

	// Without the handler's re-arm, nothing more arrives
	let (level, cause) = app.timers().expire(TimerId::Timer1).unwrap();
	assert!(app.timers().expire(TimerId::Timer1).is_none());
	app.on_interrupt(level, cause);
	assert_eq!(journal.pin_writes(CORE0_LED).count(), 6);
}

#[test]
fn cores_are_independent() {
	let journal = Journal::new();
	let mut app0 = core0(&journal);
	let mut app1 = core1(&journal);
	app0.start();
	app1.start();

	blink(&mut app0);
	blink(&mut app0);
	assert_eq!(journal.pin_writes(CORE1_LED).count(), 0);
	assert_eq!(journal.pin_writes(WS2812_PIN).count(), 0);
	assert!(app1.timers().is_armed(TimerId::Timer1));
}

#[test]
fn handler_cell_holds_the_app() {
	let journal = Journal::new();
	let cell: HandlerCell<SimApp<'_>> = HandlerCell::new();
	assert!(cell.borrow().is_none());

	let mut app = core0(&journal);
	app.start();
	cell.install(app);

	for _ in 0..2 {
		let mut app = cell.borrow().expect("installed");
		blink(&mut app);
	}
	assert_eq!(journal.pin_writes(CORE0_LED).count(), 2);
}

#[test]
fn coprocessor_blinks_two_ways() {
	let journal = Journal::new();
	let mut program =
		AuxProgram::with_timing(SimAuxIo::new(&journal), CalibratedDelay::new(16), 1_000);
	program.init();

	// Four idle passes, with the timer running out after every second one
	for pass in 0..4 {
		program.idle_step();
		let mut cause = 1 << 31;
		if pass % 2 == 1 {
			cause |= 0x1;
		}
		program.on_interrupt(AuxCause::from_bits(cause));
	}

	assert_eq!(journal.aux_toggles(AUX_SOFTWARE_LED), 4);
	assert_eq!(journal.aux_toggles(AUX_TIMER_LED), 2);
	assert!(!program.io().is_high(AUX_SOFTWARE_LED));
	assert!(!program.io().is_high(AUX_TIMER_LED));
}
