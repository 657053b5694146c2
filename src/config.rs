//! Build-time configuration.
//!
//! Nothing here is read at run-time. Change a value, rebuild, reflash.

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

use crate::port::{Pin, RtcPin};
use crate::timer::{CalibratedDelay, Ticks};

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The APB clock, which is what the CPU timers count in.
///
/// `platform::init` sets the clock tree up to give this. If you change the
/// clock tree, every [`Ticks`] value below changes meaning with it.
pub const APB_FREQ_HZ: u32 = 80_000_000;

/// Time between two LED toggles.
///
/// Half a second, so each LED completes one on/off cycle per second.
pub const LED_BLINK_PERIOD: Ticks = Ticks::from_ticks(APB_FREQ_HZ / 2);

/// Period of the microsecond tick counter.
pub const SYSTICK_US_PERIOD: Ticks = Ticks::from_ticks(APB_FREQ_HZ / 1_000_000);

/// Period of the millisecond tick counter.
pub const SYSTICK_MS_PERIOD: Ticks = Ticks::from_ticks(APB_FREQ_HZ / 1_000);

/// The LED toggled by core 0.
pub const CORE0_LED: Pin = Pin::new(7);

/// The LED toggled by core 1.
pub const CORE1_LED: Pin = Pin::new(6);

/// The data line of the on-board WS2812.
pub const WS2812_PIN: Pin = Pin::new(48);

/// Padding after every write to the WS2812 data line.
///
/// At 80 MHz a store to `OUT1_W1TS`/`OUT1_W1TC` takes about 5 cycles and a
/// trip round the delay loop about 4. Four trips make one write about 21
/// cycles, or 262 ns. So a zero is high for 262 ns and a one for 787 ns, in a
/// 1.05 µs bit. The datasheet windows are T0H 400 ± 150 ns, T1H 800 ± 150 ns
/// and a 1.25 ± 0.6 µs bit. These cycle counts are derived from the
/// instruction sequence, not measured, so check the line on a scope after
/// changing the clock or the compiler.
pub const WS2812_WRITE_SPACING: CalibratedDelay = CalibratedDelay::new(4);

/// Whether core 1 drives the WS2812.
pub const WS2812_ENABLED: bool = cfg!(feature = "ws2812");

/// Whether core 0 starts the coprocessor.
pub const COPROCESSOR_ENABLED: bool = cfg!(feature = "coprocessor");

/// RTC slow memory, which holds the whole coprocessor program. Core 0
/// refuses to start an image bigger than this.
pub const ULP_MEMORY_SIZE: usize = 8 * 1024;

/// Coprocessor timer reload, in coprocessor timer ticks.
///
/// Roughly 500 ms with the RTC fast clock the coprocessor runs from.
pub const AUX_TIMER_TIMEOUT: u32 = 0x0085_83B0;

/// Spin iterations between two self-raised software interrupts on the
/// coprocessor.
///
/// Also roughly 500 ms, but only as long as the coprocessor clock and the
/// loop's instruction count stay as they are.
pub const AUX_SPIN_COUNT: u32 = 0x0010_0000;

/// Coprocessor output toggled from its timer interrupt.
pub const AUX_TIMER_LED: RtcPin = RtcPin::new(18);

/// Coprocessor output toggled from its software interrupt.
pub const AUX_SOFTWARE_LED: RtcPin = RtcPin::new(17);

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blink_period_is_half_a_second() {
		let period: fugit::MillisDurationU32 = LED_BLINK_PERIOD.convert();
		assert_eq!(period.to_millis(), 500);
		assert_eq!(LED_BLINK_PERIOD.ticks(), 40_000_000);
	}

	#[test]
	fn ws2812_write_fits_the_bit_windows() {
		// Cycles per write, from the estimates above
		let cycles = 5 + 4 * WS2812_WRITE_SPACING.iterations();
		let write_ns = cycles * 1_000 / (APB_FREQ_HZ / 1_000_000);
		assert!((250..=550).contains(&write_ns), "T0H {} ns", write_ns);
		assert!((650..=950).contains(&(3 * write_ns)), "T1H {} ns", 3 * write_ns);
		assert!((650..=1850).contains(&(4 * write_ns)), "bit {} ns", 4 * write_ns);
	}

	#[test]
	fn tick_periods() {
		assert_eq!(SYSTICK_US_PERIOD.ticks(), 80);
		assert_eq!(SYSTICK_MS_PERIOD.ticks(), 80_000);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
