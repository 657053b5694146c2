//! # ESP32-S3 ULP RISC-V Program
//!
//! What the coprocessor runs once core 0 has loaded it into RTC slow memory
//! and let it out of reset. It toggles RTC GPIO 18 from its countdown timer
//! and RTC GPIO 17 from a software interrupt it raises on itself between
//! spins.
//!
//! Build it for the coprocessor and flatten it:
//!
//! ```console
//! $ cargo build --release --target riscv32imc-unknown-none-elf \
//!     --features ulp --bin esp32s3-bringup-ulp
//! $ riscv32-esp-elf-objcopy -O binary \
//!     target/riscv32imc-unknown-none-elf/release/esp32s3-bringup-ulp ulp.bin
//! ```
//!
//! then build the firmware with `ULP_IMAGE=ulp.bin` and `--features
//! coprocessor`.

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

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use panic_halt as _;

use esp32s3_bringup::coprocessor::{AuxCause, AuxProgram};
use esp32s3_bringup::ulp::UlpIo;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Masks every coprocessor interrupt. There is only one hart, so that is
/// all the exclusion there is to have.
struct SingleHartCriticalSection;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

critical_section::set_impl!(SingleHartCriticalSection);

// The core comes out of reset at 0 and takes interrupts at 0x10. The custom
// PicoRV32 instructions are spelt out as words:
//
//   0x0000C50B  getq a0, q1       (pending causes)
//   0x0400000B  retirq
//   0x0600600B  maskirq zero, zero
core::arch::global_asm!(
	r#"
	.section .text.vectors, "ax"
	.globl reset_vector
reset_vector:
	j __start

	.balign 16
irq_vector:
	addi sp, sp, -64
	sw ra, 0(sp)
	sw t0, 4(sp)
	sw t1, 8(sp)
	sw t2, 12(sp)
	sw a0, 16(sp)
	sw a1, 20(sp)
	sw a2, 24(sp)
	sw a3, 28(sp)
	sw a4, 32(sp)
	sw a5, 36(sp)
	sw a6, 40(sp)
	sw a7, 44(sp)
	sw t3, 48(sp)
	sw t4, 52(sp)
	sw t5, 56(sp)
	sw t6, 60(sp)
	.word 0x0000C50B
	call ulp_interrupt
	lw ra, 0(sp)
	lw t0, 4(sp)
	lw t1, 8(sp)
	lw t2, 12(sp)
	lw a0, 16(sp)
	lw a1, 20(sp)
	lw a2, 24(sp)
	lw a3, 28(sp)
	lw a4, 32(sp)
	lw a5, 36(sp)
	lw a6, 40(sp)
	lw a7, 44(sp)
	lw t3, 48(sp)
	lw t4, 52(sp)
	lw t5, 56(sp)
	lw t6, 60(sp)
	addi sp, sp, 64
	.word 0x0400000B

	.section .text, "ax"
__start:
	la sp, __stack_top
	la t0, __bss_start
	la t1, __bss_end
1:
	bgeu t0, t1, 2f
	sw zero, 0(t0)
	addi t0, t0, 4
	j 1b
2:
	.word 0x0600600B
	j ulp_main
"#
);

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Entered from `__start` with interrupts unmasked.
#[no_mangle]
extern "C" fn ulp_main() -> ! {
	let mut program = AuxProgram::new(UlpIo);
	program.init();
	loop {
		program.idle_step();
	}
}

/// Called from `irq_vector` with the pending cause bits.
///
/// The program keeps no state of its own, so a fresh one is as good as the
/// one in `ulp_main`.
#[no_mangle]
extern "C" fn ulp_interrupt(cause: u32) {
	AuxProgram::new(UlpIo).on_interrupt(AuxCause::from_bits(cause));
}

unsafe impl critical_section::Impl for SingleHartCriticalSection {
	unsafe fn acquire() -> critical_section::RawRestoreState {
		let previous: u32;
		// maskirq a0, a1
		core::arch::asm!(".word 0x0605E50B", in("a1") u32::MAX, lateout("a0") previous);
		previous
	}

	unsafe fn release(previous: critical_section::RawRestoreState) {
		// maskirq zero, a0
		core::arch::asm!(".word 0x0605600B", in("a0") previous);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
