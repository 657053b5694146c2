//! The lock behind the firmware's critical section.
//!
//! Masking interrupts only keeps out the handlers of the core doing the
//! masking. The other core carries on, and the RTT logger both cores write
//! through is shared. So a critical section also takes this lock, a spinlock
//! that remembers which core holds it. The holding core may enter again (a
//! logging call inside a WS2812 frame inside a handler, say) and only the
//! outermost exit lets go.

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

use atomic_polyfill::{AtomicU32, Ordering};

use crate::port::CoreId;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A spinlock owned by one core at a time, re-entrant on that core.
pub struct CoreLock {
	owner: AtomicU32,
}

/// What [`CoreLock::acquire`] did.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Entry {
	/// The lock was free and is now ours. The matching release frees it.
	Outermost,
	/// We already held it. The matching release leaves it held.
	Nested,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Owner value meaning nobody.
const UNOWNED: u32 = u32::MAX;

/// Restore-state bit that marks an outermost entry. `PS` never uses it.
const OUTERMOST_BIT: u32 = 1 << 31;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl CoreLock {
	/// A free lock.
	pub const fn new() -> CoreLock {
		CoreLock {
			owner: AtomicU32::new(UNOWNED),
		}
	}

	/// Take the lock for `core`, spinning while the other core has it.
	///
	/// Call with this core's interrupts masked, or a handler could spin on
	/// a lock its own core holds.
	pub fn acquire(&self, core: CoreId) -> Entry {
		loop {
			if let Some(entry) = self.try_acquire(core) {
				return entry;
			}
			core::hint::spin_loop();
		}
	}

	/// Take the lock for `core` if nobody else has it.
	///
	/// Returns `None`, and changes nothing, while the other core holds it.
	pub fn try_acquire(&self, core: CoreId) -> Option<Entry> {
		let me = core.index() as u32;
		match self
			.owner
			.compare_exchange(UNOWNED, me, Ordering::Acquire, Ordering::Relaxed)
		{
			Ok(_) => Some(Entry::Outermost),
			// Only we ever store our own index, so a relaxed read of it is
			// enough to know we hold the lock
			Err(owner) if owner == me => Some(Entry::Nested),
			Err(_) => None,
		}
	}

	/// Undo one [`CoreLock::acquire`].
	pub fn release(&self, entry: Entry) {
		if entry == Entry::Outermost {
			self.owner.store(UNOWNED, Ordering::Release);
		}
	}

	/// Which core holds the lock right now.
	pub fn owner(&self) -> Option<CoreId> {
		match self.owner.load(Ordering::Relaxed) {
			0 => Some(CoreId::Core0),
			1 => Some(CoreId::Core1),
			_ => None,
		}
	}
}

impl Default for CoreLock {
	fn default() -> Self {
		CoreLock::new()
	}
}

impl Entry {
	/// Fold this entry into a saved `PS` value, giving one `u32` the
	/// `critical-section` crate can hand back to us on release.
	pub const fn pack(self, ps: u32) -> u32 {
		match self {
			Entry::Outermost => ps | OUTERMOST_BIT,
			Entry::Nested => ps & !OUTERMOST_BIT,
		}
	}

	/// Split a packed value back into the entry and the saved `PS`.
	pub const fn unpack(state: u32) -> (Entry, u32) {
		let entry = if state & OUTERMOST_BIT != 0 {
			Entry::Outermost
		} else {
			Entry::Nested
		};
		(entry, state & !OUTERMOST_BIT)
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn owner_may_enter_again() {
		let lock = CoreLock::new();
		assert_eq!(lock.owner(), None);

		let outer = lock.acquire(CoreId::Core0);
		let inner = lock.acquire(CoreId::Core0);
		assert_eq!(outer, Entry::Outermost);
		assert_eq!(inner, Entry::Nested);

		lock.release(inner);
		assert_eq!(lock.owner(), Some(CoreId::Core0));
		lock.release(outer);
		assert_eq!(lock.owner(), None);
	}

	#[test]
	fn other_core_waits_for_the_outermost_release() {
		let lock = CoreLock::new();
		let outer = lock.acquire(CoreId::Core1);
		let inner = lock.acquire(CoreId::Core1);

		assert_eq!(lock.try_acquire(CoreId::Core0), None);
		lock.release(inner);
		assert_eq!(lock.try_acquire(CoreId::Core0), None);
		assert_eq!(lock.owner(), Some(CoreId::Core1));

		lock.release(outer);
		assert_eq!(lock.try_acquire(CoreId::Core0), Some(Entry::Outermost));
		assert_eq!(lock.owner(), Some(CoreId::Core0));
	}

	#[test]
	fn saved_ps_survives_packing() {
		// INTLEVEL 3, EXCM, WOE
		let ps = 0x0004_0013;
		for entry in [Entry::Outermost, Entry::Nested] {
			assert_eq!(Entry::unpack(entry.pack(ps)), (entry, ps));
		}
	}

	#[test]
	fn cores_exclude_each_other() {
		use std::sync::atomic::AtomicU32 as StdAtomicU32;

		const ROUNDS: u32 = 10_000;
		let lock = CoreLock::new();
		// Read then written back as two separate steps, so any overlap
		// between the cores loses an increment
		let count = StdAtomicU32::new(0);

		std::thread::scope(|scope| {
			for core in [CoreId::Core0, CoreId::Core1] {
				let lock = &lock;
				let count = &count;
				scope.spawn(move || {
					for _ in 0..ROUNDS {
						let outer = lock.acquire(core);
						let inner = lock.acquire(core);
						let seen = count.load(std::sync::atomic::Ordering::Relaxed);
						std::thread::yield_now();
						count.store(seen + 1, std::sync::atomic::Ordering::Relaxed);
						lock.release(inner);
						lock.release(outer);
					}
				});
			}
		});

		assert_eq!(count.into_inner(), 2 * ROUNDS);
		assert_eq!(lock.owner(), None);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
