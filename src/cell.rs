//! Handler-owned state.
//!
//! Components live in `static`s so the interrupt handlers can find them, but
//! each one belongs to exactly one core and is only ever touched by that
//! core's handlers, which run to completion and never re-enter. So there is
//! nothing to wait for: a second borrow while the first is live is a bug, and
//! we panic rather than mask interrupts or spin.

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

use atomic_polyfill::{AtomicBool, Ordering};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A slot for one component, filled once at bring-up.
///
/// Starts empty. [`HandlerCell::install`] puts the component in;
/// [`HandlerCell::borrow`] gets it back out for the length of one handler.
pub struct HandlerCell<T> {
	busy: AtomicBool,
	value: core::cell::UnsafeCell<Option<T>>,
}

impl<T> HandlerCell<T> {
	/// Create an empty cell.
	pub const fn new() -> HandlerCell<T> {
		HandlerCell {
			busy: AtomicBool::new(false),
			value: core::cell::UnsafeCell::new(None),
		}
	}

	/// Put the component in, replacing whatever was there.
	///
	/// Panics if the cell is borrowed.
	pub fn install(&self, value: T) {
		let mut guard = self.lock();
		*guard = Some(value);
	}

	/// Borrow the component.
	///
	/// Returns `None` if nothing has been installed yet, which is what an
	/// interrupt that beats bring-up sees. Panics if already borrowed.
	pub fn borrow(&self) -> Option<HandlerGuard<'_, T>> {
		let guard = self.lock();
		if guard.is_some() {
			Some(HandlerGuard { inner: guard })
		} else {
			None
		}
	}

	fn lock(&self) -> SlotGuard<'_, T> {
		if self
			.busy
			.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
			.is_err()
		{
			panic!("handler state re-entered");
		}
		SlotGuard { parent: self }
	}
}

impl<T> Default for HandlerCell<T> {
	fn default() -> Self {
		HandlerCell::new()
	}
}

unsafe impl<T: Send> Sync for HandlerCell<T> {}

/// The whole slot, locked. Unlocked on drop.
struct SlotGuard<'a, T> {
	parent: &'a HandlerCell<T>,
}

impl<'a, T> Drop for SlotGuard<'a, T> {
	fn drop(&mut self) {
		self.parent.busy.store(false, Ordering::Release);
	}
}

impl<'a, T> core::ops::Deref for SlotGuard<'a, T> {
	type Target = Option<T>;

	fn deref(&self) -> &Self::Target {
		unsafe { &*self.parent.value.get() }
	}
}

impl<'a, T> core::ops::DerefMut for SlotGuard<'a, T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		unsafe { &mut *self.parent.value.get() }
	}
}

/// An installed component, borrowed. Released on drop.
pub struct HandlerGuard<'a, T> {
	inner: SlotGuard<'a, T>,
}

impl<'a, T> core::ops::Deref for HandlerGuard<'a, T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		match self.inner.as_ref() {
			Some(value) => value,
			None => unreachable!(),
		}
	}
}

impl<'a, T> core::ops::DerefMut for HandlerGuard<'a, T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		match self.inner.as_mut() {
			Some(value) => value,
			None => unreachable!(),
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
