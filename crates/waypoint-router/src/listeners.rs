//! Listener registry.
//!
//! Used for resolution subscribers and by the in-memory adapters for
//! their event streams. Delivery takes a snapshot of the registered
//! listeners first, so listeners may subscribe or unsubscribe from inside
//! a callback. A panicking listener is logged and skipped; the remaining
//! listeners are still notified.

use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback registered for events of type `E`.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
	/// Creates an id from a raw value.
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw value.
	pub fn as_raw(&self) -> u64 {
		self.0
	}
}

/// A set of listeners for events of type `E`.
pub struct Listeners<E> {
	entries: Arc<RwLock<Vec<(ListenerId, Listener<E>)>>>,
	next_id: Arc<AtomicU64>,
}

impl<E> Clone for Listeners<E> {
	fn clone(&self) -> Self {
		Self {
			entries: Arc::clone(&self.entries),
			next_id: Arc::clone(&self.next_id),
		}
	}
}

impl<E> Default for Listeners<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E> std::fmt::Debug for Listeners<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Listeners")
			.field("count", &self.len())
			.finish()
	}
}

impl<E> Listeners<E> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			entries: Arc::new(RwLock::new(Vec::new())),
			next_id: Arc::new(AtomicU64::new(1)),
		}
	}

	/// Registers a listener.
	pub fn add(&self, listener: Listener<E>) -> ListenerId {
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.entries.write().push((id, listener));
		id
	}

	/// Removes a listener. Returns `false` if it was not registered.
	pub fn remove(&self, id: ListenerId) -> bool {
		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|(entry_id, _)| *entry_id != id);
		entries.len() != before
	}

	/// Number of registered listeners.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` if no listener is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Delivers an event to every listener registered at call time.
	pub fn emit(&self, event: &E) {
		self.deliver(self.snapshot(), event);
	}

	/// The listeners registered right now, for a later [`Listeners::deliver`].
	pub(crate) fn snapshot(&self) -> Vec<(ListenerId, Listener<E>)> {
		self.entries.read().clone()
	}

	/// Delivers an event to a snapshot, skipping listeners removed since.
	pub(crate) fn deliver(&self, snapshot: Vec<(ListenerId, Listener<E>)>, event: &E) {
		for (id, listener) in snapshot {
			// Skip listeners removed by an earlier callback of this delivery
			if !self.contains(id) {
				continue;
			}
			if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
				tracing::error!(listener = id.as_raw(), "listener panicked; continuing delivery");
			}
		}
	}

	fn contains(&self, id: ListenerId) -> bool {
		self.entries.read().iter().any(|(entry_id, _)| *entry_id == id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use rstest::rstest;

	#[rstest]
	fn test_emit_reaches_every_listener() {
		let listeners = Listeners::<i32>::new();
		let seen = Arc::new(Mutex::new(Vec::new()));

		for tag in ["a", "b"] {
			let seen = Arc::clone(&seen);
			listeners.add(Arc::new(move |v: &i32| seen.lock().push((tag, *v))));
		}
		listeners.emit(&7);

		let mut seen = seen.lock().clone();
		seen.sort();
		assert_eq!(seen, vec![("a", 7), ("b", 7)]);
	}

	#[rstest]
	fn test_removed_listener_is_not_called() {
		let listeners = Listeners::<()>::new();
		let calls = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&calls);
		let id = listeners.add(Arc::new(move |_| *counter.lock() += 1));

		assert!(listeners.remove(id));
		assert!(!listeners.remove(id));
		listeners.emit(&());
		assert_eq!(*calls.lock(), 0);
	}

	#[rstest]
	fn test_panicking_listener_does_not_block_others() {
		let listeners = Listeners::<()>::new();
		let calls = Arc::new(Mutex::new(0));
		listeners.add(Arc::new(|_| panic!("listener failure")));
		let counter = Arc::clone(&calls);
		listeners.add(Arc::new(move |_| *counter.lock() += 1));

		listeners.emit(&());
		assert_eq!(*calls.lock(), 1);
	}

	#[rstest]
	fn test_snapshot_excludes_later_listeners() {
		let listeners = Listeners::<i32>::new();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let early = Arc::clone(&seen);
		listeners.add(Arc::new(move |v: &i32| early.lock().push(("early", *v))));

		let snapshot = listeners.snapshot();
		let late = Arc::clone(&seen);
		listeners.add(Arc::new(move |v: &i32| late.lock().push(("late", *v))));
		listeners.deliver(snapshot, &1);

		assert_eq!(*seen.lock(), vec![("early", 1)]);
	}

	#[rstest]
	fn test_listener_can_unsubscribe_itself() {
		let listeners = Listeners::<()>::new();
		let calls = Arc::new(Mutex::new(0));
		let id_slot = Arc::new(Mutex::new(None));

		let registry = listeners.clone();
		let slot = Arc::clone(&id_slot);
		let counter = Arc::clone(&calls);
		let id = listeners.add(Arc::new(move |_| {
			*counter.lock() += 1;
			if let Some(id) = *slot.lock() {
				registry.remove(id);
			}
		}));
		*id_slot.lock() = Some(id);

		listeners.emit(&());
		listeners.emit(&());
		assert_eq!(*calls.lock(), 1);
		assert!(listeners.is_empty());
	}
}
