//! In-memory history and document.
//!
//! [`MemoryHistory`] keeps an entry stack and a cursor like a browser tab
//! does. Traversals move the cursor immediately and deliver `popstate` on
//! a later turn (through the ambient executor, or synchronously when none
//! exists). Every mutation is journaled in [`MemoryHistory::calls`].

use super::{ClickEvent, ClickEvents, HistoryAdapter, Location, PopStateEvent};
use crate::error::RouterError;
use crate::listeners::{Listener, ListenerId, Listeners};
use crate::spawn;
use parking_lot::Mutex;
use serde_json::Value;

/// A history mutation recorded by [`MemoryHistory`].
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryCall {
	/// `pushState(state, title, href)`.
	Push {
		/// Entry state.
		state: Option<Value>,
		/// Title argument.
		title: String,
		/// Entry href.
		href: String,
	},
	/// `replaceState(state, title, href)`.
	Replace {
		/// Entry state.
		state: Option<Value>,
		/// Title argument.
		title: String,
		/// Entry href.
		href: String,
	},
	/// `go(delta)`.
	Go(i32),
}

impl HistoryCall {
	/// Shorthand for a push without state or title.
	pub fn push(href: impl Into<String>) -> Self {
		Self::Push {
			state: None,
			title: String::new(),
			href: href.into(),
		}
	}

	/// Shorthand for a replace without state or title.
	pub fn replace(href: impl Into<String>) -> Self {
		Self::Replace {
			state: None,
			title: String::new(),
			href: href.into(),
		}
	}
}

#[derive(Debug, Clone)]
struct Entry {
	href: String,
	state: Option<Value>,
}

#[derive(Debug)]
struct Stack {
	entries: Vec<Entry>,
	index: usize,
}

/// In-memory session history.
#[derive(Debug)]
pub struct MemoryHistory {
	origin: String,
	stack: Mutex<Stack>,
	calls: Mutex<Vec<HistoryCall>>,
	popstate: Listeners<PopStateEvent>,
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl MemoryHistory {
	/// Origin used when none is given.
	pub const DEFAULT_ORIGIN: &'static str = "http://localhost";

	/// Creates a history with a single entry at `path`.
	pub fn new(path: &str) -> Self {
		Self::with_origin(Self::DEFAULT_ORIGIN, path)
	}

	/// Creates a history for a specific origin.
	pub fn with_origin(origin: impl Into<String>, path: &str) -> Self {
		Self {
			origin: origin.into(),
			stack: Mutex::new(Stack {
				entries: vec![Entry {
					href: path.to_string(),
					state: None,
				}],
				index: 0,
			}),
			calls: Mutex::new(Vec::new()),
			popstate: Listeners::new(),
		}
	}

	/// Mutations recorded so far.
	pub fn calls(&self) -> Vec<HistoryCall> {
		self.calls.lock().clone()
	}

	/// Clears the mutation journal.
	pub fn clear_calls(&self) {
		self.calls.lock().clear();
	}

	/// Number of entries in the stack.
	pub fn len(&self) -> usize {
		self.stack.lock().entries.len()
	}

	/// Returns `true` if the stack has no entries. Never the case in practice.
	pub fn is_empty(&self) -> bool {
		self.stack.lock().entries.is_empty()
	}

	/// Cursor position in the stack.
	pub fn index(&self) -> usize {
		self.stack.lock().index
	}

	/// Href of the current entry, relative to the origin.
	pub fn current_href(&self) -> String {
		let stack = self.stack.lock();
		stack.entries[stack.index].href.clone()
	}

	/// Simulates the user pressing back/forward: moves the cursor and
	/// fires `popstate` without a recorded `go` call.
	pub fn traverse(&self, delta: i32) -> bool {
		self.move_cursor(delta)
	}

	fn move_cursor(&self, delta: i32) -> bool {
		let event = {
			let mut stack = self.stack.lock();
			let target = stack.index as i64 + i64::from(delta);
			if delta == 0 || target < 0 || target >= stack.entries.len() as i64 {
				return false;
			}
			stack.index = target as usize;
			PopStateEvent {
				state: stack.entries[stack.index].state.clone(),
			}
		};

		let listeners = self.popstate.clone();
		if spawn::can_spawn() {
			spawn::spawn_detached(async move { listeners.emit(&event) });
		} else {
			listeners.emit(&event);
		}
		true
	}
}

impl HistoryAdapter for MemoryHistory {
	fn push_state(&self, state: Option<&Value>, title: &str, href: &str) -> Result<(), RouterError> {
		self.calls.lock().push(HistoryCall::Push {
			state: state.cloned(),
			title: title.to_string(),
			href: href.to_string(),
		});

		let mut stack = self.stack.lock();
		let keep = stack.index + 1;
		stack.entries.truncate(keep);
		stack.entries.push(Entry {
			href: href.to_string(),
			state: state.cloned(),
		});
		stack.index = keep;
		Ok(())
	}

	fn replace_state(
		&self,
		state: Option<&Value>,
		title: &str,
		href: &str,
	) -> Result<(), RouterError> {
		self.calls.lock().push(HistoryCall::Replace {
			state: state.cloned(),
			title: title.to_string(),
			href: href.to_string(),
		});

		let mut stack = self.stack.lock();
		let index = stack.index;
		stack.entries[index] = Entry {
			href: href.to_string(),
			state: state.cloned(),
		};
		Ok(())
	}

	fn go(&self, delta: i32) {
		self.calls.lock().push(HistoryCall::Go(delta));
		self.move_cursor(delta);
	}

	fn location(&self) -> Location {
		Location::new(
			format!("{}{}", self.origin, self.current_href()),
			self.origin.clone(),
		)
	}

	fn state(&self) -> Option<Value> {
		let stack = self.stack.lock();
		stack.entries[stack.index].state.clone()
	}

	fn add_popstate_listener(&self, listener: Listener<PopStateEvent>) -> ListenerId {
		self.popstate.add(listener)
	}

	fn remove_popstate_listener(&self, id: ListenerId) {
		self.popstate.remove(id);
	}
}

/// In-memory click-event source.
#[derive(Debug, Default)]
pub struct MemoryDocument {
	clicks: Listeners<ClickEvent>,
}

impl MemoryDocument {
	/// Creates a document without listeners.
	pub fn new() -> Self {
		Self::default()
	}

	/// Dispatches a click synchronously. Returns `true` if a listener
	/// prevented the default action.
	pub fn click(&self, event: ClickEvent) -> bool {
		self.clicks.emit(&event);
		event.default_prevented()
	}

	/// Number of registered click listeners.
	pub fn listener_count(&self) -> usize {
		self.clicks.len()
	}
}

impl ClickEvents for MemoryDocument {
	fn add_click_listener(&self, listener: Listener<ClickEvent>) -> ListenerId {
		self.clicks.add(listener)
	}

	fn remove_click_listener(&self, id: ListenerId) {
		self.clicks.remove(id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::sync::Arc;

	#[rstest]
	fn test_push_truncates_forward_entries() {
		let history = MemoryHistory::new("/");
		history.push_state(None, "", "/a").unwrap();
		history.push_state(None, "", "/b").unwrap();
		history.traverse(-1);
		history.push_state(None, "", "/c").unwrap();

		assert_eq!(history.len(), 3);
		assert_eq!(history.current_href(), "/c");
	}

	#[rstest]
	fn test_replace_keeps_cursor() {
		let history = MemoryHistory::new("/");
		history
			.replace_state(Some(&json!({"k": 1})), "", "/x")
			.unwrap();

		assert_eq!(history.len(), 1);
		assert_eq!(history.state(), Some(json!({"k": 1})));
		assert_eq!(history.location().href, "http://localhost/x");
		assert_eq!(history.calls(), vec![HistoryCall::Replace {
			state: Some(json!({"k": 1})),
			title: String::new(),
			href: "/x".to_string(),
		}]);
	}

	#[rstest]
	fn test_go_without_entry_fires_nothing() {
		let history = MemoryHistory::new("/");
		let fired = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&fired);
		history.add_popstate_listener(Arc::new(move |_| *counter.lock() += 1));

		history.go(1);
		assert_eq!(*fired.lock(), 0);
		assert_eq!(history.calls(), vec![HistoryCall::Go(1)]);
	}

	#[rstest]
	fn test_go_without_runtime_fires_synchronously() {
		let history = MemoryHistory::new("/");
		history.push_state(Some(&json!("a")), "", "/a").unwrap();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		history.add_popstate_listener(Arc::new(move |e: &PopStateEvent| {
			sink.lock().push(e.state.clone())
		}));

		history.go(-1);
		assert_eq!(*seen.lock(), vec![None]);
		assert_eq!(history.current_href(), "/");
	}

	#[rstest]
	#[tokio::test]
	async fn test_go_with_runtime_fires_on_later_turn() {
		let history = MemoryHistory::new("/");
		history.push_state(None, "", "/a").unwrap();
		let (tx, rx) = futures::channel::oneshot::channel();
		let tx = Mutex::new(Some(tx));
		history.add_popstate_listener(Arc::new(move |_| {
			if let Some(tx) = tx.lock().take() {
				let _ = tx.send(());
			}
		}));

		history.go(-1);
		// The cursor moves immediately, the event arrives later
		assert_eq!(history.index(), 0);
		rx.await.unwrap();
	}

	#[rstest]
	fn test_document_click_reports_prevent_default() {
		let document = MemoryDocument::new();
		document.add_click_listener(Arc::new(|e: &ClickEvent| e.prevent_default()));
		assert!(document.click(ClickEvent::new(Vec::new())));
		assert_eq!(document.listener_count(), 1);
	}
}
