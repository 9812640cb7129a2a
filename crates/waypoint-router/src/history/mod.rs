//! History and DOM event contracts.
//!
//! The router never touches browser globals directly. It talks to a
//! [`HistoryAdapter`] for push/replace/traversal and `popstate`, and to a
//! [`ClickEvents`] source for document-level anchor clicks. Browser
//! implementations live in `waypoint-web`; [`MemoryHistory`] and
//! [`MemoryDocument`] serve native hosts and tests.

mod memory;

pub use memory::{HistoryCall, MemoryDocument, MemoryHistory};

use crate::error::RouterError;
use crate::listeners::{Listener, ListenerId};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// The current document location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
	/// Absolute href.
	pub href: String,
	/// Origin (scheme, host and port).
	pub origin: String,
}

impl Location {
	/// Creates a location.
	pub fn new(href: impl Into<String>, origin: impl Into<String>) -> Self {
		Self {
			href: href.into(),
			origin: origin.into(),
		}
	}
}

/// Event fired when a history traversal lands on an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopStateEvent {
	/// State of the entry the traversal landed on.
	pub state: Option<Value>,
}

/// Session history primitives.
///
/// `go` must not deliver the resulting `popstate` synchronously; it fires
/// on a later turn, once the traversal lands. A traversal without a
/// matching entry fires nothing.
pub trait HistoryAdapter: Send + Sync {
	/// Pushes a new entry.
	fn push_state(&self, state: Option<&Value>, title: &str, href: &str) -> Result<(), RouterError>;

	/// Replaces the current entry.
	fn replace_state(&self, state: Option<&Value>, title: &str, href: &str)
	-> Result<(), RouterError>;

	/// Traverses by `delta` entries. Negative goes back.
	fn go(&self, delta: i32);

	/// Current location.
	fn location(&self) -> Location;

	/// State of the current entry.
	fn state(&self) -> Option<Value>;

	/// Registers a `popstate` listener.
	fn add_popstate_listener(&self, listener: Listener<PopStateEvent>) -> ListenerId;

	/// Removes a `popstate` listener.
	fn remove_popstate_listener(&self, id: ListenerId);
}

/// Document-level click events.
pub trait ClickEvents: Send + Sync {
	/// Registers a click listener.
	fn add_click_listener(&self, listener: Listener<ClickEvent>) -> ListenerId;

	/// Removes a click listener.
	fn remove_click_listener(&self, id: ListenerId);
}

/// An anchor element reached by a click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchor {
	/// Absolute href.
	pub href: String,
	/// Origin of the href.
	pub origin: String,
	/// Names of the attributes set on the anchor.
	pub attributes: Vec<String>,
	/// Value of the `target` attribute, if any.
	pub target: Option<String>,
	/// The anchor carries a `download` attribute.
	pub download: bool,
}

impl Anchor {
	/// Creates an anchor from an absolute href, deriving its origin.
	pub fn new(href: impl Into<String>) -> Self {
		let href = href.into();
		let origin = url::Url::parse(&href)
			.map(|u| u.origin().ascii_serialization())
			.unwrap_or_default();
		Self {
			href,
			origin,
			..Self::default()
		}
	}

	/// Adds an attribute name, such as a replace-mode marker.
	pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
		self.attributes.push(name.into());
		self
	}

	/// Whether the anchor carries the named attribute.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
	}

	/// Sets the `target` attribute.
	pub fn with_target(mut self, target: impl Into<String>) -> Self {
		self.target = Some(target.into());
		self
	}

	/// Sets the `download` attribute.
	pub fn with_download(mut self, download: bool) -> Self {
		self.download = download;
		self
	}
}

/// A node on a click's composed event path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventNode {
	/// An anchor element.
	Anchor(Anchor),
	/// Any other node.
	Other,
}

/// A click delivered to the document.
///
/// `path` is the composed event path, innermost node first, so anchors
/// inside shadow roots are visible.
#[derive(Debug, Default)]
pub struct ClickEvent {
	/// Composed event path.
	pub path: Vec<EventNode>,
	/// Mouse button (0 = primary).
	pub button: i16,
	/// Any of ctrl, meta, shift or alt was held.
	pub modifier: bool,
	default_prevented: AtomicBool,
}

impl ClickEvent {
	/// Creates a primary-button click with the given composed path.
	pub fn new(path: Vec<EventNode>) -> Self {
		Self {
			path,
			..Self::default()
		}
	}

	/// Creates a click whose target is the anchor itself.
	pub fn on_anchor(anchor: Anchor) -> Self {
		Self::new(vec![EventNode::Anchor(anchor)])
	}

	/// Sets the mouse button.
	pub fn with_button(mut self, button: i16) -> Self {
		self.button = button;
		self
	}

	/// Sets the modifier flag.
	pub fn with_modifier(mut self, modifier: bool) -> Self {
		self.modifier = modifier;
		self
	}

	/// Marks the event as already default-prevented.
	pub fn with_default_prevented(self) -> Self {
		self.prevent_default();
		self
	}

	/// First anchor on the composed path.
	pub fn anchor(&self) -> Option<&Anchor> {
		self.path.iter().find_map(|node| match node {
			EventNode::Anchor(anchor) => Some(anchor),
			EventNode::Other => None,
		})
	}

	/// Cancels the browser's default action.
	pub fn prevent_default(&self) {
		self.default_prevented.store(true, Ordering::SeqCst);
	}

	/// Whether the default action was cancelled.
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_anchor_derives_origin() {
		let anchor = Anchor::new("https://example.com:8443/foo?x=1");
		assert_eq!(anchor.origin, "https://example.com:8443");
	}

	#[rstest]
	fn test_anchor_attribute_lookup_ignores_case() {
		let anchor = Anchor::new("http://localhost/").with_attribute("Data-Replace");
		assert!(anchor.has_attribute("data-replace"));
		assert!(!anchor.has_attribute("download"));
	}

	#[rstest]
	fn test_click_finds_anchor_through_composed_path() {
		let event = ClickEvent::new(vec![
			EventNode::Other,
			EventNode::Other,
			EventNode::Anchor(Anchor::new("http://localhost/inner")),
		]);
		assert_eq!(
			event.anchor().map(|a| a.href.as_str()),
			Some("http://localhost/inner")
		);
	}

	#[rstest]
	fn test_prevent_default() {
		let event = ClickEvent::new(Vec::new());
		assert!(!event.default_prevented());
		event.prevent_default();
		assert!(event.default_prevented());
	}
}
