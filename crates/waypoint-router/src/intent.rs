//! Navigation intents.
//!
//! An [`Intent`] is the normalized description of a navigation target and
//! the way it should be applied to history. Intents are immutable: the
//! `with_*` methods consume the intent and return a new one, and every
//! rewrite (not-found fallback, patch functions, per-call options) builds
//! a fresh value.
//!
//! Raw navigation arguments are modelled by [`Target`], which is
//! normalized into an intent by the router.

use crate::error::RouterError;
use crate::history::Location;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Query parameters of an intent, serialized in insertion order.
pub type Search = IndexMap<String, String>;

/// Base used to resolve relative hrefs. Only the path and query survive.
const PARSE_BASE: &str = "http://localhost/";

/// A normalized navigation target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
	path: Vec<String>,
	search: Search,
	state: Option<Value>,
	replace: bool,
	pop: bool,
	skip_render: bool,
}

impl Intent {
	/// Creates an intent for the root path.
	pub fn root() -> Self {
		Self::default()
	}

	/// Creates an intent from path segments. Empty segments are dropped.
	pub fn from_segments<I, S>(segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			path: segments
				.into_iter()
				.map(Into::into)
				.filter(|s| !s.is_empty())
				.collect(),
			..Self::default()
		}
	}

	/// Parses an absolute or root-relative href.
	///
	/// Segments and query pairs are percent-decoded; the fragment is dropped.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidHref`] if the href cannot be parsed.
	pub fn from_href(href: &str) -> Result<Self, RouterError> {
		let base = url::Url::parse(PARSE_BASE).map_err(|e| RouterError::InvalidHref(e.to_string()))?;
		let url = base
			.join(href)
			.map_err(|_| RouterError::InvalidHref(href.to_string()))?;

		let mut path = Vec::new();
		if let Some(segments) = url.path_segments() {
			for segment in segments.filter(|s| !s.is_empty()) {
				let decoded = urlencoding::decode(segment)
					.map_err(|_| RouterError::InvalidHref(href.to_string()))?;
				path.push(decoded.into_owned());
			}
		}

		let search = url
			.query_pairs()
			.map(|(k, v)| (k.into_owned(), v.into_owned()))
			.collect();

		Ok(Self {
			path,
			search,
			..Self::default()
		})
	}

	/// Builds the intent describing the location the history currently shows.
	pub fn from_location(location: &Location, state: Option<Value>) -> Result<Self, RouterError> {
		Ok(Self::from_href(&location.href)?.with_state(state))
	}

	/// Path segments.
	pub fn path(&self) -> &[String] {
		&self.path
	}

	/// Query parameters.
	pub fn search(&self) -> &Search {
		&self.search
	}

	/// History state payload.
	pub fn state(&self) -> Option<&Value> {
		self.state.as_ref()
	}

	/// Whether the transition replaces the current history entry.
	pub fn replace(&self) -> bool {
		self.replace
	}

	/// Whether the intent originated from a back/forward traversal.
	pub fn pop(&self) -> bool {
		self.pop
	}

	/// Whether history must be updated without resolving or notifying.
	pub fn skip_render(&self) -> bool {
		self.skip_render
	}

	/// Canonical href built from the path and search.
	pub fn href(&self) -> String {
		let mut href = String::from("/");
		let encoded: Vec<_> = self.path.iter().map(|s| urlencoding::encode(s)).collect();
		href.push_str(&encoded.join("/"));

		if !self.search.is_empty() {
			let query = url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(self.search.iter())
				.finish();
			href.push('?');
			href.push_str(&query);
		}
		href
	}

	/// Returns a copy with a different path.
	pub fn with_path<I, S>(mut self, segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.path = segments
			.into_iter()
			.map(Into::into)
			.filter(|s| !s.is_empty())
			.collect();
		self
	}

	/// Returns a copy with different query parameters.
	pub fn with_search(mut self, search: Search) -> Self {
		self.search = search;
		self
	}

	/// Returns a copy with a different state payload. `null` counts as absent.
	pub fn with_state(mut self, state: Option<Value>) -> Self {
		self.state = state.filter(|v| !v.is_null());
		self
	}

	/// Returns a copy with the replace flag set.
	pub fn with_replace(mut self, replace: bool) -> Self {
		self.replace = replace;
		self
	}

	/// Returns a copy with the pop flag set.
	pub fn with_pop(mut self, pop: bool) -> Self {
		self.pop = pop;
		self
	}

	/// Returns a copy with the skip-render flag set.
	pub fn with_skip_render(mut self, skip_render: bool) -> Self {
		self.skip_render = skip_render;
		self
	}

	/// Applies a patch on top of this intent.
	///
	/// Fields absent from the patch keep their current value, except `pop`
	/// which is always cleared since a patched intent is application-initiated.
	pub fn patch(self, patch: IntentPatch) -> Self {
		let IntentPatch {
			path,
			search,
			state,
			replace,
			skip_render,
		} = patch;

		let mut next = self.with_pop(false);
		if let Some(path) = path {
			next = next.with_path(path);
		}
		if let Some(search) = search {
			next = next.with_search(search);
		}
		if let Some(state) = state {
			next = next.with_state(Some(state));
		}
		if let Some(replace) = replace {
			next = next.with_replace(replace);
		}
		if let Some(skip_render) = skip_render {
			next = next.with_skip_render(skip_render);
		}
		next
	}
}

impl fmt::Display for Intent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.href())
	}
}

/// A partial intent. Unset fields are taken from the intent being patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentPatch {
	/// New path segments.
	pub path: Option<Vec<String>>,
	/// New query parameters (replaces the whole map).
	pub search: Option<Search>,
	/// New state payload. `null` clears it.
	pub state: Option<Value>,
	/// Replace instead of push.
	pub replace: Option<bool>,
	/// Update history silently.
	pub skip_render: Option<bool>,
}

impl IntentPatch {
	/// Creates an empty patch.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the path.
	pub fn path<I, S>(mut self, segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.path = Some(segments.into_iter().map(Into::into).collect());
		self
	}

	/// Sets the query parameters from key/value pairs.
	pub fn search<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.search = Some(
			pairs
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		);
		self
	}

	/// Sets the state payload.
	pub fn state(mut self, state: Value) -> Self {
		self.state = Some(state);
		self
	}

	/// Sets the replace flag.
	pub fn replace(mut self, replace: bool) -> Self {
		self.replace = Some(replace);
		self
	}

	/// Sets the skip-render flag.
	pub fn skip_render(mut self, skip_render: bool) -> Self {
		self.skip_render = Some(skip_render);
		self
	}
}

/// Function deriving a patch from the previously applied intent.
pub type DeriveFn = Box<dyn FnOnce(&Intent) -> IntentPatch + Send>;

/// Raw argument of a navigation call.
pub enum Target {
	/// Traverse the session history by this many entries.
	Delta(i32),
	/// A path or href, optionally with a query string.
	Href(String),
	/// Path segments.
	Segments(Vec<String>),
	/// A fully built intent.
	Intent(Intent),
	/// A patch applied on top of the root intent.
	Patch(IntentPatch),
	/// A patch derived from the previously applied intent. Replaces by default.
	Derive(DeriveFn),
}

impl Target {
	/// Creates a target derived from the previously applied intent.
	pub fn derive<F>(f: F) -> Self
	where
		F: FnOnce(&Intent) -> IntentPatch + Send + 'static,
	{
		Self::Derive(Box::new(f))
	}
}

impl fmt::Debug for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Delta(delta) => f.debug_tuple("Delta").field(delta).finish(),
			Self::Href(href) => f.debug_tuple("Href").field(href).finish(),
			Self::Segments(segments) => f.debug_tuple("Segments").field(segments).finish(),
			Self::Intent(intent) => f.debug_tuple("Intent").field(intent).finish(),
			Self::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
			Self::Derive(_) => f.write_str("Derive(..)"),
		}
	}
}

impl From<i32> for Target {
	fn from(delta: i32) -> Self {
		Self::Delta(delta)
	}
}

impl From<&str> for Target {
	fn from(href: &str) -> Self {
		Self::Href(href.to_string())
	}
}

impl From<String> for Target {
	fn from(href: String) -> Self {
		Self::Href(href)
	}
}

impl From<&String> for Target {
	fn from(href: &String) -> Self {
		Self::Href(href.clone())
	}
}

impl From<Vec<String>> for Target {
	fn from(segments: Vec<String>) -> Self {
		Self::Segments(segments)
	}
}

impl From<&[&str]> for Target {
	fn from(segments: &[&str]) -> Self {
		Self::Segments(segments.iter().map(|s| s.to_string()).collect())
	}
}

impl<const N: usize> From<[&str; N]> for Target {
	fn from(segments: [&str; N]) -> Self {
		Self::Segments(segments.iter().map(|s| s.to_string()).collect())
	}
}

impl From<Intent> for Target {
	fn from(intent: Intent) -> Self {
		Self::Intent(intent)
	}
}

impl From<IntentPatch> for Target {
	fn from(patch: IntentPatch) -> Self {
		Self::Patch(patch)
	}
}

/// Per-call navigation options, merged over the normalized intent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOptions {
	/// Replace the current history entry.
	pub replace: bool,
	/// Update history without resolving or notifying listeners.
	pub skip_render: bool,
	/// State payload for the history entry.
	pub state: Option<Value>,
}

impl NavigateOptions {
	/// Creates default options (push, render, no state).
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the replace flag.
	pub fn replace(mut self, replace: bool) -> Self {
		self.replace = replace;
		self
	}

	/// Sets the skip-render flag.
	pub fn skip_render(mut self, skip_render: bool) -> Self {
		self.skip_render = skip_render;
		self
	}

	/// Sets the state payload.
	pub fn state(mut self, state: Value) -> Self {
		self.state = Some(state);
		self
	}

	/// Merges the options over an intent. Flags are additive.
	pub(crate) fn apply(self, intent: Intent) -> Intent {
		let replace = intent.replace() || self.replace;
		let skip_render = intent.skip_render() || self.skip_render;
		let intent = intent.with_replace(replace).with_skip_render(skip_render);
		match self.state {
			Some(state) => intent.with_state(Some(state)),
			None => intent,
		}
	}
}
