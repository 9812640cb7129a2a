//! Route tables.
//!
//! A [`RouteTable`] maps path segments to either a handler or a nested
//! table. Two keys are conventional: [`INDEX`] (`""`) handles the table's
//! own path and anything no other key claims, [`CATCH_ALL`] (`*`) handles
//! unmatched remainders and feeds the `next` value of sibling handlers.
//!
//! The router holds the table behind a [`SharedRouteTable`] and re-reads
//! it on every resolution, so edits take effect on the next navigation.

use crate::error::HandlerError;
use crate::intent::Intent;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Key of the index entry.
pub const INDEX: &str = "";

/// Key of the catch-all entry.
pub const CATCH_ALL: &str = "*";

/// Future returned by a route handler.
pub type HandlerFuture<T> = BoxFuture<'static, Result<T, HandlerError>>;

/// A type-erased resolve function.
pub type Handler<T> = Arc<dyn Fn(RouteContext<T>) -> HandlerFuture<T> + Send + Sync>;

/// A route table shared between the application and the router.
pub type SharedRouteTable<T> = Arc<RwLock<RouteTable<T>>>;

/// Context handed to a resolve function.
#[derive(Debug, Clone)]
pub struct RouteContext<T> {
	rest: Vec<String>,
	intent: Intent,
	next: Option<T>,
}

impl<T> RouteContext<T> {
	pub(crate) fn new(rest: Vec<String>, intent: Intent, next: Option<T>) -> Self {
		Self { rest, intent, next }
	}

	/// Path segments left unmatched when this handler was selected.
	pub fn rest(&self) -> &[String] {
		&self.rest
	}

	/// The intent being resolved.
	pub fn intent(&self) -> &Intent {
		&self.intent
	}

	/// Result of resolving the remainder against the catch-all, if any.
	pub fn next(&self) -> Option<&T> {
		self.next.as_ref()
	}

	/// Takes the `next` value out of the context.
	pub fn take_next(&mut self) -> Option<T> {
		self.next.take()
	}
}

/// An entry of a route table.
pub enum RouteEntry<T> {
	/// A resolve function.
	Handler(Handler<T>),
	/// A nested table matched against the remaining segments.
	Table(RouteTable<T>),
}

impl<T> Clone for RouteEntry<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Handler(handler) => Self::Handler(Arc::clone(handler)),
			Self::Table(table) => Self::Table(table.clone()),
		}
	}
}

impl<T> std::fmt::Debug for RouteEntry<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Handler(_) => f.write_str("Handler"),
			Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
		}
	}
}

/// Mapping from path segments to handlers or nested tables.
pub struct RouteTable<T> {
	entries: HashMap<String, RouteEntry<T>>,
}

impl<T> Clone for RouteTable<T> {
	fn clone(&self) -> Self {
		Self {
			entries: self.entries.clone(),
		}
	}
}

impl<T> Default for RouteTable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> std::fmt::Debug for RouteTable<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut keys: Vec<_> = self.entries.keys().collect();
		keys.sort();
		f.debug_struct("RouteTable").field("keys", &keys).finish()
	}
}

impl<T> RouteTable<T> {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}

	/// Wraps the table for sharing with a router.
	pub fn shared(self) -> SharedRouteTable<T> {
		Arc::new(RwLock::new(self))
	}

	/// Inserts an entry, returning the one it replaced.
	pub fn insert(&mut self, segment: impl Into<String>, entry: RouteEntry<T>) -> Option<RouteEntry<T>> {
		self.entries.insert(segment.into(), entry)
	}

	/// Removes an entry.
	pub fn remove(&mut self, segment: &str) -> Option<RouteEntry<T>> {
		self.entries.remove(segment)
	}

	/// Looks up an entry.
	pub fn get(&self, segment: &str) -> Option<&RouteEntry<T>> {
		self.entries.get(segment)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if the table has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Adds a nested table under `segment`.
	pub fn nest(mut self, segment: impl Into<String>, table: RouteTable<T>) -> Self {
		self.insert(segment, RouteEntry::Table(table));
		self
	}
}

impl<T: Send + 'static> RouteTable<T> {
	/// Adds an async resolve function under `segment`.
	///
	/// # Example
	///
	/// ```
	/// use waypoint_router::RouteTable;
	///
	/// let table = RouteTable::<String>::new()
	///     .route("users", |ctx| async move {
	///         Ok(format!("user {}", ctx.rest().join("/")))
	///     });
	/// assert_eq!(table.len(), 1);
	/// ```
	pub fn route<F, Fut>(mut self, segment: impl Into<String>, handler: F) -> Self
	where
		F: Fn(RouteContext<T>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
	{
		self.insert(segment, RouteEntry::Handler(handler_fn(handler)));
		self
	}

	/// Adds a synchronous resolve function under `segment`.
	pub fn route_sync<F>(mut self, segment: impl Into<String>, handler: F) -> Self
	where
		F: Fn(RouteContext<T>) -> T + Send + Sync + 'static,
	{
		let handler: Handler<T> = Arc::new(move |ctx| {
			let value = handler(ctx);
			futures::future::ready(Ok::<T, HandlerError>(value)).boxed()
		});
		self.insert(segment, RouteEntry::Handler(handler));
		self
	}

	/// Adds the index handler.
	pub fn index<F, Fut>(self, handler: F) -> Self
	where
		F: Fn(RouteContext<T>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
	{
		self.route(INDEX, handler)
	}

	/// Adds the catch-all handler.
	pub fn catch_all<F, Fut>(self, handler: F) -> Self
	where
		F: Fn(RouteContext<T>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
	{
		self.route(CATCH_ALL, handler)
	}
}

/// Erases an async resolve function into a [`Handler`].
pub fn handler_fn<T, F, Fut>(handler: F) -> Handler<T>
where
	T: Send + 'static,
	F: Fn(RouteContext<T>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
{
	Arc::new(move |ctx| handler(ctx).boxed())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_builder_registers_entries() {
		let table = RouteTable::<&'static str>::new()
			.index(|_| async { Ok("home") })
			.catch_all(|_| async { Ok("fallback") })
			.route_sync("about", |_| "about")
			.nest("users", RouteTable::new().route_sync(INDEX, |_| "users"));

		assert_eq!(table.len(), 4);
		assert!(matches!(table.get(INDEX), Some(RouteEntry::Handler(_))));
		assert!(matches!(table.get(CATCH_ALL), Some(RouteEntry::Handler(_))));
		assert!(matches!(table.get("users"), Some(RouteEntry::Table(_))));
		assert!(table.get("missing").is_none());
	}

	#[rstest]
	fn test_insert_and_remove() {
		let mut table = RouteTable::<u8>::new();
		assert!(table.is_empty());

		table.insert("a", RouteEntry::Handler(handler_fn(|_| async { Ok(1) })));
		assert!(table.insert("a", RouteEntry::Table(RouteTable::new())).is_some());
		assert!(table.remove("a").is_some());
		assert!(table.is_empty());
	}

	#[rstest]
	fn test_debug_lists_sorted_keys() {
		let table = RouteTable::<u8>::new()
			.route_sync("b", |_| 0)
			.route_sync("a", |_| 0);
		assert_eq!(format!("{:?}", table), r#"RouteTable { keys: ["a", "b"] }"#);
	}
}
