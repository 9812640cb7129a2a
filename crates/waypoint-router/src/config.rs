//! Router configuration.
//!
//! [`RouterOptions`] holds the plain settings and can be embedded in a page
//! as JSON. [`RouterConfig`] bundles them with the collaborators a router
//! needs and is turned into a [`Router`] by [`create_router`].

use crate::error::RouterError;
use crate::history::{ClickEvents, HistoryAdapter};
use crate::listeners::Listener;
use crate::resolver::{NotFound, Resolved};
use crate::router::Router;
use crate::table::{RouteTable, SharedRouteTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default name of the anchor attribute opting into replace-mode.
pub const DEFAULT_REPLACE_ATTRIBUTE: &str = "data-replace";

/// Plain router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
	/// Disables anchor-click interception.
	pub no_click: bool,
	/// Anchor attribute that makes an intercepted click replace the
	/// current history entry.
	pub replace_attribute: String,
	/// Title argument passed to `pushState`/`replaceState`.
	pub title: String,
}

impl Default for RouterOptions {
	fn default() -> Self {
		Self {
			no_click: false,
			replace_attribute: DEFAULT_REPLACE_ATTRIBUTE.to_string(),
			title: String::new(),
		}
	}
}

impl RouterOptions {
	/// Parses options from JSON. Missing fields take their defaults.
	///
	/// # Errors
	///
	/// Returns the `serde_json` error if the document is malformed.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

/// Everything needed to build a [`Router`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use waypoint_router::{MemoryHistory, RouteTable, RouterConfig, create_router};
///
/// let routes = RouteTable::new().route_sync("", |_| "home");
/// let router = create_router(
///     RouterConfig::new(Arc::new(MemoryHistory::new("/")))
///         .routes(routes)
///         .no_click(true),
/// );
/// assert!(router.current().is_none());
/// ```
pub struct RouterConfig<T> {
	pub(crate) history: Arc<dyn HistoryAdapter>,
	pub(crate) clicks: Option<Arc<dyn ClickEvents>>,
	pub(crate) routes: SharedRouteTable<T>,
	pub(crate) not_found: NotFound<T>,
	pub(crate) options: RouterOptions,
	pub(crate) on_resolve: Option<Listener<Resolved<T>>>,
}

impl<T: Send + 'static> RouterConfig<T> {
	/// Starts a configuration around a history adapter, with an empty
	/// route table and the redirect-to-root fallback.
	pub fn new(history: Arc<dyn HistoryAdapter>) -> Self {
		Self {
			history,
			clicks: None,
			routes: RouteTable::new().shared(),
			not_found: NotFound::default(),
			options: RouterOptions::default(),
			on_resolve: None,
		}
	}

	/// Uses `routes` as the route table.
	pub fn routes(mut self, routes: RouteTable<T>) -> Self {
		self.routes = routes.shared();
		self
	}

	/// Uses a table the application keeps a handle to.
	pub fn shared_routes(mut self, routes: SharedRouteTable<T>) -> Self {
		self.routes = routes;
		self
	}

	/// Sets the not-found fallback.
	pub fn not_found(mut self, not_found: NotFound<T>) -> Self {
		self.not_found = not_found;
		self
	}

	/// Replaces the plain options.
	pub fn options(mut self, options: RouterOptions) -> Self {
		self.options = options;
		self
	}

	/// Disables anchor-click interception.
	pub fn no_click(mut self, no_click: bool) -> Self {
		self.options.no_click = no_click;
		self
	}

	/// Registers an initial subscriber.
	pub fn on_resolve<F>(mut self, listener: F) -> Self
	where
		F: Fn(&Resolved<T>) + Send + Sync + 'static,
	{
		self.on_resolve = Some(Arc::new(listener));
		self
	}

	/// Sets the document click source intercepted by `init`.
	pub fn clicks(mut self, clicks: Arc<dyn ClickEvents>) -> Self {
		self.clicks = Some(clicks);
		self
	}
}

/// Builds a router. Nothing is attached until [`Router::init`] runs.
pub fn create_router<T>(config: RouterConfig<T>) -> Router<T>
where
	T: Send + Sync + 'static,
{
	Router::new(config)
}

/// Builds a router with options loaded from JSON.
///
/// # Errors
///
/// Returns [`RouterError::InvalidOptions`] if the JSON is malformed.
pub fn create_router_from_json<T>(config: RouterConfig<T>, json: &str) -> Result<Router<T>, RouterError>
where
	T: Send + Sync + 'static,
{
	let options = RouterOptions::from_json(json).map_err(|e| RouterError::InvalidOptions(e.to_string()))?;
	Ok(Router::new(config.options(options)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let options = RouterOptions::default();
		assert!(!options.no_click);
		assert_eq!(options.replace_attribute, "data-replace");
		assert_eq!(options.title, "");
	}

	#[rstest]
	#[case("{}", RouterOptions::default())]
	#[case(r#"{"no_click": true}"#, RouterOptions { no_click: true, ..RouterOptions::default() })]
	#[case(
		r#"{"replace_attribute": "data-swap", "title": "App"}"#,
		RouterOptions {
			replace_attribute: "data-swap".to_string(),
			title: "App".to_string(),
			..RouterOptions::default()
		}
	)]
	fn test_from_json(#[case] json: &str, #[case] expected: RouterOptions) {
		assert_eq!(RouterOptions::from_json(json).unwrap(), expected);
	}

	#[rstest]
	fn test_from_json_rejects_malformed() {
		assert!(RouterOptions::from_json("{no_click").is_err());
	}
}
