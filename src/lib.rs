//! # Waypoint
//!
//! Client-side navigation for single-page applications. A route table maps
//! path segments to async handlers; the router resolves every navigation
//! against it, writes the outcome to session history and notifies
//! subscribers, one navigation at a time and in call order.
//!
//! ## Feature Flags
//!
//! - `web` (default) - browser bindings (`window.history`, document click
//!   interception). Only populated on `wasm32-unknown-unknown`.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use waypoint::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), RouterError> {
//! let history = Arc::new(MemoryHistory::new("/"));
//! let router = create_router(
//!     RouterConfig::new(history.clone())
//!         .routes(RouteTable::new().route_sync("about", |_| "about page")),
//! );
//!
//! router.go("/about").await?;
//! assert_eq!(history.current_href(), "/about");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use waypoint_router as router;

#[cfg(feature = "web")]
#[cfg_attr(docsrs, doc(cfg(feature = "web")))]
pub use waypoint_web as web;

pub use waypoint_router::{
	Intent, IntentPatch, MemoryDocument, MemoryHistory, NavigateOptions, NotFound, Resolved, RouteTable,
	Router, RouterConfig, RouterError, RouterOptions, create_router,
};

/// Commonly used types.
pub mod prelude {
	pub use waypoint_router::{
		CATCH_ALL, ClickEvents, Fallback, HistoryAdapter, INDEX, Intent, IntentPatch, MemoryDocument,
		MemoryHistory, NavigateOptions, NotFound, Resolved, RouteContext, RouteTable, Router, RouterConfig,
		RouterError, RouterOptions, Subscription, Target, create_router,
	};

	#[cfg(all(feature = "web", target_family = "wasm", target_os = "unknown"))]
	pub use waypoint_web::{BrowserDocument, BrowserHistory, browser_config};
}
