//! Client-side navigation engine.
//!
//! `waypoint-router` resolves locations against a route table and keeps the
//! result in sync with session history. It does not depend on a browser:
//! history and document events are reached through the [`HistoryAdapter`]
//! and [`ClickEvents`] traits, implemented for browsers by `waypoint-web`
//! and in memory by [`MemoryHistory`] and [`MemoryDocument`].
//!
//! ## Modules
//!
//! - [`intent`]: normalized navigation targets
//! - [`table`]: route tables (handlers and nested tables)
//! - [`resolver`]: matching and the not-found fallback
//! - [`router`]: the orchestrator serializing every navigation
//! - [`history`]: history and click-event contracts, in-memory adapters
//! - [`config`]: options and router construction
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use waypoint_router::{MemoryHistory, RouteTable, RouterConfig, create_router};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), waypoint_router::RouterError> {
//! let routes = RouteTable::new()
//!     .route_sync("", |_| "home".to_string())
//!     .route("users", |ctx| async move {
//!         Ok(format!("user {}", ctx.rest().join("/")))
//!     });
//!
//! let history = Arc::new(MemoryHistory::new("/"));
//! let router = create_router(RouterConfig::new(history.clone()).routes(routes));
//! router.on_resolve(|resolved| println!("now showing {}", resolved.value));
//!
//! router.init().await?;
//! router.go("/users/42").await?;
//! assert_eq!(router.resolved().map(|r| r.value.clone()), Some("user 42".to_string()));
//! # Ok(())
//! # }
//! ```

mod bridge;
pub mod config;
pub mod error;
pub mod history;
pub mod intent;
pub mod listeners;
pub mod resolver;
pub mod router;
pub mod spawn;
pub mod table;

pub use config::{RouterConfig, RouterOptions, create_router, create_router_from_json};
pub use error::{HandlerError, RouterError};
pub use history::{
	Anchor, ClickEvent, ClickEvents, EventNode, HistoryAdapter, HistoryCall, Location, MemoryDocument,
	MemoryHistory, PopStateEvent,
};
pub use intent::{Intent, IntentPatch, NavigateOptions, Search, Target};
pub use listeners::{Listener, ListenerId, Listeners};
pub use resolver::{Fallback, NotFound, NotFoundContext, Resolved, resolve};
pub use router::{Navigation, Resolution, ResolutionResult, Router, Subscription};
pub use table::{CATCH_ALL, INDEX, RouteContext, RouteEntry, RouteTable, SharedRouteTable, handler_fn};
