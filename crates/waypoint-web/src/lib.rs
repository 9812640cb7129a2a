//! Browser bindings for waypoint.
//!
//! [`BrowserHistory`] implements the history contract on top of
//! `window.history` and the `popstate` event; [`BrowserDocument`] delivers
//! document clicks, with their composed path, to the router's event bridge.
//!
//! Everything here only exists on `wasm32-unknown-unknown`; on other
//! targets the crate is empty.
//!
//! ```ignore
//! use waypoint_web::browser_config;
//! use waypoint_router::{RouteTable, create_router};
//!
//! let router = create_router(browser_config().routes(RouteTable::new().route_sync("", |_| "home")));
//! wasm_bindgen_futures::spawn_local(async move {
//!     let _ = router.init().await;
//! });
//! ```

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
mod browser;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use browser::{BrowserDocument, BrowserHistory, browser_config};
