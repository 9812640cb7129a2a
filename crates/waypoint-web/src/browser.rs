//! `web-sys` implementations of the history and click contracts.
//!
//! DOM handles are not `Send`, so the adapters are zero-sized and look up
//! `window` on every call. Event closures live in a thread-local registry
//! keyed by listener id until they are removed.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget, HtmlAnchorElement, MouseEvent};
use waypoint_router::{
	Anchor, ClickEvent, ClickEvents, EventNode, HistoryAdapter, Listener, ListenerId, Location, PopStateEvent,
	RouterConfig, RouterError,
};

#[derive(Debug, Clone, Copy)]
enum Host {
	Window,
	Document,
}

struct Registration {
	host: Host,
	kind: &'static str,
	closure: Closure<dyn FnMut(Event)>,
}

thread_local! {
	static REGISTRATIONS: RefCell<HashMap<u64, Registration>> = RefCell::new(HashMap::new());
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn window() -> Result<web_sys::Window, RouterError> {
	web_sys::window().ok_or_else(|| RouterError::History("no global window".to_string()))
}

fn js_error(err: JsValue) -> RouterError {
	RouterError::History(format!("{:?}", err))
}

fn host_target(host: Host) -> Option<EventTarget> {
	let window = web_sys::window()?;
	match host {
		Host::Window => Some(window.into()),
		Host::Document => window.document().map(Into::into),
	}
}

fn register(host: Host, kind: &'static str, closure: Closure<dyn FnMut(Event)>) -> ListenerId {
	let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
	match host_target(host) {
		Some(target) => {
			if let Err(err) = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref()) {
				tracing::warn!(kind, error = ?err, "failed to attach listener");
			}
		}
		None => tracing::warn!(kind, "no event target to attach to"),
	}
	REGISTRATIONS.with(|registrations| {
		registrations.borrow_mut().insert(
			id,
			Registration {
				host,
				kind,
				closure,
			},
		)
	});
	ListenerId::from_raw(id)
}

fn unregister(id: ListenerId) {
	let Some(registration) = REGISTRATIONS.with(|registrations| registrations.borrow_mut().remove(&id.as_raw()))
	else {
		return;
	};
	if let Some(target) = host_target(registration.host) {
		let _ = target.remove_event_listener_with_callback(
			registration.kind,
			registration.closure.as_ref().unchecked_ref(),
		);
	}
}

/// Converts a history state payload into a structured-cloneable value.
fn state_to_js(state: Option<&Value>) -> Result<JsValue, RouterError> {
	match state {
		None => Ok(JsValue::NULL),
		Some(value) => {
			let json = serde_json::to_string(value).map_err(|e| RouterError::History(e.to_string()))?;
			js_sys::JSON::parse(&json).map_err(js_error)
		}
	}
}

/// Reads a history state payload. Values that are not JSON are dropped.
fn state_from_js(value: JsValue) -> Option<Value> {
	if value.is_null() || value.is_undefined() {
		return None;
	}
	let json: String = js_sys::JSON::stringify(&value).ok()?.into();
	serde_json::from_str(&json).ok()
}

/// `window.history` as a [`HistoryAdapter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserHistory;

impl BrowserHistory {
	/// Creates the adapter.
	pub fn new() -> Self {
		Self
	}

	fn history() -> Result<web_sys::History, RouterError> {
		window()?.history().map_err(js_error)
	}
}

impl HistoryAdapter for BrowserHistory {
	fn push_state(&self, state: Option<&Value>, title: &str, href: &str) -> Result<(), RouterError> {
		let data = state_to_js(state)?;
		Self::history()?
			.push_state_with_url(&data, title, Some(href))
			.map_err(js_error)
	}

	fn replace_state(&self, state: Option<&Value>, title: &str, href: &str) -> Result<(), RouterError> {
		let data = state_to_js(state)?;
		Self::history()?
			.replace_state_with_url(&data, title, Some(href))
			.map_err(js_error)
	}

	fn go(&self, delta: i32) {
		let result = Self::history().and_then(|history| history.go_with_delta(delta).map_err(js_error));
		if let Err(err) = result {
			tracing::warn!(delta, error = %err, "history traversal failed");
		}
	}

	fn location(&self) -> Location {
		match window() {
			Ok(window) => {
				let location = window.location();
				Location::new(
					location.href().unwrap_or_default(),
					location.origin().unwrap_or_default(),
				)
			}
			Err(_) => Location::new("/", ""),
		}
	}

	fn state(&self) -> Option<Value> {
		let state = Self::history().ok()?.state().ok()?;
		state_from_js(state)
	}

	fn add_popstate_listener(&self, listener: Listener<PopStateEvent>) -> ListenerId {
		let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
			let state = event
				.dyn_ref::<web_sys::PopStateEvent>()
				.and_then(|event| state_from_js(event.state()));
			listener(&PopStateEvent { state });
		});
		register(Host::Window, "popstate", closure)
	}

	fn remove_popstate_listener(&self, id: ListenerId) {
		unregister(id);
	}
}

/// Document-level click source.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserDocument;

impl BrowserDocument {
	/// Creates the click source.
	pub fn new() -> Self {
		Self
	}
}

impl ClickEvents for BrowserDocument {
	fn add_click_listener(&self, listener: Listener<ClickEvent>) -> ListenerId {
		let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
			let click = click_event(&event);
			listener(&click);
			if click.default_prevented() {
				event.prevent_default();
			}
		});
		register(Host::Document, "click", closure)
	}

	fn remove_click_listener(&self, id: ListenerId) {
		unregister(id);
	}
}

fn click_event(event: &Event) -> ClickEvent {
	let path = event
		.composed_path()
		.iter()
		.map(|node| match node.dyn_ref::<HtmlAnchorElement>() {
			Some(element) => EventNode::Anchor(anchor(element)),
			None => EventNode::Other,
		})
		.collect();

	let mut click = ClickEvent::new(path);
	if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
		click = click
			.with_button(mouse.button())
			.with_modifier(mouse.ctrl_key() || mouse.meta_key() || mouse.shift_key() || mouse.alt_key());
	}
	if event.default_prevented() {
		click = click.with_default_prevented();
	}
	click
}

fn anchor(element: &HtmlAnchorElement) -> Anchor {
	Anchor {
		href: element.href(),
		origin: element.origin(),
		attributes: element
			.get_attribute_names()
			.iter()
			.filter_map(|name| name.as_string())
			.collect(),
		target: element.get_attribute("target"),
		download: element.has_attribute("download"),
	}
}

/// Router configuration wired to the browser's history and document.
pub fn browser_config<T: Send + 'static>() -> RouterConfig<T> {
	RouterConfig::new(Arc::new(BrowserHistory::new())).clicks(Arc::new(BrowserDocument::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wasm_bindgen_test::wasm_bindgen_test;

	#[wasm_bindgen_test]
	fn test_state_round_trips_through_js() {
		let value = json!({"scroll": 10, "tags": ["a", "b"]});
		let js = state_to_js(Some(&value)).unwrap();
		assert_eq!(state_from_js(js), Some(value));
	}

	#[wasm_bindgen_test]
	fn test_absent_state_is_null() {
		let js = state_to_js(None).unwrap();
		assert!(js.is_null());
		assert_eq!(state_from_js(js), None);
	}
}
