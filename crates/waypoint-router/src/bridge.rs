//! Event bridge.
//!
//! Translates `popstate` events and document clicks into router calls.
//! Listeners hold a weak router handle, so an attached bridge does not keep
//! the router alive; dropping the bridge detaches both listeners.

use crate::history::{Anchor, ClickEvent, ClickEvents, HistoryAdapter, PopStateEvent};
use crate::intent::NavigateOptions;
use crate::listeners::ListenerId;
use crate::router::Router;
use std::sync::Arc;

pub(crate) struct EventBridge {
	history: Arc<dyn HistoryAdapter>,
	popstate: ListenerId,
	click: Option<(Arc<dyn ClickEvents>, ListenerId)>,
}

impl EventBridge {
	pub(crate) fn attach<T>(router: &Router<T>) -> Self
	where
		T: Send + Sync + 'static,
	{
		let history = Arc::clone(router.history());

		let weak = router.downgrade();
		let popstate = history.add_popstate_listener(Arc::new(move |event: &PopStateEvent| {
			if let Some(router) = weak.upgrade() {
				on_popstate(&router, event);
			}
		}));

		let click = match router.clicks() {
			Some(clicks) if !router.options().no_click => {
				let weak = router.downgrade();
				let id = clicks.add_click_listener(Arc::new(move |event: &ClickEvent| {
					if let Some(router) = weak.upgrade() {
						on_click(&router, event);
					}
				}));
				Some((Arc::clone(clicks), id))
			}
			_ => None,
		};

		tracing::debug!(click = click.is_some(), "event bridge attached");
		Self {
			history,
			popstate,
			click,
		}
	}
}

impl Drop for EventBridge {
	fn drop(&mut self) {
		self.history.remove_popstate_listener(self.popstate);
		if let Some((clicks, id)) = self.click.take() {
			clicks.remove_click_listener(id);
		}
		tracing::debug!("event bridge detached");
	}
}

fn on_popstate<T>(router: &Router<T>, event: &PopStateEvent)
where
	T: Send + Sync + 'static,
{
	if router.is_suppressed() {
		tracing::trace!("popstate ignored while batching or traversing");
		return;
	}
	// Admitted eagerly; a failure is logged when the slot settles.
	drop(router.pop(event));
}

fn on_click<T>(router: &Router<T>, event: &ClickEvent)
where
	T: Send + Sync + 'static,
{
	if event.default_prevented() || event.button != 0 || event.modifier {
		return;
	}
	let Some(anchor) = event.anchor() else {
		return;
	};
	if !is_same_document(anchor) {
		return;
	}

	let location = router.history().location();
	if anchor.origin != location.origin {
		return;
	}
	let Some(href) = relative_href(&anchor.href) else {
		return;
	};

	event.prevent_default();
	let replace = anchor.has_attribute(&router.options().replace_attribute);
	tracing::debug!(%href, replace, "intercepted anchor click");
	drop(router.go_with(href, NavigateOptions::new().replace(replace)));
}

/// Anchors opening elsewhere or downloading are left to the browser.
fn is_same_document(anchor: &Anchor) -> bool {
	!anchor.download && matches!(anchor.target.as_deref(), None | Some("") | Some("_self"))
}

/// Path and query of an absolute href.
fn relative_href(href: &str) -> Option<String> {
	let url = url::Url::parse(href).ok()?;
	let mut relative = url.path().to_string();
	if let Some(query) = url.query() {
		relative.push('?');
		relative.push_str(query);
	}
	Some(relative)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("http://localhost/foo", Some("/foo"))]
	#[case("http://localhost/foo/bar?x=1#top", Some("/foo/bar?x=1"))]
	#[case("http://localhost", Some("/"))]
	#[case("not a url", None)]
	fn test_relative_href(#[case] href: &str, #[case] expected: Option<&str>) {
		assert_eq!(relative_href(href).as_deref(), expected);
	}

	#[rstest]
	#[case(Anchor::new("http://localhost/a"), true)]
	#[case(Anchor::new("http://localhost/a").with_target("_self"), true)]
	#[case(Anchor::new("http://localhost/a").with_target("_blank"), false)]
	#[case(Anchor::new("http://localhost/a").with_download(true), false)]
	fn test_is_same_document(#[case] anchor: Anchor, #[case] expected: bool) {
		assert_eq!(is_same_document(&anchor), expected);
	}
}
