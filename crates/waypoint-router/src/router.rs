//! Navigation orchestration.
//!
//! A [`Router`] owns a single chain of resolutions. Every navigation is
//! admitted synchronously when it is issued: it takes the slot installed
//! by the previous navigation, installs its own slot in its place and
//! hands it to the background spawner. A slot first waits for its
//! predecessor to settle (successfully or not), then runs. That chain is
//! the only serialization point, which gives:
//!
//! - at most one resolution in flight,
//! - history writes and subscriber notifications in call order,
//! - no cancellation: a new navigation queues behind a pending one.
//!
//! A failed slot leaves history and subscribers untouched and, if no newer
//! navigation has been admitted meanwhile, is replaced by an already
//! settled slot carrying the last good resolution.

use crate::bridge::EventBridge;
use crate::config::{RouterConfig, RouterOptions};
use crate::error::RouterError;
use crate::history::{ClickEvents, HistoryAdapter, PopStateEvent};
use crate::intent::{Intent, NavigateOptions, Target};
use crate::listeners::{Listener, ListenerId, Listeners};
use crate::resolver::{self, NotFound, Resolved};
use crate::spawn;
use crate::table::SharedRouteTable;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Output of a resolution slot: the resolution current once the slot
/// settled, or the error that failed it.
pub type ResolutionResult<T> = Result<Option<Arc<Resolved<T>>>, RouterError>;

/// The in-flight or most recently settled resolution. Cloneable; every
/// clone observes the same outcome.
pub type Resolution<T> = Shared<BoxFuture<'static, ResolutionResult<T>>>;

/// Future returned by navigation calls. The navigation is already admitted
/// when the call returns; awaiting only observes its outcome.
pub type Navigation = BoxFuture<'static, Result<(), RouterError>>;

struct State<T> {
	current: Option<Arc<Resolved<T>>>,
	applied: Option<Intent>,
	resolution: Option<(u64, Resolution<T>)>,
	next_seq: u64,
	bridge: Option<EventBridge>,
}

struct Inner<T> {
	routes: SharedRouteTable<T>,
	not_found: NotFound<T>,
	history: Arc<dyn HistoryAdapter>,
	clicks: Option<Arc<dyn ClickEvents>>,
	options: RouterOptions,
	subscribers: Listeners<Resolved<T>>,
	state: Mutex<State<T>>,
	// Depth of nested `render_with` batches.
	skip_depth: AtomicUsize,
	// `render_with` calls not yet past their final render.
	batches: AtomicUsize,
	// Delta traversals waiting for their popstate.
	traversals: AtomicUsize,
}

/// Client-side navigation engine.
///
/// Cheap to clone; clones share the same state.
pub struct Router<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for Router<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> std::fmt::Debug for Router<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("Router")
			.field("current", &state.current.as_ref().map(|r| r.intent.href()))
			.field("attached", &state.bridge.is_some())
			.field("subscribers", &self.inner.subscribers.len())
			.finish_non_exhaustive()
	}
}

/// Non-owning handle held by event listeners.
pub(crate) struct WeakRouter<T> {
	inner: Weak<Inner<T>>,
}

impl<T> WeakRouter<T> {
	pub(crate) fn upgrade(&self) -> Option<Router<T>> {
		self.inner.upgrade().map(|inner| Router { inner })
	}
}

/// Handle returned by [`Router::on_resolve`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription<T> {
	subscribers: Listeners<Resolved<T>>,
	id: ListenerId,
}

impl<T> Subscription<T> {
	/// Removes the listener. It receives no further notifications, even
	/// for a resolution being delivered right now.
	pub fn unsubscribe(self) -> bool {
		self.subscribers.remove(self.id)
	}

	/// Identifier of the registered listener.
	pub fn id(&self) -> ListenerId {
		self.id
	}
}

impl<T> Router<T>
where
	T: Send + Sync + 'static,
{
	pub(crate) fn new(config: RouterConfig<T>) -> Self {
		let RouterConfig {
			history,
			clicks,
			routes,
			not_found,
			options,
			on_resolve,
		} = config;

		let subscribers = Listeners::new();
		if let Some(listener) = on_resolve {
			subscribers.add(listener);
		}

		Self {
			inner: Arc::new(Inner {
				routes,
				not_found,
				history,
				clicks,
				options,
				subscribers,
				state: Mutex::new(State {
					current: None,
					applied: None,
					resolution: None,
					next_seq: 0,
					bridge: None,
				}),
				skip_depth: AtomicUsize::new(0),
				batches: AtomicUsize::new(0),
				traversals: AtomicUsize::new(0),
			}),
		}
	}

	/// The route table. Edits apply to the next resolution.
	pub fn routes(&self) -> SharedRouteTable<T> {
		Arc::clone(&self.inner.routes)
	}

	/// Intent of the last successful resolution.
	pub fn current(&self) -> Option<Intent> {
		self.inner
			.state
			.lock()
			.current
			.as_ref()
			.map(|resolved| resolved.intent.clone())
	}

	/// The last successful resolution.
	pub fn resolved(&self) -> Option<Arc<Resolved<T>>> {
		self.inner.state.lock().current.clone()
	}

	/// The in-flight or most recently settled resolution, `None` before
	/// the first navigation.
	pub fn resolution(&self) -> Option<Resolution<T>> {
		self.inner
			.state
			.lock()
			.resolution
			.as_ref()
			.map(|(_, slot)| slot.clone())
	}

	/// Plain options this router was built with.
	pub fn options(&self) -> &RouterOptions {
		&self.inner.options
	}

	/// The history adapter.
	pub fn history(&self) -> &Arc<dyn HistoryAdapter> {
		&self.inner.history
	}

	/// Navigates to `target`.
	///
	/// # Example
	///
	/// ```
	/// use std::sync::Arc;
	/// use waypoint_router::{MemoryHistory, RouteTable, RouterConfig, create_router};
	///
	/// # #[tokio::main(flavor = "current_thread")]
	/// # async fn main() -> Result<(), waypoint_router::RouterError> {
	/// let history = Arc::new(MemoryHistory::new("/"));
	/// let router = create_router(
	///     RouterConfig::new(history.clone())
	///         .routes(RouteTable::new().route_sync("foo", |_| "foo")),
	/// );
	///
	/// router.go("/foo").await?;
	/// assert_eq!(history.current_href(), "/foo");
	/// # Ok(())
	/// # }
	/// ```
	pub fn go(&self, target: impl Into<Target>) -> Navigation {
		self.go_with(target, NavigateOptions::default())
	}

	/// Navigates to `target` with per-call options.
	///
	/// Inside a [`Router::render_with`] batch, or with `skip_render`, the
	/// history is updated without resolving or notifying. That decision is
	/// taken when the call is made, not when it runs.
	pub fn go_with(&self, target: impl Into<Target>, options: NavigateOptions) -> Navigation {
		let target = target.into();
		let batching = self.is_batching();
		tracing::debug!(?target, batching, "navigation admitted");

		let slot = match target {
			Target::Delta(delta) => self.enqueue(move |router| router.traverse(delta, batching)),
			Target::Href(href) => self.admit(Intent::from_href(&href), options, batching),
			Target::Segments(segments) => self.admit(Ok(Intent::from_segments(segments)), options, batching),
			Target::Intent(intent) => self.admit(Ok(intent), options, batching),
			Target::Patch(patch) => self.admit(Ok(Intent::root().patch(patch)), options, batching),
			Target::Derive(derive) => self.enqueue(move |router| async move {
				let previous = router.applied().ok_or(RouterError::NoPreviousIntent)?;
				let patch = derive(&previous);
				let replace = patch.replace.unwrap_or(true);
				let base = Intent::from_segments(previous.path().to_vec())
					.with_search(previous.search().clone())
					.with_state(previous.state().cloned());
				let intent = options.apply(base.patch(patch).with_replace(replace));
				router.navigate(intent, batching).await
			}),
		};
		settle(slot)
	}

	/// Pushes `href`.
	pub fn push(&self, href: impl Into<String>) -> Navigation {
		self.go(Target::Href(href.into()))
	}

	/// Replaces the current entry with `href`.
	pub fn replace(&self, href: impl Into<String>) -> Navigation {
		self.go_with(Target::Href(href.into()), NavigateOptions::new().replace(true))
	}

	/// Goes one entry back.
	pub fn back(&self) -> Navigation {
		self.go(-1)
	}

	/// Goes one entry forward.
	pub fn forward(&self) -> Navigation {
		self.go(1)
	}

	/// Resolves the location the history currently shows, for instance
	/// after the route table was edited.
	pub fn render(&self) -> Navigation {
		settle(self.enqueue(|router| router.reload()))
	}

	/// Runs `defer` with rendering suppressed, then renders once.
	///
	/// Navigations issued while `defer` runs only update history; deltas
	/// are issued without waiting for the traversal to land. `popstate`
	/// is ignored until the final render has settled. That render happens
	/// even if `defer` fails; its error is then returned in preference to
	/// the render's.
	pub async fn render_with<F, Fut>(&self, defer: F) -> Result<(), RouterError>
	where
		F: FnOnce(Router<T>) -> Fut,
		Fut: Future<Output = Result<(), RouterError>>,
	{
		self.inner.batches.fetch_add(1, Ordering::SeqCst);
		let _open = scopeguard::guard(Arc::clone(&self.inner), |inner| {
			inner.batches.fetch_sub(1, Ordering::SeqCst);
		});

		let deferred = {
			self.inner.skip_depth.fetch_add(1, Ordering::SeqCst);
			let _batch = scopeguard::guard(Arc::clone(&self.inner), |inner| {
				inner.skip_depth.fetch_sub(1, Ordering::SeqCst);
			});
			defer(self.clone()).await
		};
		if let Err(err) = &deferred {
			tracing::warn!(error = %err, "deferred navigations failed; rendering anyway");
		}

		let rendered = self.render().await;
		deferred.and(rendered)
	}

	/// Registers a subscriber for successful resolutions.
	///
	/// If a resolution exists already, the listener is invoked with it
	/// before this method returns.
	pub fn on_resolve<F>(&self, listener: F) -> Subscription<T>
	where
		F: Fn(&Resolved<T>) + Send + Sync + 'static,
	{
		let listener: Listener<Resolved<T>> = Arc::new(listener);
		// Same lock `commit` snapshots subscribers under
		let (id, current) = {
			let state = self.inner.state.lock();
			(self.inner.subscribers.add(Arc::clone(&listener)), state.current.clone())
		};
		if let Some(current) = current {
			listener(current.as_ref());
		}
		Subscription {
			subscribers: self.inner.subscribers.clone(),
			id,
		}
	}

	/// Attaches the event bridge and resolves the current location.
	///
	/// Calling `init` again replaces the previous bridge.
	pub fn init(&self) -> Navigation {
		let bridge = EventBridge::attach(self);
		let previous = self.inner.state.lock().bridge.replace(bridge);
		drop(previous);
		self.render()
	}

	/// Detaches the event bridge. An in-flight resolution still completes.
	pub fn dispose(&self) {
		let bridge = self.inner.state.lock().bridge.take();
		drop(bridge);
	}

	pub(crate) fn downgrade(&self) -> WeakRouter<T> {
		WeakRouter {
			inner: Arc::downgrade(&self.inner),
		}
	}

	pub(crate) fn clicks(&self) -> Option<&Arc<dyn ClickEvents>> {
		self.inner.clicks.as_ref()
	}

	/// Whether browser-driven `popstate` events must be ignored.
	pub(crate) fn is_suppressed(&self) -> bool {
		self.inner.batches.load(Ordering::SeqCst) > 0 || self.inner.traversals.load(Ordering::SeqCst) > 0
	}

	/// Resolves the location a traversal landed on.
	pub(crate) fn pop(&self, event: &PopStateEvent) -> Navigation {
		let state = event.state.clone();
		settle(self.enqueue(move |router| async move {
			let intent = Intent::from_location(&router.inner.history.location(), state)?.with_pop(true);
			router.refresh(intent).await
		}))
	}

	fn is_batching(&self) -> bool {
		self.inner.skip_depth.load(Ordering::SeqCst) > 0
	}

	fn applied(&self) -> Option<Intent> {
		self.inner.state.lock().applied.clone()
	}

	fn admit(
		&self,
		intent: Result<Intent, RouterError>,
		options: NavigateOptions,
		batching: bool,
	) -> Resolution<T> {
		self.enqueue(move |router| async move { router.navigate(options.apply(intent?), batching).await })
	}

	/// Installs a new slot at the end of the chain.
	fn enqueue<F, Fut>(&self, work: F) -> Resolution<T>
	where
		F: FnOnce(Router<T>) -> Fut + Send + 'static,
		Fut: Future<Output = ResolutionResult<T>> + Send + 'static,
	{
		let weak = Arc::downgrade(&self.inner);
		let mut state = self.inner.state.lock();
		let seq = state.next_seq;
		state.next_seq += 1;
		let previous = state.resolution.as_ref().map(|(_, slot)| slot.clone());

		let slot = async move {
			if let Some(previous) = previous {
				// A failed predecessor does not block the chain
				let _ = previous.await;
			}
			let Some(inner) = weak.upgrade() else {
				return Ok(None);
			};
			let router = Router { inner };
			let result = work(router.clone()).await;
			if let Err(err) = &result {
				router.recover(seq, err);
			}
			result
		}
		.boxed()
		.shared();

		state.resolution = Some((seq, slot.clone()));
		drop(state);

		spawn::spawn_detached(slot.clone().map(|_| ()));
		slot
	}

	fn recover(&self, seq: u64, err: &RouterError) {
		tracing::warn!(error = %err, "navigation failed; keeping the last resolved route");
		let mut state = self.inner.state.lock();
		if state.resolution.as_ref().is_some_and(|(installed, _)| *installed == seq) {
			let current = state.current.clone();
			state.resolution = Some((seq, future::ready(Ok::<_, RouterError>(current)).boxed().shared()));
		}
	}

	/// Applies an application-initiated intent.
	async fn navigate(self, intent: Intent, batching: bool) -> ResolutionResult<T> {
		if batching || intent.skip_render() {
			self.write_history(&intent)?;
			tracing::debug!(href = %intent, "history updated without rendering");
			self.inner.state.lock().applied = Some(intent);
			return Ok(self.resolved());
		}

		let resolved = resolver::resolve(&self.inner.routes, intent, &self.inner.not_found).await?;
		self.write_history(&resolved.intent)?;
		Ok(Some(self.commit(resolved)))
	}

	/// Resolves an intent describing the entry the history already shows.
	/// The entry is only rewritten if resolution changed the href.
	async fn refresh(self, intent: Intent) -> ResolutionResult<T> {
		let requested = intent.href();
		let resolved = resolver::resolve(&self.inner.routes, intent, &self.inner.not_found).await?;

		let href = resolved.intent.href();
		if href != requested {
			self.inner
				.history
				.replace_state(resolved.intent.state(), &self.inner.options.title, &href)?;
		}
		Ok(Some(self.commit(resolved)))
	}

	async fn reload(self) -> ResolutionResult<T> {
		let history = &self.inner.history;
		let intent = Intent::from_location(&history.location(), history.state())?;
		self.refresh(intent).await
	}

	/// Issues a delta and, outside a batch, waits for the traversal to
	/// land and resolves it.
	async fn traverse(self, delta: i32, batching: bool) -> ResolutionResult<T> {
		if batching {
			if delta != 0 {
				self.inner.history.go(delta);
				tracing::debug!(delta, "history traversed without rendering");
			}
			return Ok(self.resolved());
		}
		if delta == 0 {
			return self.reload().await;
		}

		let (sender, receiver) = oneshot::channel();
		let sender = Mutex::new(Some(sender));
		let inner = Arc::clone(&self.inner);
		inner.traversals.fetch_add(1, Ordering::SeqCst);
		let id = inner
			.history
			.add_popstate_listener(Arc::new(move |event: &PopStateEvent| {
				if let Some(sender) = sender.lock().take() {
					let _ = sender.send(event.state.clone());
				}
			}));
		let landing = scopeguard::guard(inner, move |inner| {
			inner.history.remove_popstate_listener(id);
			inner.traversals.fetch_sub(1, Ordering::SeqCst);
		});

		landing.history.go(delta);
		let state: Option<Value> = receiver
			.await
			.map_err(|_| RouterError::History("traversal listener dropped".to_string()))?;
		drop(landing);

		let intent = Intent::from_location(&self.inner.history.location(), state)?.with_pop(true);
		self.refresh(intent).await
	}

	fn write_history(&self, intent: &Intent) -> Result<(), RouterError> {
		let history = &self.inner.history;
		let title = &self.inner.options.title;
		let href = intent.href();
		if intent.replace() {
			history.replace_state(intent.state(), title, &href)
		} else {
			history.push_state(intent.state(), title, &href)
		}
	}

	fn commit(&self, resolved: Resolved<T>) -> Arc<Resolved<T>> {
		let resolved = Arc::new(resolved);
		let subscribers = {
			let mut state = self.inner.state.lock();
			state.current = Some(Arc::clone(&resolved));
			state.applied = Some(resolved.intent.clone());
			self.inner.subscribers.snapshot()
		};
		tracing::debug!(href = %resolved.intent, pop = resolved.intent.pop(), "navigation resolved");
		self.inner.subscribers.deliver(subscribers, resolved.as_ref());
		resolved
	}
}

fn settle<T>(slot: Resolution<T>) -> Navigation
where
	T: Send + Sync + 'static,
{
	async move { slot.await.map(|_| ()) }.boxed()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::create_router;
	use crate::history::{HistoryCall, MemoryHistory};
	use crate::table::RouteTable;
	use rstest::rstest;

	fn router(history: &Arc<MemoryHistory>) -> Router<String> {
		let routes = RouteTable::new()
			.route_sync("", |_| "home".to_string())
			.route_sync("foo", |_| "foo".to_string())
			.route("fail", |_| async { Err("nope".into()) });
		create_router(RouterConfig::new(history.clone()).routes(routes))
	}

	#[rstest]
	fn test_no_resolution_before_first_navigation() {
		let history = Arc::new(MemoryHistory::new("/"));
		let router = router(&history);
		assert!(router.resolution().is_none());
		assert!(router.current().is_none());
		assert!(router.resolved().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_slot_is_replaced_by_last_good_resolution() {
		let history = Arc::new(MemoryHistory::new("/"));
		let router = router(&history);
		router.go("/foo").await.unwrap();

		let err = router.go("/fail").await.unwrap_err();
		assert!(err.is_handler());

		let settled = router.resolution().unwrap().await.unwrap().unwrap();
		assert_eq!(settled.value, "foo");
		assert_eq!(history.calls(), vec![HistoryCall::push("/foo")]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_slot_does_not_clobber_newer_slot() {
		let history = Arc::new(MemoryHistory::new("/"));
		let router = router(&history);

		let failing = router.go("/fail");
		let succeeding = router.go("/foo");
		assert!(failing.await.is_err());
		succeeding.await.unwrap();

		let settled = router.resolution().unwrap().await.unwrap().unwrap();
		assert_eq!(settled.intent.href(), "/foo");
	}

	#[rstest]
	#[tokio::test]
	async fn test_navigation_runs_without_being_awaited() {
		let history = Arc::new(MemoryHistory::new("/"));
		let router = router(&history);

		drop(router.go("/foo"));
		router.resolution().unwrap().await.unwrap();
		assert_eq!(history.current_href(), "/foo");
	}

	#[rstest]
	#[tokio::test]
	async fn test_go_zero_reloads_current_entry() {
		let history = Arc::new(MemoryHistory::new("/foo"));
		let router = router(&history);

		router.go(0).await.unwrap();
		assert_eq!(router.current().map(|i| i.href()), Some("/foo".to_string()));
		assert!(history.calls().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalid_href_is_reported() {
		let history = Arc::new(MemoryHistory::new("/"));
		let router = router(&history);
		let err = router.go("http://[::1").await.unwrap_err();
		assert!(matches!(err, RouterError::InvalidHref(_)));
		assert!(history.calls().is_empty());
	}
}
