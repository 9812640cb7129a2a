//! Route resolution.
//!
//! Resolution runs in two phases. Planning walks the route table under its
//! read lock and picks the handlers to run; execution releases the lock
//! and awaits them. Edits made to the table while handlers run only affect
//! the next resolution.
//!
//! Matching rules for a table and the remaining segments:
//!
//! 1. An exact key for the first segment wins. A handler receives the
//!    remaining segments; a nested table recurses on them and, if it cannot
//!    place them, matching continues in the parent.
//! 2. The index entry claims the table's own path (no segments left). An
//!    index handler also claims a remainder the catch-all can place, and
//!    receives the catch-all's result as `next`.
//! 3. The catch-all claims whatever is left.
//!
//! A handler selected with segments left over receives, as `next`, the
//! result of resolving them against its table's catch-all.
//!
//! When nothing matches, the not-found fallback runs. A redirecting
//! fallback is resolved exactly once more; if that misses too the
//! resolution fails with [`RouterError::FallbackUnresolved`].

use crate::error::{HandlerError, RouterError};
use crate::intent::Intent;
use crate::table::{CATCH_ALL, Handler, INDEX, RouteContext, RouteEntry, RouteTable, SharedRouteTable};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
	/// Value produced by the route handler.
	pub value: T,
	/// Intent actually applied, after any rewrite.
	pub intent: Intent,
}

/// Context handed to the not-found fallback.
#[derive(Debug, Clone)]
pub struct NotFoundContext {
	/// Segments no route could place.
	pub rest: Vec<String>,
	/// The intent that failed to match.
	pub intent: Intent,
}

/// What the not-found fallback decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback<T> {
	/// Resolve this intent instead. Tried exactly once.
	Redirect(Intent),
	/// Use this value for the unmatched intent.
	Render(T),
}

type NotFoundFn<T> =
	Arc<dyn Fn(NotFoundContext) -> BoxFuture<'static, Result<Fallback<T>, HandlerError>> + Send + Sync>;

/// Not-found fallback.
pub struct NotFound<T> {
	inner: NotFoundFn<T>,
}

impl<T> Clone for NotFound<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> std::fmt::Debug for NotFound<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("NotFound")
	}
}

impl<T: Send + 'static> Default for NotFound<T> {
	fn default() -> Self {
		Self::redirect_to_root()
	}
}

impl<T: Send + 'static> NotFound<T> {
	/// Creates a fallback from an async function.
	pub fn new<F, Fut>(fallback: F) -> Self
	where
		F: Fn(NotFoundContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Fallback<T>, HandlerError>> + Send + 'static,
	{
		Self {
			inner: Arc::new(move |ctx| fallback(ctx).boxed()),
		}
	}

	/// Rewrites unmatched intents to the root path, keeping state and flags.
	pub fn redirect_to_root() -> Self {
		Self::redirect(|ctx| ctx.intent.with_path(Vec::<String>::new()).with_search(Default::default()))
	}

	/// Rewrites unmatched intents with a synchronous function.
	pub fn redirect<F>(rewrite: F) -> Self
	where
		F: Fn(NotFoundContext) -> Intent + Send + Sync + 'static,
	{
		Self::new(move |ctx| futures::future::ready(Ok(Fallback::Redirect(rewrite(ctx)))))
	}

	/// Renders a value for unmatched intents without rewriting them.
	pub fn render<F>(render: F) -> Self
	where
		F: Fn(NotFoundContext) -> T + Send + Sync + 'static,
	{
		Self::new(move |ctx| futures::future::ready(Ok(Fallback::Render(render(ctx)))))
	}

	fn call(&self, ctx: NotFoundContext) -> BoxFuture<'static, Result<Fallback<T>, HandlerError>> {
		(self.inner)(ctx)
	}
}

/// Handlers selected for a path, ready to run without the table lock.
struct Plan<T> {
	handler: Handler<T>,
	rest: Vec<String>,
	next: Option<Box<Plan<T>>>,
}

enum Attempt<T> {
	Matched(Resolved<T>),
	Unmatched(Vec<String>),
}

/// Resolves an intent against a route table.
///
/// # Errors
///
/// Returns [`RouterError::Handler`] if a handler or the fallback fails and
/// [`RouterError::FallbackUnresolved`] if the fallback redirects to a path
/// that does not resolve either.
pub async fn resolve<T>(
	routes: &SharedRouteTable<T>,
	intent: Intent,
	not_found: &NotFound<T>,
) -> Result<Resolved<T>, RouterError>
where
	T: Send + 'static,
{
	let rest = match attempt(routes, intent.clone()).await? {
		Attempt::Matched(resolved) => return Ok(resolved),
		Attempt::Unmatched(rest) => rest,
	};

	tracing::debug!(href = %intent, "no route matched; invoking not-found fallback");
	let fallback = not_found
		.call(NotFoundContext {
			rest,
			intent: intent.clone(),
		})
		.await
		.map_err(RouterError::handler)?;

	match fallback {
		Fallback::Render(value) => Ok(Resolved { value, intent }),
		Fallback::Redirect(target) => match attempt(routes, target.clone()).await? {
			Attempt::Matched(resolved) => Ok(resolved),
			Attempt::Unmatched(_) => Err(RouterError::FallbackUnresolved(target.href())),
		},
	}
}

async fn attempt<T>(routes: &SharedRouteTable<T>, intent: Intent) -> Result<Attempt<T>, RouterError>
where
	T: Send + 'static,
{
	let plan = {
		let table = routes.read();
		plan(&table, intent.path())
	};

	match plan {
		Some(plan) => {
			tracing::trace!(href = %intent, rest = ?plan.rest, "route planned");
			let value = run(plan, intent.clone()).await?;
			Ok(Attempt::Matched(Resolved { value, intent }))
		}
		None => Ok(Attempt::Unmatched(intent.path().to_vec())),
	}
}

fn plan<T>(table: &RouteTable<T>, segments: &[String]) -> Option<Plan<T>> {
	if let Some((head, tail)) = segments.split_first() {
		match table.get(head) {
			Some(RouteEntry::Handler(handler)) => return Some(leaf(table, handler, tail)),
			Some(RouteEntry::Table(nested)) => {
				if let Some(found) = plan(nested, tail) {
					return Some(found);
				}
			}
			None => {}
		}
	}

	match table.get(INDEX) {
		Some(RouteEntry::Handler(handler)) if segments.is_empty() => {
			return Some(leaf(table, handler, segments));
		}
		Some(RouteEntry::Handler(handler)) => {
			// The index only claims a remainder it can wrap
			if let Some(child) = catch_all(table, segments) {
				return Some(Plan {
					handler: Arc::clone(handler),
					rest: segments.to_vec(),
					next: Some(Box::new(child)),
				});
			}
		}
		Some(RouteEntry::Table(nested)) if segments.is_empty() => {
			if let Some(found) = plan(nested, segments) {
				return Some(found);
			}
		}
		_ => {}
	}

	catch_all(table, segments)
}

fn catch_all<T>(table: &RouteTable<T>, segments: &[String]) -> Option<Plan<T>> {
	match table.get(CATCH_ALL) {
		Some(RouteEntry::Handler(handler)) => Some(Plan {
			handler: Arc::clone(handler),
			rest: segments.to_vec(),
			next: None,
		}),
		Some(RouteEntry::Table(nested)) => plan(nested, segments),
		None => None,
	}
}

fn leaf<T>(table: &RouteTable<T>, handler: &Handler<T>, rest: &[String]) -> Plan<T> {
	let next = if rest.is_empty() {
		None
	} else {
		catch_all(table, rest).map(Box::new)
	};

	Plan {
		handler: Arc::clone(handler),
		rest: rest.to_vec(),
		next,
	}
}

fn run<T>(plan: Plan<T>, intent: Intent) -> BoxFuture<'static, Result<T, RouterError>>
where
	T: Send + 'static,
{
	async move {
		let next = match plan.next {
			Some(child) => Some(run(*child, intent.clone()).await?),
			None => None,
		};
		(plan.handler)(RouteContext::new(plan.rest, intent, next))
			.await
			.map_err(RouterError::handler)
	}
	.boxed()
}
