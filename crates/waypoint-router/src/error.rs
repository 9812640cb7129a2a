//! Error types for navigation.

use std::error::Error;
use std::sync::Arc;

/// Error returned by route handlers and not-found fallbacks.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Error type for router operations.
///
/// The error is `Clone` because a settled resolution is shared by every
/// navigation queued behind it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
	/// A resolve function or not-found fallback failed.
	#[error("Route handler failed: {0}")]
	Handler(Arc<dyn Error + Send + Sync>),
	/// The not-found fallback redirected to a target that does not resolve either.
	#[error("Not-found fallback target is unresolvable: {0}")]
	FallbackUnresolved(String),
	/// A patch function was used before any navigation was applied.
	#[error("No previous navigation to derive from")]
	NoPreviousIntent,
	/// An href could not be parsed.
	#[error("Invalid href: {0}")]
	InvalidHref(String),
	/// Router options could not be parsed.
	#[error("Invalid router options: {0}")]
	InvalidOptions(String),
	/// The history adapter failed or a traversal could not be observed.
	#[error("History operation failed: {0}")]
	History(String),
}

impl RouterError {
	/// Wraps a handler failure.
	pub fn handler(err: HandlerError) -> Self {
		Self::Handler(Arc::from(err))
	}

	/// Returns `true` if this error came from a route handler.
	pub fn is_handler(&self) -> bool {
		matches!(self, Self::Handler(_))
	}
}
