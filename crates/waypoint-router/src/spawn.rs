//! Background task spawning.
//!
//! On `wasm32` tasks go to the browser's microtask queue through
//! `wasm_bindgen_futures::spawn_local`. On native targets they go to the
//! ambient tokio runtime; without one, nothing is spawned and callers fall
//! back to driving the future themselves.

use std::future::Future;

/// Returns `true` if [`spawn_detached`] can run tasks in this context.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn can_spawn() -> bool {
	true
}

/// Returns `true` if [`spawn_detached`] can run tasks in this context.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn can_spawn() -> bool {
	tokio::runtime::Handle::try_current().is_ok()
}

/// Spawns a future in the background. Returns `false` if no executor is
/// available, in which case the future is dropped.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn spawn_detached<F>(future: F) -> bool
where
	F: Future<Output = ()> + Send + 'static,
{
	wasm_bindgen_futures::spawn_local(future);
	true
}

/// Spawns a future in the background. Returns `false` if no executor is
/// available, in which case the future is dropped.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn spawn_detached<F>(future: F) -> bool
where
	F: Future<Output = ()> + Send + 'static,
{
	match tokio::runtime::Handle::try_current() {
		Ok(handle) => {
			handle.spawn(future);
			true
		}
		Err(_) => {
			tracing::trace!("no async runtime; task runs when awaited");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicBool, Ordering};

	#[rstest]
	fn test_no_runtime_does_not_spawn() {
		assert!(!can_spawn());
		assert!(!spawn_detached(async {}));
	}

	#[rstest]
	#[tokio::test]
	async fn test_spawns_on_ambient_runtime() {
		assert!(can_spawn());

		let ran = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&ran);
		let (tx, rx) = futures::channel::oneshot::channel();
		assert!(spawn_detached(async move {
			flag.store(true, Ordering::SeqCst);
			let _ = tx.send(());
		}));

		rx.await.unwrap();
		assert!(ran.load(Ordering::SeqCst));
	}
}
