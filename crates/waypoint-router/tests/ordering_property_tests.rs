//! Property-based tests for navigation ordering
//!
//! Navigations issued back to back, without awaiting, must reach history
//! and subscribers in call order whatever their handlers' latencies.

#[cfg(not(target_arch = "wasm32"))]
mod property_tests {
	use parking_lot::Mutex;
	use proptest::prelude::*;
	use std::sync::Arc;
	use std::time::Duration;
	use waypoint_router::{HistoryCall, MemoryHistory, RouteTable, RouterConfig, create_router};

	fn run(delays: Vec<u64>, fail_at: Option<usize>) -> (Vec<HistoryCall>, Vec<String>, Vec<bool>) {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_time()
			.build()
			.unwrap();

		runtime.block_on(async move {
			let history = Arc::new(MemoryHistory::new("/"));
			let seen = Arc::new(Mutex::new(Vec::new()));
			let sink = Arc::clone(&seen);
			let routes = RouteTable::new().route("wait", |ctx| async move {
				let delay: u64 = ctx.rest().first().and_then(|d| d.parse().ok()).unwrap_or(0);
				tokio::time::sleep(Duration::from_millis(delay)).await;
				if ctx.intent().search().contains_key("fail") {
					return Err::<String, waypoint_router::HandlerError>("requested failure".into());
				}
				Ok(ctx.intent().href())
			});
			let router = create_router(
				RouterConfig::new(history.clone())
					.routes(routes)
					.on_resolve(move |resolved| sink.lock().push(resolved.value.clone())),
			);

			let navigations: Vec<_> = delays
				.iter()
				.enumerate()
				.map(|(i, delay)| {
					let suffix = if Some(i) == fail_at { "&fail=1" } else { "" };
					router.go(format!("/wait/{}?n={}{}", delay, i, suffix))
				})
				.collect();

			let mut outcomes = Vec::new();
			for navigation in navigations {
				outcomes.push(navigation.await.is_ok());
			}
			let seen = seen.lock().clone();
			(history.calls(), seen, outcomes)
		})
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(32))]

		/// Property: history writes and notifications follow call order
		#[test]
		fn prop_navigations_apply_in_call_order(delays in prop::collection::vec(0u64..4, 1..6)) {
			let (calls, seen, outcomes) = run(delays.clone(), None);

			let expected: Vec<String> = delays
				.iter()
				.enumerate()
				.map(|(i, delay)| format!("/wait/{}?n={}", delay, i))
				.collect();
			let pushed: Vec<HistoryCall> = expected.iter().map(HistoryCall::push).collect();

			prop_assert_eq!(calls, pushed);
			prop_assert_eq!(seen, expected);
			prop_assert!(outcomes.iter().all(|ok| *ok));
		}

		/// Property: a failed navigation is skipped without disturbing the others
		#[test]
		fn prop_failure_is_isolated(
			delays in prop::collection::vec(0u64..4, 2..6),
			fail_seed in any::<prop::sample::Index>(),
		) {
			let fail_at = fail_seed.index(delays.len());
			let (calls, seen, outcomes) = run(delays.clone(), Some(fail_at));

			let expected: Vec<String> = delays
				.iter()
				.enumerate()
				.filter(|(i, _)| *i != fail_at)
				.map(|(i, delay)| format!("/wait/{}?n={}", delay, i))
				.collect();
			let pushed: Vec<HistoryCall> = expected.iter().map(HistoryCall::push).collect();

			prop_assert_eq!(calls, pushed);
			prop_assert_eq!(seen, expected);
			for (i, ok) in outcomes.iter().enumerate() {
				prop_assert_eq!(*ok, i != fail_at);
			}
		}
	}
}
