//! Smoke tests for the `waypoint` facade re-exports.

use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use waypoint::prelude::*;

#[rstest]
#[tokio::test]
async fn test_prelude_builds_a_working_router() {
	let history = Arc::new(MemoryHistory::new("/"));
	let routes = RouteTable::new()
		.route_sync(INDEX, |_| "home".to_string())
		.route_sync("settings", |ctx| {
			let state = ctx.intent().state().map(|s| s.to_string()).unwrap_or_default();
			format!("settings {}", state)
		});
	let router = create_router(RouterConfig::new(history.clone()).routes(routes));

	router.init().await.unwrap();
	router
		.go_with("/settings", NavigateOptions::new().state(json!({"tab": 2})))
		.await
		.unwrap();

	let resolved = router.resolved().unwrap();
	assert_eq!(resolved.value, r#"settings {"tab":2}"#);
	assert_eq!(history.current_href(), "/settings");
}

#[rstest]
fn test_router_module_is_reexported() {
	let options = waypoint::router::RouterOptions::from_json(r#"{"no_click": true}"#).unwrap();
	assert!(options.no_click);
}
