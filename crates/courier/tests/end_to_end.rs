//! A configured client wired through the facade.

use courier::prelude::*;
use serde_json::{json, Value};

fn configured_client() -> ApiClient {
    let config = ConfigLoader::new()
        .with_string(
            r#"
            [client]
            path_param_style = "bracket"
            base_url = "https://api.example.com"

            [client.default_config]
            timeout = 2500
            "#,
            "toml",
        )
        .unwrap()
        .load()
        .unwrap();

    ApiClient::builder(action_fn(|config: RequestConfig| async move {
        Ok::<_, BoxError>(serde_json::to_value(config)?)
    }))
    .middleware(LoggerMiddleware::new())
    .config(&config.client)
    .middleware(GuardMiddleware::new(|ctx| !ctx.config().url.contains("/admin/")))
    .build()
}

#[tokio::test]
async fn test_configured_client_resolves_urls() {
    let client = configured_client();

    let output = client
        .delete("/users/[id]/sessions/[session]")
        .call(json!({"id": 7, "session": "abc", "force": true}))
        .await
        .unwrap();

    assert_eq!(
        output,
        json!({
            "method": "DELETE",
            "url": "https://api.example.com/users/7/sessions/abc",
            "params": {"force": true},
            "timeout": 2500,
        })
    );
}

#[tokio::test]
async fn test_guard_sees_resolved_url() {
    let client = configured_client();

    let err = client
        .get("/admin/[section]")
        .call(json!({"section": "billing"}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::AccessDenied));
    assert_eq!(
        err.message(),
        "You don't have access to GET https://api.example.com/admin/billing"
    );
}

#[tokio::test]
async fn test_bad_path_param() {
    let client = configured_client();

    let err = client
        .get("/users/[id]")
        .call(json!({"id": {"nested": true}}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::BadInput));
    assert_eq!(err.message(), "bad path parameter `id`");
}

#[tokio::test]
async fn test_routes_over_configured_client() {
    let client = configured_client();
    let routes = Routes::new()
        .route("users.show", client.get("/users/[id]"))
        .route("users.update", client.patch("/users/[id]"));

    let shown = routes.call("users.show", json!({"id": 1})).await.unwrap();
    let updated = routes
        .call("users.update", json!({"id": 1, "name": "ada"}))
        .await
        .unwrap();

    assert_eq!(shown["url"], json!("https://api.example.com/users/1"));
    assert_eq!(updated["data"], json!({"name": "ada"}));
    assert_eq!(
        routes.call("users.remove", Value::Null).await.unwrap_err().code(),
        Some(ErrorCode::BadRoute)
    );
}
