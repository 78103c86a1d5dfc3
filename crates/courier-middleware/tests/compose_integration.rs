//! Integration tests for middleware composition and the built-in stages.

use courier_core::{
    action_fn, context_action_fn, ApiError, BoxError, ErrorCode, ExecutionContext, RequestConfig,
};
use courier_middleware::stages::{PathParamsMiddleware, RefreshTokenMiddleware};
use courier_middleware::{
    compose, error_handler_fn, BoxedMiddleware, ExecuteAction, FnMiddleware, Middleware,
};
use http::Method;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> BoxedMiddleware {
    let log = Arc::clone(log);
    Arc::new(FnMiddleware::new(name, move |ctx, next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().push(format!("{name}-enter"));
            let result = next.run(ctx).await;
            log.lock().push(format!("{name}-exit"));
            result
        })
    }))
}

fn recording_context(log: &Arc<Mutex<Vec<String>>>) -> ExecutionContext {
    let log = Arc::clone(log);
    let action = action_fn(move |_config: RequestConfig| {
        log.lock().push("T".to_string());
        async { Ok::<_, BoxError>(json!("done")) }
    });
    ExecutionContext::new(RequestConfig::new(Method::GET, "/"), Arc::new(action))
}

#[tokio::test]
async fn test_onion_ordering() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let composer = compose(vec![recorder("A", &log), recorder("B", &log)], None);
    let mut ctx = recording_context(&log);

    composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap();

    assert_eq!(
        *log.lock(),
        vec!["A-enter", "B-enter", "T", "B-exit", "A-exit"]
    );
    assert_eq!(ctx.output(), &json!("done"));
}

#[tokio::test]
async fn test_next_twice_deep_in_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let double: BoxedMiddleware = Arc::new(FnMiddleware::new("double", |ctx, next| {
        Box::pin(async move {
            next.clone().run(ctx).await?;
            next.run(ctx).await
        })
    }));
    let composer = compose(
        vec![recorder("A", &log), double, recorder("C", &log)],
        None,
    );
    let mut ctx = recording_context(&log);

    let err = composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap_err();
    assert!(err.message().contains("multiple times"));
    // Downstream stages and the action ran exactly once.
    assert_eq!(
        *log.lock(),
        vec!["A-enter", "C-enter", "T", "C-exit", "A-exit"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_action() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let action = action_fn(move |_config: RequestConfig| {
        counted.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, BoxError>(json!("network")) }
    });
    let cache: BoxedMiddleware = Arc::new(FnMiddleware::new("cache", |ctx, _next| {
        Box::pin(async move {
            ctx.set_output(json!("cached"));
            Ok(())
        })
    }));
    let log = Arc::new(Mutex::new(Vec::new()));
    let composer = compose(vec![cache, recorder("after", &log)], None);
    let mut ctx = ExecutionContext::new(RequestConfig::new(Method::GET, "/"), Arc::new(action));

    composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(log.lock().is_empty());
    assert_eq!(ctx.output(), &json!("cached"));
}

#[tokio::test]
async fn test_error_handler_recovers_action_failure() {
    let action = action_fn(|_config: RequestConfig| async {
        Err::<Value, BoxError>("boom".into())
    });
    let handler = error_handler_fn(|err, _ctx| {
        let message = err.message().to_string();
        Box::pin(async move { Ok(json!({ "fallback": message })) })
    });
    let composer = compose(vec![], Some(Arc::new(handler)));
    let mut ctx = ExecutionContext::new(RequestConfig::new(Method::GET, "/"), Arc::new(action));

    composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap();

    assert!(ctx.is_ok());
    assert!(ctx.is_recovered());
    assert_eq!(ctx.output(), &json!({ "fallback": "boom" }));
    assert_eq!(ctx.error().and_then(ApiError::code), Some(ErrorCode::HttpError));
}

#[tokio::test]
async fn test_path_params_scenario() {
    let captured = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&captured);
    let action = action_fn(move |config: RequestConfig| {
        *sink.lock() = Some(config);
        async { Ok::<_, BoxError>(Value::Null) }
    });
    let composer = compose(vec![Arc::new(PathParamsMiddleware::new())], None);
    let mut ctx = ExecutionContext::builder(RequestConfig::new(Method::GET, "/users/:id"), Arc::new(action))
        .input(json!({"id": 123}))
        .build();

    composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap();

    let config = captured.lock().clone().unwrap();
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({"method": "GET", "url": "/users/123", "params": {}})
    );
}

#[tokio::test]
async fn test_refresh_is_single_flight() {
    const REQUESTS: usize = 8;

    let refreshes = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&refreshes);
    let refresh = RefreshTokenMiddleware::new(
        move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!("new-token"))
            })
        },
        |err, _ctx| err.code() == Some(ErrorCode::HttpError),
    )
    .before_retry(|token, ctx| {
        if let Some(token) = token.as_str() {
            ctx.config_mut().set_header("Authorization", token);
        }
    });
    let composer = compose(vec![Arc::new(refresh) as Arc<dyn Middleware>], None);

    let action = Arc::new(context_action_fn(|config, _ctx| {
        Box::pin(async move {
            match config.header("Authorization") {
                Some("new-token") => Ok(json!({ "authorized": true })),
                _ => Err::<Value, BoxError>("401 unauthorized".into()),
            }
        })
    }));

    let calls = (0..REQUESTS).map(|_| {
        let composer = composer.clone();
        let action = Arc::clone(&action);
        async move {
            let mut config = RequestConfig::new(Method::GET, "/me");
            config.set_header("Authorization", "stale-token");
            let mut ctx = ExecutionContext::new(config, action);
            composer.run(&mut ctx, Some(&ExecuteAction)).await.map(|()| ctx)
        }
    });
    let results = futures_util::future::join_all(calls).await;

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    for result in results {
        let ctx = result.unwrap();
        assert_eq!(ctx.output(), &json!({ "authorized": true }));
        assert_eq!(ctx.config().header("Authorization"), Some("new-token"));
    }
}

#[tokio::test]
async fn test_refresh_skips_unmatched_errors() {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&refreshes);
    let refresh = RefreshTokenMiddleware::new(
        move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(json!("token")) })
        },
        |_err, _ctx| false,
    );
    let composer = compose(vec![Arc::new(refresh)], None);
    let action = action_fn(|_config: RequestConfig| async {
        Err::<Value, BoxError>("500".into())
    });
    let mut ctx = ExecutionContext::new(RequestConfig::new(Method::GET, "/"), Arc::new(action));

    let err = composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap_err();
    assert_eq!(err.message(), "500");
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);
}
