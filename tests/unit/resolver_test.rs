//! Unit tests for the fallback resolver

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use gen_fallback_gateway::backend::traits::{
    BackendDescriptor, BackendError, BackendInvoker, BackendKind, FailureKind, GeneratedContent,
    GenerationRequest,
};
use gen_fallback_gateway::gateway::catalog::BackendCatalog;
use gen_fallback_gateway::gateway::resolver::{FallbackResolver, ResolutionState};
use gen_fallback_gateway::AppError;

/// Scripted behaviour for one backend
#[derive(Clone)]
enum Script {
    Succeed(GeneratedContent),
    Fail(&'static str),
    Hang,
}

/// Invoker that follows a script and records every call it receives
struct SpyInvoker {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl SpyInvoker {
    fn new(scripts: Vec<(&str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(id, s)| (id.to_string(), s))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendInvoker for SpyInvoker {
    fn name(&self) -> &str {
        "spy"
    }

    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        _request: &GenerationRequest,
    ) -> Result<GeneratedContent, BackendError> {
        self.calls.lock().unwrap().push(backend.identifier.clone());
        match self.scripts.get(&backend.identifier).cloned() {
            Some(Script::Succeed(content)) => Ok(content),
            Some(Script::Fail(detail)) => Err(BackendError::new(detail)),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(BackendError::new("hung backend finally gave up"))
            }
            None => Err(BackendError::new("unscripted backend")),
        }
    }
}

fn catalog(kind: BackendKind, ids: &[&str]) -> Arc<BackendCatalog> {
    Arc::new(
        BackendCatalog::new(ids.iter().map(|id| BackendDescriptor::new(*id, kind))).unwrap(),
    )
}

fn text(s: &str) -> GeneratedContent {
    GeneratedContent::Text(s.to_string())
}

#[tokio::test]
async fn test_first_backend_success_stops_iteration() {
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &["a", "b", "c"]));
    let invoker = SpyInvoker::new(vec![
        ("a", Script::Succeed(text("first"))),
        ("b", Script::Succeed(text("second"))),
    ]);

    let resolution = resolver
        .resolve(&GenerationRequest::text("hi"), &invoker, &CancellationToken::new())
        .await
        .unwrap();

    assert!(resolution.succeeded());
    assert_eq!(resolution.attempts.len(), 1);
    assert_eq!(resolution.winning_backend(), Some("a"));
    assert_eq!(invoker.calls(), vec!["a"]);
}

#[tokio::test]
async fn test_k_failures_then_success() {
    let ids = ["b0", "b1", "b2", "b3", "b4"];
    for k in 0..ids.len() {
        let scripts = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let script = if i < k {
                    Script::Fail("quota exceeded")
                } else {
                    Script::Succeed(text(id))
                };
                (*id, script)
            })
            .collect();
        let invoker = SpyInvoker::new(scripts);
        let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &ids));

        let resolution = resolver
            .resolve(&GenerationRequest::text("hi"), &invoker, &CancellationToken::new())
            .await
            .unwrap();

        assert!(resolution.succeeded());
        assert_eq!(resolution.attempts.len(), k + 1);
        assert!(resolution.attempts[..k].iter().all(|a| !a.succeeded()));
        assert!(resolution.attempts[k].succeeded());
        assert_eq!(resolution.content(), Some(&text(ids[k])));
        assert_eq!(invoker.calls().len(), k + 1);
    }
}

#[tokio::test]
async fn test_all_backends_fail_in_catalog_order() {
    let ids = ["x", "y", "z"];
    let invoker = SpyInvoker::new(ids.iter().map(|id| (*id, Script::Fail("down"))).collect());
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &ids));

    let resolution = resolver
        .resolve(&GenerationRequest::text("hi"), &invoker, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolution.state, ResolutionState::Exhausted);
    assert!(!resolution.succeeded());
    assert!(resolution.content().is_none());
    let order: Vec<_> = resolution
        .attempts
        .iter()
        .map(|a| a.backend.identifier.as_str())
        .collect();
    assert_eq!(order, ids);
    assert!(resolution.attempts.iter().all(|a| a.error_detail() == Some("down")));
}

#[tokio::test]
async fn test_blank_payload_invokes_nothing() {
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &["a"]));
    let invoker = SpyInvoker::new(vec![("a", Script::Succeed(text("x")))]);

    for payload in ["", "   ", "\n\t"] {
        let result = resolver
            .resolve(&GenerationRequest::text(payload), &invoker, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn test_empty_catalog_is_configuration_error() {
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &["a"]));
    let invoker = SpyInvoker::new(vec![]);

    let result = resolver
        .resolve(&GenerationRequest::image("a cat"), &invoker, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(AppError::NoBackendConfigured(BackendKind::ImageGeneration))
    ));
    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn test_scenario_quota_then_success() {
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &["lite", "exp"]));
    let invoker = SpyInvoker::new(vec![
        ("lite", Script::Fail("429 quota exceeded for model lite")),
        ("exp", Script::Succeed(text("hello"))),
    ]);

    let resolution = resolver
        .resolve(&GenerationRequest::text("hi"), &invoker, &CancellationToken::new())
        .await
        .unwrap();

    assert!(resolution.succeeded());
    assert_eq!(resolution.winning_backend(), Some("exp"));
    assert_eq!(resolution.content(), Some(&text("hello")));
    assert_eq!(resolution.attempts.len(), 2);
    assert_eq!(resolution.attempts[0].backend.identifier, "lite");
    assert!(!resolution.attempts[0].succeeded());
    assert_eq!(
        resolution.attempts[0].error.as_ref().map(|e| e.kind),
        Some(FailureKind::QuotaExceeded)
    );
    assert_eq!(resolution.attempts[1].backend.identifier, "exp");
    assert!(resolution.attempts[1].succeeded());
}

#[tokio::test]
async fn test_scenario_single_image_backend_denied() {
    let resolver =
        FallbackResolver::new(catalog(BackendKind::ImageGeneration, &["imagen3"]));
    let invoker = SpyInvoker::new(vec![("imagen3", Script::Fail("403 access denied"))]);

    let resolution = resolver
        .resolve(&GenerationRequest::image("a cat"), &invoker, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolution.state, ResolutionState::Exhausted);
    assert_eq!(resolution.attempts.len(), 1);
    assert_eq!(resolution.attempts[0].backend.identifier, "imagen3");
    assert_eq!(resolution.attempts[0].error_detail(), Some("403 access denied"));
}

#[tokio::test]
async fn test_cancel_while_first_backend_in_flight() {
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &["slow", "next"]));
    let invoker = SpyInvoker::new(vec![
        ("slow", Script::Hang),
        ("next", Script::Succeed(text("never"))),
    ]);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let resolution = tokio::time::timeout(
        Duration::from_secs(5),
        resolver.resolve(&GenerationRequest::text("hi"), &invoker, &cancel),
    )
    .await
    .expect("resolve should return promptly after cancellation")
    .unwrap();

    assert_eq!(resolution.state, ResolutionState::Cancelled);
    assert!(resolution.attempts.is_empty());
    assert_eq!(invoker.calls(), vec!["slow"]);
}

#[tokio::test]
async fn test_cancelled_before_start_invokes_nothing() {
    let resolver = FallbackResolver::new(catalog(BackendKind::TextGeneration, &["a"]));
    let invoker = SpyInvoker::new(vec![("a", Script::Succeed(text("x")))]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let resolution = resolver
        .resolve(&GenerationRequest::text("hi"), &invoker, &cancel)
        .await
        .unwrap();

    assert_eq!(resolution.state, ResolutionState::Cancelled);
    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn test_deadline_stops_after_failed_attempts() {
    let resolver = FallbackResolver::with_timeout(
        catalog(BackendKind::TextGeneration, &["broken", "slow", "next"]),
        Some(Duration::from_millis(100)),
    );
    let invoker = SpyInvoker::new(vec![
        ("broken", Script::Fail("503 unavailable")),
        ("slow", Script::Hang),
        ("next", Script::Succeed(text("never"))),
    ]);

    let resolution = resolver
        .resolve(&GenerationRequest::text("hi"), &invoker, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolution.state, ResolutionState::TimedOut);
    assert_eq!(resolution.attempts.len(), 1);
    assert_eq!(resolution.attempts[0].backend.identifier, "broken");
    assert_eq!(invoker.calls(), vec!["broken", "slow"]);
}
