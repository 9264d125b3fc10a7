//! Pipeline Ordering Tests
//!
//! End-to-end checks of the chain's ordering contract: before-actions in
//! configured forward order, after-actions in reverse, short-circuiting, and
//! failure propagation through enclosing interceptors.

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;

use meshcache::command::ComputeFn;
use meshcache::{
    CacheEngine, Command, CommandKind, CommandOutcome, Error, Interceptor, InvocationContext,
    NextInterceptor, Result,
};

/// Appends before/after markers to a shared trace log
struct Tracer {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Tracer {
    fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
        })
    }
}

#[async_trait]
impl Interceptor for Tracer {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: NextInterceptor<'_>,
    ) -> Result<CommandOutcome> {
        self.log.lock().push(format!("before:{}", self.name));
        let result = next.invoke(ctx, command).await;
        self.log.lock().push(format!("after:{}", self.name));
        result
    }
}

/// Short-circuits `Get` commands, delegating everything else
struct GetShortCircuit;

#[async_trait]
impl Interceptor for GetShortCircuit {
    fn name(&self) -> &'static str {
        "get-short-circuit"
    }

    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: NextInterceptor<'_>,
    ) -> Result<CommandOutcome> {
        match command.kind() {
            CommandKind::Get => Ok(CommandOutcome::Value(None)),
            _ => next.invoke(ctx, command).await,
        }
    }
}

#[tokio::test]
async fn before_actions_forward_after_actions_reverse() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = CacheEngine::builder()
        .interceptor(Tracer::new("outer", &log))
        .interceptor(Tracer::new("middle", &log))
        .interceptor(Tracer::new("inner", &log))
        .build()
        .unwrap();
    engine.start().await.unwrap();

    engine.invoke_local(&Command::put("k", "v")).await.unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "before:outer",
            "before:middle",
            "before:inner",
            "after:inner",
            "after:middle",
            "after:outer",
        ]
    );
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn short_circuit_skips_later_interceptors_and_terminal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = CacheEngine::builder()
        .interceptor(Tracer::new("outer", &log))
        .interceptor(Arc::new(GetShortCircuit))
        .interceptor(Tracer::new("inner", &log))
        .build()
        .unwrap();
    engine.start().await.unwrap();

    // Store through the full chain first
    engine.invoke_local(&Command::put("k", "v")).await.unwrap();
    log.lock().clear();

    // The Get is answered by the short-circuit: a miss, despite the entry
    // existing in the container
    let outcome = engine.invoke_local(&Command::get("k")).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Value(None));
    assert_eq!(*log.lock(), vec!["before:outer", "after:outer"]);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn terminal_failure_unwinds_through_after_hooks() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = CacheEngine::builder()
        .interceptor(Tracer::new("outer", &log))
        .build()
        .unwrap();
    engine.start().await.unwrap();

    engine
        .invoke_local(&Command::put("k", "not-a-number"))
        .await
        .unwrap();
    log.lock().clear();

    // Incrementing a non-numeric value fails inside the terminal handler
    let err = engine
        .invoke_local(&Command::Compute {
            key: "k".into(),
            function: ComputeFn::Increment(1),
            flags: Default::default(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, Error::Delegate { kind: CommandKind::Compute, .. });
    assert_matches!(err.root_cause(), Error::Internal(_));
    // The enclosing interceptor's after-hook still ran
    assert_eq!(*log.lock(), vec!["before:outer", "after:outer"]);
    // And the failed invocation left no partial effect
    let unchanged = engine.invoke_local(&Command::get("k")).await.unwrap();
    assert_eq!(unchanged.value().unwrap().as_ref(), b"not-a-number");

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn validation_failure_precedes_every_interceptor() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = CacheEngine::builder()
        .interceptor(Tracer::new("outer", &log))
        .build()
        .unwrap();
    engine.start().await.unwrap();

    let err = engine.invoke_local(&Command::get("")).await.unwrap_err();
    assert_matches!(err, Error::Validation(_));
    assert!(log.lock().is_empty());

    engine.stop().await.unwrap();
}
