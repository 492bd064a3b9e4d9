//! Sequential pipeline execution.

use std::sync::{Mutex, PoisonError};

use testrun_core::{EventKind, RunEvent, RunId};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::context::{GateStatus, RunContext};
use crate::error::RunnerError;
use crate::task::TaskDescriptor;

/// Runner configuration.
#[derive(Debug, Default)]
pub struct RunnerConfig {
    /// Tasks to execute, in order.
    pub pipeline: Vec<TaskDescriptor>,
}

impl RunnerConfig {
    /// Create a configuration from a pipeline.
    pub fn new(pipeline: Vec<TaskDescriptor>) -> Self {
        Self { pipeline }
    }
}

/// Executes a fixed pipeline of tasks, one at a time.
///
/// A runner is single-use: the second call to [`run`](Self::run) fails with
/// [`RunnerError::AlreadyRun`].
pub struct Runner {
    pipeline: Mutex<Option<Vec<TaskDescriptor>>>,
    context: RunContext,
}

impl Runner {
    /// Create a runner for the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            pipeline: Mutex::new(Some(config.pipeline)),
            context: RunContext::new(),
        }
    }

    /// Handle passed to every task.
    pub fn context(&self) -> RunContext {
        self.context.clone()
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> &RunId {
        self.context.run_id()
    }

    /// Subscribe to events of `kind`.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        self.context.on(kind, listener);
    }

    /// Publish an event.
    pub fn emit(&self, event: RunEvent) {
        self.context.emit(event);
    }

    /// Execute the pipeline.
    ///
    /// Resolves once every task has completed and every wait gate registered
    /// along the way has fired. Rejects with the first task error or gate
    /// failure; no further tasks are started after that.
    pub async fn run(&self) -> Result<(), RunnerError> {
        self.context.begin()?;
        let pipeline = self
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();

        // Settles the context even when this future is dropped mid-run.
        let _finish = FinishOnDrop(&self.context);
        let span = info_span!("run", run_id = %self.context.run_id());
        self.execute(pipeline).instrument(span).await
    }

    async fn execute(&self, pipeline: Vec<TaskDescriptor>) -> Result<(), RunnerError> {
        let mut gates = self.context.subscribe_gates();
        info!(tasks = pipeline.len(), "Starting pipeline");

        for (index, task) in pipeline.into_iter().enumerate() {
            self.check_gates()?;

            let label = task.describe();
            debug!(index, task = %label, "Invoking task");

            let ctx = self.context.clone();
            let mut handle = tokio::spawn(
                async move { task.invoke(Vec::new(), ctx).await }.in_current_span(),
            );

            loop {
                tokio::select! {
                    joined = &mut handle => {
                        match joined {
                            Ok(Ok(())) => break,
                            Ok(Err(source)) => {
                                warn!(index, task = %label, error = %source, "Task failed");
                                return Err(RunnerError::TaskFailed { index, label, source });
                            }
                            Err(e) if e.is_panic() => {
                                warn!(index, task = %label, "Task panicked");
                                return Err(RunnerError::TaskPanicked { index, label });
                            }
                            Err(_) => return Err(RunnerError::TaskCancelled { index, label }),
                        }
                    }
                    _ = gates.changed() => {
                        if let Err(e) = self.check_gates() {
                            warn!(index, task = %label, "Wait gate failed, aborting task");
                            handle.abort();
                            return Err(e);
                        }
                    }
                }
            }
        }

        debug!("Pipeline complete, waiting for gates");
        self.wait_for_gates(&mut gates).await?;
        info!("Run complete");
        Ok(())
    }

    fn check_gates(&self) -> Result<(), RunnerError> {
        match self.context.gate_status() {
            GateStatus::Failed(event, failure) => Err(RunnerError::GateFailed { event, failure }),
            _ => Ok(()),
        }
    }

    async fn wait_for_gates(&self, gates: &mut watch::Receiver<u64>) -> Result<(), RunnerError> {
        loop {
            match self.context.gate_status() {
                GateStatus::Open => return Ok(()),
                GateStatus::Failed(event, failure) => {
                    return Err(RunnerError::GateFailed { event, failure })
                }
                GateStatus::Pending => {
                    // The sender lives in the context we hold, so this only
                    // returns once a gate changed.
                    let _ = gates.changed().await;
                }
            }
        }
    }
}

struct FinishOnDrop<'a>(&'a RunContext);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional::when;
    use crate::error::BoxError;
    use crate::task::TaskArgs;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use testrun_core::RunFailure;

    type Log = Arc<std::sync::Mutex<Vec<String>>>;

    fn push(log: &Log, entry: impl Into<String>) {
        log.lock().unwrap().push(entry.into());
    }

    fn delayed(log: &Log, name: &'static str, millis: u64) -> TaskDescriptor {
        let log = log.clone();
        TaskDescriptor::named(
            name,
            move |_, _| {
                let log = log.clone();
                async move {
                    push(&log, format!("{name}:start"));
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    push(&log, format!("{name}:end"));
                }
            },
            vec![],
        )
    }

    #[tokio::test]
    async fn test_empty_pipeline_resolves() {
        let runner = Runner::new(RunnerConfig::default());
        runner.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_bare_task_receives_runner_context() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let slot = seen.clone();
        let runner = Runner::new(RunnerConfig::new(vec![TaskDescriptor::bare(
            move |args, ctx| {
                slot.lock().unwrap().push((args, ctx));
                async {}
            },
        )]));

        runner.run().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.is_empty());
        assert_eq!(seen[0].1, runner.context());
    }

    #[tokio::test]
    async fn test_tasks_run_strictly_in_order() {
        let log = Log::default();
        let runner = Runner::new(RunnerConfig::new(vec![
            delayed(&log, "a", 30),
            delayed(&log, "b", 1),
            delayed(&log, "c", 10),
        ]));

        runner.run().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:start", "a:end", "b:start", "b:end", "c:start", "c:end"]
        );
    }

    #[tokio::test]
    async fn test_named_tasks_receive_fixed_args_then_context() {
        let calls: Arc<std::sync::Mutex<Vec<(String, TaskArgs, RunContext)>>> = Default::default();
        let spy = |name: &'static str, args: TaskArgs| {
            let calls = calls.clone();
            TaskDescriptor::named(
                name,
                move |args, ctx| {
                    calls.lock().unwrap().push((name.to_string(), args, ctx));
                    async {}
                },
                args,
            )
        };

        let runner = Runner::new(RunnerConfig::new(vec![
            spy("customTask2", vec![json!(5)]),
            spy("customTask3", vec![json!("test"), json!(10)]),
            spy("customTask4", vec![json!("customTask1")]),
        ]));
        runner.run().await.unwrap();

        let calls = calls.lock().unwrap();
        let ctx = runner.context();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], ("customTask2".to_string(), vec![json!(5)], ctx.clone()));
        assert_eq!(
            calls[1],
            ("customTask3".to_string(), vec![json!("test"), json!(10)], ctx.clone())
        );
        assert_eq!(
            calls[2],
            ("customTask4".to_string(), vec![json!("customTask1")], ctx)
        );
    }

    #[tokio::test]
    async fn test_failing_task_stops_pipeline() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();

        let runner = Runner::new(RunnerConfig::new(vec![
            TaskDescriptor::named(
                "taskA",
                |_, _| async { Err::<(), BoxError>("taskA exploded".into()) },
                vec![],
            ),
            TaskDescriptor::named(
                "taskB",
                move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async {}
                },
                vec![],
            ),
        ]));

        let err = runner.run().await.unwrap_err();
        match err {
            RunnerError::TaskFailed { index, label, source } => {
                assert_eq!(index, 0);
                assert_eq!(label, "taskA");
                assert_eq!(source.to_string(), "taskA exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_a_failure() {
        let runner = Runner::new(RunnerConfig::new(vec![TaskDescriptor::named::<_, _, ()>(
            "boom",
            |_, _| async { panic!("boom") },
            vec![],
        )]));

        assert!(matches!(
            runner.run().await,
            Err(RunnerError::TaskPanicked { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_run_twice_fails() {
        let runner = Runner::new(RunnerConfig::new(vec![TaskDescriptor::bare(|_, _| async {})]));
        runner.run().await.unwrap();
        assert!(matches!(runner.run().await, Err(RunnerError::AlreadyRun)));
    }

    #[tokio::test]
    async fn test_gate_blocks_until_event() {
        let runner = Runner::new(RunnerConfig::new(vec![TaskDescriptor::bare(|_, ctx| async move {
            ctx.wait_for_event(EventKind::custom("X"))
        })]));
        let ctx = runner.context();

        let run = runner.run();
        tokio::pin!(run);
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut run)
            .await
            .is_err());

        ctx.emit(RunEvent::custom("X"));
        run.await.unwrap();
    }

    #[tokio::test]
    async fn test_multiple_gates_all_required() {
        let runner = Runner::new(RunnerConfig::new(vec![
            TaskDescriptor::bare(|_, ctx| async move { ctx.wait_for_event(EventKind::custom("a")) }),
            TaskDescriptor::bare(|_, ctx| async move { ctx.wait_for_event(EventKind::custom("b")) }),
        ]));
        let ctx = runner.context();

        let run = runner.run();
        tokio::pin!(run);

        assert!(tokio::time::timeout(Duration::from_millis(20), &mut run).await.is_err());
        ctx.emit(RunEvent::custom("b"));
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut run).await.is_err());
        ctx.emit(RunEvent::custom("a"));
        run.await.unwrap();
    }

    #[tokio::test]
    async fn test_gate_failure_fails_successful_pipeline() {
        let runner = Runner::new(RunnerConfig::new(vec![
            TaskDescriptor::bare(|_, ctx| async move { ctx.wait_for_event(EventKind::LogEnd) }),
            TaskDescriptor::bare(|_, ctx| async move {
                ctx.emit(RunEvent::LogEnd {
                    outcome: Err(RunFailure::tests_failed()),
                });
            }),
        ]));

        let err = runner.run().await.unwrap_err();
        assert_eq!(err.run_failure(), Some(&RunFailure::tests_failed()));
        assert!(err.to_string().contains("One or more tests failed"));
    }

    #[tokio::test]
    async fn test_second_gate_on_same_event_can_fail_run() {
        let runner = Runner::new(RunnerConfig::new(vec![
            TaskDescriptor::bare(|_, ctx| async move { ctx.wait_for_event(EventKind::LogEnd) }),
            TaskDescriptor::bare(|_, ctx| async move {
                ctx.emit(RunEvent::LogEnd { outcome: Ok(()) });
            }),
            TaskDescriptor::bare(|_, ctx| async move { ctx.wait_for_event(EventKind::LogEnd) }),
            TaskDescriptor::bare(|_, ctx| async move {
                ctx.emit(RunEvent::LogEnd {
                    outcome: Err(RunFailure::tests_failed()),
                });
            }),
        ]));

        let err = runner.run().await.unwrap_err();
        assert_eq!(err.run_failure(), Some(&RunFailure::tests_failed()));
    }

    #[tokio::test]
    async fn test_dropped_run_still_finishes_context() {
        let runner = Runner::new(RunnerConfig::new(vec![TaskDescriptor::bare(|_, ctx| async move {
            ctx.wait_for_event(EventKind::LogEnd)
        })]));
        let ctx = runner.context();

        assert!(tokio::time::timeout(Duration::from_millis(20), runner.run())
            .await
            .is_err());

        assert!(ctx.is_finished());
        tokio::time::timeout(Duration::from_secs(1), ctx.finished())
            .await
            .expect("finished() should resolve once the run is dropped");
    }

    #[tokio::test]
    async fn test_gate_failure_aborts_in_flight_task() {
        let reached_end = Arc::new(AtomicUsize::new(0));
        let counter = reached_end.clone();
        let runner = Runner::new(RunnerConfig::new(vec![
            TaskDescriptor::bare(|_, ctx| async move { ctx.wait_for_event(EventKind::LogEnd) }),
            TaskDescriptor::bare(move |_, _| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        ]));
        let ctx = runner.context();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ctx.emit(RunEvent::LogEnd {
                outcome: Err(RunFailure::tests_failed()),
            });
        });

        let err = tokio::time::timeout(Duration::from_secs(5), runner.run())
            .await
            .expect("run should settle once the gate fails")
            .unwrap_err();
        assert!(matches!(err, RunnerError::GateFailed { event: EventKind::LogEnd, .. }));
        assert_eq!(reached_end.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_conditional_tasks_in_pipeline() {
        let log = Log::default();
        let runner = Runner::new(RunnerConfig::new(vec![
            when(|| false, delayed(&log, "skipped", 1)),
            when(|| true, delayed(&log, "kept", 1)),
        ]));

        runner.run().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["kept:start", "kept:end"]);
    }

    #[tokio::test]
    async fn test_listeners_registered_before_run_see_task_events() {
        let ports = Arc::new(std::sync::Mutex::new(Vec::new()));
        let runner = Runner::new(RunnerConfig::new(vec![TaskDescriptor::bare(|_, ctx| async move {
            ctx.emit(RunEvent::LogStart { port: 9999 });
        })]));

        let sink = ports.clone();
        runner.on(EventKind::LogStart, move |event| {
            if let RunEvent::LogStart { port } = event {
                sink.lock().unwrap().push(*port);
            }
        });

        runner.run().await.unwrap();
        assert_eq!(*ports.lock().unwrap(), vec![9999]);
        assert!(runner.context().is_finished());
    }
}
