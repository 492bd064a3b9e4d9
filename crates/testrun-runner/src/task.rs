//! Task descriptors: the units a pipeline is made of.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::context::RunContext;
use crate::error::BoxError;

/// Fixed arguments passed to a task ahead of its context.
pub type TaskArgs = Vec<Value>;

/// Future returned by an invoked task.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

type TaskFn = Arc<dyn Fn(TaskArgs, RunContext) -> TaskFuture + Send + Sync>;
type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Values a task may produce. Every form means "proceed to the next task"
/// unless it carries an error.
pub trait TaskOutput {
    fn into_task_result(self) -> Result<(), BoxError>;
}

impl TaskOutput for () {
    fn into_task_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T, E> TaskOutput for Result<T, E>
where
    E: Into<BoxError>,
{
    fn into_task_result(self) -> Result<(), BoxError> {
        self.map(|_| ()).map_err(Into::into)
    }
}

/// One step of a pipeline.
///
/// Whatever the shape, the callable eventually receives its arguments and
/// the [`RunContext`] last.
#[derive(Clone)]
pub enum TaskDescriptor {
    /// Callable invoked with the forwarded arguments (none at top level).
    Bare(TaskFn),
    /// Labelled callable invoked with its fixed arguments, followed by any
    /// forwarded ones.
    Named {
        label: String,
        callable: TaskFn,
        args: TaskArgs,
    },
    /// Runs `task` only when `predicate` holds.
    When {
        predicate: Predicate,
        task: Box<TaskDescriptor>,
    },
    /// Runs exactly one of the two branches.
    IfThenElse {
        predicate: Predicate,
        then_task: Box<TaskDescriptor>,
        else_task: Box<TaskDescriptor>,
    },
}

fn callable<F, Fut, O>(f: F) -> TaskFn
where
    F: Fn(TaskArgs, RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: TaskOutput,
{
    Arc::new(move |args: TaskArgs, ctx: RunContext| -> TaskFuture {
        let fut = f(args, ctx);
        Box::pin(async move { fut.await.into_task_result() })
    })
}

impl TaskDescriptor {
    /// Create a bare task.
    pub fn bare<F, Fut, O>(f: F) -> Self
    where
        F: Fn(TaskArgs, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: TaskOutput,
    {
        Self::Bare(callable(f))
    }

    /// Create a labelled task with fixed arguments.
    pub fn named<F, Fut, O>(label: impl Into<String>, f: F, args: TaskArgs) -> Self
    where
        F: Fn(TaskArgs, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: TaskOutput,
    {
        Self::Named {
            label: label.into(),
            callable: callable(f),
            args,
        }
    }

    /// Label of a named task.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Named { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Human readable description used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Bare(_) => "anonymous".to_string(),
            Self::Named { label, .. } => label.clone(),
            Self::When { task, .. } => format!("when({})", task.describe()),
            Self::IfThenElse {
                then_task,
                else_task,
                ..
            } => format!(
                "ifThenElse({}, {})",
                then_task.describe(),
                else_task.describe()
            ),
        }
    }

    /// Invoke the task with `args` followed by `ctx`.
    ///
    /// Predicates of conditional tasks are evaluated here, on every call.
    pub fn invoke(&self, args: TaskArgs, ctx: RunContext) -> TaskFuture {
        match self {
            Self::Bare(callable) => callable(args, ctx),
            Self::Named {
                callable,
                args: fixed,
                ..
            } => {
                let mut all = fixed.clone();
                all.extend(args);
                callable(all, ctx)
            }
            Self::When { predicate, task } => {
                if predicate() {
                    task.invoke(args, ctx)
                } else {
                    Box::pin(async { Ok(()) })
                }
            }
            Self::IfThenElse {
                predicate,
                then_task,
                else_task,
            } => {
                if predicate() {
                    then_task.invoke(args, ctx)
                } else {
                    else_task.invoke(args, ctx)
                }
            }
        }
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { label, args, .. } => f
                .debug_struct("Named")
                .field("label", label)
                .field("args", args)
                .finish(),
            other => f.write_str(&other.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<TaskArgs>>>;

    fn recording(calls: &Calls) -> impl Fn(TaskArgs, RunContext) -> std::future::Ready<()> {
        let calls = calls.clone();
        move |args, _ctx| {
            calls.lock().unwrap().push(args);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_named_passes_fixed_args_first() {
        let calls = Calls::default();
        let task = TaskDescriptor::named("add", recording(&calls), vec![json!("test"), json!(10)]);

        task.invoke(vec![json!(true)], RunContext::new())
            .await
            .unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![vec![json!("test"), json!(10), json!(true)]]
        );
        assert_eq!(task.label(), Some("add"));
    }

    #[tokio::test]
    async fn test_bare_receives_context() {
        let ctx = RunContext::new();
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let task = TaskDescriptor::bare(move |_, ctx| {
            *slot.lock().unwrap() = Some(ctx);
            async {}
        });

        task.invoke(Vec::new(), ctx.clone()).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&ctx));
    }

    #[tokio::test]
    async fn test_output_normalization() {
        let value = TaskDescriptor::bare(|_, _| async { Ok::<_, BoxError>(42u16) });
        assert!(value.invoke(Vec::new(), RunContext::new()).await.is_ok());

        let failing = TaskDescriptor::bare(|_, _| async {
            Err::<(), _>(std::io::Error::other("disk full"))
        });
        let err = failing
            .invoke(Vec::new(), RunContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_describe() {
        let bare = TaskDescriptor::bare(|_, _| async {});
        let named = TaskDescriptor::named("copy", |_, _| async {}, vec![]);
        assert_eq!(bare.describe(), "anonymous");
        assert_eq!(named.describe(), "copy");
        assert_eq!(format!("{:?}", bare), "anonymous");
    }
}
