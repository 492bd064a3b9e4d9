//! Conditional task wrappers.

use std::sync::Arc;

use crate::task::TaskDescriptor;

/// Run `task` only if `predicate` returns true at invocation time.
///
/// When the predicate is false the wrapper completes immediately without
/// side effects.
pub fn when<P>(predicate: P, task: TaskDescriptor) -> TaskDescriptor
where
    P: Fn() -> bool + Send + Sync + 'static,
{
    TaskDescriptor::When {
        predicate: Arc::new(predicate),
        task: Box::new(task),
    }
}

/// Run `then_task` if `predicate` returns true at invocation time, otherwise
/// `else_task`.
pub fn if_then_else<P>(
    predicate: P,
    then_task: TaskDescriptor,
    else_task: TaskDescriptor,
) -> TaskDescriptor
where
    P: Fn() -> bool + Send + Sync + 'static,
{
    TaskDescriptor::IfThenElse {
        predicate: Arc::new(predicate),
        then_task: Box::new(then_task),
        else_task: Box::new(else_task),
    }
}
