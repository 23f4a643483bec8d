//! Background task execution.
//!
//! SDK "async" operations are a scheduled unit of work plus a completion
//! callback. `TaskRunner` is the scheduler: a small dedicated tokio runtime
//! whose worker threads carry named identities for debuggability in plugin
//! hosts.

use std::future::Future;
use std::io;
use tokio::runtime::{Builder, Runtime};

/// Executes SDK background work on an owned runtime.
///
/// Handle types own their runner while shared state lives behind a separate
/// `Arc`, so dropping the last handle tears the runtime down and abandons
/// in-flight background work: detached-thread semantics without leaked
/// threads. Shutdown is non-blocking, so the last handle may be dropped
/// from async code without tripping tokio's nested-blocking panic.
pub struct TaskRunner {
    // always Some until drop
    runtime: Option<Runtime>,
}

impl TaskRunner {
    /// Creates a runner with two named worker threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to start the worker threads.
    pub fn new(thread_name: &str) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name(thread_name)
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn runtime(&self) -> &Runtime {
        self.runtime
            .as_ref()
            .expect("runtime present until TaskRunner drops")
    }

    /// Spawns a detached unit of work.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime().spawn(task);
    }

    /// Schedules `task` and invokes `on_complete` with its output.
    ///
    /// The callback runs on whatever worker thread the task finishes on;
    /// callers needing UI-thread delivery redispatch themselves.
    pub fn run<T, F, C>(&self, task: F, on_complete: C)
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.runtime().spawn(async move {
            on_complete(task.await);
        });
    }

    /// Drives `task` to completion on the calling thread.
    ///
    /// Must not be called from within an async context; it parks the
    /// calling thread the way `reqwest::blocking` does.
    pub fn block_on<F: Future>(&self, task: F) -> F::Output {
        self.runtime().block_on(task)
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
