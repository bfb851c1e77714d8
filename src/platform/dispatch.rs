use tokio::runtime::Handle;

/// Work that must run on the UI-facing scheduler
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler for callbacks that touch UI-exposed state
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, job: UiJob);
}

/// Runs jobs as tasks on a Tokio runtime
#[derive(Debug, Clone)]
pub struct TokioDispatcher {
    handle: Handle,
}

impl TokioDispatcher {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl UiDispatcher for TokioDispatcher {
    fn dispatch(&self, job: UiJob) {
        self.handle.spawn(async move { job() });
    }
}

/// Runs jobs immediately on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, job: UiJob) {
        job()
    }
}
