use std::future::Future;

use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{NewTask, Pagination, Task, TaskPage, TaskQuery, TaskUpdate};

use super::retry::{display_secs, RetryPolicy, RetryState};

/// Published once a retry chain gives up
pub const RETRY_LIMIT_MESSAGE: &str = "Retry limit exceeded. Please wait a moment before trying again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Shown when a failure carries no server detail
    fn fallback_message(self) -> &'static str {
        match self {
            Operation::Fetch => "Could not load tasks",
            Operation::Create => "Could not create task",
            Operation::Update => "Could not update task",
            Operation::Delete => "Could not delete task",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operation::Fetch => "fetch_tasks",
            Operation::Create => "create_task",
            Operation::Update => "update_task",
            Operation::Delete => "delete_task",
        }
    }
}

/// Local task list plus the spacing and 429 retry policy for calls that change it.
///
/// User-facing status text (retry countdowns, failures) is published on a
/// watch channel; see [`TaskController::subscribe`].
pub struct TaskController {
    api: ApiClient,
    policy: RetryPolicy,
    retry: RetryState,
    last_fetch: Option<Instant>,
    tasks: Vec<Task>,
    pagination: Pagination,
    loading: bool,
    messages: watch::Sender<Option<String>>,
}

impl TaskController {
    pub fn new(api: ApiClient, policy: RetryPolicy) -> Self {
        let (messages, _) = watch::channel(None);
        Self {
            api,
            policy,
            retry: RetryState::default(),
            last_fetch: None,
            tasks: Vec::new(),
            pagination: Pagination::default(),
            loading: false,
            messages,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Rate-limited attempts in the chain currently running (0 when idle)
    pub fn retry_attempts(&self) -> u32 {
        self.retry.attempts
    }

    /// Current status message, if any
    pub fn message(&self) -> Option<String> {
        self.messages.borrow().clone()
    }

    /// Watch status messages, including interim ones published while a retry waits
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.messages.subscribe()
    }

    pub fn clear_message(&self) {
        self.publish(None);
    }

    fn publish(&self, message: Option<String>) {
        self.messages.send_replace(message);
    }

    /// Sleep until the minimum fetch interval has passed since the last fetch
    async fn wait_for_spacing(&mut self) {
        let min_interval = self.policy.min_fetch_interval();
        if let Some(last) = self.last_fetch {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Spacing task list fetch");
                sleep(wait).await;
            }
        }
        self.last_fetch = Some(Instant::now());
    }

    /// Run `call` until it succeeds, fails with something other than 429,
    /// or has been rate limited `max_retries + 1` times.
    async fn run_with_retry<T, F, Fut>(&mut self, operation: Operation, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.retry.reset();

        loop {
            if operation == Operation::Fetch {
                self.wait_for_spacing().await;
            }

            match call().await {
                Ok(value) => {
                    self.retry.reset();
                    self.publish(None);
                    return Ok(value);
                }
                Err(ApiError::RateLimited { retry_after, .. }) => {
                    if !self.retry.can_retry(&self.policy) {
                        let attempts = self.retry.attempts + 1;
                        self.retry.reset();
                        warn!(operation = operation.name(), attempts, "Retry limit exceeded");
                        self.publish(Some(RETRY_LIMIT_MESSAGE.to_string()));
                        return Err(ApiError::RetryLimitExceeded { attempts });
                    }

                    self.retry.attempts += 1;
                    let delay = retry_after.unwrap_or_else(|| self.policy.default_retry_after());
                    let secs = display_secs(delay);
                    warn!(
                        operation = operation.name(),
                        retry = self.retry.attempts,
                        backoff_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    self.publish(Some(format!(
                        "Too many requests. Retrying in {} second{}...",
                        secs,
                        if secs == 1 { "" } else { "s" }
                    )));
                    sleep(delay).await;
                }
                Err(e) => {
                    self.retry.reset();
                    let message = e
                        .detail()
                        .map(str::to_string)
                        .unwrap_or_else(|| operation.fallback_message().to_string());
                    debug!(operation = operation.name(), error = %e, "Task operation failed");
                    self.publish(Some(message));
                    return Err(e);
                }
            }
        }
    }

    // ===== Operations =====

    /// Fetch one page of tasks, replacing the local list
    pub async fn fetch_tasks(&mut self, query: &TaskQuery) -> Result<TaskPage, ApiError> {
        self.loading = true;
        self.publish(None);

        let api = self.api.clone();
        let result = self
            .run_with_retry(Operation::Fetch, || {
                let api = api.clone();
                let query = query.clone();
                async move { api.list_tasks(&query).await }
            })
            .await;
        self.loading = false;

        let page = result?;
        debug!(count = page.items.len(), total = page.total, "Tasks fetched");
        self.tasks = page.items.clone();
        self.pagination = Pagination::from(&page);
        Ok(page)
    }

    /// Fetch a single task without touching the local list
    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.api.get_task(id).await
    }

    pub async fn create_task(&mut self, task: &NewTask) -> Result<Task, ApiError> {
        self.publish(None);

        let api = self.api.clone();
        let created = self
            .run_with_retry(Operation::Create, || {
                let api = api.clone();
                let task = task.clone();
                async move { api.create_task(&task).await }
            })
            .await?;

        info!(id = created.id, "Task created");
        self.tasks.insert(0, created.clone());
        Ok(created)
    }

    pub async fn update_task(&mut self, id: i64, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.publish(None);

        let api = self.api.clone();
        let updated = self
            .run_with_retry(Operation::Update, || {
                let api = api.clone();
                let update = update.clone();
                async move { api.update_task(id, &update).await }
            })
            .await?;

        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == id) {
            *existing = updated.clone();
        }
        Ok(updated)
    }

    pub async fn toggle_task(&mut self, id: i64, completed: bool) -> Result<Task, ApiError> {
        self.update_task(id, &TaskUpdate::completed(completed)).await
    }

    pub async fn delete_task(&mut self, id: i64) -> Result<(), ApiError> {
        self.publish(None);

        let api = self.api.clone();
        self.run_with_retry(Operation::Delete, || {
            let api = api.clone();
            async move { api.delete_task(id).await }
        })
        .await?;

        info!(id, "Task deleted");
        self.tasks.retain(|t| t.id != id);
        Ok(())
    }
}
