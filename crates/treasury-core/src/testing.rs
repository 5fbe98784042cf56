//! In-memory collaborator doubles for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::collaborators::{
    BulkActionRequest, ConfirmPrompt, ConfirmationReply, Confirmer, ListRequest, ListResponse, Notification,
    Notifier, RecordUpdateRequest, WorkflowEndpoint, WorkflowResponse,
};
use crate::error::CoreResult;
use crate::models::Record;
use crate::types::{NotifyLevel, ReviewAction};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Endpoint that records every request and answers from queues
///
/// Queued responses are used in order; once a queue is empty every call
/// succeeds.
#[derive(Default)]
pub struct RecordingEndpoint {
    rows: Mutex<Vec<Record>>,
    lists: Mutex<Vec<ListRequest>>,
    bulk: Mutex<Vec<(ReviewAction, BulkActionRequest)>>,
    updates: Mutex<Vec<RecordUpdateRequest>>,
    bulk_responses: Mutex<VecDeque<CoreResult<WorkflowResponse>>>,
    update_responses: Mutex<VecDeque<CoreResult<WorkflowResponse>>>,
    list_responses: Mutex<VecDeque<CoreResult<ListResponse>>>,
}

impl RecordingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint whose list call returns `rows`
    pub fn with_rows(rows: Vec<Record>) -> Self {
        let endpoint = Self::default();
        *lock(&endpoint.rows) = rows;
        endpoint
    }

    pub fn push_bulk_response(&self, response: CoreResult<WorkflowResponse>) {
        lock(&self.bulk_responses).push_back(response);
    }

    pub fn push_update_response(&self, response: CoreResult<WorkflowResponse>) {
        lock(&self.update_responses).push_back(response);
    }

    pub fn push_list_response(&self, response: CoreResult<ListResponse>) {
        lock(&self.list_responses).push_back(response);
    }

    pub fn bulk_requests(&self) -> Vec<(ReviewAction, BulkActionRequest)> {
        lock(&self.bulk).clone()
    }

    pub fn updates(&self) -> Vec<RecordUpdateRequest> {
        lock(&self.updates).clone()
    }

    pub fn list_count(&self) -> usize {
        lock(&self.lists).len()
    }

    /// Bulk and update requests; list calls are not counted
    pub fn request_count(&self) -> usize {
        lock(&self.bulk).len() + lock(&self.updates).len()
    }
}

#[async_trait]
impl WorkflowEndpoint for RecordingEndpoint {
    async fn list(&self, request: &ListRequest) -> CoreResult<ListResponse> {
        lock(&self.lists).push(request.clone());
        match lock(&self.list_responses).pop_front() {
            Some(response) => response,
            None => Ok(ListResponse {
                success: true,
                rows: lock(&self.rows).clone(),
                error: None,
            }),
        }
    }

    async fn bulk_action(&self, action: ReviewAction, request: &BulkActionRequest) -> CoreResult<WorkflowResponse> {
        lock(&self.bulk).push((action, request.clone()));
        lock(&self.bulk_responses)
            .pop_front()
            .unwrap_or_else(|| Ok(WorkflowResponse::ok()))
    }

    async fn update_record(&self, request: &RecordUpdateRequest) -> CoreResult<WorkflowResponse> {
        lock(&self.updates).push(request.clone());
        lock(&self.update_responses)
            .pop_front()
            .unwrap_or_else(|| Ok(WorkflowResponse::ok()))
    }
}

type ConfirmHook = Box<dyn Fn() + Send + Sync>;

/// Confirmer answering from a script; declines once the script runs out
#[derive(Default)]
pub struct ScriptedConfirmer {
    replies: Mutex<VecDeque<ConfirmationReply>>,
    prompts: Mutex<Vec<ConfirmPrompt>>,
    hook: Option<ConfirmHook>,
}

impl ScriptedConfirmer {
    pub fn new(replies: Vec<ConfirmationReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Accept once with no input
    pub fn accept() -> Self {
        Self::new(vec![ConfirmationReply::accepted(None)])
    }

    /// Accept once with the given input
    pub fn accept_with(input: &str) -> Self {
        Self::new(vec![ConfirmationReply::accepted(Some(input.to_string()))])
    }

    /// Run `hook` while the dialog is open
    pub fn on_confirm(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn prompts(&self) -> Vec<ConfirmPrompt> {
        lock(&self.prompts).clone()
    }

    pub fn prompt_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> ConfirmationReply {
        lock(&self.prompts).push(prompt.clone());
        if let Some(hook) = &self.hook {
            hook();
        }
        lock(&self.replies).pop_front().unwrap_or_default()
    }
}

/// Notifier that keeps everything it is told
#[derive(Default)]
pub struct CollectingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.notifications).iter().map(|n| n.message.clone()).collect()
    }

    pub fn levels(&self) -> Vec<NotifyLevel> {
        lock(&self.notifications).iter().map(|n| n.level).collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        lock(&self.notifications).push(Notification {
            message: message.to_string(),
            level,
        });
    }
}
