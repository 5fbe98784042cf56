//! Web implementations of the confirmation and notification collaborators
//!
//! A browser cannot be suspended mid-request waiting for a click, so the
//! confirmation round trip is split over two requests: the first run has no
//! answer, captures the prompt and declines; the handler renders the prompt as
//! a dialog whose form posts the answer back to the same route.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use treasury_core::{ConfirmPrompt, ConfirmationReply, Confirmer, Notification, Notifier, NotifyLevel};

/// Form field carrying the dialog answer
pub const CONFIRMED_FIELD: &str = "confirmed";
/// Form field carrying the reason or comments text
pub const REASON_FIELD: &str = "reason";

/// Confirmer answering from a posted form
#[derive(Debug, Default)]
pub struct FormConfirmer {
    reply: Option<ConfirmationReply>,
    prompt: Mutex<Option<ConfirmPrompt>>,
}

impl FormConfirmer {
    pub fn new(reply: Option<ConfirmationReply>) -> Self {
        Self {
            reply,
            prompt: Mutex::new(None),
        }
    }

    /// Read `confirmed` and `reason` from form fields; no `confirmed` field means unanswered
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let reply = form.get(CONFIRMED_FIELD).map(|value| {
            if matches!(value.trim(), "true" | "yes" | "1" | "on") {
                ConfirmationReply::accepted(form.get(REASON_FIELD).cloned())
            } else {
                ConfirmationReply::declined()
            }
        });
        Self::new(reply)
    }

    pub fn is_answered(&self) -> bool {
        self.reply.is_some()
    }

    /// The prompt still waiting for an answer, if the flow asked one
    pub fn pending_prompt(&self) -> Option<ConfirmPrompt> {
        if self.is_answered() {
            return None;
        }
        self.prompt.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Confirmer for FormConfirmer {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> ConfirmationReply {
        *self.prompt.lock().unwrap_or_else(PoisonError::into_inner) = Some(prompt.clone());
        self.reply.clone().unwrap_or_else(ConfirmationReply::declined)
    }
}

/// Collects notifications for the response being built
#[derive(Debug)]
pub struct ToastNotifier {
    request_id: String,
    notifications: Mutex<Vec<Notification>>,
}

impl ToastNotifier {
    pub fn new() -> Self {
        Self {
            request_id: treasury_utils::request_id(),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    /// Drain everything collected so far
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for ToastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Error => log::error!(target: "treasury::http", "[{}] {}", self.request_id, message),
            NotifyLevel::Warning => log::warn!(target: "treasury::http", "[{}] {}", self.request_id, message),
            NotifyLevel::Success | NotifyLevel::Info => {
                log::info!(target: "treasury::http", "[{}] {}", self.request_id, message)
            }
        }
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                message: message.to_string(),
                level,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn prompt() -> ConfirmPrompt {
        ConfirmPrompt {
            title: "Approve records".to_string(),
            message: "Approve 2 records?".to_string(),
            input: true,
            input_required: false,
            input_label: Some("Comments".to_string()),
            input_placeholder: None,
        }
    }

    #[tokio::test]
    async fn test_unanswered_form_captures_prompt() {
        let confirmer = FormConfirmer::from_form(&form(&[("row", "A")]));
        let reply = confirmer.confirm(&prompt()).await;
        assert!(!reply.confirmed);
        assert_eq!(confirmer.pending_prompt().map(|p| p.title), Some("Approve records".to_string()));
    }

    #[tokio::test]
    async fn test_answered_form() {
        let confirmer = FormConfirmer::from_form(&form(&[("confirmed", "true"), ("reason", "  month end  ")]));
        let reply = confirmer.confirm(&prompt()).await;
        assert!(reply.confirmed);
        assert_eq!(reply.input(), Some("month end"));
        assert!(confirmer.pending_prompt().is_none());

        let declined = FormConfirmer::from_form(&form(&[("confirmed", "false")]));
        assert!(!declined.confirm(&prompt()).await.confirmed);
        assert!(declined.pending_prompt().is_none());
    }

    #[test]
    fn test_toasts_are_drained() {
        let notifier = ToastNotifier::new();
        assert!(notifier.is_empty());
        notifier.notify("Approved 2 records", NotifyLevel::Success);
        notifier.notify("stale version", NotifyLevel::Error);

        let toasts = notifier.take();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[1].level, NotifyLevel::Error);
        assert!(notifier.is_empty());
        assert!(notifier.request_id().starts_with("req-"));
    }
}
