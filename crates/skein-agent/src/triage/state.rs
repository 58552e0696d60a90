use serde::{Deserialize, Serialize};

use skein_core::types::Role;
use skein_graph::State;

/// An incoming email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// One side of a prompt/response exchange with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub role: Role,
    pub content: String,
}

impl LoggedMessage {
    /// The prompt and the model's answer, in that order.
    pub fn exchange(prompt: impl Into<String>, response: impl Into<String>) -> Vec<Self> {
        vec![
            Self {
                role: Role::User,
                content: prompt.into(),
            },
            Self {
                role: Role::Assistant,
                content: response.into(),
            },
        ]
    }
}

/// Running state of one email triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailState {
    pub email: Email,
    pub is_spam: Option<bool>,
    pub spam_reason: Option<String>,
    pub email_category: Option<String>,
    pub draft_response: Option<String>,
    /// Every exchange with the model, oldest first.
    pub messages: Vec<LoggedMessage>,
}

impl EmailState {
    pub fn new(email: Email) -> Self {
        Self {
            email,
            is_spam: None,
            spam_reason: None,
            email_category: None,
            draft_response: None,
            messages: Vec::new(),
        }
    }

    /// Content of the most recent logged message.
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}

/// Partial update: `None` leaves a field unchanged, `messages` are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailUpdate {
    pub is_spam: Option<bool>,
    pub spam_reason: Option<String>,
    pub email_category: Option<String>,
    pub draft_response: Option<String>,
    pub messages: Vec<LoggedMessage>,
}

impl EmailUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl State for EmailState {
    type Update = EmailUpdate;

    fn merge(&mut self, update: EmailUpdate) {
        if let Some(v) = update.is_spam {
            self.is_spam = Some(v);
        }
        if let Some(v) = update.spam_reason {
            self.spam_reason = Some(v);
        }
        if let Some(v) = update.email_category {
            self.email_category = Some(v);
        }
        if let Some(v) = update.draft_response {
            self.draft_response = Some(v);
        }
        self.messages.extend(update.messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unnamed_fields() {
        let mut state = EmailState::new(Email::new("a@b.c", "hi", "body"));
        state.merge(EmailUpdate {
            is_spam: Some(false),
            email_category: Some("inquiry".into()),
            messages: LoggedMessage::exchange("p1", "r1"),
            ..Default::default()
        });
        state.merge(EmailUpdate {
            draft_response: Some("Dear a".into()),
            messages: LoggedMessage::exchange("p2", "r2"),
            ..Default::default()
        });

        assert_eq!(state.is_spam, Some(false));
        assert_eq!(state.email_category.as_deref(), Some("inquiry"));
        assert_eq!(state.draft_response.as_deref(), Some("Dear a"));
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.last_message(), Some("r2"));
        assert_eq!(state.messages[2].role, Role::User);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let mut state = EmailState::new(Email::new("a@b.c", "hi", "body"));
        let before = state.clone();
        let update = EmailUpdate::default();
        assert!(update.is_empty());
        state.merge(update);
        assert_eq!(state, before);
    }
}
