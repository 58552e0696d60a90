use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use skein_core::error::Result;
use skein_core::traits::{Completion, Notifier};
use skein_core::types::Notice;
use skein_graph::{NodeHandler, Pipeline, RouteLabel, END};

use super::classifier::Classifier;
use super::prompts::{classification_prompt, draft_prompt, Persona};
use super::state::{EmailState, EmailUpdate, LoggedMessage};

pub const READ_EMAIL: &str = "read_email";
pub const CLASSIFY_EMAIL: &str = "classify_email";
pub const HANDLE_SPAM: &str = "handle_spam";
pub const DRAFTING_RESPONSE: &str = "drafting_response";
pub const NOTIFY_USER: &str = "notify_user";

/// Branch taken after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailRoute {
    Spam,
    Legitimate,
}

impl fmt::Display for EmailRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailRoute::Spam => write!(f, "spam"),
            EmailRoute::Legitimate => write!(f, "legitimate"),
        }
    }
}

impl RouteLabel for EmailRoute {
    fn variants() -> Option<Vec<Self>> {
        Some(vec![EmailRoute::Spam, EmailRoute::Legitimate])
    }
}

/// Spam iff the classifier said so; an unclassified email is treated as
/// legitimate.
pub fn route_email(state: &EmailState) -> EmailRoute {
    if state.is_spam == Some(true) {
        EmailRoute::Spam
    } else {
        EmailRoute::Legitimate
    }
}

pub struct ReadEmail {
    notifier: Arc<dyn Notifier>,
}

impl NodeHandler<EmailState> for ReadEmail {
    fn call<'a>(&'a self, state: &'a EmailState) -> BoxFuture<'a, Result<EmailUpdate>> {
        Box::pin(async move {
            self.notifier.notify(Notice::Info(format!(
                "Spam Checker is processing an email from {} with subject: {}",
                state.email.sender, state.email.subject
            )));
            Ok(EmailUpdate::default())
        })
    }
}

pub struct ClassifyEmail {
    completion: Arc<dyn Completion>,
    classifier: Arc<dyn Classifier>,
    persona: Persona,
}

impl NodeHandler<EmailState> for ClassifyEmail {
    fn call<'a>(&'a self, state: &'a EmailState) -> BoxFuture<'a, Result<EmailUpdate>> {
        Box::pin(async move {
            let prompt = classification_prompt(&self.persona, &state.email);
            let response = self.completion.complete(prompt.clone()).await?;
            let verdict = self.classifier.classify(&response);

            info!(
                sender = %state.email.sender,
                is_spam = verdict.is_spam,
                category = verdict.category.as_deref().unwrap_or("-"),
                "Email classified"
            );

            Ok(EmailUpdate {
                is_spam: Some(verdict.is_spam),
                spam_reason: verdict.reason,
                email_category: verdict.category,
                messages: LoggedMessage::exchange(prompt, response),
                ..Default::default()
            })
        })
    }
}

pub struct HandleSpam {
    notifier: Arc<dyn Notifier>,
}

impl NodeHandler<EmailState> for HandleSpam {
    fn call<'a>(&'a self, state: &'a EmailState) -> BoxFuture<'a, Result<EmailUpdate>> {
        Box::pin(async move {
            debug!(reason = ?state.spam_reason, "Moving email to spam");
            self.notifier.notify(Notice::Info(
                "Spam Checker has marked the email as spam. The email has been moved to the spam folder."
                    .to_string(),
            ));
            Ok(EmailUpdate::default())
        })
    }
}

pub struct DraftResponse {
    completion: Arc<dyn Completion>,
    persona: Persona,
}

impl NodeHandler<EmailState> for DraftResponse {
    fn call<'a>(&'a self, state: &'a EmailState) -> BoxFuture<'a, Result<EmailUpdate>> {
        Box::pin(async move {
            let category = state.email_category.as_deref().unwrap_or("general");
            let prompt = draft_prompt(&self.persona, &state.email, category);
            let response = self.completion.complete(prompt.clone()).await?;

            Ok(EmailUpdate {
                draft_response: Some(response.clone()),
                messages: LoggedMessage::exchange(prompt, response),
                ..Default::default()
            })
        })
    }
}

pub struct NotifyUser {
    notifier: Arc<dyn Notifier>,
}

impl NodeHandler<EmailState> for NotifyUser {
    fn call<'a>(&'a self, state: &'a EmailState) -> BoxFuture<'a, Result<EmailUpdate>> {
        Box::pin(async move {
            self.notifier.notify(Notice::Report {
                title: format!("Sir, you've received an email from {}.", state.email.sender),
                body: vec![
                    format!("Subject: {}", state.email.subject),
                    format!(
                        "Category: {}",
                        state.email_category.as_deref().unwrap_or("general")
                    ),
                    String::new(),
                    "I've prepared a draft response for your review:".to_string(),
                    "-".repeat(50),
                    state.draft_response.clone().unwrap_or_default(),
                ],
            });
            Ok(EmailUpdate::default())
        })
    }
}

/// Everything the triage pipeline's nodes need.
pub struct TriageDeps {
    classify: Arc<dyn Completion>,
    draft: Arc<dyn Completion>,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    persona: Persona,
    max_steps: usize,
}

impl TriageDeps {
    /// One completion boundary for both model calls.
    pub fn new(
        completion: Arc<dyn Completion>,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
        persona: Persona,
    ) -> Self {
        Self {
            classify: completion.clone(),
            draft: completion,
            classifier,
            notifier,
            persona,
            max_steps: skein_graph::executor::DEFAULT_MAX_STEPS,
        }
    }

    /// Use a different model for drafting replies.
    pub fn with_draft_completion(mut self, completion: Arc<dyn Completion>) -> Self {
        self.draft = completion;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// `read_email -> classify_email -> {spam: handle_spam, legitimate:
/// drafting_response}`, `drafting_response -> notify_user`.
pub fn build_triage_pipeline(deps: TriageDeps) -> Result<Pipeline<EmailState>> {
    Pipeline::<EmailState>::builder()
        .add_node(
            READ_EMAIL,
            ReadEmail {
                notifier: deps.notifier.clone(),
            },
        )
        .add_node(
            CLASSIFY_EMAIL,
            ClassifyEmail {
                completion: deps.classify,
                classifier: deps.classifier,
                persona: deps.persona.clone(),
            },
        )
        .add_node(
            HANDLE_SPAM,
            HandleSpam {
                notifier: deps.notifier.clone(),
            },
        )
        .add_node(
            DRAFTING_RESPONSE,
            DraftResponse {
                completion: deps.draft,
                persona: deps.persona,
            },
        )
        .add_node(
            NOTIFY_USER,
            NotifyUser {
                notifier: deps.notifier,
            },
        )
        .set_entry(READ_EMAIL)
        .add_edge(READ_EMAIL, CLASSIFY_EMAIL)
        .add_conditional_edges(
            CLASSIFY_EMAIL,
            route_email,
            [
                (EmailRoute::Spam, HANDLE_SPAM),
                (EmailRoute::Legitimate, DRAFTING_RESPONSE),
            ],
        )
        .add_edge(HANDLE_SPAM, END)
        .add_edge(DRAFTING_RESPONSE, NOTIFY_USER)
        .add_edge(NOTIFY_USER, END)
        .max_steps(deps.max_steps)
        .build()
}
