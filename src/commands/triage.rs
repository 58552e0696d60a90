use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use dialoguer::Input;
use tracing::{info, warn};

use skein_agent::triage::{
    build_triage_pipeline, example_email, Email, EmailState, KeywordClassifier, Persona,
    TriageDeps,
};
use skein_core::config::AppConfig;
use skein_core::traits::{Notifier, StdoutNotifier};
use skein_core::types::Notice;

/// Sends notices to the log instead of the terminal, so batch output stays
/// one line per email.
struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Info(line) => info!("{}", line),
            Notice::Report { title, body } => info!(lines = body.len(), "{}", title),
        }
    }
}

pub async fn run(config: &AppConfig, batch: Option<PathBuf>) -> anyhow::Result<()> {
    match batch {
        Some(path) => run_batch(config, &path).await,
        None => run_interactive(config).await,
    }
}

fn deps(config: &AppConfig, notifier: Arc<dyn Notifier>) -> anyhow::Result<TriageDeps> {
    let persona = Persona::new(&config.triage.username, &config.triage.profile);
    let completion = skein_llm::create_completion(config.triage_model());
    let classifier = Arc::new(KeywordClassifier::new()?);
    Ok(TriageDeps::new(completion, classifier, notifier, persona)
        .with_max_steps(config.pipeline.max_steps))
}

fn prompt_line(label: &str) -> anyhow::Result<String> {
    let value: String = Input::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

async fn run_interactive(config: &AppConfig) -> anyhow::Result<()> {
    let sender = prompt_line("Sender (leave empty for the example email)")?;
    let email = if sender.is_empty() {
        example_email(&config.triage.username)
    } else {
        let subject = prompt_line("Subject")?;
        if subject.is_empty() {
            bail!("Subject is required.");
        }
        let body = prompt_line("Body")?;
        if body.is_empty() {
            bail!("Body is required.");
        }
        Email::new(sender, subject, body)
    };

    let pipeline = build_triage_pipeline(deps(config, Arc::new(StdoutNotifier))?)?;
    let start = Instant::now();
    let state = pipeline.invoke(EmailState::new(email)).await?;

    println!("Result of the Email checker:");
    println!("{}", state.last_message().unwrap_or("(no model output)"));
    println!("Processing time: {:.2} seconds", start.elapsed().as_secs_f64());
    Ok(())
}

async fn run_batch(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let emails: Vec<Email> = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    if emails.is_empty() {
        warn!(path = %path.display(), "No emails to triage");
        return Ok(());
    }

    let pipeline = build_triage_pipeline(deps(config, Arc::new(TracingNotifier))?)?;
    let senders: Vec<String> = emails.iter().map(|e| e.sender.clone()).collect();
    let start = Instant::now();
    info!(count = emails.len(), concurrency = config.triage.concurrency, "Triaging batch");

    let results = pipeline
        .invoke_all(emails.into_iter().map(EmailState::new), config.triage.concurrency)
        .await;

    let mut failed = 0;
    for (sender, result) in senders.iter().zip(results) {
        match result {
            Ok(state) if state.is_spam == Some(true) => println!(
                "{}: spam ({})",
                sender,
                state.spam_reason.as_deref().unwrap_or("no reason given")
            ),
            Ok(state) => println!(
                "{}: {} (draft {} chars)",
                sender,
                state.email_category.as_deref().unwrap_or("general"),
                state.draft_response.as_deref().map_or(0, str::len)
            ),
            Err(e) => {
                failed += 1;
                println!("{}: failed: {}", sender, e);
            }
        }
    }

    info!(
        failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Batch finished"
    );
    Ok(())
}
