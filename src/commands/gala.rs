use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use skein_agent::assistant::{Assistant, DEFAULT_SYSTEM_PROMPT};
use skein_core::config::AppConfig;
use skein_tools::ToolRegistry;

const QUESTIONS: [&str; 4] = [
    "Tell me about 'Lady Ada Lovelace'",
    "What's the weather like in Paris tonight? Will it be suitable for our fireworks display?",
    "One of our guests is from Qwen. What can you tell me about their most popular model?",
    "I need to speak with 'Dr. Nikola Tesla' about recent advancements in wireless energy. Can you help me prepare for this conversation?",
];

const MEMORY_FIRST: &str =
    "Tell me about 'Lady Ada Lovelace'. What's her background and how is she related to me?";
const MEMORY_FOLLOW_UP: &str = "What projects is she currently working on?";

/// Pause between questions; keeps the search API from rate limiting us.
const PAUSE: Duration = Duration::from_secs(1);

fn log_question_answer(question: &str, answer: &str) {
    println!("- Question: {}\n   Alfred's Response:\n       {}\n", question, answer);
}

pub async fn run(config: &AppConfig, question: Vec<String>) -> anyhow::Result<()> {
    let model = config.assistant_model().clone();
    let llm = skein_llm::create_client(&model);
    let tools = Arc::new(ToolRegistry::with_builtins(&config.tools)?);
    let system_prompt = config
        .assistant
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let assistant =
        Assistant::with_options(llm, model, tools, system_prompt, config.assistant_max_steps())?;

    if !question.is_empty() {
        let question = question.join(" ");
        let answer = assistant.ask(Vec::new(), question.as_str()).await?;
        log_question_answer(&question, &answer.text);
        return Ok(());
    }

    println!("Alfred's Gala Agent is ready\n{}\n", "=".repeat(33));

    for q in QUESTIONS {
        // One failed question should not end the demo
        match assistant.ask(Vec::new(), q).await {
            Ok(answer) => log_question_answer(q, &answer.text),
            Err(e) => {
                error!(question = q, error = %e, "Question failed");
                log_question_answer(q, &format!("(no answer: {})", e));
            }
        }
        tokio::time::sleep(PAUSE).await;
    }

    println!("\nAdvanced Features: Conversation Memory:\n");
    let first = assistant.ask(Vec::new(), MEMORY_FIRST).await?;
    log_question_answer(MEMORY_FIRST, &first.text);
    tokio::time::sleep(PAUSE).await;

    let second = assistant.ask(first.history, MEMORY_FOLLOW_UP).await?;
    log_question_answer(MEMORY_FOLLOW_UP, &second.text);

    Ok(())
}
