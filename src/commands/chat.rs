use std::io::Write;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use skein_agent::monitor::{race, race_op, RaceOp, ResourceMonitor};
use skein_core::config::AppConfig;
use skein_core::error::SkeinError;

const APP_BRIEF: &str = r#"
What is Chat?
Chat is a communication tool.
It serves as a hub for instant messaging, enabling seamless collaboration among individuals and teams in workplaces, schools, or personal settings.

What does it do?
- Communicate instantly: Send messages to individuals or groups in real-time.
- Collaborate effectively: Share files, links, and ideas within conversations.
- Stay organized: Keep track of discussions, files, and tasks in one place.
- Connect remotely: Facilitate communication across different locations and time zones.

Features of Chat:
- One-on-One and Group Chats: Start private conversations or create group chats for team discussions.
- File Sharing: Attach and share documents, images, and other files directly within the chat.
- Formatting Options: Customize messages with bold, italics, underlining, lists, and more.
- Emoji, GIFs, and Stickers: Add a fun and personal touch to your messages.
- Message History: Access previous conversations and shared files easily.
- Integration with Apps: Use third-party apps.
- Scheduling and Actions: Schedule meetings, set reminders, and perform other actions directly from the chat.
- Search Functionality: Quickly find messages, files, or people within the chat.
- Security Features: Ensure safe communication with encryption and compliance tools.

With all this information, you need to write a chat application using Python and FastAPI.
You will create all the required endpoints and use MongoDB as the database.

- User authentication and authorization
- Group chats
- Private messages
- File sharing with other users
- Emoji, GIFs, and Stickers to messages
- Real-time updates (using WebSockets)
- Notifications for new messages
- Use uvicorn to run the app
- add grpc to create Group and Private messages
- add unit testing to all functionality
"#;

/// Race the completion against the resource monitor. The monitor only
/// finishes when cancelled, so the completion normally wins.
pub async fn run(config: &AppConfig, prompt: Vec<String>) -> anyhow::Result<()> {
    let prompt = if prompt.is_empty() {
        APP_BRIEF.to_string()
    } else {
        prompt.join(" ")
    };
    let model = config.chat_model().clone();
    let completion = skein_llm::create_completion(&model);
    let interval = Duration::from_millis(config.monitor.interval_ms);
    let grace = Duration::from_millis(config.monitor.grace_ms);

    info!(model = %model.model_id, prompt_chars = prompt.len(), "Starting chat");
    let start = Instant::now();

    let ops: Vec<RaceOp<Option<String>>> = vec![
        race_op(move |token: CancellationToken| async move {
            let monitor = ResourceMonitor::new(interval);
            monitor
                .run(token, |sample| {
                    let mut stderr = std::io::stderr();
                    let _ = write!(stderr, "\r{}", sample.status_line());
                    let _ = stderr.flush();
                })
                .await;
            Ok(None)
        }),
        race_op(move |token: CancellationToken| async move {
            tokio::select! {
                result = completion.complete(prompt) => result.map(Some),
                _ = token.cancelled() => Err(SkeinError::Cancelled),
            }
        }),
    ];

    let result = race(ops, grace).await;
    eprintln!();

    let text = result?.unwrap_or_default();
    println!("{}\n    Application Result:\n{}", "=".repeat(50), "=".repeat(50));
    println!("{}", text);
    println!("Processing time: {:.2} seconds", start.elapsed().as_secs_f64());
    Ok(())
}
