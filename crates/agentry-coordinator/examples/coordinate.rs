//! Run one coordinated request against locally running backends.
//!
//! Endpoints resolve from the environment (`DIAL_ENDPOINT`,
//! `DEPLOYMENT_NAME`, `GPA_DEPLOYMENT_NAME`, `UMS_AGENT_ENDPOINT`), with
//! local-development defaults. The first CLI argument is the user message.
//!
//! ```sh
//! cargo run --example coordinate -- "List all users"
//! ```

use agentry::Message;
use agentry_coordinator::{Coordinator, CoordinatorConfig, ResponseEvent, ResponseSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "List all users".to_string());

    let config = CoordinatorConfig::from_env()?;
    let coordinator = Coordinator::from_config(&config)?;

    let (sink, mut receiver) = ResponseSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                ResponseEvent::Content { delta } => print!("{delta}"),
                ResponseEvent::Stage { delta } => {
                    if let Some(name) = &delta.name {
                        eprintln!("[stage {}] {name}", delta.index);
                    }
                    if let Some(content) = &delta.content {
                        eprintln!("[stage {}] {content}", delta.index);
                    }
                }
                ResponseEvent::Attachment { attachment } => {
                    eprintln!(
                        "[attachment] {}",
                        attachment.title.as_deref().unwrap_or("untitled")
                    );
                }
            }
        }
    });

    let history = vec![Message::user(prompt)];
    let message = coordinator.handle_request(&history, &sink).await?;
    drop(sink);
    printer.await?;

    println!();
    if let Some(state) = message.state() {
        eprintln!("proposed state: {state}");
    }
    Ok(())
}
