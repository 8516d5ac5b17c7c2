//! Answer messages from a rules file.
//!
//! Usage:
//!   RULE_BRAIN_RULES_PATH=tests/fixtures/fakerules.csv \
//!     cargo run -p rule-brain --example match_message -- "hello" "good morning"

use rule_brain::{Brain, InboundMessage, RuleBrain};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let brain = RuleBrain::from_env()?;
    println!("Brain: {} ({} rules)", brain.name(), brain.rules().len());

    for (i, text) in std::env::args().skip(1).enumerate() {
        let message = InboundMessage::direct("+15551234567", text.clone(), i as u64);
        match brain.process(message).await {
            Ok(response) => println!("{} -> {}", text, response.text),
            Err(e) => eprintln!("{} -> error: {}", text, e),
        }
    }

    Ok(())
}
