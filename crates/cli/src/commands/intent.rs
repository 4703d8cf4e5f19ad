//! `dealdesk intent`: run the calendar-intent classifier on a message.

use dealdesk_agent::IntentClassifier;
use dealdesk_config::AppConfig;
use dealdesk_core::message::Message;

pub fn run(message: &str, recent: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let classifier = IntentClassifier::from_config(&config.intent);

    let recent: Vec<Message> = recent.iter().map(Message::user).collect();
    if classifier.needs_calendar(message, &recent) {
        println!("📅 Calendar needed");
    } else {
        println!("💬 No calendar lookup");
    }
    Ok(())
}
