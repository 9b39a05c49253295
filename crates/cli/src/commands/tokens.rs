//! `parley tokens`: count tokens under the configured encoding.

use parley_agent::TokenCounter;
use parley_config::AppConfig;
use parley_core::message::Message;

pub fn run(config: &AppConfig, text: &str) -> anyhow::Result<()> {
    let counter = TokenCounter::for_model(config.encoding_model())?;
    let as_message = counter.count_message_tokens(&[Message::user(text)]);

    println!("Encoding:          {}", counter.encoding_name());
    println!("Text tokens:       {}", counter.count_tokens(text));
    println!("As a user message: {as_message}");
    Ok(())
}
