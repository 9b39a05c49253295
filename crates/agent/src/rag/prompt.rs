//! RAG augmentation of the message list sent to the model.

use parley_core::message::Message;

/// Instruction placed first in every grounded request.
pub const RAG_INSTRUCTION: &str = "You are a helpful assistant. Answer the user's question based on the provided document excerpts. \
If the answer cannot be found in the provided context, say so clearly. \
Always cite which document excerpt you're using when answering.";

/// Join excerpts into the context block, labelled 1-based in retrieval order.
pub fn excerpt_context(excerpts: &[String]) -> String {
    let body = excerpts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[Document Excerpt {}]\n{text}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Relevant document context:\n\n{body}")
}

/// Prepend the instruction and context messages to `history`.
///
/// With no excerpts the history is returned unchanged.
pub fn augment(history: Vec<Message>, excerpts: &[String]) -> Vec<Message> {
    if excerpts.is_empty() {
        return history;
    }
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(RAG_INSTRUCTION));
    messages.push(Message::system(excerpt_context(excerpts)));
    messages.extend(history);
    messages
}
