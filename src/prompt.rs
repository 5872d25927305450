//! Prompt construction and reply cleanup for marker-delimited models.
//!
//! Chat-style prompts delimit each turn with a role marker and end with an
//! open assistant marker. Models often echo the whole prompt back, so replies
//! are cut down to the text after the last assistant marker.

use crate::config::{EndpointConfig, INPUT_PLACEHOLDER, PromptStyle};
use crate::conversation::{ConversationMessage, Role};

/// Marker opening the system instruction.
pub const SYSTEM_MARKER: &str = "<|system|>";
/// Marker opening a user turn.
pub const USER_MARKER: &str = "<|user|>";
/// Marker opening an assistant turn.
pub const ASSISTANT_MARKER: &str = "<|assistant|>";

fn marker_for(role: Role) -> &'static str {
    match role {
        Role::System => SYSTEM_MARKER,
        Role::User => USER_MARKER,
        Role::Assistant => ASSISTANT_MARKER,
    }
}

/// Build a marker-delimited prompt from the persona, prior turns and the
/// current user text.
///
/// Prior turns that are themselves system messages are skipped; the persona
/// is always emitted first.
pub fn chat_prompt(persona: &str, history: &[ConversationMessage], user_text: &str) -> String {
    let mut prompt = format!("{SYSTEM_MARKER}\n{persona}\n");
    for message in history.iter().filter(|m| m.role != Role::System) {
        prompt.push_str(marker_for(message.role));
        prompt.push('\n');
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.push_str(USER_MARKER);
    prompt.push('\n');
    prompt.push_str(user_text);
    prompt.push('\n');
    prompt.push_str(ASSISTANT_MARKER);
    prompt
}

/// Substitute the user's text into a plain template.
pub fn plain_prompt(template: &str, user_text: &str) -> String {
    template.replace(INPUT_PLACEHOLDER, user_text)
}

/// Build the prompt an endpoint expects.
pub fn build_prompt(
    endpoint: &EndpointConfig,
    persona: &str,
    history: &[ConversationMessage],
    user_text: &str,
) -> String {
    match endpoint.prompt {
        PromptStyle::Chat => chat_prompt(persona, history, user_text),
        PromptStyle::Plain => match endpoint.template.as_deref() {
            Some(template) => plain_prompt(template, user_text),
            None => user_text.to_owned(),
        },
    }
}

/// Reduce raw model output to the assistant's reply.
///
/// Keeps the text after the last assistant marker (or everything when there
/// is none), cuts it at the first system or user marker, then trims.
pub fn clean_reply(raw: &str) -> String {
    let after_assistant = raw
        .rsplit_once(ASSISTANT_MARKER)
        .map_or(raw, |(_, tail)| tail);
    let before_system = after_assistant
        .split_once(SYSTEM_MARKER)
        .map_or(after_assistant, |(head, _)| head);
    let before_user = before_system
        .split_once(USER_MARKER)
        .map_or(before_system, |(head, _)| head);
    before_user.trim().to_owned()
}
