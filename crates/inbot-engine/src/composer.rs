//! Turns extracted messages into a prompt and generated text into the reply
//! that is sent.

use crate::model::{Message, Reply};

/// Prompt for `messages` as given (the extractor hands them over newest first).
pub fn build_prompt(messages: &[Message], participant: &str) -> String {
    let mut prompt = format!("The user {} wrote the following messages:\n", participant);
    for message in messages {
        prompt.push_str(&format!(
            "{} at {}: {}\n",
            message.date, message.time, message.text
        ));
    }
    prompt
}

#[derive(Debug, Clone)]
pub struct ReplyComposer {
    repository_url: String,
}

impl ReplyComposer {
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
        }
    }

    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    pub fn build_prompt(&self, messages: &[Message], participant: &str) -> String {
        build_prompt(messages, participant)
    }

    /// The language marker, if any, becomes the matching disclaimer; the repository
    /// URL always ends the reply. A marker in the middle of the text is removed
    /// there and its disclaimer moves to the footer.
    pub fn finalize_reply(&self, generated: &str) -> String {
        let reply = Reply::parse(generated);
        match reply.language {
            Some(language) => format!(
                "{}\n\n{}{}",
                reply.generated_text,
                language.disclaimer(),
                self.repository_url
            ),
            None => format!("{}\n\n{}", reply.generated_text, self.repository_url),
        }
    }
}
