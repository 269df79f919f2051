use crate::backend::{Backend, ElementRef};
use crate::config::SelectorPack;
use crate::error::InboxError;
use crate::model::{Conversation, ConversationLocator, Message};
use crate::page;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Date label for messages rendered without a date heading.
pub const TODAY: &str = "TODAY";

fn wall_clock() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

pub struct MessageExtractor {
    selectors: Arc<SelectorPack>,
    retry: RetryPolicy,
    wait_timeout: Duration,
    clock: fn() -> String,
}

impl MessageExtractor {
    pub fn new(selectors: Arc<SelectorPack>, retry: RetryPolicy, wait_timeout: Duration) -> Self {
        Self {
            selectors,
            retry,
            wait_timeout,
            clock: wall_clock,
        }
    }

    /// Replace the source of the last-resort `HH:MM` timestamp.
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    /// Bring the conversation's thread on screen and wait for its message list.
    /// A list position is clicked on the current page, which must be the
    /// conversation's own view.
    pub async fn open<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        conversation: &Conversation,
    ) -> Result<(), InboxError> {
        match &conversation.locator {
            ConversationLocator::Url(url) => {
                page::navigate(backend, &self.retry, url).await?;
            }
            ConversationLocator::ListItem(index) => {
                backend
                    .click(&ElementRef::nth(&self.selectors.inbox.card, *index))
                    .await?;
            }
        }

        page::wait_required(
            backend,
            &self.retry,
            &self.selectors.thread.list,
            self.wait_timeout,
            &format!("opening the conversation with {}", conversation.name),
        )
        .await
    }

    /// The `unread_count` most recent messages of the conversation, newest first.
    /// Threads shorter than the unread count yield every message they have.
    pub async fn extract<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        conversation: &Conversation,
    ) -> Result<Vec<Message>, InboxError> {
        self.open(backend, conversation).await?;

        let thread = &self.selectors.thread;
        let total = backend.count(&thread.message).await?;
        let wanted = conversation.unread_count.min(total);

        let mut messages = Vec::with_capacity(wanted);
        for index in (total - wanted..total).rev() {
            let item = ElementRef::nth(&thread.message, index);
            messages.push(self.read_message(backend, &item).await?);
        }

        tracing::debug!(
            "Extracted {} of {} message(s) from {}",
            messages.len(),
            total,
            conversation.name
        );
        Ok(messages)
    }

    async fn read_message<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        item: &ElementRef,
    ) -> Result<Message, InboxError> {
        let thread = &self.selectors.thread;
        let text = backend.read_text(item, &thread.body).await?;

        let time = match page::optional_text(backend, item, &thread.time).await? {
            Some(time) => time,
            None => match page::optional_text(backend, item, &thread.group_time).await? {
                Some(time) => time,
                None => (self.clock)(),
            },
        };

        let date = page::optional_text(backend, item, &thread.date_heading)
            .await?
            .unwrap_or_else(|| TODAY.to_string());

        Ok(Message {
            time,
            date,
            text: text.trim().to_string(),
        })
    }
}
