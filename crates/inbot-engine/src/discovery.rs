//! Finds the conversations with unread messages in one inbox view.
//!
//! A conversation is unread when its card carries a badge; the badge text is the
//! unread count. The priority view opens its first conversation automatically,
//! which clears that badge, so the first card there is judged by who wrote the
//! latest message instead (see [`is_implicitly_unread`]).

use crate::backend::{Backend, ElementRef};
use crate::config::SelectorPack;
use crate::error::InboxError;
use crate::model::{Conversation, ConversationLocator, InboxView, UnreadSignal};
use crate::page;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Conversations found in one view, in list order, plus the cards that looked
/// unread but could not be read.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub conversations: Vec<Conversation>,
    pub rejected: Vec<InboxError>,
}

/// Whether the first conversation of the priority view is waiting on a reply even
/// though it has no badge.
///
/// Contract: true iff `latest_author` does not start with `participant`, after
/// trimming both. Display names that are reordered or abbreviated by the host UI
/// (localized name order, middle names) make this return true for messages the
/// participant did write.
pub fn is_implicitly_unread(latest_author: &str, participant: &str) -> bool {
    !latest_author.trim().starts_with(participant.trim())
}

/// Badge text to unread count, reading leading decimal digits the way the badge
/// renders them ("3", "12 new"). `None` when the text does not start with a digit.
pub fn parse_unread_count(text: &str) -> Option<usize> {
    let trimmed = text.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub struct ConversationDiscovery {
    selectors: Arc<SelectorPack>,
    retry: RetryPolicy,
    wait_timeout: Duration,
}

impl ConversationDiscovery {
    pub fn new(selectors: Arc<SelectorPack>, retry: RetryPolicy, wait_timeout: Duration) -> Self {
        Self {
            selectors,
            retry,
            wait_timeout,
        }
    }

    /// Load the view and wait for its conversation list. A missing list is fatal
    /// for the view.
    pub async fn open_view<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        view: InboxView,
    ) -> Result<(), InboxError> {
        let entry = self.selectors.view(view);
        page::navigate(backend, &self.retry, &entry.url).await?;

        if let Some(tab) = &entry.tab {
            page::wait_required(
                backend,
                &self.retry,
                tab,
                self.wait_timeout,
                &format!("opening the {} inbox tab", view),
            )
            .await?;
            backend.click(&ElementRef::first(tab)).await?;
        }

        page::wait_required(
            backend,
            &self.retry,
            &self.selectors.inbox.list,
            self.wait_timeout,
            &format!("loading the {} conversation list", view),
        )
        .await
    }

    /// Show the view's full list again, so card positions match the ones recorded
    /// by [`discover`](Self::discover).
    pub async fn reopen_list<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        view: InboxView,
    ) -> Result<(), InboxError> {
        self.open_view(backend, view).await?;
        backend
            .scroll_to_end(&self.selectors.inbox.scroll_container)
            .await?;
        Ok(())
    }

    pub async fn discover<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        view: InboxView,
    ) -> Result<DiscoveryOutcome, InboxError> {
        self.open_view(backend, view).await?;
        let inbox = &self.selectors.inbox;
        let mut outcome = DiscoveryOutcome::default();

        let mut first_handled = false;
        if view == InboxView::Priority {
            match self.first_conversation(backend, view).await {
                Ok(Some(conversation)) => {
                    debug!(
                        "First {} conversation with {} is awaiting a reply",
                        view, conversation.name
                    );
                    outcome.conversations.push(conversation);
                    first_handled = true;
                }
                Ok(None) => {}
                Err(err) => warn!("Could not inspect first {} conversation: {}", view, err),
            }
        }

        backend.scroll_to_end(&inbox.scroll_container).await?;

        let total = backend.count(&inbox.card).await?;
        for index in 0..total {
            if first_handled && index == 0 {
                continue;
            }
            let card = ElementRef::nth(&inbox.card, index);
            if !backend.contains(&card, &inbox.badge).await? {
                continue;
            }
            match self.read_badged(backend, view, &card).await {
                Ok(Some(conversation)) => outcome.conversations.push(conversation),
                Ok(None) => debug!("{} conversation #{} has an empty badge", view, index),
                Err(err) => {
                    warn!("Skipping {} conversation #{}: {}", view, index, err);
                    outcome.rejected.push(err);
                }
            }
        }

        info!(
            "Found {} unread conversation(s) in the {} inbox ({} listed, {} rejected)",
            outcome.conversations.len(),
            view,
            total,
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    async fn first_conversation<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        view: InboxView,
    ) -> Result<Option<Conversation>, InboxError> {
        let inbox = &self.selectors.inbox;
        if backend.count(&inbox.card).await? == 0 {
            return Ok(None);
        }
        let card = ElementRef::first(&inbox.card);
        let participant = backend.read_text(&card, &inbox.participant_name).await?;

        let authors = backend.count(&inbox.latest_author).await?;
        if authors == 0 {
            debug!("No open thread next to the {} list", view);
            return Ok(None);
        }
        let latest_author = backend
            .element_text(&ElementRef::nth(&inbox.latest_author, authors - 1))
            .await?;

        if !is_implicitly_unread(&latest_author, &participant) {
            return Ok(None);
        }

        Ok(Some(Conversation {
            name: participant.trim().to_string(),
            locator: self.locator(backend, &card).await?,
            unread_count: 1,
            view,
            signal: UnreadSignal::LatestAuthor,
        }))
    }

    async fn read_badged<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        view: InboxView,
        card: &ElementRef,
    ) -> Result<Option<Conversation>, InboxError> {
        let inbox = &self.selectors.inbox;
        let badge = backend.read_text(card, &inbox.badge).await?;
        let unread_count =
            parse_unread_count(&badge).ok_or_else(|| InboxError::MalformedCount {
                view,
                index: card.index,
                text: badge.clone(),
            })?;
        if unread_count == 0 {
            return Ok(None);
        }

        let name = backend.read_text(card, &inbox.participant_name).await?;
        Ok(Some(Conversation {
            name: name.trim().to_string(),
            locator: self.locator(backend, card).await?,
            unread_count,
            view,
            signal: UnreadSignal::Badge,
        }))
    }

    /// Prefer the card's link target; fall back to the card position when the card
    /// has no usable link.
    async fn locator<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        card: &ElementRef,
    ) -> Result<ConversationLocator, InboxError> {
        let inbox = &self.selectors.inbox;
        let href = backend.read_attribute(card, &inbox.link, "href").await?;
        let resolved = href.and_then(|href| {
            url::Url::parse(&inbox.priority.url)
                .and_then(|base| base.join(href.trim()))
                .ok()
        });
        Ok(match resolved {
            Some(url) => ConversationLocator::Url(url.to_string()),
            None => ConversationLocator::ListItem(card.index),
        })
    }
}
