use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two disjoint groupings of conversations in the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxView {
    Priority,
    Other,
}

impl InboxView {
    /// Views in the order a run visits them.
    pub const ALL: [InboxView; 2] = [InboxView::Priority, InboxView::Other];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for InboxView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How to get back to a conversation once it has been discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationLocator {
    /// Absolute address of the thread.
    Url(String),
    /// Position of the card in the conversation list of the current view.
    ListItem(usize),
}

/// Which signal marked the conversation as unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadSignal {
    Badge,
    /// The thread opened by default had a latest message from someone else.
    LatestAuthor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub name: String,
    pub locator: ConversationLocator,
    pub unread_count: usize,
    pub view: InboxView,
    pub signal: UnreadSignal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub time: String,
    pub date: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Spanish];

    /// Token the generator embeds in its output to declare the reply language.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::English => "[en]",
            Self::Spanish => "[es]",
        }
    }

    pub fn disclaimer(&self) -> &'static str {
        match self {
            Self::English => "Auto-generated message using AI, more details: ",
            Self::Spanish => "Mensaje autogenerado usando IA, más detalles: ",
        }
    }
}

/// Generated text with its language marker consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub generated_text: String,
    pub language: Option<Language>,
}

impl Reply {
    /// Detect the first language marker (case-insensitive) and strip every marker
    /// from the text.
    pub fn parse(generated: &str) -> Self {
        let mut text = generated.to_string();
        let mut language = None;
        let mut earliest = usize::MAX;

        for candidate in Language::ALL {
            let marker = candidate.marker();
            if let Some(pos) = text.to_ascii_lowercase().find(marker)
                && pos < earliest
            {
                earliest = pos;
                language = Some(candidate);
            }
        }

        for candidate in Language::ALL {
            let marker = candidate.marker();
            while let Some(pos) = text.to_ascii_lowercase().find(marker) {
                text.replace_range(pos..pos + marker.len(), "");
            }
        }

        Self {
            generated_text: text.trim().to_string(),
            language,
        }
    }
}
