//! Locators for every element a run touches.
//!
//! Defaults target the LinkedIn web inbox. Any subset can be overridden from YAML,
//! see [`crate::config::ConfigLoader`].

use crate::model::InboxView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorPack {
    pub login: LoginSelectors,
    pub inbox: InboxSelectors,
    pub thread: ThreadSelectors,
    pub composer: ComposerSelectors,
}

impl SelectorPack {
    pub fn view(&self, view: InboxView) -> &ViewSelectors {
        match view {
            InboxView::Priority => &self.inbox.priority,
            InboxView::Other => &self.inbox.other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub url: String,
    pub username: String,
    pub password: String,
    pub submit: String,
    /// Fragments of the post-submit address that mean the login did not go through.
    pub failure_markers: Vec<String>,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            url: "https://www.linkedin.com/login".to_string(),
            username: "#username".to_string(),
            password: "#password".to_string(),
            submit: ".btn__primary--large".to_string(),
            failure_markers: vec!["login-submit".to_string(), "checkpoint/challenge".to_string()],
        }
    }
}

/// Entry point of one inbox view: the page to load and, optionally, the tab to
/// click once it is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSelectors {
    pub url: String,
    pub tab: Option<String>,
}

impl Default for ViewSelectors {
    fn default() -> Self {
        Self {
            url: "https://www.linkedin.com/messaging/".to_string(),
            tab: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxSelectors {
    pub priority: ViewSelectors,
    pub other: ViewSelectors,
    /// Conversation list container; the view cannot be processed without it.
    pub list: String,
    pub scroll_container: String,
    pub card: String,
    pub badge: String,
    pub participant_name: String,
    pub link: String,
    /// Author names in the thread shown next to the list; the last match is the
    /// author of the most recent message.
    pub latest_author: String,
}

impl Default for InboxSelectors {
    fn default() -> Self {
        Self {
            priority: ViewSelectors::default(),
            other: ViewSelectors {
                tab: Some(".msg-focused-inbox-tabs__tab:nth-of-type(2)".to_string()),
                ..ViewSelectors::default()
            },
            list: ".msg-conversations-container__conversations-list".to_string(),
            scroll_container: ".msg-conversations-container__conversations-list".to_string(),
            card: ".msg-conversations-container__conversations-list .msg-conversation-listitem"
                .to_string(),
            badge: ".msg-conversation-card__new-messages".to_string(),
            participant_name: ".msg-conversation-listitem__participant-names".to_string(),
            link: "a.msg-conversation-listitem__link".to_string(),
            latest_author: ".msg-s-message-group__name".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSelectors {
    pub list: String,
    pub message: String,
    pub body: String,
    pub time: String,
    pub group_time: String,
    pub date_heading: String,
}

impl Default for ThreadSelectors {
    fn default() -> Self {
        Self {
            list: ".msg-s-message-list__list".to_string(),
            message: ".msg-s-message-list__list .msg-s-event-listitem".to_string(),
            body: ".msg-s-event-listitem__body".to_string(),
            time: ".msg-s-event-listitem__time".to_string(),
            group_time: ".msg-s-message-group__timestamp".to_string(),
            date_heading: ".msg-s-event-listitem__time-heading".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSelectors {
    pub input: String,
    pub send: String,
    pub overlay_dismiss: String,
}

impl Default for ComposerSelectors {
    fn default() -> Self {
        Self {
            input: ".msg-form__contenteditable".to_string(),
            send: ".msg-form__send-button".to_string(),
            overlay_dismiss: ".artdeco-modal__dismiss".to_string(),
        }
    }
}
