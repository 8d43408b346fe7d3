use serde::{Deserialize, Serialize};

/// Notification type that stays on screen until the player acts on it.
pub const STREAK_WARNING: &str = "streak-warning";
pub const DAILY_REMINDER: &str = "daily-reminder";
pub const DISMISS_ACTION: &str = "dismiss";

const DEFAULT_TITLE: &str = "Daily Crossword";
const DEFAULT_BODY: &str = "Today's puzzle is ready. Keep your streak going!";
const DEFAULT_ICON: &str = "/crossword/icons/icon-192.png";
const DEFAULT_BADGE: &str = "/crossword/icons/badge-72.png";
const DEFAULT_TAG: &str = "daily-puzzle";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushData {
    pub url: Option<String>,
}

/// Push message body. Every field is optional; absent ones take the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<PushData>,
    pub actions: Option<Vec<NotificationAction>>,
}

impl PushPayload {
    /// Never fails: an empty or malformed payload gives the defaults.
    pub fn parse(raw: Option<&[u8]>) -> Self {
        match raw {
            None | Some([]) => Self::default(),
            Some(bytes) => serde_json::from_slice(bytes).unwrap_or_else(|err| {
                log::warn!("[PushPayload::parse] Ignoring malformed push payload: {err}");
                Self::default()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub kind: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,

    /// Click target. `None` means the crossword entry page.
    pub url: Option<String>,
}

impl Notification {
    pub fn from_payload(payload: PushPayload) -> Self {
        let kind = payload.kind.unwrap_or_else(|| DAILY_REMINDER.to_string());
        Self {
            title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: payload.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            badge: payload.badge.unwrap_or_else(|| DEFAULT_BADGE.to_string()),
            tag: payload.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
            require_interaction: kind == STREAK_WARNING,
            kind,
            actions: payload.actions.unwrap_or_else(default_actions),
            url: payload.data.and_then(|data| data.url),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**{}** ({})\n\
             \t{}\n\
             \tActions: {}",
            self.title,
            self.tag,
            self.body,
            self.actions.iter().map(|a| a.title.as_str()).collect::<Vec<_>>().join(", ")
        )
    }
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction { action: "play".to_string(), title: "Play now".to_string() },
        NotificationAction { action: DISMISS_ACTION.to_string(), title: "Later".to_string() },
    ]
}
