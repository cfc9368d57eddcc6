use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Screen {
    #[default]
    Home,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Config,
    Templates,
    Files,
    #[default]
    Chat,
    Search,
}

impl Focus {
    const ORDER: [Focus; 5] = [
        Focus::Config,
        Focus::Templates,
        Focus::Files,
        Focus::Chat,
        Focus::Search,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Row highlighted in the configuration panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigField {
    #[default]
    ContentType,
    Tone,
    Creativity,
    Seo,
}

impl ConfigField {
    pub const ALL: [ConfigField; 4] = [
        ConfigField::ContentType,
        ConfigField::Tone,
        ConfigField::Creativity,
        ConfigField::Seo,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
    pub expires_at: u64,
}

/// Toast-style notices, newest last.
#[derive(Debug, Default)]
pub struct Notices {
    items: VecDeque<Notice>,
}

impl Notices {
    const MAX_VISIBLE: usize = 4;

    pub fn push(&mut self, notice: Notice) {
        self.items.push_back(notice);
        while self.items.len() > Self::MAX_VISIBLE {
            self.items.pop_front();
        }
    }

    /// Drop notices whose lifetime has passed.
    pub fn expire(&mut self, now: u64) {
        self.items.retain(|n| n.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&Notice> {
        self.items.back()
    }
}

#[derive(Default)]
pub struct UIState {
    pub screen: Screen,
    pub focus: Focus,
    pub config_field: ConfigField,

    // Command popup state
    pub command_selection: Option<usize>,

    pub notices: Notices,

    // Ticks remaining for the config-changed highlight
    pub config_flash: u8,
}

impl UIState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(title: &str, expires_at: u64) -> Notice {
        Notice {
            level: NoticeLevel::Info,
            title: title.to_string(),
            body: String::new(),
            expires_at,
        }
    }

    #[test]
    fn test_notices_expire() {
        let mut notices = Notices::default();
        notices.push(notice("short", 10));
        notices.push(notice("long", 100));

        notices.expire(10);
        let titles: Vec<_> = notices.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["long"]);
    }

    #[test]
    fn test_notices_are_capped() {
        let mut notices = Notices::default();
        for i in 0..6 {
            notices.push(notice(&format!("n{i}"), 100));
        }
        assert_eq!(notices.iter().count(), 4);
        assert_eq!(notices.last().unwrap().title, "n5");
    }

    #[test]
    fn test_focus_cycles_both_ways() {
        assert_eq!(Focus::Search.next(), Focus::Config);
        assert_eq!(Focus::Config.prev(), Focus::Search);
        assert_eq!(Focus::Chat.next().prev(), Focus::Chat);
    }
}
