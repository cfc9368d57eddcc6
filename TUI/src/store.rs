//! Page-lifetime generation settings shared by every panel.
//!
//! The store is created once by [`crate::app::App`] and handed to consumers by
//! reference. Writes go through [`ConfigStore::update`], which merges exactly
//! one field; readers either take a snapshot or subscribe for change
//! notifications.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

pub const DEFAULT_CREATIVITY: u8 = 70;
pub const MAX_CREATIVITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Blog,
    Social,
    Email,
    Article,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Blog,
        ContentType::Social,
        ContentType::Email,
        ContentType::Article,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContentType::Blog => "Blog Post",
            ContentType::Social => "Social Media",
            ContentType::Email => "Email",
            ContentType::Article => "Article",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ALL, self, Self::ALL.len() - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Friendly,
    Formal,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Professional, Tone::Casual, Tone::Friendly, Tone::Formal];

    pub fn label(self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Casual => "Casual",
            Tone::Friendly => "Friendly",
            Tone::Formal => "Formal",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ALL, self, Self::ALL.len() - 1)
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, step: usize) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + step) % all.len()]
}

/// Settings forwarded to the backend alongside chat queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub content_type: ContentType,
    pub tone: Tone,
    pub creativity_level: u8,
    pub seo_optimization: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::Blog,
            tone: Tone::Professional,
            creativity_level: DEFAULT_CREATIVITY,
            seo_optimization: false,
        }
    }
}

/// One-field patch applied by [`ConfigStore::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigUpdate {
    ContentType(ContentType),
    Tone(Tone),
    CreativityLevel(u8),
    SeoOptimization(bool),
}

impl fmt::Display for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigUpdate::ContentType(c) => write!(f, "content type = {}", c.label()),
            ConfigUpdate::Tone(t) => write!(f, "tone = {}", t.label()),
            ConfigUpdate::CreativityLevel(l) => write!(f, "creativity = {}", l),
            ConfigUpdate::SeoOptimization(on) => write!(f, "seo = {}", on),
        }
    }
}

pub struct ConfigStore {
    tx: watch::Sender<GenerationConfig>,
}

impl ConfigStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GenerationConfig::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> GenerationConfig {
        self.tx.borrow().clone()
    }

    /// Merge a single field. Returns `true` if the stored value changed, in
    /// which case subscribers are notified.
    pub fn update(&self, update: ConfigUpdate) -> bool {
        let changed = self.tx.send_if_modified(|config| {
            let before = config.clone();
            match update {
                ConfigUpdate::ContentType(c) => config.content_type = c,
                ConfigUpdate::Tone(t) => config.tone = t,
                ConfigUpdate::CreativityLevel(l) => config.creativity_level = l.min(MAX_CREATIVITY),
                ConfigUpdate::SeoOptimization(on) => config.seo_optimization = on,
            }
            *config != before
        });
        if changed {
            debug!(%update, "config updated");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationConfig> {
        self.tx.subscribe()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
