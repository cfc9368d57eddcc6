use std::path::PathBuf;

use arboard::Clipboard;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::action::Action;
use crate::api::{ApiClient, HealthResponse};
use crate::attestation::AttestationModal;
use crate::backup::BackupPanel;
use crate::chat::{ChatPanel, Role};
use crate::command::CommandParser;
use crate::config::{Config, COMMANDS};
use crate::controller::{ActionController, Refusal};
use crate::event::{AppEvent, EventSender, Settled};
use crate::files::FilesPanel;
use crate::search::SearchPanel;
use crate::store::{ConfigStore, ConfigUpdate, GenerationConfig, MAX_CREATIVITY};
use crate::templates::TemplateGallery;
use crate::ui_state::{ConfigField, Focus, Notice, NoticeLevel, Screen, UIState};

const CREATIVITY_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Offline,
    Unknown,
    Healthy,
    Unreachable,
}

/// Root state. Owns the configuration store and every panel.
pub struct App {
    pub ui: UIState,
    pub config: Config,
    pub store: ConfigStore,
    config_watch: watch::Receiver<GenerationConfig>,
    pub chat: ChatPanel,
    pub files: FilesPanel,
    pub backup: BackupPanel,
    pub search: SearchPanel,
    pub attestation: AttestationModal,
    pub templates: TemplateGallery,
    pub health: ActionController<HealthResponse>,
    api: Option<ApiClient>,
    events: EventSender,
    pub animation_frame: usize,
    pub animation_tick: u64,
    pub should_quit: bool,
}

impl App {
    /// `api` is `None` in offline mode.
    pub fn new(config: Config, api: Option<ApiClient>, events: EventSender) -> Self {
        let store = ConfigStore::new();
        let config_watch = store.subscribe();
        Self {
            ui: UIState::new(),
            config,
            store,
            config_watch,
            chat: ChatPanel::new(),
            files: FilesPanel::new(),
            backup: BackupPanel::new(),
            search: SearchPanel::new(),
            attestation: AttestationModal::new(),
            templates: TemplateGallery::default(),
            health: ActionController::new("backend.health"),
            api,
            events,
            animation_frame: 0,
            animation_tick: 0,
            should_quit: false,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.api.as_ref().map(ApiClient::base_url)
    }

    pub fn backend_status(&self) -> BackendStatus {
        if self.api.is_none() {
            BackendStatus::Offline
        } else if self.health.error().is_some() {
            BackendStatus::Unreachable
        } else if self.health.result().is_some() {
            BackendStatus::Healthy
        } else {
            BackendStatus::Unknown
        }
    }

    pub fn tick(&mut self) {
        self.animation_tick += 1;
        self.animation_frame = (self.animation_frame + 1) % self.config.animation_frame_mod;
        self.ui.notices.expire(self.animation_tick);

        if self.ui.config_flash > 0 {
            self.ui.config_flash -= 1;
        }
        if self.config_watch.has_changed().unwrap_or(false) {
            self.config_watch.borrow_and_update();
            self.ui.config_flash = 20;
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, title: impl Into<String>, body: impl Into<String>) {
        let lifetime = match level {
            NoticeLevel::Error | NoticeLevel::Warning => self.config.error_notice_ms,
            NoticeLevel::Success | NoticeLevel::Info => self.config.success_notice_ms,
        };
        self.ui.notices.push(Notice {
            level,
            title: title.into(),
            body: body.into(),
            expires_at: self.animation_tick + self.config.ticks(lifetime),
        });
    }

    fn refuse(&mut self, what: &str, refusal: Refusal) {
        info!(action = what, reason = %refusal, "action refused");
        match refusal {
            Refusal::Busy => self.notify(NoticeLevel::Info, what, "Still working on the previous request"),
            Refusal::EmptyInput => self.notify(NoticeLevel::Warning, what, "Nothing to send"),
            Refusal::Unsupported(name) => self.notify(
                NoticeLevel::Warning,
                what,
                format!("{} is not a .pdf, .doc, .docx or .txt file", name),
            ),
            Refusal::Offline => self.notify(NoticeLevel::Warning, what, "Backend offline (started with -o)"),
        }
    }

    fn client(&mut self, what: &str) -> Option<ApiClient> {
        match &self.api {
            Some(api) => Some(api.clone()),
            None => {
                self.refuse(what, Refusal::Offline);
                None
            }
        }
    }

    // ----- actions -------------------------------------------------------

    /// Submit the chat input: slash commands run locally, anything else is a query.
    pub fn submit_chat(&mut self) {
        if self.chat.input.trim().is_empty() || self.chat.send.is_pending() {
            return;
        }
        let input = std::mem::take(&mut self.chat.input);
        self.reset_command_selection();

        if input.trim_start().starts_with('/') {
            match CommandParser::parse(&input) {
                Ok(action) => self.dispatch(action),
                Err(usage) => {
                    self.chat.push(Role::System, usage);
                }
            }
            return;
        }
        self.send_chat(&input);
    }

    pub fn send_chat(&mut self, text: &str) {
        let Some(api) = self.client("Chat") else { return };
        let (question, placeholder) = match self.chat.begin_send(text) {
            Ok(started) => started,
            Err(refusal) => return self.refuse("Chat", refusal),
        };
        let config = self.store.snapshot();
        self.chat.send.launch(
            &self.events,
            async move { api.query(&question, Some(&config)).await },
            move |outcome| AppEvent::Settled(Settled::Chat { placeholder, outcome }),
        );
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Help => {
                let mut help = String::from("Available commands:\n");
                for (cmd, desc) in COMMANDS {
                    help.push_str(&format!("  {} - {}\n", cmd, desc));
                }
                help.push_str("Keys: Tab/Shift+Tab focus, F2 attestation, F3 backup, F4 send search to chat");
                self.chat.push(Role::System, help);
            }
            Action::ClearHistory => {
                self.chat.clear();
                self.notify(NoticeLevel::Info, "Chat", "Chat cleared");
            }
            Action::Upload { paths } => {
                let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
                self.start_upload(&paths);
            }
            Action::Retrieve { cid } => self.start_retrieve(&cid),
            Action::Backup => self.start_backup(),
            Action::Search { query } => {
                self.search.query = query;
                self.start_search();
            }
            Action::SendToChat => self.send_search_to_chat(),
            Action::Attestation => self.set_attestation_visible(true),
            Action::ShowConfig => {
                let c = self.store.snapshot();
                self.chat.push(
                    Role::System,
                    format!(
                        "Generation settings:\n  Content type: {}\n  Tone: {}\n  Creativity: {}\n  SEO optimization: {}",
                        c.content_type.label(),
                        c.tone.label(),
                        c.creativity_level,
                        if c.seo_optimization { "on" } else { "off" }
                    ),
                );
            }
            Action::Template { name } => match TemplateGallery::find(&name) {
                Some(idx) => {
                    self.templates.selected = idx;
                    self.apply_template();
                }
                None => {
                    self.chat.push(Role::System, format!("Unknown template: {}", name));
                }
            },
            Action::Health => self.check_health(),
            Action::Quit => self.should_quit = true,
        }
    }

    pub fn start_upload(&mut self, paths: &[PathBuf]) {
        let Some(api) = self.client("Upload") else { return };
        let (paths, names) = match self.files.begin_upload(paths) {
            Ok(started) => started,
            Err(refusal) => return self.refuse("Upload", refusal),
        };
        self.files.upload.launch(
            &self.events,
            async move { api.upload(&paths).await },
            move |outcome| AppEvent::Settled(Settled::Upload { names, outcome }),
        );
    }

    pub fn start_retrieve(&mut self, cid: &str) {
        if cid.trim().is_empty() {
            self.notify(NoticeLevel::Warning, "Retrieve", "Please enter a CID");
            return;
        }
        let Some(api) = self.client("Retrieve") else { return };
        let cid = match self.files.begin_retrieve(cid) {
            Ok(cid) => cid,
            Err(refusal) => return self.refuse("Retrieve", refusal),
        };
        let request_cid = cid.clone();
        self.files.retrieve.launch(
            &self.events,
            async move { api.retrieve(&request_cid).await },
            move |outcome| AppEvent::Settled(Settled::Retrieve { cid, outcome }),
        );
    }

    pub fn start_backup(&mut self) {
        let Some(api) = self.client("Backup") else { return };
        if let Err(refusal) = self.backup.begin() {
            return self.refuse("Backup", refusal);
        }
        self.backup.action.launch(
            &self.events,
            async move { api.upload_db().await },
            |outcome| AppEvent::Settled(Settled::Backup(outcome)),
        );
    }

    pub fn start_search(&mut self) {
        // Blank queries are ignored without a notice.
        if self.search.query.trim().is_empty() {
            return;
        }
        let Some(api) = self.client("Search") else { return };
        let query = match self.search.begin_search() {
            Ok(query) => query,
            Err(refusal) => return self.refuse("Search", refusal),
        };
        self.search.search.launch(
            &self.events,
            async move { api.search(&query).await },
            |outcome| AppEvent::Settled(Settled::Search(outcome)),
        );
    }

    pub fn send_search_to_chat(&mut self) {
        if !self.search.can_send_to_chat() {
            return;
        }
        let Some(api) = self.client("Send to chat") else { return };
        let context = match self.search.begin_send_to_chat() {
            Ok(context) => context,
            Err(refusal) => return self.refuse("Send to chat", refusal),
        };
        self.search.forward.launch(
            &self.events,
            async move { api.send_context(&context).await },
            |outcome| AppEvent::Settled(Settled::SendToChat(outcome)),
        );
    }

    /// Open or close the attestation modal; opening fetches once per edge.
    pub fn set_attestation_visible(&mut self, visible: bool) {
        if !self.attestation.set_visible(visible) {
            return;
        }
        let Some(api) = self.client("Attestation") else { return };
        if let Err(refusal) = self.attestation.begin() {
            warn!(reason = %refusal, "attestation fetch skipped");
            return;
        }
        self.attestation.fetch.launch(
            &self.events,
            async move { api.attestation().await },
            |outcome| AppEvent::Settled(Settled::Attestation(outcome)),
        );
    }

    pub fn check_health(&mut self) {
        let Some(api) = self.api.clone() else { return };
        let started = self.health.perform(
            &self.events,
            async move { api.health().await },
            |outcome| AppEvent::Settled(Settled::Health(outcome)),
        );
        if let Err(refusal) = started {
            self.refuse("Health", refusal);
        }
    }

    pub fn apply_template(&mut self) {
        let template = self.templates.apply(&self.store);
        self.notify(
            NoticeLevel::Success,
            "Template",
            format!("{} selected", template.title),
        );
    }

    pub fn adjust_config(&mut self, forward: bool) {
        let c = self.store.snapshot();
        let update = match self.ui.config_field {
            ConfigField::ContentType => ConfigUpdate::ContentType(if forward {
                c.content_type.next()
            } else {
                c.content_type.prev()
            }),
            ConfigField::Tone => ConfigUpdate::Tone(if forward { c.tone.next() } else { c.tone.prev() }),
            ConfigField::Creativity => ConfigUpdate::CreativityLevel(if forward {
                c.creativity_level.saturating_add(CREATIVITY_STEP).min(MAX_CREATIVITY)
            } else {
                c.creativity_level.saturating_sub(CREATIVITY_STEP)
            }),
            ConfigField::Seo => ConfigUpdate::SeoOptimization(!c.seo_optimization),
        };
        self.store.update(update);
    }

    // ----- outcomes ------------------------------------------------------

    pub fn handle_settled(&mut self, settled: Settled) {
        match settled {
            Settled::Chat { placeholder, outcome } => {
                self.chat.settle_send(placeholder, outcome);
            }
            Settled::Upload { names, outcome } => {
                match &outcome {
                    Ok(_) => self.notify(
                        NoticeLevel::Success,
                        "Upload Successful",
                        "Your files have been uploaded.",
                    ),
                    Err(e) => self.notify(NoticeLevel::Error, "Upload Failed", e.to_string()),
                }
                self.files.settle_upload(names, outcome);
            }
            Settled::Retrieve { cid, outcome } => {
                match &outcome {
                    Ok(r) => self.notify(NoticeLevel::Success, "File retrieved", r.name.clone()),
                    Err(e) => self.notify(NoticeLevel::Error, "Retrieve Failed", e.to_string()),
                }
                self.files.settle_retrieve(cid, outcome);
            }
            Settled::Backup(outcome) => {
                match &outcome {
                    Ok(r) => self.notify(
                        NoticeLevel::Success,
                        "Backup complete",
                        format!("Upload id {}", r.upload_id),
                    ),
                    Err(e) => self.notify(NoticeLevel::Error, "Backup Failed", e.to_string()),
                }
                self.backup.settle(outcome);
            }
            Settled::Search(outcome) => {
                if let Err(e) = &outcome {
                    self.notify(NoticeLevel::Error, e.title(), e.to_string());
                }
                self.search.settle_search(outcome);
            }
            Settled::SendToChat(outcome) => {
                match &outcome {
                    Ok(()) => {
                        self.notify(
                            NoticeLevel::Success,
                            "Success",
                            "Search result added to chat context",
                        );
                        self.chat.push(Role::System, "Search result attached as chat context");
                    }
                    Err(e) => self.notify(NoticeLevel::Error, e.title(), e.to_string()),
                }
                self.search.settle_send_to_chat(outcome);
            }
            Settled::Attestation(outcome) => {
                if let Err(e) = &outcome {
                    self.notify(NoticeLevel::Error, "Attestation Failed", e.to_string());
                }
                self.attestation.settle(outcome);
            }
            Settled::Health(outcome) => {
                match &outcome {
                    Ok(h) => self.notify(NoticeLevel::Info, "Backend", format!("Connected ({})", h.status)),
                    Err(e) => self.notify(NoticeLevel::Warning, "Backend unreachable", e.to_string()),
                }
                self.health.settle(outcome);
            }
        }
    }

    // ----- input ---------------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.tick(),
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Paste(text) => self.paste(&text),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Resize(_, _) => {}
            AppEvent::Settled(settled) => self.handle_settled(settled),
        }
    }

    fn focused_input(&mut self) -> Option<&mut String> {
        match self.ui.focus {
            Focus::Chat if !self.chat.send.is_pending() => Some(&mut self.chat.input),
            Focus::Files => Some(&mut self.files.input),
            Focus::Search => Some(&mut self.search.query),
            _ => None,
        }
    }

    fn paste(&mut self, text: &str) {
        if self.ui.screen != Screen::Workspace {
            return;
        }
        // Single-line inputs: newlines become spaces.
        let filtered: String = text
            .chars()
            .filter(|c| *c != '\r')
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        if let Some(input) = self.focused_input() {
            input.push_str(&filtered);
        }
        self.reset_command_selection();
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.attestation.is_visible() {
            match mouse.kind {
                MouseEventKind::ScrollUp => self.attestation.scroll = self.attestation.scroll.saturating_sub(1),
                MouseEventKind::ScrollDown => self.attestation.scroll = self.attestation.scroll.saturating_add(1),
                _ => {}
            }
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollUp => self.chat.scroll_up(),
            MouseEventKind::ScrollDown => self.chat.scroll_down(),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.ui.screen == Screen::Home {
            if key.code == KeyCode::Esc {
                self.should_quit = true;
            } else {
                self.ui.screen = Screen::Workspace;
                self.check_health();
            }
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.attestation.is_visible() {
            match key.code {
                KeyCode::Esc | KeyCode::F(2) => self.set_attestation_visible(false),
                KeyCode::Up => self.attestation.scroll = self.attestation.scroll.saturating_sub(1),
                KeyCode::Down => self.attestation.scroll = self.attestation.scroll.saturating_add(1),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::F(2) => return self.set_attestation_visible(true),
            KeyCode::F(3) => return self.start_backup(),
            KeyCode::F(4) => return self.send_search_to_chat(),
            KeyCode::BackTab => {
                self.ui.focus = self.ui.focus.prev();
                return;
            }
            KeyCode::Tab => {
                if self.ui.focus == Focus::Chat
                    && self.showing_command_popup()
                    && self.ui.command_selection.is_some()
                {
                    self.apply_command_selection();
                } else {
                    self.ui.focus = self.ui.focus.next();
                }
                return;
            }
            KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if let Ok(text) = clipboard.get_text() {
                        self.paste(&text);
                    }
                }
                return;
            }
            _ => {}
        }

        match self.ui.focus {
            Focus::Chat => self.handle_chat_key(key),
            Focus::Files => self.handle_files_key(key),
            Focus::Search => self.handle_search_key(key),
            Focus::Config => self.handle_config_key(key),
            Focus::Templates => self.handle_templates_key(key),
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if self.showing_command_popup() {
                    self.reset_command_selection();
                } else if self.chat.input.is_empty() {
                    self.should_quit = true;
                } else {
                    self.chat.input.clear();
                }
            }
            KeyCode::Enter => {
                if self.showing_command_popup() && self.ui.command_selection.is_some() {
                    self.apply_command_selection();
                } else {
                    self.submit_chat();
                }
            }
            KeyCode::Up => {
                if self.showing_command_popup() {
                    self.command_select_up();
                } else {
                    for _ in 0..self.config.scroll_step {
                        self.chat.scroll_up();
                    }
                }
            }
            KeyCode::Down => {
                if self.showing_command_popup() {
                    self.command_select_down();
                } else {
                    for _ in 0..self.config.scroll_step {
                        self.chat.scroll_down();
                    }
                }
            }
            KeyCode::Backspace if !self.chat.send.is_pending() => {
                self.chat.input.pop();
                self.reset_command_selection();
            }
            KeyCode::Char(c) if !self.chat.send.is_pending() => {
                self.chat.input.push(c);
                self.reset_command_selection();
            }
            _ => {}
        }
    }

    fn handle_files_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let paths: Vec<PathBuf> = self
                    .files
                    .input
                    .split_whitespace()
                    .map(PathBuf::from)
                    .collect();
                if paths.is_empty() {
                    self.notify(NoticeLevel::Warning, "Upload", "Type one or more file paths first");
                    return;
                }
                self.start_upload(&paths);
                if self.files.upload.is_pending() {
                    self.files.input.clear();
                }
            }
            KeyCode::Enter => {
                let cid = self.files.input.clone();
                self.start_retrieve(&cid);
                if self.files.retrieve.is_pending() {
                    self.files.input.clear();
                }
            }
            KeyCode::Esc => self.files.input.clear(),
            KeyCode::Backspace => {
                self.files.input.pop();
            }
            KeyCode::Char(c) => self.files.input.push(c),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.send_search_to_chat();
            }
            KeyCode::Enter => self.start_search(),
            KeyCode::Up => self.search.scroll_draft_up(),
            KeyCode::Down => self.search.scroll_draft_down(),
            KeyCode::Esc => self.search.query.clear(),
            KeyCode::Backspace => {
                self.search.query.pop();
            }
            KeyCode::Char(c) => self.search.query.push(c),
            _ => {}
        }
    }

    fn handle_config_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.ui.config_field = self.ui.config_field.prev(),
            KeyCode::Down => self.ui.config_field = self.ui.config_field.next(),
            KeyCode::Left => self.adjust_config(false),
            KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => self.adjust_config(true),
            _ => {}
        }
    }

    fn handle_templates_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Left => self.templates.select_prev(),
            KeyCode::Down | KeyCode::Right => self.templates.select_next(),
            KeyCode::Enter | KeyCode::Char(' ') => self.apply_template(),
            _ => {}
        }
    }

    // ----- command popup -------------------------------------------------

    /// Check if command popup should be shown
    pub fn showing_command_popup(&self) -> bool {
        self.chat.input.starts_with('/') && !self.chat.input.contains(' ')
    }

    /// Get filtered commands based on current input
    pub fn get_filtered_commands(&self) -> Vec<(&'static str, &'static str)> {
        if !self.chat.input.starts_with('/') {
            return vec![];
        }
        let filter = &self.chat.input[1..];
        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd[1..].starts_with(filter))
            .copied()
            .collect()
    }

    pub fn command_select_up(&mut self) {
        let count = self.get_filtered_commands().len();
        if count == 0 {
            return;
        }
        // Cycle: None -> last command -> ... -> 0 -> None
        self.ui.command_selection = match self.ui.command_selection {
            None => Some(count - 1),
            Some(0) => None,
            Some(n) => Some(n - 1),
        };
    }

    pub fn command_select_down(&mut self) {
        let count = self.get_filtered_commands().len();
        if count == 0 {
            return;
        }
        // Cycle: None -> 0 -> 1 -> ... -> last -> None
        self.ui.command_selection = match self.ui.command_selection {
            None => Some(0),
            Some(n) if n >= count - 1 => None,
            Some(n) => Some(n + 1),
        };
    }

    pub fn apply_command_selection(&mut self) {
        if let Some(idx) = self.ui.command_selection {
            if let Some((cmd, _)) = self.get_filtered_commands().get(idx) {
                self.chat.input = cmd.to_string();
            }
        }
        self.ui.command_selection = None;
    }

    pub fn reset_command_selection(&mut self) {
        self.ui.command_selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{FAILURE_TEXT, PLACEHOLDER_TEXT};
    use crate::event::EventHandler;
    use axum::{
        extract::{Multipart, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Backend {
        uploads: Arc<AtomicUsize>,
        attestations: Arc<AtomicUsize>,
    }

    async fn upload(State(state): State<Backend>, mut multipart: Multipart) -> Json<Value> {
        while let Ok(Some(_)) = multipart.next_field().await {}
        let n = state.uploads.fetch_add(1, Ordering::SeqCst);
        let id = if n == 0 { "A" } else { "B" };
        Json(json!({ "upload_id": id }))
    }

    async fn attestation(State(state): State<Backend>) -> Json<Value> {
        state.attestations.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "output": "tdx quote ok" }))
    }

    async fn spawn_backend() -> (String, Backend) {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let state = Backend::default();
        let app = Router::new()
            .route(
                "/query",
                get(|| async { Json(json!({ "response": "R" })) }),
            )
            .route("/upload", post(upload))
            .route(
                "/search",
                post(|| async { Json(json!({ "result": "web result" })) }),
            )
            .route("/chat/context", post(|| async { StatusCode::OK }))
            .route("/attestation", get(attestation))
            .route(
                "/upload-db",
                post(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "detail": "storage node down" })),
                    )
                }),
            )
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), state)
    }

    fn workspace_app(url: Option<&str>, events: &EventHandler) -> App {
        let api = url.map(|u| ApiClient::new(u).unwrap());
        let mut app = App::new(Config::default(), api, events.sender());
        app.ui.screen = Screen::Workspace;
        app
    }

    /// Feed the next settled outcome back into the app.
    async fn settle_next(app: &mut App, events: &mut EventHandler) {
        loop {
            match events.next().await.expect("event channel closed") {
                AppEvent::Settled(settled) => {
                    app.handle_settled(settled);
                    return;
                }
                other => app.handle_event(other),
            }
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn test_chat_round_trip_replaces_placeholder() {
        let (url, _) = spawn_backend().await;
        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        type_text(&mut app, "what is RAG?");
        app.handle_key(KeyEvent::from(KeyCode::Enter));

        assert!(app.chat.send.is_pending());
        assert_eq!(app.chat.messages().last().unwrap().content, PLACEHOLDER_TEXT);
        assert!(app.chat.input.is_empty());

        // Input is disabled while the query is in flight.
        type_text(&mut app, "x");
        assert!(app.chat.input.is_empty());

        settle_next(&mut app, &mut events).await;

        assert!(!app.chat.send.is_pending());
        let last = app.chat.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "R");
        assert!(!app.chat.messages().iter().any(|m| m.content == PLACEHOLDER_TEXT));
    }

    #[tokio::test]
    async fn test_chat_against_dead_backend_reports_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);
        app.send_chat("hello");
        settle_next(&mut app, &mut events).await;

        let failures = app
            .chat
            .messages()
            .iter()
            .filter(|m| m.content.starts_with(FAILURE_TEXT))
            .count();
        assert_eq!(failures, 1);
        assert!(!app.chat.messages().iter().any(|m| m.content == PLACEHOLDER_TEXT));
        assert!(!app.chat.send.is_pending());
    }

    #[tokio::test]
    async fn test_sequential_uploads_preserve_order() {
        let (url, _) = spawn_backend().await;
        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.pdf");
        std::fs::write(&first, b"one").unwrap();
        std::fs::write(&second, b"two").unwrap();

        app.start_upload(&[first]);
        settle_next(&mut app, &mut events).await;
        app.start_upload(&[second]);
        settle_next(&mut app, &mut events).await;

        let ids: Vec<_> = app
            .files
            .records()
            .iter()
            .map(|r| r.server_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(app.ui.notices.last().unwrap().title, "Upload Successful");
    }

    #[tokio::test]
    async fn test_blank_cid_warns_without_request() {
        let (url, _) = spawn_backend().await;
        let events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);
        app.ui.focus = Focus::Files;

        type_text(&mut app, "   ");
        app.handle_key(KeyEvent::from(KeyCode::Enter));

        assert_eq!(app.files.retrieve.runs(), 0);
        let notice = app.ui.notices.last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_send_to_chat_enabled_after_search() {
        let (url, _) = spawn_backend().await;
        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        app.send_search_to_chat();
        assert_eq!(app.search.forward.runs(), 0);

        app.dispatch(Action::Search {
            query: "vector stores".to_string(),
        });
        assert!(!app.search.can_send_to_chat());
        settle_next(&mut app, &mut events).await;
        assert!(app.search.can_send_to_chat());

        app.handle_key(KeyEvent::from(KeyCode::F(4)));
        assert!(app.search.forward.is_pending());
        settle_next(&mut app, &mut events).await;

        assert!(!app.search.forward.is_pending());
        assert_eq!(app.search.search_result(), "web result");
        assert_eq!(app.ui.notices.last().unwrap().body, "Search result added to chat context");
    }

    #[tokio::test]
    async fn test_attestation_fetches_once_per_open() {
        let (url, backend) = spawn_backend().await;
        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        app.handle_key(KeyEvent::from(KeyCode::F(2)));
        app.set_attestation_visible(true);
        settle_next(&mut app, &mut events).await;
        assert_eq!(app.attestation.fetch.runs(), 1);
        assert_eq!(app.attestation.output(), Some("tdx quote ok"));

        // Still open: re-opening does nothing.
        app.dispatch(Action::Attestation);
        assert_eq!(app.attestation.fetch.runs(), 1);

        app.handle_key(KeyEvent::from(KeyCode::Esc));
        assert!(!app.attestation.is_visible());
        app.dispatch(Action::Attestation);
        settle_next(&mut app, &mut events).await;

        assert_eq!(app.attestation.fetch.runs(), 2);
        assert_eq!(backend.attestations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reopening_attestation_mid_fetch_does_not_refetch() {
        let (url, backend) = spawn_backend().await;
        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        app.handle_key(KeyEvent::from(KeyCode::F(2)));
        assert!(app.attestation.fetch.is_pending());

        // Close and reopen before the first fetch has settled.
        app.handle_key(KeyEvent::from(KeyCode::Esc));
        app.dispatch(Action::Attestation);
        assert!(app.attestation.is_visible());
        assert_eq!(app.attestation.fetch.runs(), 1);

        settle_next(&mut app, &mut events).await;
        assert!(!app.attestation.fetch.is_pending());
        assert_eq!(app.attestation.output(), Some("tdx quote ok"));
        assert_eq!(backend.attestations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_health_check_is_reported_busy() {
        let (url, _) = spawn_backend().await;
        let events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        app.dispatch(Action::Health);
        app.dispatch(Action::Health);

        assert_eq!(app.health.runs(), 1);
        let notice = app.ui.notices.last().unwrap();
        assert_eq!(notice.title, "Health");
        assert_eq!(notice.level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn test_backup_failure_surfaces_detail() {
        let (url, _) = spawn_backend().await;
        let mut events = EventHandler::detached();
        let mut app = workspace_app(Some(&url), &events);

        app.handle_key(KeyEvent::from(KeyCode::F(3)));
        assert!(app.backup.action.is_pending());
        settle_next(&mut app, &mut events).await;

        assert!(!app.backup.action.is_pending());
        assert!(app.backup.backups().is_empty());
        let notice = app.ui.notices.last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.body.contains("storage node down"), "{}", notice.body);
    }

    #[tokio::test]
    async fn test_offline_mode_refuses_without_side_effects() {
        let events = EventHandler::detached();
        let mut app = workspace_app(None, &events);
        let before = app.chat.messages().len();

        app.send_chat("hello");

        assert_eq!(app.backend_status(), BackendStatus::Offline);
        assert_eq!(app.chat.messages().len(), before);
        assert!(!app.chat.send.is_pending());
        assert_eq!(app.ui.notices.last().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_config_panel_updates_store() {
        let events = EventHandler::detached();
        let mut app = workspace_app(None, &events);
        app.ui.focus = Focus::Config;

        app.handle_key(KeyEvent::from(KeyCode::Right));
        app.handle_key(KeyEvent::from(KeyCode::Down));
        app.handle_key(KeyEvent::from(KeyCode::Down));
        app.handle_key(KeyEvent::from(KeyCode::Left));
        app.tick();

        let c = app.store.snapshot();
        assert_eq!(c.content_type, crate::store::ContentType::Social);
        assert_eq!(c.creativity_level, 65);
        assert!(app.ui.config_flash > 0);
    }

    #[tokio::test]
    async fn test_slash_commands_run_locally() {
        let events = EventHandler::detached();
        let mut app = workspace_app(None, &events);

        app.chat.input = "/template email".to_string();
        app.submit_chat();
        assert_eq!(app.store.snapshot().content_type, crate::store::ContentType::Email);

        app.chat.input = "/search".to_string();
        app.submit_chat();
        assert_eq!(app.chat.messages().last().unwrap().role, Role::System);

        app.chat.input = "/quit".to_string();
        app.submit_chat();
        assert!(app.should_quit);
    }

    #[test]
    fn test_command_popup_selection_cycles() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = App::new(Config::default(), None, tx);
        app.chat.input = "/s".to_string();

        let filtered = app.get_filtered_commands();
        assert_eq!(filtered.len(), 2);

        app.command_select_down();
        app.command_select_down();
        app.apply_command_selection();
        assert_eq!(app.chat.input, "/send");
        assert!(app.ui.command_selection.is_none());
    }
}
