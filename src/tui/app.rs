//! Main TUI application state and logic

use crate::client::{ClientFacade, LekhaApi};
use crate::config::ClientConfig;
use crate::session::{ChatSession, SendDecision};
use crate::storage::{History, Settings, Store};
use crate::tui::screens::{GalleryScreen, VisionScreen, WisdomScreen};
use crate::tui::types::{Tab, TaskEvent};
use crate::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{info, warn};

/// Shown while a failed attempt is being retried
pub fn retry_notice(attempt: u32) -> String {
    format!("ПОВТОР ЗАПРОСА... ПОПЫТКА {}", attempt)
}

/// Shown in the gallery when no picture came back
pub const NO_PICTURE_NOTICE: &str = "Картинки не будет. Даже нейросеть отказалась, Лёх.";

/// Minimum gap between two keystroke clicks
const CLICK_INTERVAL: Duration = Duration::from_millis(45);

/// Application state
pub struct App {
    /// Active tab
    pub current_tab: Tab,
    /// Should quit
    pub should_quit: bool,
    /// Conversation and cooldown
    pub session: ChatSession,
    /// Input buffer for the chat tab
    pub chat_input: String,
    /// Sound toggles
    pub settings: Settings,
    /// Vision tab state
    pub vision: VisionScreen,
    /// Gallery tab state
    pub gallery: GalleryScreen,
    /// Wisdom tab state
    pub wisdom: WisdomScreen,
    /// Latest retry in progress, by issuing tab
    pub retrying: Option<(Tab, u32)>,
    /// Where generated pictures are written
    pub output_dir: PathBuf,
    api: Arc<dyn LekhaApi>,
    store: Store,
    events_tx: UnboundedSender<TaskEvent>,
    events_rx: UnboundedReceiver<TaskEvent>,
    bell: bool,
    last_click: Option<StdInstant>,
}

impl App {
    /// Create the application from client configuration
    ///
    /// Opens (or creates) the database under the data directory and talks to
    /// the gateway at `config.api_url`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let store = Store::new(config.db_path())?;
        let api = Arc::new(ClientFacade::with_policy(config.api_url.clone(), config.retry));
        info!("Terminal client using gateway {}", config.api_url);
        Ok(Self::with_parts(api, store, config.data_dir.clone()))
    }

    /// Create the application from ready-made parts, restoring stored state
    pub fn with_parts(api: Arc<dyn LekhaApi>, store: Store, output_dir: PathBuf) -> Self {
        let history = History::from_messages(store.load_history());
        let settings = store.load_settings();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            current_tab: Tab::Chat,
            should_quit: false,
            session: ChatSession::with_history(history),
            chat_input: String::new(),
            settings,
            vision: VisionScreen::new(),
            gallery: GalleryScreen::new(),
            wisdom: WisdomScreen::new(),
            retrying: None,
            output_dir,
            api,
            store,
            events_tx,
            events_rx,
            bell: false,
            last_click: None,
        }
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear_history();
            }
            KeyCode::Tab => self.current_tab = self.current_tab.next(),
            KeyCode::BackTab => self.current_tab = self.current_tab.previous(),
            KeyCode::F(2) => self.toggle_sound(),
            KeyCode::F(3) => self.toggle_sound_pro(),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                if let Some(buffer) = self.input_buffer() {
                    buffer.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(buffer) = self.input_buffer() {
                    buffer.push(c);
                    self.click();
                }
            }
            _ => {}
        }
    }

    /// Input buffer of the active tab, if it has one
    fn input_buffer(&mut self) -> Option<&mut String> {
        match self.current_tab {
            Tab::Chat => Some(&mut self.chat_input),
            Tab::Vision => Some(&mut self.vision.path_input),
            Tab::Gallery => Some(&mut self.gallery.prompt),
            Tab::Wisdom => None,
        }
    }

    /// Run the action of the active tab
    pub fn submit(&mut self) {
        match self.current_tab {
            Tab::Chat => self.submit_chat(),
            Tab::Vision => self.start_scan(),
            Tab::Gallery => self.generate_picture(),
            Tab::Wisdom => self.fetch_wisdom(),
        }
    }

    /// Send the chat input
    pub fn submit_chat(&mut self) {
        match self.session.begin_send(&self.chat_input, Instant::now()) {
            SendDecision::Ignored => {}
            SendDecision::Suppressed => self.persist_history(),
            SendDecision::Dispatched { user_id, text } => {
                self.chat_input.clear();
                self.retrying = None;
                self.persist_history();
                self.beep();

                let api = Arc::clone(&self.api);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let retry_tx = tx.clone();
                    let observer = move |attempt: u32| {
                        let _ = retry_tx.send(TaskEvent::Retrying { tab: Tab::Chat, attempt });
                    };
                    let reply = api.chat(&text, Some(&observer)).await;
                    let _ = tx.send(TaskEvent::ChatDone { user_id, reply });
                });
            }
        }
    }

    /// Load the image named in the vision input and send it for critique
    pub fn start_scan(&mut self) {
        if self.vision.loading || !self.vision.load_image() {
            return;
        }
        let Some(image_data) = self.vision.image_data.clone() else {
            return;
        };
        self.vision.loading = true;
        self.beep();

        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let retry_tx = tx.clone();
            let observer = move |attempt: u32| {
                let _ = retry_tx.send(TaskEvent::Retrying { tab: Tab::Vision, attempt });
            };
            let reply = api.analyze_style(&image_data, Some(&observer)).await;
            let _ = tx.send(TaskEvent::VisionDone(reply));
        });
    }

    /// Generate a picture from the gallery prompt
    pub fn generate_picture(&mut self) {
        if self.gallery.loading {
            return;
        }
        self.gallery.loading = true;
        self.gallery.status_message = None;
        self.beep();

        let prompt = self.gallery.prompt.clone();
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let retry_tx = tx.clone();
            let observer = move |attempt: u32| {
                let _ = retry_tx.send(TaskEvent::Retrying { tab: Tab::Gallery, attempt });
            };
            let reply = api.generate_crazy_lekha(&prompt, Some(&observer)).await;
            let _ = tx.send(TaskEvent::GalleryDone(reply));
        });
    }

    /// Fetch a new quote
    pub fn fetch_wisdom(&mut self) {
        if self.wisdom.loading {
            return;
        }
        self.wisdom.loading = true;
        self.beep();

        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let retry_tx = tx.clone();
            let observer = move |attempt: u32| {
                let _ = retry_tx.send(TaskEvent::Retrying { tab: Tab::Wisdom, attempt });
            };
            let reply = api.get_lekha_quote(Some(&observer)).await;
            let _ = tx.send(TaskEvent::WisdomDone(reply));
        });
    }

    /// Apply every finished background result; returns how many were applied
    pub fn poll_tasks(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    /// Apply one background result
    pub fn apply_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Retrying { tab, attempt } => {
                self.retrying = Some((tab, attempt));
            }
            TaskEvent::ChatDone { user_id, reply } => {
                self.clear_retry(Tab::Chat);
                let fell_back = reply.is_fallback();
                self.session.complete_send(&user_id, reply);
                self.persist_history();
                if !fell_back {
                    self.beep();
                }
            }
            TaskEvent::VisionDone(reply) => {
                self.clear_retry(Tab::Vision);
                self.vision.loading = false;
                self.vision.analysis = Some(reply.value);
            }
            TaskEvent::GalleryDone(reply) => {
                self.clear_retry(Tab::Gallery);
                self.gallery.loading = false;
                self.gallery.status_message = Some(match reply.value {
                    Some(data_url) => match self.gallery.save_picture(&data_url, &self.output_dir) {
                        Ok(path) => {
                            info!("Saved generated picture to {}", path.display());
                            format!("Сохранено: {}", path.display())
                        }
                        Err(e) => {
                            warn!("Failed to save generated picture: {}", e);
                            format!("Не сохранилось: {}", e)
                        }
                    },
                    None => NO_PICTURE_NOTICE.to_string(),
                });
            }
            TaskEvent::WisdomDone(reply) => {
                self.clear_retry(Tab::Wisdom);
                self.wisdom.loading = false;
                self.wisdom.quote = reply.value;
            }
        }
    }

    fn clear_retry(&mut self, tab: Tab) {
        if self.retrying.is_some_and(|(t, _)| t == tab) {
            self.retrying = None;
        }
    }

    /// Retry line for `tab`, if one of its calls is being retried
    pub fn retry_line(&self, tab: Tab) -> Option<String> {
        self.retrying
            .filter(|(t, _)| *t == tab)
            .map(|(_, attempt)| retry_notice(attempt))
    }

    /// Flip the interface sound and persist
    pub fn toggle_sound(&mut self) {
        self.settings.toggle_sound();
        self.persist_settings();
    }

    /// Flip the keystroke clicks and persist
    pub fn toggle_sound_pro(&mut self) {
        self.settings.toggle_sound_pro();
        self.persist_settings();
    }

    /// Drop the conversation and its stored record
    pub fn clear_history(&mut self) {
        self.session.clear();
        if let Err(e) = self.store.clear_history() {
            warn!("Failed to clear stored history: {}", e);
        }
    }

    fn persist_history(&self) {
        if let Err(e) = self.store.save_history(self.session.history().messages()) {
            warn!("Failed to save history: {}", e);
        }
    }

    fn persist_settings(&self) {
        if let Err(e) = self.store.save_settings(&self.settings) {
            warn!("Failed to save settings: {}", e);
        }
    }

    fn beep(&mut self) {
        if self.settings.sound_on {
            self.bell = true;
        }
    }

    fn click(&mut self) {
        if !self.settings.pro_effects_active() {
            return;
        }
        let now = StdInstant::now();
        if self.last_click.is_some_and(|last| now.duration_since(last) < CLICK_INTERVAL) {
            return;
        }
        self.last_click = Some(now);
        self.bell = true;
    }

    /// Whether a terminal bell is due; resets the flag
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }
}
