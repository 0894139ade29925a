//! Interactive chat loop.
//!
//! The loop owns only view state (input box, picker, status line, scroll).
//! Conversation and account state live in the session controllers, which
//! are shared with the tasks spawned for sends and sign-in.

use std::error::Error;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tui_textarea::TextArea;

use crate::core::auth_session::AuthSession;
use crate::core::catalog::ModelDescriptor;
use crate::core::chat_session::ChatSession;
use crate::core::config::Config;
use crate::core::notice::{Notice, Notifier};
use crate::core::platform::{Platform, SignInOptions};
use crate::core::readiness::Readiness;
use crate::ui::picker::ModelPicker;
use crate::ui::renderer::{self, ChatView, SUGGESTED_PROMPTS};
use crate::ui::title::TitleInfo;

type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

const STATUS_TTL: Duration = Duration::from_secs(4);
const PAGE_SCROLL: u16 = 5;

/// What the loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    None,
    Quit,
    Send(String),
    Clear,
    OpenPicker,
    SelectModel(String),
    ToggleAuth,
}

/// Facts about the sessions that key handling depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext {
    pub log_is_empty: bool,
    pub is_loading: bool,
}

pub struct UiState {
    pub textarea: TextArea<'static>,
    pub picker: Option<ModelPicker>,
    pub status: Option<(Notice, Instant)>,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub pulse_start: Instant,
    next_suggestion: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            textarea: TextArea::default(),
            picker: None,
            status: None,
            scroll_offset: 0,
            auto_scroll: true,
            pulse_start: Instant::now(),
            next_suggestion: 0,
        }
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn open_picker(&mut self, models: Vec<ModelDescriptor>, current: &str) {
        self.picker = Some(ModelPicker::new(models, current));
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.status = Some((notice, Instant::now()));
    }

    /// Drop the status line once it has been visible long enough.
    pub fn expire_status(&mut self, now: Instant) {
        if self
            .status
            .as_ref()
            .is_some_and(|(_, shown)| now.duration_since(*shown) >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    /// Keep the scroll offset in range; reaching the bottom re-enables
    /// follow mode.
    pub fn clamp_scroll(&mut self, max_offset: u16) {
        if self.auto_scroll || self.scroll_offset >= max_offset {
            self.scroll_offset = max_offset;
            self.auto_scroll = true;
        }
    }

    fn scroll_up(&mut self, rows: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
    }

    fn scroll_down(&mut self, rows: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(rows);
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: KeyContext) -> UiAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return UiAction::Quit;
        }
        if self.picker.is_some() {
            return self.handle_picker_key(key);
        }

        match key.code {
            KeyCode::Char('l') if ctrl => {
                self.scroll_offset = 0;
                self.auto_scroll = true;
                UiAction::Clear
            }
            KeyCode::Char('p') if ctrl => UiAction::OpenPicker,
            KeyCode::Char('s') if ctrl => UiAction::ToggleAuth,
            KeyCode::Tab if ctx.log_is_empty => {
                let prompt = SUGGESTED_PROMPTS[self.next_suggestion % SUGGESTED_PROMPTS.len()];
                self.next_suggestion += 1;
                self.textarea = TextArea::from([prompt]);
                self.textarea.move_cursor(tui_textarea::CursorMove::End);
                UiAction::None
            }
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
            {
                self.textarea.insert_newline();
                UiAction::None
            }
            KeyCode::Enter => {
                let text = self.input_text();
                // Keep the draft while a reply streams; the send would be dropped.
                if text.trim().is_empty() || ctx.is_loading {
                    return UiAction::None;
                }
                self.textarea = TextArea::default();
                self.auto_scroll = true;
                UiAction::Send(text)
            }
            KeyCode::PageUp => {
                self.scroll_up(PAGE_SCROLL);
                UiAction::None
            }
            KeyCode::PageDown => {
                self.scroll_down(PAGE_SCROLL);
                UiAction::None
            }
            KeyCode::Up if self.textarea.lines().len() <= 1 => {
                self.scroll_up(1);
                UiAction::None
            }
            KeyCode::Down if self.textarea.lines().len() <= 1 => {
                self.scroll_down(1);
                UiAction::None
            }
            _ => {
                self.textarea.input(tui_textarea::Input::from(key));
                UiAction::None
            }
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) -> UiAction {
        let Some(picker) = self.picker.as_mut() else {
            return UiAction::None;
        };
        match key.code {
            KeyCode::Esc => {
                self.picker = None;
                UiAction::None
            }
            KeyCode::Enter => {
                let chosen = picker.selected_id();
                self.picker = None;
                chosen.map(UiAction::SelectModel).unwrap_or(UiAction::None)
            }
            KeyCode::Up => {
                picker.move_up();
                UiAction::None
            }
            KeyCode::Down => {
                picker.move_down();
                UiAction::None
            }
            KeyCode::Backspace => {
                picker.pop_char();
                UiAction::None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                picker.push_char(c);
                UiAction::None
            }
            _ => UiAction::None,
        }
    }
}

fn setup_terminal() -> Result<ChatTerminal, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

pub async fn run_chat(
    platform: Arc<dyn Platform>,
    config: &Config,
    model: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let (notifier, notices) = Notifier::new();
    let chat = Arc::new(ChatSession::new(
        Arc::clone(&platform),
        notifier.clone(),
        config.chat_settings(model),
    ));
    let auth = Arc::new(AuthSession::new(
        platform,
        notifier.clone(),
        config.ready_policy(),
    ));

    spawn_initialize(Arc::clone(&chat), Arc::clone(&auth), notifier);

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, chat, auth, notices).await;
    restore_terminal(&mut terminal)?;
    result
}

fn spawn_initialize(chat: Arc<ChatSession>, auth: Arc<AuthSession>, notifier: Notifier) {
    tokio::spawn(async move {
        let (chat_ready, auth_ready) = tokio::join!(chat.initialize(), auth.initialize());
        match (chat_ready, auth_ready) {
            (Readiness::Ready, Readiness::Ready) => {
                info!(models = chat.models().len(), "platform ready");
            }
            (Readiness::Failed(err), _) | (_, Readiness::Failed(err)) => {
                notifier.error(format!("Platform not ready: {err}"));
            }
        }
    });
}

async fn event_loop(
    terminal: &mut ChatTerminal,
    chat: Arc<ChatSession>,
    auth: Arc<AuthSession>,
    mut notices: mpsc::UnboundedReceiver<Notice>,
) -> Result<(), Box<dyn Error>> {
    let mut ui = UiState::new();

    loop {
        while let Ok(notice) = notices.try_recv() {
            ui.show_notice(notice);
        }
        ui.expire_status(Instant::now());

        let snapshot = chat.snapshot();
        let descriptor = chat.selected_descriptor();
        let user = auth.user();

        terminal.draw(|f| {
            let [_, body, _, _] = renderer::layout(f.area(), &ui.textarea);
            let lines = renderer::build_display_lines(&snapshot.messages);
            ui.clamp_scroll(renderer::max_scroll_offset(&lines, body));

            let view = ChatView {
                snapshot: &snapshot,
                title: TitleInfo {
                    model: &descriptor,
                    username: user.as_ref().map(|u| u.username.as_str()),
                    chat_ready: snapshot.is_ready,
                    auth_ready: auth.is_auth_ready(),
                },
                textarea: &ui.textarea,
                picker: ui.picker.as_ref(),
                status: ui.status.as_ref().map(|(notice, _)| notice),
                scroll_offset: ui.scroll_offset,
                pulse_elapsed: ui.pulse_start.elapsed(),
            };
            renderer::ui(f, &view);
        })?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => ui.handle_key(
                key,
                KeyContext {
                    log_is_empty: snapshot.messages.is_empty(),
                    is_loading: snapshot.is_loading,
                },
            ),
            Event::Paste(text) => {
                if let Some(picker) = ui.picker.as_mut() {
                    text.chars()
                        .filter(|c| !c.is_control())
                        .for_each(|c| picker.push_char(c));
                } else {
                    ui.textarea.insert_str(text);
                }
                UiAction::None
            }
            _ => UiAction::None,
        };

        match action {
            UiAction::None => {}
            UiAction::Quit => {
                chat.clear_chat();
                return Ok(());
            }
            UiAction::Send(text) => {
                ui.pulse_start = Instant::now();
                let chat = Arc::clone(&chat);
                tokio::spawn(async move { chat.send_message(&text).await });
            }
            UiAction::Clear => chat.clear_chat(),
            UiAction::OpenPicker => ui.open_picker(chat.models(), &chat.selected_model()),
            UiAction::SelectModel(id) => {
                debug!(model = %id, "model selected");
                chat.set_selected_model(id);
            }
            UiAction::ToggleAuth => spawn_toggle_auth(Arc::clone(&auth)),
        }
    }
}

fn spawn_toggle_auth(auth: Arc<AuthSession>) {
    tokio::spawn(async move {
        // Failures already reach the status line as notices.
        let result = if auth.is_signed_in() {
            auth.sign_out().await
        } else {
            auth.sign_in(SignInOptions {
                attempt_temp_user_creation: true,
                token: None,
            })
            .await
            .map(|_| ())
        };
        if let Err(err) = result {
            debug!(error = %err, "auth toggle failed");
        }
    });
}
