//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize, frame tick)
//! - SessionClient for the conversation
//! - DisplayState for rendering
//!
//! # Frame Loop
//!
//! Every frame the App:
//! 1. Converts terminal keys into [`Command`]s and executes them
//! 2. Ticks the session controller, draining channel events in order
//! 3. Copies the controller snapshot into DisplayState
//! 4. Feeds `visible`/`speaking` to the avatar and advances its animation
//! 5. Renders each region into its compositor layer

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{StatefulWidget, Widget};
use ratatui::Terminal;
use unicode_width::UnicodeWidthStr;

use magic_core::{ConnectionStatus, MagicConfig};

use crate::avatar::Avatar;
use crate::compositor::{Compositor, LayerId};
use crate::display::{BannerKind, DisplayState};
use crate::session_client::SessionClient;
use crate::theme::{
    DIM_GRAY, DISMISSAL_ORANGE, EMERALD, ERROR_RED, MAGIC_PURPLE, SPEAKING_AMBER, USER_GREEN,
};
use crate::widgets::{Orb, TranscriptState, TranscriptView};

/// Frame tick
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Rows reserved for banners under the orb
const BANNER_HEIGHT: u16 = 2;

/// Quick goodbye messages, printed after the terminal is restored
const QUICK_GOODBYES: &[&str] = &[
    "The Magic Man vanishes in a puff of smoke.",
    "Abracadabra, you're gone!",
    "Until next time, seeker.",
    "The crystal ball goes dark.",
    "Poof!",
    "He saw that coming.",
    "Mischief managed.",
];

/// What a key press asks the app to do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Nothing beyond local UI state
    None,
    /// Press the orb while idle
    StartSession,
    /// Press the orb while a conversation runs
    EndSession,
    /// Send a typed turn
    SendText(String),
    /// Clear the error banner
    DismissError,
    /// Leave the app (ending any session first)
    Quit,
}

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// Goodbye message to show on exit
    goodbye_message: Option<String>,

    // === Session Integration ===
    /// Owns the session controller
    client: SessionClient,
    /// Display state derived from controller snapshots
    display: DisplayState,

    // === UI Components ===
    /// The layered compositor
    compositor: Compositor,
    /// The animated character
    avatar: Avatar,
    /// Layer assignments
    layers: AppLayers,

    // === Input State ===
    /// Text prompt buffer, when open
    prompt: Option<String>,
    /// Transcript scrolling
    transcript: TranscriptState,

    // === Misc State ===
    /// Last frame time (for animations)
    last_frame: Instant,
    /// Developer overlay
    dev_mode: bool,
}

/// Layer IDs for UI regions
struct AppLayers {
    header: LayerId,
    stage: LayerId,
    orb: LayerId,
    banner: LayerId,
    transcript: LayerId,
    footer: LayerId,
    dev: LayerId,
}

/// Screen regions for a terminal size
struct Regions {
    header: Rect,
    stage: Rect,
    orb: Rect,
    banner: Rect,
    transcript: Rect,
    footer: Rect,
    dev: Rect,
}

impl Regions {
    fn new(area: Rect, stage_height: u16) -> Self {
        let width = area.width;
        let header = Rect::new(0, 0, width, 1.min(area.height));

        let mut y = header.height;
        let mut take = |want: u16| {
            let rows = want.min(area.height.saturating_sub(y + 1));
            let rect = Rect::new(0, y, width, rows);
            y += rows;
            rect
        };

        let stage = take(stage_height);
        let orb = take(Orb::HEIGHT);
        let banner = take(BANNER_HEIGHT);
        let transcript = take(u16::MAX);

        let footer = Rect::new(0, area.height.saturating_sub(1), width, 1.min(area.height));
        let dev_width = 34.min(width);
        let dev = Rect::new(width - dev_width, header.height, dev_width, 5.min(stage.height));

        Self {
            header,
            stage,
            orb,
            banner,
            transcript,
            footer,
            dev,
        }
    }
}

impl App {
    /// Create a new App for a terminal of `size` (width, height)
    pub fn new(config: MagicConfig, size: (u16, u16)) -> Self {
        let area = Rect::new(0, 0, size.0, size.1);
        let avatar = Avatar::new(config.animation.clone());
        let regions = Regions::new(area, Self::stage_height(&avatar));

        let mut compositor = Compositor::new(area);
        let layers = AppLayers {
            header: compositor.create_layer(regions.header, 10),
            stage: compositor.create_layer(regions.stage, 0),
            orb: compositor.create_layer(regions.orb, 10),
            banner: compositor.create_layer(regions.banner, 20),
            transcript: compositor.create_layer(regions.transcript, 0),
            footer: compositor.create_layer(regions.footer, 10),
            dev: compositor.create_layer(regions.dev, 100),
        };
        compositor.set_visible(layers.dev, false);

        let client = SessionClient::new(config);
        tracing::info!(channel = client.channel_name(), "Magic Man ready");

        Self {
            running: true,
            goodbye_message: None,
            client,
            display: DisplayState::new(),
            compositor,
            avatar,
            layers,
            prompt: None,
            transcript: TranscriptState::default(),
            last_frame: Instant::now(),
            dev_mode: false,
        }
    }

    fn stage_height(avatar: &Avatar) -> u16 {
        avatar.bounds().1 + 2
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        // Async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so the visitor sees the orb
        self.render(terminal)?;

        while self.running {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            match self.handle_key(key) {
                                Command::StartSession => {
                                    self.start_cancellable(terminal, &mut event_stream).await?;
                                }
                                command => self.execute(command).await,
                            }
                        }
                        Some(Ok(Event::Resize(width, height))) => self.handle_resize(width, height),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "Terminal event error");
                        }
                        None => self.running = false,
                    }
                }

                _ = tokio::time::sleep(FRAME_INTERVAL) => {}
            }

            self.update();
            self.release_hung_up_channel().await;
            self.render(terminal)?;
        }

        Ok(())
    }

    /// Start a session while still listening for quit keys.
    ///
    /// Quitting mid-start drops the start, releases the channel and leaves.
    async fn start_cancellable<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut EventStream,
    ) -> anyhow::Result<()> {
        self.display.set_connecting(true);
        self.render(terminal)?;

        let quit = {
            let start = self.client.start();
            tokio::pin!(start);
            loop {
                tokio::select! {
                    result = &mut start => {
                        if let Err(err) = result {
                            tracing::debug!(error = %err, "Start did not complete");
                        }
                        break false;
                    }
                    maybe_event = events.next() => {
                        if let Some(Ok(Event::Key(key))) = maybe_event {
                            if key.kind == KeyEventKind::Press && is_quit_key(&key) {
                                break true;
                            }
                        }
                    }
                }
            }
        };

        self.display.set_connecting(false);
        if quit {
            self.client.abandon_start().await;
            self.execute(Command::Quit).await;
        }
        Ok(())
    }

    /// Map a key press to a command; local UI state changes happen here
    pub fn handle_key(&mut self, key: KeyEvent) -> Command {
        if let Some(prompt) = self.prompt.as_mut() {
            return match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.prompt = None;
                    Command::Quit
                }
                KeyCode::Enter => {
                    let text = std::mem::take(prompt);
                    self.prompt = None;
                    if text.trim().is_empty() {
                        Command::None
                    } else {
                        Command::SendText(text)
                    }
                }
                KeyCode::Esc => {
                    self.prompt = None;
                    Command::None
                }
                KeyCode::Backspace => {
                    prompt.pop();
                    Command::None
                }
                KeyCode::Char(c) => {
                    prompt.push(c);
                    Command::None
                }
                _ => Command::None,
            };
        }

        if is_quit_key(&key) {
            return Command::Quit;
        }

        match key.code {
            // The orb
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.display.active {
                    Command::EndSession
                } else if self.display.connecting {
                    Command::None
                } else {
                    Command::StartSession
                }
            }

            KeyCode::Char('t') if self.display.active => {
                self.prompt = Some(String::new());
                Command::None
            }

            KeyCode::Char('x') if self.display.error.is_some() => Command::DismissError,

            // Transcript scrolling
            KeyCode::PageUp => {
                let page = self.page_size();
                self.transcript.scroll_up(page);
                Command::None
            }
            KeyCode::PageDown => {
                let page = self.page_size();
                self.transcript.scroll_down(page);
                Command::None
            }

            KeyCode::F(12) => {
                self.dev_mode = !self.dev_mode;
                Command::None
            }

            _ => Command::None,
        }
    }

    fn page_size(&self) -> usize {
        self.compositor
            .bounds(self.layers.transcript)
            .map_or(1, |rect| usize::from(rect.height / 2).max(1))
    }

    /// Execute a command against the session
    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::None => {}
            Command::StartSession => {
                if let Err(err) = self.client.start().await {
                    tracing::debug!(error = %err, "Start did not complete");
                }
            }
            Command::EndSession => {
                if let Err(err) = self.client.end().await {
                    tracing::debug!(error = %err, "End reported an error");
                }
            }
            Command::SendText(text) => {
                if let Err(err) = self.client.send_text(&text).await {
                    tracing::debug!(error = %err, "Typed turn not sent");
                }
                self.transcript.scroll_to_bottom();
            }
            Command::DismissError => self.client.clear_error(),
            Command::Quit => {
                if self.client.is_active() {
                    if let Err(err) = self.client.end().await {
                        tracing::debug!(error = %err, "End on quit reported an error");
                    }
                }
                self.avatar.reset();
                self.generate_goodbye();
                self.running = false;
            }
        }
        self.sync_display();
    }

    /// Handle terminal resize
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        let area = Rect::new(0, 0, width, height);
        self.compositor.resize(area);

        let regions = Regions::new(area, Self::stage_height(&self.avatar));
        self.compositor.set_bounds(self.layers.header, regions.header);
        self.compositor.set_bounds(self.layers.stage, regions.stage);
        self.compositor.set_bounds(self.layers.orb, regions.orb);
        self.compositor.set_bounds(self.layers.banner, regions.banner);
        self.compositor
            .set_bounds(self.layers.transcript, regions.transcript);
        self.compositor.set_bounds(self.layers.footer, regions.footer);
        self.compositor.set_bounds(self.layers.dev, regions.dev);
    }

    /// Update session state and animations
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;

        self.client.tick();
        self.sync_display();

        self.avatar.sync(self.display.visible, self.display.speaking);
        self.avatar.update(delta);

        if !self.display.active {
            self.prompt = None;
        }

        self.compositor
            .set_visible(self.layers.banner, !self.display.banners().is_empty());
        self.compositor.set_visible(self.layers.dev, self.dev_mode);
    }

    /// Close the channel once Magic Man has hung up
    pub async fn release_hung_up_channel(&mut self) {
        if self.client.needs_release() {
            self.client.release_channel().await;
        }
    }

    fn sync_display(&mut self) {
        self.display.apply_snapshot(&self.client.snapshot());
        self.display.set_transcript(self.client.transcript());
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the UI
    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        self.render_header();
        self.render_stage();
        self.render_orb();
        self.render_banners();
        self.render_transcript();
        self.render_footer();
        self.render_dev_overlay();

        terminal.draw(|frame| {
            let output = self.compositor.composite();
            let area = frame.area();
            let buf = frame.buffer_mut();

            for y in 0..area.height.min(output.area.height) {
                for x in 0..area.width.min(output.area.width) {
                    buf[(x, y)] = output[(x, y)].clone();
                }
            }
        })?;

        Ok(())
    }

    fn render_header(&mut self) {
        let Some(buf) = self.compositor.layer_buffer_mut(self.layers.header) else {
            return;
        };
        let area = buf.area;

        buf.set_string(
            area.x + 1,
            area.y,
            "✦ MAGIC MAN ✦",
            Style::default().fg(MAGIC_PURPLE).add_modifier(Modifier::BOLD),
        );

        let mut badges: Vec<(&str, Style)> = Vec::new();
        if self.display.speaking {
            badges.push(("[SPEAKING]", Style::default().fg(SPEAKING_AMBER)));
        }
        let status_style = match self.display.status {
            ConnectionStatus::Connected => Style::default().fg(EMERALD),
            ConnectionStatus::Disconnected => Style::default().fg(DIM_GRAY),
        };
        let status = format!("[{}]", self.display.status.label());
        badges.push((status.as_str(), status_style));

        let mut x = area.width.saturating_sub(1);
        for (text, style) in badges.iter().rev() {
            let width = u16::try_from(text.width()).unwrap_or(0);
            x = x.saturating_sub(width);
            buf.set_string(x, area.y, text, *style);
            x = x.saturating_sub(1);
        }
    }

    fn render_stage(&mut self) {
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.stage) {
            self.avatar.render(buf);
        }
    }

    fn render_orb(&mut self) {
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.orb) {
            let area = buf.area;
            Orb::new(self.display.orb_state()).render(area, buf);
        }
    }

    fn render_banners(&mut self) {
        let banners = self.display.banners();
        let Some(buf) = self.compositor.layer_buffer_mut(self.layers.banner) else {
            return;
        };
        let area = buf.area;

        for (i, banner) in banners.iter().take(area.height as usize).enumerate() {
            let (text, style) = match banner.kind {
                BannerKind::Dismissal => (
                    format!("✦ {} ✦", banner.text),
                    Style::default()
                        .fg(DISMISSAL_ORANGE)
                        .add_modifier(Modifier::BOLD),
                ),
                BannerKind::Error(_) => (banner.text.clone(), Style::default().fg(ERROR_RED)),
            };
            let y = area.y + u16::try_from(i).unwrap_or(0);
            centered(buf, y, &text, style);
        }
    }

    fn render_transcript(&mut self) {
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.transcript) {
            let area = buf.area.inner(Margin::new(1, 0));
            TranscriptView::new(&self.display.lines)
                .agent_style(Style::default().fg(MAGIC_PURPLE))
                .user_style(Style::default().fg(USER_GREEN))
                .render(area, buf, &mut self.transcript);
        }
    }

    fn render_footer(&mut self) {
        let scroll_offset = self.transcript.scroll_offset;
        let Some(buf) = self.compositor.layer_buffer_mut(self.layers.footer) else {
            return;
        };
        let area = buf.area;

        if let Some(prompt) = &self.prompt {
            let line = format!(" Say: {prompt}_");
            buf.set_stringn(
                area.x,
                area.y,
                &line,
                area.width as usize,
                Style::default().fg(USER_GREEN),
            );
            return;
        }

        let mut help = String::from(" Space: orb");
        if self.display.active {
            help.push_str(" | t: type");
        }
        if self.display.error.is_some() {
            help.push_str(" | x: dismiss error");
        }
        help.push_str(" | PgUp/PgDn: scroll | Esc: quit");
        if scroll_offset > 0 {
            help.push_str(&format!(" [^{scroll_offset}]"));
        }
        if self.dev_mode {
            help.push_str(" [DEV]");
        }
        buf.set_stringn(
            area.x,
            area.y,
            &help,
            area.width as usize,
            Style::default().fg(DIM_GRAY),
        );
    }

    fn render_dev_overlay(&mut self) {
        if !self.dev_mode {
            return;
        }
        let phase = format!("phase: {:?}", self.avatar.phase());
        let frame = match self.avatar.current_frame() {
            Some(id) => format!("frame: {id:?}"),
            None => "frame: -".to_string(),
        };
        let generation = format!("generation: {}", self.display.generation);
        let channel = format!("channel: {}", self.client.channel_name());

        let Some(buf) = self.compositor.layer_buffer_mut(self.layers.dev) else {
            return;
        };
        let area = buf.area;
        let style = Style::default().fg(DIM_GRAY);
        for (i, line) in [phase, frame, generation, channel].iter().enumerate() {
            let y = area.y + u16::try_from(i).unwrap_or(0);
            if y >= area.y + area.height {
                break;
            }
            buf.set_stringn(area.x + 1, y, line, area.width as usize, style);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Generate a quick goodbye message
    fn generate_goodbye(&mut self) {
        let idx = rand::random::<usize>() % QUICK_GOODBYES.len();
        self.goodbye_message = Some(QUICK_GOODBYES[idx].to_string());
    }

    /// Get the goodbye message for display after TUI closes
    pub fn goodbye(&self) -> Option<&str> {
        self.goodbye_message.as_deref()
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current display state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Text prompt contents, when open
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// The animated character
    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }
}

fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn centered(buf: &mut Buffer, y: u16, text: &str, style: Style) {
    let area = buf.area;
    let width = u16::try_from(text.width()).unwrap_or(area.width);
    let x = area.x + area.width.saturating_sub(width) / 2;
    buf.set_stringn(x, y, text, area.width as usize, style);
}
