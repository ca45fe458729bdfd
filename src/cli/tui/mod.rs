pub mod markdown;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use super::sanitize::for_terminal;
use crate::client::ChatReply;
use crate::core::attachment::Attachment;
use crate::core::error::ChatError;
use crate::render::{Entry, ProseStyle, RenderFragment, Transcript, TranscriptView};
use crate::session::PendingRequest;

// ─── Colors ──────────────────────────────────────────

const BG: Color = Color::Rgb(15, 15, 25);
const SURFACE: Color = Color::Rgb(22, 22, 36);
const BORDER: Color = Color::Rgb(50, 50, 70);
const BORDER_ACTIVE: Color = Color::Rgb(100, 60, 200);
const TEXT: Color = Color::Rgb(210, 210, 225);
const DIM: Color = Color::Rgb(90, 90, 110);
const ACCENT: Color = Color::Rgb(140, 80, 255);
const GREEN: Color = Color::Rgb(80, 200, 120);
const YELLOW: Color = Color::Rgb(230, 190, 60);
const CYAN: Color = Color::Rgb(80, 200, 220);
const RED: Color = Color::Rgb(230, 80, 80);

const THINKING: &str = "AI is thinking...";

// ─── App State ───────────────────────────────────────

/// A dispatched request handed back to the event loop with its outcome.
type Settled = (PendingRequest, Result<ChatReply, ChatError>);

struct TuiApp {
    app: super::App,
    transcript: Transcript,
    input: String,
    input_cursor: usize,
    scroll_offset: u16,
    total_content_height: u16,
    status_message: String,
    reply_tx: mpsc::Sender<Settled>,
    reply_rx: mpsc::Receiver<Settled>,
    show_help: bool,
    should_quit: bool,
    tick: u64,
}

impl TuiApp {
    fn new(app: super::App) -> Self {
        let (reply_tx, reply_rx) = mpsc::channel(4);
        Self {
            app,
            transcript: Transcript::new(),
            input: String::new(),
            input_cursor: 0,
            scroll_offset: 0,
            total_content_height: 0,
            status_message: "Ready".into(),
            reply_tx,
            reply_rx,
            show_help: false,
            should_quit: false,
            tick: 0,
        }
    }

    fn is_busy(&self) -> bool {
        self.app.controller.is_busy()
    }

    fn locked(&self) -> bool {
        !self.app.controller.input_enabled()
    }

    /// Slash commands stay typeable after the conversation is locked.
    fn accepts_char(&self, c: char) -> bool {
        if self.is_busy() {
            return false;
        }
        !self.locked() || self.input.starts_with('/') || (self.input.is_empty() && c == '/')
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.input_cursor = 0;
    }

    fn scroll_up(&mut self, lines: u16) {
        self.transcript.release_scroll();
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
        if self.scroll_offset >= self.total_content_height {
            self.transcript.scroll_to_latest();
        }
    }
}

// ─── Entry Point ─────────────────────────────────────

pub async fn run(app: super::App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut tui_app = TuiApp::new(app);
    let result = run_event_loop(&mut terminal, &mut tui_app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

/// Replay history, then consult the status gate.
async fn startup(app: &mut TuiApp) {
    match app.app.controller.load_history(&mut app.transcript).await {
        Ok(_) => app.status_message = "Ready".into(),
        Err(ChatError::NotAuthenticated) => {
            app.status_message = "Not logged in: run graphchat --set-token <TOKEN>".into();
        }
        Err(e) => {
            tracing::warn!("failed to load history: {e}");
            app.status_message = "Could not load history".into();
        }
    }

    app.app.controller.check_status().await;
    if app.locked() {
        app.status_message = "This conversation has concluded".into();
    }
}

// ─── Event Loop ──────────────────────────────────────

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
) -> Result<()> {
    app.status_message = "Loading conversation...".into();
    terminal.draw(|f| ui(f, app))?;
    startup(app).await;

    let mut event_reader = EventStream::new();
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    loop {
        terminal.draw(|f| ui(f, app))?;
        if app.should_quit {
            return Ok(());
        }

        tokio::select! {
            biased;

            Some((pending, outcome)) = app.reply_rx.recv() => {
                handle_outcome(app, pending, outcome);
            }

            Some(Ok(event)) = event_reader.next() => {
                if let Event::Key(key) = event {
                    handle_key_event(app, key);
                }
            }

            _ = tick_interval.tick() => {
                app.tick += 1;
            }
        }
    }
}

fn handle_outcome(app: &mut TuiApp, pending: PendingRequest, outcome: Result<ChatReply, ChatError>) {
    let failed = outcome.is_err();
    app.app
        .controller
        .finish(&mut app.transcript, pending, outcome);
    app.status_message = if app.locked() {
        "This conversation has concluded".into()
    } else if failed {
        "Error".into()
    } else {
        "Ready".into()
    };
}

// ─── Key Handling ────────────────────────────────────

fn handle_key_event(app: &mut TuiApp, key: KeyEvent) {
    if app.show_help {
        app.show_help = false;
        return;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        (KeyCode::F(1), _) => {
            app.show_help = true;
        }
        (KeyCode::Enter, KeyModifiers::NONE) if !app.is_busy() => {
            let input = app.input.trim().to_string();
            if input.starts_with('/') {
                app.clear_input();
                handle_command(app, &input);
            } else if app.app.controller.can_submit(&input) {
                app.clear_input();
                submit_message(app, input);
            }
        }
        (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) if app.accepts_char(c) => {
            app.input.insert(app.input_cursor, c);
            app.input_cursor += c.len_utf8();
        }
        (KeyCode::Backspace, _) if !app.is_busy() && app.input_cursor > 0 => {
            let prev = app.input[..app.input_cursor].chars().last().map(|c| c.len_utf8()).unwrap_or(1);
            app.input_cursor -= prev;
            app.input.remove(app.input_cursor);
        }
        (KeyCode::Delete, _) if !app.is_busy() && app.input_cursor < app.input.len() => {
            app.input.remove(app.input_cursor);
        }
        (KeyCode::Left, _) if app.input_cursor > 0 => {
            let prev = app.input[..app.input_cursor].chars().last().map(|c| c.len_utf8()).unwrap_or(1);
            app.input_cursor -= prev;
        }
        (KeyCode::Right, _) if app.input_cursor < app.input.len() => {
            let next = app.input[app.input_cursor..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
            app.input_cursor += next;
        }
        (KeyCode::Home, _) | (KeyCode::Char('a'), KeyModifiers::CONTROL) => { app.input_cursor = 0; }
        (KeyCode::End, _) | (KeyCode::Char('e'), KeyModifiers::CONTROL) => { app.input_cursor = app.input.len(); }
        (KeyCode::Up, _) => app.scroll_up(3),
        (KeyCode::Down, _) => app.scroll_down(3),
        (KeyCode::PageUp, _) => app.scroll_up(20),
        (KeyCode::PageDown, _) => app.scroll_down(20),
        _ => {}
    }
}

// ─── Commands ────────────────────────────────────────

fn handle_command(app: &mut TuiApp, input: &str) {
    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (input, ""),
    };
    match cmd {
        "/help" | "/h" => app.show_help = true,
        "/exit" | "/quit" | "/q" => app.should_quit = true,
        "/attach" | "/a" => attach_file(app, arg),
        "/detach" => {
            app.app.controller.clear_selection();
            app.status_message = "Attachment removed".into();
        }
        "/logout" => match app.app.controller.logout() {
            Ok(()) => app.status_message = "Logged out".into(),
            Err(e) => {
                tracing::warn!("logout failed: {e}");
                app.status_message = format!("Logout failed: {e}");
            }
        },
        _ => app.status_message = format!("Unknown: {cmd}. F1 for help."),
    }
}

fn attach_file(app: &mut TuiApp, arg: &str) {
    if arg.is_empty() {
        app.status_message = "Usage: /attach <path>".into();
        return;
    }
    if !app.app.controller.uploads_enabled() {
        app.status_message = "File uploads are not available for this account".into();
        return;
    }
    match Attachment::from_path(Path::new(arg)) {
        Ok(attachment) => {
            let name = attachment.name.clone();
            if app.app.controller.select_attachment(attachment) {
                app.status_message = format!("Attached {name}");
            }
        }
        Err(e) => app.status_message = e.to_string(),
    }
}

// ─── Actions ─────────────────────────────────────────

fn submit_message(app: &mut TuiApp, input: String) {
    let Some(pending) = app.app.controller.begin(&mut app.transcript, &input, None) else {
        if app.app.controller.credentials().get().is_none() {
            app.status_message = "Not logged in".into();
        }
        return;
    };
    app.status_message = THINKING.into();

    let service = app.app.controller.service();
    let tx = app.reply_tx.clone();
    tokio::spawn(async move {
        let outcome = pending.dispatch(service.as_ref()).await;
        if tx.send((pending, outcome)).await.is_err() {
            tracing::debug!("reply arrived after the UI closed");
        }
    });
}

// ─── UI Rendering ────────────────────────────────────

fn ui(f: &mut Frame, app: &mut TuiApp) {
    let area = f.area();
    f.render_widget(Paragraph::new("").style(Style::default().bg(BG)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(5),    // Chat
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_chat(f, app, chunks[1]);
    render_input(f, app, chunks[2]);
    render_status(f, app, chunks[3]);

    if app.show_help {
        render_help(f, area);
    }
}

fn render_header(f: &mut Frame, app: &TuiApp, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" \u{25C6} ", Style::default().fg(ACCENT)),
        Span::styled(
            "graphchat",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  \u{2502}  ", Style::default().fg(BORDER)),
        Span::styled(app.app.config.base_url.clone(), Style::default().fg(CYAN)),
        Span::styled(
            format!("  \u{2502}  {} turns", app.transcript.turn_count()),
            Style::default().fg(DIM),
        ),
    ]);
    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(SURFACE)),
        area,
    );
}

fn avatar_line(icon: &str, name: &str, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {icon} "), Style::default().fg(color)),
        Span::styled(
            name.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn fragment_lines(fragment: &RenderFragment) -> Vec<Line<'static>> {
    match fragment {
        RenderFragment::Prose {
            style: ProseStyle::Plain,
            body,
        } => markdown::render_prose(&for_terminal(body), "    ", Style::default().fg(TEXT)),
        RenderFragment::Prose {
            style: ProseStyle::Reasoning,
            body,
        } => {
            let mut lines = vec![Line::from(Span::styled(
                format!("    {}", fragment.label()),
                Style::default().fg(DIM).add_modifier(Modifier::BOLD),
            ))];
            lines.extend(markdown::render_prose(
                &for_terminal(body),
                "    ",
                Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
            ));
            lines
        }
        RenderFragment::Code { body, .. } => {
            markdown::render_code(&for_terminal(fragment.label()), &for_terminal(body), "    ")
        }
        RenderFragment::Image { url, caption } => vec![
            Line::from(Span::styled(
                format!("    \u{25A3} {}", for_terminal(caption)),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("      {}", for_terminal(url)),
                Style::default().fg(CYAN).add_modifier(Modifier::UNDERLINED),
            )),
        ],
        RenderFragment::Greeting { body } => for_terminal(body)
            .lines()
            .map(|l| {
                Line::from(Span::styled(
                    format!("  {l}"),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ))
            })
            .collect(),
    }
}

fn entry_lines(entry: &Entry, tick: u64) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match entry {
        Entry::User { text, attachment } => {
            lines.push(Line::from(""));
            lines.push(avatar_line("\u{25B6}", "You", GREEN));
            if let Some(text) = text {
                for l in for_terminal(text).lines() {
                    lines.push(Line::from(Span::styled(
                        format!("    {l}"),
                        Style::default().fg(TEXT),
                    )));
                }
            }
            if let Some(name) = attachment {
                lines.push(Line::from(Span::styled(
                    format!("    \u{1F4CE} {}", for_terminal(name)),
                    Style::default().fg(YELLOW),
                )));
            }
        }
        Entry::Assistant {
            fragments,
            show_avatar,
        } => {
            lines.push(Line::from(""));
            if *show_avatar {
                lines.push(avatar_line("\u{2728}", "Assistant", ACCENT));
            }
            for fragment in fragments {
                lines.extend(fragment_lines(fragment));
            }
        }
        Entry::Placeholder(_) => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("  {} {THINKING}", markdown::spinner(tick)),
                Style::default().fg(YELLOW),
            )));
        }
    }
    lines
}

fn render_chat(f: &mut Frame, app: &mut TuiApp, area: Rect) {
    let lines: Vec<Line> = app
        .transcript
        .entries()
        .iter()
        .flat_map(|entry| entry_lines(entry, app.tick))
        .collect();

    let body = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    // Rows after wrapping to the width inside the borders
    let inner_width = area.width.saturating_sub(2);
    let total = u16::try_from(body.line_count(inner_width)).unwrap_or(u16::MAX);
    let visible = area.height.saturating_sub(2);
    app.total_content_height = total.saturating_sub(visible);
    if app.transcript.follows_latest() {
        app.scroll_offset = app.total_content_height;
    }
    app.scroll_offset = app.scroll_offset.min(app.total_content_height);

    let chat = body
        .scroll((app.scroll_offset, 0))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(BORDER)));
    f.render_widget(chat, area);

    if app.total_content_height > 0 {
        let sb = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_style(Style::default().fg(ACCENT))
            .track_style(Style::default().fg(BORDER));
        let mut state = ScrollbarState::new(app.total_content_height as usize)
            .position(app.scroll_offset as usize);
        f.render_stateful_widget(
            sb,
            area.inner(ratatui::layout::Margin { vertical: 1, horizontal: 0 }),
            &mut state,
        );
    }
}

fn render_input(f: &mut Frame, app: &TuiApp, area: Rect) {
    let editable = !app.is_busy() && (!app.locked() || app.input.starts_with('/'));
    let (border, text_style) = if editable {
        (BORDER_ACTIVE, Style::default().fg(TEXT))
    } else {
        (BORDER, Style::default().fg(DIM))
    };

    let mut title = if app.is_busy() {
        format!(" {} {THINKING} ", markdown::spinner(app.tick))
    } else if app.locked() {
        " Conversation concluded \u{2502} /quit to exit ".to_string()
    } else {
        " Message \u{2502} Enter send \u{2502} F1 help ".to_string()
    };
    if let Some(attachment) = app.app.controller.selected_attachment() {
        title.push_str(&format!("\u{2502} \u{1F4CE} {} ", for_terminal(&attachment.name)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title, Style::default().fg(ACCENT)));

    let input = Paragraph::new(app.input.as_str()).style(text_style).block(block);
    f.render_widget(input, area);

    if editable && !app.show_help {
        let cx = area.x + 1 + app.input[..app.input_cursor].chars().count() as u16;
        f.set_cursor_position((cx.min((area.x + area.width).saturating_sub(2)), area.y + 1));
    }
}

fn render_status(f: &mut Frame, app: &TuiApp, area: Rect) {
    let status_fg = if app.is_busy() {
        YELLOW
    } else if app.locked() || app.status_message == "Error" {
        RED
    } else {
        GREEN
    };
    let sep = Span::styled(" \u{2502} ", Style::default().fg(BORDER));

    let mut spans = vec![Span::styled(
        format!(" {} ", app.status_message),
        Style::default().fg(status_fg),
    )];
    if !app.app.controller.uploads_enabled() {
        spans.push(sep.clone());
        spans.push(Span::styled("uploads off", Style::default().fg(DIM)));
    }
    spans.push(sep);
    spans.push(Span::styled(
        "/attach <path>  /logout  F1 help  ^C quit",
        Style::default().fg(Color::Rgb(60, 60, 80)),
    ));
    f.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(SURFACE)),
        area,
    );
}

fn render_help(f: &mut Frame, area: Rect) {
    let rows = [
        ("Enter", "send message"),
        ("/attach <path>", "attach a file to the next message"),
        ("/detach", "drop the attached file"),
        ("/logout", "forget the stored token"),
        ("/quit", "exit"),
        ("\u{2191}\u{2193} PgUp PgDn", "scroll"),
    ];
    let mut lines = vec![Line::from("")];
    for (key, desc) in rows {
        lines.push(Line::from(vec![
            Span::styled(format!("  {key:<18}"), Style::default().fg(CYAN)),
            Span::styled(desc, Style::default().fg(TEXT)),
        ]));
    }

    let width = 60.min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(SURFACE))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(BORDER_ACTIVE))
                    .title(Span::styled(" Help ", Style::default().fg(ACCENT))),
            ),
        popup,
    );
}
