//! Interactive TUI for browsing a share and previewing media

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

use super::media_title::{MediaTitle, MediaTitleKind};
use super::screen::{ScreenView, ShareScreen};
use super::session::ShareSession;
use crate::media;
use crate::playback::Player;
use crate::share::{ConnectionStatus, FileListItem, FileShareClient, ShareCredentials};
use crate::utils::TuiModeGuard;

/// How long a notice stays in the status bar
const NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

/// Everything needed to open a screen for a path
pub struct BrowseDeps {
    /// Each screen visit gets its own client
    pub client_factory: Box<dyn Fn() -> Arc<dyn FileShareClient> + Send + Sync>,
    pub player: Arc<dyn Player>,
    pub settle_delay: Duration,
}

impl BrowseDeps {
    fn open_screen(&self, path: String, credentials: Option<ShareCredentials>) -> ShareScreen {
        let session = ShareSession::new((self.client_factory)(), self.settle_delay);
        ShareScreen::new(path, credentials, session, self.player.clone())
    }
}

/// Browser state
struct BrowserState {
    screen: ShareScreen,
    status_rx: watch::Receiver<ConnectionStatus>,
    files_rx: watch::Receiver<Vec<FileListItem>>,
    list_state: ListState,
    /// Search/filter mode
    search_mode: bool,
    status_message: String,
    /// When the status message was set (for auto-clear timeout)
    status_message_time: Option<Instant>,
    /// Whether the message came from an error
    status_is_error: bool,
    show_help: bool,
}

impl BrowserState {
    fn new(screen: ShareScreen) -> Self {
        let status_rx = screen.subscribe_status();
        let files_rx = screen.subscribe_files();
        Self {
            screen,
            status_rx,
            files_rx,
            list_state: ListState::default(),
            search_mode: false,
            status_message: String::new(),
            status_message_time: None,
            status_is_error: false,
            show_help: false,
        }
    }

    /// Replace the screen with one for a new path (a new visit)
    fn navigate(&mut self, deps: &BrowseDeps, path: String) {
        let credentials = self
            .screen
            .config()
            .and_then(|config| ShareCredentials::from_config(&config));
        debug!("Navigating to {}", path);

        // Old screen releases its session and playback as it drops
        self.screen = deps.open_screen(path, credentials);
        self.status_rx = self.screen.subscribe_status();
        self.files_rx = self.screen.subscribe_files();
        self.list_state.select(None);
        self.search_mode = false;
        self.screen.on_state_change();
    }

    fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status_message = message.into();
        self.status_message_time = Some(Instant::now());
        self.status_is_error = is_error;
    }

    fn clear_status(&mut self) {
        self.status_message.clear();
        self.status_message_time = None;
        self.status_is_error = false;
    }

    fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time
            && time.elapsed() > NOTICE_TIMEOUT
        {
            self.clear_status();
        }
    }

    /// Move pending notices from the screen into the status bar
    fn drain_notices(&mut self) {
        if let Some(latest) = self.screen.take_notices().pop() {
            self.set_status(latest.to_string(), true);
        }
    }

    fn selected_item(&self) -> Option<FileListItem> {
        let idx = self.list_state.selected()?;
        self.screen.filtered().get(idx).cloned()
    }

    /// Keep the selection inside the filtered list
    fn clamp_selection(&mut self) {
        let len = self.screen.filtered().len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
    }

    fn move_up(&mut self) {
        let len = self.screen.filtered().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn move_down(&mut self) {
        let len = self.screen.filtered().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    async fn focus_selected(&mut self) {
        if let Some(item) = self.selected_item() {
            self.screen.on_focus(&item).await;
        }
    }
}

/// Run the interactive browser until the user quits
pub async fn run_browser(path: String, credentials: Option<ShareCredentials>, deps: BrowseDeps) -> Result<()> {
    // Suppress stderr logging while the browser owns the terminal
    let _tui_mode = TuiModeGuard::enable();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = BrowserState::new(deps.open_screen(path, credentials));
    state.screen.on_state_change();

    let result = run_browser_loop(&mut terminal, &mut state, &deps).await;

    state.screen.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

async fn run_browser_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut BrowserState,
    deps: &BrowseDeps,
) -> Result<()> {
    loop {
        // React to session updates published since the last frame
        if state.status_rx.has_changed().unwrap_or(false) {
            let status = state.status_rx.borrow_and_update().clone();
            let first_load = state.screen.is_first_load();
            state.screen.on_state_change();
            if status == ConnectionStatus::FilesLoaded {
                // A refresh keeps the selection where it was
                if first_load {
                    state.list_state.select(None);
                }
                state.screen.refresh_filter();
                state.clamp_selection();
                state.focus_selected().await;
            }
        }
        if state.files_rx.has_changed().unwrap_or(false) {
            state.files_rx.borrow_and_update();
            state.screen.refresh_filter();
            state.clamp_selection();
        }

        state.drain_notices();
        state.check_status_timeout();

        terminal.draw(|f| draw_ui(f, state))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            // Handle help overlay first
            if state.show_help {
                state.show_help = false;
                continue;
            }

            if state.search_mode {
                let mut query = state.screen.query().to_string();
                match key.code {
                    KeyCode::Esc => {
                        state.search_mode = false;
                        query.clear();
                    }
                    KeyCode::Enter => {
                        state.search_mode = false;
                    }
                    KeyCode::Backspace => {
                        query.pop();
                    }
                    KeyCode::Char(c) => {
                        query.push(c);
                    }
                    _ => {}
                }
                if query != state.screen.query() {
                    state.screen.set_query(query);
                    state.list_state.select(None);
                    state.clamp_selection();
                    state.focus_selected().await;
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Esc => {
                    if !state.screen.query().is_empty() {
                        state.screen.set_query("");
                        state.clamp_selection();
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    state.move_up();
                    state.focus_selected().await;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    state.move_down();
                    state.focus_selected().await;
                }
                KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                    if let Some(item) = state.selected_item() {
                        if item.is_directory {
                            state.navigate(deps, item.file_path);
                        } else if media::classify(&item.file_name).is_none() {
                            state.set_status(format!("{} is not a playable file", item.file_name), false);
                        }
                    }
                }
                KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                    match state.screen.config().and_then(|c| c.parent()) {
                        Some(parent) => state.navigate(deps, parent.to_uri()),
                        None => state.set_status("Already at the share root", false),
                    }
                }
                KeyCode::Char('r') => {
                    if matches!(state.screen.status(), ConnectionStatus::Error { .. }) {
                        state.screen.retry();
                    } else {
                        state.screen.refresh();
                    }
                }
                KeyCode::Char('/') => {
                    if state.screen.view() == ScreenView::Browser {
                        state.search_mode = true;
                    }
                }
                KeyCode::Char('?') => {
                    state.show_help = !state.show_help;
                }
                _ => {}
            }
        }
    }
}

fn draw_ui(f: &mut Frame, state: &BrowserState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(3), // Footer/help
        ])
        .split(f.area());

    // Header
    let location = state
        .screen
        .config()
        .map(|c| c.to_uri())
        .unwrap_or_else(|| state.screen.path().to_string());
    let header = Paragraph::new(format!("{}  [{}]", location, state.screen.status().label()))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    match state.screen.view() {
        ScreenView::Connecting => draw_message(f, chunks[1], "Connecting to SMB server...", Color::White),
        ScreenView::EmptyDirectory => draw_message(f, chunks[1], "This directory is empty", Color::White),
        ScreenView::Loading => draw_message(f, chunks[1], "Loading SMB files...", Color::White),
        ScreenView::Disconnected => draw_message(f, chunks[1], "Not connected to an SMB server", Color::White),
        ScreenView::Error { message } => {
            draw_message(f, chunks[1], &format!("Failed to load: {}\n\nPress r to retry", message), Color::Red)
        }
        ScreenView::Browser => draw_browser(f, chunks[1], state),
    }

    // Footer
    let help_text = if state.search_mode {
        "Type to filter | Enter: keep filter | Esc: clear"
    } else {
        "↑↓/jk: Move | Enter: Open | Backspace: Up | /: Search | r: Retry/Refresh | ?: Help | q: Quit"
    };
    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, chunks[2]);

    if state.show_help {
        draw_help(f);
    }

    // Status message overlay
    if !state.status_message.is_empty() {
        let area = Rect {
            x: chunks[2].x,
            y: chunks[2].y,
            width: chunks[2].width,
            height: 1,
        };
        let color = if state.status_is_error { Color::Red } else { Color::Yellow };
        let status = Paragraph::new(state.status_message.as_str())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD));
        f.render_widget(ratatui::widgets::Clear, area);
        f.render_widget(status, area);
    }
}

fn draw_message(f: &mut Frame, area: Rect, message: &str, color: Color) {
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, centered_rect(80, 4, area));
}

fn draw_browser(f: &mut Frame, area: Rect, state: &BrowserState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    if state.screen.no_search_results() {
        draw_message(f, columns[0], "No search results", Color::White);
    } else {
        let items: Vec<ListItem> = state
            .screen
            .filtered()
            .iter()
            .map(|file| {
                let (icon, style) = if file.is_directory {
                    ("▸ ", Style::default().fg(Color::Blue))
                } else {
                    match media::classify(&file.file_name) {
                        Some(media::MediaKind::Video) => ("▶ ", Style::default().fg(Color::Green)),
                        Some(media::MediaKind::Audio) => ("♪ ", Style::default().fg(Color::Magenta)),
                        None => ("  ", Style::default()),
                    }
                };
                ListItem::new(Line::styled(format!("{}{}", icon, file.file_name), style))
            })
            .collect();

        let title = format!("{} entries", state.screen.filtered().len());
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, columns[0], &mut state.list_state.clone());
    }

    draw_detail(f, columns[1], state);
}

fn draw_detail(f: &mut Frame, area: Rect, state: &BrowserState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let search_text = if state.search_mode {
        format!("{}█", state.screen.query())
    } else if state.screen.query().is_empty() {
        "Press / to search".to_string()
    } else {
        state.screen.query().to_string()
    };
    let search_style = if state.search_mode {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let search = Paragraph::new(search_text)
        .style(search_style)
        .block(Block::default().title("Search").borders(Borders::ALL));
    f.render_widget(search, rows[0]);

    let focus = state.screen.focus();
    let mut lines: Vec<Line> = Vec::new();

    if let Some(name) = &focus.focused_file_name {
        let icon = if focus.focused_is_dir {
            "[ FOLDER ]"
        } else {
            match media::classify(name) {
                Some(media::MediaKind::Video) => "[ VIDEO ]",
                Some(media::MediaKind::Audio) => "[ AUDIO ]",
                None => "[ FILE ]",
            }
        };
        lines.push(Line::styled(icon, Style::default().fg(Color::Cyan)));
        lines.push(Line::from(""));

        let secondary = match state.screen.playing() {
            Some(kind) => format!("{} preview", kind.label()),
            None => String::new(),
        };
        let location = state
            .screen
            .config()
            .map(|c| format!("{}/{}", c.server, c.share))
            .unwrap_or_default();
        let kind = MediaTitleKind::for_entry(name, state.screen.playing().is_some());
        lines.extend(
            MediaTitle::new(Some(name.clone()), secondary, location)
                .with_kind(kind)
                .lines(),
        );

        if let Some(item) = state.screen.filtered().iter().find(|entry| &entry.file_name == name) {
            lines.push(Line::from(""));
            if let Some(size) = item.size {
                lines.push(Line::from(format!("Size: {:.1} MB", size as f64 / 1_048_576.0)));
            }
            if let Some(modified) = item.modified {
                lines.push(Line::from(format!("Modified: {}", modified.format("%Y-%m-%d %H:%M"))));
            }
        }
    } else {
        lines.push(Line::styled("Nothing selected", Style::default().fg(Color::DarkGray)));
    }

    let detail = Paragraph::new(lines)
        .block(Block::default().title("Details").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(detail, rows[1]);
}

fn draw_help(f: &mut Frame) {
    let help_lines = vec![
        Line::styled("Keys", Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("↑/k ↓/j    Move focus (media previews start on focus)"),
        Line::from("Enter/l    Open folder"),
        Line::from("Backspace  Parent folder"),
        Line::from("/          Search this folder"),
        Line::from("Esc        Clear search"),
        Line::from("r          Retry after an error / refresh"),
        Line::from("q          Quit"),
    ];
    let area = centered_rect(60, 13, f.area());
    let help_popup = Paragraph::new(help_lines)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help_popup, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::fakes::{FakeClient, FakePlayer};
    use ratatui::backend::TestBackend;

    fn deps() -> BrowseDeps {
        BrowseDeps {
            client_factory: Box::new(|| Arc::new(FakeClient::movies()) as Arc<dyn FileShareClient>),
            player: Arc::new(FakePlayer::default()),
            settle_delay: Duration::ZERO,
        }
    }

    async fn loaded_state(deps: &BrowseDeps) -> BrowserState {
        let mut state = BrowserState::new(deps.open_screen("smb://user:pw@host/share/movies".to_string(), None));
        loop {
            state.status_rx.borrow_and_update();
            state.screen.on_state_change();
            state.screen.wait_idle().await;
            if !state.status_rx.has_changed().unwrap() {
                break;
            }
        }
        state.screen.refresh_filter();
        state.clamp_selection();
        state
    }

    fn render(state: &BrowserState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(160, 24)).unwrap();
        terminal.draw(|f| draw_ui(f, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_renders_listing_and_detail() {
        let deps = deps();
        let mut state = loaded_state(&deps).await;
        assert_eq!(state.screen.view(), ScreenView::Browser);

        state.focus_selected().await;
        let screen = render(&state);
        assert!(screen.contains("a.mp4"));
        assert!(screen.contains("sub"));
        assert!(screen.contains("[ VIDEO ]"));
        assert!(screen.contains("LIVE"));
        assert!(screen.contains("Video preview • host/share"));
    }

    #[tokio::test]
    async fn test_navigation_into_directory_and_back() {
        let deps = deps();
        let mut state = loaded_state(&deps).await;

        state.move_down();
        let sub = state.selected_item().unwrap();
        assert!(sub.is_directory);

        state.navigate(&deps, sub.file_path.clone());
        state.screen.wait_idle().await;
        let config = state.screen.config().unwrap();
        assert_eq!(config.path, "movies/sub");
        // Password carried over from the first visit
        assert_eq!(config.password, "pw");

        let parent = config.parent().unwrap();
        state.navigate(&deps, parent.to_uri());
        assert_eq!(state.screen.config().unwrap().path, "movies");
    }

    #[tokio::test]
    async fn test_move_wraps() {
        let deps = deps();
        let mut state = loaded_state(&deps).await;

        assert_eq!(state.list_state.selected(), Some(0));
        state.move_up();
        assert_eq!(state.list_state.selected(), Some(1));
        state.move_down();
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_error_view_shows_message() {
        let deps = BrowseDeps {
            client_factory: Box::new(|| Arc::new(FakeClient::failing_connect("auth failed")) as Arc<dyn FileShareClient>),
            player: Arc::new(FakePlayer::default()),
            settle_delay: Duration::ZERO,
        };
        let mut state = loaded_state(&deps).await;
        state.drain_notices();

        let screen = render(&state);
        assert!(screen.contains("Failed to load: auth failed"));
        assert!(state.status_is_error);
        assert!(state.status_message.contains("auth failed"));
    }
}
