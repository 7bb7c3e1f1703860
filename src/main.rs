use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use faction_watch::config::AppConfig;
use faction_watch::feed::{self, FeedConfig};
use faction_watch::state::{AppState, Delta, FetchGate, Phase, ProviderCommand, apply_delta};
use faction_watch::throttle::FetchThrottle;
use faction_watch::torn_api::{FetchStrategy, TornApi};
use faction_watch::view::{
    self, Breakpoint, RowView, TABLE_HEADERS, ViewportClass, ViewportClassifier,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    classifier: Box<dyn ViewportClassifier>,
    strategy: FetchStrategy,
}

impl App {
    fn new(
        cfg: &AppConfig,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
        classifier: Box<dyn ViewportClassifier>,
    ) -> Self {
        let mut state = AppState::new();
        state.api_key = cfg.api_key.clone().unwrap_or_default();
        state.stats_filter = cfg.stats_filter.clone();
        state.preferred_list = cfg.default_list.clone();
        state.throttle = FetchThrottle::new(cfg.cooldown);
        Self {
            state,
            should_quit: false,
            cmd_tx,
            classifier,
            strategy: cfg.strategy,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.key_input.is_some() {
            self.on_key_input(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('f') | KeyCode::Enter => self.request_fetch(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.state.cycle_list_next(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => self.state.cycle_list_prev(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('a') => self.attack_selected(),
            KeyCode::Char('p') => self.profile_selected(),
            KeyCode::Char('r') => self.request_lists(true),
            KeyCode::Char('K') => self.state.key_input = Some(String::new()),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn on_key_input(&mut self, key: KeyEvent) {
        let Some(buffer) = self.state.key_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter => {
                let entered = buffer.trim().to_string();
                self.state.key_input = None;
                if !entered.is_empty() {
                    self.state.api_key = entered;
                    self.state.push_log("[INFO] API key updated");
                }
            }
            KeyCode::Esc => self.state.key_input = None,
            _ => {}
        }
    }

    fn request_lists(&mut self, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            return;
        };
        if tx.send(ProviderCommand::LoadLists).is_err() {
            self.state.push_log("[WARN] List request failed");
        } else if announce {
            self.state.push_log("[INFO] Reloading lists");
        }
    }

    fn request_fetch(&mut self) {
        match self.state.begin_fetch(Instant::now()) {
            FetchGate::Start(cmd) => {
                let sent = self.cmd_tx.as_ref().is_some_and(|tx| tx.send(cmd).is_ok());
                if !sent {
                    let cycle = self.state.cycle;
                    apply_delta(
                        &mut self.state,
                        Delta::FetchFailed {
                            cycle,
                            message: "status provider unavailable".to_string(),
                        },
                    );
                }
            }
            FetchGate::MissingKey => {
                self.state.push_log("[WARN] Please enter an API key");
                self.state.key_input = Some(String::new());
            }
            FetchGate::NoList => {}
            FetchGate::Throttled { remaining_secs } => {
                self.state
                    .push_log(format!("[INFO] Fetch available in {remaining_secs}s"));
            }
        }
    }

    fn attack_selected(&mut self) {
        let Some(live) = self.state.selected_row() else {
            return;
        };
        let status = live.status.text();
        let link = view::attack_link(live.row.record.id, &status);
        let msg = if link.enabled {
            format!("[INFO] Attack {}: {}", live.row.name, link.url)
        } else {
            format!("[INFO] {} cannot be attacked: {status}", live.row.name)
        };
        self.state.push_log(msg);
    }

    fn profile_selected(&mut self) {
        let Some(live) = self.state.selected_row() else {
            return;
        };
        let msg = format!(
            "[INFO] Profile {}: {}",
            live.row.name,
            view::profile_url(live.row.record.id)
        );
        self.state.push_log(msg);
    }

    fn on_tick(&mut self, now: Instant) {
        for id in self.state.tick(now) {
            let name = self
                .state
                .rows
                .iter()
                .find(|live| live.row.record.id == id)
                .map(|live| live.row.name.clone())
                .unwrap_or_default();
            self.state
                .push_log(format!("[INFO] {name} [{id}] is out of hospital"));
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let cfg = AppConfig::from_env_and_args();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let api = TornApi {
        base_url: cfg.api_base.clone(),
        faction_id: cfg.faction_id,
    };
    feed::spawn_provider(tx, cmd_rx, FeedConfig::from(&cfg), api);

    let classifier = Box::new(Breakpoint {
        max_narrow_cols: cfg.card_layout_max_cols,
    });
    let mut app = App::new(&cfg, Some(cmd_tx), classifier);
    app.request_lists(false);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.on_tick(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app, Instant::now()))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_body(frame, chunks[1], app);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
    if let Some(buffer) = &app.state.key_input {
        render_key_input(frame, frame.size(), buffer);
    }
}

fn header_text(app: &App, now: Instant) -> String {
    let state = &app.state;
    let list = state.selected_list().unwrap_or("-");
    let position = if state.list_names.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", state.list_selected + 1, state.list_names.len())
    };
    let key = if state.api_key.trim().is_empty() {
        "missing".to_string()
    } else {
        mask_key(&state.api_key)
    };
    let line1 = format!(
        "FACTION WATCH | List: {list} ({position}) | {} | Key: {key} | [{}]",
        app.strategy.label(),
        state.throttle.label(now)
    );

    let mut parts = Vec::new();
    if let Some(shown) = &state.shown_list {
        parts.push(format!("Showing: {shown}"));
    }
    if let Some(at) = &state.fetched_at {
        parts.push(format!("Fetched {at}"));
    }
    if state.phase == Phase::Loaded {
        parts.push(format!("{} players", state.rows.len()));
    }
    if let Some(filter) = &state.stats_filter {
        parts.push(format!("Stats filter: {filter}"));
    }
    format!("{line1}\n{}", parts.join(" | "))
}

fn footer_text(state: &AppState) -> String {
    if state.key_input.is_some() {
        return "Type key | Enter Save | Esc Cancel".to_string();
    }
    "f/Enter Fetch | ←/→ List | j/k Move | a Attack | p Profile | K Key | r Reload | ? Help | q Quit"
        .to_string()
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let message = match &state.phase {
        Phase::Idle => Some((
            "Pick a list with ←/→ and press f to fetch".to_string(),
            Style::default().fg(Color::DarkGray),
        )),
        Phase::Loading => Some((
            "Loading...".to_string(),
            Style::default().fg(Color::Yellow),
        )),
        Phase::NoData => Some((
            "No data for this list. Check the list source or pick another list.".to_string(),
            Style::default().fg(Color::DarkGray),
        )),
        Phase::Failed(msg) => Some((
            format!("Fetch failed: {msg}"),
            Style::default().fg(Color::Red),
        )),
        Phase::Loaded => None,
    };
    if let Some((text, style)) = message {
        let paragraph = Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    // Rebuilt in full on every draw.
    let views = view::build_view(&state.rows);
    match app.classifier.classify(area.width) {
        ViewportClass::Narrow => render_cards(frame, area, &views, state.selected),
        ViewportClass::Wide => render_table(frame, area, &views, state.selected),
    }
}

fn table_columns() -> [Constraint; 8] {
    [
        Constraint::Min(24),
        Constraint::Length(6),
        Constraint::Length(24),
        Constraint::Length(12),
        Constraint::Length(24),
        Constraint::Length(12),
        Constraint::Length(24),
        Constraint::Length(7),
    ]
}

fn render_table(frame: &mut Frame, area: Rect, views: &[RowView], selected: usize) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = table_columns();
    let header_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(sections[0]);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    for (idx, title) in TABLE_HEADERS.iter().enumerate() {
        render_cell_text(frame, header_cols[idx], title, bold);
    }

    // One separator line above each row; blank above the first.
    const ROW_HEIGHT: u16 = 2;
    let list_area = sections[1];
    if list_area.height < ROW_HEIGHT {
        return;
    }
    let visible = (list_area.height / ROW_HEIGHT) as usize;
    let (start, end) = visible_range(selected, views.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + (i as u16) * ROW_HEIGHT,
            width: list_area.width,
            height: ROW_HEIGHT,
        };
        let view = &views[idx];
        if view.bordered {
            let sep = "─".repeat(row_area.width as usize);
            let sep_area = Rect { height: 1, ..row_area };
            frame.render_widget(
                Paragraph::new(sep).style(Style::default().fg(Color::DarkGray)),
                sep_area,
            );
        }

        let text_area = Rect {
            y: row_area.y + 1,
            height: 1,
            ..row_area
        };
        let row_style = if idx == selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if idx == selected {
            frame.render_widget(Block::default().style(row_style), text_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(text_area);
        let cells = view::table_cells(view);
        for (col, cell) in cells.iter().enumerate() {
            let style = match col {
                6 => row_style.patch(status_style(view)),
                7 => row_style.patch(attack_style(view.attack.enabled)),
                _ => row_style,
            };
            render_cell_text(frame, cols[col], cell, style);
        }
    }
}

fn render_cards(frame: &mut Frame, area: Rect, views: &[RowView], selected: usize) {
    const CARD_HEIGHT: u16 = 8;
    if area.height < CARD_HEIGHT {
        let empty = Paragraph::new("Cards need more height")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }
    let visible = (area.height / CARD_HEIGHT) as usize;
    let (start, end) = visible_range(selected, views.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let card_area = Rect {
            x: area.x,
            y: area.y + (i as u16) * CARD_HEIGHT,
            width: area.width,
            height: CARD_HEIGHT,
        };
        let view = &views[idx];
        let border_style = if idx == selected {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let lines: Vec<Line> = view::card_lines(view)
            .into_iter()
            .enumerate()
            .map(|(n, text)| match n {
                0 => Line::styled(text, Style::default().add_modifier(Modifier::BOLD)),
                4 => Line::styled(text, status_style(view)),
                5 => Line::styled(text, attack_style(view.attack.enabled)),
                _ => Line::raw(text),
            })
            .collect();
        let card = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        );
        frame.render_widget(card, card_area);
    }
}

fn status_style(view: &RowView) -> Style {
    if view.attack.enabled {
        Style::default().fg(Color::Green)
    } else if view.hospitalized {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Yellow)
    }
}

fn attack_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_key_input(frame: &mut Frame, area: Rect, buffer: &str) {
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);
    let shown = "*".repeat(buffer.chars().count());
    let input = Paragraph::new(format!("API key: {shown}"))
        .block(Block::default().title("Enter API key").borders(Borders::ALL));
    frame.render_widget(input, popup_area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Faction Watch - Help",
        "",
        "  f / Enter    Fetch statuses for the selected list",
        "  ←/→ h/l      Previous / next list",
        "  j/k ↑/↓      Move selection",
        "  a            Attack link (only when Okay)",
        "  p            Profile link",
        "  K            Enter API key",
        "  r            Reload list names",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Fetching is limited to once per cooldown.",
        "Hospital timers count down locally between fetches.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
