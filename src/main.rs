use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use canwest_soccer::config::{Settings, load_dotenv};
use canwest_soccer::dashboard::Workspace;
use canwest_soccer::logging;
use canwest_soccer::model::{ModelKind, OutcomeProbs};
use canwest_soccer::state::{AppState, Picker, PredictField, SwapField, Tab};

struct App {
    state: AppState,
    workspace: Workspace,
    should_quit: bool,
}

impl App {
    fn new(workspace: Workspace) -> Self {
        let mut state = AppState::load(&workspace);
        for kind in ModelKind::ALL {
            if !workspace.has_model(kind) {
                state.push_log(format!("[WARN] {kind} model not found; run train_models"));
            }
        }
        Self {
            state,
            workspace,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ws = &self.workspace;
        let state = &mut self.state;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => state.tab = Tab::Prediction,
            KeyCode::Char('2') => state.tab = Tab::Swap,
            KeyCode::Tab => state.toggle_tab(),
            KeyCode::Char('l') | KeyCode::Right => state.focus_next(),
            KeyCode::Char('h') | KeyCode::Left => state.focus_prev(),
            KeyCode::Char('j') | KeyCode::Down => state.select_next(ws),
            KeyCode::Char('k') | KeyCode::Up => state.select_prev(ws),
            KeyCode::Enter => match state.tab {
                Tab::Prediction => state.refresh_prediction(ws),
                Tab::Swap => state.run_swap(ws),
            },
            KeyCode::Char('s') if state.tab == Tab::Swap => state.save_swap(ws),
            KeyCode::Char('?') => state.help_overlay = !state.help_overlay,
            KeyCode::Esc => state.help_overlay = false,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    load_dotenv();
    let settings = Settings::from_env();
    // The terminal owns stdout/stderr while the UI is up.
    if let Some(path) = &settings.log_file {
        logging::init_file(path)?;
    }

    let workspace = Workspace::load(&settings.paths())?;
    let mut app = App::new(workspace);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
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
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.tab {
        Tab::Prediction => render_prediction(frame, chunks[1], &app.state),
        Tab::Swap => render_swap(frame, chunks[1], app),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::TOP))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let title = match state.tab {
        Tab::Prediction => "CANWEST | Match Prediction",
        Tab::Swap => "CANWEST | Lineup Swap",
    };
    let line1 = format!("  (o)  {title}");
    let line2 = format!("  /|\\  {}", state.status);
    let line3 = "  / \\".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.tab {
        Tab::Prediction => {
            "1/2/Tab View | h/l Field | j/k Change | Enter Predict | ? Help | q Quit".to_string()
        }
        Tab::Swap => {
            "1/2/Tab View | h/l Field | j/k Change | Enter Simulate | s Save | ? Help | q Quit"
                .to_string()
        }
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let tail: Vec<&str> = state.logs.iter().rev().take(2).map(String::as_str).collect();
    tail.into_iter().rev().collect::<Vec<_>>().join("\n")
}

fn picker_widget<'a>(title: &'a str, picker: &Picker, focused: bool) -> Paragraph<'a> {
    let value = picker.current().unwrap_or("-").to_string();
    let count = if picker.options.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", picker.selected + 1, picker.options.len())
    };
    let border = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Paragraph::new(format!("{value}\n{count}")).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border),
    )
}

fn render_prediction(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(1)])
        .split(area);
    let fields = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    frame.render_widget(
        picker_widget("Home", &state.home, state.predict_focus == PredictField::Home),
        fields[0],
    );
    frame.render_widget(
        picker_widget("Away", &state.away, state.predict_focus == PredictField::Away),
        fields[1],
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    let Some(p) = &state.prediction else {
        let empty = Paragraph::new("No valid data for this selection")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, rows[1]);
        return;
    };

    let chart = probability_chart(p.prediction.probs)
        .block(Block::default().title("Home outcome %").borders(Borders::ALL));
    frame.render_widget(chart, body[0]);

    let h = &p.home;
    let a = &p.away;
    let mut lines = vec![
        format!(
            "Prediction: {} (W {:.1}% D {:.1}% L {:.1}%)",
            p.prediction.label,
            p.prediction.probs.win * 100.0,
            p.prediction.probs.draw * 100.0,
            p.prediction.probs.loss * 100.0
        ),
        String::new(),
        format!("{:<22}{:>10}{:>10}", "Form (last 3)", h.team, a.team),
    ];
    let pairs = [
        ("Shots", h.shots_rolling3, a.shots_rolling3),
        ("Shots on goal", h.sog_rolling3, a.sog_rolling3),
        ("Assists", h.assists_rolling3, a.assists_rolling3),
        ("Players used", h.player_count_rolling3, a.player_count_rolling3),
        ("Avg player year", h.avg_player_year_rolling3, a.avg_player_year_rolling3),
        ("Result rate (last 5)", h.win_rate_rolling5, a.win_rate_rolling5),
    ];
    for (label, hv, av) in pairs {
        lines.push(format!("{label:<22}{hv:>10.2}{av:>10.2}"));
    }
    let table = Paragraph::new(lines.join("\n"))
        .block(Block::default().title("Form comparison").borders(Borders::ALL));
    frame.render_widget(table, body[1]);
}

fn render_swap(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(1)])
        .split(area);
    let fields = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(rows[0]);
    let focus = state.swap_focus;
    frame.render_widget(
        picker_widget("Match", &state.match_id, focus == SwapField::Match),
        fields[0],
    );
    frame.render_widget(
        picker_widget("Team", &state.team, focus == SwapField::Team),
        fields[1],
    );
    frame.render_widget(
        picker_widget("Swap out", &state.swap_out, focus == SwapField::Out),
        fields[2],
    );
    frame.render_widget(
        picker_widget("Swap in", &state.swap_in, focus == SwapField::In),
        fields[3],
    );

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(48), Constraint::Min(1)])
        .split(rows[1]);
    let lineup = state.lineup_lines(&app.workspace);
    let lineup = if lineup.is_empty() {
        "No player data for this match/team combination".to_string()
    } else {
        lineup.join("\n")
    };
    frame.render_widget(
        Paragraph::new(lineup).block(Block::default().title("Lineup").borders(Borders::ALL)),
        main[0],
    );

    let Some(report) = &state.swap else {
        let hint = if state.swap_out.options.is_empty() {
            ""
        } else {
            "Enter to simulate the swap"
        };
        let empty = Paragraph::new(hint).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, main[1]);
        return;
    };

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main[1]);
    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[0]);
    frame.render_widget(
        probability_chart(report.before.probs)
            .block(Block::default().title("Before %").borders(Borders::ALL)),
        charts[0],
    );
    frame.render_widget(
        probability_chart(report.after.probs)
            .block(Block::default().title("After %").borders(Borders::ALL)),
        charts[1],
    );

    let mut lines = vec![format!(
        "{:<16}{:>10}{:>10}{:>10}",
        "Feature", "Before", "After", "Change"
    )];
    for d in &report.deltas {
        lines.push(format!(
            "{:<16}{:>10.3}{:>10.3}{:>+10.3}",
            d.name,
            d.before,
            d.after,
            d.change()
        ));
    }
    let table = Paragraph::new(lines.join("\n"))
        .block(Block::default().title("Feature deltas").borders(Borders::ALL));
    frame.render_widget(table, body[1]);
}

fn probability_chart(probs: OutcomeProbs) -> BarChart<'static> {
    let bar = |label: &'static str, p: f64, color: Color| {
        Bar::default()
            .label(label.into())
            .value((p * 100.0).round() as u64)
            .style(Style::default().fg(color))
    };
    let bars = [
        bar("W", probs.win, Color::Green),
        bar("D", probs.draw, Color::Yellow),
        bar("L", probs.loss, Color::Red),
    ];
    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .max(100)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Canada West - Help",
        "",
        "Global:",
        "  1 / 2 / Tab  Prediction / Swap view",
        "  h/l or ←/→   Move between fields",
        "  j/k or ↑/↓   Change the focused field",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Prediction:",
        "  Enter        Recompute",
        "",
        "Swap:",
        "  Enter        Simulate swap",
        "  s            Save scenario CSV",
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
