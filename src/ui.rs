use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use crate::app::{App, CardState, SharedState};
use crate::chart::Projection;
use crate::constants::{PH_AXIS, TEMP_AXIS, THRESHOLD_STEP_C, TICK_RATE_MS};
use crate::control::{nudge_threshold, toggle_fan};
use crate::network::ReactorApi;
use crate::pipeline::PipelineState;
use crate::util::{format_reading, now_ms};

pub fn run<A: ReactorApi>(
    api: Arc<A>,
    shared: Arc<Mutex<SharedState>>,
    running: Arc<AtomicBool>,
    source: &str,
) -> io::Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new();
    let res = run_app_loop(&mut terminal, app, api, shared, &running, source);
    running.store(false, Ordering::SeqCst);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app_loop<B: ratatui::backend::Backend, A: ReactorApi>(
    terminal: &mut Terminal<B>,
    mut app: App,
    api: Arc<A>,
    shared: Arc<Mutex<SharedState>>,
    running: &AtomicBool,
    source: &str,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(TICK_RATE_MS);
    app.on_tick(&shared, now_ms());

    while running.load(Ordering::SeqCst) {
        terminal.draw(|f| draw(f, &app, source))?;

        // Handle input
        let timeout = tick_rate.checked_sub(app.last_tick.elapsed()).unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                    KeyCode::Char('f') => {
                        toggle_fan(Arc::clone(&api), Arc::clone(&shared));
                    }
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        nudge_threshold(Arc::clone(&api), Arc::clone(&shared), THRESHOLD_STEP_C);
                    }
                    KeyCode::Char('-') => {
                        nudge_threshold(Arc::clone(&api), Arc::clone(&shared), -THRESHOLD_STEP_C);
                    }
                    _ => {}
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.on_tick(&shared, now_ms());
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}

fn card_color(state: CardState) -> Color {
    match state {
        CardState::Neutral => Color::Gray,
        CardState::Good => Color::Green,
        CardState::Warn => Color::LightYellow,
        CardState::Bad => Color::Red,
    }
}

fn draw(f: &mut Frame, app: &App, source: &str) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(12),   // Charts + readouts
            Constraint::Length(1), // Bottom Status Bar
        ].as_ref())
        .split(f.size());

    let title = match app.phase {
        PipelineState::Live => format!(" Reactor [{}] ", source),
        _ => format!(" Reactor [{}] loading history... ", source),
    };
    let reactor_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(reactor_block.clone(), main_chunks[0]);

    let inner_area = reactor_block.inner(main_chunks[0]);
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
        .split(inner_area);

    // ======== Left Charts (Temperature/pH) ========
    let chart_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(body_chunks[0]);

    draw_series(f, chart_chunks[0], " Temperature ", "°C", &app.temperature, TEMP_AXIS, Color::Green);
    draw_series(f, chart_chunks[1], " pH ", "pH", &app.ph, PH_AXIS, Color::LightGreen);

    // ======== Right Readout Cards ========
    let card_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ].as_ref())
        .split(body_chunks[1]);

    let temp_color = card_color(app.temp_card);
    let temp_text = vec![
        Line::from(vec![
            Span::styled(format_reading(app.temperature_c), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
            Span::raw(" °C"),
        ]),
        Line::from(vec![
            Span::styled(format_reading(app.temperature_f), Style::default().fg(Color::DarkGray)),
            Span::styled(" °F", Style::default().fg(Color::DarkGray)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(temp_text).block(card_block(" Temperature ", temp_color)),
        card_chunks[0],
    );

    let ph_text = vec![Line::from(Span::styled(
        format_reading(app.ph_value),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ))];
    f.render_widget(
        Paragraph::new(ph_text).block(card_block(" pH ", card_color(app.ph_card))),
        card_chunks[1],
    );

    let (fan_label, fan_color) = if app.fan_running { ("ON", Color::Cyan) } else { ("OFF", Color::DarkGray) };
    let threshold = match app.threshold {
        Some(t) => format!("{:.1} °C", t),
        None => "--".to_string(),
    };
    let fan_text = vec![
        Line::from(Span::styled(fan_label, Style::default().fg(fan_color).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("Threshold: ", Style::default().fg(Color::DarkGray)),
            Span::raw(threshold),
        ]),
    ];
    f.render_widget(Paragraph::new(fan_text).block(card_block(" Fan ", fan_color)), card_chunks[2]);

    // ============ Bottom Status Bar ============
    let mut status = vec![Span::styled(
        " REACTOR ",
        Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD),
    )];
    if let Some(algae) = &app.algae {
        status.push(Span::raw(" | "));
        status.push(Span::raw(format!("{} {}", algae.emoji, algae.message)));
    }
    if let Some(err) = &app.link_error {
        status.push(Span::raw(" | "));
        status.push(Span::styled(format!("link: {}", err), Style::default().fg(Color::Red)));
    }
    if let Some(notice) = &app.notice {
        status.push(Span::raw(" | "));
        status.push(Span::styled(notice.clone(), Style::default().fg(Color::LightYellow)));
    }
    status.push(Span::raw(" | q quit  f fan  +/- threshold"));

    let status_bar = Paragraph::new(Line::from(status)).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, main_chunks[1]);
}

fn card_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_series(
    f: &mut Frame,
    area: Rect,
    title: &str,
    unit: &str,
    projection: &Projection,
    y_bounds: [f64; 2],
    color: Color,
) {
    // one dataset per run so absent values show as gaps
    let segments = projection.segments();
    let datasets: Vec<Dataset> = segments
        .iter()
        .map(|run| {
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(run)
        })
        .collect();

    let x_labels: Vec<Span> = projection.x_labels().into_iter().map(Span::raw).collect();
    let y_labels = vec![
        Span::raw(format!("{:.0}", y_bounds[0])),
        Span::raw(format!("{:.0}", y_bounds[1])),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).title_style(Style::default().fg(color)))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(projection.x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(unit)
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(y_labels),
        );
    f.render_widget(chart, area);
}
