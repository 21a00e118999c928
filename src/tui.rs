//! Terminal UI: onboarding form, interview transcript, and the animated
//! avatar. Runs on a blocking thread; all backend work arrives over
//! channels drained once per frame.

use crate::audio::AnimatorEvent;
use crate::backend::BackendEvent;
use crate::controller::{InterviewController, Message, Screen, Speaker};
use crate::face::AvatarFace;
use crate::health::HealthStatus;
use crate::protocol::OnboardingProfile;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::time::Duration;
use tokio::sync::mpsc;

const ONBOARDING_LABELS: [&str; 4] = ["Name", "Domain", "Age", "Experience (years)"];

struct App {
    controller: InterviewController,
    face: AvatarFace,
    /// Onboarding form values, one per label.
    fields: [String; 4],
    focus: usize,
    input: String,
}

impl App {
    fn profile(&self) -> OnboardingProfile {
        OnboardingProfile {
            name: self.fields[0].clone(),
            domain: self.fields[1].clone(),
            age: self.fields[2].clone(),
            experience: self.fields[3].clone(),
        }
    }
}

pub fn run(
    controller: InterviewController,
    tick_ms: u64,
    mut rx_backend: mpsc::Receiver<BackendEvent>,
    mut rx_health: mpsc::Receiver<HealthStatus>,
    mut rx_animator: mpsc::Receiver<AnimatorEvent>,
) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;

    let mut app = App {
        controller,
        face: AvatarFace::new(),
        fields: Default::default(),
        focus: 0,
        input: String::new(),
    };

    let result = event_loop(&mut terminal, &mut app, tick_ms, &mut rx_backend, &mut rx_health, &mut rx_animator);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    tick_ms: u64,
    rx_backend: &mut mpsc::Receiver<BackendEvent>,
    rx_health: &mut mpsc::Receiver<HealthStatus>,
    rx_animator: &mut mpsc::Receiver<AnimatorEvent>,
) -> Result<()> {
    loop {
        while let Ok(event) = rx_backend.try_recv() {
            app.controller.handle_backend_event(event);
        }
        while let Ok(status) = rx_health.try_recv() {
            app.controller.set_health(status);
        }
        while let Ok(event) = rx_animator.try_recv() {
            app.controller.handle_animator_event(event);
        }

        app.controller.tick();
        app.face.tick();
        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(Duration::from_millis(tick_ms))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if ctrl_c || key.code == KeyCode::Esc {
                    return Ok(());
                }
                match app.controller.screen() {
                    Screen::Onboarding => handle_onboarding_key(app, key.code),
                    Screen::Interview => handle_interview_key(app, key.code),
                }
            }
        }
    }
}

fn handle_onboarding_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Tab | KeyCode::Down => app.focus = (app.focus + 1) % app.fields.len(),
        KeyCode::BackTab | KeyCode::Up => {
            app.focus = (app.focus + app.fields.len() - 1) % app.fields.len()
        }
        KeyCode::Backspace => {
            app.fields[app.focus].pop();
        }
        KeyCode::Enter => {
            if app.focus + 1 < app.fields.len() {
                app.focus += 1;
            } else {
                app.controller.submit_profile(app.profile());
            }
        }
        KeyCode::Char(c) => app.fields[app.focus].push(c),
        _ => {}
    }
}

fn handle_interview_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            let text = std::mem::take(&mut app.input);
            app.controller.send_user_message(text);
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
}

fn draw(frame: &mut ratatui::Frame, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
        .split(frame.area());

    draw_avatar(frame, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(columns[1]);
    draw_health(frame, app, right[0]);
    match app.controller.screen() {
        Screen::Onboarding => draw_onboarding(frame, app, right[1]),
        Screen::Interview => draw_interview(frame, app, right[1]),
    }
}

fn draw_avatar(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" SHIBU — AI Interviewer ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(app.face.widget(app.controller.openness()), inner);
}

fn draw_health(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    // Nothing is shown until the first probe completes.
    let span = match app.controller.health() {
        HealthStatus::Checking => return,
        HealthStatus::Online { rag_degraded: false } => {
            Span::styled("● Online", Style::default().fg(Color::Green))
        }
        HealthStatus::Online { rag_degraded: true } => Span::styled(
            "● Online (knowledge base loading)",
            Style::default().fg(Color::Yellow),
        ),
        HealthStatus::Offline => Span::styled("● Offline", Style::default().fg(Color::Red)),
    };
    frame.render_widget(
        Paragraph::new(Line::from(span)).alignment(Alignment::Right),
        area,
    );
}

fn draw_onboarding(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Before we begin ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from("Tell me about yourself, then press Enter."), Line::from("")];
    for (i, label) in ONBOARDING_LABELS.iter().enumerate() {
        let style = if i == app.focus {
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)
        } else {
            Style::default()
        };
        let cursor = if i == app.focus { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>20}: ", label), style),
            Span::raw(format!("{}{}", app.fields[i], cursor)),
        ]));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "Tab/↑↓ move · Enter submit · Esc quit",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_interview(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let status = if app.controller.finished() {
        " Interview Completed. "
    } else {
        " Interview in progress... "
    };
    let log_block = Block::default().borders(Borders::ALL).title(status);
    let log_area = log_block.inner(rows[0]);
    frame.render_widget(log_block, rows[0]);

    let mut lines: Vec<Line> = Vec::new();
    for Message { speaker, text } in app.controller.messages() {
        let (name, style) = match speaker {
            Speaker::User => ("You", Style::default().fg(Color::Cyan)),
            Speaker::Shibu => ("Shibu", Style::default().fg(Color::Yellow)),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", name), style.add_modifier(Modifier::BOLD)),
            Span::raw(text.clone()),
        ]));
        lines.push(Line::from(""));
    }
    if app.controller.waiting() {
        lines.push(Line::from(Span::styled(
            "Shibu is thinking...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    // Stick to the bottom of the transcript.
    let total = lines.len() as u16;
    let scroll = total.saturating_sub(log_area.height);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        log_area,
    );

    let input_title = if app.controller.finished() {
        " Interview over — Esc to quit "
    } else {
        " Your answer (Enter to send) "
    };
    let input = Paragraph::new(format!("{}_", app.input))
        .block(Block::default().borders(Borders::ALL).title(input_title));
    frame.render_widget(input, rows[1]);
}
