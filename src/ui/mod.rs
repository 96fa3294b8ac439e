use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::app::{App, Mode};
use crate::domain::task::Task;
use crate::usecase::overdue::is_overdue;

pub fn run(mut app: App, tick_rate: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut last_tick = Instant::now();
    let res = loop {
        terminal.draw(|f| draw(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(&mut app, key.code)?
        {
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    };

    cleanup_terminal(&mut terminal)?;
    res
}

fn handle_key(app: &mut App, code: KeyCode) -> Result<bool> {
    match app.mode {
        Mode::Normal => match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => app.select_next(),
            KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
            KeyCode::Char('a') | KeyCode::Char('n') => app.begin_add(),
            KeyCode::Char(' ') => app.toggle_selected(),
            KeyCode::Enter => app.open_detail(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
            _ => {}
        },
        Mode::EditingText => match code {
            KeyCode::Esc => app.cancel_add(),
            KeyCode::Enter => app.submit_text(),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        },
        Mode::EditingDue => match code {
            KeyCode::Esc => app.cancel_add(),
            KeyCode::Enter => app.submit_due(),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        },
        Mode::Detail => match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => app.close_detail(),
            _ => {}
        },
    }

    Ok(false)
}

fn draw(f: &mut ratatui::Frame, app: &App) {
    if app.mode == Mode::Detail {
        draw_detail(f, app);
        return;
    }

    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(size);

    let header = render_header(app);
    f.render_widget(header, chunks[0]);

    let mut list_state = ListState::default();
    if !app.tasks().is_empty() {
        list_state.select(Some(app.selected));
    }

    let list = render_list(app.tasks(), app.selected, OffsetDateTime::now_utc());
    f.render_stateful_widget(list, chunks[1], &mut list_state);

    let footer = render_footer(app);
    f.render_widget(footer, chunks[2]);
}

fn render_header(app: &App) -> Paragraph<'static> {
    let total = app.tasks().len();
    let done = app.tasks().iter().filter(|t| t.completed).count();
    let summary = format!("Open: {} / All: {}", total.saturating_sub(done), total);
    let line = Line::from(vec![
        Span::styled("tarea - todo list", Style::default().fg(Color::Cyan)),
        Span::raw("  |  "),
        Span::styled(summary, Style::default().fg(Color::Yellow)),
    ]);
    Paragraph::new(line)
        .block(Block::default().title("Overview").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_list(tasks: &[Task], selected: usize, now: OffsetDateTime) -> List<'_> {
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let symbol = if task.completed { "✔" } else { "•" };
            let mut line = vec![Span::raw(format!(" {symbol} {}", task.text))];
            if let Some(due) = task.due {
                let color = if is_overdue(task, now) {
                    Color::Red
                } else {
                    Color::DarkGray
                };
                line.push(Span::styled(
                    format!("  (due {})", format_day(due)),
                    Style::default().fg(color),
                ));
            }
            if task.completed {
                line.push(Span::styled("  done", Style::default().fg(Color::Green)));
            }

            let style = if idx == selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else if task.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(line)).style(style)
        })
        .collect();

    List::new(items)
        .block(
            Block::default()
                .title("Tasks (j/k move ; a/n add ; Space toggle ; Enter details ; d delete)")
                .borders(Borders::ALL),
        )
        .highlight_symbol("➤ ")
}

fn render_footer(app: &App) -> Paragraph<'_> {
    match app.mode {
        Mode::Normal => {
            let msg = app
                .status
                .as_deref()
                .unwrap_or("q quit ; a/n add ; Space toggle ; Enter details");
            Paragraph::new(msg).block(Block::default().title("Normal").borders(Borders::ALL))
        }
        Mode::Detail => {
            let msg = app
                .status
                .as_deref()
                .unwrap_or("Esc / Enter / q back to the list");
            Paragraph::new(msg).block(Block::default().title("Detail").borders(Borders::ALL))
        }
        Mode::EditingText => {
            let line = Line::from(vec![
                Span::raw("New task: "),
                Span::styled(&app.input, Style::default().fg(Color::Yellow)),
                Span::raw("█"),
            ]);
            Paragraph::new(line).block(
                Block::default()
                    .title("Input (Enter to continue / Esc to cancel)")
                    .borders(Borders::ALL),
            )
        }
        Mode::EditingDue => {
            let line = Line::from(vec![
                Span::raw("Due date: "),
                Span::styled(&app.input, Style::default().fg(Color::Yellow)),
                Span::raw("█"),
            ]);
            Paragraph::new(line).block(
                Block::default()
                    .title("Due date (Enter to add / Esc to cancel)")
                    .borders(Borders::ALL),
            )
        }
    }
}

fn draw_detail(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());
    f.render_widget(render_footer(app), chunks[1]);

    let block = Block::default().title("Task details").borders(Borders::ALL);

    let Some(task) = app.selected_task() else {
        f.render_widget(Paragraph::new("Nothing selected").block(block), chunks[0]);
        return;
    };

    let now = OffsetDateTime::now_utc();
    let state = if task.completed {
        Span::styled("✔ completed", Style::default().fg(Color::Green))
    } else {
        Span::styled("• open", Style::default().fg(Color::Yellow))
    };
    let due = match task.due {
        Some(due) => {
            let color = if is_overdue(task, now) {
                Color::Red
            } else {
                Color::Yellow
            };
            Span::styled(format_day(due), Style::default().fg(color))
        }
        None => Span::styled("none", Style::default().fg(Color::DarkGray)),
    };

    let lines = vec![
        Line::from(Span::styled(
            task.text.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![Span::raw("Status: "), state]),
        Line::from(vec![Span::raw("Due:    "), due]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Id: {}", task.id),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, chunks[0]);
}

fn format_day(due: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]");
    due.date()
        .format(&format)
        .unwrap_or_else(|_| due.date().to_string())
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
