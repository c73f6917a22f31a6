//! Terminal User Interface for tapestat.
//!
//! This module provides a real-time dashboard using `ratatui` that displays:
//!
//! - Status bar with drive count and last sample time
//! - A table of the latest rate of every registered metric
//! - A chart of the selected metric over time
//!
//! # Controls
//!
//! - `q` or `Esc`: Quit
//! - `Up`/`Down`: Select the charted metric

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::{warn, LevelFilter};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{
        Axis, Block, BorderType, Borders, Chart, Dataset, GraphType, List, ListItem, Paragraph,
    },
    Frame, Terminal,
};

use crate::app::{App, Tick};
use crate::registry::Registration;

/// Turns logging off while alive, restoring the previous level on drop.
///
/// stderr shares the terminal with the alternate screen, so log lines would
/// be drawn over the dashboard. Failed samples are shown in the rate table
/// instead.
struct QuietLogs {
    previous: LevelFilter,
}

impl QuietLogs {
    fn new() -> Self {
        let previous = log::max_level();
        log::set_max_level(LevelFilter::Off);
        Self { previous }
    }
}

impl Drop for QuietLogs {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}

/// Run the TUI event loop.
///
/// This takes ownership of the App and terminal, running until the user
/// presses `q` or `Esc`, or the `running` flag is set to false. Logging is
/// silenced until the terminal is restored.
///
/// # Arguments
///
/// * `app` - Application instance
/// * `running` - Atomic flag to signal shutdown
/// * `interval` - Time between collection ticks
pub fn run(mut app: App, running: Arc<AtomicBool>, interval: Duration) -> std::io::Result<()> {
    let _quiet = QuietLogs::new();
    enable_raw_mode()?;
    if let Err(e) = std::io::stdout().execute(EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }

    let result = run_tui_loop(&mut app, &running, interval);

    // Always clean up terminal state
    let _ = disable_raw_mode();
    let _ = std::io::stdout().execute(LeaveAlternateScreen);

    result
}

/// Inner TUI loop - separated to ensure cleanup happens on any exit path.
fn run_tui_loop(
    app: &mut App,
    running: &Arc<AtomicBool>,
    interval: Duration,
) -> std::io::Result<()> {
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut terminal = Terminal::new(backend)?;

    // The first tick only makes sense once the interval has elapsed since
    // the registration baseline
    let mut last_collection = Instant::now();
    let mut selected = 0usize;
    let metric_count = app.stats.registrations().len();

    while running.load(Ordering::Relaxed) {
        // Check for input
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::Relaxed);
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            running.store(false, Ordering::Relaxed);
                        }
                        KeyCode::Up => {
                            selected = selected.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if selected + 1 < metric_count {
                                selected += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // Collect at interval
        if last_collection.elapsed() >= interval {
            if let Err(e) = app.collect_tick() {
                warn!("Collection tick failed: {}", e);
            }
            last_collection = Instant::now();
        }

        terminal.draw(|f| draw_ui(f, app, selected))?;
    }

    Ok(())
}

/// Main UI drawing function.
fn draw_ui(f: &mut Frame, app: &App, selected: usize) {
    let size = f.area();

    let warnings = app.availability.get_warnings();
    let has_warnings = !warnings.is_empty();

    let constraints = if has_warnings {
        vec![
            Constraint::Length(3), // Status bar
            Constraint::Length(3), // Warnings bar
            Constraint::Min(8),    // Rates + chart
        ]
    } else {
        vec![
            Constraint::Length(3), // Status bar
            Constraint::Min(8),    // Rates + chart
        ]
    };

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(size);

    let mut chunk_idx = 0;

    draw_status_bar(f, app, main_chunks[chunk_idx]);
    chunk_idx += 1;

    if has_warnings {
        draw_warnings(f, &warnings, main_chunks[chunk_idx]);
        chunk_idx += 1;
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_chunks[chunk_idx]);

    draw_rates(f, app.stats.registrations(), app.history.back(), selected, body[0]);
    draw_rate_chart(f, app.stats.registrations(), &app.history, selected, body[1]);
}

/// Draw the top status bar.
fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let drives = app.availability.drives.len();
    let status_text = if let Some(tick) = app.history.back() {
        format!(
            " tapestat | {} | Drives: {} | Metrics: {} | Errors: {} | [q]uit [↑↓] select",
            tick.datetime,
            drives,
            tick.samples.len(),
            tick.failures(),
        )
    } else {
        format!(
            " tapestat | Waiting {}s for first sample of {} drive(s)... | [q]uit",
            app.config.interval, drives
        )
    };

    let status = Paragraph::new(status_text)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("Status"),
        );

    f.render_widget(status, area);
}

/// Draw the warnings bar for unavailable sources.
fn draw_warnings(f: &mut Frame, warnings: &[String], area: Rect) {
    let text = warnings.join(" | ");
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("⚠ Limited Metrics")
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(paragraph, area);
}

/// Draw the list of latest rates, highlighting the selected metric.
fn draw_rates(
    f: &mut Frame,
    registrations: &[Registration],
    latest: Option<&Tick>,
    selected: usize,
    area: Rect,
) {
    let items: Vec<ListItem> = registrations
        .iter()
        .enumerate()
        .map(|(i, reg)| {
            let sample = latest.and_then(|t| t.samples.get(i));
            let value = match sample {
                Some(s) if s.error.is_some() => "error".to_string(),
                Some(s) => format_rate(s.rate.unwrap_or(0.0)),
                None => "-".to_string(),
            };

            let mut style = Style::default();
            if sample.is_some_and(|s| s.error.is_some()) {
                style = style.fg(Color::Red);
            } else if sample.and_then(|s| s.rate).is_some_and(|r| r < 0.0) {
                // Counter went backwards: drive reset or wrap
                style = style.fg(Color::Yellow);
            }
            if i == selected {
                style = style.add_modifier(Modifier::REVERSED);
            }

            ListItem::new(format!(
                "{:<6} {:<15} {:>12} {}",
                reg.id.drive, reg.id.metric, value, reg.descriptor.units
            ))
            .style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title("Rates"),
    );
    f.render_widget(list, area);
}

/// Draw the selected metric's rate over time.
fn draw_rate_chart(
    f: &mut Frame,
    registrations: &[Registration],
    history: &VecDeque<Tick>,
    selected: usize,
    area: Rect,
) {
    let Some(reg) = registrations.get(selected) else {
        let empty = Paragraph::new("No tape drives registered").block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("Chart"),
        );
        f.render_widget(empty, area);
        return;
    };

    let data: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .filter_map(|(i, tick)| {
            tick.samples
                .get(selected)
                .and_then(|s| s.rate)
                .map(|r| (i as f64, r))
        })
        .collect();

    let title = reg.descriptor.name.as_str();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    if data.is_empty() {
        f.render_widget(Paragraph::new("Waiting for data...").block(block), area);
        return;
    }

    let data_len = data.len().max(history.len());
    let min_y = data.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let max_y = data
        .iter()
        .map(|(_, y)| *y)
        .fold(f64::NEG_INFINITY, f64::max);

    let y_range = if (max_y - min_y).abs() < 0.001 {
        (min_y - 1.0, max_y + 1.0)
    } else {
        (min_y.min(0.0), max_y.max(0.0) * 1.05)
    };

    let datasets = vec![Dataset::default()
        .name(reg.descriptor.units.as_str())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data)];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Time")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, data_len as f64]),
        )
        .y_axis(
            Axis::default()
                .title("")
                .style(Style::default().fg(Color::Gray))
                .labels(vec![
                    Span::raw(format_rate(y_range.0)),
                    Span::raw(format_rate(y_range.1)),
                ])
                .bounds([y_range.0, y_range.1]),
        );

    f.render_widget(chart, area);
}

/// Compact rate formatting with k/M/G suffixes.
fn format_rate(rate: f64) -> String {
    let abs = rate.abs();
    if abs >= 1e9 {
        format!("{:.2}G", rate / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", rate / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}k", rate / 1e3)
    } else {
        format!("{:.2}", rate)
    }
}

/// Run in headless mode (no TUI, just logging to stdout).
///
/// # Arguments
///
/// * `app` - Application instance
/// * `running` - Atomic flag to signal shutdown
/// * `interval` - Time between collection ticks
pub fn run_headless(
    mut app: App,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> std::io::Result<()> {
    let csv_file = app.config.csv_file.clone();

    println!("tapestat - Tape Drive Statistics Monitor");
    println!("========================================");
    println!("Logging to: {}", csv_file);
    println!("Interval: {} seconds", interval.as_secs());
    println!("Metrics: {}", app.stats.registrations().len());
    for warning in app.availability.get_warnings() {
        println!("Warning: {}", warning);
    }
    println!("Press Ctrl+C to stop.\n");

    while running.load(Ordering::Relaxed) {
        // Sleep first: the baseline was taken at registration
        sleep_while_running(&running, interval);
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let tick = app.collect_tick()?;
        for sample in &tick.samples {
            match (&sample.rate, &sample.error) {
                (Some(rate), _) => println!(
                    "[{}] {}: {} {}/s",
                    tick.datetime,
                    sample.name,
                    format_rate(*rate),
                    sample.metric
                ),
                (None, Some(err)) => {
                    println!("[{}] {}: error: {}", tick.datetime, sample.name, err)
                }
                (None, None) => {}
            }
        }
    }

    println!("\nStopped. Data logged to {}", csv_file);
    Ok(())
}

/// Sleep for `interval`, waking early if `running` is cleared.
fn sleep_while_running(running: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(100)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_formatting() {
        assert_eq!(format_rate(0.0), "0.00");
        assert_eq!(format_rate(50.0), "50.00");
        assert_eq!(format_rate(-980.0), "-980.00");
        assert_eq!(format_rate(1_500.0), "1.50k");
        assert_eq!(format_rate(2_500_000.0), "2.50M");
        assert_eq!(format_rate(3_000_000_000.0), "3.00G");
    }

    #[test]
    fn logging_is_silenced_while_dashboard_is_up() {
        log::set_max_level(LevelFilter::Debug);
        {
            let _quiet = QuietLogs::new();
            assert_eq!(log::max_level(), LevelFilter::Off);
        }
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
