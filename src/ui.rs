use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use serde_json::Value;

use crate::app::App;
use crate::boundary::{self, BoundaryFault};
use crate::markdown;
use crate::models::{self, format_american, format_stat};
use crate::panel::{Page, PanelStatus};

/// Draws one frame. A panic inside the page body is caught and returned so
/// the caller can switch the app into its fallback screen.
pub fn draw(frame: &mut Frame, app: &App) -> Option<BoundaryFault> {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = if app.show_diagnostics {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);
        render_diagnostics(frame, cols[1], app);
        cols[0]
    } else {
        chunks[1]
    };

    let mut caught = None;
    match &app.fault {
        Some(fault) => render_fault(frame, body, app.page(), fault),
        None => {
            if let Err(fault) = boundary::guard(|| render_body(frame, body, app)) {
                frame.render_widget(Clear, body);
                render_fault(frame, body, app.page(), &fault);
                caught = Some(fault);
            }
        }
    }

    let footer = Paragraph::new(footer_text(app)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
    caught
}

pub fn header_text(app: &App) -> String {
    let tabs = Page::ALL
        .iter()
        .enumerate()
        .map(|(i, page)| {
            if *page == app.page() {
                format!("[{} {}]", i + 1, page.label())
            } else {
                format!(" {} {} ", i + 1, page.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let state = app.panel.state();
    let mut flags = vec![
        format!("mode {}", app.mode.as_str()),
        format!("trends {}", app.prefs.trends.label()),
        format!("compact {}", if app.prefs.compact { "on" } else { "off" }),
        format!("ttl {}s", app.prefs.cache_ttl),
    ];
    match app.panel.poll_interval() {
        Some(interval) => flags.push(format!("poll {}s", interval.as_secs())),
        None => flags.push("poll off".to_string()),
    }
    if let Some(at) = state.last_updated_at {
        flags.push(format!("updated {}", at.format("%H:%M:%S")));
    }
    if state.stale {
        flags.push("STALE".to_string());
    }
    if state.loading() {
        flags.push("LOADING".to_string());
    }
    format!("HOOPS TERMINAL {tabs}\n{}", flags.join(" | "))
}

fn footer_text(app: &App) -> String {
    let hints = "1-7 page | r refresh | R bypass cache | t trends | c compact | T ttl | m mode | p poll | d diag | y copy | ? help | q quit";
    format!("{}\n{hints}", console_text(app))
}

pub fn console_text(app: &App) -> String {
    if app.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    app.logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.panel.state();
    let Some(payload) = state.visible() else {
        let text = match (state.status, state.blocking_error()) {
            (PanelStatus::Error, Some(err)) => format!("{err}\n\nPress r to retry."),
            (PanelStatus::Idle, _) => "Waiting for first load…".to_string(),
            _ => "Loading…".to_string(),
        };
        let style = if state.blocking_error().is_some() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let widget = Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: false })
            .block(page_block(app.page()));
        frame.render_widget(widget, area);
        return;
    };

    let area = match state.banner() {
        Some(err) => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)])
                .split(area);
            let banner = Paragraph::new(format!("⚠ {err} (showing last good data, r to retry)"))
                .style(Style::default().fg(Color::Black).bg(Color::Yellow));
            frame.render_widget(banner, split[0]);
            split[1]
        }
        None => area,
    };

    match app.page() {
        Page::Narrative => render_narrative(frame, area, payload, app.scroll),
        Page::Games => render_games(frame, area, payload),
        Page::Offense => render_offense(frame, area, payload),
        Page::Defense => render_defense(frame, area, payload),
        Page::Players => render_players(frame, area, payload),
        Page::Trends => render_trends(frame, area, payload),
        Page::Odds => render_odds(frame, area, payload),
    }
}

fn page_block(page: Page) -> Block<'static> {
    Block::default().title(page.label()).borders(Borders::ALL)
}

fn render_unrecognized(frame: &mut Frame, area: Rect, page: Page, err: &anyhow::Error) {
    let widget = Paragraph::new(format!("Payload not recognized: {err:#}"))
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(page_block(page));
    frame.render_widget(widget, area);
}

fn header_row(cells: &[&'static str]) -> Row<'static> {
    Row::new(cells.iter().copied().map(Cell::from))
        .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))
}

fn render_narrative(frame: &mut Frame, area: Rect, payload: &Value, scroll: u16) {
    let lines = match models::narrative_markdown(payload) {
        Some(md) if !md.trim().is_empty() => markdown::to_lines(md),
        _ => vec![Line::from("No narrative available.")],
    };
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(page_block(Page::Narrative));
    frame.render_widget(widget, area);
}

fn render_games(frame: &mut Frame, area: Rect, payload: &Value) {
    let rows = match models::game_rows(payload) {
        Ok(rows) => rows,
        Err(err) => return render_unrecognized(frame, area, Page::Games, &err),
    };
    if rows.is_empty() {
        let widget = Paragraph::new("No games scheduled today.").block(page_block(Page::Games));
        frame.render_widget(widget, area);
        return;
    }
    let body = rows.into_iter().map(|g| {
        Row::new(vec![
            Cell::from(format!("{} @ {}", g.away, g.home)),
            Cell::from(g.status),
            Cell::from(g.date),
            Cell::from(g.venue),
        ])
    });
    let table = Table::new(
        body,
        [
            Constraint::Percentage(40),
            Constraint::Length(12),
            Constraint::Length(17),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["MATCHUP", "STATUS", "TIP", "VENUE"]))
    .block(page_block(Page::Games));
    frame.render_widget(table, area);
}

fn with_notes(frame: &mut Frame, area: Rect, notes: Vec<String>) -> Rect {
    if notes.is_empty() {
        return area;
    }
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(notes.len() as u16)])
        .split(area);
    let widget = Paragraph::new(notes.join("\n")).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(widget, split[1]);
    split[0]
}

fn rank(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn render_offense(frame: &mut Frame, area: Rect, payload: &Value) {
    let table = match models::offense_table(payload) {
        Ok(table) => table,
        Err(err) => return render_unrecognized(frame, area, Page::Offense, &err),
    };
    let area = with_notes(frame, area, table.notes());
    let body = table.teams.into_iter().map(|t| {
        Row::new(vec![
            rank(t.rank_overall),
            t.team_name,
            format_stat(t.points_per_game),
            format_stat(t.assists_per_game),
            format_stat(t.rebounds_per_game),
            format!(
                "{}/{}/{}/{}/{}",
                rank(t.rank_pg),
                rank(t.rank_sg),
                rank(t.rank_sf),
                rank(t.rank_pf),
                rank(t.rank_c)
            ),
        ])
    });
    let widget = Table::new(
        body,
        [
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(20),
        ],
    )
    .header(header_row(&["#", "TEAM", "PPG", "APG", "RPG", "PG/SG/SF/PF/C"]))
    .block(page_block(Page::Offense));
    frame.render_widget(widget, area);
}

fn render_defense(frame: &mut Frame, area: Rect, payload: &Value) {
    let table = match models::defense_table(payload) {
        Ok(table) => table,
        Err(err) => return render_unrecognized(frame, area, Page::Defense, &err),
    };
    let area = with_notes(frame, area, table.notes());
    let body = table.teams.into_iter().map(|t| {
        Row::new(vec![
            rank(t.rank_overall),
            t.team_name,
            format_stat(t.defensive_rating),
            format_stat(t.opp_points_per_game),
            format_stat(t.opp_rebounds_per_game),
            format_stat(t.opp_assists_per_game),
        ])
    });
    let widget = Table::new(
        body,
        [
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(7),
        ],
    )
    .header(header_row(&["#", "TEAM", "DRTG", "OPP PTS", "OPP REB", "OPP AST"]))
    .block(page_block(Page::Defense));
    frame.render_widget(widget, area);
}

fn render_players(frame: &mut Frame, area: Rect, payload: &Value) {
    let rows = match models::player_rows(payload) {
        Ok(rows) => rows,
        Err(err) => return render_unrecognized(frame, area, Page::Players, &err),
    };
    let body = rows.into_iter().map(|p| {
        let delta = match (p.ppg, p.season_ppg) {
            (Some(recent), Some(season)) => format!("{:+.1}", recent - season),
            _ => "-".to_string(),
        };
        Row::new(vec![
            p.player_name,
            format_stat(p.ppg),
            format_stat(p.rpg),
            format_stat(p.apg),
            format_stat(p.tpm),
            delta,
            p.trend.unwrap_or_else(|| "-".to_string()),
        ])
    });
    let widget = Table::new(
        body,
        [
            Constraint::Min(18),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["PLAYER", "PPG", "RPG", "APG", "3PM", "vs SZN", "TREND"]))
    .block(page_block(Page::Players));
    frame.render_widget(widget, area);
}

fn trend_style(direction: Option<&str>) -> Style {
    match direction {
        Some("up") => Style::default().fg(Color::Green),
        Some("down") => Style::default().fg(Color::Red),
        _ => Style::default(),
    }
}

fn render_trends(frame: &mut Frame, area: Rect, payload: &Value) {
    let summary = match models::trends_summary(payload) {
        Ok(summary) => summary,
        Err(err) => return render_unrecognized(frame, area, Page::Trends, &err),
    };
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let players = summary.player_trends.into_iter().map(|t| {
        let style = trend_style(t.trend_direction.as_deref());
        Row::new(vec![
            Cell::from(t.player_name),
            Cell::from(t.stat_type),
            Cell::from(t.last_n_games.map(|n| n.to_string()).unwrap_or_default()),
            Cell::from(format_stat(t.average)),
            Cell::from(t.trend_direction.unwrap_or_else(|| "-".to_string())).style(style),
        ])
    });
    let widget = Table::new(
        players,
        [
            Constraint::Min(18),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["PLAYER", "STAT", "N", "AVG", "DIR"]))
    .block(page_block(Page::Trends));
    frame.render_widget(widget, split[0]);

    let teams = summary.team_trends.into_iter().map(|t| {
        let style = trend_style(t.trend_direction.as_deref());
        Row::new(vec![
            Cell::from(t.team_name),
            Cell::from(t.stat_type),
            Cell::from(t.home_away_split.unwrap_or_else(|| "-".to_string())),
            Cell::from(format_stat(t.average)),
            Cell::from(t.trend_direction.unwrap_or_else(|| "-".to_string())).style(style),
        ])
    });
    let widget = Table::new(
        teams,
        [
            Constraint::Min(18),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["TEAM", "STAT", "SPLIT", "AVG", "DIR"]))
    .block(Block::default().title("Team trends").borders(Borders::ALL));
    frame.render_widget(widget, split[1]);
}

fn render_odds(frame: &mut Frame, area: Rect, payload: &Value) {
    let rows = match models::odds_rows(payload) {
        Ok(rows) => rows,
        Err(err) => return render_unrecognized(frame, area, Page::Odds, &err),
    };
    let pct = |p: Option<f64>| {
        p.map(|p| format!("{:.1}%", p * 100.0))
            .unwrap_or_else(|| "-".to_string())
    };
    let body = rows.into_iter().map(|o| {
        Row::new(vec![
            format!("{} @ {}", o.away, o.home),
            o.commence,
            format_american(o.away_american),
            format_american(o.home_american),
            pct(o.away_prob),
            pct(o.home_prob),
            o.bookmaker,
        ])
    });
    let widget = Table::new(
        body,
        [
            Constraint::Percentage(35),
            Constraint::Length(17),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Min(8),
        ],
    )
    .header(header_row(&["MATCHUP", "TIP", "AWAY", "HOME", "P(A)", "P(H)", "BOOK"]))
    .block(page_block(Page::Odds));
    frame.render_widget(widget, area);
}

fn render_fault(frame: &mut Frame, area: Rect, page: Page, fault: &BoundaryFault) {
    let mut text = vec![
        Line::styled(
            format!("{} failed to render", page.label()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
        Line::from(fault.message.clone()),
        Line::from(""),
        Line::from("r retry render | l reload page | y copy details | q quit"),
    ];
    if let Some(detail) = &fault.detail {
        text.push(Line::from(""));
        text.extend(
            detail
                .lines()
                .take(12)
                .map(|l| Line::styled(l.to_string(), Style::default().fg(Color::DarkGray))),
        );
    }
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Error").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_diagnostics(frame: &mut Frame, area: Rect, app: &App) {
    let snapshot = app.diagnostics();
    let mut lines = vec![
        format!("token {}", snapshot.token),
        format!("request {}", snapshot.request.as_deref().unwrap_or("-")),
        format!(
            "updated {}",
            snapshot.last_updated.as_deref().unwrap_or("never")
        ),
        format!("timers {}", app.panel.active_timers()),
    ];
    if let Some(err) = &snapshot.error {
        lines.push(format!("error {err}"));
    }
    lines.push(String::new());
    let meta = snapshot.meta_lines();
    if meta.is_empty() {
        lines.push("no meta in payload".to_string());
    } else {
        lines.extend(meta);
    }
    let widget = Paragraph::new(lines.join("\n"))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Diagnostics").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Hoops Terminal - Help",
        "",
        "Pages:",
        "  1-7 / Tab    Narrative, Games, Offense, Defense, Players, Trends, Odds",
        "",
        "Data:",
        "  r            Refresh",
        "  R            Refresh bypassing backend cache",
        "  p            Pause/resume polling",
        "",
        "Narrative:",
        "  m            Toggle template/ai mode",
        "  t            Cycle trends (default/on/off)",
        "  c            Toggle compact",
        "  T            Cycle cache TTL",
        "  j/k or ↑/↓   Scroll",
        "",
        "  d            Diagnostics pane",
        "  y            Copy diagnostics",
        "  ?            Toggle help",
        "  q            Quit",
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
