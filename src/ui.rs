use std::io;

use chrono::{DateTime, Local};
use ratatui::{
    backend::Backend,
    layout::Rect,
    prelude::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, List, ListItem, Paragraph, Tabs},
    Frame, Terminal,
};

use crate::accounting::{reward_status, RewardStatus};
use crate::app::{App, InputField, Mode, Tab, COLLAPSED_COMPLETED};
use crate::model::{Category, Impact, Todo};
use crate::selection::{is_done_this_week, week_points};

pub fn draw<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, now: &DateTime<Local>) -> io::Result<()> {
    terminal.draw(|frame| {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Min(5),
                    Constraint::Length(1),
                ]
                .as_ref(),
            )
            .split(size);

        let tabs = Tabs::new(Tab::ALL.iter().map(|tab| tab.title()).collect::<Vec<_>>())
            .block(
                Block::default()
                    .title("Todo week")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .select(app.tab.index())
            .highlight_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, chunks[0]);

        match app.mode {
            Mode::Browse => match app.tab {
                Tab::Week => draw_week(frame, chunks[1], app, now),
                Tab::Month => draw_month(frame, chunks[1], app),
                Tab::Manage => draw_manage(frame, chunks[1], app),
            },
            Mode::TodoForm => draw_todo_form(frame, chunks[1], app),
            Mode::RewardForm => draw_reward_form(frame, chunks[1], app),
            Mode::Input(field) => draw_input(frame, chunks[1], app, field),
        }

        frame.render_widget(status_line(app), chunks[2]);
    })?;
    Ok(())
}

fn status_line(app: &App) -> Paragraph<'static> {
    match &app.status {
        Some(status) => Paragraph::new(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red),
        ))),
        None => {
            let help = match (app.mode, app.tab) {
                (Mode::Browse, Tab::Week) => "(g) new week  (c) complete  (j/k) move  (tab) switch  (q) quit",
                (Mode::Browse, Tab::Month) => "(space) select  (c) confirm  (a) all todos  (tab) switch  (q) quit",
                (Mode::Browse, Tab::Manage) => "(n) new todo  (r) new reward  (space) active  (tab) switch  (q) quit",
                (Mode::Input(_), _) => "(enter) keep  (esc) cancel",
                _ => "(s) save  (q) cancel",
            };
            Paragraph::new(Line::from(help.italic()))
        }
    }
}

fn impact_color(impact: Impact) -> Color {
    match impact {
        Impact::Low => Color::Green,
        Impact::Medium => Color::Yellow,
        Impact::High => Color::Red,
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::House => Color::Blue,
        Category::Dj => Color::Magenta,
        Category::Personal => Color::LightRed,
    }
}

fn todo_line(todo: &Todo, done: Option<bool>) -> Line<'static> {
    let mut spans = vec![];
    if let Some(done) = done {
        spans.push(Span::raw(match done {
            true => "[x] ",
            false => "[ ] ",
        }));
    }
    let title = match done {
        Some(true) => Span::styled(
            todo.title.clone(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
        ),
        _ => Span::raw(todo.title.clone()),
    };
    spans.push(title);
    spans.push(Span::styled(
        format!("  {} ", todo.category),
        Style::default().fg(category_color(todo.category)),
    ));
    spans.push(Span::styled(
        format!("{} {}pt", todo.impact, todo.points()),
        Style::default().fg(impact_color(todo.impact)),
    ));
    if todo.can_repeat {
        spans.push(Span::styled(
            format!("  repeats, min {} weeks", todo.min_weeks_between),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn draw_week<B: Backend>(frame: &mut Frame<B>, area: Rect, app: &mut App, now: &DateTime<Local>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(3),
            ]
            .as_ref(),
        )
        .split(area);

    let done = app.done_this_week(now);
    let remaining = app.remaining_this_week(now);
    let header = vec![
        Line::from(Span::styled(
            format!("{} points", week_points(&app.week, now)),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{remaining} todos left - {done} done")),
    ];
    frame.render_widget(
        Paragraph::new(header)
            .block(Block::default().title("This week").borders(Borders::ALL))
            .alignment(Alignment::Center),
        chunks[0],
    );

    let total = app.week.len();
    let ratio = if total > 0 { done as f64 / total as f64 } else { 0.0 };
    frame.render_widget(
        Gauge::default()
            .block(Block::default().title("Progress").borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(ratio)
            .label(format!("{done}/{total}")),
        chunks[1],
    );

    if app.week.is_empty() {
        let text = vec![
            Line::from("Ready for a new week?"),
            Line::from("(g) Generate a new week".green().italic()),
        ];
        frame.render_widget(
            Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center),
            chunks[2],
        );
        return;
    }

    let items: Vec<ListItem> = app
        .week
        .iter()
        .map(|todo| ListItem::new(todo_line(todo, Some(is_done_this_week(todo, now)))))
        .collect();
    let list = List::new(items)
        .block(Block::default().title("Todos").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
        .highlight_symbol(">>");
    frame.render_stateful_widget(list, chunks[2], &mut app.week_state);
}

fn draw_month<B: Backend>(frame: &mut Frame<B>, area: Rect, app: &mut App) {
    let completed_rows = if app.show_all_completed {
        app.stats.completed_todos.len()
    } else {
        app.stats.completed_todos.len().min(COLLAPSED_COMPLETED)
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Min(4),
                Constraint::Length(completed_rows as u16 + 3),
                Constraint::Length(app.stats.claimed_rewards.len() as u16 + 2),
            ]
            .as_ref(),
        )
        .split(area);

    let stats = &app.stats;
    let header = vec![
        Line::from(Span::styled(
            format!("{} available points", stats.available_points),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "Total {} points - {} todos completed",
            stats.total_points,
            stats.completed_todos.len()
        )),
    ];
    frame.render_widget(
        Paragraph::new(header)
            .block(Block::default().title("This month").borders(Borders::ALL))
            .alignment(Alignment::Center),
        chunks[0],
    );

    let available = stats.available_points;
    let reward_items: Vec<ListItem> = stats
        .earned_rewards
        .iter()
        .map(|reward| {
            let (marker, hint) = match reward_status(reward, available) {
                RewardStatus::Claimed => ("[claimed] ", String::new()),
                RewardStatus::Selected => ("[*] ", "  (c) confirm".to_string()),
                RewardStatus::Affordable => ("[ ] ", String::new()),
                RewardStatus::Short { needed } => ("[-] ", format!("  not enough points ({needed} more needed)")),
            };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::raw(reward.reward_name.clone()),
                Span::styled(
                    format!("  {} points", reward.threshold_points),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(hint, Style::default().fg(Color::Red)),
            ]))
        })
        .collect();
    let rewards_title = if stats.earned_rewards.is_empty() {
        "Earned rewards (none yet this month)"
    } else {
        "Earned rewards"
    };
    let rewards = List::new(reward_items)
        .block(Block::default().title(rewards_title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
        .highlight_symbol(">>");

    let completed_items: Vec<ListItem> = stats
        .completed_todos
        .iter()
        .take(completed_rows)
        .map(|todo| {
            let date = todo
                .completed_at
                .map(|at| at.format("%-d %b %Y").to_string())
                .unwrap_or_default();
            let mut line = todo_line(todo, None);
            line.spans.push(Span::styled(
                format!("  completed {date}"),
                Style::default().fg(Color::DarkGray),
            ));
            ListItem::new(line)
        })
        .collect();
    let completed_title = if stats.completed_todos.len() > COLLAPSED_COMPLETED {
        format!("Completed todos ({}) (a) show more/less", stats.completed_todos.len())
    } else {
        format!("Completed todos ({})", stats.completed_todos.len())
    };
    let completed = List::new(completed_items).block(Block::default().title(completed_title).borders(Borders::ALL));

    let claimed_items: Vec<ListItem> = stats
        .claimed_rewards
        .iter()
        .map(|reward| {
            let date = reward
                .claimed_at
                .map(|at| at.format("%-d %b %Y").to_string())
                .unwrap_or_default();
            ListItem::new(Line::from(Span::styled(
                format!("{} - {} points - claimed {date}", reward.reward_name, reward.threshold_points),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
            )))
        })
        .collect();
    let claimed = List::new(claimed_items).block(Block::default().title("Claimed rewards").borders(Borders::ALL));

    frame.render_stateful_widget(rewards, chunks[1], &mut app.month_state);
    frame.render_widget(completed, chunks[2]);
    frame.render_widget(claimed, chunks[3]);
}

fn draw_manage<B: Backend>(frame: &mut Frame<B>, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Min(2)].as_ref())
        .split(area);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(5)].as_ref())
        .split(chunks[1]);

    let todo_items: Vec<ListItem> = app
        .todos
        .iter()
        .map(|todo| {
            let state = match todo.active {
                true => Span::styled("active   ", Style::default().fg(Color::Green)),
                false => Span::styled("inactive ", Style::default().fg(Color::DarkGray)),
            };
            let mut line = todo_line(todo, None);
            line.spans.insert(0, state);
            ListItem::new(line)
        })
        .collect();
    let todos = List::new(todo_items)
        .block(
            Block::default()
                .title(format!("All todos ({})", app.todos.len()))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
        .highlight_symbol(">>");

    let reward_items: Vec<ListItem> = app
        .rewards
        .iter()
        .map(|reward| ListItem::new(format!("{} - {} points", reward.reward_name, reward.threshold_points)))
        .collect();
    let rewards = List::new(reward_items).block(Block::default().title("Rewards").borders(Borders::ALL));

    let settings = match &app.settings {
        Some(settings) => vec![
            Line::from(format!("Week size: {}", settings.week_size)),
            Line::from(format!("Max high impact: {}", settings.max_high_per_week)),
            Line::from(format!("Max medium impact: {}", settings.max_medium_per_week)),
        ],
        None => vec![Line::from("No settings loaded")],
    };

    frame.render_stateful_widget(todos, chunks[0], &mut app.manage_state);
    frame.render_widget(rewards, side[0]);
    frame.render_widget(
        Paragraph::new(settings).block(Block::default().title("Settings").borders(Borders::ALL)),
        side[1],
    );
}

fn field_box(title: &str, value: String) -> Paragraph<'_> {
    Paragraph::new(value)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .alignment(Alignment::Center)
}

fn draw_todo_form<B: Backend>(frame: &mut Frame<B>, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let form = &app.todo_form;
    let text = vec![
        Line::from("New todo"),
        Line::from("(t) Input title"),
        Line::from(format!("(c) Category: {}", form.category)),
        Line::from(format!("(i) Impact: {} ({}pt)", form.impact, form.impact.points())),
        Line::from(format!("(p) Repeatable: {}", if form.can_repeat { "yes" } else { "no" })),
        Line::from(format!("(w) Min weeks between: {}", form.min_weeks_between)),
        Line::from(format!("(a) Active: {}", if form.active { "yes" } else { "no" })),
        Line::from("(s) Save todo".green().italic()),
        Line::from("(q) Cancel".red()),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), chunks[0]);
    frame.render_widget(field_box("Title", form.title.clone()), chunks[1]);
    frame.render_widget(
        field_box("Min weeks between", form.min_weeks_between.to_string()),
        chunks[2],
    );
}

fn draw_reward_form<B: Backend>(frame: &mut Frame<B>, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let text = vec![
        Line::from("New reward"),
        Line::from("(p) Input points"),
        Line::from("(t) Input reward"),
        Line::from("(s) Save reward".green().italic()),
        Line::from("(q) Cancel".red()),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), chunks[0]);
    frame.render_widget(field_box("Points", app.reward_form.points.clone()), chunks[1]);
    frame.render_widget(field_box("Reward", app.reward_form.name.clone()), chunks[2]);
}

fn draw_input<B: Backend>(frame: &mut Frame<B>, area: Rect, app: &App, field: InputField) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)].as_ref())
        .split(area);

    frame.render_widget(field_box(field.label(), format!("{}_", app.input)), chunks[0]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::model::NewSettings;
    use chrono::TimeZone;
    use ratatui::backend::TestBackend;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn rendered(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[test]
    fn empty_week_offers_generation() {
        let conn = database::open_in_memory().unwrap();
        let mut app = App::new(NewSettings::default());
        app.refresh(&conn, &now());
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        draw(&mut terminal, &mut app, &now()).unwrap();
        let screen = rendered(&terminal);
        assert!(screen.contains("Generate a new week"));
        assert!(screen.contains("0 points"));
    }

    #[test]
    fn every_tab_renders() {
        let conn = database::open_in_memory().unwrap();
        crate::seed::seed_defaults(&conn, &NewSettings::default(), &now()).unwrap();
        let mut app = App::new(NewSettings::default());
        app.refresh(&conn, &now());
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        app.tab = Tab::Month;
        draw(&mut terminal, &mut app, &now()).unwrap();
        assert!(rendered(&terminal).contains("available points"));

        app.tab = Tab::Manage;
        draw(&mut terminal, &mut app, &now()).unwrap();
        let screen = rendered(&terminal);
        assert!(screen.contains("All todos (20)"));
        assert!(screen.contains("Week size: 5"));

        app.mode = Mode::TodoForm;
        draw(&mut terminal, &mut app, &now()).unwrap();
        assert!(rendered(&terminal).contains("Save todo"));
    }

    #[test]
    fn status_line_shows_errors() {
        let mut app = App::new(NewSettings::default());
        app.status = Some("Error loading data: boom".to_string());
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        draw(&mut terminal, &mut app, &now()).unwrap();
        assert!(rendered(&terminal).contains("boom"));
    }
}
