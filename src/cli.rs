//! Headless commands: the same actions as the terminal UI, printed as text.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use rand::Rng;
use rusqlite::Connection;

use crate::accounting::{reward_status, RewardStatus};
use crate::actions;
use crate::database;
use crate::error::Result;
use crate::model::{
    Category, Impact, NewReward, NewSettings, NewTodo, Reward, RewardId, Settings, SettingsUpdate, Todo,
    TodoId, TodoUpdate,
};
use crate::seed;
use crate::selection::{is_done_this_week, week_points};

/// Weekly household todos with points and rewards.
#[derive(Debug, Parser)]
#[command(name = "todo-week", version, about)]
pub struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SQLite database to use instead of the configured one.
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Runs the terminal UI when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Show this week's todos.
    Week,
    /// Plan a new week.
    Generate,
    /// Mark a todo as completed.
    Complete { id: TodoId },
    /// Show this month's points and rewards.
    Month,
    /// List all todos.
    Todos,
    /// Create a todo.
    AddTodo {
        title: String,
        #[arg(long, default_value = "house")]
        category: Category,
        #[arg(long, default_value = "low")]
        impact: Impact,
        /// The todo cannot repeat once completed.
        #[arg(long)]
        once: bool,
        #[arg(long, default_value_t = 1, conflicts_with = "once")]
        min_weeks: u32,
        #[arg(long)]
        inactive: bool,
    },
    /// Change fields of a todo.
    EditTodo {
        id: TodoId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        impact: Option<Impact>,
        #[arg(long)]
        repeat: Option<bool>,
        #[arg(long)]
        min_weeks: Option<u32>,
    },
    /// Switch a todo between active and inactive.
    ToggleActive { id: TodoId },
    /// List all rewards.
    Rewards,
    /// Create a reward.
    AddReward { points: i64, name: String },
    SelectReward { id: RewardId },
    DeselectReward { id: RewardId },
    /// Redeem a selected reward. Cannot be undone.
    ClaimReward { id: RewardId },
    /// Show or change the weekly limits.
    Settings {
        #[arg(long)]
        week_size: Option<u32>,
        #[arg(long)]
        max_high: Option<u32>,
        #[arg(long)]
        max_medium: Option<u32>,
    },
    /// Fill an empty database with starter todos and rewards.
    Seed,
}

fn format_todo(todo: &Todo, now: &DateTime<Local>) -> String {
    let mark = if is_done_this_week(todo, now) { "[x]" } else { "[ ]" };
    let mut line = format!(
        "#{} {mark} {} ({}, {} {}pt)",
        todo.id,
        todo.title,
        todo.category,
        todo.impact,
        todo.points()
    );
    if todo.can_repeat {
        line.push_str(&format!(" repeats, min {} weeks", todo.min_weeks_between));
    }
    if !todo.active {
        line.push_str(" inactive");
    }
    line
}

fn format_reward(reward: &Reward, available_points: i64) -> String {
    let state = match reward_status(reward, available_points) {
        RewardStatus::Claimed => "claimed".to_string(),
        RewardStatus::Selected => "selected".to_string(),
        RewardStatus::Affordable => "affordable".to_string(),
        RewardStatus::Short { needed } => format!("{needed} more needed"),
    };
    format!(
        "#{} {} - {} points ({state})",
        reward.id, reward.reward_name, reward.threshold_points
    )
}

fn format_settings(settings: &Settings) -> String {
    format!(
        "week size {}, max high {}, max medium {}",
        settings.week_size, settings.max_high_per_week, settings.max_medium_per_week
    )
}

pub fn execute<W: Write, R: Rng + ?Sized>(
    command: Command,
    conn: &Connection,
    defaults: &NewSettings,
    now: &DateTime<Local>,
    rng: &mut R,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Week => {
            let week = actions::load_week(conn, now)?;
            writeln!(out, "Week {}: {} points", actions::current_week(now), week_points(&week, now))?;
            for todo in &week {
                writeln!(out, "{}", format_todo(todo, now))?;
            }
        }
        Command::Generate => {
            let planned = actions::generate_new_week(conn, defaults, now, rng)?;
            writeln!(out, "Planned {} todos for week {}", planned.len(), actions::current_week(now))?;
            for todo in &planned {
                writeln!(out, "{}", format_todo(todo, now))?;
            }
        }
        Command::Complete { id } => {
            let todo = actions::complete_todo(conn, id, now)?;
            writeln!(out, "Completed {} (+{} points)", todo.title, todo.points())?;
        }
        Command::Month => {
            let stats = actions::load_monthly_stats(conn, now)?;
            writeln!(
                out,
                "{}: {} available points, {} total, {} todos completed",
                now.format("%B %Y"),
                stats.available_points,
                stats.total_points,
                stats.completed_todos.len()
            )?;
            if !stats.earned_rewards.is_empty() {
                writeln!(out, "Earned rewards:")?;
                for reward in &stats.earned_rewards {
                    writeln!(out, "  {}", format_reward(reward, stats.available_points))?;
                }
            }
            for todo in &stats.completed_todos {
                let date = todo
                    .completed_at
                    .map(|at| at.format("%-d %b").to_string())
                    .unwrap_or_default();
                writeln!(out, "  {date} {} ({}pt)", todo.title, todo.points())?;
            }
            for reward in &stats.claimed_rewards {
                writeln!(out, "  claimed {}", reward.reward_name)?;
            }
        }
        Command::Todos => {
            for todo in database::fetch_todos(conn)? {
                writeln!(out, "{}", format_todo(&todo, now))?;
            }
        }
        Command::AddTodo {
            title,
            category,
            impact,
            once,
            min_weeks,
            inactive,
        } => {
            let todo = NewTodo {
                title,
                category,
                impact,
                active: !inactive,
                can_repeat: !once,
                min_weeks_between: if once { 0 } else { min_weeks },
            };
            let todo = actions::create_todo(conn, &todo, now)?;
            writeln!(out, "Created {}", format_todo(&todo, now))?;
        }
        Command::EditTodo {
            id,
            title,
            category,
            impact,
            repeat,
            min_weeks,
        } => {
            let update = TodoUpdate {
                title,
                category,
                impact,
                can_repeat: repeat,
                min_weeks_between: min_weeks,
                ..TodoUpdate::default()
            };
            let todo = actions::edit_todo(conn, id, &update, now)?;
            writeln!(out, "Updated {}", format_todo(&todo, now))?;
        }
        Command::ToggleActive { id } => {
            let todo = actions::toggle_todo_active(conn, id, now)?;
            let state = if todo.active { "active" } else { "inactive" };
            writeln!(out, "{} is now {state}", todo.title)?;
        }
        Command::Rewards => {
            let stats = actions::load_monthly_stats(conn, now)?;
            for reward in database::fetch_rewards(conn)? {
                writeln!(out, "{}", format_reward(&reward, stats.available_points))?;
            }
        }
        Command::AddReward { points, name } => {
            let reward = NewReward {
                threshold_points: points,
                reward_name: name,
            };
            let reward = actions::create_reward(conn, &reward, now)?;
            writeln!(out, "Created reward #{} {}", reward.id, reward.reward_name)?;
        }
        Command::SelectReward { id } => {
            let reward = actions::select_reward(conn, id, now)?;
            writeln!(out, "Selected {}", reward.reward_name)?;
        }
        Command::DeselectReward { id } => {
            let reward = actions::deselect_reward(conn, id, now)?;
            writeln!(out, "Deselected {}", reward.reward_name)?;
        }
        Command::ClaimReward { id } => {
            let reward = actions::claim_reward(conn, id, now)?;
            writeln!(out, "Claimed {} for {} points", reward.reward_name, reward.threshold_points)?;
        }
        Command::Settings {
            week_size,
            max_high,
            max_medium,
        } => {
            let update = SettingsUpdate {
                week_size,
                max_high_per_week: max_high,
                max_medium_per_week: max_medium,
            };
            let settings: Result<Settings> = if update.is_empty() {
                actions::load_settings(conn, defaults, now)
            } else {
                actions::change_settings(conn, &update, defaults, now)
            };
            writeln!(out, "{}", format_settings(&settings?))?;
        }
        Command::Seed => {
            let report = seed::seed_defaults(conn, defaults, now)?;
            writeln!(out, "Added {} todos and {} rewards", report.todos, report.rewards)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn run(conn: &Connection, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("todo-week").chain(args.iter().copied()))?;
        let command = cli.command.ok_or_else(|| anyhow::anyhow!("no command"))?;
        let mut rng = StdRng::seed_from_u64(3);
        let mut out = Vec::new();
        execute(command, conn, &NewSettings::default(), &now(), &mut rng, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn parses_global_options_and_enums() {
        let cli = Cli::try_parse_from([
            "todo-week",
            "--database",
            "/tmp/t.sqlite",
            "add-todo",
            "Back up sets",
            "--category",
            "dj",
            "--impact",
            "high",
        ])
        .unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/t.sqlite")));
        assert_eq!(
            cli.command,
            Some(Command::AddTodo {
                title: "Back up sets".to_string(),
                category: Category::Dj,
                impact: Impact::High,
                once: false,
                min_weeks: 1,
                inactive: false,
            })
        );
        assert!(Cli::try_parse_from(["todo-week", "add-todo", "x", "--impact", "huge"]).is_err());
    }

    #[test]
    fn once_cannot_take_a_repeat_interval() {
        assert!(Cli::try_parse_from(["todo-week", "add-todo", "Record a mix", "--once", "--min-weeks", "3"]).is_err());
        let cli = Cli::try_parse_from(["todo-week", "add-todo", "Record a mix", "--once"]).unwrap();
        assert!(matches!(cli.command, Some(Command::AddTodo { once: true, .. })));
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["todo-week"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn week_month_and_rewards_flow() {
        let conn = database::open_in_memory().unwrap();
        run(&conn, &["add-todo", "Bookkeeping", "--impact", "high", "--once"]).unwrap();
        run(&conn, &["add-reward", "20", "Coffee out"]).unwrap();

        let planned = run(&conn, &["generate"]).unwrap();
        assert!(planned.starts_with("Planned 1 todos"));
        assert!(planned.contains("Bookkeeping"));

        assert!(run(&conn, &["complete", "1"]).unwrap().contains("+20 points"));
        assert!(run(&conn, &["week"]).unwrap().contains("[x] Bookkeeping"));

        let month = run(&conn, &["month"]).unwrap();
        assert!(month.contains("20 available points"));
        assert!(month.contains("Coffee out - 20 points (affordable)"));

        run(&conn, &["select-reward", "1"]).unwrap();
        assert!(run(&conn, &["claim-reward", "1"]).unwrap().contains("Claimed Coffee out"));
        assert!(run(&conn, &["rewards"]).unwrap().contains("(claimed)"));
        assert!(run(&conn, &["month"]).unwrap().contains("0 available points"));
    }

    #[test]
    fn settings_show_and_change() {
        let conn = database::open_in_memory().unwrap();
        assert_eq!(
            run(&conn, &["settings"]).unwrap().trim(),
            "week size 5, max high 2, max medium 2"
        );
        assert_eq!(
            run(&conn, &["settings", "--week-size", "7", "--max-high", "1"])
                .unwrap()
                .trim(),
            "week size 7, max high 1, max medium 2"
        );
    }

    #[test]
    fn failures_surface_as_errors() {
        let conn = database::open_in_memory().unwrap();
        assert!(run(&conn, &["complete", "42"]).is_err());
        assert!(run(&conn, &["claim-reward", "1"]).is_err());
    }
}
