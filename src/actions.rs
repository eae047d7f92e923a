//! User actions: each one reads from the store, applies the planner or the
//! reward rules, and writes the result back.
//!
//! Steps within an action are separate statements without a transaction. A
//! failure halfway leaves whatever was already written.

use chrono::{DateTime, Local};
use rand::Rng;
use rusqlite::Connection;
use tracing::info;

use crate::accounting;
use crate::calendar::{month_bounds, week_bounds, week_of_year};
use crate::database;
use crate::error::{Error, Result};
use crate::model::{
    MonthlyStats, NewReward, NewSettings, NewTodo, Reward, RewardId, Settings, SettingsUpdate, Todo,
    TodoId, TodoUpdate,
};
use crate::selection::{self, WeekLimits};

pub const MAX_WEEKS_BETWEEN: u32 = 52;

pub fn current_week(now: &DateTime<Local>) -> u32 {
    week_of_year(now)
}

pub fn load_week(conn: &Connection, now: &DateTime<Local>) -> Result<Vec<Todo>> {
    database::fetch_weekly_todos(conn, current_week(now))
}

/// Replaces this week's plan with a fresh selection.
///
/// Todos completed this week are taken out of the current week first;
/// unfinished ones stay planned alongside the new selection.
pub fn generate_new_week<R: Rng + ?Sized>(
    conn: &Connection,
    defaults: &NewSettings,
    now: &DateTime<Local>,
    rng: &mut R,
) -> Result<Vec<Todo>> {
    let todos = database::fetch_todos(conn)?;
    let settings = database::get_or_create_settings(conn, defaults, now)?;

    let selected = selection::generate_weekly_todos(&todos, WeekLimits::from(&settings), now, rng);
    let week = current_week(now);

    let (start, end) = week_bounds(now)
        .ok_or_else(|| Error::InvalidInput(format!("no week boundaries for {now}")))?;
    database::clear_completed_from_week(conn, week, &start, &end, now)?;

    let mut planned = Vec::with_capacity(selected.len());
    for todo in &selected {
        let update = TodoUpdate {
            last_planned_week: Some(Some(week)),
            ..TodoUpdate::default()
        };
        planned.push(database::update_todo(conn, todo.id, &update, now)?);
    }

    info!(week, planned = planned.len(), "generated new week");
    Ok(planned)
}

pub fn complete_todo(conn: &Connection, id: TodoId, now: &DateTime<Local>) -> Result<Todo> {
    let todo = database::fetch_todo(conn, id)?;
    if selection::is_done_this_week(&todo, now) {
        return Err(Error::InvalidInput(format!(
            "todo {id} is already completed this week"
        )));
    }

    let update = TodoUpdate {
        completed_at: Some(Some(*now)),
        ..TodoUpdate::default()
    };
    let todo = database::update_todo(conn, id, &update, now)?;
    info!(todo_id = id, points = todo.points(), "completed todo");
    Ok(todo)
}

pub fn load_monthly_stats(conn: &Connection, now: &DateTime<Local>) -> Result<MonthlyStats> {
    let (start, end) = month_bounds(now)
        .ok_or_else(|| Error::InvalidInput(format!("no month boundaries for {now}")))?;
    let completed = database::fetch_completed_todos_between(conn, &start, &end)?;
    let rewards = database::fetch_rewards(conn)?;
    Ok(accounting::monthly_stats(&completed, &rewards, now))
}

pub fn select_reward(conn: &Connection, id: RewardId, now: &DateTime<Local>) -> Result<Reward> {
    let reward = database::fetch_reward(conn, id)?;
    let stats = load_monthly_stats(conn, now)?;

    let update = accounting::select_reward(&reward, stats.available_points, *now)?;
    if update == Default::default() {
        return Ok(reward);
    }

    let reward = database::update_reward(conn, id, &update, now)?;
    info!(reward_id = id, "selected reward");
    Ok(reward)
}

pub fn deselect_reward(conn: &Connection, id: RewardId, now: &DateTime<Local>) -> Result<Reward> {
    let reward = database::fetch_reward(conn, id)?;
    let update = accounting::deselect_reward(&reward)?;
    let reward = database::update_reward(conn, id, &update, now)?;
    info!(reward_id = id, "deselected reward");
    Ok(reward)
}

pub fn claim_reward(conn: &Connection, id: RewardId, now: &DateTime<Local>) -> Result<Reward> {
    let reward = database::fetch_reward(conn, id)?;
    let update = accounting::claim_reward(&reward, *now)?;
    let reward = database::update_reward(conn, id, &update, now)?;
    info!(reward_id = id, points = reward.threshold_points, "claimed reward");
    Ok(reward)
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("title must not be empty".to_string()));
    }
    Ok(())
}

fn validate_weeks_between(weeks: u32) -> Result<()> {
    if weeks > MAX_WEEKS_BETWEEN {
        return Err(Error::InvalidInput(format!(
            "min weeks between must be at most {MAX_WEEKS_BETWEEN}, got {weeks}"
        )));
    }
    Ok(())
}

pub fn create_todo(conn: &Connection, todo: &NewTodo, now: &DateTime<Local>) -> Result<Todo> {
    validate_title(&todo.title)?;
    validate_weeks_between(todo.min_weeks_between)?;

    let todo = NewTodo {
        title: todo.title.trim().to_string(),
        ..todo.clone()
    };
    let created = database::insert_todo(conn, &todo, now)?;
    info!(todo_id = created.id, title = %created.title, "created todo");
    Ok(created)
}

pub fn edit_todo(
    conn: &Connection,
    id: TodoId,
    update: &TodoUpdate,
    now: &DateTime<Local>,
) -> Result<Todo> {
    if let Some(title) = &update.title {
        validate_title(title)?;
    }
    if let Some(weeks) = update.min_weeks_between {
        validate_weeks_between(weeks)?;
    }

    let update = TodoUpdate {
        title: update.title.as_ref().map(|t| t.trim().to_string()),
        ..update.clone()
    };
    let todo = database::update_todo(conn, id, &update, now)?;
    info!(todo_id = id, "edited todo");
    Ok(todo)
}

pub fn toggle_todo_active(conn: &Connection, id: TodoId, now: &DateTime<Local>) -> Result<Todo> {
    let todo = database::fetch_todo(conn, id)?;
    let update = TodoUpdate {
        active: Some(!todo.active),
        ..TodoUpdate::default()
    };
    let todo = database::update_todo(conn, id, &update, now)?;
    info!(todo_id = id, active = todo.active, "toggled todo");
    Ok(todo)
}

pub fn create_reward(conn: &Connection, reward: &NewReward, now: &DateTime<Local>) -> Result<Reward> {
    if reward.threshold_points <= 0 {
        return Err(Error::InvalidInput(format!(
            "reward points must be positive, got {}",
            reward.threshold_points
        )));
    }
    validate_title(&reward.reward_name)?;

    let reward = NewReward {
        threshold_points: reward.threshold_points,
        reward_name: reward.reward_name.trim().to_string(),
    };
    let created = database::insert_reward(conn, &reward, now)?;
    info!(reward_id = created.id, name = %created.reward_name, "created reward");
    Ok(created)
}

pub fn load_settings(conn: &Connection, defaults: &NewSettings, now: &DateTime<Local>) -> Result<Settings> {
    database::get_or_create_settings(conn, defaults, now)
}

pub fn change_settings(
    conn: &Connection,
    update: &SettingsUpdate,
    defaults: &NewSettings,
    now: &DateTime<Local>,
) -> Result<Settings> {
    if update.week_size == Some(0) {
        return Err(Error::InvalidInput("week size must be at least 1".to_string()));
    }
    let settings = database::update_settings(conn, update, defaults, now)?;
    info!(
        week_size = settings.week_size,
        max_high = settings.max_high_per_week,
        max_medium = settings.max_medium_per_week,
        "changed settings"
    );
    Ok(settings)
}
