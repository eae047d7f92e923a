use std::{fs, path::Path, str::FromStr};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{
    NewReward, NewSettings, NewTodo, Reward, RewardId, RewardUpdate, Settings, SettingsUpdate, Todo,
    TodoId, TodoUpdate,
};

const TODO_COLUMNS: &str = "id, title, category, impact, active, can_repeat, min_weeks_between, \
     last_planned_week, completed_at, created_at, updated_at";
const SETTINGS_COLUMNS: &str =
    "id, week_size, max_high_per_week, max_medium_per_week, created_at, updated_at";
const REWARD_COLUMNS: &str = "id, threshold_points, reward_name, selected, selected_at, claimed, \
     claimed_at, created_at, updated_at";

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    debug!(path = %path.display(), "opened database");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_db(&conn)?;
    Ok(conn)
}

fn init_db(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS todos (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            category TEXT NOT NULL,
            impact TEXT NOT NULL,
            active BOOLEAN NOT NULL DEFAULT 1,
            can_repeat BOOLEAN NOT NULL DEFAULT 1,
            min_weeks_between INTEGER NOT NULL DEFAULT 1,
            last_planned_week INTEGER,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        params![],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY,
            week_size INTEGER NOT NULL DEFAULT 5,
            max_high_per_week INTEGER NOT NULL DEFAULT 2,
            max_medium_per_week INTEGER NOT NULL DEFAULT 2,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        params![],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rewards (
            id INTEGER PRIMARY KEY,
            threshold_points INTEGER NOT NULL,
            reward_name TEXT NOT NULL,
            selected BOOLEAN NOT NULL DEFAULT 0,
            selected_at TEXT,
            claimed BOOLEAN NOT NULL DEFAULT 0,
            claimed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        params![],
    )?;

    Ok(())
}

/// Timestamps are kept as fixed-width UTC RFC 3339 text so that string
/// comparison in SQL orders them chronologically.
fn timestamp(at: &DateTime<Local>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    parse_time(idx, &raw)
}

fn optional_time_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Local>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_time(idx, &raw))
        .transpose()
}

fn todo_from_row(row: &Row) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        category: parse_column(row, 2)?,
        impact: parse_column(row, 3)?,
        active: row.get(4)?,
        can_repeat: row.get(5)?,
        min_weeks_between: row.get(6)?,
        last_planned_week: row.get(7)?,
        completed_at: optional_time_column(row, 8)?,
        created_at: time_column(row, 9)?,
        updated_at: time_column(row, 10)?,
    })
}

fn settings_from_row(row: &Row) -> rusqlite::Result<Settings> {
    Ok(Settings {
        id: row.get(0)?,
        week_size: row.get(1)?,
        max_high_per_week: row.get(2)?,
        max_medium_per_week: row.get(3)?,
        created_at: time_column(row, 4)?,
        updated_at: time_column(row, 5)?,
    })
}

fn reward_from_row(row: &Row) -> rusqlite::Result<Reward> {
    Ok(Reward {
        id: row.get(0)?,
        threshold_points: row.get(1)?,
        reward_name: row.get(2)?,
        selected: row.get(3)?,
        selected_at: optional_time_column(row, 4)?,
        claimed: row.get(5)?,
        claimed_at: optional_time_column(row, 6)?,
        created_at: time_column(row, 7)?,
        updated_at: time_column(row, 8)?,
    })
}

fn select_todos(conn: &Connection, filter: &str, values: &[&dyn ToSql]) -> Result<Vec<Todo>> {
    let sql = format!("SELECT {TODO_COLUMNS} FROM todos {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(values, todo_from_row)?;
    let todos = rows.collect::<rusqlite::Result<Vec<Todo>>>()?;
    debug!(filter, count = todos.len(), "selected todos");
    Ok(todos)
}

/// Runs `UPDATE table SET ... WHERE id = ?` for the given columns plus
/// `updated_at`. Returns the number of rows touched.
fn update_by_id(
    conn: &Connection,
    table: &str,
    id: i64,
    mut columns: Vec<(&'static str, Box<dyn ToSql>)>,
    now: &DateTime<Local>,
) -> Result<usize> {
    columns.push(("updated_at", Box::new(timestamp(now))));

    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE {table} SET {} WHERE id = ?{}",
        assignments.join(", "),
        columns.len() + 1
    );

    let mut values: Vec<&dyn ToSql> = columns.iter().map(|(_, value)| value.as_ref()).collect();
    values.push(&id);

    let changed = conn.execute(&sql, values.as_slice())?;
    debug!(table, id, changed, "updated record");
    Ok(changed)
}

pub fn fetch_todos(conn: &Connection) -> Result<Vec<Todo>> {
    select_todos(conn, "ORDER BY created_at DESC, id DESC", &[])
}

pub fn fetch_todo(conn: &Connection, id: TodoId) -> Result<Todo> {
    let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1");
    conn.query_row(&sql, params![id], todo_from_row)
        .optional()?
        .ok_or(Error::NotFound {
            collection: "todos",
            id,
        })
}

/// Matches on the week number alone, so a todo left planned in the same week
/// of an earlier year shows up again.
pub fn fetch_weekly_todos(conn: &Connection, week: u32) -> Result<Vec<Todo>> {
    select_todos(conn, "WHERE last_planned_week = ?1 ORDER BY id", &[&week])
}

/// Todos completed in `[start, end)`.
pub fn fetch_completed_todos_between(
    conn: &Connection,
    start: &DateTime<Local>,
    end: &DateTime<Local>,
) -> Result<Vec<Todo>> {
    select_todos(
        conn,
        "WHERE completed_at IS NOT NULL AND completed_at >= ?1 AND completed_at < ?2 \
         ORDER BY completed_at DESC",
        &[&timestamp(start), &timestamp(end)],
    )
}

pub fn insert_todo(conn: &Connection, todo: &NewTodo, now: &DateTime<Local>) -> Result<Todo> {
    let created_at = timestamp(now);
    conn.execute(
        "INSERT INTO todos (title, category, impact, active, can_repeat, min_weeks_between, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            todo.title,
            todo.category.as_str(),
            todo.impact.as_str(),
            todo.active,
            todo.can_repeat,
            todo.min_weeks_between,
            created_at,
        ],
    )?;
    fetch_todo(conn, conn.last_insert_rowid())
}

pub fn update_todo(
    conn: &Connection,
    id: TodoId,
    update: &TodoUpdate,
    now: &DateTime<Local>,
) -> Result<Todo> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = vec![];
    if let Some(title) = &update.title {
        columns.push(("title", Box::new(title.clone())));
    }
    if let Some(category) = update.category {
        columns.push(("category", Box::new(category.as_str().to_string())));
    }
    if let Some(impact) = update.impact {
        columns.push(("impact", Box::new(impact.as_str().to_string())));
    }
    if let Some(active) = update.active {
        columns.push(("active", Box::new(active)));
    }
    if let Some(can_repeat) = update.can_repeat {
        columns.push(("can_repeat", Box::new(can_repeat)));
    }
    if let Some(min_weeks_between) = update.min_weeks_between {
        columns.push(("min_weeks_between", Box::new(min_weeks_between)));
    }
    if let Some(last_planned_week) = update.last_planned_week {
        columns.push(("last_planned_week", Box::new(last_planned_week)));
    }
    if let Some(completed_at) = &update.completed_at {
        columns.push(("completed_at", Box::new(completed_at.as_ref().map(timestamp))));
    }

    if update_by_id(conn, "todos", id, columns, now)? == 0 {
        return Err(Error::NotFound {
            collection: "todos",
            id,
        });
    }
    fetch_todo(conn, id)
}

/// Takes todos completed in `[start, end)` out of `week`. A todo planned again
/// after an earlier completion stays planned.
pub fn clear_completed_from_week(
    conn: &Connection,
    week: u32,
    start: &DateTime<Local>,
    end: &DateTime<Local>,
    now: &DateTime<Local>,
) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE todos SET last_planned_week = NULL, updated_at = ?4
         WHERE last_planned_week = ?1 AND completed_at >= ?2 AND completed_at < ?3",
        params![week, timestamp(start), timestamp(end), timestamp(now)],
    )?;
    debug!(week, changed, "cleared completed todos from week");
    Ok(changed)
}

pub fn fetch_settings(conn: &Connection) -> Result<Option<Settings>> {
    let sql = format!("SELECT {SETTINGS_COLUMNS} FROM settings ORDER BY id LIMIT 1");
    Ok(conn.query_row(&sql, params![], settings_from_row).optional()?)
}

/// Returns the singleton settings row, creating it from `defaults` if the
/// table is empty.
pub fn get_or_create_settings(
    conn: &Connection,
    defaults: &NewSettings,
    now: &DateTime<Local>,
) -> Result<Settings> {
    if let Some(settings) = fetch_settings(conn)? {
        return Ok(settings);
    }

    let created_at = timestamp(now);
    conn.execute(
        "INSERT INTO settings (week_size, max_high_per_week, max_medium_per_week, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            defaults.week_size,
            defaults.max_high_per_week,
            defaults.max_medium_per_week,
            created_at,
        ],
    )?;
    debug!(?defaults, "created settings row");

    let id = conn.last_insert_rowid();
    fetch_settings(conn)?.ok_or(Error::NotFound {
        collection: "settings",
        id,
    })
}

pub fn update_settings(
    conn: &Connection,
    update: &SettingsUpdate,
    defaults: &NewSettings,
    now: &DateTime<Local>,
) -> Result<Settings> {
    let settings = get_or_create_settings(conn, defaults, now)?;

    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = vec![];
    if let Some(week_size) = update.week_size {
        columns.push(("week_size", Box::new(week_size)));
    }
    if let Some(max_high) = update.max_high_per_week {
        columns.push(("max_high_per_week", Box::new(max_high)));
    }
    if let Some(max_medium) = update.max_medium_per_week {
        columns.push(("max_medium_per_week", Box::new(max_medium)));
    }

    update_by_id(conn, "settings", settings.id, columns, now)?;
    fetch_settings(conn)?.ok_or(Error::NotFound {
        collection: "settings",
        id: settings.id,
    })
}

pub fn fetch_rewards(conn: &Connection) -> Result<Vec<Reward>> {
    let sql = format!("SELECT {REWARD_COLUMNS} FROM rewards ORDER BY threshold_points ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![], reward_from_row)?;
    let rewards = rows.collect::<rusqlite::Result<Vec<Reward>>>()?;
    debug!(count = rewards.len(), "selected rewards");
    Ok(rewards)
}

pub fn fetch_reward(conn: &Connection, id: RewardId) -> Result<Reward> {
    let sql = format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE id = ?1");
    conn.query_row(&sql, params![id], reward_from_row)
        .optional()?
        .ok_or(Error::NotFound {
            collection: "rewards",
            id,
        })
}

pub fn insert_reward(conn: &Connection, reward: &NewReward, now: &DateTime<Local>) -> Result<Reward> {
    let created_at = timestamp(now);
    conn.execute(
        "INSERT INTO rewards (threshold_points, reward_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![reward.threshold_points, reward.reward_name, created_at],
    )?;
    fetch_reward(conn, conn.last_insert_rowid())
}

pub fn update_reward(
    conn: &Connection,
    id: RewardId,
    update: &RewardUpdate,
    now: &DateTime<Local>,
) -> Result<Reward> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = vec![];
    if let Some(selected) = update.selected {
        columns.push(("selected", Box::new(selected)));
    }
    if let Some(selected_at) = &update.selected_at {
        columns.push(("selected_at", Box::new(selected_at.as_ref().map(timestamp))));
    }
    if let Some(claimed) = update.claimed {
        columns.push(("claimed", Box::new(claimed)));
    }
    if let Some(claimed_at) = &update.claimed_at {
        columns.push(("claimed_at", Box::new(claimed_at.as_ref().map(timestamp))));
    }

    if update_by_id(conn, "rewards", id, columns, now)? == 0 {
        return Err(Error::NotFound {
            collection: "rewards",
            id,
        });
    }
    fetch_reward(conn, id)
}
