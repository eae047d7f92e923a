//! Starter data for a fresh database.

use chrono::{DateTime, Local};
use rusqlite::Connection;
use tracing::info;

use crate::database;
use crate::error::Result;
use crate::model::{Category, Impact, NewReward, NewSettings, NewTodo};

const REWARDS: [(i64, &str); 3] = [
    (50, "Coffee out"),
    (80, "Spend 10 euro on Bandcamp"),
    (100, "New bag"),
];

const TODOS: [(&str, Category, Impact, bool, u32); 20] = [
    ("Clean the toilet", Category::House, Impact::Low, true, 1),
    ("Mop the bathroom", Category::House, Impact::Medium, true, 2),
    ("Bookkeeping", Category::Dj, Impact::High, false, 0),
    ("Prepare Friday's set", Category::Dj, Impact::High, false, 0),
    ("20 minute walk", Category::Personal, Impact::Low, true, 1),
    ("Plan social media content", Category::Dj, Impact::Medium, true, 1),
    ("Tidy the kitchen", Category::House, Impact::Low, true, 1),
    ("Weekly groceries", Category::House, Impact::Medium, true, 1),
    ("Record a mix", Category::Dj, Impact::High, false, 0),
    ("Meditate 10 minutes", Category::Personal, Impact::Low, true, 1),
    ("Vacuum the living room", Category::House, Impact::Low, true, 1),
    ("Clean the DJ gear", Category::Dj, Impact::Medium, true, 3),
    ("Go to the gym", Category::Personal, Impact::Medium, true, 1),
    ("Catch up on admin", Category::Personal, Impact::High, true, 4),
    ("Water the plants", Category::House, Impact::Low, true, 1),
    ("Dig for new tracks", Category::Dj, Impact::Medium, true, 1),
    ("Call friends", Category::Personal, Impact::Low, true, 2),
    ("Sort out the wardrobe", Category::House, Impact::Medium, true, 8),
    ("Back up sets", Category::Dj, Impact::High, true, 4),
    ("Read a book (30 minutes)", Category::Personal, Impact::Low, true, 1),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub rewards: usize,
    pub todos: usize,
}

/// Creates the settings row and fills the reward and todo collections, each
/// only if it is still empty.
pub fn seed_defaults(conn: &Connection, defaults: &NewSettings, now: &DateTime<Local>) -> Result<SeedReport> {
    database::get_or_create_settings(conn, defaults, now)?;
    let mut report = SeedReport::default();

    if database::fetch_rewards(conn)?.is_empty() {
        for (threshold_points, name) in REWARDS {
            let reward = NewReward {
                threshold_points,
                reward_name: name.to_string(),
            };
            database::insert_reward(conn, &reward, now)?;
            report.rewards += 1;
        }
    }

    if database::fetch_todos(conn)?.is_empty() {
        for (title, category, impact, can_repeat, min_weeks_between) in TODOS {
            let todo = NewTodo {
                title: title.to_string(),
                category,
                impact,
                active: true,
                can_repeat,
                min_weeks_between,
            };
            database::insert_todo(conn, &todo, now)?;
            report.todos += 1;
        }
    }

    info!(rewards = report.rewards, todos = report.todos, "seeded database");
    Ok(report)
}
