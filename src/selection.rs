//! Weekly todo selection.
//!
//! A todo is eligible when it is active and, if it has been completed, it can
//! repeat and its cooldown (`min_weeks_between`) has passed. Eligible todos
//! are split per impact tier, each tier is shuffled, and the week is filled
//! with up to `max_high_per_week` high, `max_medium_per_week` medium, and low
//! impact todos for whatever is left of `week_size`.

use chrono::{DateTime, Local};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use crate::calendar::{is_same_week, weeks_since_completed};
use crate::model::{Impact, Settings, Todo};

/// Caps applied to one generated week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekLimits {
    pub week_size: usize,
    pub max_high: usize,
    pub max_medium: usize,
}

impl From<&Settings> for WeekLimits {
    fn from(settings: &Settings) -> Self {
        Self {
            week_size: settings.week_size as usize,
            max_high: settings.max_high_per_week as usize,
            max_medium: settings.max_medium_per_week as usize,
        }
    }
}

/// A todo annotated for display in the weekly list.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyTodo {
    pub todo: Todo,
    pub points: i64,
    pub is_available: bool,
    pub weeks_since_completed: i64,
}

impl WeeklyTodo {
    pub fn new(todo: Todo, now: &DateTime<Local>) -> Self {
        Self {
            points: todo.points(),
            is_available: is_available_for_selection(&todo, now),
            weeks_since_completed: weeks_since_completed(todo.completed_at.as_ref(), now),
            todo,
        }
    }
}

pub fn is_available_for_selection(todo: &Todo, now: &DateTime<Local>) -> bool {
    if !todo.active {
        return false;
    }

    let Some(completed_at) = todo.completed_at.as_ref() else {
        return true;
    };

    // One-off todos never come back, whichever month they were completed in.
    if !todo.can_repeat {
        return false;
    }

    weeks_since_completed(Some(completed_at), now) >= i64::from(todo.min_weeks_between)
}

/// Picks this week's todos from `todos`. High impact first, then medium, then low.
pub fn generate_weekly_todos<R: Rng + ?Sized>(
    todos: &[Todo],
    limits: WeekLimits,
    now: &DateTime<Local>,
    rng: &mut R,
) -> Vec<Todo> {
    let available: Vec<&Todo> = todos
        .iter()
        .filter(|todo| is_available_for_selection(todo, now))
        .collect();

    let high_cap = limits.max_high.min(limits.week_size);
    let high = pick(&available, Impact::High, high_cap, rng);

    let medium_cap = limits.max_medium.min(limits.week_size - high.len());
    let medium = pick(&available, Impact::Medium, medium_cap, rng);

    let remaining_slots = limits.week_size - high.len() - medium.len();
    let low = pick(&available, Impact::Low, remaining_slots, rng);

    debug!(
        available = available.len(),
        high = high.len(),
        medium = medium.len(),
        low = low.len(),
        "generated weekly selection"
    );

    high.into_iter().chain(medium).chain(low).collect()
}

fn pick<R: Rng + ?Sized>(available: &[&Todo], impact: Impact, cap: usize, rng: &mut R) -> Vec<Todo> {
    let mut tier: Vec<&Todo> = available
        .iter()
        .copied()
        .filter(|todo| todo.impact == impact)
        .collect();
    tier.shuffle(rng);
    tier.into_iter().take(cap).cloned().collect()
}

/// A planned todo counts as done for the week only if it was completed during
/// that week; older completions belong to the cooldown of a repeating todo.
pub fn is_done_this_week(todo: &Todo, now: &DateTime<Local>) -> bool {
    todo.completed_at
        .as_ref()
        .map_or(false, |completed_at| is_same_week(completed_at, now))
}

/// Points collected by the todos of a weekly list that are done this week.
pub fn week_points(todos: &[Todo], now: &DateTime<Local>) -> i64 {
    todos
        .iter()
        .filter(|todo| is_done_this_week(todo, now))
        .map(Todo::points)
        .sum()
}
