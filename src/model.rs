use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub type TodoId = i64;
pub type RewardId = i64;
pub type SettingsId = i64;

/// Returned when a stored or typed enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// How heavy a task is. Each tier is worth a fixed number of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub const ALL: [Impact; 3] = [Impact::Low, Impact::Medium, Impact::High];

    pub fn points(self) -> i64 {
        match self {
            Impact::Low => 5,
            Impact::Medium => 10,
            Impact::High => 20,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }

    /// Cycles low -> medium -> high -> low, used by the management form.
    pub fn next(self) -> Impact {
        match self {
            Impact::Low => Impact::Medium,
            Impact::Medium => Impact::High,
            Impact::High => Impact::Low,
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Impact::Low),
            "medium" => Ok(Impact::Medium),
            "high" => Ok(Impact::High),
            _ => Err(ParseEnumError {
                kind: "impact",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    House,
    Dj,
    Personal,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::House, Category::Dj, Category::Personal];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::House => "house",
            Category::Dj => "dj",
            Category::Personal => "personal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::House => "House",
            Category::Dj => "DJ",
            Category::Personal => "Personal",
        }
    }

    pub fn next(self) -> Category {
        match self {
            Category::House => Category::Dj,
            Category::Dj => Category::Personal,
            Category::Personal => Category::House,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "house" => Ok(Category::House),
            "dj" => Ok(Category::Dj),
            "personal" => Ok(Category::Personal),
            _ => Err(ParseEnumError {
                kind: "category",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub category: Category,
    pub impact: Impact,
    pub active: bool,
    pub can_repeat: bool,
    pub min_weeks_between: u32,
    pub last_planned_week: Option<u32>,
    pub completed_at: Option<DateTime<Local>>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Todo {
    pub fn points(&self) -> i64 {
        self.impact.points()
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Fields supplied when creating a todo. Ids and timestamps come from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub category: Category,
    pub impact: Impact,
    pub active: bool,
    pub can_repeat: bool,
    pub min_weeks_between: u32,
}

impl Default for NewTodo {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: Category::House,
            impact: Impact::Low,
            active: true,
            can_repeat: true,
            min_weeks_between: 1,
        }
    }
}

/// Partial update of a todo. `None` leaves the column untouched; the nested
/// options on nullable columns distinguish "leave" from "set to NULL".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub impact: Option<Impact>,
    pub active: Option<bool>,
    pub can_repeat: Option<bool>,
    pub min_weeks_between: Option<u32>,
    pub last_planned_week: Option<Option<u32>>,
    pub completed_at: Option<Option<DateTime<Local>>>,
}

impl TodoUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TodoUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub id: SettingsId,
    pub week_size: u32,
    pub max_high_per_week: u32,
    pub max_medium_per_week: u32,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// Values for the singleton settings row when it is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSettings {
    pub week_size: u32,
    pub max_high_per_week: u32,
    pub max_medium_per_week: u32,
}

impl Default for NewSettings {
    fn default() -> Self {
        Self {
            week_size: 5,
            max_high_per_week: 2,
            max_medium_per_week: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub week_size: Option<u32>,
    pub max_high_per_week: Option<u32>,
    pub max_medium_per_week: Option<u32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub id: RewardId,
    pub threshold_points: i64,
    pub reward_name: String,
    pub selected: bool,
    pub selected_at: Option<DateTime<Local>>,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Local>>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReward {
    pub threshold_points: i64,
    pub reward_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardUpdate {
    pub selected: Option<bool>,
    pub selected_at: Option<Option<DateTime<Local>>>,
    pub claimed: Option<bool>,
    pub claimed_at: Option<Option<DateTime<Local>>>,
}

/// Derived monthly aggregate, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyStats {
    pub total_points: i64,
    pub available_points: i64,
    /// Most recently completed first.
    pub completed_todos: Vec<Todo>,
    pub earned_rewards: Vec<Reward>,
    /// Most recently claimed first.
    pub claimed_rewards: Vec<Reward>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_points_are_fixed() {
        assert_eq!(Impact::Low.points(), 5);
        assert_eq!(Impact::Medium.points(), 10);
        assert_eq!(Impact::High.points(), 20);
    }

    #[test]
    fn enums_parse_their_stored_names() {
        for impact in Impact::ALL {
            assert_eq!(impact.as_str().parse::<Impact>(), Ok(impact));
        }
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert_eq!("DJ".parse::<Category>(), Ok(Category::Dj));
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let err = "urgent".parse::<Impact>().unwrap_err();
        assert_eq!(err.kind, "impact");
        assert_eq!(err.to_string(), "invalid impact `urgent`");
    }

    #[test]
    fn empty_updates_are_detected() {
        assert!(TodoUpdate::default().is_empty());
        assert!(!TodoUpdate {
            last_planned_week: Some(None),
            ..TodoUpdate::default()
        }
        .is_empty());
        assert!(SettingsUpdate::default().is_empty());
    }
}
