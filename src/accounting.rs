//! Monthly points and reward bookkeeping.

use chrono::{DateTime, Local};
use tracing::debug;

use crate::calendar::is_same_month;
use crate::model::{MonthlyStats, Reward, RewardId, RewardUpdate, Todo};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewardError {
    #[error("reward {0} is already claimed")]
    AlreadyClaimed(RewardId),

    #[error("reward {id} needs {needed} more points")]
    InsufficientPoints { id: RewardId, needed: i64 },

    #[error("reward {0} is not selected")]
    NotSelected(RewardId),
}

/// Where a reward stands for the current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardStatus {
    Claimed,
    Selected,
    Affordable,
    Short { needed: i64 },
}

pub fn reward_status(reward: &Reward, available_points: i64) -> RewardStatus {
    if reward.claimed {
        RewardStatus::Claimed
    } else if reward.selected {
        RewardStatus::Selected
    } else if available_points >= reward.threshold_points {
        RewardStatus::Affordable
    } else {
        RewardStatus::Short {
            needed: reward.threshold_points - available_points,
        }
    }
}

pub fn completed_in_month<'a>(todos: &'a [Todo], now: &DateTime<Local>) -> Vec<&'a Todo> {
    todos
        .iter()
        .filter(|todo| {
            todo.completed_at
                .as_ref()
                .map_or(false, |completed_at| is_same_month(completed_at, now))
        })
        .collect()
}

/// Points spent on every reward claimed so far, in any month.
pub fn spent_points(rewards: &[Reward]) -> i64 {
    rewards
        .iter()
        .filter(|reward| reward.claimed)
        .map(|reward| reward.threshold_points)
        .sum()
}

/// Builds the month overview for `now`.
///
/// Earned rewards are compared against the month's total, not against what is
/// left after earlier claims; `available_points` may go negative.
pub fn monthly_stats(todos: &[Todo], rewards: &[Reward], now: &DateTime<Local>) -> MonthlyStats {
    let mut completed_todos: Vec<Todo> = completed_in_month(todos, now).into_iter().cloned().collect();
    completed_todos.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let total_points: i64 = completed_todos.iter().map(Todo::points).sum();

    let earned_rewards: Vec<Reward> = rewards
        .iter()
        .filter(|reward| total_points >= reward.threshold_points && !reward.claimed)
        .cloned()
        .collect();

    let mut claimed_rewards: Vec<Reward> = rewards.iter().filter(|reward| reward.claimed).cloned().collect();
    claimed_rewards.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));

    let available_points = total_points - spent_points(rewards);

    debug!(
        total_points,
        available_points,
        completed = completed_todos.len(),
        earned = earned_rewards.len(),
        "computed monthly stats"
    );

    MonthlyStats {
        total_points,
        available_points,
        completed_todos,
        earned_rewards,
        claimed_rewards,
    }
}

/// Marks the intent to redeem. An already selected reward yields an empty update.
pub fn select_reward(
    reward: &Reward,
    available_points: i64,
    now: DateTime<Local>,
) -> Result<RewardUpdate, RewardError> {
    if reward.claimed {
        return Err(RewardError::AlreadyClaimed(reward.id));
    }
    if reward.selected {
        return Ok(RewardUpdate::default());
    }
    if available_points < reward.threshold_points {
        return Err(RewardError::InsufficientPoints {
            id: reward.id,
            needed: reward.threshold_points - available_points,
        });
    }

    Ok(RewardUpdate {
        selected: Some(true),
        selected_at: Some(Some(now)),
        ..RewardUpdate::default()
    })
}

pub fn deselect_reward(reward: &Reward) -> Result<RewardUpdate, RewardError> {
    if reward.claimed {
        return Err(RewardError::AlreadyClaimed(reward.id));
    }
    if !reward.selected {
        return Err(RewardError::NotSelected(reward.id));
    }

    Ok(RewardUpdate {
        selected: Some(false),
        selected_at: Some(None),
        ..RewardUpdate::default()
    })
}

/// Irreversible: a claimed reward keeps reducing the balance from now on.
pub fn claim_reward(reward: &Reward, now: DateTime<Local>) -> Result<RewardUpdate, RewardError> {
    if reward.claimed {
        return Err(RewardError::AlreadyClaimed(reward.id));
    }
    if !reward.selected {
        return Err(RewardError::NotSelected(reward.id));
    }

    Ok(RewardUpdate {
        claimed: Some(true),
        claimed_at: Some(Some(now)),
        ..RewardUpdate::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Impact};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn completed(id: i64, impact: Impact, at: Option<DateTime<Local>>) -> Todo {
        Todo {
            id,
            title: format!("todo {id}"),
            category: Category::Personal,
            impact,
            active: true,
            can_repeat: true,
            min_weeks_between: 1,
            last_planned_week: None,
            completed_at: at,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn reward(id: i64, threshold_points: i64) -> Reward {
        Reward {
            id,
            threshold_points,
            reward_name: format!("reward {id}"),
            selected: false,
            selected_at: None,
            claimed: false,
            claimed_at: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn claimed(mut reward: Reward, at: DateTime<Local>) -> Reward {
        reward.selected = true;
        reward.selected_at = Some(at);
        reward.claimed = true;
        reward.claimed_at = Some(at);
        reward
    }

    #[test]
    fn total_counts_only_this_month() {
        let todos = vec![
            completed(1, Impact::High, Some(now() - Duration::days(2))),
            completed(2, Impact::Medium, Some(now() - Duration::days(1))),
            completed(3, Impact::Low, Some(now())),
            completed(4, Impact::High, Some(now() - Duration::days(40))),
            completed(5, Impact::High, None),
        ];
        let stats = monthly_stats(&todos, &[], &now());
        assert_eq!(stats.total_points, 35);
        assert_eq!(stats.available_points, 35);
        let ids: Vec<i64> = stats.completed_todos.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn same_month_last_year_does_not_count() {
        let todos = vec![completed(1, Impact::High, Some(now() - Duration::days(365)))];
        assert_eq!(monthly_stats(&todos, &[], &now()).total_points, 0);
    }

    #[test]
    fn reward_is_earned_then_claim_reduces_balance() {
        let todos: Vec<Todo> = (1..=3)
            .map(|id| completed(id, Impact::High, Some(now() - Duration::days(1))))
            .collect();
        let rewards = vec![reward(1, 50), reward(2, 80)];
        let stats = monthly_stats(&todos, &rewards, &now());
        assert_eq!(stats.total_points, 60);
        assert_eq!(stats.earned_rewards.len(), 1);
        assert_eq!(stats.earned_rewards[0].id, 1);

        let rewards = vec![claimed(reward(1, 50), now()), reward(2, 80)];
        let stats = monthly_stats(&todos, &rewards, &now());
        assert_eq!(stats.available_points, 10);
        assert!(stats.earned_rewards.is_empty());
        assert_eq!(stats.claimed_rewards.len(), 1);
    }

    #[test]
    fn claims_keep_reducing_later_months() {
        let next_month = now() + Duration::days(31);
        let todos = vec![completed(1, Impact::Medium, Some(next_month))];
        let rewards = vec![claimed(reward(1, 50), now())];
        let stats = monthly_stats(&todos, &rewards, &next_month);
        assert_eq!(stats.total_points, 10);
        assert_eq!(stats.available_points, -40);
    }

    #[test]
    fn earned_uses_month_total_not_balance() {
        let todos: Vec<Todo> = (1..=4)
            .map(|id| completed(id, Impact::High, Some(now())))
            .collect();
        let rewards = vec![claimed(reward(1, 50), now()), reward(2, 60)];
        let stats = monthly_stats(&todos, &rewards, &now());
        assert_eq!(stats.available_points, 30);
        assert_eq!(stats.earned_rewards.len(), 1);
        assert_eq!(
            reward_status(&stats.earned_rewards[0], stats.available_points),
            RewardStatus::Short { needed: 30 }
        );
    }

    #[test]
    fn claimed_rewards_are_newest_first() {
        let rewards = vec![
            claimed(reward(1, 10), now() - Duration::days(3)),
            claimed(reward(2, 10), now()),
        ];
        let stats = monthly_stats(&[], &rewards, &now());
        let ids: Vec<i64> = stats.claimed_rewards.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn select_requires_balance() {
        let r = reward(1, 50);
        assert_eq!(
            select_reward(&r, 40, now()),
            Err(RewardError::InsufficientPoints { id: 1, needed: 10 })
        );
        let update = select_reward(&r, 50, now()).unwrap();
        assert_eq!(update.selected, Some(true));
        assert_eq!(update.selected_at, Some(Some(now())));
    }

    #[test]
    fn already_selected_reward_can_be_selected_without_balance() {
        let mut r = reward(1, 50);
        r.selected = true;
        assert_eq!(select_reward(&r, 0, now()), Ok(RewardUpdate::default()));
    }

    #[test]
    fn deselect_clears_selection() {
        let mut r = reward(1, 50);
        assert_eq!(deselect_reward(&r), Err(RewardError::NotSelected(1)));
        r.selected = true;
        let update = deselect_reward(&r).unwrap();
        assert_eq!(update.selected, Some(false));
        assert_eq!(update.selected_at, Some(None));
    }

    #[test]
    fn claim_requires_selection_and_is_final() {
        let r = reward(1, 50);
        assert_eq!(claim_reward(&r, now()), Err(RewardError::NotSelected(1)));

        let r = claimed(reward(1, 50), now());
        assert_eq!(claim_reward(&r, now()), Err(RewardError::AlreadyClaimed(1)));
        assert_eq!(deselect_reward(&r), Err(RewardError::AlreadyClaimed(1)));
        assert_eq!(select_reward(&r, 500, now()), Err(RewardError::AlreadyClaimed(1)));
    }

    #[test]
    fn status_reflects_balance() {
        let r = reward(1, 50);
        assert_eq!(reward_status(&r, 60), RewardStatus::Affordable);
        assert_eq!(reward_status(&r, 20), RewardStatus::Short { needed: 30 });
    }
}
