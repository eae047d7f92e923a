use chrono::{Duration, Local, TimeZone};
use rand::{rngs::StdRng, SeedableRng};
use todo_week::{
    actions, database,
    model::{Impact, NewReward, NewSettings, NewTodo},
    seed, Error,
};

#[test]
fn a_month_of_weeks_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("todos.sqlite");
    let defaults = NewSettings::default();
    let mut rng = StdRng::seed_from_u64(11);
    let monday = Local.with_ymd_and_hms(2026, 10, 5, 9, 0, 0).unwrap();

    {
        let conn = database::open_db(&path).unwrap();
        let report = seed::seed_defaults(&conn, &defaults, &monday).unwrap();
        assert_eq!(report.todos, 20);

        let planned = actions::generate_new_week(&conn, &defaults, &monday, &mut rng).unwrap();
        assert_eq!(planned.len(), 5);
        assert!(planned.iter().filter(|t| t.impact == Impact::High).count() <= 2);
        assert!(planned.iter().filter(|t| t.impact == Impact::Medium).count() <= 2);

        for todo in &planned {
            actions::complete_todo(&conn, todo.id, &monday).unwrap();
        }
        let err = actions::complete_todo(&conn, planned[0].id, &monday).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    // Reopen: everything survived on disk.
    let conn = database::open_db(&path).unwrap();
    let stats = actions::load_monthly_stats(&conn, &monday).unwrap();
    assert_eq!(stats.completed_todos.len(), 5);
    assert!(stats.total_points >= 25);
    assert_eq!(stats.available_points, stats.total_points);

    let next_week = monday + Duration::days(7);
    let planned = actions::generate_new_week(&conn, &defaults, &next_week, &mut rng).unwrap();
    let week = actions::load_week(&conn, &next_week).unwrap();
    assert_eq!(week.len(), planned.len());
    assert!(week.iter().all(|t| t.last_planned_week == Some(actions::current_week(&next_week))));
    for todo in &week {
        assert!(todo.can_repeat || todo.completed_at.is_none());
    }
}

#[test]
fn rewards_spend_the_month_balance() {
    let conn = database::open_in_memory().unwrap();
    let now = Local.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    for title in ["Bookkeeping", "Record a mix", "Back up sets"] {
        let todo = NewTodo {
            title: title.to_string(),
            impact: Impact::High,
            ..NewTodo::default()
        };
        actions::create_todo(&conn, &todo, &now).unwrap();
    }
    let coffee = NewReward {
        threshold_points: 50,
        reward_name: "Coffee out".to_string(),
    };
    let coffee = actions::create_reward(&conn, &coffee, &now).unwrap();

    let week = actions::generate_new_week(&conn, &NewSettings::default(), &now, &mut rng).unwrap();
    assert_eq!(week.len(), 2);
    assert!(actions::select_reward(&conn, coffee.id, &now).is_err());

    for todo in &week {
        actions::complete_todo(&conn, todo.id, &now).unwrap();
    }
    let stats = actions::load_monthly_stats(&conn, &now).unwrap();
    assert_eq!(stats.total_points, 40);
    assert!(stats.earned_rewards.is_empty());

    let third = database::fetch_todos(&conn)
        .unwrap()
        .into_iter()
        .find(|t| t.completed_at.is_none())
        .unwrap();
    actions::complete_todo(&conn, third.id, &now).unwrap();

    actions::select_reward(&conn, coffee.id, &now).unwrap();
    let claimed = actions::claim_reward(&conn, coffee.id, &now).unwrap();
    assert!(claimed.claimed);

    let stats = actions::load_monthly_stats(&conn, &now).unwrap();
    assert_eq!(stats.total_points, 60);
    assert_eq!(stats.available_points, 10);
    assert!(stats.earned_rewards.is_empty());
    assert_eq!(stats.claimed_rewards.len(), 1);
    assert!(actions::claim_reward(&conn, coffee.id, &now).is_err());
}
