//! Terminal UI state and key handling.
//!
//! Every key that changes data goes through [`actions`] and then reloads the
//! views. Failures are logged and shown on the status line; nothing is retried.

use std::cmp::min;

use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use rand::Rng;
use ratatui::widgets::ListState;
use rusqlite::Connection;
use tracing::error;

use crate::actions;
use crate::error::{Error, Result};
use crate::model::{MonthlyStats, NewReward, NewSettings, NewTodo, Reward, Settings, Todo};
use crate::selection::is_done_this_week;

/// Completed todos listed on the month tab until `a` expands the list.
pub const COLLAPSED_COMPLETED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Week,
    Month,
    Manage,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Week, Tab::Month, Tab::Manage];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Week => "This week",
            Tab::Month => "Month",
            Tab::Manage => "Manage",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Week => 0,
            Tab::Month => 1,
            Tab::Manage => 2,
        }
    }

    fn next(self) -> Tab {
        match self {
            Tab::Week => Tab::Month,
            Tab::Month => Tab::Manage,
            Tab::Manage => Tab::Week,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InputField {
    TodoTitle,
    TodoWeeks,
    RewardPoints,
    RewardName,
}

impl InputField {
    pub fn label(self) -> &'static str {
        match self {
            InputField::TodoTitle => "Title",
            InputField::TodoWeeks => "Min weeks between",
            InputField::RewardPoints => "Points",
            InputField::RewardName => "Reward",
        }
    }

    fn form(self) -> Mode {
        match self {
            InputField::TodoTitle | InputField::TodoWeeks => Mode::TodoForm,
            InputField::RewardPoints | InputField::RewardName => Mode::RewardForm,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    TodoForm,
    RewardForm,
    Input(InputField),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardForm {
    pub points: String,
    pub name: String,
}

pub struct App {
    pub tab: Tab,
    pub mode: Mode,
    pub input: String,
    pub todo_form: NewTodo,
    pub reward_form: RewardForm,
    pub week: Vec<Todo>,
    pub stats: MonthlyStats,
    pub todos: Vec<Todo>,
    pub rewards: Vec<Reward>,
    pub settings: Option<Settings>,
    pub week_state: ListState,
    pub month_state: ListState,
    pub manage_state: ListState,
    pub show_all_completed: bool,
    pub status: Option<String>,
    pub should_quit: bool,
    defaults: NewSettings,
}

impl App {
    pub fn new(defaults: NewSettings) -> Self {
        Self {
            tab: Tab::Week,
            mode: Mode::Browse,
            input: String::new(),
            todo_form: NewTodo::default(),
            reward_form: RewardForm::default(),
            week: vec![],
            stats: MonthlyStats::default(),
            todos: vec![],
            rewards: vec![],
            settings: None,
            week_state: ListState::default(),
            month_state: ListState::default(),
            manage_state: ListState::default(),
            show_all_completed: false,
            status: None,
            should_quit: false,
            defaults,
        }
    }

    /// Reloads every view from the store.
    pub fn refresh(&mut self, conn: &Connection, now: &DateTime<Local>) {
        let result = self.reload(conn, now);
        self.report(result, "loading data");
    }

    fn reload(&mut self, conn: &Connection, now: &DateTime<Local>) -> Result<()> {
        self.week = actions::load_week(conn, now)?;
        self.stats = actions::load_monthly_stats(conn, now)?;
        self.todos = crate::database::fetch_todos(conn)?;
        self.rewards = crate::database::fetch_rewards(conn)?;
        self.settings = Some(actions::load_settings(conn, &self.defaults, now)?);

        clamp(&mut self.week_state, self.week.len());
        clamp(&mut self.month_state, self.stats.earned_rewards.len());
        clamp(&mut self.manage_state, self.todos.len());
        Ok(())
    }

    fn report<T>(&mut self, result: Result<T>, what: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                error!(error = %err, "{what} failed");
                self.status = Some(format!("Error {what}: {err}"));
                None
            }
        }
    }

    pub fn remaining_this_week(&self, now: &DateTime<Local>) -> usize {
        self.week.iter().filter(|todo| !is_done_this_week(todo, now)).count()
    }

    pub fn done_this_week(&self, now: &DateTime<Local>) -> usize {
        self.week.len() - self.remaining_this_week(now)
    }

    pub fn handle_key<R: Rng + ?Sized>(
        &mut self,
        code: KeyCode,
        conn: &Connection,
        now: &DateTime<Local>,
        rng: &mut R,
    ) {
        match self.mode {
            Mode::Browse => self.handle_browse_key(code, conn, now, rng),
            Mode::TodoForm => self.handle_todo_form_key(code, conn, now),
            Mode::RewardForm => self.handle_reward_form_key(code, conn, now),
            Mode::Input(field) => self.handle_input_key(code, field),
        }
    }

    fn handle_browse_key<R: Rng + ?Sized>(
        &mut self,
        code: KeyCode,
        conn: &Connection,
        now: &DateTime<Local>,
        rng: &mut R,
    ) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::Char('1') => self.tab = Tab::Week,
            KeyCode::Char('2') => self.tab = Tab::Month,
            KeyCode::Char('3') => self.tab = Tab::Manage,
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),
            code => match self.tab {
                Tab::Week => self.handle_week_key(code, conn, now, rng),
                Tab::Month => self.handle_month_key(code, conn, now),
                Tab::Manage => self.handle_manage_key(code, conn, now),
            },
        }
    }

    fn handle_week_key<R: Rng + ?Sized>(
        &mut self,
        code: KeyCode,
        conn: &Connection,
        now: &DateTime<Local>,
        rng: &mut R,
    ) {
        match code {
            KeyCode::Char('g') => {
                let result = actions::generate_new_week(conn, &self.defaults, now, rng);
                if self.report(result, "generating week").is_some() {
                    self.status = None;
                    self.week_state.select(None);
                }
                self.refresh(conn, now);
            }
            KeyCode::Char('c') | KeyCode::Char(' ') => {
                let Some(todo) = selected(&self.week_state, &self.week) else {
                    return;
                };
                if is_done_this_week(todo, now) {
                    return;
                }
                let result = actions::complete_todo(conn, todo.id, now);
                if self.report(result, "completing todo").is_some() {
                    self.status = None;
                }
                self.refresh(conn, now);
            }
            _ => {}
        }
    }

    fn handle_month_key(&mut self, code: KeyCode, conn: &Connection, now: &DateTime<Local>) {
        let reward = selected(&self.month_state, &self.stats.earned_rewards).cloned();
        match code {
            KeyCode::Char('a') => self.show_all_completed = !self.show_all_completed,
            KeyCode::Char(' ') => {
                let Some(reward) = reward else {
                    return;
                };
                let result = if reward.selected {
                    actions::deselect_reward(conn, reward.id, now)
                } else {
                    actions::select_reward(conn, reward.id, now)
                };
                if self.report(result, "updating reward").is_some() {
                    self.status = None;
                }
                self.refresh(conn, now);
            }
            KeyCode::Char('c') => {
                let Some(reward) = reward else {
                    return;
                };
                let result = actions::claim_reward(conn, reward.id, now);
                if self.report(result, "claiming reward").is_some() {
                    self.status = Some(format!("Enjoy: {}", reward.reward_name));
                }
                self.refresh(conn, now);
            }
            _ => {}
        }
    }

    fn handle_manage_key(&mut self, code: KeyCode, conn: &Connection, now: &DateTime<Local>) {
        match code {
            KeyCode::Char('n') => {
                self.todo_form = NewTodo::default();
                self.mode = Mode::TodoForm;
            }
            KeyCode::Char('r') => {
                self.reward_form = RewardForm::default();
                self.mode = Mode::RewardForm;
            }
            KeyCode::Char(' ') => {
                let Some(todo) = selected(&self.manage_state, &self.todos) else {
                    return;
                };
                let result = actions::toggle_todo_active(conn, todo.id, now);
                if self.report(result, "updating todo").is_some() {
                    self.status = None;
                }
                self.refresh(conn, now);
            }
            _ => {}
        }
    }

    fn handle_todo_form_key(&mut self, code: KeyCode, conn: &Connection, now: &DateTime<Local>) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Char('t') => self.start_input(InputField::TodoTitle),
            KeyCode::Char('w') => self.start_input(InputField::TodoWeeks),
            KeyCode::Char('c') => self.todo_form.category = self.todo_form.category.next(),
            KeyCode::Char('i') => self.todo_form.impact = self.todo_form.impact.next(),
            KeyCode::Char('p') => self.todo_form.can_repeat = !self.todo_form.can_repeat,
            KeyCode::Char('a') => self.todo_form.active = !self.todo_form.active,
            KeyCode::Char('s') => {
                let result = actions::create_todo(conn, &self.todo_form, now);
                if self.report(result, "creating todo").is_some() {
                    self.status = None;
                    self.todo_form = NewTodo::default();
                    self.mode = Mode::Browse;
                }
                self.refresh(conn, now);
            }
            _ => {}
        }
    }

    fn handle_reward_form_key(&mut self, code: KeyCode, conn: &Connection, now: &DateTime<Local>) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Char('p') => self.start_input(InputField::RewardPoints),
            KeyCode::Char('t') => self.start_input(InputField::RewardName),
            KeyCode::Char('s') => {
                let result = parse_points(&self.reward_form.points).and_then(|threshold_points| {
                    let reward = NewReward {
                        threshold_points,
                        reward_name: self.reward_form.name.clone(),
                    };
                    actions::create_reward(conn, &reward, now)
                });
                if self.report(result, "creating reward").is_some() {
                    self.status = None;
                    self.reward_form = RewardForm::default();
                    self.mode = Mode::Browse;
                }
                self.refresh(conn, now);
            }
            _ => {}
        }
    }

    fn start_input(&mut self, field: InputField) {
        self.input = match field {
            InputField::TodoTitle => self.todo_form.title.clone(),
            InputField::TodoWeeks => self.todo_form.min_weeks_between.to_string(),
            InputField::RewardPoints => self.reward_form.points.clone(),
            InputField::RewardName => self.reward_form.name.clone(),
        };
        self.mode = Mode::Input(field);
    }

    fn handle_input_key(&mut self, code: KeyCode, field: InputField) {
        match code {
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => {
                self.input.clear();
                self.mode = field.form();
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.input);
                match field {
                    InputField::TodoTitle => self.todo_form.title = input,
                    InputField::TodoWeeks => match input.trim().parse::<u32>() {
                        Ok(weeks) => self.todo_form.min_weeks_between = weeks,
                        Err(_) => self.status = Some(format!("Not a number of weeks: {input}")),
                    },
                    InputField::RewardPoints => self.reward_form.points = input,
                    InputField::RewardName => self.reward_form.name = input,
                }
                self.mode = field.form();
            }
            _ => {}
        }
    }

    fn current_list(&mut self) -> (&mut ListState, usize) {
        match self.tab {
            Tab::Week => (&mut self.week_state, self.week.len()),
            Tab::Month => (&mut self.month_state, self.stats.earned_rewards.len()),
            Tab::Manage => (&mut self.manage_state, self.todos.len()),
        }
    }

    fn move_down(&mut self) {
        let (state, len) = self.current_list();
        if len == 0 {
            return;
        }
        match state.selected() {
            Some(v) => state.select(Some(min(v + 1, len - 1))),
            None => state.select(Some(0)),
        }
    }

    fn move_up(&mut self) {
        let (state, len) = self.current_list();
        if len == 0 {
            return;
        }
        match state.selected() {
            Some(0) | None => state.select(Some(0)),
            Some(v) => state.select(Some(v - 1)),
        }
    }
}

fn selected<'a, T>(state: &ListState, items: &'a [T]) -> Option<&'a T> {
    state.selected().and_then(|index| items.get(index))
}

fn clamp(state: &mut ListState, len: usize) {
    match state.selected() {
        Some(_) if len == 0 => state.select(None),
        Some(index) if index >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

fn parse_points(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("not a number of points: `{raw}`")))
}
