//! Household todos planned week by week, with points that buy rewards each month.

pub mod accounting;
pub mod actions;
pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod seed;
pub mod selection;
pub mod ui;

pub use error::{Error, Result};
