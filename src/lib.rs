//! Terminal calendar and todo list with a slot-based day timeline.

pub mod cli;
pub mod commands;
pub mod cursor;
pub mod grid;
pub mod logging;
pub mod model;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod ui;
pub mod view;
