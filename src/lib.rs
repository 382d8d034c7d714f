//! Appliance run planner for twin-world households.
//!
//! For every appliance and every day of a planning year, decides which
//! slots the appliance runs and whether each run draws grid energy or is
//! covered by household solar, under per-day time windows.

pub mod cli;
pub mod config;
pub mod io;
pub mod logging;
pub mod model;
/// Scheduling core: bitmaps, windows, scheduler, year plans, and cost.
pub mod plan;
pub mod planner;
pub mod runner;
