mod controller;
mod runner;

pub use controller::ReleaseCountdown;
pub use runner::{run_until_finished, run_until_finished_with};
