// TavernaStream client library
// Release countdowns and continue-watching progress

pub mod models;
pub mod services;
pub mod utils;
