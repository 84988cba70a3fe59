// Module exports for models

pub mod countdown;
pub mod progress;
pub mod settings;
