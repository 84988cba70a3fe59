// Service module exports

pub mod catalog;
pub mod countdown;
pub mod notification;
pub mod progress;
pub mod scheduler;
pub mod storage;
