pub mod ai_utils;
pub mod api;
pub mod client;
pub mod config;
pub mod course;
pub mod db;
pub mod error;
pub mod generator;
pub mod progress;
pub mod search;
pub mod user;
pub mod utils;
