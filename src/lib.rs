pub mod activity;
pub mod admin;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod memory;
pub mod profiles;
pub mod state;
