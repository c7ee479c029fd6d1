pub mod app;
pub mod boundary;
pub mod config;
pub mod contract;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod fake_backend;
pub mod fetch;
pub mod http_client;
pub mod logging;
pub mod markdown;
pub mod models;
pub mod normalize;
pub mod panel;
pub mod prefs;
pub mod query;
pub mod schedule;
pub mod terminal;
pub mod ui;
