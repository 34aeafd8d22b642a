pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod model;
pub mod queue;
pub mod repl;
pub mod seq;
pub mod ui;
