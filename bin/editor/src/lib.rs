//! Headless flowcanvas editor.
//!
//! Composes the graph model, canvas engine, stores, and simulator into one
//! [`EditorApp`](app::EditorApp) driven from the command line.

pub mod app;
pub mod config;
pub mod error;
