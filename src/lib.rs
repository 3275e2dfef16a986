pub mod app;
pub mod archive;
pub mod config;
pub mod edition;
pub mod logging;
pub mod processor;
pub mod resume;
pub mod threads;
pub mod ui;
