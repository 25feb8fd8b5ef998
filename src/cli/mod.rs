pub mod run;
pub mod settings;
pub mod setup;
pub mod ui;
