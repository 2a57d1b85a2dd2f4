pub mod alert;
pub mod assignment;
pub mod backend;
pub mod categorization;
pub mod cloze;
pub mod cloze_utils;
pub mod commands;
pub mod comprehension;
pub mod config;
pub mod logging;
pub mod palette;
pub mod tui;
pub mod utils;
