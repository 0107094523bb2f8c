pub mod commands;
pub mod common;
pub mod opt;
pub mod terminal;
