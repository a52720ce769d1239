pub mod cli;
pub mod clipboard;
pub mod interrupt;
pub mod wiring;
