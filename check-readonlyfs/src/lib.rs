pub mod check;
pub mod cli;
pub mod logging;
pub mod plugin;
