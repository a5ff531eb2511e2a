pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod drain;
pub mod model;
pub mod output;
pub mod runner;
pub mod utils;

#[cfg(test)]
mod tests;
