//! Scenario runner for the folio preloader.
//!
//! The binary wires the simulated document to the real controller so page
//! load timelines can be replayed from the terminal.

pub mod handlers;
pub mod logging;
pub mod parser;
pub mod presentation;

pub use parser::{Cli, Commands, SimulateArgs};
