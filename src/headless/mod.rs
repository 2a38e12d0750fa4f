//! Headless mode for automated testing
//!
//! Runs graveyard rounds without any graphical output.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --headless round_config.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "waves": [["Skeleton", "Skeleton"], ["Zombie", "Spider"]],
//!   "input_profile": "Desktop",
//!   "max_duration_secs": 120,
//!   "random_seed": 42
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::HeadlessRoundConfig;
pub use runner::{run_headless_round, simulate_round, simulate_round_with_log, RoundResult};
