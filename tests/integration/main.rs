//! Integration tests for the minute binary.
//!
//! These tests run the actual `minute` subcommands on generated inputs and check the
//! files they write.

mod helpers;
mod test_overview_command;
mod test_proxy_pipeline;
mod test_scale_command;
mod test_stats_commands;
