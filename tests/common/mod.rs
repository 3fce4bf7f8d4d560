//! Shared constants for integration tests.

#![allow(dead_code, reason = "Not all test binaries use every helper")]

pub const TOKEN: &str = "test-bot-token";
