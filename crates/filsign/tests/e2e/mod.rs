//! End-to-end tests of every operation the executor runs.

pub mod audit_test;
pub mod command_test;
pub mod market_test;
pub mod miner_test;
pub mod transfer_test;
