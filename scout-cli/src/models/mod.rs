// scout-cli/src/models/mod.rs
pub mod cli;
