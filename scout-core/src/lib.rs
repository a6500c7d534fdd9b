// scout-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod config;
pub mod emit;
pub mod errors;
pub mod executor;
pub mod host;
pub mod invocation;
pub mod merge;
pub mod normalize;
pub mod plan;
pub mod records;
pub mod skills;
pub mod stamp;
pub mod tools;
pub mod truncate;
pub mod utils;


pub use config::{load_config, LoadedConfig, ScoutConfig};
pub use errors::{InvocationError, ScoutError};
pub use host::{HostEnv, SystemHost};
pub use records::{Pattern, PatternKind, StructuredRecord};
pub use skills::{Outcome, SkillContext};
pub use tools::process::{ProcessRunner, TokioProcessRunner};

pub use async_trait::async_trait;
