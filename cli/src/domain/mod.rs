//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod cidr;
pub mod config;
pub mod error;
pub mod rule;
pub mod target;

pub use cidr::CallerCidr;
pub use config::{IngressConfig, validate_config_key, validate_config_value};
pub use error::{
    BackendError, BrokerError, CommandError, ConfigError, ResolutionError, RuleError, RuleOperation,
    exit_code,
};
pub use rule::{IngressRuleSpec, RuleCondition};
pub use target::{InstanceDescription, TargetEndpoint};
