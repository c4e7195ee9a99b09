//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports` — never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod broker;
pub mod caller_identity;
pub mod config_service;
pub mod ingress_rules;
pub mod session_runner;
pub mod target_lookup;
