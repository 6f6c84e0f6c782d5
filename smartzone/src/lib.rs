//! Smart zoning generation and validation for Cisco MDS SAN directors.
//!
//! The crate turns a declarative host/zone intent into switch configuration
//! and checks that intent against what a live switch already has.
//!
//! # Architecture
//!
//! ## Parsing
//!
//! - [`model`]: pwwn, vsan and zoning entity types
//! - [`extract`]: typed entities from `mds_config_core` trees and raw output
//!
//! ## Intent & generation
//!
//! - [`intent`]: declared hosts and zones, TOML loader
//! - [`commands`]: MDS command vocabulary and apply-mode generator
//!
//! ## Validation
//!
//! - [`session`]: command sessions (SSH shell, recorded transcripts)
//! - [`validate`]: the check state machine and its report
//! - [`validate_rules`]: text rules applied to switch output
//!
//! ## Reporting & setup
//!
//! - [`report`]: terminal rendering
//! - [`inspect`]: static dump inspection
//! - [`settings`]: TOML settings file
//! - [`logging`]: tracing subscriber setup
//!
//! # Examples
//!
//! ```ignore
//! use smartzone::intent::{IntentSource, TomlIntentSource};
//! use smartzone::model::ValidationTarget;
//! use smartzone::session::ReplaySession;
//! use smartzone::validate::{run_check, CheckOptions};
//!
//! let intent = TomlIntentSource::new("fabric_a").load("hosts.toml")?;
//! let target = ValidationTarget::new("ZS_FABRIC_A", "10".parse()?);
//! let mut session = ReplaySession::from_transcript("switch.toml".as_ref(), vec![])?;
//! let report = run_check(&mut session, &intent, &target, &CheckOptions::default())?;
//! println!("violations: {}", report.violation_count());
//! ```

pub mod commands;
pub mod extract;
pub mod inspect;
pub mod intent;
pub mod logging;
pub mod model;
pub mod report;
pub mod session;
pub mod settings;
pub mod validate;
pub mod validate_rules;
