//! rollcall-client — configuration and the attendance backend HTTP client.
//!
//! The backend is an opaque collaborator reachable through two
//! multipart/form-data endpoints: `/register` and `/attendance`.

pub mod client;
pub mod config;

pub use client::{SubmissionClient, SubmissionError, SubmissionResult};
pub use config::{Config, ConfigError};
