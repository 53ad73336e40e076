//! Ingestion schema for agent action logs
//!
//! This module defines the normalized event format exchanged with collector
//! collaborators. Everything downstream in the pipeline derives from it.

pub mod raw_event;

pub use raw_event::{ActionKind, AgentKind, RawEvent, SCHEMA_VERSION};
