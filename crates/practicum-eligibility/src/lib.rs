//! Curricular-eligibility pipeline for practicum authorization.
//!
//! The roster of nominated candidates is pulled from a remote file server, each candidate is
//! cross-referenced against the academic-records service, and the configured eligibility rules
//! decide whether the practicum can be authorized. Previews are never persisted; confirmed
//! decisions are upserted by natural key.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
