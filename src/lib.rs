//! Gapfill library crate
//!
//! Fills `[GAP:n]` / `___` markers in short Polish marketing texts through an
//! external text-generation service, then repairs the answers: numbered-list
//! and JSON parsing, Polish case agreement, reconstruction and guardrails.
//! The binary is a thin CLI over [`pipeline::Pipeline`].

pub mod config;
pub mod domain;
pub mod fill;
pub mod gap;
pub mod grammar;
pub mod guardrails;
pub mod llm;
pub mod pipeline;
pub mod reconstruct;
pub mod util;
