//! Postscribe - forum content enrichment pipeline.
//!
//! Keeps derived, machine-readable knowledge about forum content fresh:
//! an OCR queue mirrors image-bearing content into plain-text tables, and
//! a content-hash-gated summarizer keeps structured AI summaries of posts
//! current without destroying manual edits.

pub mod cli;
pub mod config;
pub mod diff;
pub mod llm;
pub mod migrations;
pub mod models;
pub mod ocr;
pub mod repository;
pub mod schema;
pub mod services;
