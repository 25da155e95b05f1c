//! Submint - AI Subtitle Client
//!
//! Uploads a video to a subtitle processing service, resolves the generated
//! multilingual subtitle tracks into local object URLs for playback and
//! download, and optionally registers ownership of the result with an
//! on-chain registry.

pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod mint;
pub mod playback;
pub mod resolve;
pub mod resource;
pub mod service;
pub mod session;
pub mod subtitle;
pub mod video;
pub mod workflow;
