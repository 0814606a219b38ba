//! clipjoin - trim, transcode and concatenate media files
//!
//! Builds ordered ffmpeg command plans from a session (inputs, output target,
//! trim interval, codec overrides), runs them one child process at a time and
//! removes the intermediate files they leave behind.

pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod media;
pub mod plan;
pub mod cleanup;
pub mod setup;
pub mod workflow;
