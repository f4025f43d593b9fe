//! Local web front-end that downloads a video's best video and audio streams
//! with an external downloader, merges them with ffmpeg, and streams progress
//! to the browser over server-sent events.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
