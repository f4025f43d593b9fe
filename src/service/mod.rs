pub mod hub;
pub mod muxer;
pub mod orchestrator;
pub mod parse;
pub mod rest;
pub mod runner;
pub mod utils;
