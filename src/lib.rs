//! Coursewright - Conversational course-generation assistant
//!
//! This crate implements the conversation state machine that walks a user
//! from a course idea to a generated course, and the session persistence
//! that lets that conversation be paused, resumed, backtracked and moved
//! between installations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
