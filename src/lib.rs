//! emote-dash: a shareable-URL dashboard over a live emote analytics API.
//!
//! The whole view (chart settings, plotted emotes, clip cursors, the clicked
//! timestamp) lives in one JSON query parameter. [`state`] validates and
//! edits that document, [`resolve`] fills in the live/offline defaults,
//! and [`api`] fetches what the resolved queries ask for.

pub mod api;
pub mod chart;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod history;
pub mod query;
pub mod resolve;
pub mod state;
pub mod web;
