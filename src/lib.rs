//! Client for a link resolving and download server.
//!
//! A link shared from a media app goes through a fixed sequence of stages:
//!
//! 1. The [link filter](link) extracts an accepted link from shared text
//! 2. The [resolver](resolver) turns it into [tracks](track) with variants
//! 3. The user picks tracks and variants through the [selection](selection)
//! 4. The [submitter](submission) submits the selections as one job
//! 5. The [monitor](monitor) follows the job's progress over a websocket
//!
//! The [`session`] module drives these stages and reports everything the
//! user should see as [`events`].
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod link;
pub mod monitor;
pub mod protocol;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod signal;
pub mod submission;
pub mod track;
