//! chatbridge: bridge between a chat-protocol session and local collaborators.
//!
//! The daemon keeps one chat session open and fans it out to two local
//! integration points:
//!
//! - an external notifier command, started for inbound 1:1 messages, and
//! - a unix-socket control channel through which other processes submit
//!   outbound messages as structured actions.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────┐  inbound events  ┌──────────────┐
//!   chat server ◄───►│ ChatSession  ├─────────────────►│  dispatcher  ├──► notifier command
//!                    │   (trait)    │                  └──────┬───────┘
//!                    └─▲──────────▲─┘                        └──► chat logs
//!                send  │          │ presence pings
//!            ┌─────────┴──┐   ┌───┴───────┐
//!            │  consumer  │   │ keepalive │
//!            └─────▲──────┘   └───────────┘
//!                  │ event bus (FIFO)
//!            ┌─────┴──────┐
//!            │  listener  │◄── unix socket ◄── local processes
//!            └────────────┘
//! ```
//!
//! Five tasks run concurrently: the inbound receive loop, the control accept
//! loop, the bus consumer, the keepalive timer and the signal listener. They
//! share the session through an internally synchronized handle and observe a
//! single shutdown flag; the first fatal error wins and takes the process
//! down for an external supervisor to restart.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod bridge;
pub mod chatlog;
pub mod cli;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod keepalive;
pub mod session;
pub mod shutdown;
