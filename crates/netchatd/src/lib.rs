//! netchatd - Multi-client line chat server
//!
//! This crate provides the server side of netchat:
//! - `config` - Server configuration and its defaults
//! - `registry` - Client registry actor tracking who is online
//! - `broadcast` - Fan-out of messages to every other client
//! - `history` - Append-only transcript replayed to newcomers
//! - `banner` - Welcome banner shown on connect
//! - `server` - TCP listener and per-connection sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        netchatd                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ChatServer    │────▶│     RegistryActor           │   │
//! │  │  (TcpListener)  │     │  (who is online, names)     │   │
//! │  └────────┬────────┘     └──────────────▲──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ snapshot          │
//! │           ▼                             │                   │
//! │  ┌─────────────────┐     ┌──────────────┴──────────────┐   │
//! │  │  ChatSession    │────▶│       Broadcaster           │   │
//! │  │ (per client)    │     │  (per-recipient delivery)   │   │
//! │  └────────┬────────┘     └─────────────────────────────┘   │
//! │           │ append / replay                                 │
//! │           ▼                                                 │
//! │  ┌─────────────────┐                                        │
//! │  │  HistoryStore   │                                        │
//! │  └─────────────────┘                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod banner;
pub mod broadcast;
pub mod config;
pub mod history;
pub mod registry;
pub mod server;
