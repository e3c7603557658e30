//! # Tutor Booking Bot
//!
//! Backend for a Telegram mini-app that books appointments on a single
//! provider's calendar.
//!
//! ## Features
//! - Book, list, reschedule and cancel appointments from the mini-app or the bot
//! - Slot uniqueness enforced by the database, safe across processes
//! - Date window and past-time validation against an injected clock
//! - Telegram notifications to the client and the administrator
//! - Persistent storage with SQLite

/// Telegram bot commands and web app data handling
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Typed errors for validation and the slot ledger
pub mod error;
/// The slot ledger, HTTP API, health checks and notifications
pub mod services;
/// Utility functions for datetime, validation, logging and message formatting
pub mod utils;
