//! Shared domain types for the Sufra ordering core.
//!
//! Everything that more than one crate needs lives here: the session and
//! cart model, the conversation state machine, menu/coverage/promo
//! models, Arabic text utilities, validators, restaurant hours, the
//! config struct, and the shared error type.

pub mod arabic;
pub mod config;
pub mod error;
pub mod fsm;
pub mod hours;
pub mod menu;
pub mod promo;
pub mod session;
pub mod tokens;
pub mod tool;

pub use error::{Error, Result};
