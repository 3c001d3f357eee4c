//! API handlers.

// Allow precision loss in handlers - amounts displayed are well within f64 precision
#![allow(clippy::cast_precision_loss)]

pub mod accounts;
pub mod admin;
pub mod analysis;
pub mod health;
pub mod invites;
pub mod payments;
