//! Engine collaborators and the operations built on them.

pub mod audit;
pub mod auth;
pub mod batch;
pub mod canonicalize;
pub mod cards;
pub mod clock;
pub mod progress;
pub mod promote;
pub mod queue;
pub mod review;
pub mod settings;
