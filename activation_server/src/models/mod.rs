//! Activation pipeline data models.

pub mod activator;
pub mod client_event;
pub mod credit;
pub mod lifecycle;
pub mod meeting;
pub mod outcome;
pub mod pipeline;
pub mod shift;
