//! Activation pipeline services — business logic over the diesel store.

pub mod bonus_service;
pub mod event_service;
pub mod meeting_service;
pub mod notify;
pub mod outcome_service;
pub mod pipeline_service;
pub mod signal_service;
pub mod slot_service;
