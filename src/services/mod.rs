pub mod activity;
pub mod items_service;

pub use activity::{ActivityLog, Interaction};
pub use items_service::{ItemsService, UpdateOutcome};
