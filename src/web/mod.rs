pub mod payload;
pub mod routes;
pub mod validate;

pub use routes::{create_router, AppState};
