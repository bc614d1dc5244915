pub mod handlers;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use routes::create_router;
pub use shutdown::shutdown_on;
pub use state::{AppState, JobSlot};
