pub mod auth;
pub mod json;
pub mod response;

pub use auth::require_bearer;
pub use json::Json;
pub use response::{Ack, ApiResponse, ApiResult, Item, Listing, Saved};
