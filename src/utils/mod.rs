pub mod auth;
pub mod listing;

pub use auth::{create_token, hash_password, verify_password, verify_token, Claims};
pub use listing::{ListParams, Paginated, SortDir};
