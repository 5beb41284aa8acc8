pub mod identity;
pub mod service;
pub mod types;

pub use identity::{Identity, IdentityError};
pub use service::AuthService;
