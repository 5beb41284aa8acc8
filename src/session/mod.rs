pub mod session;

pub use session::{Session, User, UserRole};
