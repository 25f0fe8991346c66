#[cfg(test)]
pub(crate) mod memory;
pub mod model;
pub mod password;
pub mod repo;
pub mod reset_token;

pub use model::{normalize_email, NewUser, Role, User, UserError, ValidationError};
pub use repo::{PgUserStore, UserStore};
