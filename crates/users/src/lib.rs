//! Application users, mirrored from the identity provider.

pub mod user;

pub use user::{CreateUserRequest, UpdateUserRequest, User, UserId};
