//! Accounts, roles, password hashing, session tokens and the request extractors that
//! gate every protected route.

mod domain;
mod extract;
pub mod password;
pub mod router;
mod token;

pub use domain::{Role, User, UserView};
pub use extract::{bearer_token, cookie_value, AuthUser, MaybeUser};
pub use token::{Claims, IssuedToken, TokenService};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("password must be between {min} and {max} characters")]
    WeakPassword { min: usize, max: usize },
    #[error("{0}")]
    Hashing(String),
}
