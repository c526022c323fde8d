//! Service layer for the identity backend.
//! - Owns the credential and token lifecycle (register, verify, login, reset).
//! - Talks to storage only through the repository traits in `auth::repository`.
//! - Reuses entity definitions from the `models` crate for the SeaORM implementation.

pub mod auth;
#[cfg(test)]
pub mod test_support;
