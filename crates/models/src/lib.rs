pub mod errors;
pub mod db;
pub mod account;
pub mod verification_token;
pub mod password_reset_token;

#[cfg(test)]
mod tests;
