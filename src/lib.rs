pub mod config;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
