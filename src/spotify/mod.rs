pub mod api;
pub mod auth;

#[cfg(test)]
pub mod testing;
