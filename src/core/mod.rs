pub mod attachment;
pub mod block;
pub mod config;
pub mod credentials;
pub mod error;
pub mod history;
pub mod status;
pub mod turn;

#[cfg(test)]
mod tests;
