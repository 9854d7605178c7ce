pub mod audit;
pub mod client;
pub mod config;
pub mod feed;
pub mod ledger;
pub mod lock;
pub mod month;
pub mod partition;
pub mod paths;
pub mod pipeline;
pub mod reconcile;

#[cfg(test)]
pub mod testing;
