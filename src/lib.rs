pub mod config;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod reconciler;
pub mod routes;
pub mod state;
pub mod utils;
pub mod venues;
pub mod wallet;
