pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod learning;
pub mod middleware;
pub mod notify;
pub mod scope;
pub mod sequence;
pub mod signing;
pub mod state;
pub mod store;
pub mod workflow;
