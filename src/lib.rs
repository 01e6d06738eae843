pub mod auction;
pub mod audit;
pub mod bidding;
pub mod collaborators;
pub mod config;
pub mod database;
pub mod gateway;
pub mod handlers;
pub mod query;
pub mod ratelimit;
pub mod rooms;
pub mod scheduler;
pub mod store;
