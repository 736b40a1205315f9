pub mod api;
pub mod auth;
pub mod booking;
pub mod config;
pub mod documents;
pub mod error;
pub mod fare;
pub mod geo;
pub mod models;
pub mod observability;
pub mod persistence;
pub mod state;
