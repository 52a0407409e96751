pub mod api;
pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod data_models;
pub mod discovery;
pub mod error;
pub mod proxy;
pub mod render;
