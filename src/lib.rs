// src/lib.rs

pub mod chat;
pub mod config;
pub mod emotion;
pub mod provider;
pub mod server;
pub mod store;
