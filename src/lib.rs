pub mod cli;
pub mod config;
pub mod crud;
pub mod database;
pub mod demo;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod projection;
