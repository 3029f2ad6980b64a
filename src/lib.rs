pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod picks;
pub mod server;
