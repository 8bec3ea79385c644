pub mod cache;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod list;
pub mod secure_fs;
pub mod store;
pub mod sync;
