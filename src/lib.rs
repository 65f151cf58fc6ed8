pub mod advisor;
pub mod application;
pub mod bot;
pub mod cli;
pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

pub use domain::*;
pub use storage::Repository;
