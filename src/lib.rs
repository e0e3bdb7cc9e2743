pub mod config;
pub mod engine;
pub mod player;
pub mod remote;
pub mod renderer;
pub mod script;
pub mod server;
pub mod types;
