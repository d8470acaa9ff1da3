pub mod app;
pub mod camera;
pub mod config;
pub mod convert;
pub mod devices;
pub mod filter;
pub mod freed;
pub mod pose;
pub mod protocol;
pub mod source;
