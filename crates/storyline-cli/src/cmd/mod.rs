pub mod config;
pub mod features;
pub mod play;
pub mod timeline;
