pub mod config;
pub mod error;
pub mod joint;
pub mod pipeline;
pub mod playback;
pub mod pose;
pub mod render;
pub mod tracker;
pub mod video;
