pub mod camera;
pub mod config;
pub mod math;
pub mod terrain;
