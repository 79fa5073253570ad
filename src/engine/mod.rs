pub mod assets;
pub mod device;
pub mod dirty;
