pub mod paths;
pub mod progress;
