pub mod destroy;
pub mod outputs;
pub mod preview;
pub mod programs;
pub mod up;
