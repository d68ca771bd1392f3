//! The boundary to the platform: the `WindowSystem` contract, its in-memory
//! implementation, and process-level recovery.

pub mod geometry;
pub mod headless;
pub mod recovery;
pub mod signals;
pub mod window_system;
