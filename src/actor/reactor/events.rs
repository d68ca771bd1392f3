pub mod app;
pub mod command;
pub mod drag;
pub mod space;
pub mod tab;
pub mod window;
