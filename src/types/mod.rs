// TabHost shared type definitions
// Each submodule defines types used across the application.

pub mod errors;
pub mod notification;
pub mod permission;
pub mod snapshot;
pub mod state;
pub mod view;
pub mod window;
