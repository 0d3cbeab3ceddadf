// TabHost state managers
// Managers own the process-wide state: windows, views, persisted state, snapshot restore, the settings gate and accelerators.

pub mod persistence_manager;
pub mod restore_flow;
pub mod settings_gate;
pub mod shortcut_manager;
pub mod view_manager;
pub mod window_registry;
