// Public API surface of the bindings module.
pub mod action_binding;
pub mod action_bindings;
pub mod action_map;
pub mod activation_mode;
pub mod binds;
pub mod constants;
pub mod overrides;
pub mod translations;
