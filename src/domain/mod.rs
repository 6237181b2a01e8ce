// Domain layer: core models and ports (interfaces) shared by backends and filesystem clients.

pub mod model;
pub mod ports;
