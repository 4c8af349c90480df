pub mod area;
pub mod change;
pub mod classify;
pub mod composite;
pub mod indices;
pub mod mask;
pub mod smoothing;
