//! Couche workflow : enchaîne les capacités pour traiter une copie

pub mod copy_flow;

pub use copy_flow::{grade_copy, workers_for};
