pub mod backup;
pub mod graph;
