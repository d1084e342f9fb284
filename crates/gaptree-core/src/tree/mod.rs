pub(crate) mod arena;
pub mod context;
pub mod error;
pub mod ids;
pub mod node;
pub mod search;
pub mod search_tree;
pub mod snapshot;
pub mod solver;

#[cfg(test)]
mod tests;
