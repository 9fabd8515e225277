//! Subcommands of the sqlviz binary

pub mod graph;

#[cfg(test)]
mod tests;
