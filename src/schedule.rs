mod engine;

#[cfg(test)]
mod tests;

pub use engine::{Engine, PassReport};
