pub mod ai;
pub mod calculators;
pub mod commands;
pub mod conditions;
pub mod engine;
pub mod patterns;
pub mod resolver;
pub mod rng;
pub mod state;
pub mod targeting;

#[cfg(test)]
mod tests;
