//! This is the library of the review bot.
pub mod github;
pub mod workflow;

#[cfg(test)]
mod tests;
