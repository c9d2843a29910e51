//! Signal data sources.
//!
//! Builds `SignalBundle`s from raw tweet batches ahead of the decision
//! engine.

pub mod tweets;

pub use tweets::{analyze_tweets, Tweet};
