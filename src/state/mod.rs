/// State management module
///
/// This module handles all application state, including:
/// - The canonical card store and sorting progress (collection.rs)
/// - Shared data structures (data.rs)

pub mod collection;
pub mod data;
