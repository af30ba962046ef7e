/// State management module
/// 
/// This module handles all application state, including:
/// - The persistence gateway and anonymous identity (gateway.rs)
/// - Shared data structures (data.rs)
/// - The client-side project cache (cache.rs)
/// - Search, bucketing and collage selection (query.rs)
/// - The project modal's edit buffer (form.rs)

pub mod cache;
pub mod data;
pub mod form;
pub mod gateway;
pub mod query;
