//! Colloquy syndication service: comment feeds rendered as RSS 2.0 and
//! memoized behind a scope-tagged, request-coalescing cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
