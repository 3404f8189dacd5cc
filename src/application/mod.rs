//! Application services and the contracts they require from collaborators.

pub mod repos;
pub mod rss;
pub mod syndication;
