pub mod rss;

pub use rss::RssFeedProvider;
