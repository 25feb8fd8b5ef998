//! Price resolution for asset types

pub mod parse;
pub mod resolver;
pub mod rules;

pub use resolver::{DEFAULT_FEED_SETTING, PriceResolver, PriceSource};
pub use rules::{ExtractionPlan, ExtractionRule, FeedSource};
