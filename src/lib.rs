//! Headless storefront widgets: a slide rotator with autoplay and an offers
//! paginator, plus a deterministic in-memory page that binds them to markup.

use std::fmt;

mod config;
mod dom;
mod html;
mod offers;
mod page;
mod scheduler;
mod selector;
mod slider;
mod style;
mod trace;
mod view;

pub use config::{OffersConfig, OffersSelectors, PageConfig, SliderConfig, SliderSelectors};
pub use dom::NodeId;
pub use offers::{OffersPaginator, DEFAULT_WINDOW};
pub use page::Page;
pub use scheduler::{Fired, PendingTimer, Scheduler, TimerHost, TimerId};
pub use slider::{
    NavKey, SlideRotator, Swipe, DEFAULT_INTERVAL_MS, DEFAULT_SWIPE_THRESHOLD,
};
pub use style::parse_translate_x_percent;
pub use view::{CardView, MemoryCardView, MemorySlideView, NavControl, SlideView};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("slide index {index} out of range (total {total})")]
    SlideOutOfRange { index: usize, total: usize },
    #[error("view error: {0}")]
    View(String),
    #[error("timer error: {0}")]
    Timer(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl Error {
    pub(crate) fn invalid_config(message: impl fmt::Display) -> Self {
        Self::InvalidConfig(message.to_string())
    }
}
