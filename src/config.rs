use crate::offers::DEFAULT_WINDOW;
use crate::slider::{DEFAULT_INTERVAL_MS, DEFAULT_SWIPE_THRESHOLD};
use crate::{Error, Result};

/// Where the slide rotator finds its parts in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliderSelectors {
    /// Hover and touch target.
    pub container: String,
    /// The element that gets translated.
    pub strip: String,
    pub indicator: String,
    pub prev_control: String,
    pub next_control: String,
}

impl Default for SliderSelectors {
    fn default() -> Self {
        Self {
            container: ".slide-container".into(),
            strip: ".slide-wrapper".into(),
            indicator: ".indicator-dot".into(),
            prev_control: ".slide-prev".into(),
            next_control: ".slide-next".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderConfig {
    /// `None` counts the strip's element children at bind time.
    pub total_slides: Option<usize>,
    pub interval_ms: i64,
    pub swipe_threshold: f64,
    pub autoplay: bool,
    pub selectors: SliderSelectors,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            total_slides: None,
            interval_ms: DEFAULT_INTERVAL_MS,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            autoplay: true,
            selectors: SliderSelectors::default(),
        }
    }
}

impl SliderConfig {
    pub fn with_total_slides(mut self, total_slides: usize) -> Result<Self> {
        if total_slides == 0 {
            return Err(Error::invalid_config("total_slides must be at least 1"));
        }
        self.total_slides = Some(total_slides);
        Ok(self)
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Result<Self> {
        if interval_ms <= 0 {
            return Err(Error::invalid_config(format!(
                "interval_ms must be positive, got {interval_ms}"
            )));
        }
        self.interval_ms = interval_ms;
        Ok(self)
    }

    pub fn with_swipe_threshold(mut self, threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::invalid_config(format!(
                "swipe_threshold must be finite and non-negative, got {threshold}"
            )));
        }
        self.swipe_threshold = threshold;
        Ok(self)
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_selectors(mut self, selectors: SliderSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(total) = self.total_slides {
            self.clone().with_total_slides(total)?;
        }
        self.clone()
            .with_interval_ms(self.interval_ms)?
            .with_swipe_threshold(self.swipe_threshold)
            .map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffersSelectors {
    pub container: String,
    /// Matched inside the container only.
    pub card: String,
    pub prev: String,
    pub next: String,
}

impl Default for OffersSelectors {
    fn default() -> Self {
        Self {
            container: ".carousel-container".into(),
            card: ".product-card".into(),
            prev: ".arrow.prev".into(),
            next: ".arrow.next".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffersConfig {
    pub window: usize,
    pub selectors: OffersSelectors,
}

impl Default for OffersConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            selectors: OffersSelectors::default(),
        }
    }
}

impl OffersConfig {
    pub fn with_window(mut self, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(Error::invalid_config("window must be at least 1"));
        }
        self.window = window;
        Ok(self)
    }

    pub fn with_selectors(mut self, selectors: OffersSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.clone().with_window(self.window).map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageConfig {
    pub slider: SliderConfig,
    pub offers: OffersConfig,
}

impl PageConfig {
    pub fn with_slider(mut self, slider: SliderConfig) -> Self {
        self.slider = slider;
        self
    }

    pub fn with_offers(mut self, offers: OffersConfig) -> Self {
        self.offers = offers;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.slider.validate()?;
        self.offers.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_storefront_markup() {
        let config = PageConfig::default();
        assert_eq!(config.slider.interval_ms, 5000);
        assert_eq!(config.slider.swipe_threshold, 50.0);
        assert!(config.slider.autoplay);
        assert_eq!(config.slider.selectors.strip, ".slide-wrapper");
        assert_eq!(config.offers.window, 4);
        assert_eq!(config.offers.selectors.next, ".arrow.next");
    }

    #[test]
    fn builders_reject_invalid_values() {
        assert!(SliderConfig::default().with_total_slides(0).is_err());
        assert!(SliderConfig::default().with_interval_ms(-5).is_err());
        assert!(SliderConfig::default().with_swipe_threshold(f64::INFINITY).is_err());
        assert!(OffersConfig::default().with_window(0).is_err());
    }

    #[test]
    fn validate_catches_fields_set_directly() -> Result<()> {
        let mut config = PageConfig::default();
        config.validate()?;
        config.slider.interval_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = PageConfig::default();
        config.offers.window = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        Ok(())
    }
}
