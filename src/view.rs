use crate::{Error, Result};

/// Rendering surface for a [`SlideRotator`](crate::SlideRotator).
pub trait SlideView {
    fn indicator_count(&self) -> usize;

    /// Positions the slide strip; `-200` means the strip is shifted two full
    /// slide widths to the left.
    fn translate_strip(&mut self, offset_percent: i64) -> Result<()>;

    fn set_indicator_active(&mut self, indicator: usize, active: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavControl {
    Prev,
    Next,
}

/// Rendering surface for an [`OffersPaginator`](crate::OffersPaginator).
pub trait CardView {
    fn card_count(&self) -> usize;

    fn show_card(&mut self, index: usize) -> Result<()>;

    fn hide_card(&mut self, index: usize) -> Result<()>;

    fn set_control_enabled(&mut self, control: NavControl, enabled: bool) -> Result<()>;
}

/// In-memory [`SlideView`] that records what was rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySlideView {
    offset_percent: i64,
    indicators: Vec<bool>,
    renders: usize,
}

impl MemorySlideView {
    pub fn new(indicator_count: usize) -> Self {
        Self {
            offset_percent: 0,
            indicators: vec![false; indicator_count],
            renders: 0,
        }
    }

    pub fn offset_percent(&self) -> i64 {
        self.offset_percent
    }

    pub fn active_indicators(&self) -> Vec<usize> {
        self.indicators
            .iter()
            .enumerate()
            .filter_map(|(idx, active)| active.then_some(idx))
            .collect()
    }

    /// Number of strip translations performed so far.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl SlideView for MemorySlideView {
    fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    fn translate_strip(&mut self, offset_percent: i64) -> Result<()> {
        self.offset_percent = offset_percent;
        self.renders += 1;
        Ok(())
    }

    fn set_indicator_active(&mut self, indicator: usize, active: bool) -> Result<()> {
        let slot = self
            .indicators
            .get_mut(indicator)
            .ok_or_else(|| Error::View(format!("indicator {indicator} does not exist")))?;
        *slot = active;
        Ok(())
    }
}

/// In-memory [`CardView`] that records card visibility and control state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCardView {
    visible: Vec<bool>,
    prev_enabled: bool,
    next_enabled: bool,
}

impl MemoryCardView {
    /// All cards start visible and both controls enabled, like freshly loaded markup.
    pub fn new(card_count: usize) -> Self {
        Self {
            visible: vec![true; card_count],
            prev_enabled: true,
            next_enabled: true,
        }
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn visible_cards(&self) -> Vec<usize> {
        self.visible
            .iter()
            .enumerate()
            .filter_map(|(idx, visible)| visible.then_some(idx))
            .collect()
    }

    pub fn is_enabled(&self, control: NavControl) -> bool {
        match control {
            NavControl::Prev => self.prev_enabled,
            NavControl::Next => self.next_enabled,
        }
    }

    fn card_mut(&mut self, index: usize) -> Result<&mut bool> {
        self.visible
            .get_mut(index)
            .ok_or_else(|| Error::View(format!("card {index} does not exist")))
    }
}

impl CardView for MemoryCardView {
    fn card_count(&self) -> usize {
        self.visible.len()
    }

    fn show_card(&mut self, index: usize) -> Result<()> {
        *self.card_mut(index)? = true;
        Ok(())
    }

    fn hide_card(&mut self, index: usize) -> Result<()> {
        *self.card_mut(index)? = false;
        Ok(())
    }

    fn set_control_enabled(&mut self, control: NavControl, enabled: bool) -> Result<()> {
        match control {
            NavControl::Prev => self.prev_enabled = enabled,
            NavControl::Next => self.next_enabled = enabled,
        }
        Ok(())
    }
}
