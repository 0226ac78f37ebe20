use std::ops::Range;

use crate::view::{CardView, NavControl};
use crate::{Error, Result};

pub const DEFAULT_WINDOW: usize = 4;

/// Sliding window over a fixed list of product cards.
///
/// `position` is the index of the first visible card. It stays within
/// `0..=count - window`; when the list is shorter than the window, the window
/// shrinks to the list and both controls stay disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffersPaginator {
    position: usize,
    count: usize,
    window: usize,
}

impl Default for OffersPaginator {
    fn default() -> Self {
        Self::new()
    }
}

impl OffersPaginator {
    pub fn new() -> Self {
        Self {
            position: 0,
            count: 0,
            window: DEFAULT_WINDOW,
        }
    }

    pub fn with_window(mut self, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(Error::invalid_config("offers window must show at least one card"));
        }
        self.window = window;
        Ok(self)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn card_count(&self) -> usize {
        self.count
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn max_position(&self) -> usize {
        self.count.saturating_sub(self.window)
    }

    pub fn can_prev(&self) -> bool {
        self.position > 0
    }

    pub fn can_next(&self) -> bool {
        self.position < self.max_position()
    }

    pub fn visible_range(&self) -> Range<usize> {
        self.position..(self.position + self.window).min(self.count)
    }

    /// Reads the card list from the view, leaves the first window visible,
    /// hides the rest and syncs the controls.
    pub fn initialize<V: CardView + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        self.count = view.card_count();
        self.position = 0;
        for card in 0..self.count {
            if card < self.window {
                view.show_card(card)?;
            } else {
                view.hide_card(card)?;
            }
        }
        tracing::trace!(count = self.count, window = self.window, "offers initialized");
        self.sync_controls(view)
    }

    /// Moves the window one card forward. Returns whether it moved.
    pub fn next<V: CardView + ?Sized>(&mut self, view: &mut V) -> Result<bool> {
        if !self.can_next() {
            return Ok(false);
        }
        view.hide_card(self.position)?;
        view.show_card(self.position + self.window)?;
        self.position += 1;
        tracing::trace!(position = self.position, "offers moved forward");
        self.sync_controls(view)?;
        Ok(true)
    }

    /// Moves the window one card back. Returns whether it moved.
    pub fn prev<V: CardView + ?Sized>(&mut self, view: &mut V) -> Result<bool> {
        if !self.can_prev() {
            return Ok(false);
        }
        view.show_card(self.position - 1)?;
        view.hide_card(self.position + self.window - 1)?;
        self.position -= 1;
        tracing::trace!(position = self.position, "offers moved back");
        self.sync_controls(view)?;
        Ok(true)
    }

    fn sync_controls<V: CardView + ?Sized>(&self, view: &mut V) -> Result<()> {
        view.set_control_enabled(NavControl::Prev, self.can_prev())?;
        view.set_control_enabled(NavControl::Next, self.can_next())
    }
}
