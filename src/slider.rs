use crate::scheduler::{TimerHost, TimerId};
use crate::view::SlideView;
use crate::{Error, Result};

pub const DEFAULT_INTERVAL_MS: i64 = 5000;
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
    Other,
}

impl NavKey {
    /// Maps a `KeyboardEvent.key` value.
    pub fn from_key(key: &str) -> Self {
        match key {
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            _ => Self::Other,
        }
    }
}

/// Outcome of a completed touch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    /// Finger moved left past the threshold: next slide.
    Left,
    /// Finger moved right past the threshold: previous slide.
    Right,
    Ignored,
}

/// Cyclic slide index with autoplay and gesture handling.
///
/// The rotator owns only state. Rendering goes through a [`SlideView`] and the
/// autoplay interval through a [`TimerHost`], both passed in per call, so the
/// same instance can be driven headlessly or bound to a page.
#[derive(Debug, Clone)]
pub struct SlideRotator {
    index: usize,
    total: usize,
    interval_ms: i64,
    swipe_threshold: f64,
    autoplay: Option<TimerId>,
    touch_start_x: Option<f64>,
}

impl SlideRotator {
    pub fn new(total_slides: usize) -> Result<Self> {
        if total_slides == 0 {
            return Err(Error::invalid_config("slide rotator needs at least one slide"));
        }
        Ok(Self {
            index: 0,
            total: total_slides,
            interval_ms: DEFAULT_INTERVAL_MS,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            autoplay: None,
            touch_start_x: None,
        })
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Result<Self> {
        if interval_ms <= 0 {
            return Err(Error::invalid_config(format!(
                "autoplay interval must be positive, got {interval_ms}"
            )));
        }
        self.interval_ms = interval_ms;
        Ok(self)
    }

    pub fn with_swipe_threshold(mut self, threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::invalid_config(format!(
                "swipe threshold must be a finite non-negative distance, got {threshold}"
            )));
        }
        self.swipe_threshold = threshold;
        Ok(self)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total_slides(&self) -> usize {
        self.total
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub fn swipe_threshold(&self) -> f64 {
        self.swipe_threshold
    }

    pub fn autoplay_handle(&self) -> Option<TimerId> {
        self.autoplay
    }

    pub fn render<V: SlideView + ?Sized>(&self, view: &mut V) -> Result<()> {
        let offset = -(self.index as i64).saturating_mul(100);
        view.translate_strip(offset)?;
        for indicator in 0..view.indicator_count() {
            view.set_indicator_active(indicator, indicator == self.index)?;
        }
        Ok(())
    }

    pub fn advance<V: SlideView + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        self.index = (self.index + 1) % self.total;
        tracing::trace!(index = self.index, "slide advanced");
        self.render(view)
    }

    pub fn retreat<V: SlideView + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        self.index = (self.index + self.total - 1) % self.total;
        tracing::trace!(index = self.index, "slide retreated");
        self.render(view)
    }

    /// Jumps straight to `index`. Out-of-range targets are rejected and leave
    /// both the index and the view untouched.
    pub fn jump_to<V: SlideView + ?Sized>(&mut self, index: usize, view: &mut V) -> Result<()> {
        if index >= self.total {
            return Err(Error::SlideOutOfRange {
                index,
                total: self.total,
            });
        }
        self.index = index;
        tracing::trace!(index, "slide jumped");
        self.render(view)
    }

    /// Returns whether the key moved the rotator.
    pub fn handle_key<V: SlideView + ?Sized>(&mut self, key: NavKey, view: &mut V) -> Result<bool> {
        match key {
            NavKey::ArrowLeft => self.retreat(view)?,
            NavKey::ArrowRight => self.advance(view)?,
            NavKey::Other => return Ok(false),
        }
        Ok(true)
    }

    pub fn touch_start(&mut self, screen_x: f64) {
        self.touch_start_x = Some(screen_x);
    }

    pub fn touch_end<V: SlideView + ?Sized>(
        &mut self,
        screen_x: f64,
        view: &mut V,
    ) -> Result<Swipe> {
        let Some(start_x) = self.touch_start_x.take() else {
            return Ok(Swipe::Ignored);
        };
        let swipe = self.classify_swipe(start_x, screen_x);
        match swipe {
            Swipe::Left => self.advance(view)?,
            Swipe::Right => self.retreat(view)?,
            Swipe::Ignored => {}
        }
        Ok(swipe)
    }

    /// Distances equal to the threshold count as noise.
    pub fn classify_swipe(&self, start_x: f64, end_x: f64) -> Swipe {
        if start_x - end_x > self.swipe_threshold {
            Swipe::Left
        } else if end_x - start_x > self.swipe_threshold {
            Swipe::Right
        } else {
            Swipe::Ignored
        }
    }

    /// Arms the autoplay interval, cancelling any live one first so that at most
    /// one handle exists. The countdown always restarts from zero.
    pub fn start_autoplay<H: TimerHost + ?Sized>(&mut self, timers: &mut H) -> TimerId {
        self.stop_autoplay(timers);
        let id = timers.set_interval(self.interval_ms);
        self.autoplay = Some(id);
        tracing::trace!(%id, interval_ms = self.interval_ms, "autoplay armed");
        id
    }

    /// Returns whether a live handle was cancelled.
    pub fn stop_autoplay<H: TimerHost + ?Sized>(&mut self, timers: &mut H) -> bool {
        let Some(id) = self.autoplay.take() else {
            return false;
        };
        tracing::trace!(%id, "autoplay cancelled");
        timers.clear_timer(id)
    }

    pub fn pointer_enter<H: TimerHost + ?Sized>(&mut self, timers: &mut H) {
        self.stop_autoplay(timers);
    }

    pub fn pointer_leave<H: TimerHost + ?Sized>(&mut self, timers: &mut H) {
        self.start_autoplay(timers);
    }

    /// Advances if `id` is the live autoplay handle. Returns whether it did.
    pub fn on_timer<V: SlideView + ?Sized>(&mut self, id: TimerId, view: &mut V) -> Result<bool> {
        if self.autoplay != Some(id) {
            return Ok(false);
        }
        self.advance(view)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use crate::view::MemorySlideView;

    fn five() -> Result<(SlideRotator, MemorySlideView)> {
        Ok((SlideRotator::new(5)?, MemorySlideView::new(5)))
    }

    #[test]
    fn advance_wraps_to_first_slide() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        for _ in 0..4 {
            rotator.advance(&mut view)?;
        }
        assert_eq!(rotator.index(), 4);
        assert_eq!(view.offset_percent(), -400);

        rotator.advance(&mut view)?;
        assert_eq!(rotator.index(), 0);
        assert_eq!(view.offset_percent(), 0);
        assert_eq!(view.active_indicators(), vec![0]);
        Ok(())
    }

    #[test]
    fn retreat_from_first_slide_wraps_to_last() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        rotator.retreat(&mut view)?;
        assert_eq!(rotator.index(), 4);
        assert_eq!(view.active_indicators(), vec![4]);
        Ok(())
    }

    #[test]
    fn jump_to_rejects_out_of_range_without_rendering() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        rotator.jump_to(3, &mut view)?;
        let renders = view.renders();

        assert_eq!(
            rotator.jump_to(5, &mut view),
            Err(Error::SlideOutOfRange { index: 5, total: 5 })
        );
        assert_eq!(rotator.index(), 3);
        assert_eq!(view.renders(), renders);
        assert_eq!(view.active_indicators(), vec![3]);
        Ok(())
    }

    #[test]
    fn arrow_keys_drive_the_rotator() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        assert!(rotator.handle_key(NavKey::from_key("ArrowRight"), &mut view)?);
        assert!(rotator.handle_key(NavKey::from_key("ArrowRight"), &mut view)?);
        assert!(rotator.handle_key(NavKey::from_key("ArrowLeft"), &mut view)?);
        assert!(!rotator.handle_key(NavKey::from_key("Enter"), &mut view)?);
        assert_eq!(rotator.index(), 1);
        Ok(())
    }

    #[test]
    fn swipe_threshold_is_strict() -> Result<()> {
        let (mut rotator, mut view) = five()?;

        rotator.touch_start(200.0);
        assert_eq!(rotator.touch_end(150.0, &mut view)?, Swipe::Ignored);
        assert_eq!(rotator.index(), 0);

        rotator.touch_start(200.0);
        assert_eq!(rotator.touch_end(149.0, &mut view)?, Swipe::Left);
        assert_eq!(rotator.index(), 1);

        rotator.touch_start(100.0);
        assert_eq!(rotator.touch_end(151.0, &mut view)?, Swipe::Right);
        assert_eq!(rotator.index(), 0);
        Ok(())
    }

    #[test]
    fn touch_end_without_start_is_ignored() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        assert_eq!(rotator.touch_end(0.0, &mut view)?, Swipe::Ignored);
        rotator.touch_start(300.0);
        rotator.touch_end(300.0, &mut view)?;
        assert_eq!(rotator.touch_end(0.0, &mut view)?, Swipe::Ignored);
        assert_eq!(rotator.index(), 0);
        Ok(())
    }

    #[test]
    fn autoplay_advances_once_per_interval() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        let mut timers = Scheduler::new();
        rotator.start_autoplay(&mut timers);

        timers.advance_time(7 * DEFAULT_INTERVAL_MS, |_, fired| {
            rotator.on_timer(fired.id, &mut view).map(|_| ())
        })?;
        assert_eq!(rotator.index(), 2);
        Ok(())
    }

    #[test]
    fn pause_and_resume_keep_a_single_timer() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        let mut timers = Scheduler::new();
        let first = rotator.start_autoplay(&mut timers);

        timers.advance_time(3000, |_, _| Ok(()))?;
        rotator.pointer_enter(&mut timers);
        assert!(timers.pending_timers().is_empty());
        assert_eq!(rotator.autoplay_handle(), None);

        rotator.pointer_leave(&mut timers);
        rotator.pointer_leave(&mut timers);
        let pending = timers.pending_timers();
        assert_eq!(pending.len(), 1);
        assert_ne!(pending[0].id, first);
        // restarted, not resumed: due a full interval after the leave
        assert_eq!(pending[0].due_at, 3000 + DEFAULT_INTERVAL_MS);

        let mut fired = 0;
        timers.advance_time(2 * DEFAULT_INTERVAL_MS, |_, timer| {
            if rotator.on_timer(timer.id, &mut view)? {
                fired += 1;
            }
            Ok(())
        })?;
        assert_eq!(fired, 2);
        assert_eq!(rotator.index(), 2);
        Ok(())
    }

    #[test]
    fn stale_timer_ids_are_ignored() -> Result<()> {
        let (mut rotator, mut view) = five()?;
        let mut timers = Scheduler::new();
        let stale = rotator.start_autoplay(&mut timers);
        rotator.start_autoplay(&mut timers);
        assert!(!rotator.on_timer(stale, &mut view)?);
        assert_eq!(rotator.index(), 0);
        Ok(())
    }

    #[test]
    fn config_validation() {
        assert!(matches!(SlideRotator::new(0), Err(Error::InvalidConfig(_))));
        let rotator = SlideRotator::new(3);
        assert!(matches!(
            rotator.clone().and_then(|r| r.with_interval_ms(0)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            rotator.clone().and_then(|r| r.with_swipe_threshold(f64::NAN)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            rotator.and_then(|r| r.with_swipe_threshold(-1.0)),
            Err(Error::InvalidConfig(_))
        ));
    }
}
