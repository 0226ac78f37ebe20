use std::collections::HashMap;
use std::fmt;

use crate::config::{OffersConfig, PageConfig, SliderConfig};
use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::offers::OffersPaginator;
use crate::scheduler::{Fired, PendingTimer, Scheduler, TimerId};
use crate::slider::{NavKey, SlideRotator};
use crate::style::{parse_translate_x_percent, translate_x};
use crate::trace::TraceState;
use crate::view::{CardView, NavControl, SlideView};
use crate::{Error, Result};

const ACTIVE_CLASS: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EventKind {
    Click,
    MouseEnter,
    MouseLeave,
    KeyDown,
    TouchStart,
    TouchEnd,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Click => "click",
            Self::MouseEnter => "mouseenter",
            Self::MouseLeave => "mouseleave",
            Self::KeyDown => "keydown",
            Self::TouchStart => "touchstart",
            Self::TouchEnd => "touchend",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    SlideNext,
    SlidePrev,
    SlideGoTo(usize),
    SlideKey,
    PauseAutoplay,
    ResumeAutoplay,
    SwipeStart,
    SwipeEnd,
    OffersNext,
    OffersPrev,
}

#[derive(Debug, Default, Clone)]
struct ListenerStore {
    map: HashMap<NodeId, HashMap<EventKind, Vec<Action>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: EventKind, action: Action) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(action);
    }

    fn get(&self, node_id: NodeId, event: EventKind) -> Vec<Action> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(&event))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct EventState {
    kind: EventKind,
    target: NodeId,
    current_target: NodeId,
    key: Option<String>,
    screen_x: Option<f64>,
}

impl EventState {
    fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            key: None,
            screen_x: None,
        }
    }
}

#[derive(Debug, Clone)]
struct SliderBinding {
    strip: NodeId,
    indicators: Vec<NodeId>,
}

#[derive(Debug)]
struct BoundSlider {
    rotator: SlideRotator,
    binding: SliderBinding,
}

impl BoundSlider {
    fn split<'a>(&'a mut self, dom: &'a mut Dom) -> (&'a mut SlideRotator, DomSlideView<'a>) {
        let Self { rotator, binding } = self;
        (rotator, DomSlideView { dom, binding })
    }
}

#[derive(Debug, Clone)]
struct OffersBinding {
    cards: Vec<NodeId>,
    prev: NodeId,
    next: NodeId,
}

#[derive(Debug)]
struct BoundOffers {
    paginator: OffersPaginator,
    binding: OffersBinding,
}

impl BoundOffers {
    fn split<'a>(&'a mut self, dom: &'a mut Dom) -> (&'a mut OffersPaginator, DomCardView<'a>) {
        let Self { paginator, binding } = self;
        (paginator, DomCardView { dom, binding })
    }
}

/// Renders a slide rotator into the page: inline transform on the strip and the
/// `active` class on indicators.
struct DomSlideView<'a> {
    dom: &'a mut Dom,
    binding: &'a SliderBinding,
}

impl SlideView for DomSlideView<'_> {
    fn indicator_count(&self) -> usize {
        self.binding.indicators.len()
    }

    fn translate_strip(&mut self, offset_percent: i64) -> Result<()> {
        self.dom
            .style_set(self.binding.strip, "transform", &translate_x(offset_percent))
    }

    fn set_indicator_active(&mut self, indicator: usize, active: bool) -> Result<()> {
        let node = *self
            .binding
            .indicators
            .get(indicator)
            .ok_or_else(|| Error::View(format!("indicator {indicator} is not bound")))?;
        self.dom.class_toggle(node, ACTIVE_CLASS, Some(active))?;
        Ok(())
    }
}

/// Renders the offers paginator: `display: none` on hidden cards and the
/// `disabled` attribute on boundary arrows.
struct DomCardView<'a> {
    dom: &'a mut Dom,
    binding: &'a OffersBinding,
}

impl DomCardView<'_> {
    fn card(&self, index: usize) -> Result<NodeId> {
        self.binding
            .cards
            .get(index)
            .copied()
            .ok_or_else(|| Error::View(format!("card {index} is not bound")))
    }
}

impl CardView for DomCardView<'_> {
    fn card_count(&self) -> usize {
        self.binding.cards.len()
    }

    fn show_card(&mut self, index: usize) -> Result<()> {
        let card = self.card(index)?;
        self.dom.style_set(card, "display", "")
    }

    fn hide_card(&mut self, index: usize) -> Result<()> {
        let card = self.card(index)?;
        self.dom.style_set(card, "display", "none")
    }

    fn set_control_enabled(&mut self, control: NavControl, enabled: bool) -> Result<()> {
        let node = match control {
            NavControl::Prev => self.binding.prev,
            NavControl::Next => self.binding.next,
        };
        self.dom.set_disabled(node, !enabled)
    }
}

/// A storefront page held in memory with its widgets bound and running.
///
/// Input methods (`click`, `hover`, `press_key`, touch) dispatch events through
/// the page the way a browser would deliver them, and the autoplay timer runs on
/// a virtual clock that only moves through the `advance_time` family.
#[derive(Debug)]
pub struct Page {
    dom: Dom,
    listeners: ListenerStore,
    scheduler: Scheduler,
    slider: Option<BoundSlider>,
    offers: Option<BoundOffers>,
    trace: TraceState,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, PageConfig::default())
    }

    /// Parses `html` and binds every widget whose structure is present. A widget
    /// with missing structure stays unbound and ignores input.
    pub fn from_html_with_config(html: &str, config: PageConfig) -> Result<Self> {
        config.validate()?;
        let dom = parse_html(html)?;
        let mut page = Self {
            dom,
            listeners: ListenerStore::default(),
            scheduler: Scheduler::new(),
            slider: None,
            offers: None,
            trace: TraceState::default(),
        };
        page.bind_slider(&config.slider)?;
        page.bind_offers(&config.offers)?;
        Ok(page)
    }

    fn bind_slider(&mut self, config: &SliderConfig) -> Result<()> {
        let selectors = &config.selectors;
        let Some(strip) = self.dom.query_selector(&selectors.strip)? else {
            tracing::debug!(selector = %selectors.strip, "slide strip not found, slider unbound");
            return Ok(());
        };
        let total = config
            .total_slides
            .unwrap_or_else(|| self.dom.element_children(strip).len());
        if total == 0 {
            tracing::debug!("slide strip has no slides, slider unbound");
            return Ok(());
        }

        let rotator = SlideRotator::new(total)?
            .with_interval_ms(config.interval_ms)?
            .with_swipe_threshold(config.swipe_threshold)?;
        let indicators = self.dom.query_selector_all(&selectors.indicator)?;

        if let Some(container) = self.dom.query_selector(&selectors.container)? {
            // Hover only pauses and resumes a rotator that autoplays at all.
            if config.autoplay {
                self.listeners
                    .add(container, EventKind::MouseEnter, Action::PauseAutoplay);
                self.listeners
                    .add(container, EventKind::MouseLeave, Action::ResumeAutoplay);
            }
            self.listeners
                .add(container, EventKind::TouchStart, Action::SwipeStart);
            self.listeners
                .add(container, EventKind::TouchEnd, Action::SwipeEnd);
        }
        self.listeners
            .add(self.dom.root(), EventKind::KeyDown, Action::SlideKey);
        for (index, indicator) in indicators.iter().enumerate() {
            if index < total {
                self.listeners
                    .add(*indicator, EventKind::Click, Action::SlideGoTo(index));
            }
        }
        for control in self.dom.query_selector_all(&selectors.prev_control)? {
            self.listeners.add(control, EventKind::Click, Action::SlidePrev);
        }
        for control in self.dom.query_selector_all(&selectors.next_control)? {
            self.listeners.add(control, EventKind::Click, Action::SlideNext);
        }

        let mut bound = BoundSlider {
            rotator,
            binding: SliderBinding { strip, indicators },
        };
        {
            let (rotator, mut view) = bound.split(&mut self.dom);
            rotator.render(&mut view)?;
            if config.autoplay {
                rotator.start_autoplay(&mut self.scheduler);
            }
        }
        tracing::debug!(total, "slider bound");
        self.slider = Some(bound);
        Ok(())
    }

    fn bind_offers(&mut self, config: &OffersConfig) -> Result<()> {
        let selectors = &config.selectors;
        let container = self.dom.query_selector(&selectors.container)?;
        let prev = self.dom.query_selector(&selectors.prev)?;
        let next = self.dom.query_selector(&selectors.next)?;
        let (Some(container), Some(prev), Some(next)) = (container, prev, next) else {
            tracing::debug!("offers carousel structure incomplete, paginator unbound");
            return Ok(());
        };

        let cards = self.dom.query_selector_all_from(container, &selectors.card)?;
        let paginator = OffersPaginator::new().with_window(config.window)?;
        self.listeners.add(prev, EventKind::Click, Action::OffersPrev);
        self.listeners.add(next, EventKind::Click, Action::OffersNext);

        let mut bound = BoundOffers {
            paginator,
            binding: OffersBinding { cards, prev, next },
        };
        {
            let (paginator, mut view) = bound.split(&mut self.dom);
            paginator.initialize(&mut view)?;
        }
        tracing::debug!(cards = bound.binding.cards.len(), "offers paginator bound");
        self.offers = Some(bound);
        Ok(())
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.set_enabled(enabled);
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take_logs()
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.set_events(enabled);
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.set_timers(enabled);
    }

    /// Controls whether trace lines are also emitted as `tracing` events.
    pub fn set_trace_forwarding(&mut self, enabled: bool) {
        self.trace.set_forward(enabled);
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_log_limit(max_entries)
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        self.scheduler.set_timer_step_limit(max_steps)
    }

    /// Clicks the first element matching `selector`. Disabled elements swallow
    /// the click.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            self.trace
                .event_line(|| format!("[event] click swallowed by disabled {selector}"));
            return Ok(());
        }
        self.dispatch_event(EventState::new(EventKind::Click, target))
    }

    /// Moves the pointer onto the element (and so into all of its ancestors).
    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(EventState::new(EventKind::MouseEnter, target))
    }

    /// Moves the pointer off the element and out of the page.
    pub fn unhover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(EventState::new(EventKind::MouseLeave, target))
    }

    /// Delivers a `keydown` with the given `KeyboardEvent.key` to the document.
    pub fn press_key(&mut self, key: &str) -> Result<()> {
        let mut event = EventState::new(EventKind::KeyDown, self.dom.root());
        event.key = Some(key.to_string());
        self.dispatch_event(event)
    }

    pub fn touch_start(&mut self, selector: &str, screen_x: f64) -> Result<()> {
        let target = self.select_one(selector)?;
        let mut event = EventState::new(EventKind::TouchStart, target);
        event.screen_x = Some(screen_x);
        self.dispatch_event(event)
    }

    pub fn touch_end(&mut self, selector: &str, screen_x: f64) -> Result<()> {
        let target = self.select_one(selector)?;
        let mut event = EventState::new(EventKind::TouchEnd, target);
        event.screen_x = Some(screen_x);
        self.dispatch_event(event)
    }

    pub fn swipe(&mut self, selector: &str, from_x: f64, to_x: f64) -> Result<()> {
        self.touch_start(selector, from_x)?;
        self.touch_end(selector, to_x)
    }

    fn dispatch_event(&mut self, mut event: EventState) -> Result<()> {
        let mut path = Vec::new();
        let mut cursor = Some(event.target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        for node in path {
            event.current_target = node;
            for action in self.listeners.get(node, event.kind) {
                if self.trace.enabled() {
                    let target = self.trace_node_label(event.target);
                    let current = self.trace_node_label(event.current_target);
                    self.trace.event_line(|| {
                        format!(
                            "[event] {} target={target} current={current} action={action:?}",
                            event.kind
                        )
                    });
                }
                self.run_action(action, &event)?;
            }
        }
        Ok(())
    }

    fn run_action(&mut self, action: Action, event: &EventState) -> Result<()> {
        let Self {
            dom,
            scheduler,
            slider,
            offers,
            ..
        } = self;

        match action {
            Action::OffersNext | Action::OffersPrev => {
                let Some(bound) = offers.as_mut() else {
                    return Ok(());
                };
                let (paginator, mut view) = bound.split(dom);
                if action == Action::OffersNext {
                    paginator.next(&mut view)?;
                } else {
                    paginator.prev(&mut view)?;
                }
                return Ok(());
            }
            _ => {}
        }

        let Some(bound) = slider.as_mut() else {
            return Ok(());
        };
        let (rotator, mut view) = bound.split(dom);
        match action {
            Action::SlideNext => rotator.advance(&mut view)?,
            Action::SlidePrev => rotator.retreat(&mut view)?,
            Action::SlideGoTo(index) => rotator.jump_to(index, &mut view)?,
            Action::SlideKey => {
                let key = NavKey::from_key(event.key.as_deref().unwrap_or_default());
                rotator.handle_key(key, &mut view)?;
            }
            Action::PauseAutoplay => rotator.pointer_enter(scheduler),
            Action::ResumeAutoplay => rotator.pointer_leave(scheduler),
            Action::SwipeStart => {
                if let Some(screen_x) = event.screen_x {
                    rotator.touch_start(screen_x);
                }
            }
            Action::SwipeEnd => {
                if let Some(screen_x) = event.screen_x {
                    rotator.touch_end(screen_x, &mut view)?;
                }
            }
            Action::OffersNext | Action::OffersPrev => {}
        }
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending_timers()
    }

    /// The live autoplay interval, if the slider is bound and not paused.
    pub fn autoplay_timer(&self) -> Option<TimerId> {
        self.slider
            .as_ref()
            .and_then(|bound| bound.rotator.autoplay_handle())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        let from = self.scheduler.now_ms();
        let Self {
            dom,
            scheduler,
            slider,
            trace,
            ..
        } = self;
        let ran = scheduler.advance_time(delta_ms, |_, fired| {
            fire_timer(&mut *dom, &mut *slider, &mut *trace, fired)
        })?;
        let to = self.scheduler.now_ms();
        self.trace.timer_line(|| {
            format!("[timer] advance delta_ms={delta_ms} from={from} to={to} ran_due={ran}")
        });
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.scheduler.now_ms();
        let Self {
            dom,
            scheduler,
            slider,
            trace,
            ..
        } = self;
        let ran = scheduler.advance_time_to(target_ms, |_, fired| {
            fire_timer(&mut *dom, &mut *slider, &mut *trace, fired)
        })?;
        self.trace.timer_line(|| {
            format!("[timer] advance_to from={from} to={target_ms} ran_due={ran}")
        });
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let Self {
            dom,
            scheduler,
            slider,
            trace,
            ..
        } = self;
        let ran = scheduler.run_due_timers(|_, fired| {
            fire_timer(&mut *dom, &mut *slider, &mut *trace, fired)
        })?;
        let now = self.scheduler.now_ms();
        self.trace
            .timer_line(|| format!("[timer] run_due now_ms={now} ran={ran}"));
        Ok(ran)
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Self {
            dom,
            scheduler,
            slider,
            trace,
            ..
        } = self;
        scheduler.run_next_timer(|_, fired| {
            fire_timer(&mut *dom, &mut *slider, &mut *trace, fired)
        })
    }

    /// Runs the timer queue until it is empty. With autoplay armed this never
    /// drains and fails once the step limit is hit.
    pub fn flush(&mut self) -> Result<()> {
        let Self {
            dom,
            scheduler,
            slider,
            trace,
            ..
        } = self;
        let ran =
            scheduler.flush(|_, fired| fire_timer(&mut *dom, &mut *slider, &mut *trace, fired))?;
        self.trace.timer_line(|| format!("[timer] flush ran={ran}"));
        Ok(())
    }

    pub fn current_slide(&self) -> Option<usize> {
        self.slider.as_ref().map(|bound| bound.rotator.index())
    }

    pub fn total_slides(&self) -> Option<usize> {
        self.slider.as_ref().map(|bound| bound.rotator.total_slides())
    }

    pub fn offers_position(&self) -> Option<usize> {
        self.offers.as_ref().map(|bound| bound.paginator.position())
    }

    /// The strip's current `translateX` percentage as rendered in the page.
    pub fn slide_offset_percent(&self) -> Option<f64> {
        let bound = self.slider.as_ref()?;
        let transform = self
            .dom
            .style_get(bound.binding.strip, "transform")
            .ok()?;
        parse_translate_x_percent(&transform)
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.class_contains(target, class_name)
    }

    pub fn is_disabled(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.dom.disabled(target))
    }

    /// Whether the first element matching `selector` also matches `candidate`.
    pub fn matches(&self, selector: &str, candidate: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.matches_selector(target, candidate)
    }

    /// Whether neither the element nor any ancestor carries an inline
    /// `display: none`.
    pub fn is_displayed(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.node_displayed(target))
    }

    /// Number of elements matching `selector` that are displayed.
    pub fn displayed_count(&self, selector: &str) -> Result<usize> {
        Ok(self
            .dom
            .query_selector_all(selector)?
            .into_iter()
            .filter(|node| self.node_displayed(*node))
            .count())
    }

    fn node_displayed(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.dom.element(current).is_some()
                && self
                    .dom
                    .style_get(current, "display")
                    .is_ok_and(|display| display.eq_ignore_ascii_case("none"))
            {
                return false;
            }
            cursor = self.dom.parent(current);
        }
        true
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name)?;
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                format!("class {class_name} present={expected}"),
                format!("present={actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_disabled(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.disabled(target);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                format!("disabled={expected}"),
                format!("disabled={actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_displayed(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.node_displayed(target);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                format!("displayed={expected}"),
                format!("displayed={actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected.to_string(), actual));
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector).map(|_| ())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn assertion_failed(
        &self,
        selector: &str,
        target: NodeId,
        expected: String,
        actual: String,
    ) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected,
            actual,
            dom_snippet: self.node_snippet(target),
        }
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn trace_node_label(&self, node: NodeId) -> String {
        if let Some(id) = self.dom.attr(node, "id").filter(|id| !id.is_empty()) {
            return format!("#{id}");
        }
        if node == self.dom.root() {
            return "document".into();
        }
        self.dom
            .tag_name(node)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("node-{}", node.0))
    }
}

fn fire_timer(
    dom: &mut Dom,
    slider: &mut Option<BoundSlider>,
    trace: &mut TraceState,
    fired: Fired,
) -> Result<()> {
    trace.timer_line(|| format!("[timer] run id={} due_at={}", fired.id, fired.due_at));
    let Some(bound) = slider.as_mut() else {
        return Ok(());
    };
    let (rotator, mut view) = bound.split(dom);
    if rotator.on_timer(fired.id, &mut view)? {
        let index = rotator.index();
        trace.timer_line(|| format!("[slider] auto-advance index={index}"));
    }
    Ok(())
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
