use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use storefront_widgets::{
    MemoryCardView, MemorySlideView, NavControl, NavKey, OffersPaginator, Page, Scheduler,
    SlideRotator, DEFAULT_INTERVAL_MS, DEFAULT_SWIPE_THRESHOLD, DEFAULT_WINDOW,
};

const CAROUSEL_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/carousel_property_test.txt";
const DEFAULT_CAROUSEL_PROPTEST_CASES: u32 = 128;

fn carousel_proptest_cases() -> u32 {
    std::env::var("STOREFRONT_WIDGETS_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_CAROUSEL_PROPTEST_CASES)
}

#[derive(Clone, Debug)]
enum PageAction {
    SlideNext,
    SlidePrev,
    Indicator(usize),
    Key(&'static str),
    Swipe { from: f64, to: f64 },
    Hover,
    Leave,
    Advance(i64),
    OffersNext,
    OffersPrev,
}

fn page_action_strategy() -> BoxedStrategy<PageAction> {
    prop_oneof![
        2 => Just(PageAction::SlideNext),
        2 => Just(PageAction::SlidePrev),
        2 => (0usize..8).prop_map(PageAction::Indicator),
        2 => prop_oneof![Just("ArrowLeft"), Just("ArrowRight"), Just("Enter")]
            .prop_map(PageAction::Key),
        2 => (0.0f64..400.0, 0.0f64..400.0).prop_map(|(from, to)| PageAction::Swipe { from, to }),
        1 => Just(PageAction::Hover),
        1 => Just(PageAction::Leave),
        3 => (0i64..12_000).prop_map(PageAction::Advance),
        3 => Just(PageAction::OffersNext),
        2 => Just(PageAction::OffersPrev),
    ]
    .boxed()
}

fn storefront_html(slides: usize, cards: usize) -> String {
    let mut html = String::from("<div class='slide-container'><div class='slide-wrapper'>");
    for slide in 0..slides {
        html.push_str(&format!("<div class='slide'>{slide}</div>"));
    }
    html.push_str(
        "</div><button class='slide-prev'></button><button class='slide-next'></button></div>",
    );
    for slide in 0..slides {
        html.push_str(&format!("<span id='dot-{slide}' class='indicator-dot'></span>"));
    }
    html.push_str("<button class='arrow prev'></button><div class='carousel-container'>");
    for card in 0..cards {
        html.push_str(&format!("<div id='card-{card}' class='product-card'></div>"));
    }
    html.push_str("</div><button class='arrow next'></button>");
    html
}

/// Expected widget state, advanced alongside the page.
#[derive(Debug)]
struct Model {
    slides: usize,
    index: usize,
    now_ms: i64,
    next_due: Option<i64>,
    cards: usize,
    position: usize,
}

impl Model {
    fn new(slides: usize, cards: usize) -> Self {
        Self {
            slides,
            index: 0,
            now_ms: 0,
            next_due: Some(DEFAULT_INTERVAL_MS),
            cards,
            position: 0,
        }
    }

    fn max_position(&self) -> usize {
        self.cards.saturating_sub(DEFAULT_WINDOW)
    }

    fn forward(&mut self) {
        self.index = (self.index + 1) % self.slides;
    }

    fn back(&mut self) {
        self.index = (self.index + self.slides - 1) % self.slides;
    }

    fn apply(&mut self, action: &PageAction) {
        match action {
            PageAction::SlideNext => self.forward(),
            PageAction::SlidePrev => self.back(),
            PageAction::Indicator(dot) => self.index = dot % self.slides,
            PageAction::Key("ArrowLeft") => self.back(),
            PageAction::Key("ArrowRight") => self.forward(),
            PageAction::Key(_) => {}
            PageAction::Swipe { from, to } => {
                if from - to > DEFAULT_SWIPE_THRESHOLD {
                    self.forward();
                } else if to - from > DEFAULT_SWIPE_THRESHOLD {
                    self.back();
                }
            }
            PageAction::Hover => self.next_due = None,
            PageAction::Leave => self.next_due = Some(self.now_ms + DEFAULT_INTERVAL_MS),
            PageAction::Advance(delta) => {
                let target = self.now_ms + delta;
                while let Some(due) = self.next_due.filter(|due| *due <= target) {
                    self.forward();
                    self.next_due = Some(due + DEFAULT_INTERVAL_MS);
                }
                self.now_ms = target;
            }
            PageAction::OffersNext => {
                if self.position < self.max_position() {
                    self.position += 1;
                }
            }
            PageAction::OffersPrev => {
                self.position = self.position.saturating_sub(1);
            }
        }
    }
}

fn run_action(
    page: &mut Page,
    action: &PageAction,
    slides: usize,
) -> storefront_widgets::Result<()> {
    match action {
        PageAction::SlideNext => page.click(".slide-next"),
        PageAction::SlidePrev => page.click(".slide-prev"),
        PageAction::Indicator(dot) => page.click(&format!("#dot-{}", dot % slides)),
        PageAction::Key(key) => page.press_key(key),
        PageAction::Swipe { from, to } => page.swipe(".slide-container", *from, *to),
        PageAction::Hover => page.hover(".slide-container"),
        PageAction::Leave => page.unhover(".slide-container"),
        PageAction::Advance(delta) => page.advance_time(*delta),
        PageAction::OffersNext => page.click(".arrow.next"),
        PageAction::OffersPrev => page.click(".arrow.prev"),
    }
}

fn fail(err: storefront_widgets::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn assert_page_matches_model(page: &Page, model: &Model) -> TestCaseResult {
    prop_assert_eq!(page.current_slide(), Some(model.index));
    prop_assert_eq!(
        page.slide_offset_percent(),
        Some(-100.0 * model.index as f64)
    );
    for dot in 0..model.slides {
        let active = page
            .has_class(&format!("#dot-{dot}"), "active")
            .map_err(fail)?;
        prop_assert_eq!(active, dot == model.index, "dot {}", dot);
    }

    let timers = page.pending_timers();
    prop_assert!(timers.len() <= 1, "stacked timers: {:?}", timers);
    prop_assert_eq!(timers.first().map(|timer| timer.due_at), model.next_due);

    prop_assert_eq!(page.offers_position(), Some(model.position));
    let visible = page.displayed_count(".product-card").map_err(fail)?;
    prop_assert_eq!(visible, model.cards.min(DEFAULT_WINDOW));
    for card in 0..model.cards {
        let shown = page
            .is_displayed(&format!("#card-{card}"))
            .map_err(fail)?;
        let expected = card >= model.position && card < model.position + DEFAULT_WINDOW;
        prop_assert_eq!(shown, expected, "card {}", card);
    }
    prop_assert_eq!(
        page.is_disabled(".arrow.prev").map_err(fail)?,
        model.position == 0
    );
    prop_assert_eq!(
        page.is_disabled(".arrow.next").map_err(fail)?,
        model.position == model.max_position()
    );
    Ok(())
}

fn assert_page_sequence_tracks_model(
    slides: usize,
    cards: usize,
    actions: &[PageAction],
) -> TestCaseResult {
    let mut page = Page::from_html(&storefront_html(slides, cards)).map_err(fail)?;
    let mut model = Model::new(slides, cards);
    assert_page_matches_model(&page, &model)?;

    for (step, action) in actions.iter().enumerate() {
        if let Err(error) = run_action(&mut page, action, slides) {
            prop_assert!(
                false,
                "action returned error at step {step}: {action:?}, error={error:?}"
            );
        }
        model.apply(action);
        assert_page_matches_model(&page, &model)?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: carousel_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(CAROUSEL_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn page_actions_track_reference_model(
        slides in 1usize..=7,
        cards in 0usize..=12,
        actions in vec(page_action_strategy(), 1..=32),
    ) {
        assert_page_sequence_tracks_model(slides, cards, &actions)?;
    }

    #[test]
    fn rotator_index_stays_in_range(
        total in 1usize..=9,
        moves in vec(0u8..4, 0..=40),
    ) {
        let mut rotator = SlideRotator::new(total).map_err(fail)?;
        let mut view = MemorySlideView::new(total);
        let mut timers = Scheduler::new();
        rotator.render(&mut view).map_err(fail)?;
        for step in moves {
            match step {
                0 => rotator.advance(&mut view).map_err(fail)?,
                1 => rotator.retreat(&mut view).map_err(fail)?,
                2 => {
                    rotator.handle_key(NavKey::ArrowLeft, &mut view).map_err(fail)?;
                }
                _ => {
                    rotator.start_autoplay(&mut timers);
                }
            }
            prop_assert!(rotator.index() < total);
            prop_assert_eq!(view.active_indicators(), vec![rotator.index()]);
            prop_assert!(timers.pending_timers().len() <= 1);
        }
    }

    #[test]
    fn paginator_window_is_contiguous(
        count in 0usize..=15,
        window in 1usize..=6,
        forward in vec(any::<bool>(), 0..=30),
    ) {
        let mut paginator = OffersPaginator::new().with_window(window).map_err(fail)?;
        let mut view = MemoryCardView::new(count);
        paginator.initialize(&mut view).map_err(fail)?;
        for step in forward {
            if step {
                paginator.next(&mut view).map_err(fail)?;
            } else {
                paginator.prev(&mut view).map_err(fail)?;
            }
            prop_assert!(paginator.position() <= paginator.max_position());
            prop_assert_eq!(
                view.visible_cards(),
                paginator.visible_range().collect::<Vec<_>>()
            );
            prop_assert_eq!(view.is_enabled(NavControl::Prev), paginator.can_prev());
            prop_assert_eq!(view.is_enabled(NavControl::Next), paginator.can_next());
        }
    }
}
