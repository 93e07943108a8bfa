//! Integration test: visibility subscriptions against elements placed in a
//! headless document, including late-bound and re-pointed element refs.

use std::cell::RefCell;
use std::rc::Rc;

use viewport_sense_core::protocol::Rect;
use viewport_sense_core::{
    ElementId, ElementRef, EngineConfig, HeadlessPlatform, ViewportEngine, VisibilityOptions,
};

const HERO: ElementId = ElementId(1);
const FOOTER: ElementId = ElementId(2);

fn page() -> Rc<HeadlessPlatform> {
    let platform = Rc::new(
        HeadlessPlatform::new()
            .with_size(1000, 800)
            .with_document_height(4000.0),
    );
    platform.place_element(HERO, Rect::new(0.0, 100.0, 1000.0, 400.0));
    platform.place_element(FOOTER, Rect::new(0.0, 3800.0, 1000.0, 200.0));
    platform
}

fn recorder() -> (Rc<RefCell<Vec<bool>>>, impl Fn(bool) + 'static) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    (log, move |visible| sink.borrow_mut().push(visible))
}

#[test]
fn toggles_at_half_visibility() {
    let platform = page();
    let engine = ViewportEngine::new(Rc::clone(&platform));
    let (log, push) = recorder();
    let _sub = engine.observe_visibility(
        &ElementRef::with_target(FOOTER),
        VisibilityOptions::default(),
        push,
    );

    // footer spans 3800..4000; viewport bottom at y + 800
    platform.scroll_to(3050.0);
    platform.scroll_to(3100.0);
    platform.scroll_to(3200.0);
    platform.scroll_to(0.0);

    assert_eq!(*log.borrow(), vec![false, true, false]);
}

#[test]
fn custom_threshold_is_honoured() {
    let platform = page();
    let engine = ViewportEngine::new(Rc::clone(&platform));
    let (log, push) = recorder();
    let _sub = engine.observe_visibility(
        &ElementRef::with_target(FOOTER),
        VisibilityOptions::threshold(1.0),
        push,
    );

    platform.scroll_to(3100.0);
    platform.scroll_to(3200.0);

    assert_eq!(*log.borrow(), vec![false, true]);
}

#[test]
fn empty_ref_is_a_no_op_until_set() {
    let platform = page();
    let engine = ViewportEngine::new(Rc::clone(&platform));
    let element = ElementRef::new();
    let (log, push) = recorder();
    let _sub = engine.observe_visibility(&element, VisibilityOptions::default(), push);

    assert_eq!(platform.observer_count(), 0);
    platform.scroll_to(500.0);
    assert!(log.borrow().is_empty());

    platform.scroll_to(0.0);
    element.set(Some(HERO));
    assert_eq!(platform.observer_count(), 1);
    assert_eq!(*log.borrow(), vec![true]);
}

#[test]
fn repointing_ref_moves_the_observer() {
    let platform = page();
    let engine = ViewportEngine::new(Rc::clone(&platform));
    let element = ElementRef::with_target(HERO);
    let (log, push) = recorder();
    let _sub = engine.observe_visibility(&element, VisibilityOptions::default(), push);

    element.set(Some(FOOTER));
    assert_eq!(platform.observer_count(), 1);

    platform.scroll_to(3200.0);
    element.clear();
    assert_eq!(platform.observer_count(), 0);

    assert_eq!(*log.borrow(), vec![true, false, true, false]);
}

#[test]
fn unsubscribe_disconnects_and_unwatches() {
    let platform = page();
    let engine = ViewportEngine::new(Rc::clone(&platform));
    let element = ElementRef::with_target(HERO);
    let (log, push) = recorder();
    let sub = engine.observe_visibility(&element, VisibilityOptions::default(), push);
    assert_eq!(platform.observer_count(), 1);

    sub.unsubscribe();
    assert_eq!(platform.observer_count(), 0);

    platform.scroll_to(2000.0);
    element.set(Some(FOOTER));
    assert_eq!(platform.observer_count(), 0);
    assert_eq!(*log.borrow(), vec![true]);
}

#[test]
fn configured_default_threshold_applies() {
    let platform = page();
    let config = EngineConfig {
        visibility_threshold: 0.9,
        ..EngineConfig::default()
    };
    let engine = ViewportEngine::with_config(Rc::clone(&platform), config).unwrap();
    let (log, push) = recorder();
    let _sub = engine.observe_visibility(
        &ElementRef::with_target(FOOTER),
        VisibilityOptions::default(),
        push,
    );

    platform.scroll_to(3100.0);
    platform.scroll_to(3190.0);

    assert_eq!(*log.borrow(), vec![false, true]);
}

#[test]
fn repointing_from_the_first_report_keeps_one_observer() {
    let platform = page();
    let engine = ViewportEngine::new(Rc::clone(&platform));
    let element = ElementRef::with_target(HERO);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = {
        let log = Rc::clone(&log);
        let target = element.clone();
        engine.observe_visibility(&element, VisibilityOptions::default(), move |visible| {
            log.borrow_mut().push(visible);
            if visible {
                target.set(Some(FOOTER));
            }
        })
    };

    assert_eq!(element.get(), Some(FOOTER));
    assert_eq!(platform.observer_count(), 1);
    assert_eq!(*log.borrow(), vec![true, false]);

    platform.scroll_to(3200.0);
    assert_eq!(*log.borrow(), vec![true, false, true]);

    sub.unsubscribe();
    assert_eq!(platform.observer_count(), 0);
}
