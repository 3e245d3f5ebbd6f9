use glass_overlay::overlay::geometry::{BoundsPatch, IntRect, Point, Rect, Size};
use glass_overlay::overlay::messages::{EventOutcome, WindowEvent};
use glass_overlay::overlay::state::{DragKind, InteractionMode};
use glass_overlay::overlay::toolkit::WindowId;
use glass_overlay::overlay::OverlayError;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use fake_shell::{Fakes, WIN};

fn fakes() -> Fakes {
    Fakes::single_display(IntRect::new(100, 100, 800, 600))
}

#[test]
fn window_drag_moves_without_growing() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();
    let now = Instant::now();

    let handle = coord
        .begin_drag(WIN, Point::new(150.0, 120.0), DragKind::Window)
        .unwrap();
    let bounds = coord
        .apply_drag(&handle, Point::new(200.0, 150.0), now)
        .unwrap();

    assert_eq!(bounds, Rect::new(150.0, 130.0, 800.0, 600.0));
    assert_eq!(fakes.writes().last(), Some(&IntRect::new(150, 130, 800, 600)));

    // Many small steps: width and height stay pinned to the start.
    for step in 0..50 {
        let p = Point::new(200.0 + step as f64 * 0.3, 150.0 - step as f64 * 0.7);
        let b = coord.apply_drag(&handle, p, now).unwrap();
        assert_eq!((b.width, b.height), (800.0, 600.0));
    }
    coord.end_drag(WIN).unwrap();
    assert_eq!(coord.mode(WIN).unwrap(), InteractionMode::Idle);
}

#[test]
fn resize_echo_inside_grace_window_is_suppressed() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();
    let now = Instant::now();

    coord
        .set_bounds(WIN, BoundsPatch::position(150.0, 130.0), now)
        .unwrap();
    let outcome = coord
        .on_native_resize(WIN, Size::new(820.0, 610.0), now + Duration::from_millis(10))
        .unwrap();
    assert_eq!(outcome, EventOutcome::Suppressed);
    assert_eq!(coord.bounds(WIN).unwrap(), Rect::new(150.0, 130.0, 800.0, 600.0));

    let later = now + Duration::from_millis(60);
    coord.tick(later);
    let outcome = coord
        .on_native_resize(WIN, Size::new(820.0, 610.0), later)
        .unwrap();
    assert_eq!(outcome, EventOutcome::Applied);
    assert_eq!(coord.bounds(WIN).unwrap(), Rect::new(150.0, 130.0, 820.0, 610.0));
}

#[test]
fn manual_resize_never_moves_the_window() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();

    let outcome = coord
        .on_native_resize(WIN, Size::new(640.0, 480.0), Instant::now())
        .unwrap();
    assert_eq!(outcome, EventOutcome::Applied);
    assert_eq!(coord.bounds(WIN).unwrap(), Rect::new(100.0, 100.0, 640.0, 480.0));
    assert!(fakes.writes().is_empty());

    let same = coord
        .on_native_resize(WIN, Size::new(640.0, 480.0), Instant::now())
        .unwrap();
    assert_eq!(same, EventOutcome::Ignored);
}

#[test]
fn fractional_bounds_stay_authoritative_and_only_writes_are_rounded() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();
    let now = Instant::now();

    let bounds = coord
        .set_bounds(
            WIN,
            BoundsPatch::full(Rect::new(10.4, 20.6, 300.5, 200.2)),
            now,
        )
        .unwrap();
    assert_eq!(bounds, Rect::new(10.4, 20.6, 300.5, 200.2));
    assert_eq!(fakes.writes().last(), Some(&IntRect::new(10, 21, 301, 200)));
    assert_eq!(coord.bounds(WIN).unwrap(), bounds);
}

#[test]
fn unknown_window_is_an_error() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    assert!(matches!(
        coord.bounds(WindowId(99)),
        Err(OverlayError::WindowNotFound(WindowId(99)))
    ));
    assert!(matches!(
        coord.set_bounds(WindowId(99), BoundsPatch::size(1.0, 1.0), Instant::now()),
        Err(OverlayError::WindowNotFound(_))
    ));
}

#[test]
fn drag_is_rejected_while_capture_is_in_flight() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();
    coord
        .begin_capture(WIN, Instant::now(), Duration::from_millis(200))
        .unwrap();

    let err = coord
        .begin_drag(WIN, Point::ZERO, DragKind::Window)
        .unwrap_err();
    assert!(matches!(err, OverlayError::Busy { window, .. } if window == WIN));
}

#[test]
fn pumped_events_ignore_moves_and_remove_closed_windows() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();
    let (tx, rx) = channel();

    tx.send(WindowEvent::Moved {
        id: WIN,
        position: Point::new(900.0, 900.0),
    })
    .unwrap();
    tx.send(WindowEvent::Resized {
        id: WindowId(42),
        size: Size::new(10.0, 10.0),
    })
    .unwrap();
    tx.send(WindowEvent::Closed { id: WIN }).unwrap();

    let outcomes = coord.pump_events(&rx, Instant::now());
    assert_eq!(
        outcomes,
        vec![(WIN, EventOutcome::Ignored), (WIN, EventOutcome::Closed)]
    );
    assert!(!coord.registry().contains(WIN));
}

#[test]
fn rejected_bounds_write_keeps_authoritative_state() {
    let fakes = fakes();
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();
    fakes.toolkit.0.borrow_mut().fail_set_bounds = true;
    let now = Instant::now();

    let err = coord
        .set_bounds(WIN, BoundsPatch::position(300.0, 300.0), now)
        .unwrap_err();
    assert!(matches!(err, OverlayError::Toolkit(_)));
    assert_eq!(coord.bounds(WIN).unwrap(), Rect::new(100.0, 100.0, 800.0, 600.0));

    // No grace window was opened, so a real resize still applies.
    let outcome = coord
        .on_native_resize(WIN, Size::new(640.0, 480.0), now)
        .unwrap();
    assert_eq!(outcome, EventOutcome::Applied);
}
