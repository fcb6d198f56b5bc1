use super::*;

#[test]
fn scheduled_message_fires_when_due() {
    let mut board = StatusBoard::new();
    board.schedule_message("Look around to detect images", 7.5, MessageCategory::ContentPlacement);

    board.advance_to(7.0);
    assert!(board.report().visible.is_none());
    assert_eq!(board.report().scheduled.len(), 1);

    board.advance_to(7.5);
    let report = board.report();
    assert_eq!(report.visible.as_deref(), Some("Look around to detect images"));
    assert!(report.scheduled.is_empty());
    assert_eq!(report.history[0].at_sec, 7.5);
}

#[test]
fn same_category_replaces_and_cancel_all_clears() {
    let mut board = StatusBoard::new();
    board.schedule_message("a", 1.0, MessageCategory::ContentPlacement);
    board.schedule_message("b", 2.0, MessageCategory::ContentPlacement);
    board.schedule_message("c", 3.0, MessageCategory::FocusSquare);
    let scheduled = board.report().scheduled;
    assert_eq!(scheduled.len(), 2);
    assert!(scheduled.iter().any(|m| m.text == "b"));

    board.cancel_all_scheduled_messages();
    board.advance_to(10.0);
    assert!(board.report().history.is_empty());
}

#[test]
fn shown_messages_auto_hide() {
    let mut board = StatusBoard::new();
    board.advance_to(1.0);
    board.show_message("Detected image “Afiche”");
    board.advance_to(1.0 + MESSAGE_AUTO_HIDE_SEC - 0.5);
    assert!(board.report().visible.is_some());
    board.advance_to(1.0 + MESSAGE_AUTO_HIDE_SEC);
    assert!(board.report().visible.is_none());
    assert_eq!(board.report().history.len(), 1);
}

#[test]
fn dispatcher_runs_calls_on_the_ui_thread_in_order() {
    let ui = UiDispatcher::spawn(Box::new(StatusBoard::new())).unwrap();
    let handle = ui.handle();

    handle.schedule_message("Look around to detect images", 7.5, MessageCategory::ContentPlacement);
    handle.tick(1.0);
    handle.cancel_all_scheduled_messages();
    handle.show_message("Detected image “Afiche”");
    handle.tick(8.0);
    handle.barrier().unwrap();

    let report = handle.report().unwrap();
    assert_eq!(report.history.len(), 1);
    assert_eq!(report.history[0].text, "Detected image “Afiche”");
    assert_eq!(report.history[0].at_sec, 1.0);

    let surface = ui.shutdown().unwrap();
    assert_eq!(surface.report(), report);
    assert!(handle.report().is_err());
    handle.show_message("dropped silently");
}
