//! Log tailing from the bundle into an open detail view.

use crossterm::event::KeyCode;

use depscope::actors::{log_stream::separator, LogDiffer, LogEvent, LogUpdate};
use depscope::tea::{Command, DetailTab, LogStatus, Message};

use crate::fixtures::{char_key, key, log, plan_bundle, Harness};

#[test]
fn test_operation_change_replaces_buffer() {
    let mut differ = LogDiffer::default();
    differ.diff(log("X", "x-1\nx-2\n"));

    let update = differ.diff(log("Y", "y-1\n")).unwrap();

    match update {
        LogUpdate::Replace {
            operation_id,
            lines,
        } => {
            assert_eq!(operation_id, "Y");
            assert_eq!(lines, vec![separator("Y"), "y-1".to_string()]);
        }
        other => panic!("expected a replace, got {:?}", other),
    }
}

/// Open `id` and switch to its Logs tab.
async fn open_logs(h: &mut Harness, id: &str) -> u64 {
    h.start().await;
    h.select(id);
    h.send(key(KeyCode::Enter));
    while h.model.detail().map(|d| d.tab) != Some(DetailTab::Logs) {
        h.send(key(KeyCode::Tab));
    }
    let generation = h.model.detail().unwrap().generation;
    assert!(h
        .commands
        .contains(&Command::StartLogStream { generation, resource_id: id.to_string() }));
    generation
}

fn is_update(msg: &Message) -> bool {
    matches!(msg, Message::Log { event: LogEvent::Update(_), .. })
}

#[tokio::test(start_paused = true)]
async fn test_stream_switches_operation_without_stale_lines() {
    let bundle = plan_bundle().log("net", log("X", "plan x\napply x\n")).build();
    let mut h = Harness::new(bundle);
    open_logs(&mut h, "net").await;

    h.pump_until(is_update).await;
    let logs = &h.model.detail().unwrap().logs;
    assert_eq!(logs.operation_id.as_deref(), Some("X"));
    assert!(logs.lines.iter().any(|l| l == "apply x"));

    h.source
        .update(|b| {
            b.logs.insert("net".into(), log("Y", "plan y\n"));
        })
        .await;
    h.pump_until(is_update).await;

    let logs = &h.model.detail().unwrap().logs;
    assert_eq!(logs.operation_id.as_deref(), Some("Y"));
    assert_eq!(logs.lines.front().map(String::as_str), Some(separator("Y").as_str()));
    assert!(logs.lines.iter().all(|l| !l.ends_with(" x")));
    assert_eq!(logs.status, LogStatus::Streaming);
}

#[tokio::test(start_paused = true)]
async fn test_appended_lines_follow_tail() {
    let bundle = plan_bundle().log("net", log("X", "one\n")).build();
    let mut h = Harness::new(bundle);
    open_logs(&mut h, "net").await;
    h.pump_until(is_update).await;

    h.source
        .update(|b| {
            b.logs.insert("net".into(), log("X", "one\ntwo\nthree\n"));
        })
        .await;
    h.pump_until(is_update).await;

    let logs = &h.model.detail().unwrap().logs;
    let lines: Vec<&str> = logs.lines.iter().map(String::as_str).collect();
    assert_eq!(lines, vec![separator("X").as_str(), "one", "two", "three"]);
    assert!(logs.follow);
}

#[tokio::test(start_paused = true)]
async fn test_missing_log_reports_waiting() {
    let mut h = Harness::new(plan_bundle().build());
    open_logs(&mut h, "dns").await;

    h.pump_until(|m| matches!(m, Message::Log { event: LogEvent::NoLog, .. }))
        .await;

    assert_eq!(h.model.detail().unwrap().logs.status, LogStatus::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_detail_stops_stream() {
    let bundle = plan_bundle().log("net", log("X", "one\n")).build();
    let mut h = Harness::new(bundle);
    let generation = open_logs(&mut h, "net").await;
    assert_eq!(h.effects.active_streams(), 1);

    h.send(key(KeyCode::Esc));

    assert!(h.model.detail().is_none());
    assert!(h.commands.contains(&Command::StopLogStream { generation }));
    assert_eq!(h.effects.active_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scrolling_up_pauses_follow() {
    let content: String = (0..200).map(|i| format!("line {i}\n")).collect();
    let bundle = plan_bundle().log("net", log("X", &content)).build();
    let mut h = Harness::new(bundle);
    open_logs(&mut h, "net").await;
    h.pump_until(is_update).await;

    h.send(key(KeyCode::Up));
    assert!(!h.model.detail().unwrap().logs.follow);

    h.send(char_key('G'));
    assert!(h.model.detail().unwrap().logs.follow);
}
