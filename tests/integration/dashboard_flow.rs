//! Navigation and refresh scheduling driven through `update` with live effects.

use crossterm::event::KeyCode;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use serde_json::json;

use depscope::progress::Status;
use depscope::tea::{Command, DetailTab, GraphStatus, Message, View};
use depscope::ui;

use crate::fixtures::{char_key, event, infra_record, key, plan_bundle, workflow_entry, Harness};

fn count(h: &Harness, cmd: &Command) -> usize {
    h.commands.iter().filter(|c| *c == cmd).count()
}

fn is_refresh_due(msg: &Message) -> bool {
    matches!(msg, Message::RefreshDue { .. })
}

fn is_progress(msg: &Message) -> bool {
    matches!(msg, Message::ProgressFetched { .. })
}

#[tokio::test(start_paused = true)]
async fn test_refresh_runs_until_everything_settles() {
    let bundle = plan_bundle()
        .workflow(workflow_entry("net", json!({"storage": [event("Started")]})))
        .build();
    let mut h = Harness::new(bundle);
    h.start().await;

    assert_eq!(h.model.graph_status, GraphStatus::Ready);
    assert_eq!(h.progress_of("net").unwrap().status, Status::Running);
    assert!(h.model.refresh.timer.is_some());

    h.source
        .update(|b| {
            b.workflow = vec![workflow_entry("net", json!({"storage": [event("Completed")]}))];
        })
        .await;
    h.pump_until(is_refresh_due).await;
    h.pump_until(is_progress).await;

    assert_eq!(h.progress_of("net").unwrap().status, Status::Completed);
    assert_eq!(count(&h, &Command::FetchProgress), 2);
    assert!(h.model.refresh.timer.is_none());
    assert!(!h.model.refresh.in_flight);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_suspended_while_detail_open() {
    let bundle = plan_bundle()
        .infra(infra_record("cluster", "applying", 1, 3))
        .build();
    let mut h = Harness::new(bundle);
    h.start().await;

    h.select("app");
    h.send(key(KeyCode::Enter));
    assert!(matches!(h.model.view, View::Detail(_)));

    h.pump_until(is_refresh_due).await;
    assert!(h.model.refresh.suspended);
    assert_eq!(count(&h, &Command::FetchProgress), 1);

    h.send(key(KeyCode::Esc));
    assert!(matches!(h.model.view, View::Dashboard));
    assert_eq!(count(&h, &Command::FetchProgress), 2);
    assert!(h.model.refresh.in_flight);

    h.pump_until(is_progress).await;
    assert!(h.model.refresh.timer.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_when_idle() {
    let mut h = Harness::new(plan_bundle().build());
    h.start().await;
    assert!(h.model.refresh.timer.is_none());

    h.source
        .update(|b| b.infra.push(infra_record("app", "deployed", 3, 3)))
        .await;
    h.send(char_key('r'));
    assert!(h.model.refresh.in_flight);
    h.pump_until(is_progress).await;

    assert_eq!(h.progress_of("app").unwrap().status, Status::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_graph_failure_then_retry() {
    let mut h = Harness::new(Default::default());
    h.start().await;
    assert!(matches!(h.model.graph_status, GraphStatus::Failed(_)));

    let backend = TestBackend::new(80, 20);
    let mut terminal = Terminal::new(backend).unwrap();
    let state = h.model.snapshot();
    terminal.draw(|f| ui::draw(f, &state)).unwrap();
    let screen: String = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect();
    assert!(screen.contains("Dependency graph unavailable"));

    h.source.update(|b| *b = plan_bundle().build()).await;
    h.send(char_key('r'));
    assert_eq!(h.model.graph_status, GraphStatus::Loading);
    h.pump_until(|m| matches!(m, Message::GraphLoaded(_))).await;

    assert_eq!(h.model.graph_status, GraphStatus::Ready);
    assert_eq!(h.model.graph.as_ref().unwrap().node_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_and_detail_kinds() {
    let bundle = plan_bundle()
        .resource("policy", "kustomize")
        .depends("policy", &["app"])
        .build();
    let mut h = Harness::new(bundle);
    h.start().await;

    h.select("policy");
    h.send(key(KeyCode::Enter));
    assert!(matches!(h.model.view, View::Dashboard));

    h.select("net");
    h.send(key(KeyCode::Right));
    assert_eq!(h.model.selected_id(), Some("cluster"));
    h.send(key(KeyCode::Right));
    assert_eq!(h.model.selected_id(), Some("app"));

    h.send(key(KeyCode::Enter));
    let detail = h.model.detail().unwrap();
    assert_eq!(detail.node.id, "app");
    assert!(!detail.tabs().contains(&DetailTab::Outputs));

    h.send(key(KeyCode::Esc));
    h.select("cluster");
    h.send(key(KeyCode::Enter));
    assert!(h.model.detail().unwrap().tabs().contains(&DetailTab::Outputs));
}

#[tokio::test(start_paused = true)]
async fn test_detail_progress_repolls_until_terminal() {
    let bundle = plan_bundle()
        .infra(infra_record("cluster", "applying", 1, 3))
        .build();
    let mut h = Harness::new(bundle);
    h.start().await;

    h.select("cluster");
    h.send(key(KeyCode::Enter));
    let generation = h.model.detail().unwrap().generation;
    h.pump_until(|m| matches!(m, Message::DetailProgressFetched { .. }))
        .await;
    assert!(h
        .commands
        .iter()
        .any(|c| matches!(c, Command::ScheduleDetailRefresh { generation: g, .. } if *g == generation)));

    h.source
        .update(|b| b.infra = vec![infra_record("cluster", "applied", 3, 3)])
        .await;
    h.pump_until(|m| matches!(m, Message::DetailRefreshDue { .. })).await;
    h.pump_until(|m| matches!(m, Message::DetailProgressFetched { .. }))
        .await;

    let detail = h.model.detail().unwrap();
    assert_eq!(detail.progress.progress.unwrap().status, Status::Completed);
}

#[tokio::test]
async fn test_quit_key() {
    let mut h = Harness::new(plan_bundle().build());
    assert!(h.send(char_key('q')));
}
