use std::path::Path;

use chrono::{TimeZone, Utc};
use strata_core::{DeployedChange, RegistryState};
use strata_deploy::{DependencyGraph, DeployError, GraphError};
use strata_plan::{parse_plan, parse_plan_file};

fn fixture_graph() -> DependencyGraph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../plans/examples/app.plan");
    let parsed = parse_plan_file(&path).expect("read fixture plan");
    assert!(parsed.is_valid(), "fixture errors: {:?}", parsed.report.errors);
    DependencyGraph::from_parsed(&parsed).expect("fixture graph")
}

fn registry(names: &[&str]) -> RegistryState {
    RegistryState::new(
        "app",
        names
            .iter()
            .map(|name| DeployedChange {
                change_name: name.to_string(),
                deployed_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                script_hash: String::new(),
            })
            .collect(),
    )
}

#[test]
fn fixture_orders_in_plan_order_with_external_edges() {
    let graph = fixture_graph();
    let order = graph.deployment_plan().expect("order");
    assert_eq!(order.project, "app");
    assert_eq!(order.changes, vec!["schema", "users", "roles", "orders", "audit"]);
    assert_eq!(
        graph.node("roles").expect("roles").externals,
        vec!["auth:roles"]
    );
    assert_eq!(graph.node("audit").expect("audit").dependencies, vec!["orders", "users"]);
}

#[test]
fn fixture_slices_at_tags() {
    let graph = fixture_graph();
    assert_eq!(
        graph.deployment_plan_to("@v1.0").expect("slice").changes,
        vec!["schema", "users", "roles"]
    );
    assert_eq!(
        graph.deployment_plan_to("@v1.1").expect("slice").changes.len(),
        5
    );
}

#[test]
fn status_and_revert_agree_on_the_deployed_suffix() {
    let graph = fixture_graph();
    let state = registry(&["schema", "users", "roles", "orders"]);

    let diff = graph.diff(&state, None).expect("diff");
    assert_eq!(diff.pending, vec!["audit"]);

    let revert = graph.revert_plan(&state, "@v1.0").expect("revert");
    assert_eq!(revert.changes, vec!["orders"]);

    assert!(matches!(
        graph.diff(&state, Some("@v1.0")),
        Err(DeployError::Divergence(_))
    ));
}

#[test]
fn partial_deploy_excludes_later_changes() {
    let plan = parse_plan(
        "%project=p\n\
         A 2024-01-01T00:00:00Z Ada <ada@example.com>\n\
         B [A] 2024-01-02T00:00:00Z Ada <ada@example.com>\n\
         C [B] 2024-01-03T00:00:00Z Ada <ada@example.com>\n",
    )
    .plan;
    let graph = DependencyGraph::build(&plan).expect("graph");
    assert_eq!(graph.deployment_plan_to("B").expect("slice").changes, vec!["A", "B"]);
}

#[test]
fn cycle_is_rejected_and_names_both_changes() {
    let plan = parse_plan(
        "%project=p\n\
         A [B] 2024-01-01T00:00:00Z Ada <ada@example.com>\n\
         B [A] 2024-01-02T00:00:00Z Ada <ada@example.com>\n",
    )
    .plan;
    let err = DependencyGraph::build(&plan).expect_err("cycle");
    let message = err.to_string();
    assert!(message.contains("A -> B -> A") || message.contains("B -> A -> B"), "{message}");
    assert!(
        err.graph_errors()
            .iter()
            .any(|error| matches!(error, GraphError::Cycle { .. }))
    );
}

#[test]
fn graph_errors_serialize_with_kind_tags() {
    let plan = parse_plan("%project=p\nA [missing] 2024-01-01T00:00:00Z Ada <ada@example.com>\n").plan;
    let err = DependencyGraph::build(&plan).expect_err("unresolved");
    let json = serde_json::to_value(err.graph_errors()).expect("serialize");
    assert_eq!(json[0]["kind"], "unresolved_reference");
    assert_eq!(json[0]["line"], 2);
}
