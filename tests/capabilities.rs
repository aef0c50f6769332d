use scylla_gateway::server::{list_actions, server_info};

#[test]
fn server_info_contains_expected_metadata() {
    let info = server_info();
    assert_eq!(info.name, "scylla-gateway");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    assert!(info.instructions.contains("action"));
}

#[test]
fn actions_include_every_routed_action() {
    let names: Vec<&str> = list_actions().into_iter().map(|a| a.name).collect();
    for e in ["raw", "prepared", "prepare", "batch"] {
        assert!(names.contains(&e), "missing action {e}");
    }
}
