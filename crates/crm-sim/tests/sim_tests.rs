//! End-to-end simulator runs

use crm_sim::{run_simulator, scenario, OperationDistribution, SimulatorConfig};
use pretty_assertions::assert_eq;

fn config(seed: u64, total_operations: u64) -> SimulatorConfig {
    SimulatorConfig {
        seed,
        total_operations,
        stop_on_first_violation: false,
        ..SimulatorConfig::default()
    }
}

#[tokio::test]
async fn seeded_run_holds_every_invariant() {
    let report = run_simulator(config(42, 300)).await;

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.stats.total_operations, 300);
    assert!(report.final_lead_count > 0);
    assert!(report.final_enquiry_count > 0);
    assert!(report.stats.failed_operations > 0, "invalid operations are generated");
    assert!(report.generate_text().contains("=== Result: PASS ==="));
}

#[tokio::test]
async fn several_seeds_pass() {
    for seed in 1..=4 {
        let report = run_simulator(config(seed, 150)).await;
        assert!(report.passed(), "seed {seed}\n{}", report.generate_text());
    }
}

#[tokio::test]
async fn same_seed_same_run() {
    let first = run_simulator(config(7, 200)).await;
    let second = run_simulator(config(7, 200)).await;

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.final_lead_count, second.final_lead_count);
    assert_eq!(first.final_enquiry_count, second.final_enquiry_count);
    assert_eq!(first.final_task_count, second.final_task_count);
}

#[tokio::test]
async fn invalid_only_run_creates_nothing() {
    let report = run_simulator(SimulatorConfig {
        operation_distribution: OperationDistribution {
            valid_ops: 0.0,
            edge_cases: 0.0,
            invalid_ops: 1.0,
        },
        ..config(3, 40)
    })
    .await;

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.stats.successful_operations, 0);
    assert_eq!(report.final_lead_count, 0);
}

#[tokio::test]
async fn change_property_scenario_passes() {
    let report = scenario::change_property().await.unwrap();

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.checks.len(), 8);
}
