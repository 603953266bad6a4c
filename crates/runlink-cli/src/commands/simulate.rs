//! Scenario runner
//!
//! Each scenario opens one paid request from a consumer, fulfills it as the
//! operator, withdraws the earnings and checks the escrow accounting.

use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;

use runlink_core::{
    Consumer, InMemoryToken, Oracle, OracleConfig, PaymentLedger, RecordingConsumer, SharedOracle,
};
use runlink_types::{Address, Amount, CallbackOutcome, Selector, WorkRequest};

use crate::display;
use crate::scenarios::{Panicking, ReentrantCancel, Reverting};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Cooperative,
    Reverting,
    Panicking,
    SelfDestruct,
    ReentrantCancel,
    All,
}

impl Scenario {
    const EACH: [Scenario; 5] = [
        Scenario::Cooperative,
        Scenario::Reverting,
        Scenario::Panicking,
        Scenario::SelfDestruct,
        Scenario::ReentrantCancel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Cooperative => "cooperative",
            Scenario::Reverting => "reverting",
            Scenario::Panicking => "panicking",
            Scenario::SelfDestruct => "self-destruct",
            Scenario::ReentrantCancel => "reentrant-cancel",
            Scenario::All => "all",
        }
    }

    fn expands(self) -> Vec<Scenario> {
        match self {
            Scenario::All => Self::EACH.to_vec(),
            single => vec![single],
        }
    }

    fn consumer(&self) -> Arc<dyn Consumer> {
        match self {
            Scenario::Reverting => Arc::new(Reverting),
            Scenario::Panicking => Arc::new(Panicking),
            Scenario::ReentrantCancel => Arc::new(ReentrantCancel),
            _ => Arc::new(RecordingConsumer::new()),
        }
    }
}

/// What a scenario run observed
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: &'static str,
    pub outcome: CallbackOutcome,
    pub earned: Amount,
    pub withdrawn: Amount,
    pub consumer_balance: Amount,
    pub events: usize,
}

/// Run one scenario against a fresh broker
pub async fn run_scenario(
    scenario: Scenario,
    payment: Amount,
    config: &OracleConfig,
) -> anyhow::Result<ScenarioReport> {
    let deployer = Address::from_label("deployer");
    let node = Address::from_label("oracle-node");
    let consumer = Address::from_label(&format!("consumer-{}", scenario.name()));

    let token = InMemoryToken::new(Address::from_label("payment-token"))
        .with_balance(consumer, payment);
    let mut oracle =
        Oracle::new(Address::from_label("oracle"), deployer, token).with_config(config.clone())?;
    oracle.transfer_ownership(&deployer, node)?;
    oracle.deploy_consumer(consumer, scenario.consumer());
    let oracle = SharedOracle::new(oracle);

    let payload = WorkRequest::new(
        "4c7b7ffb66b344fbaa64995af81e355a",
        consumer,
        Selector::from_signature("requestedBytes32(bytes32,bytes32)"),
        format!("{}-1", scenario.name()),
    )
    .encode()?;
    let id = oracle.transfer_and_call(consumer, payment, payload).await?;
    display::info(&format!("Request {} opened for {}", id, payment));

    if scenario == Scenario::SelfDestruct {
        oracle
            .with(|oracle| oracle.consumers_mut().remove(&consumer))
            .await;
        display::info("Consumer destroyed before fulfillment");
    }

    let receipt = oracle
        .fulfill_data(node, id, b"Hello World!".to_vec())
        .await?;
    match receipt.outcome.fault() {
        None => display::success(&format!("Callback outcome: {:?}", receipt.outcome)),
        Some(fault) => display::warning(&format!("Callback faulted: {}", fault)),
    }

    let earned = oracle.snapshot().await.withdrawable;
    oracle.withdraw(node, node, earned).await?;
    display::success(&format!("Operator withdrew {}", earned));

    oracle.check_conservation().await?;
    display::success("Escrow balanced");

    let (withdrawn, consumer_balance) = oracle
        .with(|oracle| {
            (
                oracle.token().balance_of(&node),
                oracle.token().balance_of(&consumer),
            )
        })
        .await;
    let events = oracle.take_events().await.len();

    Ok(ScenarioReport {
        scenario: scenario.name(),
        outcome: receipt.outcome,
        earned,
        withdrawn,
        consumer_balance,
        events,
    })
}

/// Run the selected scenarios and print a report for each
pub async fn run(scenario: Scenario, payment: Amount, config: OracleConfig) -> anyhow::Result<()> {
    let scenarios = scenario.expands();
    tracing::info!("Running {} scenario(s)", scenarios.len());

    let mut failures = 0;
    for scenario in scenarios {
        display::section(&format!("Scenario: {}", scenario.name()));
        match run_scenario(scenario, payment, &config).await {
            Ok(report) => {
                display::kv("earned", &report.earned.to_string());
                display::kv("consumer balance", &report.consumer_balance.to_string());
                display::kv("events", &report.events.to_string());
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Err(e) => {
                failures += 1;
                display::error(&format!("Scenario {} failed: {}", scenario.name(), e));
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} scenario(s) failed", failures);
    }
    Ok(())
}
