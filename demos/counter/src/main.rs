//! Counter demo binary
//!
//! Demonstrates the Reloop architecture with a counter.

use counter::{CounterAction, CounterEnvironment, CounterReducer, CounterState};
use reloop_core::{Cmd, Loop};
use reloop_runtime::metrics::MetricsRecorder;
use reloop_runtime::{LoopConfig, Store};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,reloop_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut recorder = MetricsRecorder::new();
    recorder.install()?;

    println!("=== Counter Demo: Reloop Architecture ===\n");

    let env = CounterEnvironment::new(Duration::from_millis(50));

    // The initial command runs as soon as the store is created
    let initial = Loop::new(CounterState::default(), Cmd::action(CounterAction::Increment));
    let store = Store::with_config(
        initial,
        CounterReducer,
        env.clone(),
        LoopConfig::default().with_max_cascade_depth(16),
    );
    store.initialized().await?;
    println!("Count after initial command: {}", store.get_state().count);

    let _subscription = store.subscribe(|| tracing::trace!("state changed"));

    println!("\n>>> Dispatching: Increment");
    store.dispatch(CounterAction::Increment).await?;
    println!("Count after Increment: {}", store.get_state().count);

    println!("\n>>> Dispatching: IncrementLater");
    let pending = store.dispatch(CounterAction::IncrementLater);
    let state = store.get_state();
    println!("Right after dispatch: count {}, pending {}", state.count, state.pending);
    pending.await?;
    let state = store.get_state();
    println!("Once settled: count {}, pending {}", state.count, state.pending);

    println!("\n>>> Dispatching: Burst(3)");
    store.dispatch(CounterAction::Burst(3)).await?;
    println!("Count after Burst: {}", store.get_state().count);

    println!("\n>>> Dispatching: Save");
    store.dispatch(CounterAction::Save).await?;
    println!("Saved counts: {:?}", env.saved());

    println!("\n>>> Dispatching: Reset");
    store.dispatch(CounterAction::Reset).await?;
    println!("Count after Reset: {}", store.get_state().count);

    if let Some(metrics) = recorder.render() {
        println!("\n=== Metrics ===\n{metrics}");
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
