use anyhow::Result;
use concord::dining::run_strategy;
use concord::{DelaySource, ReferenceDelays, Strategy};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let delays: Arc<dyn DelaySource> = Arc::new(ReferenceDelays::default());

    // Version 1: global fork ordering. Version 2: butler with one seat empty.
    for strategy in [Strategy::GlobalOrder, Strategy::butler_for(5)] {
        let report = run_strategy(strategy, Arc::clone(&delays)).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        println!("Todos los filósofos han comido sin deadlock ({}).", strategy);
    }
    Ok(())
}
