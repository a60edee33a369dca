use anyhow::Result;
use concord::future_flow::{await_all, fan_in, launch};
use concord::{DelaySource, KernelConfig, ReferenceDelays};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = KernelConfig::default();
    let delays: Arc<dyn DelaySource> = Arc::new(ReferenceDelays::new(&config.futures));

    println!("=== FUTUROS (Opción 1: Secuencial) ===");
    let handles = [5, 8, 12]
        .into_iter()
        .map(|x| launch(x, Arc::clone(&delays)))
        .collect();
    let results = await_all(handles).await?;
    for (i, r) in results.iter().enumerate() {
        println!("[main] Resultado {}: {}", i + 1, r);
    }

    println!("=== FUTUROS (Opción 2: Combinar múltiples canales) ===");
    let sources = [7, 9, 15, 4, 11]
        .into_iter()
        .map(|x| launch(x, Arc::clone(&delays)))
        .collect();
    let output = fan_in(sources).drain().await?;
    for (i, r) in output.values.iter().enumerate() {
        println!("[main] Resultado {}: {}", i + 1, r);
    }
    if let Some((source, e)) = output.failures.first() {
        anyhow::bail!("source {} failed: {}", source + 1, e);
    }

    println!("¡Todos los futuros procesados!");
    Ok(())
}
