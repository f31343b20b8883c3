//! # Engine Host Demo
//!
//! Loads one hosting unit into an in-memory container, pushes a payload through
//! the composed pipeline, performs a protocol upgrade and unloads the unit.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

use std::sync::Arc;

use engine_host::config::EmptyConfigLoader;
use engine_host::framework::mock::MockContainer;
use engine_host::framework::ModuleContext;
use engine_host::lifecycle::{setup_tracing, HostingUnit};
use engine_host::pipeline::{Payload, Stage};
use engine_host::upgrade::UpgradeRequest;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire process
    setup_tracing();

    let modules = ModuleContext::new("demo-host").with_module("greeting", |application| {
        application.intercept_receive(Stage::with_transform("greeting", |payload| match payload {
            Payload::Text(text) => Payload::Text(format!("hello, {text}")),
            other => other,
        }));
    });
    let container = MockContainer::new()
        .context_param("io.engine.engine.application.id", "demo")
        .context_param("io.engine.engine.application.modules", "greeting")
        .context_path("/demo")
        .server_identity("mock-container/1.0")
        .modules(modules);

    let unit = HostingUnit::with_loader(Arc::new(container), Arc::new(EmptyConfigLoader));
    unit.on_load().map_err(|e| e.to_string())?;

    let application = unit
        .environment()
        .and_then(|environment| environment.application())
        .map_err(|e| e.to_string())?;
    let span = tracing::info_span!("request");
    async {
        let received = application.receive(Payload::Text("world".into()));
        info!(?received, "Payload received");
        let sent = application.send(Payload::Text("bye".into()));
        info!(?sent, "Payload sent");
    }
    .instrument(span)
    .await;

    let upgrade = unit.upgrade_strategy();
    match upgrade.handle(UpgradeRequest::new("websocket")).await {
        Ok(outcome) => info!(?outcome, "Upgrade complete"),
        Err(e) => error!(error = %e, "Upgrade failed"),
    }

    match toml::to_string(&unit.status()) {
        Ok(status) => info!(%status, "Unit status"),
        Err(e) => error!(error = %e, "Could not render unit status"),
    }

    unit.on_unload().await.map_err(|e| e.to_string())?;

    info!("Demo completed successfully");
    Ok(())
}
