use clap::Args;
use ferrous_mdns_domain::ServiceStateChange;
use ferrous_mdns_infrastructure::dns::{MdnsEngine, ServiceEventEmitter};
use std::sync::Arc;

#[derive(Args)]
pub struct BrowseArgs {
    /// Service type, e.g. _http._tcp.local.
    pub service_type: String,

    /// Print one JSON object per event
    #[arg(long)]
    pub json: bool,
}

pub async fn run(engine: &Arc<MdnsEngine>, args: BrowseArgs) -> anyhow::Result<()> {
    let (emitter, mut events) = ServiceEventEmitter::new_enabled();
    let browser = engine.browse(&args.service_type, Arc::new(emitter))?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                if args.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    let marker = match event.state {
                        ServiceStateChange::Added => '+',
                        ServiceStateChange::Removed => '-',
                        ServiceStateChange::Updated => '~',
                    };
                    println!("{} {}", marker, event.name);
                }
            }
        }
    }

    browser.stop().await;
    Ok(())
}
