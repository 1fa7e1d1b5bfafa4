use clap::Args;
use ferrous_mdns_infrastructure::dns::MdnsEngine;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct ResolveArgs {
    /// Service type, e.g. _http._tcp.local.
    pub service_type: String,

    /// Full instance name, e.g. "Web._http._tcp.local."
    pub name: String,

    /// Give up after this many milliseconds
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,
}

pub async fn run(engine: &Arc<MdnsEngine>, args: ResolveArgs) -> anyhow::Result<()> {
    let resolved = engine
        .get_service_info(
            &args.service_type,
            &args.name,
            Duration::from_millis(args.timeout_ms),
        )
        .await?;

    match resolved {
        Some(info) => {
            println!("{}", serde_json::to_string_pretty(&super::service_json(&info))?);
            Ok(())
        }
        None => anyhow::bail!("{} did not answer within {} ms", args.name, args.timeout_ms),
    }
}
