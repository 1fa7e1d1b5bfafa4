use clap::Args;
use ferrous_mdns_domain::{service_type_name, ServiceInfo, TxtProperties};
use ferrous_mdns_infrastructure::dns::MdnsEngine;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct RegisterArgs {
    /// Instance label, e.g. "Living Room Printer"
    pub instance: String,

    /// Service type, e.g. _ipp._tcp.local.
    pub service_type: String,

    pub port: u16,

    /// Address to advertise; omitted means no A/AAAA record
    #[arg(long)]
    pub address: Option<IpAddr>,

    /// Target host name; defaults to this machine's host name
    #[arg(long)]
    pub host: Option<String>,

    /// TXT property as key=value (or just key for a boolean flag)
    #[arg(long = "txt", value_name = "KEY=VALUE")]
    pub txt: Vec<String>,

    /// Record TTL in seconds
    #[arg(long)]
    pub ttl: Option<u32>,

    /// Fail instead of renaming when the name is taken
    #[arg(long)]
    pub no_rename: bool,
}

pub async fn run(engine: &Arc<MdnsEngine>, args: RegisterArgs) -> anyhow::Result<()> {
    let base = service_type_name(&args.service_type)?;
    let server = match args.host {
        Some(host) => host,
        None => local_host_name()?,
    };

    let mut properties = TxtProperties::new();
    for pair in &args.txt {
        match pair.split_once('=') {
            Some((key, value)) => properties.insert(key, value),
            None => properties.insert(pair, true),
        }
    }

    let mut info = ServiceInfo::new(
        args.service_type.as_str(),
        format!("{}.{}", args.instance, base),
    )
    .with_port(args.port)
    .with_server(server)
    .with_properties(properties)?;
    if let Some(address) = args.address {
        info = info.with_address(address);
    }

    engine
        .register_service(&mut info, args.ttl, !args.no_rename)
        .await?;
    println!("Registered {}", info.name);

    tokio::signal::ctrl_c().await?;
    info!(name = %info.name, "Interrupted, withdrawing service");
    engine.unregister_service(&info).await?;
    Ok(())
}

fn local_host_name() -> anyhow::Result<String> {
    let name = hostname::get()?.to_string_lossy().into_owned();
    let label = name.split('.').next().unwrap_or_default();
    Ok(format!("{}.local.", label))
}
