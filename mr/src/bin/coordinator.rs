use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::ensure;
use log::{info, warn};
use structopt::StructOpt;

use mr::{create_map_tasks, create_reduce_tasks, Coordinator, Master, Phase};

#[derive(StructOpt, Debug)]
#[structopt(name = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Port to start coordinator server
    #[structopt(short, long, default_value = "1234")]
    port: u16,

    /// Number of reduce partitions
    #[structopt(long, default_value = "10")]
    nreduce: usize,

    /// Worker connections accepted from a single IP
    #[structopt(long, default_value = "32")]
    max_channels_per_ip: u32,

    /// Files to process, one map task each
    #[structopt(name = "FILE")]
    files: Vec<String>,
}

// Starts in the map phase with one reduce task per partition.
fn build_coordinator(files: &[String], nreduce: usize) -> anyhow::Result<Coordinator> {
    ensure!(nreduce > 0, "--nreduce should be non-zero");
    Ok(Coordinator::from_parts(
        create_map_tasks(files),
        create_reduce_tasks(nreduce),
        nreduce,
        Phase::Map,
    )?)
}

async fn wait_until_done(coordinator: &Coordinator) {
    while !coordinator.done() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let coordinator = Arc::new(build_coordinator(&opt.files, opt.nreduce)?);
    let m = Master {
        addr: SocketAddr::from((Ipv4Addr::LOCALHOST, opt.port)),
        max_channels_per_ip: opt.max_channels_per_ip,
        coordinator: coordinator.clone(),
    };

    let (addr, serve) = m.listen().await?;
    info!(
        "coordinator listening on {} with {} map and {} reduce tasks",
        addr,
        opt.files.len(),
        opt.nreduce
    );

    tokio::select! {
        _ = serve => warn!("listener closed"),
        _ = wait_until_done(&coordinator) => info!("job finished"),
        r = tokio::signal::ctrl_c() => {
            r?;
            info!("interrupted, exiting");
        }
    }
    Ok(())
}
