use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use mr::app::wc;
use mr::Worker;

#[derive(StructOpt, Debug)]
#[structopt(name = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Coordinator address
    #[structopt(short, long, default_value = "127.0.0.1:1234")]
    server: String,

    /// Directory for intermediate and output files
    #[structopt(short, long, default_value = ".", parse(from_os_str))]
    dir: PathBuf,

    /// Longest pause in milliseconds before asking again when told to wait
    #[structopt(long, default_value = "500")]
    wait_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let w = Worker {
        dir: opt.dir,
        server: opt.server,
        max_wait: Duration::from_millis(opt.wait_ms),
        map: wc::map,
        reduce: wc::reduce,
    };
    w.launch().await
}
