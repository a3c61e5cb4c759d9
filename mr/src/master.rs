use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures::{future, prelude::*};
use log::{info, trace};
use tarpc::{
    context,
    server::{self, incoming::Incoming, Channel},
    tokio_serde::formats::Json,
};

use crate::{Coordinator, CoordinatorError, ReportReply, Service, TaskReply, TaskType};

// Upper bound on worker connections served at once.
const MAX_CHANNELS: usize = 64;

// Implements the generated Service trait on top of a shared coordinator.
#[derive(Debug, Clone)]
struct CoordinatorServer {
    peer: Option<SocketAddr>,
    coordinator: Arc<Coordinator>,
}

impl Service for CoordinatorServer {
    async fn request_task(self, _: context::Context) -> Result<TaskReply, CoordinatorError> {
        let reply = self.coordinator.request_task();
        trace!("request_task from {:?}: {:?}", self.peer, reply);
        reply
    }

    async fn report_task(
        self,
        _: context::Context,
        task_type: TaskType,
        id: usize,
    ) -> Result<ReportReply, CoordinatorError> {
        trace!("report_task from {:?}: {:?} {}", self.peer, task_type, id);
        self.coordinator.report_task(task_type, id)
    }

    async fn done(self, _: context::Context) -> bool {
        self.coordinator.done()
    }
}

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

/// Serves a [`Coordinator`] to workers over TCP.
pub struct Master {
    pub addr: SocketAddr,
    pub max_channels_per_ip: u32,
    pub coordinator: Arc<Coordinator>,
}

impl Master {
    /// Binds the listener, returning the bound address and the future that
    /// serves connections on it.
    pub async fn listen(
        &self,
    ) -> io::Result<(SocketAddr, impl Future<Output = ()> + Send + 'static)> {
        let mut listener = tarpc::serde_transport::tcp::listen(&self.addr, Json::default).await?;
        listener.config_mut().max_frame_length(usize::MAX);
        let local_addr = listener.local_addr();
        let coordinator = self.coordinator.clone();

        let serve = listener
            // Ignore accept errors.
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .max_channels_per_key(self.max_channels_per_ip, |t| {
                t.transport()
                    .peer_addr()
                    .map(|a| a.ip())
                    .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            })
            .map(move |channel| {
                let server = CoordinatorServer {
                    peer: channel.transport().peer_addr().ok(),
                    coordinator: coordinator.clone(),
                };
                channel.execute(server.serve()).for_each(spawn)
            })
            .buffer_unordered(MAX_CHANNELS)
            .for_each(|_| async {});
        Ok((local_addr, serve))
    }

    pub async fn launch(&self) -> io::Result<()> {
        let (addr, serve) = self.listen().await?;
        info!("coordinator listening on {}", addr);
        serve.await;
        Ok(())
    }
}
