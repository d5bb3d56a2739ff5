//! Outbound requests, lookups and the refresh loop.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use super::{Discovery, DiscoveryError};
use crate::domain::{InsertOutcome, Node, NodeId};
use crate::wire::{FindNode, Message, MessageCode, Ping, MAX_NEIGHBORS_NODES};

impl Discovery {
    /// Ping `node` and wait for its Pong.
    ///
    /// A node that answers is added to the table.
    pub async fn ping(&self, node: &Node) -> Result<(), DiscoveryError> {
        let ping = Message::Ping(Ping {
            id: self.id(),
            ext: self.self_node.ext.clone(),
        });
        let (packet, hash) = ping.pack(&self.key)?;

        let mut reply = self.correlator.expect(MessageCode::Pong, node.id, Some(hash));
        self.sender.send_packet(node.udp_addr(), &packet)?;

        match time::timeout(self.config.request_timeout, reply.recv()).await {
            Ok(Some(_)) => {
                self.learn(node.clone());
                Ok(())
            }
            _ => Err(DiscoveryError::Timeout(node.id)),
        }
    }

    /// Ask `node` for the nodes it knows closest to `target`.
    ///
    /// Collects Neighbors replies until a full answer arrived or the request
    /// timeout elapsed.
    pub async fn find_node(&self, node: &Node, target: NodeId) -> Result<Vec<Node>, DiscoveryError> {
        let find = Message::FindNode(FindNode {
            id: self.id(),
            target,
        });
        let (packet, _) = find.pack(&self.key)?;

        let mut reply = self.correlator.expect(MessageCode::Neighbors, node.id, None);
        self.sender.send_packet(node.udp_addr(), &packet)?;

        let deadline = Instant::now() + self.config.request_timeout;
        let mut nodes = Vec::new();
        while nodes.len() < MAX_NEIGHBORS_NODES {
            match time::timeout_at(deadline, reply.recv()).await {
                Ok(Some(Message::Neighbors(neighbors))) => nodes.extend(neighbors.nodes),
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }

        if nodes.is_empty() {
            return Err(DiscoveryError::Timeout(node.id));
        }
        Ok(nodes)
    }

    /// Iterative lookup toward `target`.
    ///
    /// Each round queries the `alpha` closest table nodes not yet asked. The
    /// lookup ends when a round learns nothing new. Returns the nodes that
    /// entered the table.
    pub async fn lookup(self: &Arc<Self>, target: NodeId) -> Vec<Node> {
        let mut asked = HashSet::new();
        let mut found = Vec::new();

        loop {
            let seeds: Vec<Node> = self
                .table
                .closest_to(&target, self.config.table.k)
                .into_iter()
                .filter(|n| !asked.contains(&n.id))
                .take(self.config.table.alpha)
                .collect();
            if seeds.is_empty() {
                break;
            }

            let mut queries = JoinSet::new();
            for seed in seeds {
                asked.insert(seed.id);
                let this = Arc::clone(self);
                queries.spawn(async move {
                    let result = this.find_node(&seed, target).await;
                    (seed.id, result)
                });
            }

            let mut learned = 0;
            while let Some(joined) = queries.join_next().await {
                match joined {
                    Ok((_, Ok(nodes))) => {
                        for node in nodes {
                            if self.learn(node.clone()) == InsertOutcome::Inserted {
                                learned += 1;
                                found.push(node);
                            }
                        }
                    }
                    Ok((seed, Err(e))) => debug!(?seed, error = %e, "find node failed"),
                    Err(e) => warn!(error = %e, "lookup query task failed"),
                }
            }

            if learned == 0 {
                break;
            }
        }

        found
    }

    /// Ping every bootstrap node concurrently. Returns how many answered.
    pub async fn bootstrap(self: &Arc<Self>) -> usize {
        let mut pings = JoinSet::new();
        for node in self.bootstrap_nodes.clone() {
            let this = Arc::clone(self);
            pings.spawn(async move { this.ping(&node).await });
        }

        let mut answered = 0;
        while let Some(joined) = pings.join_next().await {
            match joined {
                Ok(Ok(())) => answered += 1,
                Ok(Err(e)) => debug!(error = %e, "bootstrap ping failed"),
                Err(e) => warn!(error = %e, "bootstrap task failed"),
            }
        }
        answered
    }

    /// Keep the table populated until `shutdown` fires.
    ///
    /// Bootstraps first, then looks up a random target every
    /// `refresh_interval`. An empty table triggers a new bootstrap.
    pub async fn run_refresh(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let answered = self.bootstrap().await;
        info!(
            answered,
            configured = self.bootstrap_nodes.len(),
            "discovery bootstrap finished"
        );

        let mut ticker = time::interval(self.config.refresh_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.table.is_empty() {
                        self.bootstrap().await;
                    }
                    let target = NodeId::new(rand::random());
                    let found = self.lookup(target).await;
                    debug!(found = found.len(), table = self.table.len(), "discovery refresh");
                }
                _ = shutdown.changed() => {
                    info!("discovery refresh stopped");
                    break;
                }
            }
        }
    }
}
