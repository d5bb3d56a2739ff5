//! Dial dispatch and the reconciliation loop.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Semaphore};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::state::FinderState;
use super::Finder;
use crate::domain::Node;
use crate::ports::ConnectError;

impl Finder {
    /// Queue a connection attempt unless one is already in flight.
    ///
    /// Ignores the peer ceiling; callers that admit nodes check it first.
    pub fn dial(&self, node: Node) {
        let mut state = self.state.write();
        self.dial_locked(&mut state, node);
    }

    pub(super) fn dial_locked(&self, state: &mut FinderState, node: Node) {
        if !state.dialing.insert(node.id) {
            return;
        }
        if let Err(mpsc::error::SendError(node)) = self.dial_tx.send(node) {
            // Dispatcher gone: the finder was stopped
            state.dialing.remove(&node.id);
        }
    }

    /// The single exit of a connection attempt.
    pub(crate) fn finish_dial(&self, node: &Node, result: Result<(), ConnectError>) {
        match result {
            Ok(()) => debug!(id = ?node.id, "dial succeeded"),
            Err(e) => debug!(id = ?node.id, error = %e, "dial failed"),
        }
        self.state.write().dialing.remove(&node.id);
    }

    /// One reconciliation pass.
    pub(crate) fn tick(&self) {
        let max_peers = self.config.max_peers;
        let remaining = {
            let mut state = self.state.write();

            if self.total_locked(&state) < max_peers {
                for node in &self.static_nodes {
                    self.dial_locked(&mut state, node.clone());
                }
                if state.self_is_sbp {
                    let targets: Vec<Node> = state.targets.values().cloned().collect();
                    for node in targets {
                        self.dial_locked(&mut state, node);
                    }
                }
            }

            max_peers.saturating_sub(self.total_locked(&state))
        };

        if remaining == 0 {
            return;
        }
        let Some(resolver) = self.resolver.read().clone() else {
            return;
        };

        let candidates = resolver.get_nodes(remaining * 2);
        let mut state = self.state.write();
        for node in candidates {
            self.dial_locked(&mut state, node);
        }
    }

    /// Run attempts from the queue, at most `max_concurrent_dials` at once.
    ///
    /// Attempts already running when the finder stops are left to finish.
    pub(super) async fn run_dialer(
        self: Arc<Self>,
        mut queue: mpsc::UnboundedReceiver<Node>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_dials.max(1)));

        while !*shutdown.borrow() {
            let node = tokio::select! {
                next = queue.recv() => match next {
                    Some(node) => node,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };

            let permit = tokio::select! {
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => {
                    self.finish_dial(&node, Err(ConnectError::Io("finder stopped".into())));
                    break;
                }
            };

            let finder = Arc::clone(&self);
            tokio::spawn(async move {
                let result = finder.connector.connect_node(&node).await;
                drop(permit);
                finder.finish_dial(&node, result);
            });
        }

        queue.close();
        while let Ok(node) = queue.try_recv() {
            self.finish_dial(&node, Err(ConnectError::Io("finder stopped".into())));
        }
        debug!("dial dispatcher stopped");
    }

    /// Tick every `check_interval` until stopped. The first tick comes one
    /// interval after start.
    pub(super) async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.check_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                _ = shutdown.changed() => break,
            }
        }
        info!("finder loop stopped");
    }
}
