//! Subscription fan-out shared by the bus backends.
//!
//! Every subscription is a filter plus an unbounded queue. Delivering a
//! message pushes it onto every queue whose filter matches; queues whose
//! receiver was dropped are pruned on the way. Dropping all routes is how a
//! backend signals a lost connection: each subscription then reads
//! `BusError::Disconnected`.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use msync_common::bus::{BusError, BusMessage, Subscription, topic_matches};
use parking_lot::RwLock;
use std::time::Duration;

struct Route {
    filter: String,
    tx: Sender<BusMessage>,
}

/// Filter-keyed set of subscription queues.
#[derive(Default)]
pub(crate) struct Fanout {
    routes: RwLock<Vec<Route>>,
}

impl Fanout {
    /// Register a queue for `filter`.
    pub(crate) fn add(&self, filter: &str) -> QueueSubscription {
        let (tx, rx) = unbounded();
        self.routes.write().push(Route {
            filter: filter.to_string(),
            tx,
        });
        QueueSubscription { rx }
    }

    /// Push `message` to every matching queue; returns how many took it.
    pub(crate) fn deliver(&self, message: &BusMessage) -> usize {
        let mut delivered = 0;
        self.routes.write().retain(|route| {
            if !topic_matches(&route.filter, &message.topic) {
                return true;
            }
            let alive = route.tx.send(message.clone()).is_ok();
            delivered += usize::from(alive);
            alive
        });
        delivered
    }

    /// Disconnect every subscription; returns how many were dropped.
    pub(crate) fn drop_all(&self) -> usize {
        let mut routes = self.routes.write();
        let dropped = routes.len();
        routes.clear();
        dropped
    }

    /// Number of registered queues.
    pub(crate) fn len(&self) -> usize {
        self.routes.read().len()
    }
}

/// Receiving end of one subscription queue.
pub struct QueueSubscription {
    rx: Receiver<BusMessage>,
}

impl Subscription for QueueSubscription {
    fn next_message(&mut self, timeout: Duration) -> Result<Option<BusMessage>, BusError> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Disconnected),
        }
    }
}
