use super::expansion::{ExpansionChange, ExpansionTracker};
use super::model::{ExpandOutcome, TreeModel};
use super::node::{LoadState, NodeKey, TreeNode};
use super::provider::{MetadataProvider, fetch_children};
use crate::error::{MetadataError, UpstairsError};
use ahash::AHashMap;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Immutable copy of the visible list, published after every mutation.
pub type Snapshot = Arc<Vec<TreeNode>>;

#[derive(Debug)]
pub enum TreeMessage {
    /// Replace the tree with a fresh list of database nodes.
    SetRoots(Vec<TreeNode>),

    /// Start forwarding expansion changes from this tracker subscription.
    /// Ignored while a forwarder is already running.
    Attach(mpsc::UnboundedReceiver<ExpansionChange>),

    /// Stop forwarding expansion changes and cancel every in-flight fetch.
    Detach(RpcReplyPort<()>),

    /// A batch of expansion changes: expand `added` in order, collapse `removed` in reverse.
    ExpansionChanged(ExpansionChange),

    /// Expand or collapse one node directly.
    Toggle { key: NodeKey, expand: bool },

    /// Current visible list.
    Snapshot(RpcReplyPort<Snapshot>),

    // Internal messages (sent by fetch tasks)
    /// A child fetch finished; applied only if `generation` is still the live one.
    FetchCompleted {
        key: NodeKey,
        generation: u64,
        result: Result<Vec<TreeNode>, MetadataError>,
    },
}

/// Handle to the lazy tree data source.
///
/// All mutation happens inside one actor, so expand/collapse requests and fetch
/// completions apply one at a time in mailbox order. Consumers observe the tree
/// only through [`Snapshot`]s.
#[derive(Clone)]
pub struct LazyTreeDataSource {
    actor: ActorRef<TreeMessage>,
    snapshots: watch::Receiver<Snapshot>,
    tracker: ExpansionTracker,
}

impl LazyTreeDataSource {
    pub async fn spawn(
        provider: Arc<dyn MetadataProvider>,
        tracker: ExpansionTracker,
    ) -> Result<Self, UpstairsError> {
        let (publisher, snapshots) = watch::channel(Snapshot::default());
        let (actor, _jh) = Actor::spawn(None, TreeActor, (provider, publisher))
            .await
            .map_err(|e| UpstairsError::RactorError(format!("TreeActor spawn failed: {e}")))?;

        Ok(Self {
            actor,
            snapshots,
            tracker,
        })
    }

    pub fn tracker(&self) -> &ExpansionTracker {
        &self.tracker
    }

    pub fn set_roots(&self, roots: Vec<TreeNode>) -> Result<(), UpstairsError> {
        ractor::cast!(self.actor, TreeMessage::SetRoots(roots))
            .map_err(|e| UpstairsError::RactorError(format!("SetRoots cast failed: {e}")))
    }

    /// Attach to the expansion tracker and stream the visible list.
    ///
    /// The stream yields the current list right away, again after every
    /// mutation, and once per `viewport` tick.
    pub fn connect<V>(&self, viewport: V) -> Result<BoxStream<'static, Snapshot>, UpstairsError>
    where
        V: Stream<Item = ()> + Send + 'static,
    {
        // Subscribe here so changes made right after `connect` are buffered.
        let changes = self.tracker.subscribe();
        ractor::cast!(self.actor, TreeMessage::Attach(changes))
            .map_err(|e| UpstairsError::RactorError(format!("Attach cast failed: {e}")))?;

        let updates = WatchStream::new(self.snapshots.clone());
        let latest = self.snapshots.clone();
        let refreshes = viewport.map(move |()| latest.borrow().clone());

        Ok(stream::select(updates, refreshes).boxed())
    }

    pub fn handle_expansion_change(&self, change: ExpansionChange) -> Result<(), UpstairsError> {
        ractor::cast!(self.actor, TreeMessage::ExpansionChanged(change)).map_err(|e| {
            UpstairsError::RactorError(format!("ExpansionChanged cast failed: {e}"))
        })
    }

    pub fn toggle_node(&self, key: NodeKey, expand: bool) -> Result<(), UpstairsError> {
        ractor::cast!(self.actor, TreeMessage::Toggle { key, expand })
            .map_err(|e| UpstairsError::RactorError(format!("Toggle cast failed: {e}")))
    }

    /// Visible list after every previously sent request has been applied.
    pub async fn snapshot(&self) -> Result<Snapshot, UpstairsError> {
        ractor::call!(self.actor, TreeMessage::Snapshot)
            .map_err(|e| UpstairsError::RactorError(format!("Snapshot RPC failed: {e}")))
    }

    /// Latest published list without a round trip.
    pub fn current(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Wait until `key` is visible and its fetch has finished (loaded or failed).
    pub async fn wait_until_settled(
        &self,
        key: &NodeKey,
        timeout: Duration,
    ) -> Result<TreeNode, UpstairsError> {
        let mut rx = self.snapshots.clone();
        let wait = async {
            let snapshot = rx
                .wait_for(|s| settled_node(s, key).is_some())
                .await
                .map_err(|_| UpstairsError::RactorError("tree actor stopped".to_string()))?;
            settled_node(&snapshot, key)
                .ok_or_else(|| UpstairsError::UnexpectedError(format!("{key} vanished")))
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| UpstairsError::Timeout(timeout))?
    }

    /// Stop reacting to expansion changes and cancel in-flight fetches.
    pub async fn detach(&self) -> Result<(), UpstairsError> {
        ractor::call!(self.actor, TreeMessage::Detach)
            .map_err(|e| UpstairsError::RactorError(format!("Detach RPC failed: {e}")))
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}

fn settled_node(snapshot: &[TreeNode], key: &NodeKey) -> Option<TreeNode> {
    snapshot
        .iter()
        .find(|n| n.key() == *key)
        .filter(|n| matches!(n.state, LoadState::Loaded | LoadState::Failed(_)))
        .cloned()
}

struct InFlight {
    generation: u64,
    task: AbortHandle,
}

struct TreeActorState {
    model: TreeModel,
    provider: Arc<dyn MetadataProvider>,
    publisher: watch::Sender<Snapshot>,
    inflight: AHashMap<NodeKey, InFlight>,
    next_generation: u64,
    subscription: Option<JoinHandle<()>>,
}

struct TreeActor;

#[ractor::async_trait]
impl Actor for TreeActor {
    type Msg = TreeMessage;
    type State = TreeActorState;
    type Arguments = (Arc<dyn MetadataProvider>, watch::Sender<Snapshot>);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (provider, publisher): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!("TreeActor initialized");
        Ok(TreeActorState {
            model: TreeModel::new(),
            provider,
            publisher,
            inflight: AHashMap::new(),
            next_generation: 0,
            subscription: None,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TreeMessage::SetRoots(roots) => {
                state.cancel_all();
                state.model.set_roots(roots);
                info!(roots = state.model.len(), "Tree roots replaced");
                state.publish();
            }
            TreeMessage::Attach(changes) => state.attach(&myself, changes),
            TreeMessage::Detach(reply) => {
                state.detach();
                state.publish();
                let _ = reply.send(());
            }
            TreeMessage::ExpansionChanged(change) => {
                state.handle_expansion_change(&myself, &change);
            }
            TreeMessage::Toggle { key, expand } => state.toggle_node(&myself, &key, expand),
            TreeMessage::Snapshot(reply) => {
                let _ = reply.send(state.publisher.borrow().clone());
            }
            TreeMessage::FetchCompleted {
                key,
                generation,
                result,
            } => state.complete_fetch(&key, generation, result),
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.detach();
        debug!("TreeActor stopped");
        Ok(())
    }
}

impl TreeActorState {
    fn publish(&self) {
        self.publisher.send_replace(Arc::new(self.model.snapshot()));
    }

    fn attach(
        &mut self,
        myself: &ActorRef<TreeMessage>,
        mut changes: mpsc::UnboundedReceiver<ExpansionChange>,
    ) {
        if self
            .subscription
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            debug!("Tree already attached to expansion tracker");
            return;
        }

        let myself = myself.clone();
        self.subscription = Some(tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                if myself.cast(TreeMessage::ExpansionChanged(change)).is_err() {
                    break;
                }
            }
        }));
        info!("Tree attached to expansion tracker");
    }

    fn detach(&mut self) {
        if let Some(task) = self.subscription.take() {
            task.abort();
            info!("Tree detached from expansion tracker");
        }
        self.cancel_all();
    }

    fn cancel_all(&mut self) {
        for (key, fetch) in self.inflight.drain() {
            fetch.task.abort();
            self.model.reset(&key);
            debug!(node = %key, generation = fetch.generation, "Cancelled in-flight fetch");
        }
    }

    fn handle_expansion_change(&mut self, myself: &ActorRef<TreeMessage>, change: &ExpansionChange) {
        for key in &change.added {
            self.toggle_node(myself, key, true);
        }
        // Collapse newest first so earlier removals do not shift later spans.
        for key in change.removed.iter().rev() {
            self.toggle_node(myself, key, false);
        }
    }

    fn toggle_node(&mut self, myself: &ActorRef<TreeMessage>, key: &NodeKey, expand: bool) {
        if expand {
            match self.model.expand(key) {
                ExpandOutcome::Spliced(count) => {
                    debug!(node = %key, children = count, "Expanded from cache");
                    self.publish();
                }
                ExpandOutcome::NeedsFetch => {
                    self.spawn_fetch(myself, key);
                    self.publish();
                }
                outcome => debug!(node = %key, ?outcome, "Expand skipped"),
            }
            return;
        }

        let outcome = self.model.collapse(key);
        for cancelled in &outcome.cancelled {
            if let Some(fetch) = self.inflight.remove(cancelled) {
                fetch.task.abort();
                debug!(
                    node = %cancelled,
                    generation = fetch.generation,
                    "Cancelled fetch of collapsed node"
                );
            }
        }
        if outcome.removed > 0 || !outcome.cancelled.is_empty() {
            debug!(node = %key, removed = outcome.removed, "Collapsed");
            self.publish();
        }
    }

    fn spawn_fetch(&mut self, myself: &ActorRef<TreeMessage>, key: &NodeKey) {
        let Some(parent) = self.model.node(key) else {
            return;
        };
        self.next_generation += 1;
        let generation = self.next_generation;

        let provider = Arc::clone(&self.provider);
        let myself = myself.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = fetch_children(provider.as_ref(), &parent).await;
            let completed = TreeMessage::FetchCompleted {
                key: task_key,
                generation,
                result,
            };
            if let Err(e) = myself.cast(completed) {
                debug!("Tree actor gone before fetch completed: {e}");
            }
        });

        debug!(node = %key, generation, "Fetching children");
        let fetch = InFlight {
            generation,
            task: task.abort_handle(),
        };
        if let Some(previous) = self.inflight.insert(key.clone(), fetch) {
            previous.task.abort();
        }
    }

    fn complete_fetch(
        &mut self,
        key: &NodeKey,
        generation: u64,
        result: Result<Vec<TreeNode>, MetadataError>,
    ) {
        match self.inflight.get(key) {
            Some(fetch) if fetch.generation == generation => {
                self.inflight.remove(key);
            }
            _ => {
                debug!(node = %key, generation, "Discarding stale fetch result");
                return;
            }
        }

        match result {
            Ok(children) => {
                let count = children.len();
                let spliced = self.model.complete_fetch(key, children);
                debug!(node = %key, children = count, spliced, "Children loaded");
            }
            Err(MetadataError::NotFound(reason)) => {
                self.model.reset(key);
                info!(node = %key, %reason, "Node no longer exists on the backend");
            }
            Err(MetadataError::FetchFailed(message)) => {
                warn!(node = %key, error = %message, "Child fetch failed");
                self.model.fail_fetch(key, message);
            }
        }
        self.publish();
    }
}
