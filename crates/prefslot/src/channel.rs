//! Replay-latest change notification.
//!
//! A [`ChangeChannel`] remembers the most recent value and fans every new
//! value out to its observers. Each observer owns an unbounded queue, so
//! emitting never waits on a slow consumer. A new observer first receives
//! the remembered value, then everything emitted after it attached.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::trace;

struct Observer<V> {
    id: u64,
    sender: mpsc::UnboundedSender<V>,
}

struct ChannelState<V> {
    latest: V,
    observers: Vec<Observer<V>>,
    next_id: u64,
}

// The state is consistent after every statement that mutates it, so a
// panic in another holder leaves nothing to repair.
fn lock<V>(state: &Mutex<ChannelState<V>>) -> MutexGuard<'_, ChannelState<V>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast of the latest value to any number of observers.
///
/// Emissions are delivered in the order `emit` was called. The channel has
/// no terminal signal: observers only stop receiving when they detach or
/// the channel is dropped.
pub struct ChangeChannel<V> {
    state: Arc<Mutex<ChannelState<V>>>,
}

impl<V: Clone + Send + 'static> ChangeChannel<V> {
    /// Create a channel remembering `initial`.
    pub fn new(initial: V) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                latest: initial,
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Remember `value` and deliver it to every attached observer.
    ///
    /// Observers whose subscription has been dropped are pruned.
    pub fn emit(&self, value: V) {
        let mut state = lock(&self.state);
        state
            .observers
            .retain(|observer| observer.sender.send(value.clone()).is_ok());
        state.latest = value;
    }

    /// The most recently emitted (or initial) value.
    pub fn latest(&self) -> V {
        lock(&self.state).latest.clone()
    }

    /// Attach an observer, replaying the latest value to it first.
    pub fn subscribe(&self) -> Subscription<V> {
        let mut state = lock(&self.state);
        self.attach(&mut state)
    }

    /// Replace the remembered value with `current`, then attach an observer.
    ///
    /// Existing observers are not notified. Used when the owner knows the
    /// effective value may have moved without an emission.
    pub fn subscribe_with(&self, current: V) -> Subscription<V> {
        let mut state = lock(&self.state);
        state.latest = current;
        self.attach(&mut state)
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        let state = lock(&self.state);
        state
            .observers
            .iter()
            .filter(|observer| !observer.sender.is_closed())
            .count()
    }

    fn attach(&self, state: &mut ChannelState<V>) -> Subscription<V> {
        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, so the replay cannot fail.
        let _ = sender.send(state.latest.clone());

        let id = state.next_id;
        state.next_id += 1;
        state.observers.push(Observer { id, sender });
        trace!(observer = id, "observer attached");

        Subscription {
            id,
            receiver,
            channel: Arc::downgrade(&self.state),
        }
    }
}

impl<V> fmt::Debug for ChangeChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observers = lock(&self.state).observers.len();
        f.debug_struct("ChangeChannel")
            .field("observers", &observers)
            .finish()
    }
}

/// An observer's handle on a [`ChangeChannel`].
///
/// Dropping the subscription detaches it.
pub struct Subscription<V> {
    id: u64,
    receiver: mpsc::UnboundedReceiver<V>,
    channel: Weak<Mutex<ChannelState<V>>>,
}

impl<V> Subscription<V> {
    /// Wait for the next value.
    ///
    /// Returns `None` once the subscription is detached (or the channel
    /// dropped) and every value queued before that has been received.
    pub async fn recv(&mut self) -> Option<V> {
        self.receiver.recv().await
    }

    /// Take the next queued value without waiting.
    pub fn try_recv(&mut self) -> Option<V> {
        self.receiver.try_recv().ok()
    }

    /// Take every value queued so far.
    pub fn drain(&mut self) -> Vec<V> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Stop receiving new values.
    ///
    /// Values already queued stay readable. Safe to call repeatedly and
    /// from any thread, including while the channel is emitting.
    pub fn detach(&mut self) {
        let channel = std::mem::take(&mut self.channel);
        if let Some(state) = channel.upgrade() {
            lock(&state).observers.retain(|observer| observer.id != self.id);
            trace!(observer = self.id, "observer detached");
        }
    }

    /// `true` while the subscription can still receive new values.
    pub fn is_attached(&self) -> bool {
        self.channel.strong_count() > 0
    }
}

impl<V> Drop for Subscription<V> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<V> fmt::Debug for Subscription<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}
