use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::registry::CallbackId;
use crate::trampoline;

/// Outcome of [`Glue::initialize`](crate::Glue::initialize).
///
/// Resolves to `true` once the library reports the initialized state and to
/// `false` on disconnection or when the initialize call itself failed. The
/// state callback stays registered until the handshake resolves or is
/// dropped. The sender lives on a library thread; the oneshot channel wakes
/// the awaiting task wherever it is scheduled.
#[must_use = "the handshake does nothing unless awaited"]
#[derive(Debug)]
pub struct Handshake {
    id: Option<CallbackId>,
    state: State,
}

#[derive(Debug)]
enum State {
    Ready(bool),
    Pending(oneshot::Receiver<bool>),
}

impl Handshake {
    pub(crate) fn pending(id: CallbackId, rx: oneshot::Receiver<bool>) -> Self {
        Self {
            id: Some(id),
            state: State::Pending(rx),
        }
    }

    /// Already resolved; nothing is registered.
    pub(crate) fn ready(initialized: bool) -> Self {
        Self {
            id: None,
            state: State::Ready(initialized),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending(_))
    }

    fn finish(&mut self, initialized: bool) -> bool {
        if let Some(id) = self.id.take() {
            trampoline::unregister(id);
        }
        self.state = State::Ready(initialized);
        initialized
    }
}

impl Future for Handshake {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let this = self.get_mut();
        let outcome = match &mut this.state {
            State::Ready(initialized) => return Poll::Ready(*initialized),
            State::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(initialized)) => initialized,
                // the callback went away without a terminal state
                Poll::Ready(Err(_)) => false,
            },
        };
        Poll::Ready(this.finish(outcome))
    }
}

impl Drop for Handshake {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            trampoline::unregister(id);
        }
    }
}
