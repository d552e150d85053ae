// Copyright 2025 bakri (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Keystroke sources and subscriptions
//!
//! Matchers never read a device themselves. They attach to an `EventSource`,
//! a process-wide stream of keystrokes that any number of matchers can
//! observe independently. `InputBus` is the in-process implementation:
//! whatever captures raw input (a terminal, a window, a test) calls
//! `dispatch` once per keystroke, in arrival order.
//!
//! # Example
//! ```
//! use cheat_codes::core::{CodeConfig, KeyEvent};
//! use cheat_codes::input::{InputBus, Subscription};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(InputBus::new());
//! let mut subscription = Subscription::new(bus.clone());
//! subscription.start(CodeConfig::new("dev"), Arc::new(|| println!("dev mode")))?;
//!
//! for c in "dev".chars() {
//!     bus.dispatch(KeyEvent::from_char(c));
//! }
//! subscription.close().await; // drains pending keystrokes, prints "dev mode"
//! # Ok(())
//! # }
//! ```

pub mod subscription;

use std::io::{self, BufRead};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, MutexGuard, PoisonError,
};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::core::types::KeyEvent;

pub use subscription::Subscription;

/// Identifies one attached listener
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId(u64);

/// A keystroke stamped with its arrival time
#[derive(Clone, Debug, PartialEq)]
pub struct Keystroke {
    pub event: KeyEvent,
    pub at: Instant,
}

/// Injectable source of keystrokes
///
/// Every attached listener receives every keystroke dispatched after it
/// attached, unbuffered and in order. Detaching closes the listener's
/// channel once the keystrokes already delivered to it are drained.
pub trait EventSource: Send + Sync {
    fn attach(&self) -> (ListenerId, UnboundedReceiver<Keystroke>);
    fn detach(&self, id: ListenerId);
}

/// Current instant on the runtime clock
///
/// Follows tokio's clock, so a paused test runtime controls it.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// In-process, shared keystroke stream
#[derive(Debug, Default)]
pub struct InputBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, UnboundedSender<Keystroke>)>>,
}

impl InputBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one keystroke to every attached listener
    ///
    /// Returns the number of listeners reached. Listeners whose receiving
    /// side is gone are pruned.
    pub fn dispatch(&self, event: KeyEvent) -> usize {
        let keystroke = Keystroke { event, at: now() };
        let mut listeners = self.lock();

        listeners.retain(|(id, tx)| {
            let delivered = tx.send(keystroke.clone()).is_ok();
            if !delivered {
                warn!(listener = ?id, "pruning listener with a closed channel");
            }
            delivered
        });

        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, UnboundedSender<Keystroke>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSource for InputBus {
    fn attach(&self) -> (ListenerId, UnboundedReceiver<Keystroke>) {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        self.lock().push((id, tx));
        debug!(listener = ?id, "listener attached");
        (id, rx)
    }

    fn detach(&self, id: ListenerId) {
        self.lock().retain(|(listener, _)| *listener != id);
        debug!(listener = ?id, "listener detached");
    }
}

/// Feeds a line-oriented reader into the bus, one keystroke per character
///
/// Line terminators are delivered too, as a typed Enter would be. Bytes
/// that are not valid UTF-8 arrive as U+FFFD. Blocks until the reader is
/// exhausted and returns the number of keystrokes.
pub fn pump_lines<R: BufRead>(mut reader: R, bus: &InputBus) -> io::Result<usize> {
    let mut line = Vec::new();
    let mut count = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        for c in String::from_utf8_lossy(&line).chars() {
            bus.dispatch(KeyEvent::from_char(c));
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests;
