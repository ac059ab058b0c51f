// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fire-and-forget backend calls spawned by one evaluation.

use std::future::Future;
use tokio::task::JoinHandle;

/// Backend calls started by a single tick.
///
/// The tracking loop drops this immediately: a dropped `JoinHandle` detaches
/// its task, so calls keep running and never hold up the next fix. Callers
/// that need to observe the outcome (tests, shutdown) can await [`settled`].
///
/// [`settled`]: Dispatch::settled
#[derive(Debug, Default)]
pub struct Dispatch {
    handles: Vec<JoinHandle<()>>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `call` on the runtime and track it.
    pub fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(call));
    }

    /// Number of calls started.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every call to finish.
    pub async fn settled(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Backend call task did not complete");
            }
        }
    }
}
