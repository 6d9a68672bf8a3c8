/*
 * Corater
 * Copyright (C) 2026 The corater developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

//! Cooperative refresh across a graph of components.
//!
//! A component refreshes its dependencies before itself, and a visited set
//! passed through every call guarantees each component runs at most once per
//! top-level refresh, even when several components share a dependency or the
//! graph contains a cycle.

use std::sync::{Arc, Mutex};

use fnv::FnvHashSet;

/// Something whose derived state can be rebuilt from its source of truth:
/// reloading a file-backed model, clearing a cache, retraining a
/// factorization.
pub trait Refreshable: Send + Sync {
    /// Refreshes dependencies first, then local state. `already_refreshed`
    /// must be threaded through to every dependency refresh.
    fn refresh(&self, already_refreshed: &mut RefreshedComponents);
}

/// The components visited during one top-level refresh, identified by the
/// address of their shared allocation.
#[derive(Default)]
pub struct RefreshedComponents {
    seen: FnvHashSet<usize>,
}

impl RefreshedComponents {
    pub fn new() -> Self {
        RefreshedComponents::default()
    }

    /// Marks a component as visited. Returns true the first time a component
    /// is seen, false on every later call for the same allocation.
    pub fn once_for<T: ?Sized>(&mut self, component: &Arc<T>) -> bool {
        self.seen.insert(Arc::as_ptr(component).cast::<()>() as usize)
    }
}

/// Implements the refresh protocol for a component: refresh every
/// not-yet-visited dependency, then run the local action. Concurrent refresh
/// triggers racing on the same component are collapsed into one by a
/// non-blocking try-lock; the losing caller skips, since the work is already
/// happening.
pub struct RefreshHelper {
    dependencies: Vec<Arc<dyn Refreshable>>,
    guard: Mutex<()>,
}

impl RefreshHelper {
    pub fn new(dependencies: Vec<Arc<dyn Refreshable>>) -> Self {
        RefreshHelper { dependencies, guard: Mutex::new(()) }
    }

    pub fn add_dependency(&mut self, dependency: Arc<dyn Refreshable>) {
        self.dependencies.push(dependency);
    }

    pub fn refresh<F>(&self, already_refreshed: &mut RefreshedComponents, local_action: F)
    where
        F: FnOnce(),
    {
        if let Ok(_running) = self.guard.try_lock() {
            for dependency in &self.dependencies {
                if already_refreshed.once_for(dependency) {
                    dependency.refresh(already_refreshed);
                }
            }
            local_action();
        }
    }
}

/// Starts a top-level refresh at `component`.
pub fn refresh_now<T>(component: &Arc<T>)
where
    T: Refreshable + ?Sized,
{
    let mut already_refreshed = RefreshedComponents::new();
    already_refreshed.once_for(component);
    component.refresh(&mut already_refreshed);
}
