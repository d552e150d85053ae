// Copyright 2025 Eric Jingryd (tidynest@proton.me)
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

//! File system watcher for live codes file reloading
//!
//! Uses OS-level file watching (Linux inotify) via the notify crate.
//! The parent directory is watched so that editors which save by
//! writing a new file and renaming it over the old one are still seen.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{channel, Receiver},
};

use crate::config::ConfigError;

/// Watches the codes file for modifications
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    path: PathBuf,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Result<Self, ConfigError> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        Ok(FileWatcher {
            _watcher: watcher,
            rx,
            path,
        })
    }

    /// Checks for modification events on the watched file (non-blocking)
    ///
    /// Drains every pending event, so one burst of writes reports once.
    pub fn check_for_changes(&self) -> bool {
        let mut changed = false;

        while let Ok(event_result) = self.rx.try_recv() {
            match event_result {
                Ok(event) if self.is_relevant(&event) => changed = true,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "file watcher error"),
            }
        }

        changed
    }

    fn is_relevant(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && event.paths.iter().any(|p| same_file_name(p, &self.path))
    }
}

fn same_file_name(a: &Path, b: &Path) -> bool {
    a.file_name().is_some() && a.file_name() == b.file_name()
}
