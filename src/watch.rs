use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::vault::is_markdown;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Leading-edge debouncer: the first change of a burst fires at once, later
/// changes within `window` of that firing are absorbed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_fired: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            last_fired: None,
        }
    }

    /// Records a change at `now`; true when it should trigger a refresh.
    pub fn should_fire(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Debouncer::new(DEBOUNCE_WINDOW)
    }
}

/// Watches a vault recursively and sends `()` for every change to a markdown
/// file. The watcher must be kept alive for events to be received.
pub fn watch_vault(root: &Path) -> Result<(RecommendedWatcher, Receiver<()>)> {
    let (tx, rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            // Reads by any process fire access events; only content changes matter.
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            if event.paths.iter().any(|p| is_markdown(p)) {
                let _ = tx.send(());
            }
        }
    })
    .context("failed to create file watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;

    Ok((watcher, rx))
}

/// Waits for a change event with timeout.
/// Returns true if an event was received, false on timeout.
pub fn wait_for_change(rx: &Receiver<()>, timeout: Duration) -> bool {
    rx.recv_timeout(timeout).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_change_fires_and_burst_is_absorbed() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        assert!(debouncer.should_fire(start));
        assert!(!debouncer.should_fire(start + Duration::from_millis(100)));
        assert!(!debouncer.should_fire(start + Duration::from_millis(499)));
        assert!(debouncer.should_fire(start + Duration::from_millis(500)));
        assert!(!debouncer.should_fire(start + Duration::from_millis(700)));
    }
}
