//! Time-driven description scrolling and auto-clearing status messages
//!
//! Both are polled from the main loop with the current [`Instant`]; there are
//! no background timers.

use std::time::{Duration, Instant};

/// Gap appended to a description before it wraps around
const SCROLL_GAP: &str = "    ";

/// Extra ticks past the end of a description before the offset restarts
const SCROLL_OVERRUN: usize = 10;

/// Marquee offset for a description wider than the character budget
#[derive(Debug, Clone)]
pub struct ScrollController {
    offset: usize,
    last_tick: Option<Instant>,
    interval: Duration,
}

impl ScrollController {
    pub fn new(interval: Duration) -> Self {
        Self {
            offset: 0,
            last_tick: None,
            interval,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Restart from the beginning of the text, e.g. when the selection changes
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Advance the marquee if it is due.
    ///
    /// `active` is false whenever scrolling is suspended (not in the script
    /// list, or a status message or overlay is showing). Returns true when the
    /// offset moved and the description needs redrawing.
    pub fn tick(&mut self, now: Instant, active: bool, description: &str, budget: usize) -> bool {
        if !active {
            return false;
        }
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_tick = Some(now);

        let len = description.chars().count();
        if len <= budget {
            return false;
        }

        self.offset += 1;
        if self.offset > len + SCROLL_OVERRUN {
            self.offset = 0;
        }
        true
    }

    /// Visible window of `description` at the current offset.
    ///
    /// Text that fits the budget is returned unchanged.
    pub fn visible(&self, description: &str, budget: usize) -> String {
        if description.chars().count() <= budget {
            return description.to_string();
        }

        let padded: Vec<char> = description.chars().chain(SCROLL_GAP.chars()).collect();
        let start = self.offset % padded.len();
        padded
            .iter()
            .chain(padded.iter())
            .skip(start)
            .take(budget)
            .collect()
    }
}

/// Transient status message with an optional expiry
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    message: Option<String>,
    expires_at: Option<Instant>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` until `now + ttl`
    pub fn show(&mut self, text: impl Into<String>, now: Instant, ttl: Duration) {
        self.message = Some(text.into());
        self.expires_at = Some(now + ttl);
    }

    /// Clear the message once its expiry has passed. Returns true exactly on
    /// the tick that cleared it.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                self.clear();
                true
            }
            _ => false,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_showing(&self) -> bool {
        self.message.is_some()
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.expires_at = None;
    }
}

/// Break `text` into lines of at most `width` characters on word boundaries.
/// A single word longer than `width` gets a line of its own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else if current.is_empty() {
            lines.push(word.to_string());
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
