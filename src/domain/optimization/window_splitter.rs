use crate::domain::errors::EvaluationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How consecutive windows relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOverlap {
    /// Step by the configured step size; windows may share rows.
    #[default]
    Overlapping,
    /// Step by at least the window size so windows never share rows.
    Disjoint,
}

impl fmt::Display for WindowOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowOverlap::Overlapping => write!(f, "overlapping"),
            WindowOverlap::Disjoint => write!(f, "disjoint"),
        }
    }
}

impl FromStr for WindowOverlap {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overlapping" => Ok(WindowOverlap::Overlapping),
            "disjoint" => Ok(WindowOverlap::Disjoint),
            _ => anyhow::bail!(
                "Invalid window overlap: {}. Must be 'overlapping' or 'disjoint'",
                s
            ),
        }
    }
}

/// Half-open row range `[start, end)` into a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Zero-based position in the splitter's sequence
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Fixed-size windows with starts `0, S, 2S, ...` while `start + W <= N`.
///
/// The splitter is a plain value: [`WindowSplitter::iter`] can be called any
/// number of times and always yields the same sequence. `N < W` yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSplitter {
    series_len: usize,
    window_size: usize,
    step: usize,
}

impl WindowSplitter {
    pub fn new(
        series_len: usize,
        window_size: usize,
        step: usize,
        overlap: WindowOverlap,
    ) -> Result<Self, EvaluationError> {
        if window_size == 0 {
            return Err(EvaluationError::config("window size must be > 0"));
        }
        if step == 0 {
            return Err(EvaluationError::config("step size must be > 0"));
        }

        let step = match overlap {
            WindowOverlap::Overlapping => step,
            WindowOverlap::Disjoint => step.max(window_size),
        };

        Ok(Self {
            series_len,
            window_size,
            step,
        })
    }

    /// Effective step after the overlap policy is applied.
    pub fn step(&self) -> usize {
        self.step
    }

    /// True when consecutive windows share rows.
    pub fn windows_share_rows(&self) -> bool {
        self.step < self.window_size && self.count() > 1
    }

    pub fn count(&self) -> usize {
        if self.series_len < self.window_size {
            0
        } else {
            (self.series_len - self.window_size) / self.step + 1
        }
    }

    pub fn iter(&self) -> WindowIter {
        WindowIter {
            splitter: *self,
            next_index: 0,
        }
    }
}

impl IntoIterator for &WindowSplitter {
    type Item = Window;
    type IntoIter = WindowIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the windows of a [`WindowSplitter`].
#[derive(Debug, Clone)]
pub struct WindowIter {
    splitter: WindowSplitter,
    next_index: usize,
}

impl Iterator for WindowIter {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let s = &self.splitter;
        let start = self.next_index.checked_mul(s.step)?;
        let end = start.checked_add(s.window_size)?;
        if end > s.series_len {
            return None;
        }

        let window = Window {
            index: self.next_index,
            start,
            end,
        };
        self.next_index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.splitter.count().saturating_sub(self.next_index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowIter {}
