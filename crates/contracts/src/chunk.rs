//! Chunk - bounded buffer of pending series commands
//!
//! Collected upstream and consumed destructively (front to back) by the
//! series transformer.

use std::collections::VecDeque;

use crate::SeriesCommand;

/// Ordered, poppable sequence of series commands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    commands: VecDeque<SeriesCommand>,
}

impl Chunk {
    /// Create an empty chunk
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chunk with preallocated room
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push_back(&mut self, command: SeriesCommand) {
        self.commands.push_back(command);
    }

    /// Remove and return the oldest command
    pub fn pop_front(&mut self) -> Option<SeriesCommand> {
        self.commands.pop_front()
    }

    pub fn front(&self) -> Option<&SeriesCommand> {
        self.commands.front()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate without consuming
    pub fn iter(&self) -> impl Iterator<Item = &SeriesCommand> {
        self.commands.iter()
    }
}

impl FromIterator<SeriesCommand> for Chunk {
    fn from_iter<I: IntoIterator<Item = SeriesCommand>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<SeriesCommand>> for Chunk {
    fn from(commands: Vec<SeriesCommand>) -> Self {
        Self {
            commands: commands.into(),
        }
    }
}
