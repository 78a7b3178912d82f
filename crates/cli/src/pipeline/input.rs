//! Command input - JSON lines reader and series chunking.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use contracts::{
    Chunk, Command, EntityTagCommand, MessageCommand, PropertyCommand, SeriesCommand, Tags,
};

use crate::error::{CliError, Result};

/// Commands read from input, split by kind
#[derive(Debug, Default)]
pub struct CommandBatch {
    pub series: Vec<SeriesCommand>,
    pub entity_tags: Vec<EntityTagCommand>,
    pub properties: Vec<PropertyCommand>,
    pub messages: Vec<MessageCommand>,
}

impl CommandBatch {
    pub fn push(&mut self, command: Command) {
        match command {
            Command::Series(c) => self.series.push(c),
            Command::EntityTag(c) => self.entity_tags.push(c),
            Command::Property(c) => self.properties.push(c),
            Command::Message(c) => self.messages.push(c),
        }
    }

    pub fn len(&self) -> usize {
        self.series.len() + self.entity_tags.len() + self.properties.len() + self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a JSON lines file; blank lines and `#` comments are skipped
pub fn read_commands(path: &Path) -> Result<CommandBatch> {
    let file = std::fs::File::open(path)
        .map_err(|e| CliError::input_read(path.display().to_string(), e))?;
    parse_commands(std::io::BufReader::new(file))
        .map_err(|e| match e {
            CliError::InputRead { source, .. } => {
                CliError::input_read(path.display().to_string(), source)
            }
            other => other,
        })
}

/// Parse commands from any buffered reader
pub fn parse_commands(reader: impl BufRead) -> Result<CommandBatch> {
    let mut batch = CommandBatch::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CliError::input_read("<input>", e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: Command = serde_json::from_str(line)
            .map_err(|e| CliError::input_parse(index + 1, e.to_string()))?;
        batch.push(command);
    }

    Ok(batch)
}

/// Split series commands into chunks of at most `chunk_size`
///
/// A chunk only ever holds commands for a single (entity, tag set), so the
/// per-metric grouping done by the dispatcher never mixes entities. Chunks
/// follow the first appearance of each (entity, tag set); commands keep their
/// input order within it.
pub fn chunk_series(series: Vec<SeriesCommand>, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut buckets: Vec<Vec<SeriesCommand>> = Vec::new();
    let mut by_key: HashMap<(String, Tags), usize> = HashMap::new();

    for command in series {
        let key = (command.entity.clone(), command.tags.clone());
        let idx = *by_key.entry(key).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[idx].push(command);
    }

    let mut chunks = Vec::new();
    for bucket in buckets {
        let mut current = Chunk::with_capacity(chunk_size);
        for command in bucket {
            current.push_back(command);
            if current.len() == chunk_size {
                chunks.push(std::mem::replace(&mut current, Chunk::with_capacity(chunk_size)));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }

    chunks
}
