//! Command -> wire transformation
//!
//! Pure mapping functions, one per command kind. Series commands must carry
//! a timestamp; a batch or chunk containing one without is rejected as a
//! whole before any wire object is built.

use std::collections::HashMap;

use contracts::{
    Chunk, ContractError, Entity, EntityTagCommand, Message, MessageCommand, Property,
    PropertyCommand, Sample, Series, SeriesCommand, Severity,
};

/// Reserved message tag routed to `Message::severity`
pub const SEVERITY_TAG: &str = "severity";
/// Reserved message tag routed to `Message::source`
pub const SOURCE_TAG: &str = "source";
/// Reserved message tag routed to `Message::msg_type`
pub const TYPE_TAG: &str = "type";

fn ensure_timestamps<'a>(
    mut commands: impl Iterator<Item = &'a SeriesCommand>,
) -> Result<(), ContractError> {
    match commands.find(|c| c.timestamp.is_none()) {
        Some(command) => Err(ContractError::missing_timestamp(&command.entity)),
        None => Ok(()),
    }
}

/// One single-sample Series per (command, metric) pair
///
/// # Errors
/// `ContractError::MissingTimestamp` if any command lacks a timestamp.
pub fn series_commands_to_series(
    commands: Vec<SeriesCommand>,
) -> Result<Vec<Series>, ContractError> {
    ensure_timestamps(commands.iter())?;

    let mut series = Vec::new();
    for command in commands {
        let Some(timestamp) = command.timestamp else {
            return Err(ContractError::missing_timestamp(command.entity));
        };
        for (metric, value) in command.metrics {
            series.push(Series {
                entity: command.entity.clone(),
                metric,
                tags: command.tags.clone(),
                data: vec![Sample::at(timestamp, value)],
            });
        }
    }
    Ok(series)
}

/// Drain a chunk into one Series per metric name
///
/// Samples are appended in drain order; tags are the union of every command
/// contributing to the metric (later commands win on key conflicts); the
/// entity is taken from the first command seen for the metric. Output follows
/// first-appearance order of metric names.
///
/// # Errors
/// `ContractError::MissingTimestamp` if any command lacks a timestamp. The
/// chunk is left untouched in that case.
pub fn series_chunk_to_series(chunk: &mut Chunk) -> Result<Vec<Series>, ContractError> {
    ensure_timestamps(chunk.iter())?;

    let mut series: Vec<Series> = Vec::new();
    let mut by_metric: HashMap<String, usize> = HashMap::new();

    while let Some(command) = chunk.pop_front() {
        let Some(timestamp) = command.timestamp else {
            return Err(ContractError::missing_timestamp(command.entity));
        };

        for (metric, value) in command.metrics {
            let sample = Sample::at(timestamp, value);
            match by_metric.get(&metric) {
                Some(&idx) => {
                    let grouped = &mut series[idx];
                    grouped
                        .tags
                        .extend(command.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
                    grouped.data.push(sample);
                }
                None => {
                    by_metric.insert(metric.clone(), series.len());
                    series.push(Series {
                        entity: command.entity.clone(),
                        metric,
                        tags: command.tags.clone(),
                        data: vec![sample],
                    });
                }
            }
        }
    }

    Ok(series)
}

/// One Entity per command carrying all of its tags
///
/// Repeated entity names are not merged.
pub fn entity_tag_commands_to_entities(commands: Vec<EntityTagCommand>) -> Vec<Entity> {
    commands
        .into_iter()
        .map(|command| {
            let mut entity = Entity::new(command.entity);
            for (key, value) in command.tags {
                entity.set_tag(key, value);
            }
            entity
        })
        .collect()
}

pub fn property_commands_to_properties(commands: Vec<PropertyCommand>) -> Vec<Property> {
    commands
        .into_iter()
        .map(|command| Property {
            prop_type: command.prop_type,
            entity: command.entity,
            key: command.key,
            tags: command.tags,
            date: command.timestamp,
        })
        .collect()
}

/// One Message per command
///
/// Every tag is kept; `severity`, `source` and `type` are copied into their
/// dedicated fields as well.
pub fn message_commands_to_messages(commands: Vec<MessageCommand>) -> Vec<Message> {
    commands
        .into_iter()
        .map(|command| {
            let mut message = Message::new(command.entity, command.message);
            for (key, value) in command.tags {
                match key.as_str() {
                    SEVERITY_TAG => message.severity = Some(Severity::new(value.clone())),
                    SOURCE_TAG => message.source = Some(value.clone()),
                    TYPE_TAG => message.msg_type = Some(value.clone()),
                    _ => {}
                }
                message.tags.insert(key, value);
            }
            message.date = command.timestamp;
            message
        })
        .collect()
}
