use std::collections::HashMap;

use log::{debug, info};

use super::types::*;
use crate::error::{Error, Result};

/// Parse and validate an allocator dump from its JSON text
pub fn parse_dump(input: &str) -> Result<Dump> {
    let dump: Dump = serde_json::from_str(input.trim())?;
    validate(&dump)?;
    info!(
        "loaded dump: {} blocks, {} intervals, {} instructions",
        dump.blocks.len(),
        dump.intervals.len(),
        dump.instructions.len()
    );
    Ok(dump)
}

/// Check every precondition the layout relies on.
pub fn validate(dump: &Dump) -> Result<()> {
    validate_blocks(dump)?;
    let index = validate_intervals(dump)?;
    validate_instructions(dump, &index)?;
    debug!("dump passed validation");
    Ok(())
}

fn validate_blocks(dump: &Dump) -> Result<()> {
    if dump.blocks.is_empty() {
        return Err(Error::invalid("dump", "blocks", "no blocks"));
    }

    let mut expected_start = 0;
    for (idx, block) in dump.blocks.iter().enumerate() {
        let entity = format!("block {}", block.id);
        if block.id != idx {
            return Err(Error::invalid(
                entity,
                "id",
                format!("expected id {} for position {}", idx, idx),
            ));
        }
        if block.start >= block.end {
            return Err(Error::invalid(
                entity,
                "end",
                format!("empty column range {}..{}", block.start, block.end),
            ));
        }
        if block.start != expected_start {
            return Err(Error::invalid(
                entity,
                "start",
                format!("expected column {}, found {}", expected_start, block.start),
            ));
        }
        expected_start = block.end;

        if let Some(succ) = block.successors.iter().find(|s| **s >= dump.blocks.len()) {
            return Err(Error::invalid(
                entity,
                "successors",
                format!("unknown block {}", succ),
            ));
        }
    }
    Ok(())
}

fn validate_intervals(dump: &Dump) -> Result<HashMap<IntervalId, &Interval>> {
    let mut index: HashMap<IntervalId, &Interval> = HashMap::new();
    for interval in &dump.intervals {
        if index.insert(interval.id, interval).is_some() {
            return Err(Error::invalid(
                format!("interval {}", interval.id),
                "id",
                "duplicate id",
            ));
        }
    }

    for interval in &dump.intervals {
        let entity = format!("interval {}", interval.id);

        let mut last_end = None;
        for range in &interval.ranges {
            if range.start >= range.end {
                return Err(Error::invalid(
                    entity,
                    "ranges",
                    format!("empty range {}..{}", range.start, range.end),
                ));
            }
            if last_end.is_some_and(|prev| range.start < prev) {
                return Err(Error::invalid(
                    entity,
                    "ranges",
                    format!(
                        "range {}..{} overlaps or precedes its predecessor",
                        range.start, range.end
                    ),
                ));
            }
            last_end = Some(range.end);
        }

        if let Some(parent_id) = interval.parent {
            let parent = index.get(&parent_id).ok_or_else(|| {
                Error::invalid(entity.clone(), "parent", format!("unknown interval {}", parent_id))
            })?;
            if !parent.children.contains(&interval.id) {
                return Err(Error::invalid(
                    entity,
                    "parent",
                    format!("interval {} does not list it as a child", parent_id),
                ));
            }
            if !interval.children.is_empty() {
                return Err(Error::invalid(
                    entity,
                    "children",
                    "split fragments cannot be split again",
                ));
            }
        }

        for child_id in &interval.children {
            let child = index.get(child_id).ok_or_else(|| {
                Error::invalid(entity.clone(), "children", format!("unknown interval {}", child_id))
            })?;
            if child.parent != Some(interval.id) {
                return Err(Error::invalid(
                    entity,
                    "children",
                    format!("interval {} names a different parent", child_id),
                ));
            }
        }
    }

    Ok(index)
}

fn validate_instructions(dump: &Dump, index: &HashMap<IntervalId, &Interval>) -> Result<()> {
    for (id, instr) in &dump.instructions {
        let entity = format!("instruction {}", id);
        if *id != instr.id {
            return Err(Error::invalid(entity, "id", format!("keyed as {}", id)));
        }

        let block = dump.blocks.get(instr.block).ok_or_else(|| {
            Error::invalid(entity.clone(), "block", format!("unknown block {}", instr.block))
        })?;
        if !block.contains(instr.id) {
            return Err(Error::invalid(
                entity,
                "block",
                format!(
                    "column outside block {} span {}..{}",
                    block.id, block.start, block.end
                ),
            ));
        }

        let check = |field: &'static str, ids: &mut dyn Iterator<Item = IntervalId>| -> Result<()> {
            for operand in ids {
                if !index.contains_key(&operand) {
                    return Err(Error::invalid(
                        entity.clone(),
                        field,
                        format!("unknown interval {}", operand),
                    ));
                }
            }
            Ok(())
        };
        check("output", &mut instr.output.iter().copied())?;
        check("inputs", &mut instr.inputs.iter().copied())?;
        check("temporary", &mut instr.temporary.iter().copied())?;
        if let Some(gap) = &instr.gap_state {
            check(
                "gap_state",
                &mut gap.actions.iter().flat_map(|a| [a.from, a.to]),
            )?;
        }
    }
    Ok(())
}
