use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type BlockId = usize;
pub type InstrId = usize;
pub type IntervalId = usize;

/// A basic block spanning the half-open column range `start..end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub start: InstrId,
    pub end: InstrId,
    #[serde(default)]
    pub successors: Vec<BlockId>,
    #[serde(default)]
    pub loop_depth: u32,
}

impl Block {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, col: InstrId) -> bool {
        self.start <= col && col < self.end
    }
}

/// Kind of a gap action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapActionKind {
    Move,
    Swap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAction {
    #[serde(rename = "type")]
    pub kind: GapActionKind,
    pub from: IntervalId,
    pub to: IntervalId,
}

/// Parallel moves resolved at a gap instruction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapState {
    #[serde(default)]
    pub actions: Vec<GapAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstrId,
    pub block: BlockId,
    pub kind: String,
    #[serde(default)]
    pub output: Option<IntervalId>,
    #[serde(default)]
    pub inputs: Vec<IntervalId>,
    #[serde(default)]
    pub temporary: Vec<IntervalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_state: Option<GapState>,
}

impl Instruction {
    /// Every interval the instruction touches, output first.
    pub fn operands(&self) -> impl Iterator<Item = IntervalId> + '_ {
        self.output
            .iter()
            .copied()
            .chain(self.inputs.iter().copied())
            .chain(self.temporary.iter().copied())
    }
}

/// Half-open liveness range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRange {
    pub start: InstrId,
    pub end: InstrId,
}

impl LiveRange {
    pub fn new(start: InstrId, end: InstrId) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, col: InstrId) -> bool {
        self.start <= col && col < self.end
    }
}

/// Register requirement of a use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseKind {
    Any,
    Register,
    Fixed(Option<String>),
}

impl UseKind {
    pub fn name(&self) -> &'static str {
        match self {
            UseKind::Any => "any",
            UseKind::Register => "register",
            UseKind::Fixed(_) => "fixed",
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawUseKind {
    Name(String),
    Object {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl<'de> Deserialize<'de> for UseKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (name, value) = match RawUseKind::deserialize(deserializer)? {
            RawUseKind::Name(name) => (name, None),
            RawUseKind::Object { kind, value } => (kind, value),
        };

        match name.as_str() {
            "any" => Ok(UseKind::Any),
            "reg" | "register" => Ok(UseKind::Register),
            "fixed" => Ok(UseKind::Fixed(value)),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["any", "reg", "register", "fixed"],
            )),
        }
    }
}

impl Serialize for UseKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let value = match self {
            UseKind::Fixed(value) => value.clone(),
            _ => None,
        };
        RawUseKind::Object {
            kind: self.name().to_string(),
            value,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Use {
    pub pos: InstrId,
    pub kind: UseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
}

/// What an interval holds: a virtual register, or a concrete location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalValue {
    Virtual,
    Location(String),
}

impl IntervalValue {
    pub fn parse(raw: &str) -> Self {
        if raw == "v" || (raw.starts_with("v{") && raw.ends_with('}')) {
            IntervalValue::Virtual
        } else {
            IntervalValue::Location(raw.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for IntervalValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(IntervalValue::parse(&raw))
    }
}

impl Serialize for IntervalValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            IntervalValue::Virtual => serializer.serialize_str("v"),
            IntervalValue::Location(name) => serializer.serialize_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: IntervalId,
    pub value: IntervalValue,
    #[serde(default)]
    pub physical: bool,
    #[serde(default)]
    pub parent: Option<IntervalId>,
    #[serde(default)]
    pub children: Vec<IntervalId>,
    #[serde(default)]
    pub ranges: Vec<LiveRange>,
    #[serde(default)]
    pub uses: Vec<Use>,
}

impl Interval {
    /// End of the last range, if the interval is live anywhere
    pub fn end(&self) -> Option<InstrId> {
        self.ranges.last().map(|r| r.end)
    }

    pub fn covers(&self, col: InstrId) -> bool {
        self.ranges.iter().any(|r| r.contains(col))
    }

    /// Like `covers`, but also accepts the column a range ends at.
    pub fn touches(&self, col: InstrId) -> bool {
        self.ranges.iter().any(|r| r.start <= col && col <= r.end)
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Hint/listing rendering of the value held by this interval.
    pub fn display_name(&self) -> String {
        match &self.value {
            IntervalValue::Virtual => format!("v{}", self.id),
            IntervalValue::Location(name) => name.clone(),
        }
    }
}

/// A complete allocator dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dump {
    pub blocks: Vec<Block>,
    pub intervals: Vec<Interval>,
    #[serde(with = "instruction_map")]
    pub instructions: BTreeMap<InstrId, Instruction>,
}

impl Dump {
    pub fn interval(&self, id: IntervalId) -> Option<&Interval> {
        self.intervals
            .binary_search_by_key(&id, |interval| interval.id)
            .ok()
            .map(|idx| &self.intervals[idx])
            .or_else(|| self.intervals.iter().find(|interval| interval.id == id))
    }

    /// Intervals that own a display row, in listed order
    pub fn rows(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter().filter(|interval| interval.is_top_level())
    }

    pub fn row_count(&self) -> usize {
        self.rows().count()
    }

    pub fn column_count(&self) -> usize {
        self.blocks.last().map(|b| b.end).unwrap_or(0)
    }

    pub fn max_loop_depth(&self) -> u32 {
        self.blocks.iter().map(|b| b.loop_depth).max().unwrap_or(0)
    }
}

/// Instructions travel as a JSON object keyed by decimal id.
mod instruction_map {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{InstrId, Instruction};

    pub fn serialize<S>(map: &BTreeMap<InstrId, Instruction>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(id, instr)| (id.to_string(), instr)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<InstrId, Instruction>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Instruction>::deserialize(deserializer)?;
        let mut out = BTreeMap::new();
        for (key, instr) in raw {
            let id: InstrId = key
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("instruction key '{}' is not an id", key)))?;
            if id != instr.id {
                return Err(D::Error::custom(format!(
                    "instruction key {} does not match its id {}",
                    id, instr.id
                )));
            }
            out.insert(id, instr);
        }
        Ok(out)
    }
}
