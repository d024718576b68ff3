//! Hover highlighting.
//!
//! Every element that takes part in highlighting carries a row tag
//! (`r-<interval>`) and/or a column tag (`c-<instruction>`) in its class
//! list. Hovering an element highlights everything sharing its tags plus the
//! rows of the hovered instruction's operands, and shows a hint line. The
//! same state machine exists twice: [`Highlighter`] runs it over a
//! [`TagIndex`] parsed from a rendered document, and [`script_source`] is
//! the ECMAScript embedded in interactive output.

use std::collections::{BTreeMap, HashMap};

use quick_xml::events::Event as XmlEvent;
use quick_xml::reader::Reader as XmlReader;
use serde::Serialize;

use super::listing::hint_text;
use super::segment::Families;
use super::types::{Dump, InstrId, IntervalId};
use crate::error::{Error, Result};
use crate::theme::Theme;

pub fn row_tag(id: IntervalId) -> String {
    format!("r-{}", id)
}

pub fn col_tag(col: InstrId) -> String {
    format!("c-{}", col)
}

/// Class attribute value for an element with the given tags
pub fn tag_class(row: Option<IntervalId>, col: Option<InstrId>) -> String {
    match (row, col) {
        (Some(r), Some(c)) => format!("{} {}", row_tag(r), col_tag(c)),
        (Some(r), None) => row_tag(r),
        (None, Some(c)) => col_tag(c),
        (None, None) => String::new(),
    }
}

fn parse_tag(name: &str) -> Option<(char, usize)> {
    let (kind, rest) = name.split_once('-')?;
    let kind = match kind {
        "r" => 'r',
        "c" => 'c',
        _ => return None,
    };
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok().map(|id| (kind, id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightColor {
    Interval,
    Output,
    Input,
    Tmp,
}

impl HighlightColor {
    pub fn name(self) -> &'static str {
        match self {
            HighlightColor::Interval => "interval",
            HighlightColor::Output => "output",
            HighlightColor::Input => "input",
            HighlightColor::Tmp => "tmp",
        }
    }

    fn theme_key(self) -> &'static str {
        match self {
            HighlightColor::Interval => "highlight:interval",
            HighlightColor::Output => "highlight:output",
            HighlightColor::Input => "highlight:input",
            HighlightColor::Tmp => "highlight:tmp",
        }
    }
}

/// What a hover names: a row, a column, or both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub row: Option<IntervalId>,
    pub col: Option<InstrId>,
}

impl Target {
    pub fn row(id: IntervalId) -> Self {
        Self {
            row: Some(id),
            col: None,
        }
    }

    pub fn col(col: InstrId) -> Self {
        Self {
            row: None,
            col: Some(col),
        }
    }

    pub fn cell(row: IntervalId, col: InstrId) -> Self {
        Self {
            row: Some(row),
            col: Some(col),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedElement {
    pub name: String,
    pub row: Option<IntervalId>,
    pub col: Option<InstrId>,
    pub fill: Option<String>,
}

/// Tagged elements of a rendered document, in document order
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    elements: Vec<TaggedElement>,
    by_row: HashMap<IntervalId, Vec<usize>>,
    by_col: HashMap<InstrId, Vec<usize>>,
}

impl TagIndex {
    pub fn from_svg(svg: &str) -> Result<Self> {
        let mut reader = XmlReader::from_str(svg);
        reader.config_mut().trim_text(true);

        let mut index = TagIndex::default();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(XmlEvent::Start(ref e)) | Ok(XmlEvent::Empty(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let mut class = None;
                    let mut fill = None;
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        match attr.key.as_ref() {
                            b"class" => class = Some(String::from_utf8_lossy(&attr.value).to_string()),
                            b"fill" => fill = Some(String::from_utf8_lossy(&attr.value).to_string()),
                            _ => {}
                        }
                    }

                    if let Some(class) = class {
                        let mut row = None;
                        let mut col = None;
                        for (kind, id) in class.split_whitespace().filter_map(parse_tag) {
                            match kind {
                                'r' => row = Some(id),
                                _ => col = Some(id),
                            }
                        }
                        if row.is_some() || col.is_some() {
                            index.push(TaggedElement {
                                name,
                                row,
                                col,
                                fill,
                            });
                        }
                    }
                }
                Ok(XmlEvent::Eof) => break,
                Err(e) => return Err(Error::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(index)
    }

    pub fn push(&mut self, element: TaggedElement) {
        let idx = self.elements.len();
        if let Some(row) = element.row {
            self.by_row.entry(row).or_default().push(idx);
        }
        if let Some(col) = element.col {
            self.by_col.entry(col).or_default().push(idx);
        }
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[TaggedElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn with_row(&self, row: IntervalId) -> &[usize] {
        self.by_row.get(&row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn with_col(&self, col: InstrId) -> &[usize] {
        self.by_col.get(&col).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Rows an instruction's operands light up, each reference resolved to the
/// fragment live at the instruction's column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperandRows {
    pub output: Option<IntervalId>,
    pub inputs: Vec<IntervalId>,
    pub temporary: Vec<IntervalId>,
}

pub fn operand_rows(dump: &Dump, families: &Families<'_>) -> BTreeMap<InstrId, OperandRows> {
    dump.instructions
        .values()
        .map(|instr| {
            let resolve = |id: &IntervalId| families.resolve(*id, instr.id);
            let rows = OperandRows {
                output: instr.output.as_ref().map(resolve),
                inputs: instr.inputs.iter().map(resolve).collect(),
                temporary: instr.temporary.iter().map(resolve).collect(),
            };
            (instr.id, rows)
        })
        .collect()
}

/// Hover state over a [`TagIndex`]: per-element fill overrides, the undo
/// stack restoring them, and the hint line.
pub struct Highlighter<'a> {
    index: &'a TagIndex,
    dump: &'a Dump,
    operands: BTreeMap<InstrId, OperandRows>,
    colors: [String; 4],
    overrides: Vec<Option<String>>,
    undo: Vec<(usize, Option<String>)>,
    hint: String,
}

impl<'a> Highlighter<'a> {
    pub fn new(index: &'a TagIndex, dump: &'a Dump, theme: &Theme) -> Self {
        let colors = [
            HighlightColor::Interval,
            HighlightColor::Output,
            HighlightColor::Input,
            HighlightColor::Tmp,
        ]
        .map(|c| theme.color(c.theme_key()).to_string());

        Self {
            index,
            dump,
            operands: operand_rows(dump, &Families::new(dump)),
            colors,
            overrides: vec![None; index.len()],
            undo: Vec::new(),
            hint: String::new(),
        }
    }

    fn color(&self, color: HighlightColor) -> &str {
        match color {
            HighlightColor::Interval => &self.colors[0],
            HighlightColor::Output => &self.colors[1],
            HighlightColor::Input => &self.colors[2],
            HighlightColor::Tmp => &self.colors[3],
        }
    }

    fn paint(&mut self, elements: &[usize], color: HighlightColor) {
        let color = self.color(color).to_string();
        for &idx in elements {
            let previous = self.overrides[idx].replace(color.clone());
            self.undo.push((idx, previous));
        }
    }

    /// Undo every active highlight, newest first, and blank the hint.
    pub fn clear(&mut self) {
        while let Some((idx, previous)) = self.undo.pop() {
            self.overrides[idx] = previous;
        }
        self.hint.clear();
    }

    pub fn highlight(&mut self, target: Target, color: HighlightColor, clear_first: bool) {
        if clear_first {
            self.clear();
        }

        if let Some(row) = target.row {
            let index = self.index;
            self.paint(index.with_row(row), color);
        }

        if let Some(col) = target.col {
            let index = self.index;
            self.paint(index.with_col(col), color);

            if let Some(rows) = self.operands.get(&col).cloned() {
                if let Some(output) = rows.output {
                    self.highlight(Target::row(output), HighlightColor::Output, false);
                }
                for input in rows.inputs {
                    self.highlight(Target::row(input), HighlightColor::Input, false);
                }
                for tmp in rows.temporary {
                    self.highlight(Target::row(tmp), HighlightColor::Tmp, false);
                }
            }
            self.hint = hint_text(self.dump, col);
        }
    }

    pub fn hover(&mut self, target: Target) {
        self.highlight(target, HighlightColor::Interval, true);
    }

    pub fn leave(&mut self) {
        self.clear();
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// Fill currently shown by element `idx`
    pub fn fill(&self, idx: usize) -> Option<&str> {
        self.overrides[idx]
            .as_deref()
            .or(self.index.elements()[idx].fill.as_deref())
    }

    pub fn overrides(&self) -> &[Option<String>] {
        &self.overrides
    }

    pub fn pending_restores(&self) -> usize {
        self.undo.len()
    }
}

const SCRIPT: &str = r#"
(function () {
  var root = document.documentElement;
  var hintNode = document.getElementById('hint').firstChild;
  var byId = {};
  intervals.forEach(function (interval) { byId[interval.id] = interval; });
  var undo = [];

  function name(id) {
    var interval = byId[id];
    if (!interval || interval.value === 'v') return 'v' + id;
    return interval.value;
  }
  function hint(text) {
    hintNode.nodeValue = text;
  }
  function paint(tag, color) {
    Array.prototype.forEach.call(document.getElementsByClassName(tag), function (el) {
      var fill = el.style.fill;
      el.style.fill = color;
      undo.push(function () { el.style.fill = fill; });
    });
  }
  function clear() {
    for (var i = undo.length - 1; i >= 0; i--) undo[i]();
    undo = [];
    hint(' ');
  }
  function h(target, color, noclear) {
    if (!color) color = __interval__;
    if (!noclear) clear();

    if (target.r !== undefined) paint('r-' + target.r, color);
    if (target.c === undefined) return;

    paint('c-' + target.c, color);
    var instr = instructions[target.c];
    var rows = operands[target.c];
    var text = target.c + ': ';
    if (!instr) {
      hint(text + 'empty');
      return;
    }
    if (instr.output !== null && instr.output !== undefined) {
      text += name(instr.output) + '=';
      h({ r: rows.output }, __output__, true);
    }
    text += instr.kind + '(';
    instr.inputs.forEach(function (input, i) {
      if (i > 0) text += ', ';
      text += name(input);
      h({ r: rows.inputs[i] }, __input__, true);
    });
    text += ')';
    if (instr.temporary.length > 0) {
      text += ' | tmp: ';
      instr.temporary.forEach(function (tmp, i) {
        if (i > 0) text += ', ';
        text += name(tmp);
        h({ r: rows.temporary[i] }, __tmp__, true);
      });
    }
    var actions = instr.gap_state ? instr.gap_state.actions : [];
    if (actions.length > 0) {
      text += ' | moves: ' + actions.map(function (a) {
        return name(a.from) + (a.type === 'swap' ? '<->' : '->') + name(a.to);
      }).join(', ');
    }
    hint(text);
  }
  function tags(el) {
    var target = {};
    var found = false;
    var names = ((el.getAttribute && el.getAttribute('class')) || '').split(/\s+/);
    names.forEach(function (n) {
      var m = /^([rc])-(\d+)$/.exec(n);
      if (m) {
        target[m[1]] = Number(m[2]);
        found = true;
      }
    });
    return found ? target : null;
  }

  root.addEventListener('mouseover', function (event) {
    var target = tags(event.target);
    if (target) h(target);
  });
  root.addEventListener('mouseout', function () {
    clear();
  });
})();
"#;

/// Interaction script with the theme's highlight colors filled in
pub fn script_source(theme: &Theme) -> String {
    let mut source = SCRIPT.to_string();
    for color in [
        HighlightColor::Interval,
        HighlightColor::Output,
        HighlightColor::Input,
        HighlightColor::Tmp,
    ] {
        let placeholder = format!("__{}__", color.name());
        let literal = format!(
            "{}/*{}*/",
            serde_json::Value::from(theme.color(color.theme_key())),
            color.name()
        );
        source = source.replace(&placeholder, &literal);
    }
    source
}
