//! Instruction text: one line per column, operands tagged for highlighting.

use super::highlight::tag_class;
use super::segment::Families;
use super::types::{Dump, GapActionKind, InstrId, Instruction, IntervalId};
use crate::fonts::TextMeasure;
use crate::theme::Theme;
use crate::xml::{escape_xml, push_escaped, sanitize_xml_text};

/// A run of instruction text; operands carry the row they point at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub row: Option<IntervalId>,
}

impl Token {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            row: None,
        }
    }
}

/// Tokens of `col: out=kind(in, ...) | tmp: t, ... | moves: a->b, ...`.
///
/// `operand` maps a referenced interval to the row it should be tagged with
/// and the text to show for it.
pub fn instruction_tokens<F>(col: InstrId, instr: Option<&Instruction>, mut operand: F) -> Vec<Token>
where
    F: FnMut(IntervalId) -> (IntervalId, String),
{
    let mut tokens = vec![Token::plain(format!("{}: ", col))];
    let mut push_operand = |tokens: &mut Vec<Token>, id: IntervalId| {
        let (row, text) = operand(id);
        tokens.push(Token {
            text,
            row: Some(row),
        });
    };

    let Some(instr) = instr else {
        tokens.push(Token::plain("empty"));
        return tokens;
    };

    if let Some(output) = instr.output {
        push_operand(&mut tokens, output);
        tokens.push(Token::plain("="));
    }

    tokens.push(Token::plain(format!("{}(", instr.kind)));
    for (i, input) in instr.inputs.iter().enumerate() {
        if i > 0 {
            tokens.push(Token::plain(", "));
        }
        push_operand(&mut tokens, *input);
    }
    tokens.push(Token::plain(")"));

    if !instr.temporary.is_empty() {
        tokens.push(Token::plain(" | tmp: "));
        for (i, tmp) in instr.temporary.iter().enumerate() {
            if i > 0 {
                tokens.push(Token::plain(", "));
            }
            push_operand(&mut tokens, *tmp);
        }
    }

    if let Some(gap) = instr.gap_state.as_ref().filter(|g| !g.actions.is_empty()) {
        tokens.push(Token::plain(" | moves: "));
        for (i, action) in gap.actions.iter().enumerate() {
            if i > 0 {
                tokens.push(Token::plain(", "));
            }
            push_operand(&mut tokens, action.from);
            tokens.push(Token::plain(match action.kind {
                GapActionKind::Move => "->",
                GapActionKind::Swap => "<->",
            }));
            push_operand(&mut tokens, action.to);
        }
    }

    tokens
}

pub fn line_text(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Display name of an interval reference
pub fn interval_name(dump: &Dump, id: IntervalId) -> String {
    dump.interval(id)
        .map(|interval| interval.display_name())
        .unwrap_or_else(|| format!("v{}", id))
}

/// Hint text for a hovered column; operands are shown as referenced.
pub fn hint_text(dump: &Dump, col: InstrId) -> String {
    let tokens = instruction_tokens(col, dump.instructions.get(&col), |id| {
        (id, interval_name(dump, id))
    });
    line_text(&tokens)
}

#[derive(Debug, Clone)]
pub struct ListingLine {
    pub col: InstrId,
    pub tokens: Vec<Token>,
    pub width: f32,
}

/// Lay out one line per column; operands resolve to the fragment live there.
pub fn layout_listing<T: TextMeasure>(
    dump: &Dump,
    families: &Families<'_>,
    measure: &mut T,
    font_size: f32,
) -> Vec<ListingLine> {
    (0..dump.column_count())
        .map(|col| {
            let tokens = instruction_tokens(col, dump.instructions.get(&col), |id| {
                let row = families.resolve(id, col);
                (row, interval_name(dump, row))
            });
            let text = sanitize_xml_text(&line_text(&tokens));
            let (width, _) = measure.measure_text(&text, font_size, true);
            ListingLine { col, tokens, width }
        })
        .collect()
}

pub fn render_listing(lines: &[ListingLine], top: f32, theme: &Theme) -> String {
    let spacing = &theme.spacing;
    let mut svg = String::new();

    for (i, line) in lines.iter().enumerate() {
        let y = top + (i as f32 + 0.5) * spacing.listing_line_height;
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" dominant-baseline="middle" xml:space="preserve" font-family="monospace" font-size="{:.1}" fill="{}">"#,
            spacing.offset_left,
            y,
            spacing.listing_font_size,
            theme.color("text")
        ));

        for (idx, token) in line.tokens.iter().enumerate() {
            let row = if idx == 0 { None } else { token.row };
            if idx == 0 || row.is_some() {
                svg.push_str(&format!(
                    r#"<tspan class="{}">{}</tspan>"#,
                    tag_class(row, Some(line.col)),
                    escape_xml(&token.text)
                ));
            } else {
                push_escaped(&mut svg, &token.text);
            }
        }
        svg.push_str("</text>\n");
    }

    svg
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::diagram::types::{Block, GapAction, GapState, Interval, IntervalValue, LiveRange};
    use crate::fonts::MonospaceMeasure;

    fn interval(id: IntervalId, value: IntervalValue, ranges: &[(usize, usize)]) -> Interval {
        Interval {
            id,
            value,
            physical: false,
            parent: None,
            children: vec![],
            ranges: ranges.iter().map(|(s, e)| LiveRange::new(*s, *e)).collect(),
            uses: vec![],
        }
    }

    fn instr(
        id: InstrId,
        output: Option<IntervalId>,
        inputs: &[IntervalId],
        temporary: &[IntervalId],
    ) -> Instruction {
        Instruction {
            id,
            block: 0,
            kind: "kind".to_string(),
            output,
            inputs: inputs.to_vec(),
            temporary: temporary.to_vec(),
            gap_state: None,
        }
    }

    fn dump(intervals: Vec<Interval>, instructions: Vec<Instruction>) -> Dump {
        Dump {
            blocks: vec![],
            intervals,
            instructions: instructions
                .into_iter()
                .map(|i| (i.id, i))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_hint_for_output_and_inputs() {
        let d = dump(
            vec![
                interval(2, IntervalValue::Virtual, &[(0, 3)]),
                interval(4, IntervalValue::Virtual, &[(1, 3)]),
                interval(7, IntervalValue::Virtual, &[(3, 5)]),
            ],
            vec![instr(3, Some(7), &[2, 4], &[])],
        );
        assert_eq!(hint_text(&d, 3), "3: v7=kind(v2, v4)");
    }

    #[test]
    fn test_hint_omits_missing_parts() {
        let d = dump(
            vec![
                interval(1, IntervalValue::Virtual, &[(0, 2)]),
                interval(9, IntervalValue::Location("rax".to_string()), &[(1, 2)]),
            ],
            vec![instr(1, None, &[], &[9, 1])],
        );
        assert_eq!(hint_text(&d, 1), "1: kind() | tmp: rax, v1");
        assert_eq!(hint_text(&d, 0), "0: empty");
    }

    #[test]
    fn test_gap_moves_are_listed() {
        let mut gap = instr(2, None, &[], &[]);
        gap.kind = "~gap".to_string();
        gap.gap_state = Some(GapState {
            actions: vec![
                GapAction {
                    kind: GapActionKind::Move,
                    from: 1,
                    to: 2,
                },
                GapAction {
                    kind: GapActionKind::Swap,
                    from: 3,
                    to: 4,
                },
            ],
        });
        let d = dump(vec![], vec![gap]);
        assert_eq!(hint_text(&d, 2), "2: ~gap() | moves: v1->v2, v3<->v4");
    }

    #[test]
    fn test_listing_operands_follow_split_fragment() {
        let mut parent = interval(0, IntervalValue::Virtual, &[(0, 2)]);
        parent.children = vec![1];
        let mut child = interval(1, IntervalValue::Location("r{0}2".to_string()), &[(2, 4)]);
        child.parent = Some(0);
        let mut d = dump(vec![parent, child], vec![instr(3, None, &[0], &[])]);
        d.blocks.push(Block {
            id: 0,
            start: 0,
            end: 4,
            successors: vec![],
            loop_depth: 0,
        });
        let families = Families::new(&d);
        let mut measure = MonospaceMeasure::default();

        let lines = layout_listing(&d, &families, &mut measure, 12.0);
        assert_eq!(lines.len(), 4);
        assert_eq!(line_text(&lines[0].tokens), "0: empty");
        assert_eq!(line_text(&lines[3].tokens), "3: kind(r{0}2)");
        let rows: Vec<IntervalId> = lines[3].tokens.iter().filter_map(|t| t.row).collect();
        assert_eq!(rows, vec![1]);
        assert!(lines[3].width > lines[0].width);

        let svg = render_listing(&lines, 100.0, &Theme::default());
        assert!(svg.contains(r#"<tspan class="r-1 c-3">r{0}2</tspan>"#));
        assert!(svg.contains(r#"<tspan class="c-0">0: </tspan>"#));
    }
}
