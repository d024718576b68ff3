use allocviz::diagram::{parse_dump, render_document, Highlighter, RenderOptions, TagIndex, Target};
use allocviz::fonts::MonospaceMeasure;
use allocviz::theme::Theme;
use allocviz::Error;

const LOOP: &str = include_str!("data/loop.json");

fn render(interactive: bool) -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let dump = parse_dump(LOOP).expect("sample dump");
    let options = RenderOptions {
        interactive,
        legend: false,
    };
    render_document(&dump, &Theme::default(), options, MonospaceMeasure::default()).expect("render")
}

#[test]
fn interactive_document_is_well_formed_and_ordered() {
    let svg = render(true);
    let index = TagIndex::from_svg(&svg).expect("parse rendered svg");

    // One background cell per (row, column): 3 rows over 8 columns
    let backgrounds = index
        .elements()
        .iter()
        .filter(|e| e.name == "rect" && e.fill.as_deref() == Some("#A4EEE8"))
        .count();
    assert_eq!(backgrounds, 24);

    let data = svg.find("var instructions").unwrap();
    let first_block = svg.find(r#"rx="3.00""#).unwrap();
    let first_edge = svg.find("marker-end").unwrap();
    let listing = svg.find(r#"<tspan class="c-0">0: </tspan>"#).unwrap();
    let script = svg.rfind("addEventListener").unwrap();
    assert!(data < first_block);
    assert!(first_block < first_edge);
    assert!(first_edge < listing);
    assert!(listing < script);

    // 0 -> 1, 1 -> 1, 1 -> 2
    assert_eq!(svg.matches("marker-end=").count(), 3);
}

#[test]
fn listing_tags_operands_with_the_live_fragment() {
    let svg = render(true);
    // Interval 0 is split at column 4; its child is the live fragment there.
    assert!(svg.contains(r#"<tspan class="r-1 c-4">r{0}3</tspan>, <tspan class="r-2 c-4">v2</tspan>)"#));
    assert!(svg.contains(r#"<tspan class="c-3">3: </tspan>empty"#));
}

#[test]
fn hover_and_leave_over_rendered_document() {
    let svg = render(true);
    let dump = parse_dump(LOOP).unwrap();
    let theme = Theme::default();
    let index = TagIndex::from_svg(&svg).unwrap();
    let mut highlighter = Highlighter::new(&index, &dump, &theme);

    let initial: Vec<Option<String>> = (0..index.len())
        .map(|i| highlighter.fill(i).map(str::to_string))
        .collect();

    highlighter.hover(Target::cell(2, 4));
    assert_eq!(highlighter.hint(), "4: add(v0, v2)");
    let input_cells = index
        .with_row(2)
        .iter()
        .filter(|idx| highlighter.fill(**idx) == Some(theme.palette.highlight_input.as_str()))
        .count();
    assert_eq!(input_cells, index.with_row(2).len());

    highlighter.hover(Target::col(5));
    assert_eq!(highlighter.hint(), "5: ~gap() | moves: r{0}3->rax");

    highlighter.leave();
    let after: Vec<Option<String>> = (0..index.len())
        .map(|i| highlighter.fill(i).map(str::to_string))
        .collect();
    assert_eq!(initial, after);
    assert_eq!(highlighter.hint(), "");
}

#[test]
fn hovering_a_column_lights_the_live_fragment_of_a_split_operand() {
    let svg = render(true);
    let dump = parse_dump(LOOP).unwrap();
    let theme = Theme::default();
    let index = TagIndex::from_svg(&svg).unwrap();
    let mut highlighter = Highlighter::new(&index, &dump, &theme);

    // Instruction 4 reads interval 0, whose child 1 holds the value there.
    highlighter.hover(Target::col(4));
    let input = Some(theme.palette.highlight_input.as_str());
    let at = |name: &str, row: usize, col: usize| {
        index
            .elements()
            .iter()
            .position(|e| e.name == name && e.row == Some(row) && e.col == Some(col))
            .unwrap_or_else(|| panic!("no {} r-{} c-{}", name, row, col))
    };
    assert_eq!(highlighter.fill(at("tspan", 1, 4)), input);
    assert_eq!(highlighter.fill(at("rect", 1, 4)), input);
    assert_eq!(highlighter.fill(at("rect", 0, 0)), Some("#A4EEE8"));
    assert!(svg.contains(r#""4":{"output":null,"inputs":[1,2],"temporary":[]}"#));
}

#[test]
fn static_document_keeps_tags_but_drops_script() {
    let interactive = TagIndex::from_svg(&render(true)).unwrap();
    let svg = render(false);
    let index = TagIndex::from_svg(&svg).unwrap();

    assert_eq!(index.len(), interactive.len());
    assert!(svg.contains("var instructions"));
    assert!(!svg.contains("var intervals"));
    assert!(!svg.contains("addEventListener"));
}

#[test]
fn malformed_dump_is_rejected_before_rendering() {
    let broken = LOOP.replace(r#""id": 6, "block": 2"#, r#""id": 6, "block": 0"#);
    match parse_dump(&broken) {
        Err(Error::InvalidDump { field, .. }) => assert_eq!(field, "block"),
        other => panic!("Expected InvalidDump, got {:?}", other.map(|_| ())),
    }
}
