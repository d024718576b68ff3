use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping};

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_code: bool,
}

/// Width and height of a single line of text
pub trait TextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_code: bool) -> (f32, f32);
}

pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: HashMap::new(),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_code: bool) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_code,
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height,
            },
        );
        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new().family(if is_code {
            Family::Monospace
        } else {
            Family::SansSerif
        });
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        let measured = (total_width, total_height.max(line_height));
        self.cache.insert(key, measured);
        measured
    }
}

/// Fixed advance per character; no font database required.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub advance: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, _is_code: bool) -> (f32, f32) {
        let chars = text.chars().count() as f32;
        (chars * font_size * self.advance, font_size * 1.2)
    }
}

#[cfg(test)]
mod tests {
    use super::{MonospaceMeasure, TextMeasure};

    #[test]
    fn monospace_width_scales_with_length() {
        let mut measure = MonospaceMeasure::default();
        let (short, h) = measure.measure_text("v1", 10.0, true);
        let (long, _) = measure.measure_text("v1=add(v2, v3)", 10.0, true);
        assert!((short - 12.0).abs() < 1e-4);
        assert!((h - 12.0).abs() < 1e-4);
        assert!(long > short);
    }
}
