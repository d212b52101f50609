//! Text chunking: paragraphs -> wrapped lines -> frames.
//!
//! Pure computation over in-memory text. Measurement is abstracted behind
//! [`TextMeasure`] so the split can be exercised without a font or renderer.

use serde::Serialize;

use crate::settings::RenderSettings;

/// Estimated rendered width of a run of text, in pixels, at the font size
/// the implementation was built with.
pub trait TextMeasure {
    fn width_px(&self, text: &str) -> f32;
}

/// One slide's worth of wrapped lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<String>,
}

impl Frame {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Splits `text` into frames that fit the configured geometry.
///
/// Paragraphs are blocks separated by blank lines; single line breaks are
/// soft and re-flow with the surrounding words. Frames never mix
/// paragraphs: each paragraph starts a fresh frame and spills into
/// continuation frames when taller than `max_lines_per_frame`. Empty input
/// yields exactly one blank frame.
pub fn chunk(text: &str, settings: &RenderSettings, measure: &dyn TextMeasure) -> Vec<Frame> {
    let budget = settings.text_width() as f32;
    let max_lines = settings.max_lines_per_frame();

    let paragraphs = split_paragraphs(text);
    if paragraphs.is_empty() {
        return vec![Frame { lines: Vec::new() }];
    }

    let mut frames = Vec::new();
    for words in &paragraphs {
        let lines = wrap_words(words, budget, measure);
        pack_lines(lines, max_lines, &mut frames);
    }
    frames
}

/// Whitespace-delimited words per paragraph, in document order.
fn split_paragraphs(text: &str) -> Vec<Vec<String>> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split("\n\n")
        .map(|block| {
            block
                .split_whitespace()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .filter(|words| !words.is_empty())
        .collect()
}

/// Greedy wrap: words accumulate separated by single spaces until the next
/// word would push the line past `budget`. A word wider than the whole
/// budget sits alone on its own line; words are never split.
fn wrap_words(words: &[String], budget: f32, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in words {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if measure.width_px(&candidate) > budget {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Packs one paragraph's lines into frames of at most `max_lines` each.
///
/// When the final continuation frame would hold a single line, one line is
/// borrowed from the previous frame so no paragraph ends on an orphan.
fn pack_lines(lines: Vec<String>, max_lines: usize, frames: &mut Vec<Frame>) {
    if lines.is_empty() {
        return;
    }

    let mut counts = Vec::new();
    let mut remaining = lines.len();
    while remaining > max_lines {
        counts.push(max_lines);
        remaining -= max_lines;
    }
    counts.push(remaining);

    let last = counts.len() - 1;
    if last > 0 && counts[last] == 1 && max_lines >= 2 {
        counts[last - 1] -= 1;
        counts[last] += 1;
    }

    let mut iter = lines.into_iter();
    for count in counts {
        frames.push(Frame {
            lines: iter.by_ref().take(count).collect(),
        });
    }
}

/// Summary of a chunking run, printed by `check`.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPlan {
    pub frames: usize,
    pub lines: usize,
    pub max_lines_per_frame: usize,
    pub seconds_per_slide: f32,
    pub total_seconds: f32,
}

impl ChunkPlan {
    pub fn new(frames: &[Frame], settings: &RenderSettings) -> Self {
        let lines = frames.iter().map(|frame| frame.lines.len()).sum();
        Self {
            frames: frames.len(),
            lines,
            max_lines_per_frame: settings.max_lines_per_frame(),
            seconds_per_slide: settings.seconds_per_slide,
            total_seconds: frames.len() as f32 * settings.seconds_per_slide,
        }
    }
}
