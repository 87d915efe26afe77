//! Subtitle styling, rasterization, and sidecar export.
//!
//! Burned subtitles are rasterized once per item with `fontdue` and reused
//! across every frame of the item's window. Sidecar export writes SRT or
//! VTT next to the video file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{TetoError, TetoResult};
use crate::markup::{parse_styled_text, strip_markup, Span};
use crate::timeline::{SubtitleItem, SubtitleLayer};

// ---------------------------------------------------------------------------
// Style model
// ---------------------------------------------------------------------------

/// Font size, either absolute pixels or a named step scaled to the frame
/// height (values are px at 1080p).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FontSize {
    Px(u32),
    Named(NamedSize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NamedSize {
    #[serde(rename = "xs")]
    Xs,
    #[serde(rename = "sm")]
    Sm,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "lg")]
    Lg,
    #[serde(rename = "xl")]
    Xl,
    #[serde(rename = "2xl")]
    Xxl,
}

impl Default for FontSize {
    fn default() -> Self {
        Self::Named(NamedSize::Base)
    }
}

impl FontSize {
    pub fn resolve_px(self, frame_height: u32) -> u32 {
        let at_1080 = match self {
            Self::Px(px) => return px,
            Self::Named(NamedSize::Xs) => 24.0,
            Self::Named(NamedSize::Sm) => 32.0,
            Self::Named(NamedSize::Base) => 42.0,
            Self::Named(NamedSize::Lg) => 56.0,
            Self::Named(NamedSize::Xl) => 72.0,
            Self::Named(NamedSize::Xxl) => 96.0,
        };
        ((at_1080 * frame_height as f64 / 1080.0).round() as u32).max(8)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    Top,
    #[default]
    Bottom,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtitleAppearance {
    Plain,
    #[default]
    Background,
    Shadow,
    DropShadow,
}

/// Layer-wide subtitle style.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleStyleConfig {
    /// Font family name, informational when `font_path` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// TTF/OTF file used for burn-in. When unset, a platform font
    /// directory search supplies a fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub font_size: FontSize,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub stroke_width: u32,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default)]
    pub outer_stroke_width: u32,
    #[serde(default = "default_outer_stroke_color")]
    pub outer_stroke_color: String,
    /// Background fill as `name` or `name@opacity`.
    #[serde(default = "default_bg_color", skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub position: SubtitlePosition,
    #[serde(default)]
    pub appearance: SubtitleAppearance,
    /// Extra horizontal inset, e.g. to keep clear of an overlay.
    #[serde(default)]
    pub margin_horizontal: u32,
}

fn default_font_color() -> String {
    "white".to_string()
}

fn default_stroke_color() -> String {
    "black".to_string()
}

fn default_outer_stroke_color() -> String {
    "white".to_string()
}

fn default_bg_color() -> Option<String> {
    Some("black@0.5".to_string())
}

impl Default for SubtitleStyleConfig {
    fn default() -> Self {
        Self {
            font_family: None,
            font_path: None,
            font_size: FontSize::default(),
            font_color: default_font_color(),
            font_weight: FontWeight::default(),
            stroke_width: 0,
            stroke_color: default_stroke_color(),
            outer_stroke_width: 0,
            outer_stroke_color: default_outer_stroke_color(),
            bg_color: default_bg_color(),
            position: SubtitlePosition::default(),
            appearance: SubtitleAppearance::default(),
            margin_horizontal: 0,
        }
    }
}

/// Span-level override applied through markup tags. Stroke and background
/// stay layer-global.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PartialStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
}

/// The style a single span renders with after merging partials over the base.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSpanStyle {
    pub color: [u8; 4],
    pub weight: FontWeight,
    pub size_px: u32,
}

pub fn resolve_span_style(
    base: &SubtitleStyleConfig,
    partials: &BTreeMap<String, PartialStyle>,
    span: &Span,
    frame_height: u32,
) -> TetoResult<ResolvedSpanStyle> {
    let partial = span
        .style_name
        .as_deref()
        .and_then(|name| partials.get(name));

    let color = match partial.and_then(|p| p.font_color.as_deref()) {
        Some(c) => parse_color(c)?,
        None => parse_color(&base.font_color)?,
    };
    let weight = partial
        .and_then(|p| p.font_weight)
        .unwrap_or(base.font_weight);
    let size = partial.and_then(|p| p.font_size).unwrap_or(base.font_size);

    Ok(ResolvedSpanStyle {
        color,
        weight,
        size_px: size.resolve_px(frame_height),
    })
}

// ---------------------------------------------------------------------------
// Color parsing
// ---------------------------------------------------------------------------

/// Parse `white`, `#rrggbb`, `#rrggbbaa`, or `name@opacity` into RGBA.
pub fn parse_color(spec: &str) -> TetoResult<[u8; 4]> {
    let (name, opacity) = match spec.split_once('@') {
        Some((name, op)) => {
            let op: f64 = op.parse().map_err(|_| {
                TetoError::validation(format!("invalid color opacity in '{spec}'"))
            })?;
            if !(0.0..=1.0).contains(&op) {
                return Err(TetoError::validation(format!(
                    "color opacity must be in [0,1], got '{spec}'"
                )));
            }
            (name, op)
        }
        None => (spec, 1.0),
    };

    let mut rgba = if let Some(hex) = name.strip_prefix('#') {
        let parse_pair = |s: &str| {
            u8::from_str_radix(s, 16)
                .map_err(|_| TetoError::validation(format!("invalid hex color '{spec}'")))
        };
        match hex.len() {
            6 => [
                parse_pair(&hex[0..2])?,
                parse_pair(&hex[2..4])?,
                parse_pair(&hex[4..6])?,
                255,
            ],
            8 => [
                parse_pair(&hex[0..2])?,
                parse_pair(&hex[2..4])?,
                parse_pair(&hex[4..6])?,
                parse_pair(&hex[6..8])?,
            ],
            _ => {
                return Err(TetoError::validation(format!(
                    "hex color must be #rrggbb or #rrggbbaa, got '{spec}'"
                )))
            }
        }
    } else {
        match name.to_ascii_lowercase().as_str() {
            "black" => [0, 0, 0, 255],
            "white" => [255, 255, 255, 255],
            "red" => [255, 0, 0, 255],
            "green" => [0, 128, 0, 255],
            "blue" => [0, 0, 255, 255],
            "yellow" => [255, 255, 0, 255],
            "orange" => [255, 165, 0, 255],
            "purple" => [128, 0, 128, 255],
            "pink" => [255, 192, 203, 255],
            "cyan" | "aqua" => [0, 255, 255, 255],
            "magenta" => [255, 0, 255, 255],
            "gray" | "grey" => [128, 128, 128, 255],
            "lightgray" | "lightgrey" => [211, 211, 211, 255],
            "darkgray" | "darkgrey" => [64, 64, 64, 255],
            "gold" => [255, 215, 0, 255],
            "silver" => [192, 192, 192, 255],
            other => {
                return Err(TetoError::validation(format!(
                    "unknown color name '{other}'"
                )))
            }
        }
    };

    rgba[3] = (f64::from(rgba[3]) * opacity).round() as u8;
    Ok(rgba)
}

// ---------------------------------------------------------------------------
// Font loading
// ---------------------------------------------------------------------------

const FONT_SEARCH_DIRS: &[&str] = &[
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/System/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// Load font bytes for a style: explicit `font_path`, else the first
/// TTF/OTF found under the platform font directories.
pub fn resolve_font_bytes(style: &SubtitleStyleConfig) -> TetoResult<Vec<u8>> {
    if let Some(path) = &style.font_path {
        return std::fs::read(path).map_err(|e| {
            TetoError::validation(format!(
                "failed to read subtitle font '{}': {e}",
                path.display()
            ))
        });
    }

    for dir in FONT_SEARCH_DIRS {
        if let Some(found) = find_font_file(Path::new(dir)) {
            tracing::debug!(font = %found.display(), "using fallback subtitle font");
            if let Ok(bytes) = std::fs::read(&found) {
                return Ok(bytes);
            }
        }
    }

    Err(TetoError::validation(
        "no subtitle font available: set subtitle_style.font_path to a TTF/OTF file",
    ))
}

fn find_font_file(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("ttf" | "otf")
        ) {
            return Some(path);
        }
    }
    subdirs.sort();
    subdirs.iter().find_map(|d| find_font_file(d))
}

// ---------------------------------------------------------------------------
// Line layout
// ---------------------------------------------------------------------------

/// A styled fragment placed on one display line.
#[derive(Clone, Debug)]
struct Fragment {
    text: String,
    style: ResolvedSpanStyle,
    width: f32,
}

#[derive(Clone, Debug)]
struct Line {
    fragments: Vec<Fragment>,
    width: f32,
    height: f32,
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303f}'   // CJK punctuation
        | '\u{3040}'..='\u{30ff}' // hiragana + katakana
        | '\u{3400}'..='\u{4dbf}'
        | '\u{4e00}'..='\u{9fff}' // unified ideographs
        | '\u{f900}'..='\u{faff}'
        | '\u{ff00}'..='\u{ffef}' // fullwidth forms
        | '\u{ac00}'..='\u{d7af}' // hangul
    )
}

/// Minimal wrap units: whole words (with trailing whitespace) for Latin
/// text, single codepoints for CJK.
fn wrap_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if is_cjk(c) {
            if !current.is_empty() {
                units.push(std::mem::take(&mut current));
            }
            units.push(c.to_string());
        } else if c.is_whitespace() {
            current.push(c);
            units.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        units.push(current);
    }
    units
}

// ---------------------------------------------------------------------------
// Rasterization
// ---------------------------------------------------------------------------

/// Pre-rendered RGBA block plus its placement on the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleRaster {
    pub width: u32,
    pub height: u32,
    /// Row-major straight-alpha RGBA8.
    pub rgba: Arc<Vec<u8>>,
    /// Top-left placement on the frame.
    pub x: u32,
    pub y: u32,
}

/// Rasterizes subtitle items against a fixed frame size and layer style.
pub struct SubtitleRenderer {
    font: fontdue::Font,
    frame_width: u32,
    frame_height: u32,
}

// Layout constants, expressed at 1080p and scaled by frame height.
const MARGIN_AT_1080: f32 = 48.0;
const BG_PADDING_X_AT_1080: f32 = 28.0;
const BG_PADDING_Y_AT_1080: f32 = 14.0;
const BG_RADIUS_AT_1080: f32 = 14.0;
const LINE_HEIGHT_FACTOR: f32 = 1.35;
const SHADOW_OFFSET_AT_1080: f32 = 3.0;

impl SubtitleRenderer {
    pub fn new(font_bytes: Vec<u8>, frame_size: (u32, u32)) -> TetoResult<Self> {
        let font = fontdue::Font::from_bytes(font_bytes, fontdue::FontSettings::default())
            .map_err(|e| TetoError::validation(format!("failed to parse subtitle font: {e}")))?;
        Ok(Self {
            font,
            frame_width: frame_size.0,
            frame_height: frame_size.1,
        })
    }

    fn scaled(&self, at_1080: f32) -> f32 {
        at_1080 * self.frame_height as f32 / 1080.0
    }

    fn text_width(&self, text: &str, size_px: f32) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, size_px).advance_width)
            .sum()
    }

    /// Wrap the item's spans into lines no wider than the usable width.
    fn layout(
        &self,
        item: &SubtitleItem,
        layer: &SubtitleLayer,
    ) -> TetoResult<Vec<Line>> {
        let margin = self.scaled(MARGIN_AT_1080);
        let max_width = (self.frame_width as f32
            - 2.0 * (margin + layer.style.margin_horizontal as f32))
            .max(1.0);

        fn flush(current: &mut Line, lines: &mut Vec<Line>) {
            if !current.fragments.is_empty() {
                lines.push(std::mem::replace(
                    current,
                    Line {
                        fragments: Vec::new(),
                        width: 0.0,
                        height: 0.0,
                    },
                ));
            }
        }

        let spans = parse_styled_text(&item.text);
        let mut lines: Vec<Line> = Vec::new();
        let mut current = Line {
            fragments: Vec::new(),
            width: 0.0,
            height: 0.0,
        };

        for span in &spans {
            let style =
                resolve_span_style(&layer.style, &layer.partial_styles, span, self.frame_height)?;
            let size_px = style.size_px as f32;
            let line_height = size_px * LINE_HEIGHT_FACTOR;

            for piece in span.text.split('\n') {
                for unit in wrap_units(piece) {
                    let unit_width = self.text_width(&unit, size_px);
                    if current.width > 0.0 && current.width + unit_width > max_width {
                        flush(&mut current, &mut lines);
                    }
                    // Leading whitespace at a fresh line is dropped.
                    if current.fragments.is_empty() && unit.trim().is_empty() {
                        continue;
                    }
                    match current.fragments.last_mut() {
                        Some(last) if last.style == style => {
                            last.text.push_str(&unit);
                            last.width += unit_width;
                        }
                        _ => current.fragments.push(Fragment {
                            text: unit,
                            style: style.clone(),
                            width: unit_width,
                        }),
                    }
                    current.width += unit_width;
                    current.height = current.height.max(line_height);
                }
                flush(&mut current, &mut lines);
            }
        }
        flush(&mut current, &mut lines);

        if lines.is_empty() {
            return Err(TetoError::validation("subtitle item has no renderable text"));
        }
        Ok(lines)
    }

    /// Rasterize one item. The result is cached by the caller and reused
    /// for every frame in the item's `[start, end]` window.
    pub fn render_item(
        &self,
        item: &SubtitleItem,
        layer: &SubtitleLayer,
    ) -> TetoResult<SubtitleRaster> {
        let lines = self.layout(item, layer)?;
        let style = &layer.style;

        let stroke = style.stroke_width as i32;
        let outer_stroke = stroke + style.outer_stroke_width as i32;
        let pad_x = match style.appearance {
            SubtitleAppearance::Background => self.scaled(BG_PADDING_X_AT_1080),
            _ => 0.0,
        };
        let pad_y = match style.appearance {
            SubtitleAppearance::Background => self.scaled(BG_PADDING_Y_AT_1080),
            _ => 0.0,
        };
        let shadow_offset = match style.appearance {
            SubtitleAppearance::Shadow | SubtitleAppearance::DropShadow => {
                self.scaled(SHADOW_OFFSET_AT_1080).ceil()
            }
            _ => 0.0,
        };

        let text_width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
        let text_height: f32 = lines.iter().map(|l| l.height).sum();
        let extra = outer_stroke as f32 + shadow_offset;
        let block_w = (text_width + 2.0 * (pad_x + extra)).ceil() as u32;
        let block_h = (text_height + 2.0 * (pad_y + extra)).ceil() as u32;
        let block_w = block_w.max(1);
        let block_h = block_h.max(1);

        let mut canvas = Canvas::new(block_w, block_h);

        if style.appearance == SubtitleAppearance::Background {
            if let Some(bg) = &style.bg_color {
                let color = parse_color(bg)?;
                canvas.fill_rounded_rect(
                    extra as i32,
                    extra as i32,
                    (text_width + 2.0 * pad_x).ceil() as u32,
                    (text_height + 2.0 * pad_y).ceil() as u32,
                    self.scaled(BG_RADIUS_AT_1080) as i32,
                    color,
                );
            }
        }

        // Shadows for every line land first so the drop-shadow blur never
        // smears glyphs drawn later.
        if shadow_offset > 0.0 {
            let shadow_color = [0, 0, 0, 200];
            let mut y = pad_y + extra;
            for line in &lines {
                let line_x = pad_x + extra + (text_width - line.width) / 2.0;
                let baseline = y + line.height;
                self.draw_line_pass(
                    &mut canvas,
                    line,
                    line_x + shadow_offset,
                    baseline + shadow_offset,
                    Some(shadow_color),
                    0,
                );
                y += line.height;
            }
            if style.appearance == SubtitleAppearance::DropShadow {
                canvas.box_blur(2);
            }
        }

        // Then per line: outer stroke, inner stroke, span fills.
        let mut y = pad_y + extra;
        for line in &lines {
            // Lines are centered within the block.
            let line_x = pad_x + extra + (text_width - line.width) / 2.0;
            let baseline = y + line.height;

            if style.outer_stroke_width > 0 {
                let color = parse_color(&style.outer_stroke_color)?;
                self.draw_line_pass(
                    &mut canvas,
                    line,
                    line_x,
                    baseline,
                    Some(color),
                    outer_stroke,
                );
            }
            if style.stroke_width > 0 {
                let color = parse_color(&style.stroke_color)?;
                self.draw_line_pass(&mut canvas, line, line_x, baseline, Some(color), stroke);
            }
            self.draw_line_pass(&mut canvas, line, line_x, baseline, None, 0);

            y += line.height;
        }

        let (x, y) = self.place_block(style, block_w, block_h);
        Ok(SubtitleRaster {
            width: block_w,
            height: block_h,
            rgba: Arc::new(canvas.into_rgba()),
            x,
            y,
        })
    }

    /// One pass over a line's glyphs. `override_color` draws every span in
    /// that color (stroke/shadow passes); `spread > 0` stamps the glyphs in
    /// a ring of that radius.
    fn draw_line_pass(
        &self,
        canvas: &mut Canvas,
        line: &Line,
        x: f32,
        baseline: f32,
        override_color: Option<[u8; 4]>,
        spread: i32,
    ) {
        let mut pen_x = x;
        for fragment in &line.fragments {
            let color = override_color.unwrap_or(fragment.style.color);
            let size = fragment.style.size_px as f32;
            // Bold is emulated by a 1px double-strike when the font has no
            // bold variant to switch to.
            let bold_extra = match fragment.style.weight {
                FontWeight::Bold => 1,
                FontWeight::Normal => 0,
            };

            let mut frag_x = pen_x;
            for c in fragment.text.chars() {
                let (metrics, bitmap) = self.font.rasterize(c, size);
                let glyph_x = frag_x + metrics.xmin as f32;
                let glyph_y = baseline - metrics.height as f32 - metrics.ymin as f32;

                let offsets = stamp_offsets(spread, bold_extra);
                for (dx, dy) in offsets {
                    canvas.blend_mask(
                        (glyph_x + dx as f32) as i32,
                        (glyph_y + dy as f32) as i32,
                        metrics.width,
                        metrics.height,
                        &bitmap,
                        color,
                    );
                }
                frag_x += metrics.advance_width;
            }
            pen_x += fragment.width;
        }
    }

    /// Compose position: `position` + margin, clamped so the block's top
    /// never rises above the top margin.
    fn place_block(&self, style: &SubtitleStyleConfig, w: u32, h: u32) -> (u32, u32) {
        let margin = self.scaled(MARGIN_AT_1080) as i64;
        let x = ((self.frame_width as i64 - w as i64) / 2).max(0);
        let y = match style.position {
            SubtitlePosition::Top => margin,
            SubtitlePosition::Center => (self.frame_height as i64 - h as i64) / 2,
            SubtitlePosition::Bottom => self.frame_height as i64 - h as i64 - margin,
        };
        // An over-tall block anchors at the top margin rather than running
        // off the frame.
        let max_top = (self.frame_height as i64 - h as i64).max(0);
        let y = y.clamp(margin.min(max_top), max_top);
        (x as u32, y.max(0) as u32)
    }
}

/// Ring of stamp offsets used to emulate stroke (`spread`) and bold
/// (`bold_extra` widens horizontally), always including the origin.
fn stamp_offsets(spread: i32, bold_extra: i32) -> smallvec::SmallVec<[(i32, i32); 10]> {
    let mut offsets = smallvec::smallvec![(0, 0)];
    for r in 1..=spread {
        offsets.extend_from_slice(&[
            (r, 0),
            (-r, 0),
            (0, r),
            (0, -r),
            (r, r),
            (r, -r),
            (-r, r),
            (-r, -r),
        ]);
    }
    for b in 1..=bold_extra {
        offsets.push((b, 0));
    }
    offsets
}

/// Straight-alpha RGBA8 scratch surface.
struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }

    fn into_rgba(self) -> Vec<u8> {
        self.data
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4], coverage: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let alpha = u32::from(color[3]) * u32::from(coverage) / 255;
        if alpha == 0 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let inv = 255 - alpha;
        for c in 0..3 {
            let src = u32::from(color[c]) * alpha;
            let dst = u32::from(self.data[idx + c]) * inv;
            self.data[idx + c] = ((src + dst) / 255) as u8;
        }
        let dst_a = u32::from(self.data[idx + 3]);
        self.data[idx + 3] = (alpha + dst_a * inv / 255).min(255) as u8;
    }

    fn blend_mask(&mut self, x: i32, y: i32, w: usize, h: usize, mask: &[u8], color: [u8; 4]) {
        for (row, chunk) in mask.chunks(w).enumerate().take(h) {
            for (col, &coverage) in chunk.iter().enumerate() {
                self.blend_pixel(x + col as i32, y + row as i32, color, coverage);
            }
        }
    }

    fn fill_rounded_rect(&mut self, x: i32, y: i32, w: u32, h: u32, radius: i32, color: [u8; 4]) {
        let radius = radius.min(w as i32 / 2).min(h as i32 / 2).max(0);
        for py in 0..h as i32 {
            for px in 0..w as i32 {
                // Distance from the nearest corner circle center, inside radius.
                let cx = px.clamp(radius, w as i32 - 1 - radius);
                let cy = py.clamp(radius, h as i32 - 1 - radius);
                let dx = px - cx;
                let dy = py - cy;
                if dx * dx + dy * dy <= radius * radius {
                    self.blend_pixel(x + px, y + py, color, 255);
                }
            }
        }
    }

    /// Cheap separable box blur over the whole canvas (shadow softening).
    fn box_blur(&mut self, radius: i32) {
        if radius <= 0 {
            return;
        }
        let w = self.width as i32;
        let h = self.height as i32;
        let mut out = self.data.clone();
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0u32; 4];
                let mut n = 0u32;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let sx = x + dx;
                        let sy = y + dy;
                        if sx < 0 || sy < 0 || sx >= w || sy >= h {
                            continue;
                        }
                        let idx = ((sy * w + sx) * 4) as usize;
                        for c in 0..4 {
                            acc[c] += u32::from(self.data[idx + c]);
                        }
                        n += 1;
                    }
                }
                let idx = ((y * w + x) * 4) as usize;
                for c in 0..4 {
                    out[idx + c] = (acc[c] / n.max(1)) as u8;
                }
            }
        }
        self.data = out;
    }
}

// ---------------------------------------------------------------------------
// Sidecar export
// ---------------------------------------------------------------------------

/// `HH:MM:SS,mmm`
pub fn format_srt_time(seconds: f64) -> String {
    format_timestamp(seconds, ',')
}

/// `HH:MM:SS.mmm`
pub fn format_vtt_time(seconds: f64) -> String {
    format_timestamp(seconds, '.')
}

fn format_timestamp(seconds: f64, sep: char) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}{sep}{millis:03}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidecarFormat {
    Srt,
    Vtt,
}

/// Render all subtitle items of the given layers as a sidecar document.
/// Markup is stripped; items are written in time order.
pub fn render_sidecar(layers: &[SubtitleLayer], format: SidecarFormat) -> String {
    let mut items: Vec<&SubtitleItem> = layers.iter().flat_map(|l| l.items.iter()).collect();
    items.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut out = String::new();
    if format == SidecarFormat::Vtt {
        out.push_str("WEBVTT\n\n");
    }
    for (i, item) in items.iter().enumerate() {
        let (start, end) = match format {
            SidecarFormat::Srt => (format_srt_time(item.start_time), format_srt_time(item.end_time)),
            SidecarFormat::Vtt => (format_vtt_time(item.start_time), format_vtt_time(item.end_time)),
        };
        if format == SidecarFormat::Srt {
            out.push_str(&format!("{}\n", i + 1));
        }
        out.push_str(&format!("{start} --> {end}\n"));
        out.push_str(&strip_markup(&item.text));
        out.push_str("\n\n");
    }
    out
}

pub fn export_sidecar(
    layers: &[SubtitleLayer],
    format: SidecarFormat,
    path: &Path,
) -> TetoResult<()> {
    use anyhow::Context as _;
    crate::output::ensure_parent_dir(path)?;
    std::fs::write(path, render_sidecar(layers, format))
        .with_context(|| format!("failed to write subtitle sidecar '{}'", path.display()))?;
    Ok(())
}

/// Parse a sidecar document back into `(start, end, text)` triples.
/// Supports both formats; used by round-trip tests and importers.
pub fn parse_sidecar(content: &str) -> TetoResult<Vec<(f64, f64, String)>> {
    let mut cues = Vec::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim_end();
        if line.is_empty() || line == "WEBVTT" {
            continue;
        }
        // SRT index lines are plain integers; the time range follows.
        let range_line = if line.contains("-->") {
            line
        } else if line.chars().all(|c| c.is_ascii_digit()) {
            match lines.next() {
                Some(next) if next.contains("-->") => next,
                _ => {
                    return Err(TetoError::validation(format!(
                        "malformed sidecar cue near '{line}'"
                    )))
                }
            }
        } else {
            return Err(TetoError::validation(format!(
                "unexpected sidecar line '{line}'"
            )));
        };

        let (start, end) = range_line
            .split_once("-->")
            .ok_or_else(|| TetoError::validation("sidecar cue missing time range"))?;
        let start = parse_timestamp(start.trim())?;
        let end = parse_timestamp(end.trim())?;

        let mut text = String::new();
        for text_line in lines.by_ref() {
            if text_line.trim().is_empty() {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(text_line);
        }
        cues.push((start, end, text));
    }
    Ok(cues)
}

fn parse_timestamp(s: &str) -> TetoResult<f64> {
    let normalized = s.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return Err(TetoError::validation(format!(
            "invalid sidecar timestamp '{s}'"
        )));
    }
    let hours: f64 = parts[0]
        .parse()
        .map_err(|_| TetoError::validation(format!("invalid sidecar timestamp '{s}'")))?;
    let minutes: f64 = parts[1]
        .parse()
        .map_err(|_| TetoError::validation(format!("invalid sidecar timestamp '{s}'")))?;
    let seconds: f64 = parts[2]
        .parse()
        .map_err(|_| TetoError::validation(format!("invalid sidecar timestamp '{s}'")))?;
    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}
