//! Quote card composition.
//!
//! A card is a 1080x1350 JPEG: blurred background, translucent dark panel,
//! centered caption in the built-in bitmap font. The background is the
//! provided image, a random photo, or a synthesized gradient, so a card is
//! always produced.

use std::io::Cursor;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::font::{self, ADVANCE, GLYPH_HEIGHT};
use crate::llms::providers::utils::http_client;
use crate::utilities::errors::{BotError, Result};

const JPEG_QUALITY: u8 = 92;

/// Duotone palette used by the gradient variant, top and bottom colors.
pub const PALETTE: &[([u8; 3], [u8; 3])] = &[
    ([20, 30, 48], [36, 59, 85]),
    ([15, 32, 39], [44, 83, 100]),
    ([35, 7, 77], [204, 83, 51]),
    ([0, 0, 0], [67, 67, 67]),
    ([72, 85, 99], [41, 50, 60]),
    ([58, 28, 113], [215, 109, 119]),
];

/// Visual style of a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CardStyle {
    /// Photo background with a dark panel.
    #[default]
    Card,
    /// Duotone vertical gradient.
    Gradient,
    /// Monochrome, high-contrast, larger caption.
    Poster,
}

/// Per-style rendering parameters.
#[derive(Debug, Clone, Copy)]
struct Look {
    blur_sigma: f32,
    panel_alpha: f32,
    max_scale: u32,
    text: Rgb<u8>,
}

impl CardStyle {
    fn look(&self) -> Look {
        match self {
            Self::Card => Look {
                blur_sigma: 2.0,
                panel_alpha: 0.35,
                max_scale: 6,
                text: Rgb([255, 255, 255]),
            },
            Self::Gradient => Look {
                blur_sigma: 0.0,
                panel_alpha: 0.2,
                max_scale: 6,
                text: Rgb([255, 255, 255]),
            },
            Self::Poster => Look {
                blur_sigma: 1.0,
                panel_alpha: 0.55,
                max_scale: 8,
                text: Rgb([255, 255, 255]),
            },
        }
    }
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a
/// line are split.
pub fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Vertical blend from `top` to `bottom`.
pub fn gradient_image(width: u32, height: u32, top: [u8; 3], bottom: [u8; 3]) -> RgbImage {
    let span = height.saturating_sub(1).max(1) as f32;
    RgbImage::from_fn(width, height, |_, y| {
        let t = y as f32 / span;
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb([mix(top[0], bottom[0]), mix(top[1], bottom[1]), mix(top[2], bottom[2])])
    })
}

/// Encode as baseline JPEG.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    DynamicImage::ImageRgb8(image.clone()).write_with_encoder(encoder)?;
    Ok(bytes.into_inner())
}

/// Card renderer.
#[derive(Debug, Clone)]
pub struct CardComposer {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub photo_base_url: String,
    pub timeout: Duration,
}

impl Default for CardComposer {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1350,
            margin: 80,
            photo_base_url: "https://picsum.photos".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl CardComposer {
    /// Largest scale (up to `max_scale`) whose wrapped caption fits the panel.
    fn fit(&self, text: &str, max_scale: u32, panel_h: u32) -> (u32, Vec<String>) {
        let box_w = self.width.saturating_sub(self.margin * 2);
        for scale in (1..=max_scale.max(1)).rev() {
            let per_line = ((box_w / scale + 1) / ADVANCE).max(1) as usize;
            let lines = wrap_lines(text, per_line);
            let line_h = GLYPH_HEIGHT * scale + scale * 3;
            if line_h * lines.len() as u32 <= panel_h.saturating_sub(self.margin) {
                return (scale, lines);
            }
        }
        let per_line = (box_w / ADVANCE).max(1) as usize;
        (1, wrap_lines(text, per_line))
    }

    /// Draw `text` over `background` in `style`.
    pub fn render(&self, text: &str, background: &DynamicImage, style: CardStyle) -> RgbImage {
        let look = style.look();
        let resized = background.resize_to_fill(self.width, self.height, FilterType::Triangle);
        let mut base = match style {
            CardStyle::Poster => {
                let gray = DynamicImage::ImageLuma8(resized.to_luma8()).to_rgb8();
                imageops::contrast(&gray, 30.0)
            }
            _ => resized.to_rgb8(),
        };
        if look.blur_sigma > 0.0 {
            base = imageops::blur(&base, look.blur_sigma);
        }

        let panel_h = self.height.saturating_sub(self.margin * 2).min(800);
        let panel_top = (self.height - panel_h) / 2;
        let panel_left = self.margin / 2;
        let panel_right = self.width.saturating_sub(self.margin / 2);
        let keep = 1.0 - look.panel_alpha.clamp(0.0, 1.0);
        for y in panel_top..panel_top + panel_h {
            for x in panel_left..panel_right {
                let p = base.get_pixel_mut(x, y);
                for c in p.0.iter_mut() {
                    *c = (*c as f32 * keep).round() as u8;
                }
            }
        }

        let (scale, lines) = self.fit(text, look.max_scale, panel_h);
        let line_h = GLYPH_HEIGHT * scale + scale * 3;
        let block_h = line_h * lines.len() as u32;
        let mut y = (panel_top + panel_h.saturating_sub(block_h) / 2).max(self.margin);
        for line in &lines {
            let w = font::text_width(line, scale);
            let x = self.width.saturating_sub(w) / 2;
            font::draw_text(&mut base, line, x as i64, y as i64, scale, look.text);
            y += line_h;
        }
        base
    }

    /// Card over a decoded background.
    pub fn compose_over(&self, text: &str, background: &DynamicImage) -> Result<Vec<u8>> {
        encode_jpeg(&self.render(text, background, CardStyle::Card))
    }

    /// Card over `background` bytes, a fetched photo, or a gradient.
    pub async fn compose(&self, text: &str, background: Option<&[u8]>) -> Result<Vec<u8>> {
        let decoded = match background {
            Some(bytes) => match image::load_from_memory(bytes) {
                Ok(img) => Some(img),
                Err(e) => {
                    log::warn!("Unreadable background image ({}); fetching one instead", e);
                    None
                }
            },
            None => None,
        };
        let decoded = match decoded {
            Some(img) => img,
            None => match self.fetch_background().await {
                Ok(img) => img,
                Err(e) => {
                    log::warn!("Background fetch failed ({}); using a gradient", e);
                    return self.gradient(text);
                }
            },
        };
        self.compose_over(text, &decoded)
    }

    /// Duotone gradient card with a random palette entry.
    pub fn gradient(&self, text: &str) -> Result<Vec<u8>> {
        let idx = rand::rng().random_range(0..PALETTE.len());
        self.gradient_with(text, idx)
    }

    pub fn gradient_with(&self, text: &str, palette_idx: usize) -> Result<Vec<u8>> {
        let (top, bottom) = PALETTE[palette_idx % PALETTE.len()];
        let bg = DynamicImage::ImageRgb8(gradient_image(self.width, self.height, top, bottom));
        encode_jpeg(&self.render(text, &bg, CardStyle::Gradient))
    }

    /// Monochrome poster over `background`, or a dark gray gradient.
    pub fn poster(&self, text: &str, background: Option<&[u8]>) -> Result<Vec<u8>> {
        let bg = background
            .and_then(|bytes| image::load_from_memory(bytes).ok())
            .unwrap_or_else(|| {
                DynamicImage::ImageRgb8(gradient_image(
                    self.width,
                    self.height,
                    [40, 40, 40],
                    [5, 5, 5],
                ))
            });
        encode_jpeg(&self.render(text, &bg, CardStyle::Poster))
    }

    /// Compose in `style`.
    pub async fn compose_style(
        &self,
        text: &str,
        background: Option<&[u8]>,
        style: CardStyle,
    ) -> Result<Vec<u8>> {
        match style {
            CardStyle::Card => self.compose(text, background).await,
            CardStyle::Gradient => self.gradient(text),
            CardStyle::Poster => self.poster(text, background),
        }
    }

    /// Random photo sized to the card.
    pub async fn fetch_background(&self) -> Result<DynamicImage> {
        let seed: u32 = rand::rng().random_range(1..10_000_000);
        let url = format!(
            "{}/seed/{}/{}/{}",
            self.photo_base_url.trim_end_matches('/'),
            seed,
            self.width,
            self.height
        );
        let response = http_client(self.timeout)?.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                service: "picsum".to_string(),
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(image::load_from_memory(&bytes)?)
    }
}
