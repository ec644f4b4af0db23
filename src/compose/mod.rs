//! Border and page-number compositing.
//!
//! Grows the page canvas by the enabled reserved areas and draws the
//! configured decorations into them: solid bars anchored to the outer edge
//! with centered light-on-dark text (rotated on the sides), plain captions
//! with optional divider lines, and centered page numbers with an optional
//! ring. Content is pasted inset, never scaled or clipped. Every decoration
//! draws independently; a failing element is logged and skipped.

use chrono::{Datelike, Local, Timelike};
use image::{imageops, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::RotuloError;
use crate::font::{raster, Face};
use crate::geometry::{mm_to_px, pt_to_px};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarColor {
    #[default]
    Black,
    Red,
}

impl BarColor {
    fn rgb(self) -> Rgb<u8> {
        match self {
            BarColor::Black => BLACK,
            BarColor::Red => RED,
        }
    }
}

/// Configuration for one reserved border area. A bar takes precedence over
/// plain text when both are enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SideBorder {
    pub enabled: bool,
    /// Reserved space on this side, in mm. 0 disables the area.
    pub area_mm: f32,
    pub bar: bool,
    pub bar_mm: f32,
    pub bar_color: BarColor,
    pub bar_text: String,
    /// 0 picks a size proportional to the bar.
    pub bar_text_size_pt: f32,
    pub text: bool,
    pub text_content: String,
    /// 0 falls back to the default font size.
    pub text_size_pt: f32,
    /// Divider line toward the content; top/bottom areas only.
    pub divider: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub left: SideBorder,
    pub right: SideBorder,
    pub top: SideBorder,
    pub bottom: SideBorder,
    pub divider_distance_px: u32,
    pub default_font_size_pt: f32,
    /// Page number in the bottom area instead of the bottom caption.
    pub page_numbers: bool,
    pub page_number_circle: bool,
    pub page_number_mm: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        BorderConfig {
            left: SideBorder::default(),
            right: SideBorder::default(),
            top: SideBorder::default(),
            bottom: SideBorder::default(),
            divider_distance_px: 1,
            default_font_size_pt: 12.0,
            page_numbers: false,
            page_number_circle: true,
            page_number_mm: 4.0,
        }
    }
}

/// Expand `{page}`, `{pages}`, `{date}`, `{time}` and `{datetime}`.
pub fn substitute(text: &str, page_num: usize, total_pages: usize) -> String {
    let now = Local::now();
    let date = format!("{:02}.{:02}.{}", now.day(), now.month(), now.year());
    let time = format!("{:02}:{:02}", now.hour(), now.minute());
    let datetime = format!("{date} {time}");
    text.replace("{page}", &page_num.to_string())
        .replace("{pages}", &total_pages.to_string())
        .replace("{date}", &date)
        .replace("{time}", &time)
        .replace("{datetime}", &datetime)
}

fn area_px(side: &SideBorder, dpi: u32) -> u32 {
    if side.enabled && side.area_mm > 0.0 {
        mm_to_px(side.area_mm, dpi)
    } else {
        0
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x1 = x.saturating_add(w).min(img.width());
    let y1 = y.saturating_add(h).min(img.height());
    for py in y.min(img.height())..y1 {
        for px in x.min(img.width())..x1 {
            img.put_pixel(px, py, color);
        }
    }
}

fn centered_text(
    img: &mut RgbImage,
    face: &Face,
    text: &str,
    cx: u32,
    cy: u32,
    px: f32,
    color: Rgb<u8>,
) {
    let (w, h) = raster::measure(face, text, px);
    let x = cx as i32 - (w / 2) as i32;
    let y = cy as i32 - (h / 2) as i32;
    raster::draw(img, face, text, x, y, px, color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Draw a rotated text strip covering one vertical band of the canvas.
/// The strip is laid out horizontally and rotated so left-side text reads
/// bottom-to-top and right-side text top-to-bottom.
fn draw_side_strip(
    canvas: &mut RgbImage,
    face: &Face,
    text: &str,
    px: f32,
    strip_w: u32,
    dest_x: u32,
    side: Side,
    fg: Rgb<u8>,
    bg: Rgb<u8>,
) -> Result<(), RotuloError> {
    let length = canvas.height();
    if strip_w == 0 || length == 0 || px <= 0.0 {
        return Err(RotuloError::Layout(format!(
            "degenerate {side:?} strip {strip_w}x{length} at {px}px"
        )));
    }
    let mut strip = RgbImage::from_pixel(length, strip_w, bg);
    let cx = length / 2;
    let cy = strip_w / 2;
    centered_text(&mut strip, face, text, cx, cy, px, fg);
    let rotated = match side {
        Side::Left => imageops::rotate270(&strip),
        Side::Right => imageops::rotate90(&strip),
    };
    imageops::replace(canvas, &rotated, dest_x as i64, 0);
    Ok(())
}

fn draw_ring(img: &mut RgbImage, cx: i64, cy: i64, w: u32, h: u32, outline: u32) {
    let a = (w as f64) / 2.0;
    let b = (h as f64) / 2.0;
    if a <= 0.0 || b <= 0.0 {
        return;
    }
    let ia = a - outline as f64;
    let ib = b - outline as f64;
    let x0 = (cx - a.ceil() as i64).max(0);
    let x1 = (cx + a.ceil() as i64 + 1).min(img.width() as i64);
    let y0 = (cy - b.ceil() as i64).max(0);
    let y1 = (cy + b.ceil() as i64 + 1).min(img.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            let dx = (px - cx) as f64 + 0.5;
            let dy = (py - cy) as f64 + 0.5;
            let outer = (dx / a).powi(2) + (dy / b).powi(2) <= 1.0;
            let inner = ia > 0.0 && ib > 0.0 && (dx / ia).powi(2) + (dy / ib).powi(2) <= 1.0;
            if outer && !inner {
                img.put_pixel(px as u32, py as u32, BLACK);
            }
        }
    }
}

/// Decorate one content page. The canvas grows by every enabled reserved
/// area; with none enabled the content is returned untouched.
pub fn decorate(
    content: &RgbImage,
    cfg: &BorderConfig,
    face: &Face,
    page_num: usize,
    total_pages: usize,
    dpi: u32,
) -> RgbImage {
    let left_area = area_px(&cfg.left, dpi);
    let right_area = area_px(&cfg.right, dpi);
    let top_area = area_px(&cfg.top, dpi);
    let bottom_area = area_px(&cfg.bottom, dpi);

    if left_area == 0 && right_area == 0 && top_area == 0 && bottom_area == 0 {
        return content.clone();
    }

    let content_w = content.width();
    let content_h = content.height();
    let final_w = content_w + left_area + right_area;
    let final_h = content_h + top_area + bottom_area;
    let content_x = left_area;
    let content_y = top_area;

    let mut canvas = RgbImage::from_pixel(final_w, final_h, WHITE);
    imageops::replace(&mut canvas, content, content_x as i64, content_y as i64);

    let default_px = pt_to_px(cfg.default_font_size_pt, dpi).max(1) as f32;
    let subst = |s: &str| substitute(s, page_num, total_pages);
    let skip = |what: &str, err: RotuloError| {
        log::warn!("skipping {what}: {err}");
    };

    // Vertical side areas
    for (side, area, cfg_side) in [
        (Side::Left, left_area, &cfg.left),
        (Side::Right, right_area, &cfg.right),
    ] {
        if area == 0 {
            continue;
        }
        let bar_px = if cfg_side.bar_mm > 0.0 {
            mm_to_px(cfg_side.bar_mm, dpi)
        } else {
            0
        };
        if cfg_side.bar && bar_px > 0 {
            let fill = cfg_side.bar_color.rgb();
            let bar_x = match side {
                Side::Left => 0,
                Side::Right => final_w - bar_px.min(final_w),
            };
            fill_rect(&mut canvas, bar_x, 0, bar_px, final_h, fill);
            if !cfg_side.bar_text.is_empty() {
                let px = if cfg_side.bar_text_size_pt > 0.0 {
                    pt_to_px(cfg_side.bar_text_size_pt, dpi) as f32
                } else {
                    bar_px as f32 * 0.7
                };
                if let Err(e) = draw_side_strip(
                    &mut canvas,
                    face,
                    &subst(&cfg_side.bar_text),
                    px,
                    bar_px,
                    bar_x,
                    side,
                    WHITE,
                    fill,
                ) {
                    skip("bar text", e);
                }
            }
        } else if cfg_side.text && !cfg_side.text_content.is_empty() {
            let strip_x = match side {
                Side::Left => 0,
                Side::Right => final_w - area,
            };
            if let Err(e) = draw_side_strip(
                &mut canvas,
                face,
                &subst(&cfg_side.text_content),
                default_px,
                area,
                strip_x,
                side,
                BLACK,
                WHITE,
            ) {
                skip("side text", e);
            }
        }
    }

    // Top area
    if top_area > 0 {
        let side = &cfg.top;
        let bar_h = mm_to_px(side.bar_mm.max(0.0), dpi).min(top_area);
        if side.bar && bar_h > 0 {
            let fill = side.bar_color.rgb();
            fill_rect(&mut canvas, content_x, 0, content_w, bar_h, fill);
            if !side.bar_text.is_empty() {
                let px = if side.bar_text_size_pt > 0.0 {
                    pt_to_px(side.bar_text_size_pt, dpi) as f32
                } else {
                    bar_h as f32 * 0.6
                };
                centered_text(
                    &mut canvas,
                    face,
                    &subst(&side.bar_text),
                    content_x + content_w / 2,
                    bar_h / 2,
                    px.max(1.0),
                    WHITE,
                );
            }
        } else if side.text {
            if side.divider {
                let div_y = top_area.saturating_sub(cfg.divider_distance_px);
                fill_rect(&mut canvas, content_x, div_y, content_w, 1, BLACK);
            }
            if !side.text_content.is_empty() {
                let px = if side.text_size_pt > 0.0 {
                    pt_to_px(side.text_size_pt, dpi) as f32
                } else {
                    default_px
                };
                centered_text(
                    &mut canvas,
                    face,
                    &subst(&side.text_content),
                    content_x + content_w / 2,
                    top_area / 2,
                    px,
                    BLACK,
                );
            }
        }
    }

    // Bottom area
    if bottom_area > 0 {
        let side = &cfg.bottom;
        let bar_h = mm_to_px(side.bar_mm.max(0.0), dpi).min(bottom_area);
        let area_y = final_h - bottom_area;
        if side.bar && bar_h > 0 {
            let fill = side.bar_color.rgb();
            fill_rect(&mut canvas, content_x, area_y, content_w, bar_h, fill);
            if !side.bar_text.is_empty() {
                let px = if side.bar_text_size_pt > 0.0 {
                    pt_to_px(side.bar_text_size_pt, dpi) as f32
                } else {
                    bar_h as f32 * 0.6
                };
                centered_text(
                    &mut canvas,
                    face,
                    &subst(&side.bar_text),
                    content_x + content_w / 2,
                    area_y + bar_h / 2,
                    px.max(1.0),
                    WHITE,
                );
            }
        } else if side.text {
            if side.divider {
                let div_y = content_y + content_h + cfg.divider_distance_px;
                fill_rect(&mut canvas, content_x, div_y, content_w, 1, BLACK);
            }
            if cfg.page_numbers && total_pages > 0 {
                let diameter = mm_to_px(cfg.page_number_mm, dpi);
                let number = page_num.to_string();
                let px = (diameter.saturating_sub(2))
                    .min((diameter as f32 * 0.85) as u32)
                    .max(8) as f32;
                let cx = (content_x + content_w / 2) as i64;
                let cy = (area_y + bottom_area / 2) as i64;
                if cfg.page_number_circle {
                    let outline = (diameter / 18).max(1);
                    draw_ring(&mut canvas, cx, cy, diameter, diameter, outline);
                }
                centered_text(&mut canvas, face, &number, cx as u32, cy as u32, px, BLACK);
            } else if !side.text_content.is_empty() {
                let px = if side.text_size_pt > 0.0 {
                    pt_to_px(side.text_size_pt, dpi) as f32
                } else {
                    default_px
                };
                centered_text(
                    &mut canvas,
                    face,
                    &subst(&side.text_content),
                    content_x + content_w / 2,
                    area_y + bottom_area / 2,
                    px,
                    BLACK,
                );
            }
        }
    }

    canvas
}

/// Draw the page number onto the reserved footer strip of a sliced page.
/// Used by the pagination pipeline, where pages already carry their footer.
pub fn draw_page_number_footer(
    image: &mut RgbImage,
    index: usize,
    total: usize,
    footer_mm: f32,
    diameter_mm: f32,
    dpi: u32,
    draw_circle: bool,
    include_total: bool,
    face: &Face,
) {
    if total == 0 {
        return;
    }
    let diameter = mm_to_px(diameter_mm, dpi).max(1);
    let footer_px = mm_to_px(footer_mm, dpi).max(1);

    let number = if include_total && total > 1 {
        format!("{index}/{total}")
    } else {
        index.to_string()
    };
    let px = (diameter.saturating_sub(2))
        .min((diameter as f32 * 0.85) as u32)
        .max(8) as f32;
    let (text_w, text_h) = raster::measure(face, &number, px);

    let cx = image.width() / 2;
    let baseline = image.height().saturating_sub(footer_px / 2);
    let mut cy = (diameter / 2 + text_h / 2 + 1).max(baseline);
    cy = cy.min(image.height().saturating_sub(diameter / 2 + 1));

    if draw_circle {
        let ring_w = if include_total && total > 1 {
            diameter.max(text_w + (diameter / 2).max(6))
        } else {
            diameter
        };
        let outline = (diameter / 18).max(1);
        draw_ring(image, cx as i64, cy as i64, ring_w, diameter, outline);
    }
    centered_text(image, face, &number, cx, cy, px, BLACK);
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FaceSet;

    fn content(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, WHITE)
    }

    fn face() -> Face {
        FaceSet::builtin().regular
    }

    #[test]
    fn substitution_expands_page_counters() {
        assert_eq!(substitute("{page}/{pages}", 2, 5), "2/5");
        assert_eq!(substitute("plain", 1, 1), "plain");
    }

    #[test]
    fn no_enabled_areas_keeps_dimensions() {
        let img = content(100, 50);
        let out = decorate(&img, &BorderConfig::default(), &face(), 1, 1, 300);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn bottom_bar_grows_canvas_and_fills_red() {
        let cfg = BorderConfig {
            bottom: SideBorder {
                enabled: true,
                area_mm: 6.0,
                bar: true,
                bar_mm: 4.0,
                bar_color: BarColor::Red,
                ..Default::default()
            },
            ..Default::default()
        };
        let img = content(200, 100);
        let out = decorate(&img, &cfg, &face(), 1, 1, 300);
        let area = mm_to_px(6.0, 300);
        let bar = mm_to_px(4.0, 300);
        assert_eq!(out.width(), 200);
        assert_eq!(out.height(), 100 + area);
        let bar_y = 100 + area - area; // bar starts at the area top
        for y in bar_y..bar_y + bar {
            assert_eq!(out.get_pixel(100, y).0, [255, 0, 0]);
        }
        // Below the bar the area stays white
        assert_eq!(out.get_pixel(100, 100 + area - 1).0, [255, 255, 255]);
    }

    #[test]
    fn left_bar_spans_full_height() {
        let cfg = BorderConfig {
            left: SideBorder {
                enabled: true,
                area_mm: 8.0,
                bar: true,
                bar_mm: 3.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let img = content(100, 80);
        let out = decorate(&img, &cfg, &face(), 1, 1, 300);
        let area = mm_to_px(8.0, 300);
        assert_eq!(out.width(), 100 + area);
        assert_eq!(out.height(), 80);
        for y in 0..out.height() {
            assert_eq!(out.get_pixel(0, y).0, [0, 0, 0]);
        }
        // Content origin is inset by the reserved area
        assert_eq!(out.get_pixel(area + 1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn disabled_side_adds_no_area() {
        let cfg = BorderConfig {
            right: SideBorder {
                area_mm: 10.0,
                enabled: false,
                ..Default::default()
            },
            top: SideBorder {
                enabled: true,
                area_mm: 5.0,
                text: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let img = content(60, 40);
        let out = decorate(&img, &cfg, &face(), 1, 1, 300);
        assert_eq!(out.width(), 60);
        assert_eq!(out.height(), 40 + mm_to_px(5.0, 300));
    }

    #[test]
    fn top_divider_draws_line_above_content() {
        let cfg = BorderConfig {
            top: SideBorder {
                enabled: true,
                area_mm: 5.0,
                text: true,
                divider: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let img = content(100, 40);
        let out = decorate(&img, &cfg, &face(), 1, 1, 300);
        let area = mm_to_px(5.0, 300);
        let div_y = area - 1;
        assert_eq!(out.get_pixel(50, div_y).0, [0, 0, 0]);
    }

    #[test]
    fn bar_text_is_light_on_dark() {
        let cfg = BorderConfig {
            bottom: SideBorder {
                enabled: true,
                area_mm: 8.0,
                bar: true,
                bar_mm: 8.0,
                bar_text: "X".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let img = content(200, 50);
        let out = decorate(&img, &cfg, &face(), 1, 1, 300);
        let area = mm_to_px(8.0, 300);
        let band = 50..50 + area;
        let white_px = band
            .clone()
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y).0 == [255, 255, 255])
            .count();
        assert!(white_px > 0, "bar text should punch white into the bar");
        let black_px = band
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y).0 == [0, 0, 0])
            .count();
        assert!(black_px > white_px);
    }

    #[test]
    fn page_number_footer_marks_bottom_center() {
        let mut img = content(200, 300);
        draw_page_number_footer(&mut img, 2, 3, 4.0, 4.0, 300, true, true, &face());
        let footer = mm_to_px(4.0, 300);
        let ink = (300 - 3 * footer..300)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0 != [255, 255, 255])
            .count();
        assert!(ink > 0);
        // Content body above the footer band stays untouched
        for y in 0..100 {
            for x in 0..200 {
                assert_eq!(img.get_pixel(x, y).0, [255, 255, 255]);
            }
        }
    }

    #[test]
    fn zero_total_draws_nothing() {
        let mut img = content(100, 100);
        draw_page_number_footer(&mut img, 1, 0, 4.0, 4.0, 300, true, false, &face());
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }
}
