//! Binarization and horizontal line segmentation

use crate::config::SegmentedSettings;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

const INK: u8 = 0;
const PAPER: u8 = 255;

/// A horizontal band of the page holding one text line. `bottom` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRegion {
    pub top: u32,
    pub bottom: u32,
}

impl LineRegion {
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Otsu binarization: pixels at or below the level become ink (0), the rest paper (255).
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel[0] <= level { INK } else { PAPER };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Split a binarized page into text lines using the horizontal ink profile.
///
/// Regions come back top to bottom. Short gaps are bridged, bands thinner than
/// `min_line_height` are dropped and every band is padded and clamped to the page.
pub fn segment_lines(binary: &GrayImage, settings: &SegmentedSettings) -> Vec<LineRegion> {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let noise_floor = (width / 200).max(1);
    let profile: Vec<u32> = (0..height)
        .map(|y| (0..width).filter(|&x| binary.get_pixel(x, y)[0] == INK).count() as u32)
        .collect();

    let mut bands: Vec<LineRegion> = Vec::new();
    let mut start: Option<u32> = None;
    for (y, &ink) in profile.iter().enumerate() {
        let y = y as u32;
        // Fully inked rows are borders or inverted regions, not text
        let is_text = ink >= noise_floor && ink < width;
        match (is_text, start) {
            (true, None) => start = Some(y),
            (false, Some(top)) => {
                bands.push(LineRegion { top, bottom: y });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(top) = start {
        bands.push(LineRegion {
            top,
            bottom: height,
        });
    }

    let mut merged: Vec<LineRegion> = Vec::with_capacity(bands.len());
    for band in bands {
        match merged.last_mut() {
            Some(last) if band.top - last.bottom <= settings.max_line_gap => {
                last.bottom = band.bottom;
            }
            _ => merged.push(band),
        }
    }

    merged
        .into_iter()
        .filter(|band| band.height() >= settings.min_line_height)
        .map(|band| LineRegion {
            top: band.top.saturating_sub(settings.line_padding),
            bottom: (band.bottom + settings.line_padding).min(height),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_bars(width: u32, height: u32, bars: &[(u32, u32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([240]));
        for &(top, bottom) in bars {
            for y in top..bottom {
                for x in 10..width - 10 {
                    img.put_pixel(x, y, Luma([20]));
                }
            }
        }
        img
    }

    fn settings() -> SegmentedSettings {
        SegmentedSettings {
            line_psm: 7,
            min_line_height: 4,
            max_line_gap: 2,
            line_padding: 0,
        }
    }

    #[test]
    fn test_binarize_splits_ink_and_paper() {
        let gray = page_with_bars(100, 40, &[(10, 20)]);
        let binary = binarize(&gray);
        assert_eq!(binary.get_pixel(50, 15)[0], INK);
        assert_eq!(binary.get_pixel(50, 5)[0], PAPER);
        assert_eq!(binary.get_pixel(2, 15)[0], PAPER);
    }

    #[test]
    fn test_lines_are_top_to_bottom() {
        let gray = page_with_bars(120, 100, &[(10, 20), (40, 52), (70, 78)]);
        let lines = segment_lines(&binarize(&gray), &settings());
        assert_eq!(
            lines,
            vec![
                LineRegion { top: 10, bottom: 20 },
                LineRegion { top: 40, bottom: 52 },
                LineRegion { top: 70, bottom: 78 },
            ]
        );
    }

    #[test]
    fn test_small_gaps_merge_and_specks_drop() {
        // 1px gap inside a line, 2px speck far below
        let gray = page_with_bars(120, 100, &[(10, 15), (16, 22), (60, 62)]);
        let lines = segment_lines(&binarize(&gray), &settings());
        assert_eq!(lines, vec![LineRegion { top: 10, bottom: 22 }]);
    }

    #[test]
    fn test_padding_is_clamped() {
        let gray = page_with_bars(120, 30, &[(1, 10), (22, 30)]);
        let padded = SegmentedSettings {
            line_padding: 3,
            ..settings()
        };
        let lines = segment_lines(&binarize(&gray), &padded);
        assert_eq!(
            lines,
            vec![
                LineRegion { top: 0, bottom: 13 },
                LineRegion { top: 19, bottom: 30 },
            ]
        );
    }

    #[test]
    fn test_blank_page_has_no_lines() {
        let blank = GrayImage::from_pixel(80, 80, Luma([255]));
        assert!(segment_lines(&binarize(&blank), &settings()).is_empty());
    }
}
