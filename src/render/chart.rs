use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::config::ChartConfig;
use crate::models::ClassProbabilities;

use super::ACCENT;
use super::text::{TextLine, Typeface, draw_lines};

pub const CHART_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
pub const CHART_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

/// Placement of one class bar on the chart canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    pub label: String,
    pub percent: f64,
    /// First row of the bar.
    pub top: u32,
    /// Row after the last one.
    pub bottom: u32,
    pub width: u32,
}

impl BarGeometry {
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn caption(&self) -> String {
        format!("{}: {:.2}%", self.label, self.percent)
    }
}

pub fn bar_width(percent: f64, canvas_width: u32) -> u32 {
    let raw = (percent / 100.0 * canvas_width as f64).round();
    raw.clamp(0.0, canvas_width as f64) as u32
}

/// Bars in mapping order, one band of `height / count` rows each.
pub fn bar_layout(probs: &ClassProbabilities, config: &ChartConfig) -> Vec<BarGeometry> {
    if probs.is_empty() {
        return Vec::new();
    }
    let band = config.height / probs.len() as u32;
    probs
        .iter()
        .enumerate()
        .map(|(i, (label, percent))| {
            let band_top = i as u32 * band;
            BarGeometry {
                label: label.to_string(),
                percent,
                top: (band_top + config.band_margin).min(band_top + band),
                bottom: band_top + band,
                width: bar_width(percent, config.width),
            }
        })
        .collect()
}

fn caption_line(bar: &BarGeometry, config: &ChartConfig) -> TextLine {
    let baseline = bar.top as f32 + bar.height() as f32 / 2.0 + config.font_scale * 0.35;
    TextLine::new(bar.caption(), config.label_inset as i32, baseline.round() as i32)
}

fn paint_bars(canvas: &mut RgbImage, bars: &[BarGeometry]) {
    for bar in bars {
        if bar.width > 0 && bar.height() > 0 {
            let rect = Rect::at(0, bar.top as i32).of_size(bar.width, bar.height());
            draw_filled_rect_mut(canvas, rect, ACCENT);
        }
    }
}

/// Black canvas with one red bar and caption per class.
pub fn render(probs: &ClassProbabilities, config: &ChartConfig, typeface: &Typeface) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(config.width, config.height, CHART_BACKGROUND);
    let bars = bar_layout(probs, config);
    paint_bars(&mut canvas, &bars);

    let captions: Vec<TextLine> = bars.iter().map(|bar| caption_line(bar, config)).collect();
    draw_lines(&mut canvas, &captions, typeface, config.font_scale, CHART_TEXT);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> &'static Typeface {
        Typeface::bundled().unwrap()
    }

    fn emotions() -> ClassProbabilities {
        ClassProbabilities::from_pairs([
            ("angry", 5.0),
            ("disgust", 0.5),
            ("scared", 2.0),
            ("happy", 80.0),
            ("sad", 7.5),
            ("surprised", 3.0),
            ("neutral", 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn empty_mapping_renders_background_only() {
        let canvas = render(&ClassProbabilities::new(), &ChartConfig::default(), font());
        assert_eq!(canvas.dimensions(), (300, 250));
        assert!(canvas.pixels().all(|p| *p == CHART_BACKGROUND));
    }

    #[test]
    fn reference_bands_are_35_rows_with_margin() {
        let bars = bar_layout(&emotions(), &ChartConfig::default());
        assert_eq!(bars.len(), 7);
        assert_eq!((bars[0].top, bars[0].bottom), (5, 35));
        assert_eq!((bars[3].top, bars[3].bottom), (110, 140));
        assert_eq!(bars[3].width, 240);
        assert_eq!(bars[3].caption(), "happy: 80.00%");
    }

    #[test]
    fn widths_follow_probabilities() {
        let probs = emotions();
        let bars = bar_layout(&probs, &ChartConfig::default());
        for a in &bars {
            assert!(a.width <= 300);
            for b in &bars {
                if a.percent > b.percent {
                    assert!(a.width >= b.width, "{} vs {}", a.label, b.label);
                }
            }
        }
    }

    #[test]
    fn widths_are_clamped() {
        assert_eq!(bar_width(100.0, 300), 300);
        assert_eq!(bar_width(0.0, 300), 0);
        assert_eq!(bar_width(50.0, 301), 151);
    }

    #[test]
    fn keeps_mapping_order_not_magnitude() {
        let probs = ClassProbabilities::from_pairs([("low", 1.0), ("high", 99.0)]).unwrap();
        let bars = bar_layout(&probs, &ChartConfig::default());
        assert_eq!(bars[0].label, "low");
        assert!(bars[0].top < bars[1].top);
    }

    #[test]
    fn bars_are_painted_in_their_band() {
        let probs = ClassProbabilities::from_pairs([("a", 50.0), ("b", 0.0)]).unwrap();
        let canvas = render(&probs, &ChartConfig::default(), font());
        // band = 125 rows, bar a spans rows 5..125 and columns 0..150
        assert_eq!(*canvas.get_pixel(0, 5), ACCENT);
        assert_eq!(*canvas.get_pixel(149, 124), ACCENT);
        assert_eq!(*canvas.get_pixel(150, 60), CHART_BACKGROUND);
        assert_eq!(*canvas.get_pixel(10, 4), CHART_BACKGROUND);
        assert!((125..250).all(|y| *canvas.get_pixel(0, y) == CHART_BACKGROUND));
    }

    #[test]
    fn rendering_is_deterministic() {
        let cfg = ChartConfig::default();
        assert_eq!(render(&emotions(), &cfg, font()), render(&emotions(), &cfg, font()));
    }

    #[test]
    fn captions_stay_inside_their_band() {
        let cfg = ChartConfig::default();
        let bars = bar_layout(&emotions(), &cfg);
        let mut bare = RgbImage::from_pixel(cfg.width, cfg.height, CHART_BACKGROUND);
        paint_bars(&mut bare, &bars);
        let full = render(&emotions(), &cfg, font());

        let band = cfg.height / bars.len() as u32;
        let mut inked_bands = vec![false; bars.len()];
        for (x, y, p) in full.enumerate_pixels() {
            if p == bare.get_pixel(x, y) {
                continue;
            }
            let i = (y / band) as usize;
            assert!(i < bars.len(), "text below the last band at row {y}");
            assert!(y > i as u32 * band && y < (i as u32 + 1) * band, "row {y}");
            assert!(x >= cfg.label_inset, "column {x}");
            inked_bands[i] = true;
        }
        assert!(inked_bands.iter().all(|&b| b), "{inked_bands:?}");
    }

    #[test]
    fn captions_are_light_on_bars_and_background() {
        let cfg = ChartConfig::default();
        let probs = ClassProbabilities::from_pairs([("full", 100.0), ("none", 0.0)]).unwrap();
        let canvas = render(&probs, &cfg, font());
        let bars = bar_layout(&probs, &cfg);

        // caption over the red bar brightens green/blue, over black any channel
        let over_bar = (bars[0].top..bars[0].bottom)
            .flat_map(|y| (0..cfg.width).map(move |x| (x, y)))
            .any(|(x, y)| canvas.get_pixel(x, y)[1] > 128);
        let over_background = (bars[1].top..bars[1].bottom)
            .flat_map(|y| (0..cfg.width).map(move |x| (x, y)))
            .any(|(x, y)| canvas.get_pixel(x, y)[0] > 128);
        assert!(over_bar && over_background);
    }
}
