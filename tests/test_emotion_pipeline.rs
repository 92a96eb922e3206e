mod common;

use std::sync::Arc;

use common::*;
use facereport::render::ACCENT;
use facereport::render::chart::CHART_BACKGROUND;
use facereport::render::sprite::SpriteSkip;
use facereport::{
    EMOTION_LABELS, EmotionConfig, EmotionPipeline, FaceReportError, Region, SourceImage,
    SpriteSet, SpriteStatus,
};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

fn config(results: &std::path::Path) -> EmotionConfig {
    EmotionConfig::default().with_results_dir(results)
}

#[test]
fn largest_face_is_classified_and_written() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "emo2.png", 1000, 600);
    let results = dir.path().join("results");

    let scores = FixedScores::new(happy_scores());
    let pipeline = EmotionPipeline::new(
        FixedDetector(vec![Region::new(10, 10, 20, 20), Region::new(100, 50, 120, 100)]),
        scores,
    )
    .with_config(config(&results));

    let report = pipeline.run(&input)?;
    assert_eq!(report.result_path, results.join("emo2_result.jpg"));
    assert_eq!(report.probabilities_path, results.join("emo2_probabilities.jpg"));
    assert_eq!(
        dir_listing(&results),
        vec!["emo2_probabilities.jpg", "emo2_result.jpg"]
    );

    let verdict = report.verdict.expect("face should be classified");
    assert_eq!(verdict.region, Region::new(100, 50, 120, 100));
    assert_eq!(verdict.label, "happy");
    assert_eq!(verdict.sprite, SpriteStatus::Missing);
    let labels: Vec<&str> = verdict.probabilities.iter().map(|(l, _)| l).collect();
    assert_eq!(labels, EMOTION_LABELS.to_vec());

    // frames are resized to 500px wide before detection
    let frame = image::open(&report.result_path)?;
    assert_eq!((frame.width(), frame.height()), (500, 300));
    let chart = image::open(&report.probabilities_path)?;
    assert_eq!((chart.width(), chart.height()), (300, 250));
    Ok(())
}

#[test]
fn roi_is_resized_for_the_classifier() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "f.png", 200, 200);
    let source = SourceImage::open(&input)?;

    let scores = Arc::new(FixedScores::new(happy_scores()));

    let pipeline = EmotionPipeline::new(
        FixedDetector(vec![Region::new(20, 20, 90, 70)]),
        SharedScores(scores.clone()),
    )
    .with_config(config(&dir.path().join("out")).with_frame_width(None));
    pipeline.render(&source)?;

    assert_eq!(*scores.seen.lock().unwrap(), Some((64, 64)));
    Ok(())
}

#[test]
fn annotated_frame_has_box_and_opaque_sprite() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "s.png", 200, 200);
    let source = SourceImage::open(&input)?;

    let mut sprites = SpriteSet::new();
    sprites.insert(
        "happy",
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 255]))),
    );
    let region = Region::new(40, 40, 50, 50);
    let scores = FixedScores::new(happy_scores());
    let pipeline = EmotionPipeline::new(FixedDetector(vec![region]), scores)
        .with_config(config(&dir.path().join("out")).with_frame_width(None))
        .with_sprites(sprites);

    let rendered = pipeline.render(&source)?;
    let verdict = rendered.verdict.unwrap();
    assert_eq!(verdict.sprite, SpriteStatus::Drawn);

    assert_eq!(*rendered.frame.get_pixel(40, 40), ACCENT);
    assert_eq!(*rendered.frame.get_pixel(89, 89), ACCENT);
    // sprite sits 10px below the box
    assert_eq!(*rendered.frame.get_pixel(40, 100), Rgb([0, 255, 0]));
    assert_eq!(*rendered.frame.get_pixel(47, 107), Rgb([0, 255, 0]));
    assert_eq!(rendered.frame.get_pixel(48, 108), source.pixels.get_pixel(48, 108));

    // the "happy" bar is the 4th band: rows 110..140, 240px wide
    assert_eq!(*rendered.chart.get_pixel(0, 110), ACCENT);
    assert_eq!(*rendered.chart.get_pixel(239, 139), ACCENT);
    assert_eq!(*rendered.chart.get_pixel(299, 139), CHART_BACKGROUND);
    Ok(())
}

#[test]
fn sprite_that_does_not_fit_is_skipped() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "edge.png", 100, 100);
    let source = SourceImage::open(&input)?;

    let mut sprites = SpriteSet::new();
    sprites.insert(
        "happy",
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([9, 9, 9, 255]))),
    );
    sprites.insert(
        "sad",
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]))),
    );

    let low_face = Region::new(10, 60, 30, 30);
    let scores = FixedScores::new(happy_scores());
    let pipeline = EmotionPipeline::new(FixedDetector(vec![low_face]), scores)
        .with_config(config(&dir.path().join("out")).with_frame_width(None))
        .with_sprites(sprites.clone());
    let verdict = pipeline.render(&source)?.verdict.unwrap();
    assert_eq!(verdict.sprite, SpriteStatus::Skipped(SpriteSkip::OutOfBounds));

    let sad_scores = vec![0.0, 0.0, 0.0, 0.1, 0.9, 0.0, 0.0];
    let pipeline = EmotionPipeline::new(
        FixedDetector(vec![Region::new(10, 10, 20, 20)]),
        FixedScores::new(sad_scores),
    )
    .with_config(config(&dir.path().join("out")).with_frame_width(None))
    .with_sprites(sprites);
    let verdict = pipeline.render(&source)?.verdict.unwrap();
    assert_eq!(verdict.label, "sad");
    assert_eq!(verdict.sprite, SpriteStatus::Skipped(SpriteSkip::MissingAlpha));
    Ok(())
}

#[test]
fn no_face_still_writes_both_images() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "blank.bmp", 300, 200);
    let results = dir.path().join("results");

    let pipeline = EmotionPipeline::new(FixedDetector(vec![]), FixedScores::new(happy_scores()))
        .with_config(config(&results));
    let report = pipeline.run(&input)?;

    assert!(report.verdict.is_none());
    assert!(report.result_path.exists());
    let chart = image::open(&report.probabilities_path)?.to_rgb8();
    // JPEG keeps an all-black canvas black
    assert!(chart.pixels().all(|p| p.0.iter().all(|&c| c < 8)));
    Ok(())
}

#[test]
fn wrong_score_count_is_malformed() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "x.png", 100, 100);
    let source = SourceImage::open(&input)?;

    let pipeline = EmotionPipeline::new(
        FixedDetector(vec![Region::new(0, 0, 50, 50)]),
        FixedScores::new(vec![0.5, 0.5]),
    )
    .with_config(config(&dir.path().join("out")).with_frame_width(None));
    let err = pipeline.render(&source).unwrap_err();
    assert!(matches!(err, FaceReportError::MalformedDetection(_)));
    Ok(())
}

#[test]
fn sprites_load_from_directory() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let emojis = dir.path().join("emojis");
    std::fs::create_dir(&emojis)?;
    RgbaImage::from_pixel(6, 6, Rgba([255, 255, 0, 200])).save(emojis.join("happy.png"))?;
    let input = write_test_image(dir.path(), "y.png", 120, 120);

    let pipeline = EmotionPipeline::new(
        FixedDetector(vec![Region::new(10, 10, 40, 40)]),
        FixedScores::new(happy_scores()),
    )
    .with_config(
        config(&dir.path().join("out"))
            .with_frame_width(None)
            .with_sprite_dir(&emojis),
    );
    let verdict = pipeline.run(&input)?.verdict.unwrap();
    assert_eq!(verdict.sprite, SpriteStatus::Drawn);
    Ok(())
}

fn changed_pixels(before: &RgbImage, after: &RgbImage) -> Vec<(u32, u32)> {
    after
        .enumerate_pixels()
        .filter(|&(x, y, p)| p != before.get_pixel(x, y))
        .map(|(x, y, _)| (x, y))
        .collect()
}

#[test]
fn no_face_notice_is_drawn_on_the_frame() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "nobody.png", 200, 120);
    let source = SourceImage::open(&input)?;

    let pipeline = EmotionPipeline::new(FixedDetector(vec![]), FixedScores::new(happy_scores()))
        .with_config(config(&dir.path().join("out")).with_frame_width(None));
    let rendered = pipeline.render(&source)?;

    let inked = changed_pixels(&source.pixels, &rendered.frame);
    assert!(!inked.is_empty());
    // baseline at y = 60, starting at x = 20
    assert!(inked.iter().all(|&(x, y)| x >= 20 && (40..=62).contains(&y)));
    Ok(())
}

#[test]
fn label_is_written_above_the_box() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = write_test_image(dir.path(), "lbl.png", 200, 200);
    let source = SourceImage::open(&input)?;

    let region = Region::new(40, 60, 50, 50);
    let scores = FixedScores::new(happy_scores());
    let pipeline = EmotionPipeline::new(FixedDetector(vec![region]), scores)
        .with_config(config(&dir.path().join("out")).with_frame_width(None));
    let rendered = pipeline.render(&source)?;

    let above_box: Vec<(u32, u32)> = changed_pixels(&source.pixels, &rendered.frame)
        .into_iter()
        .filter(|&(_, y)| y < region.y)
        .collect();
    assert!(!above_box.is_empty());
    // "happy" sits on a baseline 10px above the box
    assert!(above_box.iter().all(|&(x, y)| x >= region.x && y >= 30));
    Ok(())
}
