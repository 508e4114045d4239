use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use collabbar::{
    BarConfig, CollabError, DimensionResolver, LogoCatalog, LogoEntry, MemoryFetcher,
};

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

const SVG: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg" width="90" height="30"></svg>"#;

fn catalog(sources: &[&str]) -> LogoCatalog {
    LogoCatalog::new(
        sources
            .iter()
            .map(|s| LogoEntry::new(*s, format!("https://{s}/")))
            .collect(),
    )
    .unwrap()
}

#[test]
fn widths_follow_aspect_ratio_in_catalog_order() {
    // the first logo finishes last
    let fetcher = MemoryFetcher::new()
        .with_bytes("wide.png", png(400, 100))
        .with_bytes("square.png", png(50, 50))
        .with_bytes("vector.svg", SVG.to_vec())
        .with_delay("wide.png", Duration::from_millis(80));
    let resolver = DimensionResolver::new(Arc::new(fetcher), &BarConfig::default());

    let res = resolver.resolve(&catalog(&["wide.png", "square.png", "vector.svg"]));
    assert!(res.is_complete());
    let got: Vec<(&str, f64, f64)> = res
        .entries
        .iter()
        .map(|e| (e.source(), e.width, e.height))
        .collect();
    assert_eq!(
        got,
        [
            ("wide.png", 144.0, 36.0),
            ("square.png", 36.0, 36.0),
            ("vector.svg", 108.0, 36.0),
        ]
    );
}

#[test]
fn broken_logo_is_excluded_not_fatal() {
    let fetcher = MemoryFetcher::new()
        .with_bytes("a.png", png(10, 10))
        .with_failure("b.png", "404")
        .with_bytes("c.png", b"not an image".to_vec());
    let resolver = DimensionResolver::new(Arc::new(fetcher), &BarConfig::default());

    let res = resolver.resolve(&catalog(&["a.png", "b.png", "c.png"]));
    assert_eq!(res.entries.len(), 1);
    assert_eq!(res.entries[0].source(), "a.png");

    let failed: Vec<usize> = res.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, [1, 2]);
    assert!(
        res.failures
            .iter()
            .all(|f| matches!(f.error, CollabError::ImageLoad { .. }))
    );
}

#[test]
fn hanging_logo_times_out() {
    let fetcher = MemoryFetcher::new()
        .with_bytes("fast.png", png(20, 10))
        .with_bytes("slow.png", png(20, 10))
        .with_delay("slow.png", Duration::from_secs(5));
    let resolver = DimensionResolver::new(Arc::new(fetcher), &BarConfig::default())
        .with_timeout(Duration::from_millis(150));

    let started = Instant::now();
    let res = resolver.resolve(&catalog(&["slow.png", "fast.png"]));
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(res.entries.len(), 1);
    assert_eq!(res.entries[0].source(), "fast.png");
    assert_eq!(res.failures.len(), 1);
    assert!(matches!(res.failures[0].error, CollabError::Timeout(ref s) if s == "slow.png"));
}

#[test]
fn cancel_reports_unsettled_logos() {
    let fetcher = MemoryFetcher::new()
        .with_bytes("slow.png", png(20, 10))
        .with_delay("slow.png", Duration::from_secs(5));
    let resolver = DimensionResolver::new(Arc::new(fetcher), &BarConfig::default());

    let cancel = AtomicBool::new(false);
    cancel.store(true, Ordering::Release);
    let res = resolver.resolve_until(&catalog(&["slow.png"]), &cancel);
    assert!(res.entries.is_empty());
    assert!(matches!(res.failures[0].error, CollabError::Cancelled(_)));
}

#[test]
fn measured_sizes_are_cached_per_source() {
    let fetcher = MemoryFetcher::new()
        .with_bytes("a.png", png(30, 10))
        .with_bytes("b.png", png(10, 10));
    let resolver = DimensionResolver::new(Arc::new(fetcher), &BarConfig::default());
    let cat = catalog(&["a.png", "b.png"]);

    let first = resolver.resolve(&cat);
    assert_eq!(resolver.fetch_count(), 2);
    let second = resolver.resolve(&cat);
    assert_eq!(resolver.fetch_count(), 2);
    assert_eq!(first.entries, second.entries);
}

#[test]
fn empty_catalog_resolves_immediately() {
    let resolver = DimensionResolver::new(Arc::new(MemoryFetcher::new()), &BarConfig::default());
    let res = resolver.resolve(&LogoCatalog::new(vec![]).unwrap());
    assert!(res.entries.is_empty());
    assert!(res.is_complete());
}
