use std::{sync::Arc, time::Duration};

use crate::{
    catalog::LogoCatalog,
    config::BarConfig,
    foundation::{
        core::{Point, Rect, check_non_negative},
        error::CollabResult,
    },
    resolve::{ResolvedLogoEntry, Resolution},
    scroll::ScrollController,
    tile::{TileFiller, TiledSequence},
    viewport::{ViewportBus, ViewportSubscription},
};

/// Inputs the host delivers to the strip.
#[derive(Debug)]
pub enum BarEvent {
    Resized(f64),
    PointerEnter,
    PointerLeave,
    LogosResolved(Resolution),
}

/// One logo as it sits in the strip at a given instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedLogo<'a> {
    /// Position in the tiled sequence.
    pub index: usize,
    /// Bounds in strip coordinates, translation applied.
    pub rect: Rect,
    pub logo: &'a ResolvedLogoEntry,
}

/// Everything a renderer needs for one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameLayout<'a> {
    pub width: f64,
    pub height: f64,
    pub offset: f64,
    pub paused: bool,
    /// Logos intersecting `[0, width]`, left to right.
    pub logos: Vec<PlacedLogo<'a>>,
}

/// The partner-logo strip.
///
/// Owns the catalog, the resolved logo set, the tiled sequence and the scroll state. Nothing is
/// tiled until a resolution arrives; resizes before that only record the width.
#[derive(Debug)]
pub struct CollabBar {
    catalog: LogoCatalog,
    config: BarConfig,
    tiler: TileFiller,
    viewport_width: f64,
    resolved: Option<Arc<[ResolvedLogoEntry]>>,
    failed: usize,
    tiled: TiledSequence,
    scroll: ScrollController,
    viewport: Option<ViewportSubscription>,
}

impl CollabBar {
    pub fn new(catalog: LogoCatalog, config: BarConfig, viewport_width: f64) -> CollabResult<Self> {
        config.validate()?;
        check_non_negative("viewport width", viewport_width)?;
        Ok(Self {
            tiler: TileFiller::from_config(&config)?,
            scroll: ScrollController::from_config(&config)?,
            catalog,
            config,
            viewport_width,
            resolved: None,
            failed: 0,
            tiled: TiledSequence::empty(),
            viewport: None,
        })
    }

    /// Construct with the bus's current width and stay subscribed to it until drop.
    pub fn mount(catalog: LogoCatalog, config: BarConfig, bus: &ViewportBus) -> CollabResult<Self> {
        let sub = bus.subscribe();
        let mut bar = Self::new(catalog, config, sub.width())?;
        bar.viewport = Some(sub);
        Ok(bar)
    }

    pub fn attach_viewport(&mut self, sub: ViewportSubscription, now: Duration) -> CollabResult<()> {
        let width = sub.width();
        self.viewport = Some(sub);
        self.handle(BarEvent::Resized(width), now)
    }

    /// Drop the viewport subscription.
    pub fn detach_viewport(&mut self) {
        self.viewport = None;
    }

    /// Apply the newest width from the attached viewport, if it changed.
    pub fn poll_viewport(&mut self, now: Duration) -> CollabResult<bool> {
        let Some(width) = self.viewport.as_mut().and_then(|s| s.latest()) else {
            return Ok(false);
        };
        self.handle(BarEvent::Resized(width), now)?;
        Ok(true)
    }

    pub fn handle(&mut self, event: BarEvent, now: Duration) -> CollabResult<()> {
        match event {
            BarEvent::Resized(width) => {
                check_non_negative("viewport width", width)?;
                if let Some(resolved) = &self.resolved {
                    let tiled = self.tiler.fill(width, Arc::clone(resolved))?;
                    self.commit_tiling(tiled, now)?;
                }
                self.viewport_width = width;
            }
            BarEvent::LogosResolved(resolution) => {
                let tiled = self
                    .tiler
                    .fill(self.viewport_width, Arc::clone(&resolution.entries))?;
                self.commit_tiling(tiled, now)?;
                self.failed = resolution.failures.len();
                self.resolved = Some(resolution.entries);
            }
            BarEvent::PointerEnter => {
                self.scroll.pointer_enter(now);
            }
            BarEvent::PointerLeave => {
                self.scroll.pointer_leave(now);
            }
        }
        Ok(())
    }

    /// Install a freshly built tiling. Bar state is untouched when this fails.
    fn commit_tiling(&mut self, tiled: TiledSequence, now: Duration) -> CollabResult<()> {
        self.scroll.set_loop_distance(tiled.unit_width(), now)?;
        self.tiled = tiled;
        Ok(())
    }

    pub fn layout(&self, now: Duration) -> FrameLayout<'_> {
        let offset = self.scroll.offset_at(now);
        let width = self.viewport_width;
        let height = self.config.strip_height;

        let mut logos = Vec::new();
        for (index, (x, logo)) in self.tiled.positions().enumerate() {
            let left = x + offset;
            if left >= width {
                break;
            }
            if left + logo.width <= 0.0 {
                continue;
            }
            let top = (height - logo.height) / 2.0;
            logos.push(PlacedLogo {
                index,
                rect: Rect::new(left, top, left + logo.width, top + logo.height),
                logo,
            });
        }

        FrameLayout {
            width,
            height,
            offset,
            paused: self.scroll.is_paused(),
            logos,
        }
    }

    /// Link target under `(x, y)` in strip coordinates.
    pub fn hit_test(&self, x: f64, y: f64, now: Duration) -> Option<&str> {
        let p = Point::new(x, y);
        self.layout(now)
            .logos
            .into_iter()
            .find(|l| l.rect.contains(p))
            .map(|l| l.logo.href())
    }

    pub fn is_ready(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn catalog(&self) -> &LogoCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &BarConfig {
        &self.config
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn resolved(&self) -> &[ResolvedLogoEntry] {
        self.resolved.as_deref().unwrap_or(&[])
    }

    /// Number of catalog logos left out of the last resolution.
    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn tiled(&self) -> &TiledSequence {
        &self.tiled
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assets::NaturalSize, catalog::LogoEntry};

    fn resolution(widths: &[f64]) -> Resolution {
        Resolution {
            entries: widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    ResolvedLogoEntry::from_natural(
                        LogoEntry::new(format!("{i}.png"), format!("https://{i}.example/")),
                        NaturalSize {
                            width: *w,
                            height: 36.0,
                        },
                        36.0,
                    )
                    .unwrap()
                })
                .collect(),
            failures: vec![],
        }
    }

    fn bar(width: f64) -> CollabBar {
        let cfg = BarConfig {
            speed: 100.0,
            ..BarConfig::default()
        };
        CollabBar::new(LogoCatalog::partners(), cfg, width).unwrap()
    }

    #[test]
    fn nothing_renders_before_resolution() {
        let mut b = bar(1200.0);
        b.handle(BarEvent::Resized(800.0), Duration::ZERO).unwrap();
        assert!(!b.is_ready());
        assert!(b.tiled().is_empty());
        assert!(b.layout(Duration::from_secs(3)).logos.is_empty());
        assert_eq!(b.viewport_width(), 800.0);
    }

    #[test]
    fn resize_before_resolution_is_applied_on_resolution() {
        let mut b = bar(1200.0);
        b.handle(BarEvent::Resized(2400.0), Duration::ZERO).unwrap();
        b.handle(BarEvent::LogosResolved(resolution(&[100.0; 7])), Duration::ZERO)
            .unwrap();
        // ceil(3600 / 1148) * 10
        assert_eq!(b.tiled().repeats(), 40);
    }

    #[test]
    fn resize_retiles() {
        let mut b = bar(1200.0);
        b.handle(BarEvent::LogosResolved(resolution(&[100.0; 7])), Duration::ZERO)
            .unwrap();
        assert_eq!(b.tiled().len(), 140);
        b.handle(BarEvent::Resized(800.0), Duration::ZERO).unwrap();
        assert_eq!(b.tiled().repeats(), 20);
        b.handle(BarEvent::Resized(5000.0), Duration::ZERO).unwrap();
        assert_eq!(b.tiled().repeats(), 70);
    }

    #[test]
    fn layout_covers_the_viewport_at_every_instant() {
        let mut b = bar(1000.0);
        b.handle(BarEvent::LogosResolved(resolution(&[50.0, 120.0, 80.0])), Duration::ZERO)
            .unwrap();
        for ms in (0..60_000).step_by(1_337) {
            let l = b.layout(Duration::from_millis(ms));
            let first = l.logos.first().unwrap();
            let last = l.logos.last().unwrap();
            assert!(first.rect.x0 <= b.tiled().gap());
            assert!(last.rect.x1 + b.tiled().gap() >= l.width, "ms={ms}");
            assert!(l.logos.iter().all(|p| p.rect.y0 == 26.0 && p.rect.height() == 36.0));
        }
    }

    #[test]
    fn pause_pins_layout_and_keeps_entries() {
        let mut b = bar(1200.0);
        b.handle(BarEvent::LogosResolved(resolution(&[100.0; 7])), Duration::ZERO)
            .unwrap();
        let t = Duration::from_millis(2_500);
        let before_offset = b.layout(t).offset;
        let before_len = b.tiled().len();

        b.handle(BarEvent::PointerEnter, t).unwrap();
        let paused = b.layout(Duration::from_secs(60));
        assert!(paused.paused);
        assert_eq!(paused.offset, before_offset);

        b.handle(BarEvent::PointerLeave, Duration::from_secs(60)).unwrap();
        assert_eq!(b.tiled().len(), before_len);
        assert_eq!(b.layout(Duration::from_secs(60)).offset, before_offset);
    }

    #[test]
    fn hit_test_finds_the_link_under_the_pointer() {
        let mut b = bar(1200.0);
        b.handle(BarEvent::LogosResolved(resolution(&[100.0, 100.0])), Duration::ZERO)
            .unwrap();
        let now = Duration::ZERO;
        assert_eq!(b.hit_test(50.0, 44.0, now), Some("https://0.example/"));
        assert_eq!(b.hit_test(200.0, 44.0, now), Some("https://1.example/"));
        // gap between logos
        assert_eq!(b.hit_test(130.0, 44.0, now), None);
        assert_eq!(b.hit_test(50.0, 5.0, now), None);
    }

    #[test]
    fn viewport_subscription_drives_retiling() {
        let bus = ViewportBus::new(1200.0).unwrap();
        let mut b = CollabBar::mount(LogoCatalog::partners(), BarConfig::default(), &bus).unwrap();
        b.handle(BarEvent::LogosResolved(resolution(&[100.0; 7])), Duration::ZERO)
            .unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        bus.set_width(800.0).unwrap();
        assert!(b.poll_viewport(Duration::ZERO).unwrap());
        assert_eq!(b.viewport_width(), 800.0);
        assert!(!b.poll_viewport(Duration::ZERO).unwrap());

        b.detach_viewport();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn invalid_resize_is_rejected_and_ignored() {
        let mut b = bar(1200.0);
        assert!(b.handle(BarEvent::Resized(-5.0), Duration::ZERO).is_err());
        assert_eq!(b.viewport_width(), 1200.0);
    }

    #[test]
    fn untileable_resize_keeps_previous_width_and_tiling() {
        let mut b = bar(1200.0);
        b.handle(BarEvent::LogosResolved(resolution(&[100.0])), Duration::ZERO)
            .unwrap();
        // ceil(1800 / 164) * 10
        assert_eq!(b.tiled().repeats(), 110);

        assert!(b.handle(BarEvent::Resized(1e12), Duration::ZERO).is_err());
        assert_eq!(b.viewport_width(), 1200.0);
        assert_eq!(b.tiled().repeats(), 110);
        assert!(b.tiled().total_width() >= 1.5 * b.viewport_width());
    }
}
