use std::sync::Arc;

use crate::{
    config::BarConfig,
    foundation::{
        core::{check_non_negative, check_positive},
        error::{CollabError, CollabResult},
    },
    resolve::ResolvedLogoEntry,
};

/// Decides how many copies of the logo run fill the strip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileFiller {
    gap: f64,
    fill_factor: f64,
    overfill: u32,
}

impl TileFiller {
    pub fn new(gap: f64, fill_factor: f64, overfill: u32) -> CollabResult<Self> {
        check_non_negative("gap", gap)?;
        check_positive("fill_factor", fill_factor)?;
        if overfill == 0 {
            return Err(CollabError::validation("overfill must be >= 1"));
        }
        Ok(Self {
            gap,
            fill_factor,
            overfill,
        })
    }

    pub fn from_config(config: &BarConfig) -> CollabResult<Self> {
        Self::new(config.gap, config.fill_factor, config.overfill)
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// Width of one pass over `logos`, counting one gap per logo.
    pub fn unit_width(&self, logos: &[ResolvedLogoEntry]) -> f64 {
        logos.iter().map(|l| l.width).sum::<f64>() + logos.len() as f64 * self.gap
    }

    /// Number of copies needed for `viewport_width`.
    ///
    /// `ceil(viewport_width * fill_factor / unit_width) * overfill`, never below one base copy.
    /// Zero when `logos` is empty.
    pub fn repeats(&self, viewport_width: f64, logos: &[ResolvedLogoEntry]) -> CollabResult<u32> {
        check_non_negative("viewport width", viewport_width)?;
        if logos.is_empty() {
            return Ok(0);
        }
        let unit = self.unit_width(logos);
        check_positive("logo run width", unit)?;

        let base = (viewport_width * self.fill_factor / unit).ceil().max(1.0);
        if base > f64::from(u32::MAX / self.overfill) {
            return Err(CollabError::validation(format!(
                "viewport width {viewport_width} needs too many logo copies"
            )));
        }
        Ok(base as u32 * self.overfill)
    }

    #[tracing::instrument(skip(self, logos), fields(logos = logos.len()))]
    pub fn fill(
        &self,
        viewport_width: f64,
        logos: Arc<[ResolvedLogoEntry]>,
    ) -> CollabResult<TiledSequence> {
        let repeats = self.repeats(viewport_width, &logos)?;
        let unit_width = self.unit_width(&logos);
        tracing::debug!(repeats, unit_width, "tiled logo run");
        Ok(TiledSequence {
            unit: logos,
            repeats,
            unit_width,
            gap: self.gap,
        })
    }
}

/// The resolved logos concatenated `repeats` times.
///
/// The copies share one backing list; iteration yields them in order.
#[derive(Clone, Debug, PartialEq)]
pub struct TiledSequence {
    unit: Arc<[ResolvedLogoEntry]>,
    repeats: u32,
    unit_width: f64,
    gap: f64,
}

impl TiledSequence {
    pub fn empty() -> Self {
        Self {
            unit: Arc::from(Vec::new()),
            repeats: 0,
            unit_width: 0.0,
            gap: 0.0,
        }
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    pub fn unit(&self) -> &[ResolvedLogoEntry] {
        &self.unit
    }

    pub fn unit_width(&self) -> f64 {
        self.unit_width
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    pub fn len(&self) -> usize {
        self.unit.len() * self.repeats as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all widths plus one gap per entry.
    pub fn total_width(&self) -> f64 {
        self.unit_width * f64::from(self.repeats)
    }

    pub fn get(&self, i: usize) -> Option<&ResolvedLogoEntry> {
        if i >= self.len() {
            return None;
        }
        self.unit.get(i % self.unit.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedLogoEntry> + '_ {
        (0..self.repeats as usize).flat_map(move |_| self.unit.iter())
    }

    /// Left edge of every entry in strip coordinates, in sequence order.
    pub fn positions(&self) -> impl Iterator<Item = (f64, &ResolvedLogoEntry)> + '_ {
        let gap = self.gap;
        self.iter().scan(0.0f64, move |x, e| {
            let at = *x;
            *x += e.width + gap;
            Some((at, e))
        })
    }

    pub fn to_vec(&self) -> Vec<ResolvedLogoEntry> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assets::NaturalSize, catalog::LogoEntry};

    fn logos(widths: &[f64]) -> Arc<[ResolvedLogoEntry]> {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                ResolvedLogoEntry::from_natural(
                    LogoEntry::new(format!("{i}.png"), format!("https://{i}/")),
                    NaturalSize {
                        width: *w,
                        height: 36.0,
                    },
                    36.0,
                )
                .unwrap()
            })
            .collect()
    }

    fn filler() -> TileFiller {
        TileFiller::from_config(&BarConfig::default()).unwrap()
    }

    #[test]
    fn seven_logos_at_1200() {
        let seq = filler().fill(1200.0, logos(&[100.0; 7])).unwrap();
        assert_eq!(seq.unit_width(), 1148.0);
        assert_eq!(seq.repeats(), 20);
        assert_eq!(seq.len(), 140);
        assert_eq!(seq.iter().count(), 140);
    }

    #[test]
    fn empty_set_tiles_to_nothing() {
        for w in [0.0, 1.0, 1200.0, 1e6] {
            let seq = filler().fill(w, logos(&[])).unwrap();
            assert!(seq.is_empty());
            assert_eq!(seq.iter().count(), 0);
        }
        assert!(TiledSequence::empty().is_empty());
    }

    #[test]
    fn order_is_preserved_within_each_copy() {
        let seq = filler().fill(100.0, logos(&[10.0, 20.0, 30.0])).unwrap();
        let sources: Vec<_> = seq.iter().take(6).map(|e| e.source().to_owned()).collect();
        assert_eq!(sources, ["0.png", "1.png", "2.png", "0.png", "1.png", "2.png"]);
        assert_eq!(seq.get(4).unwrap().source(), "1.png");
        assert!(seq.get(seq.len()).is_none());
    }

    #[test]
    fn positions_accumulate_width_and_gap() {
        let seq = filler().fill(10.0, logos(&[10.0, 20.0])).unwrap();
        let xs: Vec<f64> = seq.positions().take(4).map(|(x, _)| x).collect();
        assert_eq!(xs, [0.0, 74.0, 158.0, 232.0]);
    }

    #[test]
    fn covers_one_and_a_half_viewports() {
        let f = filler();
        let set = logos(&[37.5, 211.0, 90.25]);
        for w in [1.0, 320.0, 799.0, 1200.0, 1920.0, 3840.0, 10_000.0] {
            let seq = f.fill(w, set.clone()).unwrap();
            assert!(seq.total_width() >= 1.5 * w, "w={w}");
        }
    }

    #[test]
    fn zero_width_keeps_one_base_copy() {
        assert_eq!(filler().repeats(0.0, &logos(&[100.0])).unwrap(), 10);
    }

    #[test]
    fn repeats_are_deterministic_and_shrink_with_viewport() {
        let f = filler();
        let set = logos(&[100.0; 7]);
        assert_eq!(
            f.repeats(1200.0, &set).unwrap(),
            f.repeats(1200.0, &set).unwrap()
        );
        assert!(f.repeats(800.0, &set).unwrap() <= f.repeats(1200.0, &set).unwrap());
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let f = filler();
        assert!(f.repeats(-1.0, &logos(&[1.0])).is_err());
        assert!(f.repeats(f64::NAN, &logos(&[1.0])).is_err());
        assert!(TileFiller::new(64.0, 1.5, 0).is_err());
        assert!(TileFiller::new(-1.0, 1.5, 10).is_err());
    }
}
