//! Region segmentation stage

use crate::backend::SegmentRequest;
use crate::core::error::StageError;
use crate::core::region::Region;
use crate::core::state::StageKind;
use crate::export::rois;
use crate::persistence::{parse_count, Settings};
use crate::prompt::Prompter;
use crate::stages::{ConfigSource, Stage, StageContext, StageOutcome};
use tracing::{info, warn};

pub const KEY_COMPONENTS: &str = "components";
pub const KEY_MU: &str = "mu";
pub const KEY_OVERLAP: &str = "overlap_per";
pub const KEY_ROI_COUNT: &str = "roi_count";

/// Segmentation parameters for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentConfig {
    pub components: usize,

    /// Spatial/temporal trade-off in [0, 1]
    pub mu: f64,

    /// Minimum overlap in [0, 1]; 0 disables merging overlapping regions
    pub overlap_per: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            components: 20,
            mu: 0.5,
            overlap_per: 0.2,
        }
    }
}

impl SegmentConfig {
    pub fn from_source(source: &mut ConfigSource<'_, '_>) -> Result<Self, StageError> {
        match source {
            ConfigSource::Capture(prompter) => Self::capture(prompter),
            ConfigSource::Replay(settings) => Self::replay(settings),
        }
    }

    pub fn capture(prompter: &mut Prompter<'_>) -> Result<Self, StageError> {
        let defaults = Self::default();
        let components = prompter.natural(
            Some("How many components should segmentation look for?"),
            Some(defaults.components),
        )?;
        let mu = prompter.float_in(
            Some("Spatial/temporal trade-off mu (0 = temporal only, 1 = spatial only):"),
            Some(defaults.mu),
            0.0,
            1.0,
        )?;
        let overlap_per = prompter.percent(
            Some("Minimum overlap percentage for merging regions (0 disables merging):"),
            Some(defaults.overlap_per),
        )?;
        Ok(Self {
            components,
            mu,
            overlap_per,
        })
    }

    pub fn replay(settings: &Settings) -> Result<Self, StageError> {
        let config = Self {
            components: settings.get_with(KEY_COMPONENTS, parse_count)?,
            mu: settings.get_parsed(KEY_MU)?,
            overlap_per: settings.get_parsed(KEY_OVERLAP)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StageError> {
        if !(0.0..=1.0).contains(&self.mu) {
            return Err(StageError::invalid(KEY_MU, format!("{} is outside [0, 1]", self.mu)));
        }
        if !(0.0..=1.0).contains(&self.overlap_per) {
            return Err(StageError::invalid(
                KEY_OVERLAP,
                format!("{} is outside [0, 1]", self.overlap_per),
            ));
        }
        Ok(())
    }

    pub fn entries(&self) -> Settings {
        let mut entries = Settings::new();
        entries.set(KEY_COMPONENTS, self.components);
        entries.set(KEY_MU, self.mu);
        entries.set(KEY_OVERLAP, self.overlap_per);
        entries
    }

    fn request(&self) -> SegmentRequest {
        SegmentRequest {
            components: self.components,
            mu: self.mu,
            overlap_per: self.overlap_per,
        }
    }
}

/// Segmentation stage runner
pub struct Segment;

impl Stage for Segment {
    fn kind(&self) -> StageKind {
        StageKind::Segment
    }

    fn run(&self, ctx: &mut StageContext<'_>, source: &mut ConfigSource<'_, '_>) -> Result<StageOutcome, StageError> {
        let config = SegmentConfig::from_source(source)?;
        let dataset = ctx.dataset()?;

        info!(
            "Segmenting with {} components, mu {}, overlap {}",
            config.components, config.mu, config.overlap_per
        );
        let rings = ctx.backend.segment(&dataset, &config.request())?;
        let regions = Region::number(rings);
        if regions.is_empty() {
            warn!("Segmentation found no regions");
        }

        std::fs::create_dir_all(&ctx.targets.dataset_dir)?;
        rois::write_region_tables(&ctx.targets.dataset_dir, &regions, ctx.options.neighbor_max_distance)?;

        let mut entries = config.entries();
        entries.set(KEY_ROI_COUNT, regions.len());
        ctx.state.regions = Some(regions);
        Ok(entries.into())
    }
}
