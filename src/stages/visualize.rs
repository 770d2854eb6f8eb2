//! Region plot stage

use crate::backend::{RenderRequest, RenderTarget};
use crate::core::error::StageError;
use crate::core::region::Region;
use crate::core::state::StageKind;
use crate::core::transform::{normalize_rotation, ViewTransform};
use crate::persistence::Settings;
use crate::prompt::Prompter;
use crate::stages::{
    check_file_target, ensure_parent, ConfigSource, Identification, Stage, StageContext, StageOutcome,
};
use tracing::{info, warn};

pub const KEY_ROTATE: &str = "rotate";
pub const KEY_FLIP_X: &str = "flip_x";
pub const KEY_FLIP_Y: &str = "flip_y";
pub const KEY_PLOT_PATH: &str = "plot_path";

/// Plot parameters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualizeConfig {
    pub transform: ViewTransform,
}

impl VisualizeConfig {
    pub fn from_source(source: &mut ConfigSource<'_, '_>) -> Result<Self, StageError> {
        match source {
            ConfigSource::Capture(prompter) => Self::capture(prompter),
            ConfigSource::Replay(settings) => Self::replay(settings),
        }
    }

    pub fn capture(prompter: &mut Prompter<'_>) -> Result<Self, StageError> {
        let rotation = prompter.parsed(
            "Rotate the plot by how many degrees (a multiple of 90)?",
            Some(0),
            "Please enter a multiple of 90, e.g. 90 or -90:",
            |line| {
                let degrees: i64 = line
                    .parse()
                    .map_err(|_| format!("'{}' is not an integer", line))?;
                normalize_rotation(degrees).map(i64::from)
            },
        )?;
        let flip_x = prompter.boolean(Some("Flip the plot horizontally (y/n)?"), Some(false))?;
        let flip_y = prompter.boolean(Some("Flip the plot vertically (y/n)?"), Some(false))?;

        let transform =
            ViewTransform::new(rotation, flip_x, flip_y).map_err(|reason| StageError::invalid(KEY_ROTATE, reason))?;
        Ok(Self { transform })
    }

    pub fn replay(settings: &Settings) -> Result<Self, StageError> {
        let rotation: i64 = settings.get_parsed(KEY_ROTATE)?;
        let flip_x = settings.get_bool(KEY_FLIP_X)?;
        let flip_y = settings.get_bool(KEY_FLIP_Y)?;
        let transform =
            ViewTransform::new(rotation, flip_x, flip_y).map_err(|reason| StageError::invalid(KEY_ROTATE, reason))?;
        Ok(Self { transform })
    }

    pub fn entries(&self) -> Settings {
        let mut entries = Settings::new();
        entries.set(KEY_ROTATE, self.transform.rotation());
        entries.set(KEY_FLIP_X, self.transform.flip_x());
        entries.set(KEY_FLIP_Y, self.transform.flip_y());
        entries
    }
}

/// Region that contains `point`, if any
pub fn identify(regions: &[Region], point: [f64; 2]) -> Option<usize> {
    regions.iter().find(|region| region.contains(point)).map(|region| region.id)
}

/// Visualization stage runner
pub struct Visualize;

impl Stage for Visualize {
    fn kind(&self) -> StageKind {
        StageKind::Visualize
    }

    fn run(&self, ctx: &mut StageContext<'_>, source: &mut ConfigSource<'_, '_>) -> Result<StageOutcome, StageError> {
        let config = VisualizeConfig::from_source(source)?;

        let target = match source {
            ConfigSource::Capture(prompter) => {
                if prompter.boolean(Some("Save the plot to a file (n shows it interactively)?"), Some(true))? {
                    ctx.targets.plot_path = prompter.new_file(
                        Some("Where should the plot be saved?"),
                        Some(ctx.targets.plot_path.clone()),
                        false,
                    )?;
                    RenderTarget::File(ctx.targets.plot_path.clone())
                } else {
                    RenderTarget::Interactive
                }
            }
            ConfigSource::Replay(_) => {
                check_file_target(&ctx.targets.plot_path)?;
                RenderTarget::File(ctx.targets.plot_path.clone())
            }
        };

        let dataset = ctx.dataset()?;
        let regions = ctx
            .state
            .regions
            .as_ref()
            .ok_or(StageError::MissingState("segmented regions"))?;

        for region in regions.iter().filter(|region| region.is_fragmented()) {
            warn!(
                "Region {} has {} disjoint outlines; it may be drawn incorrectly",
                region.id,
                region.rings.len()
            );
        }

        let background = ctx.backend.still_image(&dataset)?;
        let transform = config.transform;
        let outlines: Vec<Region> = regions
            .iter()
            .map(|region| Region {
                id: region.id,
                rings: region
                    .rings
                    .iter()
                    .map(|ring| transform.apply_ring(ring, background.size))
                    .collect(),
            })
            .collect();

        if let RenderTarget::File(path) = &target {
            ensure_parent(path)?;
        }

        info!("Rendering {} regions (rotation {})", outlines.len(), transform.rotation());
        let rendered = ctx.backend.render(&RenderRequest {
            background,
            transform,
            outlines: outlines.clone(),
            target: target.clone(),
        })?;

        let identified = rendered
            .clicks
            .into_iter()
            .map(|point| Identification {
                point,
                region: identify(&outlines, point),
            })
            .collect();

        let mut entries = config.entries();
        if let RenderTarget::File(path) = &target {
            entries.set(KEY_PLOT_PATH, path);
        }
        Ok(StageOutcome { entries, identified })
    }
}
