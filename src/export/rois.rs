//! Region summary tables written next to a segmented dataset

use crate::core::error::ExportError;
use crate::core::region::Region;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

pub const CENTROIDS_FILE: &str = "centroids.csv";
pub const NEIGHBORS_FILE: &str = "neighbors.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentroidRow {
    #[serde(rename = "RoiID")]
    pub roi_id: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRow {
    pub roi: usize,
    pub neighbor: usize,
    pub distance: f64,
}

/// Centroid of each region's first ring
///
/// Regions with more than one ring are reported but still included.
pub fn centroids(regions: &[Region]) -> Vec<CentroidRow> {
    regions
        .iter()
        .filter_map(|region| {
            if region.is_fragmented() {
                warn!("Region {} has {} coordinate rings, using the first", region.id, region.rings.len());
            }
            match region.centroid() {
                Some([x, y]) => Some(CentroidRow { roi_id: region.id, x, y }),
                None => {
                    warn!("Region {} has no outline, skipping its centroid", region.id);
                    None
                }
            }
        })
        .collect()
}

/// Every unordered pair of regions whose outlines are within `max_distance`
pub fn neighbors(regions: &[Region], max_distance: f64) -> Vec<NeighborRow> {
    let mut rows = Vec::new();
    for (index, region) in regions.iter().enumerate() {
        for other in &regions[index + 1..] {
            if let Some(distance) = region.distance_to(other) {
                if distance <= max_distance {
                    rows.push(NeighborRow {
                        roi: region.id,
                        neighbor: other.id,
                        distance,
                    });
                }
            }
        }
    }
    rows
}

/// Write `rows` as a comma-separated table with a header
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `centroids.csv` and `neighbors.csv` into `dir`
pub fn write_region_tables(dir: &Path, regions: &[Region], max_distance: f64) -> Result<(), ExportError> {
    write_table(&dir.join(CENTROIDS_FILE), &centroids(regions))?;
    write_table(&dir.join(NEIGHBORS_FILE), &neighbors(regions, max_distance))
}
