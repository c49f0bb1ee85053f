use crate::config::GridConfig;
use crate::error::ValidationError;
use crate::geometry::{self, Crs, Footprint, GeoJsonLayer};
use geo::{Intersects, MultiPolygon};
use serde_json::Value;
use std::fs;
use tracing::debug;

/// A named cell of the reference tile grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub name: String,
    pub shape: MultiPolygon<f64>,
}

/// The reference tile grid (Sentinel-2 MGRS tiles).
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    epsg: u16,
    cells: Vec<GridCell>,
}

impl TileGrid {
    pub fn new(epsg: u16, cells: Vec<GridCell>) -> Self {
        Self { epsg, cells }
    }

    /// Opens the grid named by the configuration. GeoJSON is read natively;
    /// other formats need the `gdal` feature.
    pub fn load(config: &GridConfig) -> Result<Self, ValidationError> {
        let path = config.path.as_path();
        let grid_error = |reason: String| ValidationError::Grid {
            path: path.to_path_buf(),
            reason,
        };
        if geometry::is_geojson(path) {
            let text = fs::read_to_string(path).map_err(|e| grid_error(e.to_string()))?;
            return Self::from_geojson_str(&text, config).map_err(grid_error);
        }
        #[cfg(feature = "gdal")]
        {
            crate::gdal_support::read_grid(path, config)
        }
        #[cfg(not(feature = "gdal"))]
        {
            Err(grid_error(
                "unsupported grid format, only GeoJSON is readable without the `gdal` feature"
                    .to_string(),
            ))
        }
    }

    pub fn from_geojson_str(text: &str, config: &GridConfig) -> Result<Self, String> {
        let layer = GeoJsonLayer::parse(text)?;
        let mut cells = vec![];
        for feature in layer.features {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(&config.name_field))
                .and_then(cell_name)
                .ok_or_else(|| format!("grid cell without a '{}' field", config.name_field))?;
            let polygons = geometry::polygons(geometry).map_err(|e| e.to_string())?;
            cells.push(GridCell {
                name,
                shape: MultiPolygon(polygons),
            });
        }
        Ok(Self::new(layer.epsg.unwrap_or(config.epsg), cells))
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Names of the cells intersecting `footprint`, after reprojecting it
    /// into the grid CRS.
    pub fn intersecting(&self, footprint: &Footprint) -> Result<Vec<String>, ValidationError> {
        let crs = Crs::from_epsg(self.epsg)?;
        let footprint = footprint.reproject(&crs)?;
        let shape = footprint.shape();

        let names = self
            .cells
            .iter()
            .filter(|cell| {
                shape
                    .0
                    .iter()
                    .any(|polygon| cell.shape.0.iter().any(|c| polygon.intersects(c)))
            })
            .map(|cell| cell.name.clone())
            .collect::<Vec<_>>();
        debug!("{} of {} grid cells intersect", names.len(), self.cells.len());
        Ok(names)
    }
}

fn cell_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
