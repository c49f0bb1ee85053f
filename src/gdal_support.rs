//! Shapefile, GeoPackage and KML support through GDAL/OGR. Geometries cross
//! over as WKT so the rest of the crate only deals in `geo` types.
use crate::config::GridConfig;
use crate::error::ValidationError;
use crate::geometry::{self, Footprint};
use crate::grid::{GridCell, TileGrid};
use gdal::vector::LayerAccess;
use gdal::Dataset;
use geo::{Geometry, MultiPolygon};
use std::path::Path;
use wkt::TryFromWkt;

struct OgrFeature {
    name: Option<String>,
    geometry: Geometry<f64>,
}

fn read_layer(path: &Path, name_field: Option<&str>) -> Result<(u16, Vec<OgrFeature>), String> {
    let dataset = Dataset::open(path).map_err(|e| e.to_string())?;
    let mut layer = dataset.layer(0).map_err(|e| e.to_string())?;

    let epsg = layer
        .spatial_ref()
        .ok_or_else(|| "layer has no projection system".to_string())?
        .auth_code()
        .map_err(|e| e.to_string())?;
    let epsg = u16::try_from(epsg).map_err(|_| format!("unsupported EPSG code {epsg}"))?;

    let mut features = vec![];
    for feature in layer.features() {
        let Some(ogr_geometry) = feature.geometry() else {
            continue;
        };
        let wkt = ogr_geometry.wkt().map_err(|e| e.to_string())?;
        let geometry = Geometry::<f64>::try_from_wkt_str(&wkt).map_err(|e| e.to_string())?;
        let name = match name_field {
            Some(field) => feature
                .field_as_string_by_name(field)
                .map_err(|e| e.to_string())?,
            None => None,
        };
        features.push(OgrFeature { name, geometry });
    }
    Ok((epsg, features))
}

/// Reads every polygon of the first layer into one footprint.
pub fn read_vector(path: &Path) -> Result<Footprint, ValidationError> {
    let vector_error = |reason: String| ValidationError::Vector {
        path: path.to_path_buf(),
        reason,
    };
    let (epsg, features) = read_layer(path, None).map_err(vector_error)?;

    let mut polygons = vec![];
    for feature in features {
        polygons.extend(geometry::polygons(feature.geometry)?);
    }
    Footprint::new(epsg, Geometry::MultiPolygon(MultiPolygon(polygons)))
}

pub fn read_grid(path: &Path, config: &GridConfig) -> Result<TileGrid, ValidationError> {
    let grid_error = |reason: String| ValidationError::Grid {
        path: path.to_path_buf(),
        reason,
    };
    let (epsg, features) = read_layer(path, Some(&config.name_field)).map_err(grid_error)?;

    let mut cells = vec![];
    for feature in features {
        let name = feature.name.ok_or_else(|| {
            grid_error(format!("grid cell without a '{}' field", config.name_field))
        })?;
        let polygons =
            geometry::polygons(feature.geometry).map_err(|e| grid_error(e.to_string()))?;
        cells.push(GridCell {
            name,
            shape: MultiPolygon(polygons),
        });
    }
    Ok(TileGrid::new(epsg, cells))
}
