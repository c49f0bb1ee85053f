//! Area-of-interest geometries: parsing, validation and reprojection.
use crate::error::ValidationError;
use geo::{Area, Coord, Geometry, MapCoords, MultiPolygon, Polygon};
use geojson::{GeoJson, JsonObject};
use proj4rs::proj::Proj;
use serde_json::Value;
use std::fs;
use std::path::Path;
use wkt::TryFromWkt;

pub const WGS84: u16 = 4326;

/// A coordinate reference system known by its EPSG code.
pub struct Crs {
    epsg: u16,
    proj: Proj,
    geographic: bool,
}

impl Crs {
    pub fn from_epsg(epsg: u16) -> Result<Self, ValidationError> {
        let def = crs_definitions::from_code(epsg).ok_or_else(|| {
            ValidationError::Crs(format!("EPSG:{epsg} is not a known coordinate reference system"))
        })?;
        let proj = Proj::from_proj_string(def.proj4)
            .map_err(|e| ValidationError::Crs(format!("EPSG:{epsg}: {e}")))?;
        Ok(Self {
            epsg,
            proj,
            geographic: def.proj4.contains("+proj=longlat"),
        })
    }

    /// Accepts `4326`, `EPSG:4326` or `epsg:4326`.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        let epsg = code
            .parse::<u16>()
            .map_err(|_| ValidationError::Crs(format!("invalid EPSG code '{text}'")))?;
        Self::from_epsg(epsg)
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    // proj4rs works in radians for geographic systems
    fn transform(&self, target: &Crs, coord: Coord<f64>) -> Result<Coord<f64>, ValidationError> {
        let mut point = if self.geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        proj4rs::transform::transform(&self.proj, &target.proj, &mut point).map_err(|e| {
            ValidationError::Crs(format!(
                "unable to reproject from EPSG:{} to EPSG:{}: {e}",
                self.epsg, target.epsg
            ))
        })?;
        if target.geographic {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    }
}

/// A validated, non-degenerate (multi)polygon tagged with its CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    epsg: u16,
    shape: MultiPolygon<f64>,
}

impl Footprint {
    /// Only Polygon and MultiPolygon geometries are accepted.
    pub fn new(epsg: u16, geometry: Geometry<f64>) -> Result<Self, ValidationError> {
        Self::from_polygons(epsg, polygons(geometry)?)
    }

    fn from_polygons(epsg: u16, polygons: Vec<Polygon<f64>>) -> Result<Self, ValidationError> {
        if polygons.is_empty() {
            return Err(ValidationError::Geometry("empty geometry".to_string()));
        }
        for polygon in &polygons {
            check_polygon(polygon)?;
        }
        Ok(Self {
            epsg,
            shape: MultiPolygon(polygons),
        })
    }

    pub fn from_wkt(epsg_text: &str, wkt_text: &str) -> Result<Self, ValidationError> {
        let crs = Crs::parse(epsg_text)?;
        let geometry = Geometry::<f64>::try_from_wkt_str(wkt_text)
            .map_err(|e| ValidationError::Geometry(e.to_string()))?;
        Self::new(crs.epsg(), geometry)
    }

    /// Collects every polygon of a GeoJSON document into one footprint.
    pub fn from_geojson_str(text: &str) -> Result<Self, String> {
        let layer = GeoJsonLayer::parse(text)?;
        let epsg = layer.epsg.unwrap_or(WGS84);
        Crs::from_epsg(epsg).map_err(|e| e.to_string())?;

        let mut all = vec![];
        for feature in layer.features {
            if let Some(geometry) = feature.geometry {
                all.extend(polygons(geometry).map_err(|e| e.to_string())?);
            }
        }
        Self::from_polygons(epsg, all).map_err(|e| e.to_string())
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn reproject(&self, target: &Crs) -> Result<Self, ValidationError> {
        if self.epsg == target.epsg() {
            return Ok(self.clone());
        }
        let source = Crs::from_epsg(self.epsg)?;
        let shape = self
            .shape
            .try_map_coords(|coord| source.transform(target, coord))?;
        Ok(Self {
            epsg: target.epsg(),
            shape,
        })
    }
}

/// Reads a vector file into a single footprint. GeoJSON is handled natively;
/// other formats need the `gdal` feature.
pub fn read_vector(path: &Path) -> Result<Footprint, ValidationError> {
    let vector_error = |reason: String| ValidationError::Vector {
        path: path.to_path_buf(),
        reason,
    };
    if is_geojson(path) {
        let text = fs::read_to_string(path).map_err(|e| vector_error(e.to_string()))?;
        return Footprint::from_geojson_str(&text).map_err(vector_error);
    }
    #[cfg(feature = "gdal")]
    {
        crate::gdal_support::read_vector(path)
    }
    #[cfg(not(feature = "gdal"))]
    {
        Err(vector_error(
            "unsupported vector format, only GeoJSON is readable without the `gdal` feature"
                .to_string(),
        ))
    }
}

pub(crate) fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "geojson" | "json"))
        .unwrap_or(false)
}

pub(crate) fn polygons(geometry: Geometry<f64>) -> Result<Vec<Polygon<f64>>, ValidationError> {
    match geometry {
        Geometry::Polygon(polygon) => Ok(vec![polygon]),
        Geometry::MultiPolygon(multi) => Ok(multi.0),
        other => Err(ValidationError::UnsupportedGeometry(
            geometry_name(&other).to_string(),
        )),
    }
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn check_polygon(polygon: &Polygon<f64>) -> Result<(), ValidationError> {
    let ring = &polygon.exterior().0;
    if ring.len() < 4 {
        return Err(ValidationError::Geometry(format!(
            "polygon ring needs at least 4 coordinates, got {}",
            ring.len()
        )));
    }
    if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(ValidationError::Geometry("polygon has non-finite coordinates".to_string()));
    }
    if polygon.unsigned_area() <= 0.0 {
        return Err(ValidationError::Geometry("polygon has zero area".to_string()));
    }
    Ok(())
}

pub(crate) struct LayerFeature {
    pub properties: Option<JsonObject>,
    pub geometry: Option<Geometry<f64>>,
}

/// The features of a GeoJSON document with the EPSG code of its legacy
/// `crs` member, if any.
pub(crate) struct GeoJsonLayer {
    pub epsg: Option<u16>,
    pub features: Vec<LayerFeature>,
}

impl GeoJsonLayer {
    pub fn parse(text: &str) -> Result<Self, String> {
        let geojson = text.parse::<GeoJson>().map_err(|e| e.to_string())?;
        let (epsg, raw) = match geojson {
            GeoJson::FeatureCollection(collection) => (
                legacy_crs(collection.foreign_members.as_ref()),
                collection
                    .features
                    .into_iter()
                    .map(|f| (f.properties, f.geometry))
                    .collect::<Vec<_>>(),
            ),
            GeoJson::Feature(feature) => (
                legacy_crs(feature.foreign_members.as_ref()),
                vec![(feature.properties, feature.geometry)],
            ),
            GeoJson::Geometry(geometry) => (
                legacy_crs(geometry.foreign_members.as_ref()),
                vec![(None, Some(geometry))],
            ),
        };

        let mut features = vec![];
        for (properties, geometry) in raw {
            let geometry = match geometry {
                Some(geometry) => {
                    Some(Geometry::<f64>::try_from(geometry).map_err(|e| e.to_string())?)
                }
                None => None,
            };
            features.push(LayerFeature {
                properties,
                geometry,
            });
        }
        Ok(Self { epsg, features })
    }
}

// {"crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32631"}}}
fn legacy_crs(members: Option<&JsonObject>) -> Option<u16> {
    let crs: &Value = members?.get("crs")?;
    let name = crs.pointer("/properties/name")?.as_str()?;
    match name.rsplit(':').next()? {
        "CRS84" => Some(WGS84),
        code => code.parse().ok(),
    }
}
