use crate::config::GridConfig;
use crate::error::ValidationError;
use crate::geometry::{self, Footprint};
use crate::grid::TileGrid;
use crate::tile::TileId;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

/// What the user asked to search over.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaOfInterest {
    Tiles(Vec<String>),
    Wkt { epsg: String, wkt: String },
    Vector(PathBuf),
}

pub struct TileResolver {
    config: GridConfig,
    grid: Option<TileGrid>,
}

impl TileResolver {
    /// The grid is only read when a geometry has to be resolved.
    pub fn new(config: GridConfig) -> Self {
        Self { config, grid: None }
    }

    pub fn with_grid(grid: TileGrid) -> Self {
        Self {
            config: GridConfig::default(),
            grid: Some(grid),
        }
    }

    pub fn resolve(&self, aoi: &AreaOfInterest) -> Result<BTreeSet<TileId>, ValidationError> {
        match aoi {
            AreaOfInterest::Tiles(tiles) => tiles.iter().map(|t| TileId::parse(t)).collect(),
            AreaOfInterest::Wkt { epsg, wkt } => {
                let footprint = Footprint::from_wkt(epsg, wkt)?;
                self.resolve_footprint(&footprint)
            }
            AreaOfInterest::Vector(path) => {
                let footprint = geometry::read_vector(path)?;
                info!(
                    "Read {} polygon(s) in EPSG:{} from {}",
                    footprint.shape().0.len(),
                    footprint.epsg(),
                    path.display()
                );
                self.resolve_footprint(&footprint)
            }
        }
    }

    pub fn resolve_footprint(
        &self,
        footprint: &Footprint,
    ) -> Result<BTreeSet<TileId>, ValidationError> {
        let grid = match &self.grid {
            Some(grid) => Cow::Borrowed(grid),
            None => Cow::Owned(TileGrid::load(&self.config)?),
        };
        grid.intersecting(footprint)?
            .iter()
            .map(|name| TileId::parse(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::sample_grid;
    use std::fs;

    fn tiles(names: &[&str]) -> BTreeSet<TileId> {
        names.iter().map(|n| TileId::parse(n).unwrap()).collect()
    }

    #[test]
    fn test_tiles_are_normalised_and_deduplicated() {
        let resolver = TileResolver::with_grid(sample_grid());
        let aoi = AreaOfInterest::Tiles(vec![
            "T31TCH".to_string(),
            "31tch".to_string(),
            "28WET".to_string(),
        ]);
        assert_eq!(resolver.resolve(&aoi).unwrap(), tiles(&["31TCH", "28WET"]));
    }

    #[test]
    fn test_singleton_tile_round_trips() {
        let resolver = TileResolver::with_grid(sample_grid());
        let aoi = AreaOfInterest::Tiles(vec!["31TCH".to_string()]);
        let resolved = resolver.resolve(&aoi).unwrap();
        assert_eq!(resolved, tiles(&["31TCH"]));

        let again = AreaOfInterest::Tiles(resolved.iter().map(|t| t.to_string()).collect());
        assert_eq!(resolver.resolve(&again).unwrap(), resolved);
    }

    #[test]
    fn test_bad_tile_names_the_token() {
        let resolver = TileResolver::with_grid(sample_grid());
        let aoi = AreaOfInterest::Tiles(vec!["31TCH".to_string(), "31-TCH".to_string()]);
        let err = resolver.resolve(&aoi).unwrap_err();
        assert!(matches!(err, ValidationError::TileFormat(token) if token == "31-TCH"));
    }

    #[test]
    fn test_wkt_inside_one_cell() {
        let resolver = TileResolver::with_grid(sample_grid());
        let aoi = AreaOfInterest::Wkt {
            epsg: "4326".to_string(),
            wkt: "POLYGON ((1.2 1.2, 1.8 1.2, 1.8 1.8, 1.2 1.8, 1.2 1.2))".to_string(),
        };
        assert_eq!(resolver.resolve(&aoi).unwrap(), tiles(&["31TDJ"]));
    }

    #[test]
    fn test_wkt_outside_grid_resolves_empty() {
        let resolver = TileResolver::with_grid(sample_grid());
        let aoi = AreaOfInterest::Wkt {
            epsg: "4326".to_string(),
            wkt: "POLYGON ((50 50, 51 50, 51 51, 50 51, 50 50))".to_string(),
        };
        assert!(resolver.resolve(&aoi).unwrap().is_empty());
    }

    #[test]
    fn test_wkt_bad_crs() {
        let resolver = TileResolver::with_grid(sample_grid());
        let aoi = AreaOfInterest::Wkt {
            epsg: "not-a-code".to_string(),
            wkt: "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))".to_string(),
        };
        assert!(matches!(resolver.resolve(&aoi), Err(ValidationError::Crs(_))));
    }

    #[test]
    fn test_vector_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aoi.geojson");
        fs::write(
            &path,
            r#"{"type": "Feature", "properties": {},
                "geometry": {"type": "Polygon",
                             "coordinates": [[[0.1,1.1],[0.9,1.1],[0.9,1.9],[0.1,1.9],[0.1,1.1]]]}}"#,
        )
        .unwrap();
        let resolver = TileResolver::with_grid(sample_grid());
        let resolved = resolver.resolve(&AreaOfInterest::Vector(path)).unwrap();
        assert_eq!(resolved, tiles(&["31TCJ"]));
    }

    #[test]
    fn test_grid_loaded_lazily_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = GridConfig {
            path: dir.path().join("missing.geojson"),
            ..GridConfig::default()
        };
        let resolver = TileResolver::new(config);

        // explicit tiles never touch the grid
        let aoi = AreaOfInterest::Tiles(vec!["T31TCH".to_string()]);
        assert!(resolver.resolve(&aoi).is_ok());

        let aoi = AreaOfInterest::Wkt {
            epsg: "4326".to_string(),
            wkt: "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))".to_string(),
        };
        assert!(matches!(resolver.resolve(&aoi), Err(ValidationError::Grid { .. })));
    }
}
