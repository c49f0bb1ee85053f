use crate::error::ValidationError;
use crate::query::QueryRequest;
use crate::resolver::AreaOfInterest;
use crate::window::{self, SearchWindow};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  hrwsi-s3 out --query --product-type FSC WIC_S2 --tiles T31TCH T30TYN --date-start 2025-02-01 --date-end 2025-02-15
  hrwsi-s3 out --query-and-download --product-type GFSC --wkt \"POLYGON ((704922 4756709, 920001 4729607, 920001 4900000, 704922 4756709))\" --epsg 32630 --date-start 2025-02-01 --date-end 2025-02-15
  hrwsi-s3 out --query-and-download --product-type SWS --vector path/to/aoi.geojson --date-start 2025-02-15 --date-end 2025-03-15
  hrwsi-s3 out --download --query-file out/query_file.txt";

/// Query and download capabilities for the Copernicus HR-WSI products.
#[derive(Parser, Debug)]
#[command(version, after_help = EXAMPLES)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["query", "query_and_download", "download"])
))]
#[command(group(ArgGroup::new("selection").args(["tiles", "wkt", "vector"])))]
pub struct Cli {
    /// Output directory to store HR-WSI products
    pub output_dir: PathBuf,

    /// Only query and list the products found in a query_file.txt in OUTPUT_DIR
    #[arg(long, help_heading = "Execution mode")]
    pub query: bool,

    /// Query, write query_file.txt, then download the products found
    #[arg(long, help_heading = "Execution mode")]
    pub query_and_download: bool,

    /// Only download the products listed in --query-file
    #[arg(long, help_heading = "Execution mode")]
    pub download: bool,

    /// One or more MGRS tile identifiers, formatted T##XXX or ##XXX
    #[arg(long, num_args = 1.., help_heading = "Selection mode")]
    pub tiles: Vec<String>,

    /// Vector file holding polygons (.geojson; .shp, .gpkg, .kml with the gdal feature)
    #[arg(long, help_heading = "Selection mode")]
    pub vector: Option<PathBuf>,

    /// Well Known Text of a POLYGON or MULTIPOLYGON
    #[arg(long, help_heading = "Selection mode")]
    pub wkt: Option<String>,

    /// EPSG code of --wkt, e.g. 4326 or 32631
    #[arg(long, help_heading = "Query parameters")]
    pub epsg: Option<String>,

    /// One or more product types among FSC|SWS|GFSC|WDS|WIC_S1|WIC_S2|WIC_S1S2|CC
    #[arg(long = "product-type", num_args = 1.., help_heading = "Query parameters")]
    pub product_types: Vec<String>,

    /// Start of the observation-date window, YYYY-MM-DD
    #[arg(long, value_parser = parse_date, help_heading = "Query parameters")]
    pub date_start: Option<NaiveDate>,

    /// End of the observation-date window, YYYY-MM-DD
    #[arg(long, value_parser = parse_date, help_heading = "Query parameters")]
    pub date_end: Option<NaiveDate>,

    /// Query file listing products to download, one productType/tile/yyyy/mm/dd/name per line
    #[arg(long, help_heading = "Download parameters")]
    pub query_file: Option<PathBuf>,

    /// TOML configuration file (defaults to $HRWSI_CONFIG, then built-in settings)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// A validated invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query {
        request: QueryRequest,
        download: bool,
    },
    Download {
        query_file: PathBuf,
    },
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    window::parse_date(text).map_err(|e| e.to_string())
}

fn argument(message: &str) -> ValidationError {
    ValidationError::Argument(message.to_string())
}

impl Cli {
    /// Checks the rules clap cannot express and builds the command to run.
    pub fn validate(&self) -> Result<Command, ValidationError> {
        if self.download {
            let Some(query_file) = &self.query_file else {
                return Err(argument("--download requires --query-file"));
            };
            if self.date_start.is_some()
                || self.date_end.is_some()
                || !self.product_types.is_empty()
                || !self.tiles.is_empty()
                || self.vector.is_some()
                || self.wkt.is_some()
                || self.epsg.is_some()
            {
                return Err(argument(
                    "--download only allows for --query-file and the output path to be given",
                ));
            }
            return Ok(Command::Download {
                query_file: query_file.clone(),
            });
        }

        let (Some(start), Some(end)) = (self.date_start, self.date_end) else {
            return Err(argument(
                "--query and --query-and-download require --date-start and --date-end",
            ));
        };
        if self.product_types.is_empty() {
            return Err(argument(
                "--query and --query-and-download require --product-type",
            ));
        }
        if self.query_file.is_some() {
            return Err(argument("--query-file can only be given with --download"));
        }

        let aoi = match (&self.wkt, &self.epsg) {
            (Some(_), None) => return Err(argument("--wkt requires --epsg")),
            (None, Some(_)) => return Err(argument("--epsg requires --wkt")),
            (Some(wkt), Some(epsg)) => AreaOfInterest::Wkt {
                epsg: epsg.clone(),
                wkt: wkt.clone(),
            },
            (None, None) => match &self.vector {
                Some(path) => AreaOfInterest::Vector(path.clone()),
                None if !self.tiles.is_empty() => AreaOfInterest::Tiles(self.tiles.clone()),
                None => {
                    return Err(argument(
                        "--query and --query-and-download require either --tiles, --vector or --wkt",
                    ))
                }
            },
        };

        Ok(Command::Query {
            request: QueryRequest {
                aoi,
                product_types: self.product_types.clone(),
                window: SearchWindow::new(start, end)?,
            },
            download: self.query_and_download,
        })
    }
}
