#![allow(async_fn_in_trait)]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
#[cfg(feature = "gdal")]
mod gdal_support;
pub mod geometry;
pub mod grid;
pub mod lister;
pub mod provider;
pub mod query;
pub mod resolver;
pub mod s3;
pub mod tile;
pub mod window;

#[cfg(test)]
mod testing;
