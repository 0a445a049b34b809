//! `<grid>.meta` plot descriptors read by the map renderer.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{PhenoError, Result};
use crate::raster::GridMeta;

/// Latitude ticks of the stacked y axis.
const Y_TICKS: [u32; 4] = [8, 21, 35, 49];

/// Legend and colour settings for one rendered grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotMeta {
    pub title: String,
    pub label_text: String,
    pub colormap: Option<String>,
    /// Renderer options for categorical legends; empty lists and `None`
    /// are left out of the file. [`PlotMeta::for_grid`] sets none of them.
    pub color_list: Vec<String>,
    pub cbar_labels: Vec<String>,
    pub ticks: Vec<f64>,
    pub color_list_type: Option<String>,
    pub factor: f64,
    pub min: f64,
    pub max: f64,
    pub min_color: Option<String>,
    pub no_data: f64,
}

impl PlotMeta {
    /// Viridis legend labelled `year`, range taken from `meta`.
    pub fn for_grid(title: impl Into<String>, meta: &GridMeta) -> Self {
        Self {
            title: title.into(),
            label_text: "year".into(),
            colormap: Some("viridis".into()),
            color_list: Vec::new(),
            cbar_labels: Vec::new(),
            ticks: Vec::new(),
            color_list_type: None,
            factor: 1.0,
            min: meta.min,
            max: meta.max,
            min_color: Some("lightgrey".into()),
            no_data: meta.no_data,
        }
    }
}

pub fn encode_meta<W: Write>(out: &mut W, plot: &PlotMeta) -> std::io::Result<()> {
    writeln!(out, "title: '{}'", plot.title)?;
    writeln!(out, "yTitle: 1.00")?;
    writeln!(out, "xTitle: 0.00")?;
    writeln!(out, "removeEmptyColumns: True")?;
    writeln!(out, "labeltext: '{}'", plot.label_text)?;
    if let Some(colormap) = &plot.colormap {
        writeln!(out, "colormap: '{colormap}'")?;
    }
    if !plot.color_list.is_empty() {
        writeln!(out, "colorlist: ")?;
        for item in &plot.color_list {
            writeln!(out, " - '{item}'")?;
        }
    }
    if !plot.cbar_labels.is_empty() {
        writeln!(out, "cbarLabel: ")?;
        for item in &plot.cbar_labels {
            writeln!(out, " - '{item}'")?;
        }
    }
    if !plot.ticks.is_empty() {
        writeln!(out, "ticklist: ")?;
        for tick in &plot.ticks {
            writeln!(out, " - {tick:.6}")?;
        }
    }
    if let Some(kind) = &plot.color_list_type {
        writeln!(out, "colorlisttype: {kind}")?;
    }
    writeln!(out, "factor: {:.6}", plot.factor)?;
    if plot.max != plot.no_data {
        writeln!(out, "maxValue: {:.2}", plot.max)?;
    }
    if plot.min != plot.no_data {
        writeln!(out, "minValue: {:.2}", plot.min)?;
    }
    if let Some(color) = &plot.min_color {
        writeln!(out, "minColor: {color}")?;
    }
    writeln!(out, "yLabel: 'Latitude'")?;
    writeln!(out, "YaxisMappingFile: 'stacked_y_lat_buckets.csv'")?;
    writeln!(out, "YaxisMappingRefColumn: Bucket")?;
    writeln!(out, "YaxisMappingTarColumn: Latitude")?;
    writeln!(out, "YaxisMappingFormat: '{{:2.0f}}°'")?;
    writeln!(out, "yTicklist: ")?;
    for tick in Y_TICKS {
        writeln!(out, "- {tick}")?;
    }
    Ok(())
}

/// Write `<grid_path>.meta`; returns the written path.
pub fn write_meta_file(grid_path: &Path, plot: &PlotMeta) -> Result<PathBuf> {
    let mut name = grid_path.as_os_str().to_owned();
    name.push(".meta");
    let path = PathBuf::from(name);
    let file = File::create(&path).map_err(|e| PhenoError::io(&path, e))?;
    let mut out = BufWriter::new(file);
    encode_meta(&mut out, plot)
        .and_then(|_| out.flush())
        .map_err(|e| PhenoError::io(&path, e))?;
    Ok(path)
}
