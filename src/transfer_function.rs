use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

/// Number of entries in LUTs produced by the built-in provider. Consumers of
/// [`TransferFunction`] tolerate any length; this is only the default.
pub const LUT_SIZE: usize = 256;

#[derive(Debug, Error)]
pub enum TransferFunctionError {
    #[error("transfer function defines no colors")]
    Empty,

    #[error("malformed transfer function: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A 1-D color lookup plus the scalars the raymarch shader consumes: whether
/// the volume holds label ids rather than intensities, and the two intensity
/// percentiles used for contrast stretching.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    pub lut: Vec<[f32; 4]>,
    pub is_label_map: bool,
    pub p1: f32,
    pub p99: f32,
}

/// Collaborator boundary for transfer-function loading. The pipeline treats
/// the result as opaque and propagates failures as fatal.
pub trait TransferFunctionProvider {
    fn load(&self, path: &Path) -> Result<TransferFunction, TransferFunctionError>;
}

#[derive(Deserialize)]
struct TransferFunctionFile {
    #[serde(default)]
    label_map: bool,
    #[serde(default)]
    p1: f32,
    #[serde(default = "default_p99")]
    p99: f32,
    colors: Vec<[f32; 4]>,
}

fn default_p99() -> f32 {
    1.0
}

/// Default provider reading a JSON document of the form
/// `{"label_map": bool, "p1": f, "p99": f, "colors": [[r,g,b,a], ...]}`.
///
/// In label-map mode each color lands at its own index of a 256-entry LUT
/// (the remainder stays opaque white). Otherwise the colors are control
/// points interpolated linearly across the 256 entries.
pub struct JsonTransferFunctionProvider;

impl TransferFunctionProvider for JsonTransferFunctionProvider {
    fn load(&self, path: &Path) -> Result<TransferFunction, TransferFunctionError> {
        Self::parse(&fs::read_to_string(path)?)
    }
}

impl JsonTransferFunctionProvider {
    pub fn parse(text: &str) -> Result<TransferFunction, TransferFunctionError> {
        let file: TransferFunctionFile = serde_json::from_str(text)?;
        if file.colors.is_empty() {
            return Err(TransferFunctionError::Empty);
        }
        let lut = if file.label_map {
            label_lut(&file.colors)
        } else {
            interpolated_lut(&file.colors)
        };
        Ok(TransferFunction {
            lut,
            is_label_map: file.label_map,
            p1: file.p1,
            p99: file.p99,
        })
    }
}

fn label_lut(colors: &[[f32; 4]]) -> Vec<[f32; 4]> {
    let mut lut = vec![[1.0f32; 4]; LUT_SIZE];
    for (entry, color) in lut.iter_mut().zip(colors) {
        *entry = *color;
    }
    lut
}

fn interpolated_lut(colors: &[[f32; 4]]) -> Vec<[f32; 4]> {
    if colors.len() == 1 {
        return vec![colors[0]; LUT_SIZE];
    }
    (0..LUT_SIZE)
        .map(|i| {
            let t = i as f32 / (LUT_SIZE - 1) as f32 * (colors.len() - 1) as f32;
            let lo = (t.floor() as usize).min(colors.len() - 2);
            let frac = t - lo as f32;
            let mut entry = [0.0f32; 4];
            for (channel, value) in entry.iter_mut().enumerate() {
                *value = colors[lo][channel]
                    .mul_add(1.0 - frac, colors[lo + 1][channel] * frac);
            }
            entry
        })
        .collect()
}
