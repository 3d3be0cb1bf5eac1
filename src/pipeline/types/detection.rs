use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbology reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CodeType {
    QrCode,
    Ean13,
    Ean8,
    UpcA,
    Code128,
    Code39,
    DataMatrix,
    Pdf417,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::QrCode => "QRCODE",
            CodeType::Ean13 => "EAN13",
            CodeType::Ean8 => "EAN8",
            CodeType::UpcA => "UPCA",
            CodeType::Code128 => "CODE128",
            CodeType::Code39 => "CODE39",
            CodeType::DataMatrix => "DATAMATRIX",
            CodeType::Pdf417 => "PDF417",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corner points of a detected code, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    points: Vec<(i32, i32)>,
}

impl BoundingBox {
    pub fn new(points: Vec<(i32, i32)>) -> Self {
        Self { points }
    }

    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        let right = x.saturating_add(width);
        let bottom = y.saturating_add(height);
        Self {
            points: vec![(x, y), (right, y), (right, bottom), (x, bottom)],
        }
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }
}

/// What the external decoder found in a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub code_value: String,
    pub code_type: CodeType,
    pub bounding_box: Option<BoundingBox>,
}

impl Detection {
    pub fn new(code_value: impl Into<String>, code_type: CodeType) -> Self {
        Self {
            code_value: code_value.into(),
            code_type,
            bounding_box: None,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}
