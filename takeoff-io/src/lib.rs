use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use takeoff_core::{
    drawing::Drawing,
    quantity::{EstimateLineItem, QuantityItem},
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

/// 读取外部 CAD 解析器导出的中性图元数据。
pub trait DrawingLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

/// 读取展平后的预算（RAB）行。
pub trait EstimateLoader {
    fn load_estimate(&self, path: &Path) -> Result<Vec<EstimateLineItem>, IoError>;
}

pub trait ReportSaver {
    fn save_items(&self, items: &[QuantityItem], path: &Path) -> Result<(), IoError>;
}

/// JSON 交换格式：图纸为 `{ texts, polylines, circles, dimensions }`，坐标写作 `[x, y]`。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFacade;

impl JsonFacade {
    pub fn new() -> Self {
        Self
    }

    /// 从内存中的 JSON 文本解析图纸并校验数值。
    pub fn parse_drawing(&self, data: &str) -> Result<Drawing, IoError> {
        let drawing: Drawing = serde_json::from_str(data)?;
        validate_drawing(&drawing)?;
        Ok(drawing)
    }

    pub fn parse_estimate(&self, data: &str) -> Result<Vec<EstimateLineItem>, IoError> {
        let lines: Vec<EstimateLineItem> = serde_json::from_str(data)?;
        validate_estimate(&lines)?;
        Ok(lines)
    }

    pub fn items_to_string(&self, items: &[QuantityItem]) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(items)?)
    }
}

impl DrawingLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        let data = read_file(path)?;
        let drawing: Drawing = serde_json::from_str(&data).map_err(|source| IoError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        validate_drawing(&drawing)?;
        info!(
            path = %path.display(),
            texts = drawing.texts().len(),
            polylines = drawing.polylines().len(),
            circles = drawing.circles().len(),
            dimensions = drawing.dimensions().len(),
            "图纸读取完成"
        );
        Ok(drawing)
    }
}

impl EstimateLoader for JsonFacade {
    fn load_estimate(&self, path: &Path) -> Result<Vec<EstimateLineItem>, IoError> {
        let data = read_file(path)?;
        let lines: Vec<EstimateLineItem> =
            serde_json::from_str(&data).map_err(|source| IoError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        validate_estimate(&lines)?;
        debug!(path = %path.display(), lines = lines.len(), "预算读取完成");
        Ok(lines)
    }
}

impl ReportSaver for JsonFacade {
    fn save_items(&self, items: &[QuantityItem], path: &Path) -> Result<(), IoError> {
        write_json(path, items)?;
        info!(path = %path.display(), items = items.len(), "工程量清单已写出");
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, IoError> {
    fs::read_to_string(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IoError> {
    let serialized = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| IoError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, serialized).map_err(|source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// 拒绝非有限坐标、负半径等无法参与计算的数据。
fn validate_drawing(drawing: &Drawing) -> Result<(), IoError> {
    for (index, text) in drawing.texts().iter().enumerate() {
        if !text.position.is_finite() {
            return Err(IoError::InvalidDocument(format!(
                "文字 #{index} 的插入点不是有限值"
            )));
        }
    }
    for (index, polyline) in drawing.polylines().iter().enumerate() {
        if let Some(vertex) = polyline.points.iter().position(|point| !point.is_finite()) {
            return Err(IoError::InvalidDocument(format!(
                "多段线 #{index} 的第 {vertex} 个顶点不是有限值"
            )));
        }
    }
    for (index, circle) in drawing.circles().iter().enumerate() {
        if !circle.center.is_finite() || !circle.radius.is_finite() || circle.radius < 0.0 {
            return Err(IoError::InvalidDocument(format!(
                "圆 #{index} 的圆心或半径非法 (radius = {})",
                circle.radius
            )));
        }
    }
    for (index, dimension) in drawing.dimensions().iter().enumerate() {
        if !dimension.measurement.is_finite() {
            return Err(IoError::InvalidDocument(format!(
                "标注 #{index} 的测量值不是有限值"
            )));
        }
    }
    Ok(())
}

fn validate_estimate(lines: &[EstimateLineItem]) -> Result<(), IoError> {
    for (index, line) in lines.iter().enumerate() {
        if !line.volume.is_finite() || line.unit_price.is_some_and(|price| !price.is_finite()) {
            return Err(IoError::InvalidDocument(format!(
                "预算行 #{index} ({}) 的数量或单价不是有限值",
                line.item
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_default_to_empty() {
        let drawing = JsonFacade::new()
            .parse_drawing(r#"{ "circles": [ { "center": [0.0, 0.0], "radius": 150.0 } ] }"#)
            .expect("解析失败");
        assert!(drawing.texts().is_empty());
        assert_eq!(drawing.circles().len(), 1);
        assert_eq!(drawing.circles()[0].layer, "");
    }

    #[test]
    fn negative_radius_is_rejected() {
        let err = JsonFacade::new()
            .parse_drawing(r#"{ "circles": [ { "center": [0.0, 0.0], "radius": -1.0 } ] }"#)
            .expect_err("负半径应被拒绝");
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }

    #[test]
    fn malformed_json_reports_decode_error() {
        let err = JsonFacade::new()
            .parse_drawing("{ \"texts\": [")
            .expect_err("截断的 JSON 应失败");
        assert!(matches!(err, IoError::Decode(_)));
    }

    #[test]
    fn estimate_without_unit_or_price() {
        let lines = JsonFacade::new()
            .parse_estimate(r#"[ { "item": "Kolom K1", "volume": 10.5 } ]"#)
            .expect("解析失败");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit, "");
        assert_eq!(lines[0].unit_price, None);
    }
}
