use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use takeoff_core::drawing::TextLabel;
use takeoff_core::geometry::Point2;
use tracing::{debug, info};

use crate::compile;

/// 未检测到任何轴网时的定位标签。
pub const UNKNOWN_GRID: &str = "Unknown";

const GRID_LAYER_KEYWORDS: [&str; 3] = ["grid", "as", "axis"];

static LETTER_GRID: Lazy<Regex> = Lazy::new(|| compile(r"^[A-Z]$"));
static NUMBER_GRID: Lazy<Regex> = Lazy::new(|| compile(r"^\d{1,2}$"));

/// 一张图纸的轴网：字母轴按 X 坐标，数字轴按 Y 坐标。
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GridReferenceSet {
    x: BTreeMap<String, f64>,
    y: BTreeMap<String, f64>,
}

impl GridReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn x(&self) -> &BTreeMap<String, f64> {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &BTreeMap<String, f64> {
        &self.y
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }

    /// 同名轴线重复出现时取新旧两值的平均。
    fn record(axis: &mut BTreeMap<String, f64>, name: &str, coordinate: f64) {
        axis.entry(name.to_string())
            .and_modify(|existing| *existing = (*existing + coordinate) / 2.0)
            .or_insert(coordinate);
    }

    fn nearest(axis: &BTreeMap<String, f64>, coordinate: f64) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (name, &position) in axis {
            let distance = (coordinate - position).abs();
            if best.is_none_or(|(_, min)| distance < min) {
                best = Some((name.as_str(), distance));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// 轴网识别与最近轴网查询。不设距离上限，远离轴网的点也会被指派到最近的轴线。
#[derive(Debug, Default, Clone)]
pub struct GridDetector {
    references: GridReferenceSet,
}

impl GridDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_references(references: GridReferenceSet) -> Self {
        Self { references }
    }

    /// 扫描文字标注识别轴号，替换已有结果；找到任意轴线时返回 `true`。
    pub fn detect_grid_bubbles(&mut self, labels: &[TextLabel]) -> bool {
        let mut references = GridReferenceSet::new();
        for label in labels {
            let content = label.content.trim().to_uppercase();
            let layer = label.layer.to_lowercase();
            let on_grid_layer = GRID_LAYER_KEYWORDS
                .iter()
                .any(|keyword| layer.contains(keyword));
            if !on_grid_layer && content.chars().count() > 2 {
                continue;
            }

            if LETTER_GRID.is_match(&content) {
                GridReferenceSet::record(&mut references.x, &content, label.position.x());
            } else if NUMBER_GRID.is_match(&content) {
                GridReferenceSet::record(&mut references.y, &content, label.position.y());
            }
        }

        info!(
            horizontal = references.x.len(),
            vertical = references.y.len(),
            "轴网识别完成"
        );
        debug!(x = ?references.x.keys().collect::<Vec<_>>(), y = ?references.y.keys().collect::<Vec<_>>(), "轴号列表");

        self.references = references;
        !self.references.is_empty()
    }

    /// 两个轴向分别取最近轴线，组合为 `A1`；单轴缺失时用 `?` 占位。
    pub fn find_nearest_grid(&self, position: Point2) -> String {
        let letter = GridReferenceSet::nearest(&self.references.x, position.x());
        let number = GridReferenceSet::nearest(&self.references.y, position.y());
        match (letter, number) {
            (Some(letter), Some(number)) => format!("{letter}{number}"),
            (Some(letter), None) => format!("{letter}-?"),
            (None, Some(number)) => format!("?-{number}"),
            (None, None) => UNKNOWN_GRID.to_string(),
        }
    }

    #[inline]
    pub fn references(&self) -> &GridReferenceSet {
        &self.references
    }

    pub fn into_references(self) -> GridReferenceSet {
        self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(content: &str, x: f64, y: f64, layer: &str) -> TextLabel {
        TextLabel {
            content: content.to_string(),
            position: Point2::new(x, y),
            layer: layer.to_string(),
        }
    }

    #[test]
    fn nearest_grid_combines_both_axes() {
        let mut detector = GridDetector::new();
        let found = detector.detect_grid_bubbles(&[
            label("A", 5000.0, 0.0, "0"),
            label("1", 0.0, 5000.0, "0"),
        ]);
        assert!(found);
        assert_eq!(detector.find_nearest_grid(Point2::new(5100.0, 5100.0)), "A1");
    }

    #[test]
    fn picks_closest_line_on_each_axis() {
        let mut detector = GridDetector::new();
        detector.detect_grid_bubbles(&[
            label("A", 0.0, 0.0, "GRID"),
            label("B", 6000.0, 0.0, "GRID"),
            label("C", 12000.0, 0.0, "GRID"),
            label("1", 0.0, 0.0, "GRID"),
            label("2", 0.0, 5000.0, "GRID"),
        ]);
        assert_eq!(detector.find_nearest_grid(Point2::new(7000.0, 4000.0)), "B2");
        // 远离轴网也会返回最近轴线
        assert_eq!(
            detector.find_nearest_grid(Point2::new(-90_000.0, 90_000.0)),
            "A2"
        );
    }

    #[test]
    fn missing_axis_uses_placeholder() {
        let mut detector = GridDetector::new();
        detector.detect_grid_bubbles(&[label("A", 100.0, 0.0, "0")]);
        assert_eq!(detector.find_nearest_grid(Point2::new(0.0, 0.0)), "A-?");

        detector.detect_grid_bubbles(&[label("12", 0.0, 100.0, "0")]);
        assert_eq!(detector.find_nearest_grid(Point2::new(0.0, 0.0)), "?-12");

        let found = detector.detect_grid_bubbles(&[label("KOLOM K1", 0.0, 0.0, "0")]);
        assert!(!found);
        assert_eq!(detector.find_nearest_grid(Point2::new(0.0, 0.0)), UNKNOWN_GRID);
    }

    #[test]
    fn repeated_names_average_pairwise() {
        let mut detector = GridDetector::new();
        detector.detect_grid_bubbles(&[
            label("A", 0.0, 0.0, "0"),
            label("A", 100.0, 0.0, "0"),
            label("A", 200.0, 0.0, "0"),
        ]);
        // ((0 + 100) / 2 + 200) / 2
        assert_eq!(detector.references().x().get("A"), Some(&125.0));
    }

    #[test]
    fn long_labels_only_count_on_grid_layers() {
        let mut detector = GridDetector::new();
        detector.detect_grid_bubbles(&[
            label(" b ", 300.0, 0.0, "0"),
            label("123", 0.0, 0.0, "0"),
            label("K12", 0.0, 0.0, "AS_GRID"),
        ]);
        let references = detector.references();
        assert_eq!(references.x().keys().collect::<Vec<_>>(), vec!["B"]);
        assert!(references.y().is_empty());
    }
}
