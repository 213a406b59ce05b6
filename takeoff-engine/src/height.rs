use once_cell::sync::Lazy;
use regex::Regex;

use crate::compile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeightMarker {
    /// `H400`、`H=4000`、`HEIGHT_300`
    Height,
    /// `T120`，通常是板厚
    Thickness,
}

static MARKERS: Lazy<Vec<(HeightMarker, Regex)>> = Lazy::new(|| {
    vec![
        (
            HeightMarker::Height,
            compile(r"(?:^|[^A-Za-z])[Hh][-_=]?(\d{2,4})"),
        ),
        (
            HeightMarker::Thickness,
            compile(r"(?:^|[^A-Za-z])[Tt][-_=]?(\d{2,4})"),
        ),
        (HeightMarker::Height, compile(r"HEIGHT[-_]?(\d{2,4})")),
    ]
});

/// 从图层名推断构件高度（米）。
///
/// 找不到标记、或标记换算后不为正时返回 `None`，调用方必须跳过或提示人工复核，绝不回退到默认高度。
#[derive(Debug, Default, Clone, Copy)]
pub struct HeightDetector;

impl HeightDetector {
    pub fn detect_height(layer: &str) -> Option<f64> {
        MARKERS.iter().find_map(|(marker, pattern)| {
            let captures = pattern.captures(layer)?;
            let value = captures.get(1)?.as_str().parse::<f64>().ok()?;
            let meters = match marker {
                HeightMarker::Height => Self::height_to_meters(value),
                HeightMarker::Thickness => Self::thickness_to_meters(value),
            };
            (meters > 0.0).then_some(meters)
        })
    }

    fn height_to_meters(value: f64) -> f64 {
        if value >= 1000.0 {
            value / 1000.0
        } else if value > 100.0 {
            value / 100.0
        } else if value > 10.0 {
            // 11..=100 原样视为米，沿用图层命名习惯
            value
        } else {
            value / 10.0
        }
    }

    fn thickness_to_meters(value: f64) -> f64 {
        if value >= 100.0 {
            value / 1000.0
        } else if value >= 10.0 {
            value / 100.0
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HeightDetector;

    fn assert_height(layer: &str, expected: f64) {
        let height = HeightDetector::detect_height(layer)
            .unwrap_or_else(|| panic!("height expected for {layer}"));
        assert!(
            (height - expected).abs() < 1e-9,
            "{layer}: got {height}, expected {expected}"
        );
    }

    #[test]
    fn height_markers_in_layer_names() {
        assert_height("LT_1_K_H3000", 3.0);
        assert_height("KOLOM_H400", 4.0);
        assert_height("KOLOM_H=350", 3.5);
        assert_height("HEIGHT_300", 3.0);
        assert_height("h-45", 45.0);
        assert_height("BALOK_H05", 0.5);
    }

    #[test]
    fn thickness_marker_is_read_as_slab_thickness() {
        assert_height("LT_2_S_T120", 0.12);
        assert_height("PLAT_T12", 0.12);
    }

    #[test]
    fn marker_letters_inside_words_are_ignored() {
        assert!(HeightDetector::detect_height("NO_PATTERN").is_none());
        assert!(HeightDetector::detect_height("KOLOM").is_none());
        assert!(HeightDetector::detect_height("SHAFT20").is_none());
        assert!(HeightDetector::detect_height("").is_none());
    }

    #[test]
    fn zero_marker_counts_as_missing() {
        assert!(HeightDetector::detect_height("LT_1_KOLOM_H00").is_none());
        assert!(HeightDetector::detect_height("PLAT_T000").is_none());
        assert!(HeightDetector::detect_height("HEIGHT_0000").is_none());
    }
}
