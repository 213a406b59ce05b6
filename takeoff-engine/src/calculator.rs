//! 工程量自动计算：轴网识别、几何优先匹配、文字回退、楼板与圆柱提取，最后按位置合并。
//!
//! 各阶段严格按顺序执行，每个阶段返回自己的条目与警告，由编排器拼接。
//! 图纸数据的问题只会产生警告，计算本身不会失败。

use std::collections::{BTreeMap, HashSet};
use std::f64::consts::PI;
use std::fmt;

use takeoff_core::drawing::{Drawing, Polyline};
use takeoff_core::geometry::{Bounds2D, Point2};
use takeoff_core::quantity::{Discipline, ExtractionMethod, ItemCategory, QuantityItem, Unit};
use tracing::{debug, info, warn};

use crate::aggregate::{CategorySummary, ItemAggregator};
use crate::dimension::{DimensionParser, ParsedDimensions};
use crate::errors::EngineError;
use crate::grid::{GridDetector, GridReferenceSet};
use crate::height::HeightDetector;
use crate::labels;
use crate::voids::VoidDetector;

const SLAB_LAYER_KEYWORDS: [&str; 5] = ["plat", "slab", "lantai", "floor", "dak"];
const COLUMN_LAYER_KEYWORDS: [&str; 4] = ["kolom", "column", "col", "pile"];
const SLAB_GRID: &str = "Full Area";
const LABEL_SAMPLE_CHARS: usize = 30;

/// 计算参数，默认值即常用图纸约定。
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorSettings {
    /// 几何与标注匹配的距离上限（图纸单位）。
    pub match_radius: f64,
    pub min_rectangle_side: f64,
    pub min_circle_radius: f64,
    /// 楼板名义厚度（米）。
    pub slab_thickness: f64,
    pub default_column_height: f64,
    pub default_member_height: f64,
    pub void_warning_ratio: f64,
    /// 文字回退阶段去重的网格尺寸。
    pub position_bucket: f64,
    pub unmatched_sample_limit: usize,
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            match_radius: 1000.0,
            min_rectangle_side: 10.0,
            min_circle_radius: 5.0,
            slab_thickness: 0.12,
            default_column_height: 4.0,
            default_member_height: 0.3,
            void_warning_ratio: 0.30,
            position_bucket: 100.0,
            unmatched_sample_limit: 5,
        }
    }
}

impl CalculatorSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("match_radius", self.match_radius),
            ("min_rectangle_side", self.min_rectangle_side),
            ("min_circle_radius", self.min_circle_radius),
            ("slab_thickness", self.slab_thickness),
            ("default_column_height", self.default_column_height),
            ("default_member_height", self.default_member_height),
            ("position_bucket", self.position_bucket),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidSetting { name, value });
            }
        }
        if !(0.0..=1.0).contains(&self.void_warning_ratio) {
            return Err(EngineError::RatioOutOfRange {
                name: "void_warning_ratio",
                value: self.void_warning_ratio,
            });
        }
        Ok(())
    }
}

/// 候选构件轮廓。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryShape {
    Rectangle { width: f64, height: f64 },
    Circle { radius: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub shape: GeometryShape,
    /// 矩形取包围盒中心，圆取圆心。
    pub position: Point2,
    pub layer: String,
    pub points: Vec<Point2>,
}

impl Geometry {
    fn describe(&self) -> String {
        let (x, y) = (self.position.x(), self.position.y());
        match self.shape {
            GeometryShape::Rectangle { width, height } => format!(
                "Rectangle at ({x:.0}, {y:.0}) | {width:.0}x{height:.0} | Layer: {}",
                self.layer
            ),
            GeometryShape::Circle { radius } => format!(
                "Circle at ({x:.0}, {y:.0}) | r={radius:.0} | Layer: {}",
                self.layer
            ),
        }
    }
}

/// 带有尺寸、编号或已知分类的标注。
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    /// 在 `Drawing::texts()` 中的下标。
    pub source_index: usize,
    pub text: String,
    pub position: Point2,
    pub layer: String,
    pub dimensions: Option<ParsedDimensions>,
    pub code: Option<String>,
    pub category: ItemCategory,
}

impl LabelRecord {
    fn describe(&self) -> String {
        let text: String = self.text.chars().take(LABEL_SAMPLE_CHARS).collect();
        format!(
            "'{text}' at ({:.0}, {:.0}) | Layer: {}",
            self.position.x(),
            self.position.y(),
            self.layer
        )
    }
}

/// 一对匹配结果，下标分别指向几何列表与标注列表。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    pub geometry: usize,
    pub label: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub pairs: Vec<MatchedPair>,
    pub unmatched_geometries: Vec<usize>,
    pub unmatched_labels: Vec<usize>,
}

/// 高度缺失的来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightSource {
    MatchedRectangle,
    MatchedCircle,
    RoundColumn,
}

/// 图纸质量警告，不中断计算。
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationWarning {
    NoGridsDetected,
    NoGeometries,
    UnmatchedGeometries { total: usize, samples: Vec<String> },
    UnmatchedLabels { total: usize, samples: Vec<String> },
    MissingHeight {
        source: HeightSource,
        layer: String,
        position: Point2,
    },
    HighVoidRatio {
        layer: String,
        ratio: f64,
        gross_area: f64,
        void_area: f64,
    },
}

impl fmt::Display for CalculationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationWarning::NoGridsDetected => {
                write!(f, "未识别到轴号，轴网定位可能不准确")
            }
            CalculationWarning::NoGeometries => {
                write!(f, "未识别到矩形或圆形构件，跳过几何优先匹配")
            }
            CalculationWarning::UnmatchedGeometries { total, samples } => {
                write!(f, "{total} 个几何轮廓没有对应标注")?;
                write_samples(f, *total, samples)
            }
            CalculationWarning::UnmatchedLabels { total, samples } => {
                write!(f, "{total} 个标注附近没有几何轮廓")?;
                write_samples(f, *total, samples)
            }
            CalculationWarning::MissingHeight {
                source,
                layer,
                position,
            } => {
                let kind = match source {
                    HeightSource::MatchedRectangle => "矩形构件",
                    HeightSource::MatchedCircle => "圆形构件",
                    HeightSource::RoundColumn => "圆柱",
                };
                write!(
                    f,
                    "无法确定{kind}高度，已跳过：({:.0}, {:.0}) 图层 {layer}",
                    position.x(),
                    position.y()
                )
            }
            CalculationWarning::HighVoidRatio {
                layer,
                ratio,
                gross_area,
                void_area,
            } => write!(
                f,
                "图层 {layer} 洞口占比 {:.1}% 偏高（外轮廓 {gross_area:.2} m²，洞口 {void_area:.2} m²）",
                ratio * 100.0
            ),
        }
    }
}

fn write_samples(f: &mut fmt::Formatter<'_>, total: usize, samples: &[String]) -> fmt::Result {
    for sample in samples {
        write!(f, "\n  - {sample}")?;
    }
    if total > samples.len() {
        write!(f, "\n  ... 另有 {} 个", total - samples.len())?;
    }
    Ok(())
}

/// 单个阶段的产出。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutcome {
    pub items: Vec<QuantityItem>,
    pub warnings: Vec<CalculationWarning>,
}

impl StageOutcome {
    fn warn(&mut self, warning: CalculationWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// 一次计算的完整结果。
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationReport {
    /// 合并后的条目。
    pub items: Vec<QuantityItem>,
    pub warnings: Vec<CalculationWarning>,
    /// 标注实体的测量值（米），按图层分组。
    pub dimension_values: BTreeMap<String, Vec<f64>>,
    pub grids: GridReferenceSet,
    /// 合并前的条目数。
    pub raw_item_count: usize,
}

impl CalculationReport {
    pub fn summary_by_category(&self) -> Vec<CategorySummary> {
        ItemAggregator::summarize_by_category(&self.items)
    }

    pub fn by_discipline(&self) -> BTreeMap<Discipline, Vec<QuantityItem>> {
        ItemAggregator::group_by_discipline(&self.items)
    }

    pub fn total_volume(&self, unit: Unit) -> f64 {
        self.items
            .iter()
            .filter(|item| item.unit == unit)
            .map(|item| item.volume)
            .sum()
    }
}

/// 单张图纸的计算器。只读借用图纸，每次运行独立持有轴网与条目列表。
#[derive(Debug, Clone)]
pub struct AutoVolumeCalculator<'a> {
    drawing: &'a Drawing,
    settings: CalculatorSettings,
    parser: DimensionParser,
    voids: VoidDetector,
}

impl<'a> AutoVolumeCalculator<'a> {
    pub fn new(drawing: &'a Drawing) -> Self {
        let settings = CalculatorSettings::default();
        let voids = VoidDetector::with_warning_ratio(settings.void_warning_ratio);
        Self {
            drawing,
            settings,
            parser: DimensionParser::new(),
            voids,
        }
    }

    pub fn with_settings(drawing: &'a Drawing, settings: CalculatorSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        let voids = VoidDetector::with_warning_ratio(settings.void_warning_ratio);
        Ok(Self {
            drawing,
            settings,
            parser: DimensionParser::new(),
            voids,
        })
    }

    #[inline]
    pub fn settings(&self) -> &CalculatorSettings {
        &self.settings
    }

    /// 依次执行全部阶段并合并结果。
    pub fn calculate_all_volumes(&self) -> CalculationReport {
        info!(
            texts = self.drawing.texts().len(),
            polylines = self.drawing.polylines().len(),
            circles = self.drawing.circles().len(),
            dimensions = self.drawing.dimensions().len(),
            "开始计算工程量"
        );

        let (grids, grid_warnings) = self.detect_grids();
        let geometry_first = self.process_geometry_first(&grids);
        let legacy = self.process_text_labels(&grids);
        let slabs = self.process_polylines_as_slabs();
        let columns = self.process_circles_as_columns(&grids);
        let dimension_values = self.collect_dimension_values();

        let mut items = Vec::new();
        let mut warnings = grid_warnings;
        for stage in [geometry_first, legacy, slabs, columns] {
            items.extend(stage.items);
            warnings.extend(stage.warnings);
        }

        let raw_item_count = items.len();
        let items = ItemAggregator::aggregate(items);
        info!(
            raw = raw_item_count,
            items = items.len(),
            warnings = warnings.len(),
            "工程量计算完成"
        );

        CalculationReport {
            items,
            warnings,
            dimension_values,
            grids: grids.into_references(),
            raw_item_count,
        }
    }

    /// 阶段 1：轴网识别。没有轴号只产生警告，后续定位返回 `Unknown`。
    pub fn detect_grids(&self) -> (GridDetector, Vec<CalculationWarning>) {
        let mut detector = GridDetector::new();
        let mut outcome = StageOutcome::default();
        if !detector.detect_grid_bubbles(self.drawing.texts()) {
            outcome.warn(CalculationWarning::NoGridsDetected);
        }
        (detector, outcome.warnings)
    }

    /// 闭合、4～5 个顶点且两边都不小于阈值的多段线视为矩形构件。
    pub fn extract_rectangles(&self) -> Vec<Geometry> {
        self.drawing
            .polylines()
            .iter()
            .filter(|polyline| matches!(polyline.points.len(), 4 | 5) && polyline.is_closed())
            .filter_map(|polyline| {
                let bounds = Bounds2D::from_points(&polyline.points)?;
                let (width, height) = (bounds.width(), bounds.height());
                if width < self.settings.min_rectangle_side || height < self.settings.min_rectangle_side {
                    return None;
                }
                Some(Geometry {
                    shape: GeometryShape::Rectangle { width, height },
                    position: bounds.center(),
                    layer: polyline.layer.clone(),
                    points: polyline.points.clone(),
                })
            })
            .collect()
    }

    pub fn extract_circles(&self) -> Vec<Geometry> {
        self.drawing
            .circles()
            .iter()
            .filter(|circle| circle.radius >= self.settings.min_circle_radius)
            .map(|circle| Geometry {
                shape: GeometryShape::Circle {
                    radius: circle.radius,
                },
                position: circle.center,
                layer: circle.layer.clone(),
                points: Vec::new(),
            })
            .collect()
    }

    /// 清洗后的标注，仅保留带尺寸、编号或可识别分类的。
    pub fn extract_labels(&self) -> Vec<LabelRecord> {
        self.drawing
            .texts()
            .iter()
            .enumerate()
            .filter_map(|(source_index, text)| {
                let content = labels::normalize_label(&text.content)?;
                let dimensions = self.parser.parse(&content);
                let code = labels::extract_code(&content);
                let category = labels::classify(&content, &text.layer);
                if dimensions.is_none() && code.is_none() && category == ItemCategory::Unknown {
                    return None;
                }
                Some(LabelRecord {
                    source_index,
                    text: content,
                    position: text.position,
                    layer: text.layer.clone(),
                    dimensions,
                    code,
                    category,
                })
            })
            .collect()
    }

    /// 贪心匹配：按标注顺序，各自认领距离最近且未被认领的几何，距离不超过上限。
    pub fn match_geometry_to_labels(&self, geometries: &[Geometry], labels: &[LabelRecord]) -> MatchOutcome {
        let mut claimed_geometries = vec![false; geometries.len()];
        let mut claimed_labels = vec![false; labels.len()];
        let mut pairs = Vec::new();

        for (label_index, label) in labels.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (geometry_index, geometry) in geometries.iter().enumerate() {
                if claimed_geometries[geometry_index] {
                    continue;
                }
                let distance = label.position.distance(geometry.position);
                let closer = best.is_none_or(|(_, min)| distance < min);
                if closer && distance <= self.settings.match_radius {
                    best = Some((geometry_index, distance));
                }
            }
            if let Some((geometry_index, distance)) = best {
                claimed_geometries[geometry_index] = true;
                claimed_labels[label_index] = true;
                pairs.push(MatchedPair {
                    geometry: geometry_index,
                    label: label_index,
                    distance,
                });
            }
        }

        MatchOutcome {
            pairs,
            unmatched_geometries: unclaimed(&claimed_geometries),
            unmatched_labels: unclaimed(&claimed_labels),
        }
    }

    /// 阶段 2：几何优先。
    pub fn process_geometry_first(&self, grids: &GridDetector) -> StageOutcome {
        let mut geometries = self.extract_rectangles();
        let rectangles = geometries.len();
        geometries.extend(self.extract_circles());
        let labels = self.extract_labels();
        info!(
            rectangles,
            circles = geometries.len() - rectangles,
            labels = labels.len(),
            "几何优先：候选提取完成"
        );

        let mut outcome = StageOutcome::default();
        if geometries.is_empty() {
            outcome.warn(CalculationWarning::NoGeometries);
            return outcome;
        }

        let matches = self.match_geometry_to_labels(&geometries, &labels);
        debug!(pairs = matches.pairs.len(), "几何与标注匹配完成");

        for pair in &matches.pairs {
            let geometry = &geometries[pair.geometry];
            let label = &labels[pair.label];
            match self.matched_item(geometry, label, grids) {
                Ok(item) => outcome.items.push(item),
                Err(warning) => outcome.warn(warning),
            }
        }

        let limit = self.settings.unmatched_sample_limit;
        if !matches.unmatched_geometries.is_empty() {
            let samples = matches
                .unmatched_geometries
                .iter()
                .take(limit)
                .map(|&index| geometries[index].describe())
                .collect();
            outcome.warn(CalculationWarning::UnmatchedGeometries {
                total: matches.unmatched_geometries.len(),
                samples,
            });
        }
        if !matches.unmatched_labels.is_empty() {
            let samples = matches
                .unmatched_labels
                .iter()
                .take(limit)
                .map(|&index| labels[index].describe())
                .collect();
            outcome.warn(CalculationWarning::UnmatchedLabels {
                total: matches.unmatched_labels.len(),
                samples,
            });
        }

        info!(items = outcome.items.len(), "几何优先：生成条目");
        outcome
    }

    fn matched_item(
        &self,
        geometry: &Geometry,
        label: &LabelRecord,
        grids: &GridDetector,
    ) -> Result<QuantityItem, CalculationWarning> {
        let layer = geometry.layer.as_str();
        let category = match label.category {
            ItemCategory::Unknown => labels::classify("", layer),
            known => known,
        };
        let missing_height = |source| CalculationWarning::MissingHeight {
            source,
            layer: layer.to_string(),
            position: geometry.position,
        };

        let (length, width, height, volume, category) = match geometry.shape {
            GeometryShape::Rectangle {
                width: extent_x,
                height: extent_y,
            } => {
                let parsed = label.dimensions.unwrap_or_default();
                let (length, width) = parsed
                    .plan_size()
                    .unwrap_or((meters_from_extent(extent_x), meters_from_extent(extent_y)));
                let mut height = parsed.height.filter(|value| *value > 0.0);
                if height.is_none()
                    && matches!(
                        category,
                        ItemCategory::Balok | ItemCategory::Kolom | ItemCategory::Sloof
                    )
                {
                    height = HeightDetector::detect_height(layer);
                }
                let height = height.ok_or_else(|| missing_height(HeightSource::MatchedRectangle))?;
                (length, width, height, length * width * height, category)
            }
            GeometryShape::Circle { radius } => {
                let radius = meters_from_extent(radius);
                let height = HeightDetector::detect_height(layer)
                    .ok_or_else(|| missing_height(HeightSource::MatchedCircle))?;
                let category = match category {
                    ItemCategory::Unknown => ItemCategory::Kolom,
                    known => known,
                };
                let diameter = radius * 2.0;
                (diameter, diameter, height, PI * radius * radius * height, category)
            }
        };

        Ok(QuantityItem {
            code: label.code.clone().unwrap_or_default(),
            item: label.text.clone(),
            floor: labels::floor_from_layer(layer),
            grid: grids.find_nearest_grid(geometry.position),
            category,
            layer: layer.to_string(),
            length,
            width,
            height: Some(height),
            count: 1,
            unit: Unit::CubicMeter,
            volume,
            method: ExtractionMethod::GeometryFirst,
        })
    }

    /// 阶段 3：文字回退。独立遍历全部标注，与几何优先阶段不做去重；同一网格内的标注只取第一个。
    pub fn process_text_labels(&self, grids: &GridDetector) -> StageOutcome {
        let mut seen: HashSet<(i64, i64)> = HashSet::new();
        let mut outcome = StageOutcome::default();

        for text in self.drawing.texts() {
            let Some(content) = labels::normalize_label(&text.content) else {
                continue;
            };
            let category = labels::classify(&content, &text.layer);
            if category == ItemCategory::Unknown {
                continue;
            }
            let Some(parsed) = self.parser.parse(&content) else {
                continue;
            };
            let Some((length, width)) = parsed.plan_size() else {
                debug!(text = %content, "缺少平面尺寸，跳过");
                continue;
            };
            let bucket = self.position_bucket(text.position);
            if !seen.insert(bucket) {
                continue;
            }

            let code = labels::extract_code(&content);
            let grid = labels::extract_grid_reference(&content, code.as_deref(), text.position, grids);
            let (unit, height, volume) = if category.is_height_dependent() {
                let height = parsed.height.unwrap_or(if category == ItemCategory::Kolom {
                    self.settings.default_column_height
                } else {
                    self.settings.default_member_height
                });
                (Unit::CubicMeter, Some(height), length * width * height)
            } else {
                (Unit::SquareMeter, parsed.height, length * width)
            };

            outcome.items.push(QuantityItem {
                code: code.unwrap_or_default(),
                item: content,
                floor: labels::floor_from_layer(&text.layer),
                grid,
                category,
                layer: text.layer.clone(),
                length,
                width,
                height,
                count: 1,
                unit,
                volume,
                method: ExtractionMethod::TextExtraction,
            });
        }

        info!(items = outcome.items.len(), "文字回退：生成条目");
        outcome
    }

    /// 阶段 4：楼板。图层含楼板关键字的闭合多段线，扣除洞口后乘以名义厚度。
    pub fn process_polylines_as_slabs(&self) -> StageOutcome {
        let polylines = self.drawing.polylines();
        let thickness = self.settings.slab_thickness;
        let mut outcome = StageOutcome::default();

        for polyline in polylines {
            let layer = polyline.layer.to_lowercase();
            if !SLAB_LAYER_KEYWORDS.iter().any(|keyword| layer.contains(keyword)) {
                continue;
            }
            if !polyline.is_closed() || polyline.points.len() < 3 {
                continue;
            }

            let area = self.slab_area(polyline, polylines, &mut outcome);
            let volume = area * thickness;
            if volume <= 0.0 {
                continue;
            }
            outcome.items.push(QuantityItem {
                code: labels::extract_code(&polyline.layer).unwrap_or_else(|| "PL".to_string()),
                item: format!("Plat Lantai - {}", polyline.layer),
                floor: labels::floor_from_layer(&polyline.layer),
                grid: SLAB_GRID.to_string(),
                category: ItemCategory::Plat,
                layer: polyline.layer.clone(),
                length: 0.0,
                width: 0.0,
                height: Some(thickness),
                count: 1,
                unit: Unit::CubicMeter,
                volume,
                method: ExtractionMethod::PolylineArea,
            });
        }

        info!(items = outcome.items.len(), "楼板：生成条目");
        outcome
    }

    fn slab_area(&self, outer: &Polyline, all: &[Polyline], outcome: &mut StageOutcome) -> f64 {
        if all.len() <= 1 {
            return VoidDetector::normalize_area(VoidDetector::polygon_area(&outer.points));
        }
        let analysis = self.voids.detect_voids_in_polyline(&outer.points, all);
        if !analysis.voids.is_empty() {
            debug!(
                layer = %outer.layer,
                voids = analysis.voids.len(),
                net_area = analysis.net_area,
                "检测到洞口"
            );
        }
        let ratio = analysis.void_ratio();
        if ratio > self.voids.warning_ratio() {
            outcome.warnings.push(CalculationWarning::HighVoidRatio {
                layer: outer.layer.clone(),
                ratio,
                gross_area: analysis.gross_area,
                void_area: analysis.void_area(),
            });
        }
        analysis.net_area
    }

    /// 阶段 5：圆柱。高度必须能从图层名识别，否则跳过并警告。
    pub fn process_circles_as_columns(&self, grids: &GridDetector) -> StageOutcome {
        let mut outcome = StageOutcome::default();

        for circle in self.drawing.circles() {
            let layer = circle.layer.to_lowercase();
            if !COLUMN_LAYER_KEYWORDS.iter().any(|keyword| layer.contains(keyword)) {
                continue;
            }
            let Some(height) = HeightDetector::detect_height(&circle.layer) else {
                outcome.warn(CalculationWarning::MissingHeight {
                    source: HeightSource::RoundColumn,
                    layer: circle.layer.clone(),
                    position: circle.center,
                });
                continue;
            };

            let radius = if circle.radius > 10.0 {
                circle.radius / 1000.0
            } else if circle.radius > 1.0 {
                circle.radius / 100.0
            } else {
                circle.radius
            };
            let volume = PI * radius * radius * height;
            if volume <= 0.0 {
                continue;
            }

            let diameter = radius * 2.0;
            let code = labels::extract_code(&circle.layer);
            let grid = labels::extract_grid_reference(&circle.layer, code.as_deref(), circle.center, grids);
            outcome.items.push(QuantityItem {
                code: code.unwrap_or_else(|| "K".to_string()),
                item: format!("Kolom Bulat ⌀{:.0}cm - {}", diameter * 100.0, circle.layer),
                floor: labels::floor_from_layer(&circle.layer),
                grid,
                category: ItemCategory::Kolom,
                layer: circle.layer.clone(),
                length: diameter,
                width: diameter,
                height: Some(height),
                count: 1,
                unit: Unit::CubicMeter,
                volume,
                method: ExtractionMethod::CircleVolume,
            });
        }

        info!(items = outcome.items.len(), "圆柱：生成条目");
        outcome
    }

    /// 标注实体测量值换算为米并按图层分组；非正值忽略。
    pub fn collect_dimension_values(&self) -> BTreeMap<String, Vec<f64>> {
        let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for dimension in self.drawing.dimensions() {
            let measurement = dimension.measurement;
            if !(measurement > 0.0) {
                continue;
            }
            let meters = if measurement > 100.0 {
                measurement / 1000.0
            } else if measurement > 10.0 {
                measurement / 100.0
            } else {
                measurement
            };
            values.entry(dimension.layer.clone()).or_default().push(meters);
        }
        values
    }

    fn position_bucket(&self, position: Point2) -> (i64, i64) {
        let size = self.settings.position_bucket;
        (
            (position.x() / size).trunc() as i64,
            (position.y() / size).trunc() as i64,
        )
    }
}

/// 大于 10 的轮廓尺寸视为毫米。
#[inline]
fn meters_from_extent(value: f64) -> f64 {
    if value > 10.0 { value / 1000.0 } else { value }
}

fn unclaimed(claimed: &[bool]) -> Vec<usize> {
    claimed
        .iter()
        .enumerate()
        .filter(|(_, claimed)| !**claimed)
        .map(|(index, _)| index)
        .collect()
}
