pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，单位为图纸单位（mm/cm/m 由数值大小推断）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 欧氏距离。
        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl From<(f64, f64)> for Point2 {
        fn from((x, y): (f64, f64)) -> Self {
            Self::new(x, y)
        }
    }

    /// 轴对齐边界框，用于矩形识别与图纸范围估算。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        /// 由点集构建包围盒，点集为空时返回 `None`。
        pub fn from_points<'a, I>(points: I) -> Option<Self>
        where
            I: IntoIterator<Item = &'a Point2>,
        {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(*point);
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            (self.max.x() - self.min.x()).abs()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            (self.max.y() - self.min.y()).abs()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod drawing {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// 文字标注（TEXT/MTEXT 展平后的结果）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextLabel {
        pub content: String,
        pub position: Point2,
        #[serde(default)]
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub points: Vec<Point2>,
        #[serde(default)]
        pub layer: String,
        #[serde(default)]
        pub closed: bool,
    }

    impl Polyline {
        /// 闭合标记或首尾顶点重合均视为闭合。
        pub fn is_closed(&self) -> bool {
            if self.closed {
                return true;
            }
            match (self.points.first(), self.points.last()) {
                (Some(first), Some(last)) => self.points.len() > 3 && first == last,
                _ => false,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        #[serde(default)]
        pub layer: String,
    }

    /// 标注实体只保留测量值与图层。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DimensionEntity {
        pub measurement: f64,
        #[serde(default)]
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum DrawingPrimitive {
        Text(TextLabel),
        Polyline(Polyline),
        Circle(Circle),
        Dimension(DimensionEntity),
    }

    impl DrawingPrimitive {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                DrawingPrimitive::Text(text) => &text.layer,
                DrawingPrimitive::Polyline(polyline) => &polyline.layer,
                DrawingPrimitive::Circle(circle) => &circle.layer,
                DrawingPrimitive::Dimension(dimension) => &dimension.layer,
            }
        }

        /// 计算图元的 2D 范围；文字退化为点，标注实体没有位置。
        pub fn bounds(&self) -> Option<Bounds2D> {
            match self {
                DrawingPrimitive::Text(text) => Some(Bounds2D::new(text.position, text.position)),
                DrawingPrimitive::Polyline(polyline) => Bounds2D::from_points(&polyline.points),
                DrawingPrimitive::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    Some(Bounds2D::new(
                        Point2::new(center.x() - radius, center.y() - radius),
                        Point2::new(center.x() + radius, center.y() + radius),
                    ))
                }
                DrawingPrimitive::Dimension(_) => None,
            }
        }
    }

    /// 一次计算所需的全部图元，按类型分组，构建后只读。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        #[serde(default)]
        texts: Vec<TextLabel>,
        #[serde(default)]
        polylines: Vec<Polyline>,
        #[serde(default)]
        circles: Vec<Circle>,
        #[serde(default)]
        dimensions: Vec<DimensionEntity>,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_primitives<I>(primitives: I) -> Self
        where
            I: IntoIterator<Item = DrawingPrimitive>,
        {
            let mut drawing = Self::new();
            for primitive in primitives {
                drawing.add_primitive(primitive);
            }
            drawing
        }

        pub fn add_primitive(&mut self, primitive: DrawingPrimitive) {
            match primitive {
                DrawingPrimitive::Text(text) => self.texts.push(text),
                DrawingPrimitive::Polyline(polyline) => self.polylines.push(polyline),
                DrawingPrimitive::Circle(circle) => self.circles.push(circle),
                DrawingPrimitive::Dimension(dimension) => self.dimensions.push(dimension),
            }
        }

        pub fn add_text(
            &mut self,
            content: impl Into<String>,
            position: Point2,
            layer: impl Into<String>,
        ) -> &mut Self {
            self.texts.push(TextLabel {
                content: content.into(),
                position,
                layer: layer.into(),
            });
            self
        }

        pub fn add_polyline<I>(
            &mut self,
            points: I,
            closed: bool,
            layer: impl Into<String>,
        ) -> &mut Self
        where
            I: IntoIterator<Item = Point2>,
        {
            self.polylines.push(Polyline {
                points: points.into_iter().collect(),
                layer: layer.into(),
                closed,
            });
            self
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> &mut Self {
            self.circles.push(Circle {
                center,
                radius,
                layer: layer.into(),
            });
            self
        }

        pub fn add_dimension(&mut self, measurement: f64, layer: impl Into<String>) -> &mut Self {
            self.dimensions.push(DimensionEntity {
                measurement,
                layer: layer.into(),
            });
            self
        }

        #[inline]
        pub fn texts(&self) -> &[TextLabel] {
            &self.texts
        }

        #[inline]
        pub fn polylines(&self) -> &[Polyline] {
            &self.polylines
        }

        #[inline]
        pub fn circles(&self) -> &[Circle] {
            &self.circles
        }

        #[inline]
        pub fn dimensions(&self) -> &[DimensionEntity] {
            &self.dimensions
        }

        /// 图元总数。
        pub fn len(&self) -> usize {
            self.texts.len() + self.polylines.len() + self.circles.len() + self.dimensions.len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// 以统一的标签联合形式遍历所有图元（克隆）。
        pub fn primitives(&self) -> impl Iterator<Item = DrawingPrimitive> + '_ {
            self.texts
                .iter()
                .cloned()
                .map(DrawingPrimitive::Text)
                .chain(self.polylines.iter().cloned().map(DrawingPrimitive::Polyline))
                .chain(self.circles.iter().cloned().map(DrawingPrimitive::Circle))
                .chain(self.dimensions.iter().cloned().map(DrawingPrimitive::Dimension))
        }

        /// 所有图层名称（去重、排序）。
        pub fn layers(&self) -> Vec<String> {
            let mut layers: Vec<String> = self
                .primitives()
                .map(|primitive| primitive.layer_name().to_string())
                .collect();
            layers.sort();
            layers.dedup();
            layers
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for primitive in self.primitives() {
                if let Some(primitive_bounds) = primitive.bounds() {
                    bounds.include_bounds(&primitive_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }
    }
}

pub mod quantity {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    /// 工程量条目的分类标签，字符串形式沿用预算表中的印尼语名称。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ItemCategory {
        Kolom,
        Balok,
        Plat,
        Sloof,
        Pondasi,
        Dinding,
        Ring,
        Tangga,
        Ac,
        Ducting,
        Grille,
        Pipa,
        Hydrant,
        Sprinkler,
        Gas,
        Kabel,
        Panel,
        Lampu,
        #[serde(rename = "stop kontak")]
        StopKontak,
        Unknown,
    }

    impl ItemCategory {
        pub fn as_str(self) -> &'static str {
            match self {
                ItemCategory::Kolom => "kolom",
                ItemCategory::Balok => "balok",
                ItemCategory::Plat => "plat",
                ItemCategory::Sloof => "sloof",
                ItemCategory::Pondasi => "pondasi",
                ItemCategory::Dinding => "dinding",
                ItemCategory::Ring => "ring",
                ItemCategory::Tangga => "tangga",
                ItemCategory::Ac => "ac",
                ItemCategory::Ducting => "ducting",
                ItemCategory::Grille => "grille",
                ItemCategory::Pipa => "pipa",
                ItemCategory::Hydrant => "hydrant",
                ItemCategory::Sprinkler => "sprinkler",
                ItemCategory::Gas => "gas",
                ItemCategory::Kabel => "kabel",
                ItemCategory::Panel => "panel",
                ItemCategory::Lampu => "lampu",
                ItemCategory::StopKontak => "stop kontak",
                ItemCategory::Unknown => "unknown",
            }
        }

        /// 体积依赖高度的构件（柱、梁、地梁、基础、圈梁）。
        #[inline]
        pub fn is_height_dependent(self) -> bool {
            matches!(
                self,
                ItemCategory::Kolom
                    | ItemCategory::Balok
                    | ItemCategory::Sloof
                    | ItemCategory::Pondasi
                    | ItemCategory::Ring
            )
        }

        pub fn discipline(self) -> Discipline {
            match self {
                ItemCategory::Kolom
                | ItemCategory::Balok
                | ItemCategory::Plat
                | ItemCategory::Sloof
                | ItemCategory::Pondasi
                | ItemCategory::Ring
                | ItemCategory::Tangga => Discipline::Struktur,
                ItemCategory::Ac
                | ItemCategory::Ducting
                | ItemCategory::Grille
                | ItemCategory::Pipa
                | ItemCategory::Hydrant
                | ItemCategory::Sprinkler
                | ItemCategory::Gas
                | ItemCategory::Kabel
                | ItemCategory::Panel
                | ItemCategory::Lampu
                | ItemCategory::StopKontak => Discipline::Mep,
                ItemCategory::Dinding | ItemCategory::Unknown => Discipline::Arsitektur,
            }
        }
    }

    impl fmt::Display for ItemCategory {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// 报表分册：结构、建筑、机电。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Discipline {
        Struktur,
        Arsitektur,
        Mep,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Unit {
        #[serde(rename = "m3")]
        CubicMeter,
        #[serde(rename = "m2")]
        SquareMeter,
    }

    impl fmt::Display for Unit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Unit::CubicMeter => f.write_str("m³"),
                Unit::SquareMeter => f.write_str("m²"),
            }
        }
    }

    /// 条目来源流水线。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum ExtractionMethod {
        #[serde(rename = "geometry-first")]
        GeometryFirst,
        #[serde(rename = "text_extraction")]
        TextExtraction,
        #[serde(rename = "polyline_area")]
        PolylineArea,
        #[serde(rename = "circle_volume")]
        CircleVolume,
    }

    impl ExtractionMethod {
        pub fn as_str(self) -> &'static str {
            match self {
                ExtractionMethod::GeometryFirst => "geometry-first",
                ExtractionMethod::TextExtraction => "text_extraction",
                ExtractionMethod::PolylineArea => "polyline_area",
                ExtractionMethod::CircleVolume => "circle_volume",
            }
        }
    }

    /// 工程量清单的一行。尺寸单位为米，`volume` 的单位由 `unit` 决定。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct QuantityItem {
        pub code: String,
        pub item: String,
        pub floor: String,
        pub grid: String,
        pub category: ItemCategory,
        pub layer: String,
        pub length: f64,
        pub width: f64,
        pub height: Option<f64>,
        pub count: u32,
        pub unit: Unit,
        pub volume: f64,
        pub method: ExtractionMethod,
    }

    /// 预算（RAB）中的一行，由外部表格读取器提供。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct EstimateLineItem {
        pub item: String,
        #[serde(default)]
        pub unit: String,
        pub volume: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub unit_price: Option<f64>,
    }
}

#[cfg(test)]
mod tests {
    use crate::drawing::{Drawing, DrawingPrimitive, Polyline};
    use crate::geometry::{Bounds2D, Point2};
    use crate::quantity::{Discipline, ExtractionMethod, ItemCategory, Unit};

    #[test]
    fn drawing_groups_primitives_by_kind() {
        let mut drawing = Drawing::new();
        drawing
            .add_text("K1 30x40", Point2::new(150.0, 200.0), "KOLOM")
            .add_polyline(
                [
                    Point2::new(0.0, 0.0),
                    Point2::new(300.0, 0.0),
                    Point2::new(300.0, 400.0),
                    Point2::new(0.0, 400.0),
                ],
                true,
                "KOLOM",
            )
            .add_circle(Point2::new(1000.0, 1000.0), 150.0, "KOLOM_BULAT")
            .add_dimension(400.0, "DIM");

        assert_eq!(drawing.len(), 4);
        assert_eq!(drawing.texts().len(), 1);
        assert_eq!(drawing.polylines().len(), 1);
        assert_eq!(drawing.circles().len(), 1);
        assert_eq!(drawing.dimensions().len(), 1);
        assert_eq!(drawing.layers(), vec!["DIM", "KOLOM", "KOLOM_BULAT"]);

        let bounds = drawing.bounds().expect("drawing bounds should exist");
        assert!((bounds.min().x() - 0.0).abs() < 1e-9);
        assert!((bounds.max().x() - 1150.0).abs() < 1e-9);
        assert!((bounds.max().y() - 1150.0).abs() < 1e-9);
    }

    #[test]
    fn from_primitives_round_trips_through_tagged_union() {
        let mut source = Drawing::new();
        source
            .add_text("A", Point2::new(5000.0, 0.0), "GRID")
            .add_dimension(250.0, "DIM_BALOK");
        let rebuilt = Drawing::from_primitives(source.primitives());
        assert_eq!(rebuilt, source);

        let kinds: Vec<&str> = source
            .primitives()
            .map(|primitive| match primitive {
                DrawingPrimitive::Text(_) => "text",
                DrawingPrimitive::Polyline(_) => "polyline",
                DrawingPrimitive::Circle(_) => "circle",
                DrawingPrimitive::Dimension(_) => "dimension",
            })
            .collect();
        assert_eq!(kinds, vec!["text", "dimension"]);
    }

    #[test]
    fn polyline_closed_by_flag_or_coincident_ends() {
        let open = Polyline {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
            layer: "0".to_string(),
            closed: false,
        };
        assert!(!open.is_closed());

        let mut explicit = open.clone();
        explicit.closed = true;
        assert!(explicit.is_closed());

        let mut coincident = open.clone();
        coincident.points.push(Point2::new(0.0, 0.0));
        assert!(coincident.is_closed());
    }

    #[test]
    fn bounds_from_points_handles_empty_input() {
        let empty: Vec<Point2> = Vec::new();
        assert!(Bounds2D::from_points(&empty).is_none());

        let points = [Point2::new(-5.0, 2.0), Point2::new(15.0, 12.0)];
        let bounds = Bounds2D::from_points(&points).expect("bounds");
        assert!((bounds.width() - 20.0).abs() < 1e-9);
        assert!((bounds.height() - 10.0).abs() < 1e-9);
        assert!((bounds.center().x() - 5.0).abs() < 1e-9);
        assert!((bounds.center().y() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn categories_map_to_disciplines() {
        assert_eq!(ItemCategory::Kolom.discipline(), Discipline::Struktur);
        assert_eq!(ItemCategory::Tangga.discipline(), Discipline::Struktur);
        assert_eq!(ItemCategory::Dinding.discipline(), Discipline::Arsitektur);
        assert_eq!(ItemCategory::Sprinkler.discipline(), Discipline::Mep);
        assert_eq!(ItemCategory::Unknown.discipline(), Discipline::Arsitektur);
        assert!(ItemCategory::Ring.is_height_dependent());
        assert!(!ItemCategory::Plat.is_height_dependent());
    }

    #[test]
    fn serde_tags_follow_report_conventions() {
        let category = serde_json::to_string(&ItemCategory::StopKontak).unwrap();
        assert_eq!(category, "\"stop kontak\"");
        let unit = serde_json::to_string(&Unit::CubicMeter).unwrap();
        assert_eq!(unit, "\"m3\"");
        let method = serde_json::to_string(&ExtractionMethod::GeometryFirst).unwrap();
        assert_eq!(method, "\"geometry-first\"");
        assert_eq!(Unit::SquareMeter.to_string(), "m²");

        let primitive: DrawingPrimitive = serde_json::from_str(
            r#"{"kind":"circle","center":[10.0,20.0],"radius":150.0,"layer":"KOLOM"}"#,
        )
        .unwrap();
        match primitive {
            DrawingPrimitive::Circle(circle) => {
                assert_eq!(circle.center, Point2::new(10.0, 20.0));
                assert_eq!(circle.layer, "KOLOM");
            }
            other => panic!("unexpected primitive: {other:?}"),
        }
    }
}
