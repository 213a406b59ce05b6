use takeoff_core::drawing::Polyline;
use takeoff_core::geometry::Point2;
use tracing::warn;

pub const DEFAULT_VOID_WARNING_RATIO: f64 = 0.30;

/// 外轮廓内检测到的一个洞口。
#[derive(Debug, Clone, PartialEq)]
pub struct VoidRecord {
    pub points: Vec<Point2>,
    /// 已换算为平方米。
    pub area: f64,
    pub layer: String,
}

/// 一次洞口扣减的结果，面积均为平方米。
#[derive(Debug, Clone, PartialEq)]
pub struct VoidAnalysis {
    pub gross_area: f64,
    pub net_area: f64,
    pub voids: Vec<VoidRecord>,
}

impl VoidAnalysis {
    pub fn void_area(&self) -> f64 {
        self.voids.iter().map(|record| record.area).sum()
    }

    /// 洞口面积占外轮廓面积的比例；外轮廓面积为 0 时返回 0。
    pub fn void_ratio(&self) -> f64 {
        if self.gross_area > 0.0 {
            self.void_area() / self.gross_area
        } else {
            0.0
        }
    }
}

/// 多段线包含关系与面积计算。
#[derive(Debug, Clone, Copy)]
pub struct VoidDetector {
    warning_ratio: f64,
}

impl Default for VoidDetector {
    fn default() -> Self {
        Self {
            warning_ratio: DEFAULT_VOID_WARNING_RATIO,
        }
    }
}

impl VoidDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warning_ratio(warning_ratio: f64) -> Self {
        Self { warning_ratio }
    }

    #[inline]
    pub fn warning_ratio(&self) -> f64 {
        self.warning_ratio
    }

    /// 射线法。右侧边界上的点计为内部；水平边与顶点同高时结果可能翻转，CAD 容差下可接受。
    pub fn point_in_polygon(point: Point2, polygon: &[Point2]) -> bool {
        let n = polygon.len();
        if n < 3 {
            return false;
        }
        let (x, y) = (point.x(), point.y());
        let mut inside = false;
        let mut p1 = polygon[0];
        for index in 1..=n {
            let p2 = polygon[index % n];
            let (p1x, p1y, p2x, p2y) = (p1.x(), p1.y(), p2.x(), p2.y());
            if y > p1y.min(p2y) && y <= p1y.max(p2y) && x <= p1x.max(p2x) {
                // 此分支内 p1y != p2y 恒成立
                let crosses = p1x == p2x || {
                    let x_intersection = (y - p1y) * (p2x - p1x) / (p2y - p1y) + p1x;
                    x <= x_intersection
                };
                if crosses {
                    inside = !inside;
                }
            }
            p1 = p2;
        }
        inside
    }

    /// 鞋带公式，返回输入坐标单位的平方，不做单位换算。少于 3 个点返回 0。
    pub fn polygon_area(points: &[Point2]) -> f64 {
        let n = points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = points[i];
                let b = points[(i + 1) % n];
                a.x() * b.y() - b.x() * a.y()
            })
            .sum();
        twice.abs() / 2.0
    }

    /// 内多段线的每个顶点都在外轮廓内即视为包含；不检查边相交。
    pub fn polyline_contains_polyline(outer: &[Point2], inner: &[Point2]) -> bool {
        inner
            .iter()
            .all(|point| Self::point_in_polygon(*point, outer))
    }

    /// 按数量级把面积换算为平方米：>100000 视为 mm²，>1000 视为 cm²，其余已是 m²。
    pub fn normalize_area(raw: f64) -> f64 {
        if raw > 100_000.0 {
            raw / 1_000_000.0
        } else if raw > 1_000.0 {
            raw / 10_000.0
        } else {
            raw
        }
    }

    /// 计算外轮廓扣除洞口后的净面积。首顶点与外轮廓相同的候选视为外轮廓自身。
    pub fn detect_voids_in_polyline(&self, outer: &[Point2], candidates: &[Polyline]) -> VoidAnalysis {
        let gross_area = Self::normalize_area(Self::polygon_area(outer));
        let mut voids = Vec::new();

        for candidate in candidates {
            let inner = candidate.points.as_slice();
            if inner.len() < 3 {
                continue;
            }
            if outer.first() == inner.first() {
                continue;
            }
            if Self::polyline_contains_polyline(outer, inner) {
                voids.push(VoidRecord {
                    points: inner.to_vec(),
                    area: Self::normalize_area(Self::polygon_area(inner)),
                    layer: candidate.layer.clone(),
                });
            }
        }

        let void_area: f64 = voids.iter().map(|record| record.area).sum();
        let analysis = VoidAnalysis {
            gross_area,
            net_area: gross_area - void_area,
            voids,
        };

        if analysis.void_ratio() > self.warning_ratio {
            warn!(
                ratio = analysis.void_ratio() * 100.0,
                gross = gross_area,
                voids = analysis.void_area(),
                "洞口面积占比偏高"
            );
        }
        analysis
    }
}
