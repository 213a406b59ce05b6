//! 图纸工程量与预算（RAB）对比。
//!
//! 名称相似度采用 Ratcliff/Obershelp 算法，关键材料（混凝土标号、钢筋直径等）要求更高阈值，
//! 规格记号不一致时直接判为不同材料。

use once_cell::sync::Lazy;
use regex::Regex;
use takeoff_core::quantity::{EstimateLineItem, QuantityItem};
use tracing::info;

use crate::compile;

const CRITICAL_MATERIALS: [&str; 21] = [
    "beton k-",
    "beton ready mix",
    "beton fc",
    "besi diameter",
    "besi d",
    "besi ulir",
    "besi polos",
    "tulangan",
    "wiremesh",
    "kawat",
    "semen",
    "pasir",
    "split",
    "keramik",
    "granit",
    "marmer",
    "pipa pvc",
    "kabel nyyhy",
    "kabel nyy",
    "ac split",
    "pompa",
];

pub const CRITICAL_THRESHOLD: f64 = 0.90;
pub const STANDARD_THRESHOLD: f64 = 0.85;
const CRITICAL_CONTAINMENT_SCORE: f64 = 0.92;
const STANDARD_CONTAINMENT_SCORE: f64 = 0.88;
const GRADE_MISMATCH_SCORE: f64 = 0.5;
const LARGE_DEVIATION_PERCENT: f64 = 10.0;
const SMALL_DEVIATION_PERCENT: f64 = 5.0;

static GRADE_TOKENS: Lazy<Regex> =
    Lazy::new(|| compile(r#"k-?\d+|d\s*\d+|fc\s*\d+|\d+x\d+\.?\d*\s*mm|\d+/\d+""#));

/// 对比结果状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileStatus {
    Match,
    /// 关键材料名称相似度低于 90%，需人工复核。
    ReviewCritical,
    SmallDeviation,
    LargeDeviation,
    DrawingOnly,
    EstimateOnly,
}

impl ReconcileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileStatus::Match => "MATCH",
            ReconcileStatus::ReviewCritical => "REVIEW",
            ReconcileStatus::SmallDeviation => "SELISIH KECIL",
            ReconcileStatus::LargeDeviation => "SELISIH BESAR",
            ReconcileStatus::DrawingOnly => "HANYA DI GAMBAR",
            ReconcileStatus::EstimateOnly => "HANYA DI RAB",
        }
    }
}

/// 对比表中的一行。只存在于单侧时，另一侧名称为 `None`、体积为 0。
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRow {
    pub drawing_item: Option<String>,
    pub estimate_item: Option<String>,
    pub unit: String,
    pub drawing_volume: f64,
    pub estimate_volume: f64,
    pub difference: f64,
    pub difference_percent: f64,
    pub status: ReconcileStatus,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub review: usize,
    pub deviations: usize,
    pub drawing_only: usize,
    pub estimate_only: usize,
}

impl ReconciliationSummary {
    pub fn from_rows(rows: &[ReconciliationRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            match row.status {
                ReconcileStatus::Match => summary.matched += 1,
                ReconcileStatus::ReviewCritical => summary.review += 1,
                ReconcileStatus::SmallDeviation | ReconcileStatus::LargeDeviation => {
                    summary.deviations += 1
                }
                ReconcileStatus::DrawingOnly => summary.drawing_only += 1,
                ReconcileStatus::EstimateOnly => summary.estimate_only += 1,
            }
        }
        summary
    }
}

/// 名称是否属于关键材料。
pub fn is_critical_material(item: &str) -> bool {
    let lowered = item.to_lowercase();
    CRITICAL_MATERIALS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

pub fn required_threshold(item: &str) -> f64 {
    if is_critical_material(item) {
        CRITICAL_THRESHOLD
    } else {
        STANDARD_THRESHOLD
    }
}

/// Ratcliff/Obershelp 相似度：`2 * 匹配字符数 / 总长度`，两者都为空时为 1。
pub fn gestalt_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let Some((start_a, start_b, size)) = longest_common_block(a, b) else {
        return 0;
    };
    size + matching_characters(&a[..start_a], &b[..start_b])
        + matching_characters(&a[start_a + size..], &b[start_b + size..])
}

/// 最长公共子串，平局时取在 `a` 中最靠前、其次在 `b` 中最靠前的。
fn longest_common_block(a: &[char], b: &[char]) -> Option<(usize, usize, usize)> {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    let mut best: Option<(usize, usize, usize)> = None;
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb { previous[j] + 1 } else { 0 };
            let size = current[j + 1];
            if size > best.map_or(0, |(_, _, best_size)| best_size) {
                best = Some((i + 1 - size, j + 1 - size, size));
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

/// 名称相似度。`check_threshold` 为真时低于阈值返回 0；阈值由第一个名称决定。
pub fn item_similarity(first: &str, second: &str, check_threshold: bool) -> f64 {
    let first_clean = first.trim().to_lowercase();
    let second_clean = second.trim().to_lowercase();
    if first_clean == second_clean {
        return 1.0;
    }

    let contains = first_clean.contains(&second_clean) || second_clean.contains(&first_clean);
    let critical = is_critical_material(first);
    let similarity = if critical {
        let first_grades = grade_tokens(&first_clean);
        let second_grades = grade_tokens(&second_clean);
        let disjoint = !first_grades.is_empty()
            && !second_grades.is_empty()
            && !first_grades.iter().any(|grade| second_grades.contains(grade));
        if disjoint {
            GRADE_MISMATCH_SCORE
        } else if contains {
            CRITICAL_CONTAINMENT_SCORE
        } else {
            gestalt_ratio(&first_clean, &second_clean)
        }
    } else if contains {
        STANDARD_CONTAINMENT_SCORE
    } else {
        gestalt_ratio(&first_clean, &second_clean)
    };

    if check_threshold && similarity < required_threshold(first) {
        0.0
    } else {
        similarity
    }
}

fn grade_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = GRADE_TOKENS
        .find_iter(text)
        .map(|token| token.as_str().to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// 逐条对比图纸条目与预算行，再补充只出现在预算中的行。
pub fn reconcile(items: &[QuantityItem], estimate: &[EstimateLineItem]) -> Vec<ReconciliationRow> {
    let mut rows = Vec::with_capacity(items.len() + estimate.len());

    for item in items {
        let best = estimate
            .iter()
            .map(|line| (line, item_similarity(&item.item, &line.item, true)))
            .fold(None, |best: Option<(&EstimateLineItem, f64)>, (line, similarity)| {
                if similarity > 0.0 && similarity > best.map_or(0.0, |(_, score)| score) {
                    Some((line, similarity))
                } else {
                    best
                }
            });

        let row = match best {
            Some((line, similarity)) => {
                let difference = item.volume - line.volume;
                let difference_percent = if line.volume > 0.0 {
                    difference / line.volume * 100.0
                } else {
                    0.0
                };
                let mut status = ReconcileStatus::Match;
                let critical = is_critical_material(&item.item) || is_critical_material(&line.item);
                if critical && similarity < CRITICAL_THRESHOLD {
                    status = ReconcileStatus::ReviewCritical;
                }
                if difference_percent.abs() > LARGE_DEVIATION_PERCENT {
                    status = ReconcileStatus::LargeDeviation;
                } else if difference_percent.abs() > SMALL_DEVIATION_PERCENT {
                    status = ReconcileStatus::SmallDeviation;
                }
                ReconciliationRow {
                    drawing_item: Some(item.item.clone()),
                    estimate_item: Some(line.item.clone()),
                    unit: item.unit.to_string(),
                    drawing_volume: item.volume,
                    estimate_volume: line.volume,
                    difference,
                    difference_percent,
                    status,
                    similarity,
                }
            }
            None => ReconciliationRow {
                drawing_item: Some(item.item.clone()),
                estimate_item: None,
                unit: item.unit.to_string(),
                drawing_volume: item.volume,
                estimate_volume: 0.0,
                difference: item.volume,
                difference_percent: 100.0,
                status: ReconcileStatus::DrawingOnly,
                similarity: 0.0,
            },
        };
        rows.push(row);
    }

    let drawing_rows = rows.len();
    for line in estimate {
        let already_matched = rows[..drawing_rows].iter().any(|row| {
            row.drawing_item
                .as_deref()
                .is_some_and(|name| item_similarity(&line.item, name, true) > 0.0)
        });
        if already_matched {
            continue;
        }
        rows.push(ReconciliationRow {
            drawing_item: None,
            estimate_item: Some(line.item.clone()),
            unit: line.unit.clone(),
            drawing_volume: 0.0,
            estimate_volume: line.volume,
            difference: -line.volume,
            difference_percent: -100.0,
            status: ReconcileStatus::EstimateOnly,
            similarity: 0.0,
        });
    }

    let summary = ReconciliationSummary::from_rows(&rows);
    info!(
        rows = rows.len(),
        matched = summary.matched,
        deviations = summary.deviations,
        drawing_only = summary.drawing_only,
        estimate_only = summary.estimate_only,
        "预算对比完成"
    );
    rows
}
