use std::fmt::{self, Write};

use takeoff_core::quantity::{ExtractionMethod, Unit};
use takeoff_engine::{CalculationReport, ReconciliationRow, ReconciliationSummary};

const METHODS: [ExtractionMethod; 4] = [
    ExtractionMethod::GeometryFirst,
    ExtractionMethod::TextExtraction,
    ExtractionMethod::PolylineArea,
    ExtractionMethod::CircleVolume,
];

/// 控制台摘要：分类合计、来源分布、总量与警告。
pub fn write_summary(out: &mut impl Write, report: &CalculationReport) -> fmt::Result {
    writeln!(
        out,
        "工程量汇总：{} 条（合并前 {} 条）",
        report.items.len(),
        report.raw_item_count
    )?;
    for summary in report.summary_by_category() {
        writeln!(
            out,
            "  {:<12} 数量 {:>4}  合计 {:>10.3}",
            summary.category.as_str(),
            summary.count,
            summary.volume
        )?;
    }

    let sources: Vec<String> = METHODS
        .iter()
        .filter_map(|method| {
            let count = report.items.iter().filter(|item| item.method == *method).count();
            (count > 0).then(|| format!("{} {count}", method.as_str()))
        })
        .collect();
    if !sources.is_empty() {
        writeln!(out, "来源：{}", sources.join("，"))?;
    }

    writeln!(
        out,
        "合计：{:.3} {}，{:.3} {}",
        report.total_volume(Unit::CubicMeter),
        Unit::CubicMeter,
        report.total_volume(Unit::SquareMeter),
        Unit::SquareMeter
    )?;
    if !report.warnings.is_empty() {
        writeln!(out, "警告 {} 条：", report.warnings.len())?;
        for warning in &report.warnings {
            writeln!(out, "- {warning}")?;
        }
    }
    Ok(())
}

pub fn write_reconciliation(out: &mut impl Write, rows: &[ReconciliationRow]) -> fmt::Result {
    writeln!(out, "预算对比：")?;
    for row in rows {
        writeln!(
            out,
            "  [{}] {} | {}：图纸 {:.3} / 预算 {:.3} ({:+.1}%)",
            row.status.as_str(),
            row.drawing_item.as_deref().unwrap_or("-"),
            row.estimate_item.as_deref().unwrap_or("-"),
            row.drawing_volume,
            row.estimate_volume,
            row.difference_percent
        )?;
    }
    let summary = ReconciliationSummary::from_rows(rows);
    writeln!(
        out,
        "一致 {}，复核 {}，偏差 {}，仅图纸 {}，仅预算 {}",
        summary.matched,
        summary.review,
        summary.deviations,
        summary.drawing_only,
        summary.estimate_only
    )
}
