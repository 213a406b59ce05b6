//! 从标注文字中提取构件尺寸。
//!
//! 规则按特异性排序，第一条匹配且至少产生一个正值的规则胜出，后续规则不再尝试。
//! 两位数默认按厘米处理，这是源图纸的主流习惯，并非保证。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::compile;

/// 解析结果，单位统一为米。任意分量都可能缺失，但三者不会同时缺失。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParsedDimensions {
    pub width: Option<f64>,
    pub length: Option<f64>,
    pub height: Option<f64>,
}

impl ParsedDimensions {
    #[inline]
    pub fn plan(width: f64, length: f64) -> Self {
        Self {
            width: Some(width),
            length: Some(length),
            height: None,
        }
    }

    #[inline]
    pub fn vertical(height: f64) -> Self {
        Self {
            width: None,
            length: None,
            height: Some(height),
        }
    }

    /// 至少一个分量为正。
    pub fn has_positive(&self) -> bool {
        [self.width, self.length, self.height]
            .into_iter()
            .flatten()
            .any(|value| value > 0.0)
    }

    /// 宽与长同时存在时返回二者。
    #[inline]
    pub fn plan_size(&self) -> Option<(f64, f64)> {
        match (self.width, self.length) {
            (Some(width), Some(length)) => Some((width, length)),
            _ => None,
        }
    }
}

/// 图纸中常见的长度单位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimeter,
    Centimeter,
    Meter,
}

impl LengthUnit {
    #[inline]
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            LengthUnit::Millimeter => value / 1000.0,
            LengthUnit::Centimeter => value / 100.0,
            LengthUnit::Meter => value,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "mm" => Some(LengthUnit::Millimeter),
            "cm" => Some(LengthUnit::Centimeter),
            "m" => Some(LengthUnit::Meter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    ExplicitUnit,
    DecimalPair,
    LargePair,
    TwoDigitPair,
    SlashPair,
    SpacedPair,
    Height,
    Thickness,
}

struct DimensionRule {
    kind: RuleKind,
    pattern: Regex,
}

static RULES: Lazy<Vec<DimensionRule>> = Lazy::new(|| {
    [
        (
            RuleKind::ExplicitUnit,
            r"(?i)(\d+\.?\d*)\s*[x×]\s*(\d+\.?\d*)\s*(mm|cm|m)\b",
        ),
        (RuleKind::DecimalPair, r"(?i)(\d*\.\d+)\s*[x×]\s*(\d*\.\d+)"),
        (RuleKind::LargePair, r"(?i)(\d{3,})\s*[x×]\s*(\d{3,})"),
        (RuleKind::TwoDigitPair, r"(?i)(\d{2})\s*[x×]\s*(\d{2})"),
        (RuleKind::SlashPair, r"(\d+)\s*/\s*(\d+)"),
        (RuleKind::SpacedPair, r"(?i)(\d+\.?\d*)\s+[x×]\s+(\d+\.?\d*)"),
        (
            RuleKind::Height,
            r"(?i)(?:^|[^a-z])h[eight]*(?:\s*[=:]\s*|\s+)(\d+\.?\d*)",
        ),
        (
            RuleKind::Thickness,
            r"(?i)(?:^|[^a-z])t[hick]*\s*[=:]\s*(\d+\.?\d*)",
        ),
    ]
    .into_iter()
    .map(|(kind, source)| DimensionRule {
        kind,
        pattern: compile(source),
    })
    .collect()
});

static UNIT_TOKEN: Lazy<Regex> = Lazy::new(|| compile(r"[a-z]+"));

fn number(captures: &Captures<'_>, index: usize) -> Option<f64> {
    captures.get(index)?.as_str().parse::<f64>().ok()
}

fn pair(captures: &Captures<'_>) -> Option<(f64, f64)> {
    Some((number(captures, 1)?, number(captures, 2)?))
}

impl DimensionRule {
    fn interpret(&self, captures: &Captures<'_>) -> Option<ParsedDimensions> {
        let parsed = match self.kind {
            RuleKind::ExplicitUnit => {
                let (first, second) = pair(captures)?;
                let token = captures.get(3)?.as_str().to_ascii_lowercase();
                let unit = LengthUnit::from_token(&token)?;
                ParsedDimensions::plan(unit.to_meters(first), unit.to_meters(second))
            }
            RuleKind::DecimalPair => {
                let (first, second) = pair(captures)?;
                ParsedDimensions::plan(first, second)
            }
            RuleKind::LargePair => {
                let (first, second) = pair(captures)?;
                ParsedDimensions::plan(first / 1000.0, second / 1000.0)
            }
            RuleKind::TwoDigitPair | RuleKind::SlashPair => {
                let (first, second) = pair(captures)?;
                ParsedDimensions::plan(first / 100.0, second / 100.0)
            }
            RuleKind::SpacedPair => {
                let (first, second) = pair(captures)?;
                let unit = if first >= 100.0 || second >= 100.0 {
                    LengthUnit::Millimeter
                } else if first >= 10.0 || second >= 10.0 {
                    LengthUnit::Centimeter
                } else {
                    LengthUnit::Meter
                };
                ParsedDimensions::plan(unit.to_meters(first), unit.to_meters(second))
            }
            RuleKind::Height => {
                let value = number(captures, 1)?;
                let height = if value >= 1000.0 {
                    value / 1000.0
                } else if value > 10.0 {
                    // 11..=999 都按厘米处理
                    value / 100.0
                } else {
                    value
                };
                ParsedDimensions::vertical(height)
            }
            RuleKind::Thickness => {
                let value = number(captures, 1)?;
                let thickness = if value >= 100.0 {
                    value / 1000.0
                } else if value >= 10.0 {
                    value / 100.0
                } else {
                    value
                };
                ParsedDimensions::vertical(thickness)
            }
        };
        parsed.has_positive().then_some(parsed)
    }
}

/// 无状态的尺寸解析器。
#[derive(Debug, Default, Clone, Copy)]
pub struct DimensionParser;

impl DimensionParser {
    pub fn new() -> Self {
        Self
    }

    /// 按优先级尝试每条规则，返回第一条有效结果；全部失败返回 `None`。
    pub fn parse(&self, text: &str) -> Option<ParsedDimensions> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        RULES.iter().find_map(|rule| {
            let captures = rule.pattern.captures(text)?;
            rule.interpret(&captures)
        })
    }

    /// 收集所有规则的所有匹配，按出现顺序去重。
    pub fn parse_all(&self, text: &str) -> Vec<ParsedDimensions> {
        let mut results: Vec<ParsedDimensions> = Vec::new();
        for rule in RULES.iter() {
            for captures in rule.pattern.captures_iter(text) {
                if let Some(parsed) = rule.interpret(&captures) {
                    if !results.contains(&parsed) {
                        results.push(parsed);
                    }
                }
            }
        }
        results
    }

    /// 推断单个数值的单位。上下文（图层名等）中独立出现的 `mm`/`cm`/`m` 优先，
    /// 否则按数量级：≥1000 毫米，≥10 厘米，其余视为米。
    pub fn infer_unit(&self, value: f64, context: Option<&str>) -> LengthUnit {
        if let Some(context) = context {
            let lowered = context.to_lowercase();
            let explicit = UNIT_TOKEN
                .find_iter(&lowered)
                .find_map(|token| LengthUnit::from_token(token.as_str()));
            if let Some(unit) = explicit {
                return unit;
            }
        }
        if value >= 1000.0 {
            LengthUnit::Millimeter
        } else if value >= 10.0 {
            LengthUnit::Centimeter
        } else {
            LengthUnit::Meter
        }
    }

    /// `infer_unit` 的便捷形式，直接换算为米。
    pub fn to_meters(&self, value: f64, context: Option<&str>) -> f64 {
        self.infer_unit(value, context).to_meters(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_dims(text: &str, width: Option<f64>, length: Option<f64>, height: Option<f64>) {
        let parsed = DimensionParser::new()
            .parse(text)
            .unwrap_or_else(|| panic!("expected dimensions for {text:?}"));
        for (label, actual, expected) in [
            ("width", parsed.width, width),
            ("length", parsed.length, length),
            ("height", parsed.height, height),
        ] {
            match (actual, expected) {
                (Some(actual), Some(expected)) => assert!(
                    (actual - expected).abs() < 1e-9,
                    "{text:?}: {label} = {actual}, expected {expected}"
                ),
                (None, None) => {}
                other => panic!("{text:?}: {label} mismatch {other:?}"),
            }
        }
    }

    #[test]
    fn pair_formats_resolve_to_meters() {
        assert_dims("20x30", Some(0.20), Some(0.30), None);
        assert_dims("200x300", Some(0.20), Some(0.30), None);
        assert_dims("200 X 300", Some(0.20), Some(0.30), None);
        assert_dims("20 x 30", Some(0.20), Some(0.30), None);
        assert_dims("0.2x0.3", Some(0.20), Some(0.30), None);
        assert_dims("15/25", Some(0.15), Some(0.25), None);
        assert_dims("Balok 25/60", Some(0.25), Some(0.60), None);
        assert_dims("20×30", Some(0.20), Some(0.30), None);
    }

    #[test]
    fn explicit_unit_wins_over_magnitude() {
        assert_dims("200x300mm", Some(0.20), Some(0.30), None);
        assert_dims("20x30cm", Some(0.20), Some(0.30), None);
        assert_dims("0.2x0.3m", Some(0.20), Some(0.30), None);
        assert_dims("KOLOM 300x400MM", Some(0.30), Some(0.40), None);
    }

    #[test]
    fn unit_suffix_must_end_the_word() {
        // "MDP" 不是单位，退回大数规则
        assert_dims("600x400 MDP", Some(0.60), Some(0.40), None);
    }

    #[test]
    fn spaced_pair_infers_unit_by_magnitude() {
        assert_dims("2 x 3", Some(2.0), Some(3.0), None);
        assert_dims("1.5 x 2", Some(1.5), Some(2.0), None);
    }

    #[test]
    fn height_and_thickness_markers() {
        assert_dims("H=400", None, None, Some(4.0));
        assert_dims("h=4.0", None, None, Some(4.0));
        assert_dims("HEIGHT=400", None, None, Some(4.0));
        assert_dims("h:400", None, None, Some(4.0));
        assert_dims("H 3500", None, None, Some(3.5));
        assert_dims("H=40", None, None, Some(0.4));
        assert_dims("T=150", None, None, Some(0.15));
        assert_dims("t=0.15", None, None, Some(0.15));
        assert_dims("THICK=12", None, None, Some(0.12));
    }

    #[test]
    fn first_rule_wins_in_combined_labels() {
        assert_dims("K1 (30x40) H=400", Some(0.30), Some(0.40), None);
    }

    #[test]
    fn unparseable_text_yields_none() {
        let parser = DimensionParser::new();
        assert!(parser.parse("no digits here").is_none());
        assert!(parser.parse("").is_none());
        assert!(parser.parse("   ").is_none());
        assert!(parser.parse("0x0").is_none());
        assert!(parser.parse("Kolom K1").is_none());
    }

    #[test]
    fn parse_all_collects_every_distinct_match() {
        let parser = DimensionParser::new();
        let all = parser.parse_all("K1 30x40 H=400 / K2 30x40");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].plan_size(), Some((0.3, 0.4)));
        assert_eq!(all[1].height, Some(4.0));
    }

    #[test]
    fn infer_unit_prefers_context_tokens() {
        let parser = DimensionParser::new();
        assert_eq!(parser.infer_unit(400.0, Some("DIM_mm")), LengthUnit::Millimeter);
        assert_eq!(parser.infer_unit(400.0, Some("ukuran cm")), LengthUnit::Centimeter);
        assert_eq!(parser.infer_unit(400.0, Some("level M")), LengthUnit::Meter);
        // 仅作为单词的一部分出现时不算
        assert_eq!(parser.infer_unit(4000.0, Some("KOLOM")), LengthUnit::Millimeter);
        assert_eq!(parser.infer_unit(400.0, None), LengthUnit::Centimeter);
        assert_eq!(parser.infer_unit(40.0, None), LengthUnit::Centimeter);
        assert_eq!(parser.infer_unit(4.0, None), LengthUnit::Meter);
        assert!((parser.to_meters(4000.0, None) - 4.0).abs() < 1e-9);
    }
}
