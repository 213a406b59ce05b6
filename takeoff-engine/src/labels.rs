//! 标注文字的清洗、缩写展开、分类、构件编号、轴号与楼层识别。

use once_cell::sync::Lazy;
use regex::Regex;
use takeoff_core::geometry::Point2;
use takeoff_core::quantity::ItemCategory;

use crate::compile;
use crate::grid::GridDetector;

/// 分类关键字表，按优先级排列，子串匹配，第一个命中的分类胜出。
pub const CATEGORY_KEYWORDS: &[(ItemCategory, &[&str])] = &[
    (
        ItemCategory::Kolom,
        &["kolom", "column", "k1", "k2", "k3", "k4", "col"],
    ),
    (
        ItemCategory::Balok,
        &["balok", "beam", "b1", "b2", "b3", "b4", "bm"],
    ),
    (
        ItemCategory::Plat,
        &["plat", "slab", "lantai", "floor", "dak", "pl"],
    ),
    (
        ItemCategory::Sloof,
        &["sloof", "tie beam", "ground beam", "s1", "s2"],
    ),
    (
        ItemCategory::Pondasi,
        &["pondasi", "foundation", "footplate", "foot", "p1", "p2", "p3"],
    ),
    (ItemCategory::Dinding, &["dinding", "wall", "tembok"]),
    (ItemCategory::Ring, &["ring", "ring balok", "ring balk"]),
    (ItemCategory::Tangga, &["tangga", "stair", "stairs"]),
    (
        ItemCategory::Ac,
        &[
            "ac",
            "air conditioner",
            "return air grille",
            "supply air diffuser",
            "supply air grille",
            "fresh air diffuser",
            "exhaust grille",
        ],
    ),
    (ItemCategory::Ducting, &["ducting", "duct", "saluran udara"]),
    (
        ItemCategory::Grille,
        &["grille", "diffuser", "rag", "sad", "sag", "fad", "exh", "eg"],
    ),
    (
        ItemCategory::Pipa,
        &["pipa", "pipe", "pwc", "swp", "vwp", "saluran"],
    ),
    (ItemCategory::Hydrant, &["hydrant", "hyd", "pemadam"]),
    (ItemCategory::Sprinkler, &["sprinkler", "spr"]),
    (
        ItemCategory::Gas,
        &["gas", "medis", "o2", "oxygen", "vac", "vacuum", "compressed air"],
    ),
    (ItemCategory::Kabel, &["kabel", "cable", "wire"]),
    (
        ItemCategory::Panel,
        &["panel", "mdp", "sdp", "lp", "pp", "distribution"],
    ),
    (ItemCategory::Lampu, &["lampu", "lighting", "light", "led"]),
    (
        ItemCategory::StopKontak,
        &["stop kontak", "sk", "outlet", "power outlet"],
    ),
];

/// 首词缩写到全称的映射（机电与结构）。
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("RAG", "Return Air Grille"),
    ("SAG", "Supply Air Grille"),
    ("SAD", "Supply Air Diffuser"),
    ("FAD", "Fresh Air Diffuser"),
    ("EXH", "Exhaust Grille"),
    ("EG", "Exhaust Grille"),
    ("AC", "Air Conditioner"),
    ("FCU", "Fan Coil Unit"),
    ("AHU", "Air Handling Unit"),
    ("DUCT", "Ducting"),
    ("VRV", "Variable Refrigerant Volume"),
    ("PWC", "Pipa Air Bersih/Clean Water Pipe"),
    ("SWP", "Pipa Air Kotor/Soil Water Pipe"),
    ("VWP", "Pipa Air Bekas/Vent Water Pipe"),
    ("HYD", "Hydrant"),
    ("SPR", "Sprinkler"),
    ("GAS", "Gas Medis/Medical Gas"),
    ("O2", "Oxygen"),
    ("VAC", "Vacuum"),
    ("AIR", "Compressed Air"),
    ("MDP", "Main Distribution Panel"),
    ("SDP", "Sub Distribution Panel"),
    ("LP", "Lighting Panel"),
    ("PP", "Power Panel"),
    ("SK", "Stop Kontak/Power Outlet"),
    ("LAMPU", "Lighting"),
    ("KABEL", "Cable"),
    ("K", "Kolom/Column"),
    ("B", "Balok/Beam"),
    ("S", "Sloof"),
    ("P", "Pondasi/Foundation"),
    ("PL", "Plat/Slab"),
];

const FLOOR_MAPPING: &[(&str, &str)] = &[
    ("basement", "Basement"),
    ("lt_1", "Lantai 1"),
    ("lt_2", "Lantai 2"),
    ("lt1", "Lantai 1"),
    ("lt2", "Lantai 2"),
    ("lantai_1", "Lantai 1"),
    ("lantai_2", "Lantai 2"),
    ("ground", "Lantai 1"),
    ("atap", "Atap"),
    ("roof", "Atap"),
    ("lt 1", "Lantai 1"),
    ("lt 2", "Lantai 2"),
    ("bsmt", "Basement"),
];

pub const UNKNOWN_FLOOR: &str = "Unknown";

/// MTEXT 格式控制码，直接删除。
static FORMAT_CODES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\\pxsm\d+,\w+;",
        r"\{\\W[\d.]+;",
        r"\\f[^;]+;",
        r"\\[HhCcTtAa][\d.]+x?;",
    ]
    .into_iter()
    .map(compile)
    .collect()
});
static PARAGRAPH_MARK: Lazy<Regex> = Lazy::new(|| compile(r"\\[PpLl]"));
static BRACES: Lazy<Regex> = Lazy::new(|| compile(r"[{}]"));
static DOUBLE_BACKSLASH: Lazy<Regex> = Lazy::new(|| compile(r"\\\\"));
static LETTER_DOT_DIGIT: Lazy<Regex> = Lazy::new(|| compile(r"([A-Za-z])\.(\d)"));

static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b([KBPS])(\d{1,2})\b",
        r"\b(PL)(\d{1,2})\b",
        r"([KBPS])[-\s]*(\d{1,2})",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static GRID_AFTER_AS: Lazy<Regex> = Lazy::new(|| compile(r"[Aa][Ss]\s*([A-Z]\d+)"));
static GRID_AFTER_KEYWORD: Lazy<Regex> = Lazy::new(|| compile(r"[Gg]rid\s*([A-Z]\d+)"));
static GRID_STANDALONE: Lazy<Regex> = Lazy::new(|| compile(r"\b([A-Z]\d+)\b"));
static GRID_SPAN: Lazy<Regex> = Lazy::new(|| compile(r"[Aa][Ss]\s*([A-Z])-([A-Z])"));

/// 去掉 AutoCAD MTEXT 格式码。
///
/// `{\T0.9;\fISOCPEUR|b0|i0|c0|p34;\C0;SAD.600x400}` 变为 `SAD 600x400`。
pub fn clean_autocad_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in FORMAT_CODES.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned = PARAGRAPH_MARK.replace_all(&cleaned, " ").into_owned();
    cleaned = BRACES.replace_all(&cleaned, "").into_owned();
    cleaned = DOUBLE_BACKSLASH.replace_all(&cleaned, "").into_owned();
    cleaned = LETTER_DOT_DIGIT.replace_all(&cleaned, "$1 $2").into_owned();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 首词若是已知缩写则替换为全称，其余部分保持不变。
pub fn expand_abbreviation(text: &str) -> String {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return text.to_string();
    };
    let first = first.to_uppercase();
    let Some((_, full)) = ABBREVIATIONS.iter().find(|(short, _)| *short == first) else {
        return text.to_string();
    };
    let rest: Vec<&str> = words.collect();
    if rest.is_empty() {
        (*full).to_string()
    } else {
        format!("{full} {}", rest.join(" "))
    }
}

/// 原文与清洗后文字都至少 2 个字符才视为有效标注。
pub fn normalize_label(raw: &str) -> Option<String> {
    if raw.trim().chars().count() < 2 {
        return None;
    }
    let expanded = expand_abbreviation(&clean_autocad_text(raw));
    if expanded.trim().chars().count() < 2 {
        return None;
    }
    Some(expanded)
}

/// 在 `文字 + 空格 + 图层` 的小写形式上做子串匹配。
pub fn classify(text: &str, layer: &str) -> ItemCategory {
    let combined = format!("{} {}", text.to_lowercase(), layer.to_lowercase());
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| combined.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(ItemCategory::Unknown)
}

/// 构件编号，如 `K1`、`B2`、`PL1`；宽松形式 `K-1` 归一为 `K1`。
pub fn extract_code(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    CODE_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(&upper)?;
        Some(format!("{}{}", &captures[1], &captures[2]))
    })
}

/// 优先读取文字中的轴号（`As A1`、`Grid A1`、独立的 `A1`、`As A-B`），
/// 否则取最近的轴网交点。与构件编号相同的独立记号不作轴号。
pub fn extract_grid_reference(
    text: &str,
    code: Option<&str>,
    position: Point2,
    grids: &GridDetector,
) -> String {
    if let Some(captures) = GRID_AFTER_AS.captures(text) {
        return captures[1].to_string();
    }
    if let Some(captures) = GRID_AFTER_KEYWORD.captures(text) {
        return captures[1].to_string();
    }
    let standalone = GRID_STANDALONE
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .find(|token| code != Some(token.as_str()));
    if let Some(token) = standalone {
        return token;
    }
    if let Some(captures) = GRID_SPAN.captures(text) {
        return format!("{}-{}", &captures[1], &captures[2]);
    }
    grids.find_nearest_grid(position)
}

/// 从图层名识别楼层，识别不到时返回 `Unknown`。
pub fn floor_from_layer(layer: &str) -> String {
    let lowered = layer.to_lowercase();
    FLOOR_MAPPING
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, floor)| (*floor).to_string())
        .unwrap_or_else(|| UNKNOWN_FLOOR.to_string())
}

#[cfg(test)]
mod tests {
    use takeoff_core::drawing::TextLabel;

    use super::*;

    #[test]
    fn strips_mtext_formatting() {
        assert_eq!(
            clean_autocad_text(r"\pxsm1,qd;{\W0.85;\fISOCPEUR|b0|i0|c0|p34;\H0.8x;RAG\P400x600mm}"),
            "RAG 400x600mm"
        );
        assert_eq!(
            clean_autocad_text(r"{\T0.9;\fISOCPEUR|b0|i0|c0|p34;\C0;SAD.600x400}"),
            "SAD 600x400"
        );
        assert_eq!(clean_autocad_text("  K1   0.3x0.4 "), "K1 0.3x0.4");
        assert_eq!(clean_autocad_text(""), "");
    }

    #[test]
    fn expands_leading_abbreviation_only() {
        assert_eq!(expand_abbreviation("RAG 400x600mm"), "Return Air Grille 400x600mm");
        assert_eq!(expand_abbreviation("sad 600x400"), "Supply Air Diffuser 600x400");
        assert_eq!(expand_abbreviation("MDP"), "Main Distribution Panel");
        assert_eq!(expand_abbreviation("K1 30x40"), "K1 30x40");
        assert_eq!(expand_abbreviation("Kolom AC"), "Kolom AC");
        assert_eq!(expand_abbreviation(""), "");
    }

    #[test]
    fn short_labels_are_rejected() {
        assert_eq!(normalize_label("A"), None);
        assert_eq!(normalize_label(" 1 "), None);
        assert_eq!(normalize_label("{}"), None);
        assert_eq!(normalize_label("K 30x40").as_deref(), Some("Kolom/Column 30x40"));
    }

    #[test]
    fn classification_follows_priority_order() {
        assert_eq!(classify("K1 30x40", ""), ItemCategory::Kolom);
        assert_eq!(classify("Balok 25/60", ""), ItemCategory::Balok);
        assert_eq!(classify("", "LT_1_SLAB"), ItemCategory::Plat);
        assert_eq!(classify("Tie Beam", ""), ItemCategory::Balok);
        assert_eq!(classify("Hydrant Box", ""), ItemCategory::Hydrant);
        assert_eq!(classify("Kabel NYY", ""), ItemCategory::Kabel);
        assert_eq!(classify("text", "0"), ItemCategory::Unknown);
    }

    #[test]
    fn item_codes() {
        assert_eq!(extract_code("K1 30x40").as_deref(), Some("K1"));
        assert_eq!(extract_code("balok b12 25/60").as_deref(), Some("B12"));
        assert_eq!(extract_code("PL3 t=12").as_deref(), Some("PL3"));
        assert_eq!(extract_code("K-2").as_deref(), Some("K2"));
        assert_eq!(extract_code("none here").as_deref(), None);
    }

    fn grids() -> GridDetector {
        let mut detector = GridDetector::new();
        detector.detect_grid_bubbles(&[
            TextLabel {
                content: "C".to_string(),
                position: Point2::new(0.0, 0.0),
                layer: "GRID".to_string(),
            },
            TextLabel {
                content: "3".to_string(),
                position: Point2::new(0.0, 0.0),
                layer: "GRID".to_string(),
            },
        ]);
        detector
    }

    #[test]
    fn grid_reference_from_text_or_position() {
        let grids = grids();
        let origin = Point2::new(0.0, 0.0);
        assert_eq!(extract_grid_reference("K1 As B2", Some("K1"), origin, &grids), "B2");
        assert_eq!(extract_grid_reference("Grid D4", None, origin, &grids), "D4");
        assert_eq!(extract_grid_reference("K1 A7", Some("K1"), origin, &grids), "A7");
        assert_eq!(extract_grid_reference("Balok As A-B", None, origin, &grids), "A-B");
        // 编号本身不是轴号，回退到最近轴网
        assert_eq!(extract_grid_reference("K1 30x40", Some("K1"), origin, &grids), "C3");
        assert_eq!(
            extract_grid_reference("KOLOM", None, origin, &GridDetector::new()),
            "Unknown"
        );
    }

    #[test]
    fn floors_from_layer_names() {
        assert_eq!(floor_from_layer("LT_1_KOLOM"), "Lantai 1");
        assert_eq!(floor_from_layer("Lantai_2 Balok"), "Lantai 2");
        assert_eq!(floor_from_layer("BASEMENT-PLAT"), "Basement");
        assert_eq!(floor_from_layer("bsmt kolom"), "Basement");
        assert_eq!(floor_from_layer("ROOF"), "Atap");
        assert_eq!(floor_from_layer("GROUND FLOOR"), "Lantai 1");
        assert_eq!(floor_from_layer("lt 2 kolom"), "Lantai 2");
        assert_eq!(floor_from_layer("KOLOM"), UNKNOWN_FLOOR);
    }
}
