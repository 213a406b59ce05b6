use std::collections::{BTreeMap, HashMap};

use takeoff_core::quantity::{Discipline, ItemCategory, QuantityItem};
use tracing::info;

/// 楼层 + 轴网汇总行。
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTotal {
    pub floor: String,
    pub grid: String,
    pub count: u32,
    pub volume: f64,
}

/// 单一分类的数量与体积合计。
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: ItemCategory,
    pub count: u32,
    pub volume: f64,
}

/// 按复合键合并工程量条目。同键条目只累加数量与体积，其余字段保留首个条目。
#[derive(Debug, Default, Clone, Copy)]
pub struct ItemAggregator;

impl ItemAggregator {
    /// 位置敏感的主键：楼层、轴网、名称、编号与三向尺寸。
    pub fn location_key(item: &QuantityItem) -> String {
        format!(
            "{}_{}_{}_{}_{:.3}_{:.3}_{:.3}",
            item.floor,
            item.grid,
            item.item,
            item.code,
            item.length,
            item.width,
            item.height.unwrap_or(0.0)
        )
    }

    /// 仅按名称与尺寸，用于材料总量统计。
    pub fn item_type_key(item: &QuantityItem) -> String {
        format!(
            "{}_{:.3}_{:.3}_{:.3}",
            item.item,
            item.length,
            item.width,
            item.height.unwrap_or(0.0)
        )
    }

    pub fn aggregate(items: Vec<QuantityItem>) -> Vec<QuantityItem> {
        let before = items.len();
        let merged = Self::merge_by(items, Self::location_key);
        info!(before, after = merged.len(), "按楼层/轴网/构件合并完成");
        merged
    }

    pub fn aggregate_by_item_type(items: Vec<QuantityItem>) -> Vec<QuantityItem> {
        Self::merge_by(items, Self::item_type_key)
    }

    pub fn aggregate_by_location(items: &[QuantityItem]) -> Vec<LocationTotal> {
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        let mut totals: Vec<LocationTotal> = Vec::new();
        for item in items {
            let key = (item.floor.clone(), item.grid.clone());
            match index.get(&key) {
                Some(&slot) => {
                    let total = &mut totals[slot];
                    total.count = total.count.saturating_add(item.count);
                    total.volume += item.volume;
                }
                None => {
                    index.insert(key, totals.len());
                    totals.push(LocationTotal {
                        floor: item.floor.clone(),
                        grid: item.grid.clone(),
                        count: item.count,
                        volume: item.volume,
                    });
                }
            }
        }
        totals
    }

    /// 每个分类的合计，按分类顺序输出。
    pub fn summarize_by_category(items: &[QuantityItem]) -> Vec<CategorySummary> {
        let mut summary: BTreeMap<ItemCategory, CategorySummary> = BTreeMap::new();
        for item in items {
            let entry = summary.entry(item.category).or_insert(CategorySummary {
                category: item.category,
                count: 0,
                volume: 0.0,
            });
            entry.count = entry.count.saturating_add(item.count);
            entry.volume += item.volume;
        }
        summary.into_values().collect()
    }

    /// 按专业拆分（结构 / 建筑 / 机电），组内保持原顺序。
    pub fn group_by_discipline(items: &[QuantityItem]) -> BTreeMap<Discipline, Vec<QuantityItem>> {
        let mut groups: BTreeMap<Discipline, Vec<QuantityItem>> = BTreeMap::new();
        for item in items {
            groups
                .entry(item.category.discipline())
                .or_default()
                .push(item.clone());
        }
        groups
    }

    /// 以 `分类_图层` 分组，便于按图层核对。
    pub fn group_by_layer_and_type(items: &[QuantityItem]) -> BTreeMap<String, Vec<QuantityItem>> {
        let mut groups: BTreeMap<String, Vec<QuantityItem>> = BTreeMap::new();
        for item in items {
            groups
                .entry(format!("{}_{}", item.category, item.layer))
                .or_default()
                .push(item.clone());
        }
        groups
    }

    fn merge_by<F>(items: Vec<QuantityItem>, key_of: F) -> Vec<QuantityItem>
    where
        F: Fn(&QuantityItem) -> String,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<QuantityItem> = Vec::new();
        for item in items {
            let key = key_of(&item);
            match index.get(&key) {
                Some(&slot) => {
                    let first = &mut merged[slot];
                    first.count = first.count.saturating_add(item.count);
                    first.volume += item.volume;
                }
                None => {
                    index.insert(key, merged.len());
                    merged.push(item);
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use takeoff_core::quantity::{ExtractionMethod, Unit};

    use super::*;

    fn column(grid: &str, volume: f64) -> QuantityItem {
        QuantityItem {
            code: "K1".to_string(),
            item: "Kolom K1".to_string(),
            floor: "Lantai 1".to_string(),
            grid: grid.to_string(),
            category: ItemCategory::Kolom,
            layer: "KOLOM".to_string(),
            length: 0.4,
            width: 0.3,
            height: Some(3.0),
            count: 1,
            unit: Unit::CubicMeter,
            volume,
            method: ExtractionMethod::GeometryFirst,
        }
    }

    #[test]
    fn identical_items_merge_counts_and_volumes() {
        let items = vec![column("A1", 0.36), column("A1", 0.36)];
        let merged = ItemAggregator::aggregate(items);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 2);
        assert!((merged[0].volume - 0.72).abs() < 1e-9);
    }

    #[test]
    fn different_grids_stay_separate() {
        let items = vec![column("A1", 0.36), column("B1", 0.36)];
        let merged = ItemAggregator::aggregate(items);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].grid, "A1");
        assert_eq!(merged[1].grid, "B1");
    }

    #[test]
    fn first_item_keeps_its_other_fields() {
        let mut second = column("A1", 0.36);
        second.layer = "KOLOM_LAIN".to_string();
        second.method = ExtractionMethod::TextExtraction;
        let merged = ItemAggregator::aggregate(vec![column("A1", 0.36), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].layer, "KOLOM");
        assert_eq!(merged[0].method, ExtractionMethod::GeometryFirst);
    }

    #[test]
    fn missing_height_keys_as_zero() {
        let mut with_none = column("A1", 0.0);
        with_none.height = None;
        let mut with_zero = column("A1", 0.0);
        with_zero.height = Some(0.0);
        assert_eq!(
            ItemAggregator::location_key(&with_none),
            ItemAggregator::location_key(&with_zero)
        );
        assert_eq!(
            ItemAggregator::location_key(&with_none),
            "Lantai 1_A1_Kolom K1_K1_0.400_0.300_0.000"
        );
    }

    #[test]
    fn secondary_aggregations() {
        let mut beam = column("A1", 0.5);
        beam.category = ItemCategory::Balok;
        beam.item = "Balok B1".to_string();
        let mut lamp = column("B1", 2.0);
        lamp.category = ItemCategory::Lampu;
        lamp.item = "Lampu".to_string();
        let items = vec![column("A1", 0.36), column("B1", 0.36), beam, lamp];

        let by_type = ItemAggregator::aggregate_by_item_type(items.clone());
        assert_eq!(by_type.len(), 3);
        assert_eq!(by_type[0].count, 2);

        let by_location = ItemAggregator::aggregate_by_location(&items);
        assert_eq!(by_location.len(), 2);
        assert_eq!(by_location[0].grid, "A1");
        assert_eq!(by_location[0].count, 2);
        assert!((by_location[0].volume - 0.86).abs() < 1e-9);

        let summary = ItemAggregator::summarize_by_category(&items);
        let categories: Vec<_> = summary.iter().map(|entry| entry.category).collect();
        assert_eq!(
            categories,
            vec![ItemCategory::Kolom, ItemCategory::Balok, ItemCategory::Lampu]
        );
        assert_eq!(summary[0].count, 2);

        let groups = ItemAggregator::group_by_discipline(&items);
        assert_eq!(groups[&Discipline::Struktur].len(), 3);
        assert_eq!(groups[&Discipline::Mep].len(), 1);
        assert!(!groups.contains_key(&Discipline::Arsitektur));

        let by_layer = ItemAggregator::group_by_layer_and_type(&items);
        assert_eq!(
            by_layer.keys().collect::<Vec<_>>(),
            vec!["balok_KOLOM", "kolom_KOLOM", "lampu_KOLOM"]
        );
        assert_eq!(by_layer["kolom_KOLOM"].len(), 2);
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn item_strategy() -> impl Strategy<Value = QuantityItem> {
            (
                prop::sample::select(vec!["A1", "A2", "B1"]),
                prop::sample::select(vec!["Lantai 1", "Lantai 2"]),
                prop::sample::select(vec![0.3, 0.4]),
                prop::option::of(prop::sample::select(vec![3.0, 4.0])),
                1u32..5,
                0.0f64..10.0,
            )
                .prop_map(|(grid, floor, width, height, count, volume)| {
                    let mut item = column(grid, volume);
                    item.floor = floor.to_string();
                    item.width = width;
                    item.height = height;
                    item.count = count;
                    item
                })
        }

        /// 合并一次后再合并不再变化。
        fn check_aggregate_is_idempotent(items: Vec<QuantityItem>) -> Result<(), TestCaseError> {
            let once = ItemAggregator::aggregate(items);
            let twice = ItemAggregator::aggregate(once.clone());
            prop_assert_eq!(once, twice);
            Ok(())
        }

        /// 合并不改变数量总和。
        fn check_aggregate_preserves_count(items: Vec<QuantityItem>) -> Result<(), TestCaseError> {
            let total: u32 = items.iter().map(|item| item.count).sum();
            let merged = ItemAggregator::aggregate(items);
            prop_assert_eq!(merged.iter().map(|item| item.count).sum::<u32>(), total);
            Ok(())
        }

        proptest! {
            #[test]
            fn aggregate_is_idempotent(items in prop::collection::vec(item_strategy(), 0..30)) {
                check_aggregate_is_idempotent(items)?;
            }

            #[test]
            fn aggregate_preserves_count(items in prop::collection::vec(item_strategy(), 0..30)) {
                check_aggregate_preserves_count(items)?;
            }
        }
    }
}
