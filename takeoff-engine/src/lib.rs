pub mod aggregate;
pub mod calculator;
pub mod dimension;
pub mod grid;
pub mod height;
pub mod labels;
pub mod reconcile;
pub mod voids;

pub mod errors {
    use thiserror::Error;

    /// 计算参数非法时返回；图纸数据本身的问题只产生警告，不会成为错误。
    #[derive(Debug, Error, PartialEq)]
    pub enum EngineError {
        #[error("setting `{name}` must be a finite positive number, got {value}")]
        InvalidSetting { name: &'static str, value: f64 },
        #[error("setting `{name}` must lie in [0, 1], got {value}")]
        RatioOutOfRange { name: &'static str, value: f64 },
    }
}

use regex::Regex;

/// 编译源码中的字面量正则；模式均由单元测试覆盖。
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal regex pattern must compile")
}

pub use aggregate::ItemAggregator;
pub use calculator::{AutoVolumeCalculator, CalculationReport, CalculationWarning, CalculatorSettings};
pub use dimension::{DimensionParser, ParsedDimensions};
pub use errors::EngineError;
pub use grid::GridDetector;
pub use height::HeightDetector;
pub use voids::VoidDetector;
pub use reconcile::{ReconcileStatus, ReconciliationRow, ReconciliationSummary, reconcile};
