use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use takeoff_config::{AppConfig, CalculatorConfig, ConfigError, LoggingConfig};
use takeoff_engine::{AutoVolumeCalculator, CalculatorSettings, ItemAggregator, reconcile};
use takeoff_io::{DrawingLoader, EstimateLoader, JsonFacade, ReportSaver};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod report;

/// 从 CAD 图元导出数据计算结构工程量。
#[derive(Debug, Parser)]
#[command(name = "takeoff", version)]
struct Cli {
    /// 图元 JSON（texts / polylines / circles / dimensions）
    #[arg(short, long)]
    input: PathBuf,
    /// 工程量清单输出路径（JSON）
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// 预算（RAB）JSON，提供时输出对比结果
    #[arg(short, long)]
    estimate: Option<PathBuf>,
    /// 配置文件，缺省时读取 TAKEOFF_CONFIG 或 ./config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, config_error) = match load_configuration(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_logging(&config.logging);
    if let Some(err) = config_error {
        warn!(error = %err, "配置不可用，按内建计算参数继续");
    }
    info!(input = %cli.input.display(), "开始工程量计算");

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &AppConfig) -> Result<(), String> {
    let settings = calculator_settings(&config.calculator);
    let facade = JsonFacade::new();

    let drawing = facade
        .load(&cli.input)
        .map_err(|err| format!("读取图纸失败: {err}"))?;
    let calculator = AutoVolumeCalculator::with_settings(&drawing, settings)
        .map_err(|err| format!("计算参数无效: {err}"))?;
    let calculation = calculator.calculate_all_volumes();
    let mut summary = String::new();
    report::write_summary(&mut summary, &calculation)
        .map_err(|err| format!("生成摘要失败: {err}"))?;
    print!("{summary}");

    if let Some(path) = &cli.estimate {
        let estimate = facade
            .load_estimate(path)
            .map_err(|err| format!("读取预算失败: {err}"))?;
        let by_type = ItemAggregator::aggregate_by_item_type(calculation.items.clone());
        let rows = reconcile(&by_type, &estimate);
        let mut comparison = String::new();
        report::write_reconciliation(&mut comparison, &rows)
            .map_err(|err| format!("生成对比结果失败: {err}"))?;
        print!("{comparison}");
    }

    if let Some(path) = &cli.output {
        facade
            .save_items(&calculation.items, path)
            .map_err(|err| format!("写出工程量清单失败: {err}"))?;
    }
    Ok(())
}

fn calculator_settings(config: &CalculatorConfig) -> CalculatorSettings {
    CalculatorSettings {
        match_radius: config.match_radius,
        min_rectangle_side: config.min_rectangle_side,
        min_circle_radius: config.min_circle_radius,
        slab_thickness: config.slab_thickness,
        default_column_height: config.default_column_height,
        default_member_height: config.default_member_height,
        void_warning_ratio: config.void_warning_ratio,
        position_bucket: config.position_bucket,
        unmatched_sample_limit: config.unmatched_sample_limit,
    }
}

/// `--config` 指定的文件优先，否则按 `TAKEOFF_CONFIG`、`./config/default.toml` 的顺序查找。
fn load_configuration(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match explicit {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    }
}

/// 日志只写 stderr，stdout 留给汇总与对比文本。`RUST_LOG` 优先于配置中的等级。
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new(takeoff_config::DEFAULT_LOG_LEVEL));
    if let Err(err) = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("日志初始化失败: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_maps_to_default_settings() {
        let settings = calculator_settings(&CalculatorConfig::default());
        assert_eq!(settings, CalculatorSettings::default());
    }

    #[test]
    fn cli_requires_input() {
        assert!(Cli::try_parse_from(["takeoff"]).is_err());
        let cli = Cli::try_parse_from(["takeoff", "--input", "a.json", "-e", "rab.json"])
            .expect("参数应可解析");
        assert_eq!(cli.input, PathBuf::from("a.json"));
        assert_eq!(cli.estimate, Some(PathBuf::from("rab.json")));
        assert!(cli.output.is_none());
    }

    #[test]
    fn explicit_config_errors_are_returned() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let missing = dir.path().join("takeoff.toml");
        let err = load_configuration(Some(missing.as_path())).expect_err("缺失的配置应报错");
        assert!(matches!(err, ConfigError::Unreadable { .. }));

        let present = dir.path().join("present.toml");
        std::fs::write(&present, "[calculator]\nslab_thickness = 0.15\n").expect("写入配置失败");
        let config = load_configuration(Some(present.as_path())).expect("应能读取配置");
        assert_eq!(config.calculator.slab_thickness, 0.15);
    }
}
