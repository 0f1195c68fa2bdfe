use std::io::Write;

use log::LevelFilter;

/// 使用默认等级（Info）初始化日志，`RUST_LOG` 可以覆盖
pub fn init_log() {
    init_log_with_level(LevelFilter::Info);
}

/// 使用指定的默认等级初始化日志
///
/// 只能调用一次，重复调用会 panic（与 `env_logger::Builder::init` 一致）。
pub fn init_log_with_level(level: LevelFilter) {
    build_logger(level).init();
}

/// 测试使用的日志初始化
///
/// 可以在每个测试中重复调用，输出交给 libtest 捕获。
pub fn init_test_log() {
    let _ = build_logger(LevelFilter::Debug).is_test(true).try_init();
}

fn build_logger(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            let info_style = buf
                .default_level_style(log::Level::Info)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green)));
            let warn_style = buf
                .default_level_style(log::Level::Warn)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
            let error_style = buf
                .default_level_style(log::Level::Error)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

            let level_style = match record.level() {
                log::Level::Info => info_style,
                log::Level::Warn => warn_style,
                log::Level::Error => error_style,
                _ => buf.default_level_style(record.level()),
            };
            let grey_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

            let line = record.line().unwrap_or(!0);
            // windows 和 unix 的路径分隔符都需要处理
            let file = record.file().unwrap_or("").rsplit(['\\', '/']).next().unwrap_or("");
            let time = chrono::Local::now().format("%H:%M:%S");
            let level = record.level();

            writeln!(
                buf,
                "{level_style}[{time}] {level}{level_style:#} {grey_style}[{file}:{line}]{grey_style:#} {}",
                record.args()
            )
        })
        .filter(None, level)
        // RUST_LOG 优先于代码中的默认等级
        .parse_default_env();
    builder
}
