//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command for the HIL runner CLI: it loads
//! the bench configuration, connects the (simulated) bench, enqueues every
//! configured test and drives one session to completion, printing progress
//! and the final summary.
//!
//! 此模块实现 HIL 运行器 CLI 的 `run` 命令：加载台架配置、
//! 连接（模拟）台架、入队每个已配置的测试并驱动一个会话直至完成，
//! 打印进度和最终摘要。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_stream::StreamExt;

use crate::{
    core::{
        config::{self, BenchConfig},
        controller::RunController,
        models::{EngineError, EngineEvent},
    },
    hardware::sim::{demo_function_table, simulated_registry},
    infra::t,
    reporting::console::{print_failure_details, print_summary},
};

/// Executes the run command with the provided arguments.
///
/// # Arguments
/// * `config` - Path to the bench configuration file
/// * `log_dir` - Directory under which the session directory is created
/// * `simulated` - Use the built-in simulated bench
/// * `language` - Locale pre-parsed from the command line
///
/// # Returns
/// A Result indicating success or failure of the command execution
pub async fn execute(
    config: PathBuf,
    log_dir: PathBuf,
    simulated: bool,
    language: &str,
) -> Result<()> {
    let bench = setup_and_parse_config(&config)?;
    let locale = bench
        .language
        .clone()
        .unwrap_or_else(|| language.to_string());
    rust_i18n::set_locale(&locale);

    println!(
        "{}",
        t!("loading_bench", locale = locale, path = config.display())
    );

    if !simulated {
        // Real drivers come from the bench integration, not this binary.
        anyhow::bail!(t!("real_drivers_unsupported", locale = locale));
    }
    println!(
        "{}",
        t!("simulated_bench_notice", locale = locale).cyan()
    );

    let registry = Arc::new(simulated_registry(&bench).connect_all());
    for (class, reason) in registry.unavailable() {
        println!(
            "{}",
            t!(
                "device_unavailable_warn",
                locale = locale,
                class = class,
                reason = reason
            )
            .yellow()
        );
    }

    let controller = RunController::new(registry, demo_function_table(), &log_dir)?;
    println!(
        "{}",
        t!(
            "session_artifacts",
            locale = locale,
            path = controller.session_dir().display()
        )
    );

    let specs = bench.test_specs()?;
    if specs.is_empty() {
        println!("{}", t!("no_tests_configured", locale = locale).yellow());
        controller.close().await;
        return Ok(());
    }
    for spec in specs {
        let kind = spec.kind;
        let name = spec.name.clone();
        controller
            .add_test(spec)
            .await
            .map_err(anyhow::Error::from)?;
        println!(
            "{}",
            t!("queued_test", locale = locale, kind = kind, name = name)
        );
    }

    setup_signal_handler(&controller, &locale);
    let printer = spawn_event_printer(&controller, &locale);

    let queued = controller.queue_snapshot().await.len();
    println!(
        "{}",
        t!("run_started", locale = locale, count = queued).bold()
    );

    let handle = controller.start_run().await.map_err(anyhow::Error::from)?;
    let summary = handle
        .await
        .map_err(|e| EngineError::Fatal(format!("run worker did not finish: {e}")))?;

    let records = controller.records().await;
    controller.close().await;
    let _ = printer.await;

    print_summary(&records, &summary, &locale);
    print_failure_details(&records, &locale);

    if records.iter().any(|r| r.status.is_bad()) {
        anyhow::bail!(t!("run_had_failures", locale = locale));
    }
    println!("\n{}", t!("all_tests_passed", locale = locale).green().bold());
    Ok(())
}

/// Reads and parses the bench configuration file.
fn setup_and_parse_config(config_path: &PathBuf) -> Result<BenchConfig> {
    config::load_bench_config(config_path)
}

/// Requests cancellation on Ctrl-C; the current test finishes, the remainder
/// is skipped.
fn setup_signal_handler(controller: &RunController, locale: &str) {
    let cancel = controller.cancel_handle();
    let locale = locale.to_string();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            cancel.cancel();
        }
    });
}

/// Mirrors engine events onto the console while the run progresses.
fn spawn_event_printer(controller: &RunController, locale: &str) -> tokio::task::JoinHandle<()> {
    let mut events = controller.subscribe();
    let locale = locale.to_string();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                EngineEvent::TestStarted { name, .. } => {
                    println!("{}", t!("test_started", locale = &locale, name = name));
                }
                EngineEvent::TestFinished { record } => {
                    println!(
                        "{}",
                        t!(
                            "test_finished",
                            locale = &locale,
                            name = record.name,
                            status = record.status,
                            duration = format!("{:.3}s", record.duration.as_secs_f64())
                        )
                    );
                }
                EngineEvent::RunFinished { .. } => break,
                _ => {}
            }
        }
    })
}
