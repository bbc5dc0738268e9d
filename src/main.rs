use clap::Parser;
use simplify_secops::core::engine::RunReport;
use simplify_secops::core::ConfigProvider;
use simplify_secops::utils::error::ErrorSeverity;
use simplify_secops::utils::{logger, validation::Validate};
use simplify_secops::{AwsProvider, CliConfig, LocalStorage, RunConfig, SecOpsEngine, SecOpsError};

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 雲端呼叫失敗，可重試
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn report_error(context: &str, e: &SecOpsError) {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
}

fn print_report(report: &RunReport) {
    match report {
        RunReport::Status(table) | RunReport::Metric(table) => {
            if table.is_empty() {
                println!("No functions to display");
            } else {
                println!("{}", table);
            }
        }
        RunReport::Check(results) => {
            for (function_name, findings) in results {
                for finding in findings {
                    println!("{}: {} [{}]", function_name, finding.message, finding.verdict);
                }
            }
        }
        RunReport::Patch { patched } => {
            for function_name in patched {
                println!("✅ {}", function_name);
            }
        }
        RunReport::Snapshot { written } => {
            for location in written {
                println!("📁 Snapshot saved to: {}", location);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting simplify-secops {}", cli.operation);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match RunConfig::load(&cli).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            report_error("Configuration validation failed", &e);
            std::process::exit(1);
        }
    };

    let provider = AwsProvider::connect(&config.profile, &config.region).await;
    let storage = LocalStorage::new(config.snapshot_dir().to_string());
    let operation = config.operation;
    let engine = SecOpsEngine::new(provider, storage, config);

    match engine.run(operation).await {
        Ok(summary) => {
            print_report(&summary.report);

            for failure in &summary.failures {
                eprintln!(
                    "❌ {}: {}",
                    failure.function_name,
                    failure.error.user_friendly_message()
                );
            }

            match summary.worst_severity() {
                None => tracing::info!("✅ {} completed successfully!", summary.operation),
                Some(severity) => {
                    tracing::warn!(
                        "{} finished with {} failed functions",
                        summary.operation,
                        summary.failures.len()
                    );
                    let code = exit_code(severity);
                    if code > 0 {
                        std::process::exit(code);
                    }
                }
            }
        }
        Err(e) => {
            report_error(&format!("{} failed", operation), &e);

            // 根據錯誤嚴重程度決定退出碼
            let code = exit_code(e.severity());
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
