use clap::Parser;
use indicatif::ProgressBar;
use kaong_common::capture::CaptureController;
use kaong_common::coords::{Letterbox, Surface};
use kaong_common::dashboard::{DashboardState, DeleteOutcome, SortSpec};
use kaong_common::protocol::SaveAssessmentForm;
use kaong_common::{AssessmentRecord, Filter};
use kaong_inspect::{cli, client, config, display, error, report};
use kaong_inspect::watch::race_stop;
use cli::{Cli, Commands};
use client::{ApiClient, ImageUpload};
use config::Config;
use error::{InspectError, Result};
use std::time::Duration;

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn connect(config: &Config, server: Option<&str>) -> Result<ApiClient> {
    let server_url = config.resolve_server_url(server)?;
    let client = ApiClient::new(server_url, Duration::from_secs(config.timeout_seconds))?;
    log::debug!("server: {}", client.base_url());
    Ok(client)
}

/// 全レコードを読み込んで状態に反映する
async fn load(client: &ApiClient, state: &mut DashboardState) -> Result<()> {
    let token = state.begin_reload();
    let records = client.fetch_assessments().await?;
    state.finish_reload(token, Ok(records));
    Ok(())
}

fn print_summary(state: &DashboardState) {
    println!("集計:");
    for line in display::summary_lines(&state.summary()) {
        println!("{}", line);
    }
    if let Some(category) = state.category_summary() {
        println!();
        for line in display::category_summary_lines(&category) {
            println!("{}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let config = Config::load()?;
    let server = cli.server.as_deref();

    match cli.command {
        Commands::List { filter, threshold, sort, order, json } => {
            let client = connect(&config, server)?;
            let mut state = DashboardState::new(threshold.unwrap_or(config.confidence_threshold));
            load(&client, &mut state).await?;
            state.set_filter(filter);
            if let Some(key) = sort {
                state.set_sort(SortSpec { key, order });
            }

            let cards = state.visible_cards();
            if json {
                let records: Vec<&AssessmentRecord> = cards
                    .iter()
                    .filter_map(|c| state.records().iter().find(|r| r.id == c.id))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if !state.has_data() {
                println!("No assessment data available");
                return Ok(());
            }

            println!("{}", display::card_header());
            for card in &cards {
                println!("{}", display::card_line(card));
            }
            println!();
            println!("{}", state.filter_status_text());
            println!("{}", state.confidence_info());
        }

        Commands::Summary { filter } => {
            let client = connect(&config, server)?;
            let mut state = DashboardState::new(config.confidence_threshold);
            load(&client, &mut state).await?;
            state.set_filter(filter);
            print_summary(&state);
        }

        Commands::Export { output } => {
            let client = connect(&config, server)?;
            let mut state = DashboardState::new(config.confidence_threshold);
            load(&client, &mut state).await?;

            let today = chrono::Local::now().date_naive();
            let path = report::write_csv_report(&state, output.as_deref(), today)?;
            println!("✔ {}件をエクスポート: {}", state.records().len(), path.display());
        }

        Commands::Delete { id, yes } => {
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Are you sure you want to delete assessment #{}?", id))
                    .default(false)
                    .interact()
                    .map_err(|e| InspectError::Prompt(e.to_string()))?;
                if !confirmed {
                    println!("中止しました");
                    return Ok(());
                }
            }

            let client = connect(&config, server)?;
            let mut state = DashboardState::new(config.confidence_threshold);
            load(&client, &mut state).await?;

            let outcome = match client.delete_and_reload(&mut state, id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let failed = DeleteOutcome::Failed(e.to_string());
                    eprintln!("{}", display::notification_line(&failed.notification()));
                    return Err(e);
                }
            };
            println!("{}", display::notification_line(&outcome.notification()));
            print_summary(&state);
        }

        Commands::Detect { image, container, save, source } => {
            // 画像以外はここで拒否（通信しない）
            let upload = ImageUpload::from_path(&image)?;
            let (width, height) = image::image_dimensions(&image)
                .map_err(|e| InspectError::ImageLoad(e.to_string()))?;

            let client = connect(&config, server)?;
            let mut controller = CaptureController::new();
            controller.select_upload(&upload.media_type)?;
            controller.begin_upload()?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("解析中...");
            spinner.enable_steady_tick(Duration::from_millis(100));
            let response = client.detect_image(&upload).await;
            spinner.finish_and_clear();

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let notification = controller.receive_error(&e.to_string());
                    eprintln!("{}", display::notification_line(&notification));
                    return Err(e);
                }
            };

            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            let update = controller.receive(response, timestamp);

            if let Some(notification) = &update.error {
                eprintln!("{}", display::notification_line(notification));
                return Err(InspectError::Detection(notification.message.clone()));
            }
            if let Some(warning) = &update.warning {
                println!("⚠ {}", warning.message);
            }

            let letterbox = Letterbox::fit(container.width, container.height, f64::from(width), f64::from(height))
                .ok_or_else(|| InspectError::ImageLoad(format!("画像サイズが不正です: {}x{}", width, height)))?;
            let surface = Surface::letterboxed(&letterbox);

            println!("検出: {}件 ({}x{} → {})", update.detections.len(), width, height, container);
            for detection in &update.detections {
                let overlay = surface.overlay(detection);
                println!("{}", display::overlay_line(detection, overlay.as_ref()));
            }

            match &update.details {
                Some(details) => {
                    println!("\nDetails:");
                    for line in display::details_lines(details) {
                        println!("{}", line);
                    }
                }
                None => println!("\nNo fruits detected"),
            }

            if save {
                let Some(details) = &update.details else {
                    println!("保存する検出結果がありません");
                    return Ok(());
                };
                let form = SaveAssessmentForm {
                    assessment: details.summary_text(),
                    confidence: details.average_confidence / 100.0,
                    source,
                };
                client.save_assessment(&upload, &form).await?;
                println!("✔ 判定結果を保存しました");
            }
        }

        Commands::Watch { interval } => {
            let client = connect(&config, server)?;
            let secs = interval.unwrap_or(config.poll_interval_secs).max(1);
            let mut state = DashboardState::new(config.confidence_threshold);
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            println!("👀 {}秒ごとに監視中 (Ctrl+Cで終了)", secs);

            loop {
                // 取得中でもCtrl+Cで抜けられるようにする
                if race_stop(ticker.tick(), tokio::signal::ctrl_c()).await.is_none() {
                    break;
                }
                let token = state.begin_reload();
                let Some(response) = race_stop(client.fetch_assessments(), tokio::signal::ctrl_c()).await else {
                    break;
                };
                let outcome = state.finish_reload(token, response.map_err(|e| e.to_string()));
                if let Some(notification) = outcome.notification() {
                    println!("{}", display::notification_line(&notification));
                }
            }
            println!("\n監視を終了しました");

            if state.has_data() {
                state.set_filter(Filter::All);
                print_summary(&state);
            }
        }

        Commands::Config { set_server, show } => {
            let mut config = config;

            if let Some(url) = set_server {
                config.set_server_url(url)?;
                println!("✔ サーバーURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  サーバーURL: {}", config.server_url);
                println!("  ポーリング間隔: {}秒", config.poll_interval_secs);
                println!("  信頼度しきい値: {}%", config.confidence_threshold);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
            }
        }
    }

    Ok(())
}
