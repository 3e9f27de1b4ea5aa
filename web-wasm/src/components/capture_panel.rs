//! スキャンページ（カメラ撮影・画像アップロード）
//!
//! 画面の状態は `CaptureController` が持ち、カメラとチャネルは `CaptureSession` が所有する。
//! ページを離れると `on_cleanup` でセッションを閉じる。

use super::details_panel::DetailsPanelView;
use super::notifications::use_notifier;
use crate::api::channel::{page_channel_url, ChannelNotice, WsChannel};
use crate::api::server;
use crate::canvas::{draw_letterboxed, draw_live};
use crate::media::{capture_frame, data_url_to_blob, load_image, read_data_url, WebCamera};
use gloo::timers::callback::Timeout;
use kaong_common::capture::{
    CameraHandle, CaptureController, CaptureMode, CaptureSession, CaptureState, CaptureUpdate, CAPTURE_COOLDOWN_MS,
};
use kaong_common::notify::Notification;
use kaong_common::protocol::{ChannelEvent, SaveAssessmentForm};
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::{File, HtmlCanvasElement, HtmlImageElement, HtmlInputElement, HtmlVideoElement};

type Session = CaptureSession<WebCamera, WsChannel>;

const UPLOAD_CANVAS_WIDTH: u32 = 640;
const UPLOAD_CANVAS_HEIGHT: u32 = 480;

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn now_text() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// キャンバスを映像と同じ解像度にする
fn sync_canvas_size(canvas: &HtmlCanvasElement, video: &HtmlVideoElement) {
    if video.video_width() > 0 && canvas.width() != video.video_width() {
        canvas.set_width(video.video_width());
        canvas.set_height(video.video_height());
    }
}

#[component]
pub fn ScanPage() -> impl IntoView {
    let notifier = use_notifier();
    let controller = RwSignal::new(CaptureController::new());
    let session = StoredValue::new_local(None::<Session>);
    let upload_image = StoredValue::new_local(None::<HtmlImageElement>);
    let upload_file = StoredValue::new_local(None::<File>);
    let last_frame = StoredValue::new(None::<String>);
    // クールダウン明けに撮影ボタンを再評価させる
    let cooldown_tick = RwSignal::new(0u64);
    let (is_saving, set_is_saving) = signal(false);

    let video_ref = NodeRef::<html::Video>::new();
    let live_canvas_ref = NodeRef::<html::Canvas>::new();
    let upload_canvas_ref = NodeRef::<html::Canvas>::new();

    // 検出結果を画面に反映する
    let apply = move |update: CaptureUpdate| {
        if let Some(notification) = update.error {
            notifier.push(notification);
            return;
        }
        if let Some(warning) = update.warning {
            notifier.warn(warning);
        }

        let drawn = match controller.with_untracked(|c| c.state().mode()) {
            Some(CaptureMode::Camera) => match (live_canvas_ref.get_untracked(), video_ref.get_untracked()) {
                (Some(canvas), Some(video)) => {
                    sync_canvas_size(&canvas, &video);
                    draw_live(&canvas, &video, &update.detections)
                }
                _ => Ok(()),
            },
            Some(CaptureMode::Upload) => {
                let image = upload_image.with_value(|i| i.clone());
                match (upload_canvas_ref.get_untracked(), image) {
                    (Some(canvas), Some(image)) => draw_letterboxed(&canvas, &image, &update.detections),
                    _ => Ok(()),
                }
            }
            None => Ok(()),
        };
        if let Err(e) = drawn {
            log::error!("描画失敗: {}", e);
        }
    };

    let on_notice = move |notice: ChannelNotice| match notice {
        ChannelNotice::Connected => controller.update(|c| c.set_channel_connected(true)),
        ChannelNotice::Disconnected => controller.update(|c| c.set_channel_connected(false)),
        ChannelNotice::Event(ChannelEvent::DetectionResults(response)) => {
            if let Some(update) = controller.try_update(|c| c.receive(response, now_text())) {
                apply(update);
            }
        }
        ChannelNotice::Event(ChannelEvent::DetectionError { error }) => {
            if let Some(notification) = controller.try_update(|c| c.receive_error(&error)) {
                notifier.push(notification);
            }
        }
        ChannelNotice::Event(ChannelEvent::DetectVideoFrame { .. }) => {}
    };

    let close_session = move || {
        session.update_value(|s| {
            if let Some(mut open) = s.take() {
                open.close();
            }
        });
    };

    // =============================================
    // カメラ
    // =============================================

    let on_open_camera = move |_| {
        if let Some(Err(e)) = controller.try_update(|c| c.open_camera()) {
            log::warn!("{}", e);
            return;
        }
        spawn_local(async move {
            let camera = match WebCamera::open().await {
                Ok(camera) => camera,
                Err(e) => {
                    if let Some(message) = controller.try_update(|c| c.camera_failed(&e)) {
                        alert(message);
                    }
                    return;
                }
            };
            // 取得中に閉じられた
            if controller.with_untracked(|c| c.state().mode()) != Some(CaptureMode::Camera) {
                let mut camera = camera;
                camera.stop();
                return;
            }
            if let Some(video) = video_ref.get_untracked() {
                camera.attach(&video);
            }

            let channel = page_channel_url().and_then(|url| WsChannel::connect(&url, on_notice));
            match channel {
                Ok(channel) => session.set_value(Some(CaptureSession::new(camera, channel))),
                Err(e) => {
                    log::error!("チャネル接続失敗: {}", e);
                    // カメラだけ開いていても撮影できないので閉じる
                    let mut camera = camera;
                    camera.stop();
                    controller.update(|c| c.close());
                    notifier.push(Notification::error("Could not connect to the detection service."));
                }
            }
        });
    };

    let on_capture = move |_| {
        if let Some(Err(e)) = controller.try_update(|c| c.begin_capture(now_ms())) {
            log::error!("{}", e);
            return;
        }
        Timeout::new(CAPTURE_COOLDOWN_MS as u32, move || {
            cooldown_tick.try_update(|t| *t += 1);
        })
        .forget();

        let Some(video) = video_ref.get_untracked() else {
            return;
        };
        let frame = match capture_frame(&video) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Error capturing image: {}", e);
                alert("Error capturing image. Please try again.");
                return;
            }
        };

        if let Some(canvas) = live_canvas_ref.get_untracked() {
            sync_canvas_size(&canvas, &video);
            let _ = draw_live(&canvas, &video, &[]);
        }

        let sent = session
            .try_update_value(|s| s.as_mut().map(|open| open.send_frame(&frame)))
            .flatten();
        match sent {
            Some(Ok(())) => last_frame.set_value(Some(frame)),
            Some(Err(e)) => {
                if let Some(notification) = controller.try_update(|c| c.receive_error(&e.to_string())) {
                    notifier.push(notification);
                }
            }
            None => log::warn!("capture session is not open"),
        }
    };

    let capture_enabled = move || {
        cooldown_tick.track();
        controller.with(|c| c.capture_enabled(now_ms()))
    };

    let on_close_camera = move |_| {
        close_session();
        controller.update(|c| c.close());
        last_frame.set_value(None);
        if let Some(video) = video_ref.get_untracked() {
            video.set_src_object(None);
        }
    };

    // =============================================
    // アップロード
    // =============================================

    let on_file_selected = move |ev: leptos::ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            return;
        };
        input.set_value("");

        if let Some(Err(e)) = controller.try_update(|c| c.select_upload(&file.type_())) {
            log::warn!("{}", e);
            alert(&e.to_string());
            return;
        }

        spawn_local(async move {
            let prepared = async {
                let data_url = read_data_url(&file).await?;
                load_image(&data_url).await
            }
            .await;
            let image = match prepared {
                Ok(image) => image,
                Err(e) => {
                    if let Some(notification) = controller.try_update(|c| c.receive_error(&e)) {
                        notifier.push(notification);
                    }
                    return;
                }
            };

            if let Some(canvas) = upload_canvas_ref.get_untracked() {
                canvas.set_width(UPLOAD_CANVAS_WIDTH);
                canvas.set_height(UPLOAD_CANVAS_HEIGHT);
                if let Err(e) = draw_letterboxed(&canvas, &image, &[]) {
                    log::error!("描画失敗: {}", e);
                }
            }
            upload_image.set_value(Some(image));
            upload_file.set_value(Some(file.clone()));

            if let Some(Err(e)) = controller.try_update(|c| c.begin_upload()) {
                log::warn!("{}", e);
                return;
            }
            match server::detect_upload(&file, &file.name()).await {
                Ok(response) => {
                    if let Some(update) = controller.try_update(|c| c.receive(response, now_text())) {
                        apply(update);
                    }
                }
                Err(e) => {
                    log::error!("Error uploading image: {}", e);
                    if let Some(notification) = controller.try_update(|c| c.receive_error(&e)) {
                        notifier.push(notification);
                    }
                }
            }
        });
    };

    let on_close_upload = move |_| {
        controller.update(|c| c.close());
        upload_image.set_value(None);
        upload_file.set_value(None);
    };

    // =============================================
    // 保存
    // =============================================

    let on_save = move |_| {
        let Some(details) = controller.with_untracked(|c| c.last_details().cloned()) else {
            return;
        };
        let form = SaveAssessmentForm {
            assessment: details.summary_text(),
            confidence: details.average_confidence / 100.0,
            source: details.source.source().to_string(),
        };
        let file = upload_file.with_value(|f| f.clone());
        let frame = last_frame.get_value();

        set_is_saving.set(true);
        spawn_local(async move {
            let result = match (details.source, file, frame) {
                (CaptureMode::Upload, Some(file), _) => {
                    server::save_assessment(&file, &file.name(), &form).await
                }
                (CaptureMode::Camera, _, Some(frame)) => match data_url_to_blob(&frame).await {
                    Ok(blob) => server::save_assessment(&blob, "capture.jpg", &form).await,
                    Err(e) => Err(e),
                },
                _ => Err("No image to save".to_string()),
            };
            match result {
                Ok(()) => notifier.push(Notification::success("Assessment saved successfully")),
                Err(e) => {
                    log::error!("Error saving assessment: {}", e);
                    notifier.push(Notification::error("Failed to save assessment. Please try again."));
                }
            }
            set_is_saving.try_set(false);
        });
    };

    on_cleanup(move || {
        close_session();
        controller.try_update(|c| c.close());
    });

    let camera_open = move || controller.with(|c| c.state().mode()) == Some(CaptureMode::Camera);
    let upload_open = move || controller.with(|c| c.state().mode()) == Some(CaptureMode::Upload);
    let awaiting = move || {
        matches!(controller.with(|c| c.state()), CaptureState::AwaitingResult(_))
    };

    view! {
        <section class="scan-page">
            <div class="scan-controls">
                <button class="btn btn-primary" on:click=on_open_camera disabled=move || controller.with(|c| c.state().mode().is_some())>
                    "Open Camera"
                </button>
                <label class="btn btn-secondary" class:disabled=camera_open>
                    "Upload Image"
                    <input
                        type="file"
                        accept="image/*"
                        style="display: none"
                        disabled=camera_open
                        on:change=on_file_selected
                    />
                </label>
            </div>

            <div class="camera-view" class:hidden=move || !camera_open()>
                <video node_ref=video_ref autoplay=true playsinline=true muted=true></video>
                <canvas node_ref=live_canvas_ref></canvas>
                <div class="camera-buttons">
                    <button class="btn btn-primary" on:click=on_capture disabled=move || !capture_enabled()>
                        "Capture"
                    </button>
                    <button class="btn btn-secondary" on:click=on_close_camera>"Close Camera"</button>
                </div>
            </div>

            <div class="upload-view" class:hidden=move || !upload_open()>
                <canvas node_ref=upload_canvas_ref></canvas>
                <button class="btn btn-secondary" on:click=on_close_upload>"Close"</button>
            </div>

            <Show when=awaiting>
                <p class="analyzing">"Analyzing..."</p>
            </Show>

            {move || {
                let details = controller.with(|c| {
                    if c.details_open() { c.last_details().cloned() } else { None }
                })?;
                Some(view! {
                    <DetailsPanelView
                        details=details
                        on_close=move || controller.update(|c| c.dismiss_details())
                    />
                    <button class="btn btn-primary" on:click=on_save disabled=move || is_saving.get()>
                        {move || if is_saving.get() { "Saving..." } else { "Save Assessment" }}
                    </button>
                })
            }}

            <Show when=move || controller.with(|c| c.has_stored_details() && !c.details_open())>
                <button
                    class="btn btn-secondary"
                    on:click=move |_| controller.update(|c| {
                        c.show_stored_details();
                    })
                >
                    "Show Details"
                </button>
            </Show>
        </section>
    }
}
