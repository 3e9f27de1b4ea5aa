//! カメラ映像・画像ファイルの読み込み

use crate::api::server::js_error;
use kaong_common::capture::{CameraHandle, CAPTURE_JPEG_QUALITY, IDEAL_VIDEO_HEIGHT, IDEAL_VIDEO_WIDTH};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, File, FileReader, HtmlCanvasElement, HtmlImageElement, HtmlVideoElement,
    MediaStream, MediaStreamConstraints, MediaStreamTrack,
};

#[derive(Serialize)]
struct Ideal {
    ideal: u32,
}

/// getUserMediaの映像条件
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoConstraints {
    width: Ideal,
    height: Ideal,
    facing_mode: &'static str,
}

/// 背面カメラの映像ストリーム
pub struct WebCamera {
    stream: MediaStream,
}

impl WebCamera {
    /// 背面カメラを1280x720（目安）で開く
    pub async fn open() -> Result<Self, String> {
        let window = web_sys::window().ok_or_else(|| "no window".to_string())?;
        let devices = window.navigator().media_devices().map_err(js_error)?;

        let video = serde_wasm_bindgen::to_value(&VideoConstraints {
            width: Ideal { ideal: IDEAL_VIDEO_WIDTH },
            height: Ideal { ideal: IDEAL_VIDEO_HEIGHT },
            facing_mode: "environment",
        })
        .map_err(|e| e.to_string())?;

        let mut constraints = MediaStreamConstraints::new();
        constraints.video(&video);

        let promise = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(js_error)?;
        let stream: MediaStream = JsFuture::from(promise)
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        Ok(Self { stream })
    }

    /// video要素に映像を流す
    pub fn attach(&self, video: &HtmlVideoElement) {
        video.set_src_object(Some(&self.stream));
        if let Err(e) = video.play() {
            log::error!("Error playing video: {}", js_error(e));
        }
    }
}

impl CameraHandle for WebCamera {
    fn stop(&mut self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}

fn document() -> Result<web_sys::Document, String> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| "no document".to_string())
}

pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, String> {
    canvas
        .get_context("2d")
        .map_err(js_error)?
        .ok_or_else(|| "2d context unavailable".to_string())?
        .dyn_into()
        .map_err(js_error)
}

/// 現在の映像フレームをJPEGのData URLにする
pub fn capture_frame(video: &HtmlVideoElement) -> Result<String, String> {
    let canvas: HtmlCanvasElement = document()?
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into()
        .map_err(js_error)?;
    canvas.set_width(video.video_width());
    canvas.set_height(video.video_height());

    let ctx = context_2d(&canvas)?;
    ctx.draw_image_with_html_video_element_and_dw_and_dh(
        video,
        0.0,
        0.0,
        f64::from(canvas.width()),
        f64::from(canvas.height()),
    )
    .map_err(js_error)?;

    canvas
        .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(CAPTURE_JPEG_QUALITY))
        .map_err(js_error)
}

/// ファイルをData URLとして読み込む
pub async fn read_data_url(file: &File) -> Result<String, String> {
    let reader = FileReader::new().map_err(js_error)?;
    let loaded = js_sys::Promise::new(&mut |resolve, reject| {
        reader.set_onload(Some(&resolve));
        reader.set_onerror(Some(&reject));
    });
    reader.read_as_data_url(file).map_err(js_error)?;
    JsFuture::from(loaded).await.map_err(js_error)?;

    reader
        .result()
        .map_err(js_error)?
        .as_string()
        .ok_or_else(|| "読込失敗: 文字列に変換できません".to_string())
}

/// 画像を読み込み、元のサイズが分かる状態にする
pub async fn load_image(src: &str) -> Result<HtmlImageElement, String> {
    let image = HtmlImageElement::new().map_err(js_error)?;
    let loaded = js_sys::Promise::new(&mut |resolve, reject| {
        image.set_onload(Some(&resolve));
        image.set_onerror(Some(&reject));
    });
    image.set_src(src);
    JsFuture::from(loaded).await.map_err(js_error)?;
    Ok(image)
}

/// Data URLをBlobに戻す（撮影フレームの保存用）
pub async fn data_url_to_blob(data_url: &str) -> Result<web_sys::Blob, String> {
    let window = web_sys::window().ok_or_else(|| "no window".to_string())?;
    let resp: web_sys::Response = JsFuture::from(window.fetch_with_str(data_url))
        .await
        .map_err(js_error)?
        .dyn_into()
        .map_err(js_error)?;
    JsFuture::from(resp.blob().map_err(js_error)?)
        .await
        .map_err(js_error)?
        .dyn_into()
        .map_err(js_error)
}
