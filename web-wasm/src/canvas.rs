//! キャンバスへの検出枠の描画

use crate::media::context_2d;
use kaong_common::coords::{Letterbox, Overlay, Surface};
use kaong_common::Detection;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, HtmlVideoElement};

fn draw_overlays(ctx: &CanvasRenderingContext2d, surface: &Surface, detections: &[Detection]) {
    ctx.set_line_width(2.0);
    ctx.set_font("18px Arial");

    let overlays: Vec<Overlay> = detections.iter().filter_map(|d| surface.overlay(d)).collect();
    for overlay in &overlays {
        let color = JsValue::from_str(overlay.color);
        ctx.set_stroke_style(&color);
        ctx.stroke_rect(overlay.rect.x1, overlay.rect.y1, overlay.rect.width(), overlay.rect.height());

        if let Some(caption) = &overlay.caption {
            ctx.set_fill_style(&color);
            let (x, y) = caption.position;
            let _ = ctx.fill_text(&caption.text, x, y);
        }
    }
}

/// ライブ映像のフレームを描き直し、その上に枠を描く（前回の枠は残さない）
pub fn draw_live(canvas: &HtmlCanvasElement, video: &HtmlVideoElement, detections: &[Detection]) -> Result<(), String> {
    let ctx = context_2d(canvas)?;
    let width = f64::from(canvas.width());
    let height = f64::from(canvas.height());

    ctx.clear_rect(0.0, 0.0, width, height);
    ctx.draw_image_with_html_video_element_and_dw_and_dh(video, 0.0, 0.0, width, height)
        .map_err(crate::api::server::js_error)?;

    draw_overlays(&ctx, &Surface::live(width, height), detections);
    Ok(())
}

/// アップロード画像をキャンバス中央にアスペクト比を保って描き、枠を重ねる
pub fn draw_letterboxed(
    canvas: &HtmlCanvasElement,
    image: &HtmlImageElement,
    detections: &[Detection],
) -> Result<(), String> {
    let ctx = context_2d(canvas)?;
    let width = f64::from(canvas.width());
    let height = f64::from(canvas.height());

    let letterbox = Letterbox::fit(
        width,
        height,
        f64::from(image.natural_width()),
        f64::from(image.natural_height()),
    )
    .ok_or_else(|| "画像サイズが不正です".to_string())?;

    ctx.clear_rect(0.0, 0.0, width, height);
    ctx.draw_image_with_html_image_element_and_dw_and_dh(
        image,
        letterbox.x,
        letterbox.y,
        letterbox.width,
        letterbox.height,
    )
    .map_err(crate::api::server::js_error)?;

    draw_overlays(&ctx, &Surface::letterboxed(&letterbox), detections);
    Ok(())
}
