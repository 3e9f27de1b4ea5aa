//! 判定サーバーAPI（同一オリジンへのfetch）

use kaong_common::protocol::{
    delete_path, SaveAssessmentForm, ASSESSMENTS_PATH, DETECT_FRAME_PATH, SAVE_ASSESSMENT_PATH,
};
use kaong_common::{AssessmentRecord, DetectionResponse};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, FormData, Request, RequestInit, RequestMode, Response};

/// JSの例外を表示用の文字列にする
pub fn js_error(value: JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

async fn send(method: &str, path: &str, body: Option<&JsValue>) -> Result<Response, JsValue> {
    let mut opts = RequestInit::new();
    opts.method(method);
    opts.mode(RequestMode::SameOrigin);
    if let Some(body) = body {
        opts.body(Some(body));
    }

    let request = Request::new_with_str_and_init(path, &opts)?;
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
    resp_value.dyn_into()
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: &Response) -> Result<T, JsValue> {
    let json = JsFuture::from(resp.json()?).await?;
    Ok(serde_wasm_bindgen::from_value(json)?)
}

/// 全判定レコードを取得する
pub async fn fetch_assessments() -> Result<Vec<AssessmentRecord>, String> {
    let resp = send("GET", ASSESSMENTS_PATH, None).await.map_err(js_error)?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    read_json(&resp).await.map_err(js_error)
}

/// レコードを削除する（2xx以外は失敗）
pub async fn delete_assessment(id: i64) -> Result<(), String> {
    let resp = send("DELETE", &delete_path(id), None).await.map_err(js_error)?;
    if resp.ok() {
        Ok(())
    } else {
        Err(format!("HTTP {}", resp.status()))
    }
}

/// アップロード画像を検出サービスに送る
///
/// サービスのエラー本文（`{"error": ...}`）はステータスに関わらず返す。
pub async fn detect_upload(image: &Blob, file_name: &str) -> Result<DetectionResponse, String> {
    let form = FormData::new().map_err(js_error)?;
    form.append_with_blob_and_filename("image", image, file_name)
        .map_err(js_error)?;

    let resp = send("POST", DETECT_FRAME_PATH, Some(form.as_ref()))
        .await
        .map_err(js_error)?;
    let status = resp.status();
    let parsed: Result<DetectionResponse, String> = read_json(&resp).await.map_err(js_error);

    match parsed {
        Ok(body) if resp.ok() || body.error.is_some() => Ok(body),
        Ok(_) => Err(format!("HTTP {}", status)),
        Err(e) if resp.ok() => Err(e),
        Err(_) => Err(format!("HTTP {}", status)),
    }
}

/// 判定結果を保存する
pub async fn save_assessment(image: &Blob, file_name: &str, form: &SaveAssessmentForm) -> Result<(), String> {
    let data = FormData::new().map_err(js_error)?;
    data.append_with_blob_and_filename("image", image, file_name)
        .map_err(js_error)?;
    for (name, value) in form.text_fields() {
        data.append_with_str(name, &value).map_err(js_error)?;
    }

    let resp = send("POST", SAVE_ASSESSMENT_PATH, Some(data.as_ref()))
        .await
        .map_err(js_error)?;
    if resp.ok() {
        Ok(())
    } else {
        Err(format!("HTTP {}", resp.status()))
    }
}
