//! 判定サーバーのHTTPクライアント
//!
//! - GET  /get_assessment_data
//! - DELETE /api/delete-assessment/{id}
//! - POST /detect_frame（multipart）
//! - POST /save_assessment（multipart）

use crate::error::{InspectError, Result};
use kaong_common::protocol::{
    delete_path, media_type_for_extension, validate_upload_media_type, SaveAssessmentForm,
    ASSESSMENTS_PATH, DETECT_FRAME_PATH, SAVE_ASSESSMENT_PATH,
};
use kaong_common::dashboard::{DashboardState, DeleteOutcome};
use kaong_common::{AssessmentRecord, DetectionResponse};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

pub struct ApiClient {
    http: Client,
    base_url: String,
}

/// アップロードする画像
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// ファイルを読み込む。画像以外は読み込み前に拒否する
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InspectError::FileNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let media_type = media_type_for_extension(extension).unwrap_or("application/octet-stream");
        validate_upload_media_type(media_type)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self {
            file_name,
            media_type: media_type.to_string(),
            bytes: std::fs::read(path)?,
        })
    }

    fn part(&self) -> Result<Part> {
        Ok(Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.media_type)?)
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_status(response: &reqwest::Response, path: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(InspectError::ServerStatus {
                status: status.as_u16(),
                path: path.to_string(),
            })
        }
    }

    /// 全判定レコードを取得する
    pub async fn fetch_assessments(&self) -> Result<Vec<AssessmentRecord>> {
        log::debug!("GET {}", ASSESSMENTS_PATH);
        let response = self.http.get(self.url(ASSESSMENTS_PATH)).send().await?;
        Self::check_status(&response, ASSESSMENTS_PATH)?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// レコードを削除する（2xx以外は失敗）
    pub async fn delete_assessment(&self, id: i64) -> Result<()> {
        let path = delete_path(id);
        log::debug!("DELETE {}", path);
        let response = self.http.delete(self.url(&path)).send().await?;
        Self::check_status(&response, &path)
    }

    /// レコードを削除し、成功したら全件を読み込み直す
    ///
    /// 削除に失敗した場合は状態を変えずに `DeleteFailed` を返す。
    pub async fn delete_and_reload(&self, state: &mut DashboardState, id: i64) -> Result<DeleteOutcome> {
        let response = self.delete_assessment(id).await.map_err(|e| e.to_string());
        let outcome = state.finish_delete(id, response);
        if let DeleteOutcome::Failed(message) = &outcome {
            return Err(InspectError::DeleteFailed { id, message: message.clone() });
        }

        let token = state.begin_reload();
        let records = self.fetch_assessments().await?;
        state.finish_reload(token, Ok(records));
        Ok(outcome)
    }

    /// 画像を検出サービスに送る
    ///
    /// サービスがエラー本文（`{"error": ...}`）を返した場合は
    /// ステータスに関わらずそのまま返す。
    pub async fn detect_image(&self, upload: &ImageUpload) -> Result<DetectionResponse> {
        log::debug!("POST {} ({} bytes)", DETECT_FRAME_PATH, upload.bytes.len());
        let form = Form::new().part("image", upload.part()?);
        let response = self
            .http
            .post(self.url(DETECT_FRAME_PATH))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<DetectionResponse>(&body) {
                if parsed.error.is_some() {
                    return Ok(parsed);
                }
            }
            return Err(InspectError::ServerStatus {
                status: status.as_u16(),
                path: DETECT_FRAME_PATH.to_string(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// 判定結果を保存する
    pub async fn save_assessment(&self, upload: &ImageUpload, form: &SaveAssessmentForm) -> Result<()> {
        let mut multipart = Form::new().part("image", upload.part()?);
        for (name, value) in form.text_fields() {
            multipart = multipart.text(name, value);
        }

        log::debug!("POST {}", SAVE_ASSESSMENT_PATH);
        let response = self
            .http
            .post(self.url(SAVE_ASSESSMENT_PATH))
            .multipart(multipart)
            .send()
            .await?;
        Self::check_status(&response, SAVE_ASSESSMENT_PATH)
    }
}
