//! 座標変換モジュール
//!
//! 検出サービスが返す正規化ボックスを描画面のピクセル座標に写す。
//! ライブカメラのキャンバスとアップロード画像のレターボックス表示の
//! どちらも同じ式 `offset + 正規化座標 * scale` を使う。

use crate::types::{Category, Detection};

/// ピクセル座標の矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelRect {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// 描画先の矩形（原点オフセットと拡大率）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRect {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl TargetRect {
    /// キャンバス全体（ライブカメラ用）
    pub fn full(width: f64, height: f64) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: width,
            scale_y: height,
        }
    }

    /// 正規化ボックスをピクセル座標に変換する
    pub fn map(&self, relative: [f64; 4]) -> PixelRect {
        let [x1, y1, x2, y2] = relative;
        PixelRect {
            x1: self.offset_x + x1 * self.scale_x,
            y1: self.offset_y + y1 * self.scale_y,
            x2: self.offset_x + x2 * self.scale_x,
            y2: self.offset_y + y2 * self.scale_y,
        }
    }
}

/// アスペクト比を保ってコンテナ中央に配置した画像の位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// 元画像に対する縮尺
    pub scale: f64,
    /// 描画サイズ
    pub width: f64,
    pub height: f64,
    /// コンテナ左上からの位置
    pub x: f64,
    pub y: f64,
}

impl Letterbox {
    /// コンテナに収まる最大サイズで画像を中央配置する
    ///
    /// 画像サイズが0の場合はNone
    pub fn fit(container_width: f64, container_height: f64, image_width: f64, image_height: f64) -> Option<Self> {
        if image_width <= 0.0 || image_height <= 0.0 {
            return None;
        }

        let scale = (container_width / image_width).min(container_height / image_height);
        let width = image_width * scale;
        let height = image_height * scale;

        Some(Self {
            scale,
            width,
            height,
            x: (container_width - width) / 2.0,
            y: (container_height - height) / 2.0,
        })
    }

    pub fn target(&self) -> TargetRect {
        TargetRect {
            offset_x: self.x,
            offset_y: self.y,
            scale_x: self.width,
            scale_y: self.height,
        }
    }
}

/// 描画面: 正規化座標用の矩形と、旧形式のピクセル座標用の縮尺
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub target: TargetRect,
    /// 旧形式（`box`）の座標に掛ける縮尺。ライブキャンバスでは1
    pub absolute_scale: f64,
    pub caption: CaptionPlacement,
}

impl Surface {
    /// ライブカメラのキャンバス
    pub fn live(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            target: TargetRect::full(canvas_width, canvas_height),
            absolute_scale: 1.0,
            caption: CaptionPlacement::Above,
        }
    }

    /// アップロードプレビューのキャンバス
    pub fn letterboxed(letterbox: &Letterbox) -> Self {
        Self {
            target: letterbox.target(),
            absolute_scale: letterbox.scale,
            caption: CaptionPlacement::InsideNearTop,
        }
    }

    /// 検出結果を描画座標に変換する
    pub fn place(&self, detection: &Detection) -> Placement {
        if let Some(relative) = detection.box_relative {
            return Placement::Relative(self.target.map(relative));
        }

        if let Some([x1, y1, x2, y2]) = detection.box_absolute {
            let t = &self.target;
            let s = self.absolute_scale;
            return Placement::Absolute(PixelRect {
                x1: t.offset_x + x1 * s,
                y1: t.offset_y + y1 * s,
                x2: t.offset_x + x2 * s,
                y2: t.offset_y + y2 * s,
            });
        }

        Placement::Missing
    }

    /// 描画指示を作る（ボックスのない検出はスキップ）
    pub fn overlay(&self, detection: &Detection) -> Option<Overlay> {
        let (rect, legacy) = match self.place(detection) {
            Placement::Relative(rect) => (rect, false),
            Placement::Absolute(rect) => {
                log::warn!("using absolute coordinates for {} - may not align properly", detection.label);
                (rect, true)
            }
            Placement::Missing => return None,
        };

        // 旧形式は枠のみ描く
        let caption = if !legacy && detection.score > CAPTION_MIN_SCORE {
            Some(Caption {
                text: caption_text(detection),
                position: self.caption.position(&rect),
            })
        } else {
            None
        };

        Some(Overlay {
            rect,
            color: stroke_color(&detection.label),
            caption,
        })
    }
}

/// 変換結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// 正規化座標から変換
    Relative(PixelRect),
    /// 旧形式のピクセル座標から変換
    Absolute(PixelRect),
    /// ボックス情報なし
    Missing,
}

/// ラベル文字列を表示する最小スコア
pub const CAPTION_MIN_SCORE: f64 = 0.1;

/// ラベルの配置規則
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPlacement {
    /// 枠の5px上
    Above,
    /// 上に30px以上余白があれば10px上、なければ枠内30px下。x方向に5px寄せる
    InsideNearTop,
}

impl CaptionPlacement {
    pub fn position(&self, rect: &PixelRect) -> (f64, f64) {
        match self {
            CaptionPlacement::Above => (rect.x1, rect.y1 - 5.0),
            CaptionPlacement::InsideNearTop => {
                let y = if rect.y1 > 30.0 { rect.y1 - 10.0 } else { rect.y1 + 30.0 };
                (rect.x1 + 5.0, y)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub position: (f64, f64),
}

/// 1件分の描画指示
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub rect: PixelRect,
    pub color: &'static str,
    pub caption: Option<Caption>,
}

/// ラベルごとの枠の色
pub fn stroke_color(label: &str) -> &'static str {
    match Category::from_label(label) {
        Some(Category::Ripe) => "yellow",
        Some(Category::Unripe) => "green",
        Some(Category::Rotten) => "red",
        None => "blue",
    }
}

/// "Ripe (92.3%)"
pub fn caption_text(detection: &Detection) -> String {
    format!("{} ({:.1}%)", detection.label, detection.score * 100.0)
}
