//! # 画像フォーマット判定
//!
//! アップロードされたバイト列の構造からフォーマットを判定し、
//! 正規の (フォーマット名, 拡張子, MIMEタイプ) の組に対応付ける。
//! ファイル名やクライアント申告のContent-Typeは一切参照しない。
//!
//! ## 判定順序
//! 1. AVIF: `ftyp` のブランドを確認し、`meta` 内の画像アイテムまでボックス構造を検証する
//! 2. その他: マジックバイトでフォーマットを推定し、ヘッダをデコードして確定する
//!
//! ヘッダのデコードに失敗した場合はエラーを返す。
//! デコードできたが対応表に無いフォーマットはJPEGとして扱う。

mod avif;

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

/// 対応するファイル拡張子（小文字、ドット付き）。
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif"];

/// 対応表に無いフォーマットのフォールバック先。
const JPEG: FormatDescriptor = FormatDescriptor {
    format: "jpeg",
    extension: ".jpg",
    mime_type: "image/jpeg",
};

/// フォーマット名と正規の拡張子・MIMEタイプの対応表。
const FORMAT_TABLE: &[FormatDescriptor] = &[
    JPEG,
    FormatDescriptor {
        format: "png",
        extension: ".png",
        mime_type: "image/png",
    },
    FormatDescriptor {
        format: "gif",
        extension: ".gif",
        mime_type: "image/gif",
    },
    FormatDescriptor {
        format: "webp",
        extension: ".webp",
        mime_type: "image/webp",
    },
    FormatDescriptor {
        format: "avif",
        extension: ".avif",
        mime_type: "image/avif",
    },
];

/// 判定結果の画像フォーマット。
///
/// 拡張子とMIMEタイプは常にフォーマット名に対する正規の組である。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// 小文字のフォーマット名（例: "jpeg"）
    pub format: &'static str,
    /// ドット付きの拡張子（例: ".jpg"）
    pub extension: &'static str,
    /// MIMEタイプ（例: "image/jpeg"）
    pub mime_type: &'static str,
}

impl FormatDescriptor {
    /// 対応表からフォーマット名で引く。
    pub fn lookup(format: &str) -> Option<Self> {
        FORMAT_TABLE.iter().find(|d| d.format == format).cloned()
    }

    /// 対応表に無いフォーマットに用いるデフォルト（JPEG）。
    pub fn fallback() -> Self {
        JPEG
    }
}

/// フォーマット判定のエラー型
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// どのフォーマットとしてもヘッダをデコードできない
    #[error("画像フォーマットのデコードに失敗しました: {0}")]
    Decode(String),
}

/// バイト列から画像フォーマットを判定する。
///
/// 入力は借用するのみで、呼び出し後も同じバイト列を再度読み取れる。
pub fn detect_image_format(data: &[u8]) -> Result<FormatDescriptor, FormatError> {
    let format = sniff_format_name(data).inspect_err(|e| {
        tracing::error!(error = %e, size = data.len(), "画像フォーマットのデコードに失敗しました");
    })?;
    let format = format.to_ascii_lowercase();
    tracing::debug!(format = %format, "画像フォーマットを検出しました");

    match FormatDescriptor::lookup(&format) {
        Some(descriptor) => Ok(descriptor),
        None => {
            tracing::debug!(
                original_format = %format,
                "未対応のフォーマットを検出しました。JPEGとして扱います"
            );
            Ok(FormatDescriptor::fallback())
        }
    }
}

/// 登録済みの判定規則を順に適用し、最初に確定したフォーマット名を返す。
fn sniff_format_name(data: &[u8]) -> Result<String, FormatError> {
    // AVIFを名乗るデータは構造検証の結果で確定させ、他の規則には回さない
    if avif::has_avif_brand(data) {
        let (width, height) = avif::read_dimensions(data)?;
        tracing::trace!(width, height, "AVIFコンテナを解析しました");
        return Ok("avif".to_string());
    }

    let format = image::guess_format(data)
        .map_err(|e| FormatError::Decode(format!("シグネチャが一致しません: {e}")))?;

    // ヘッダまで読み、構造的に正しいことを確認する
    let (width, height) = ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map_err(|e| FormatError::Decode(format!("{format:?}ヘッダの解析に失敗: {e}")))?;
    tracing::trace!(?format, width, height, "ヘッダを解析しました");

    Ok(format_name(format))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        other => format!("{other:?}"),
    }
}

/// ファイル名の拡張子が対応拡張子か判定する（大文字小文字は区別しない）。
///
/// 一覧表示等の事前フィルタ用。内容の判定には [`detect_image_format`] を使うこと。
pub fn is_image_file(filename: &str) -> bool {
    // 末尾の区切り文字は正規化しない（"photo.jpg/" は拡張子なし）
    let name = match filename.rfind('/') {
        Some(slash) => &filename[slash + 1..],
        None => filename,
    };
    let Some(dot) = name.rfind('.') else {
        return false;
    };
    let ext = name[dot..].to_ascii_lowercase();
    SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
}
