//! # APIキー認証
//!
//! `Authorization: Bearer <token>` ヘッダからのトークン抽出と、
//! 設定済みAPIキーとの固定時間比較を行う。
//!
//! ## 拒否理由の扱い
//! ヘッダ欠落・形式不正・キー不一致はすべて同一の [`AuthError::Unauthorized`] に集約される。
//! 内部の [`RejectReason`] はログ出力専用であり、レスポンスには含めない。

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Authorizationヘッダのスキーム。
pub const BEARER_SCHEME: &str = "Bearer";

/// マスク時に残す先頭文字数。
const MASK_VISIBLE_CHARS: usize = 4;

/// マスク文字列。
const MASK: &str = "****";

/// 認証拒否の内部理由。ログ出力専用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Authorizationヘッダが存在しない
    MissingHeader,
    /// `Bearer <token>` 形式ではない
    MalformedHeader,
    /// トークンが設定済みAPIキーと一致しない
    KeyMismatch,
}

impl RejectReason {
    /// ログフィールド用の識別子。
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingHeader => "missing_header",
            RejectReason::MalformedHeader => "malformed_header",
            RejectReason::KeyMismatch => "key_mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 認証エラー型。
///
/// `Display` は理由に関わらず同一の文字列を返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// APIキーが無効（理由は内部診断用）
    #[error("Invalid API key")]
    Unauthorized(RejectReason),
}

impl AuthError {
    /// ログ用の拒否理由。
    pub fn reason(&self) -> RejectReason {
        match self {
            AuthError::Unauthorized(reason) => *reason,
        }
    }
}

/// 設定済みAPIキー。
///
/// プロセス起動時に一度だけ構築され、全リクエストから読み取り専用で共有される。
/// 比較対象はSHA-256ダイジェストとして保持し、平文はメモリ上に残さない。
#[derive(Clone)]
pub struct ApiKey {
    digest: [u8; 32],
}

impl ApiKey {
    /// 設定値からAPIキーを構築する。
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            digest: digest(secret.as_ref()),
        }
    }

    /// 提示されたトークンを固定時間で比較する。
    ///
    /// 双方を32バイトのダイジェストに変換してから比較するため、
    /// 処理時間は不一致位置にも長さの違いにも依存しない。
    pub fn verify(&self, provided: &str) -> bool {
        let provided = digest(provided.as_bytes());
        self.digest.ct_eq(&provided).into()
    }

    /// Authorizationヘッダ値を検証する。
    ///
    /// トークン抽出と比較を一度に行い、成功時は抽出したトークンを返す。
    pub fn authorize<'a>(&self, header: Option<&'a str>) -> Result<&'a str, AuthError> {
        let token = extract_bearer(header)?;
        if self.verify(token) {
            Ok(token)
        } else {
            Err(AuthError::Unauthorized(RejectReason::KeyMismatch))
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Authorizationヘッダ値からBearerトークンを抽出する。
///
/// 単一スペースで分割した結果がちょうど2要素であり、先頭が `Bearer`、
/// 後続が空でない場合のみ受け付ける。
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::Unauthorized(RejectReason::MissingHeader))?;
    if header.is_empty() {
        return Err(AuthError::Unauthorized(RejectReason::MissingHeader));
    }

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::Unauthorized(RejectReason::MalformedHeader)),
    }
}

/// ログ出力用にAPIキーをマスクする。
///
/// 先頭4文字のみ残し、残りを固定長の `****` に置き換える。
/// 4文字以下のキーは全体をマスクする。
pub fn mask_api_key(key: &str) -> String {
    match key.char_indices().nth(MASK_VISIBLE_CHARS) {
        Some((idx, _)) => format!("{}{MASK}", &key[..idx]),
        None => MASK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::time::{Duration, Instant};

    /// 正しいBearerヘッダからトークンが抽出されることを確認
    #[test]
    fn test_extract_bearer_valid() {
        assert_eq!(extract_bearer(Some("Bearer secret-key")), Ok("secret-key"));
    }

    /// ヘッダ欠落・空文字列がMissingHeaderとして拒否されることを確認
    #[test]
    fn test_extract_bearer_missing() {
        for header in [None, Some("")] {
            assert_eq!(
                extract_bearer(header),
                Err(AuthError::Unauthorized(RejectReason::MissingHeader))
            );
        }
    }

    /// 不正な形式のヘッダがすべてMalformedHeaderとして拒否されることを確認
    #[test]
    fn test_extract_bearer_malformed() {
        let cases = [
            "Bearer",
            "Bearer ",
            "bearer secret",
            "Basic c2VjcmV0",
            "Token secret",
            "Bearer  secret",
            "Bearer secret extra",
            " Bearer secret",
            "Bearer secret ",
            "Bearersecret",
        ];
        for header in cases {
            assert_eq!(
                extract_bearer(Some(header)),
                Err(AuthError::Unauthorized(RejectReason::MalformedHeader)),
                "受け付けてしまった: {header:?}"
            );
        }
    }

    /// 一致・不一致・長さ違いが正しく判定されることを確認
    #[test]
    fn test_verify() {
        let key = ApiKey::new("correct-horse-battery-staple");
        assert!(key.verify("correct-horse-battery-staple"));
        assert!(!key.verify("correct-horse-battery-stapl"));
        assert!(!key.verify("correct-horse-battery-staple!"));
        assert!(!key.verify("Correct-horse-battery-staple"));
        assert!(!key.verify(""));
    }

    /// ランダムな鍵と近似トークンについて、一致判定がバイト等価と一致することを確認
    #[test]
    fn test_verify_matches_byte_equality() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(1..64);
            let secret: String = (0..len)
                .map(|_| rng.gen_range(b'!'..=b'~') as char)
                .collect();
            let key = ApiKey::new(&secret);
            assert!(key.verify(&secret));

            let mut bytes = secret.clone().into_bytes();
            let pos = rng.gen_range(0..bytes.len());
            bytes[pos] = if bytes[pos] == b'a' { b'b' } else { b'a' };
            let near = String::from_utf8(bytes).unwrap();
            assert_eq!(key.verify(&near), near == secret);
        }
    }

    /// 不一致位置が先頭か末尾かで比較時間に大きな差が出ないことを確認
    ///
    /// 実時間の計測は負荷の高い環境で揺らぐため通常の実行からは外している。
    /// `cargo test -p imageflow-core -- --ignored` で実行する。
    #[test]
    #[ignore = "実時間の計測を含むため --ignored 指定時のみ実行"]
    fn test_verify_timing_independent_of_mismatch_position() {
        let secret = "k".repeat(4096);
        let key = ApiKey::new(&secret);

        let mut first = secret.clone().into_bytes();
        first[0] = b'x';
        let first = String::from_utf8(first).unwrap();
        let mut last = secret.clone().into_bytes();
        last[4095] = b'x';
        let last = String::from_utf8(last).unwrap();

        let measure = |token: &str| -> Duration {
            let mut best = Duration::MAX;
            for _ in 0..15 {
                let start = Instant::now();
                for _ in 0..2000 {
                    std::hint::black_box(key.verify(std::hint::black_box(token)));
                }
                best = best.min(start.elapsed());
            }
            best
        };

        let t_first = measure(&first).as_nanos() as f64;
        let t_last = measure(&last).as_nanos() as f64;
        let ratio = t_first.max(t_last) / t_first.min(t_last).max(1.0);
        assert!(ratio < 3.0, "比較時間の偏りが大きすぎる: {t_first} vs {t_last}");
    }

    /// authorizeがトークン抽出と比較を組み合わせて判定することを確認
    #[test]
    fn test_authorize() {
        let key = ApiKey::new("secret");
        assert_eq!(key.authorize(Some("Bearer secret")), Ok("secret"));
        assert_eq!(
            key.authorize(Some("Bearer wrong")),
            Err(AuthError::Unauthorized(RejectReason::KeyMismatch))
        );
        assert_eq!(
            key.authorize(None),
            Err(AuthError::Unauthorized(RejectReason::MissingHeader))
        );
    }

    /// エラーの表示文字列が理由に関わらず同一であることを確認
    #[test]
    fn test_error_display_uniform() {
        let messages: Vec<String> = [
            RejectReason::MissingHeader,
            RejectReason::MalformedHeader,
            RejectReason::KeyMismatch,
        ]
        .into_iter()
        .map(|r| AuthError::Unauthorized(r).to_string())
        .collect();
        assert!(messages.iter().all(|m| m == "Invalid API key"));
    }

    /// Debug出力に鍵の内容が含まれないことを確認
    #[test]
    fn test_api_key_debug_redacted() {
        let key = ApiKey::new("super-secret");
        assert_eq!(format!("{key:?}"), "ApiKey([REDACTED])");
    }

    /// マスク処理が先頭4文字のみを残すことを確認
    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("abcdefgh"), "abcd****");
        assert_eq!(mask_api_key("abcde"), "abcd****");
        assert_eq!(mask_api_key("abcd"), "****");
        assert_eq!(mask_api_key("ab"), "****");
        assert_eq!(mask_api_key(""), "****");
        // マルチバイト文字でもコードポイント境界で切る
        assert_eq!(mask_api_key("鍵鍵鍵鍵鍵鍵"), "鍵鍵鍵鍵****");
    }

    /// マスク結果に入力由来の文字が4文字を超えて含まれないことを確認
    #[test]
    fn test_mask_api_key_leaks_at_most_four_chars() {
        for len in 0..40 {
            let key: String = "x".repeat(len);
            let masked = mask_api_key(&key);
            let literal = masked.trim_end_matches('*');
            assert!(literal.chars().count() <= 4);
            assert!(masked.ends_with(MASK));
        }
    }
}
