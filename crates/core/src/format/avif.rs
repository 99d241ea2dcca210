//! # AVIFコンテナの構造検証
//!
//! ISO-BMFF (HEIF) のボックス構造を辿り、画像アイテムとして成立していることを確認する。
//! AV1ビットストリーム自体のデコードは行わない。
//!
//! ## 受け付ける条件
//! - 先頭が `ftyp` ボックスで、メジャーまたは互換ブランドに `avif` / `avis` を含む
//! - トップレベルの全ボックスが宣言サイズどおりに収まっている
//! - `meta` に `hdlr`(pict)・`pitm`・`iprp/ipco/ispe` があり、寸法が0でない
//! - 画像データ (`mdat` または `meta` 内の `idat`) が存在する

use super::FormatError;

/// AVIFとして受け付けるISO-BMFFブランド。
const AVIF_BRANDS: &[&[u8; 4]] = &[b"avif", b"avis"];

/// size + type
const BOX_HEADER_LEN: usize = 8;

/// size == 1 のときに続く64bit largesizeを含めたヘッダ長
const LARGE_BOX_HEADER_LEN: usize = 16;

/// FullBoxの version + flags
const FULL_BOX_HEADER_LEN: usize = 4;

/// 1階層あたりに走査するボックス数の上限。
const MAX_BOXES_PER_LEVEL: usize = 1024;

/// 先頭の `ftyp` ボックスにAVIFブランドが含まれるか判定する。
///
/// 構造の確認は [`read_dimensions`] が行う。ここでの真は「AVIFを名乗っている」ことのみを意味する。
pub(super) fn has_avif_brand(data: &[u8]) -> bool {
    if data.len() < 16 || &data[4..8] != b"ftyp" {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 16 || box_size > data.len() || (box_size - 8) % 4 != 0 {
        return false;
    }

    let major_brand = &data[8..12];
    // 12..16 はマイナーバージョン
    let compatible = data[16..box_size].chunks_exact(4);

    std::iter::once(major_brand)
        .chain(compatible)
        .any(|brand| AVIF_BRANDS.iter().any(|b| brand == b.as_slice()))
}

/// ボックス構造を検証し、`ispe` に宣言された画像の寸法を返す。
pub(super) fn read_dimensions(data: &[u8]) -> Result<(u32, u32), FormatError> {
    let mut meta = None;
    let mut has_mdat = false;
    for entry in Boxes::new(data) {
        let entry = entry?;
        match &entry.kind {
            b"meta" if meta.is_none() => meta = Some(entry.payload),
            b"mdat" => has_mdat = true,
            _ => {}
        }
    }

    let meta = full_box_payload(meta.ok_or_else(|| malformed("metaボックスがありません"))?)?;

    let hdlr = full_box_payload(require(meta, b"hdlr")?)?;
    // pre_defined(4バイト) の後にhandler_type
    if hdlr.get(4..8) != Some(b"pict".as_slice()) {
        return Err(malformed("画像ハンドラ(pict)ではありません"));
    }
    require(meta, b"pitm")?;

    if !has_mdat && find(meta, b"idat")?.is_none() {
        return Err(malformed("画像データ(mdat/idat)がありません"));
    }

    let ipco = require(require(meta, b"iprp")?, b"ipco")?;
    let ispe = full_box_payload(require(ipco, b"ispe")?)?;
    let (Some(width), Some(height)) = (read_u32(ispe, 0), read_u32(ispe, 4)) else {
        return Err(malformed("ispeボックスが途中で切れています"));
    };
    if width == 0 || height == 0 {
        return Err(malformed(format!("画像の寸法が不正です: {width}x{height}")));
    }

    Ok((width, height))
}

/// 1つのボックス（ヘッダを除いたペイロードを保持）。
struct BmffBox<'a> {
    kind: [u8; 4],
    payload: &'a [u8],
}

/// 同一階層のボックスを先頭から順に読み出すイテレータ。
///
/// 宣言サイズが残りのデータを超えた時点でエラーを返し、以降は何も返さない。
struct Boxes<'a> {
    rest: &'a [u8],
    count: usize,
}

impl<'a> Boxes<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            rest: data,
            count: 0,
        }
    }

    fn read_box(&mut self) -> Result<BmffBox<'a>, FormatError> {
        self.count += 1;
        if self.count > MAX_BOXES_PER_LEVEL {
            return Err(malformed("ボックス数が上限を超えています"));
        }

        let rest = self.rest;
        let (Some(size), Some(kind)) = (read_u32(rest, 0), rest.get(4..8)) else {
            return Err(malformed("ボックスヘッダが途中で切れています"));
        };
        let kind: [u8; 4] = [kind[0], kind[1], kind[2], kind[3]];

        let (header_len, box_len) = match size {
            // ファイル末尾まで
            0 => (BOX_HEADER_LEN, rest.len()),
            1 => {
                let large = read_u64(rest, BOX_HEADER_LEN)
                    .ok_or_else(|| malformed("largesizeが途中で切れています"))?;
                let large = usize::try_from(large)
                    .map_err(|_| malformed("largesizeが大きすぎます"))?;
                (LARGE_BOX_HEADER_LEN, large)
            }
            n => (BOX_HEADER_LEN, n as usize),
        };
        if box_len < header_len || box_len > rest.len() {
            return Err(malformed(format!(
                "'{}' ボックスのサイズが不正です (宣言 {box_len}, 残り {})",
                String::from_utf8_lossy(&kind),
                rest.len()
            )));
        }

        self.rest = &rest[box_len..];
        Ok(BmffBox {
            kind,
            payload: &rest[header_len..box_len],
        })
    }
}

impl<'a> Iterator for Boxes<'a> {
    type Item = Result<BmffBox<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let item = self.read_box();
        if item.is_err() {
            self.rest = &[];
        }
        Some(item)
    }
}

/// 同一階層から指定種別の最初のボックスを探す。
fn find<'a>(data: &'a [u8], kind: &[u8; 4]) -> Result<Option<&'a [u8]>, FormatError> {
    for entry in Boxes::new(data) {
        let entry = entry?;
        if &entry.kind == kind {
            return Ok(Some(entry.payload));
        }
    }
    Ok(None)
}

fn require<'a>(data: &'a [u8], kind: &[u8; 4]) -> Result<&'a [u8], FormatError> {
    find(data, kind)?.ok_or_else(|| {
        malformed(format!(
            "{}ボックスがありません",
            String::from_utf8_lossy(kind)
        ))
    })
}

fn full_box_payload(payload: &[u8]) -> Result<&[u8], FormatError> {
    payload
        .get(FULL_BOX_HEADER_LEN..)
        .ok_or_else(|| malformed("FullBoxヘッダが途中で切れています"))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn malformed(detail: impl Into<String>) -> FormatError {
    FormatError::Decode(format!("AVIFコンテナが不正です: {}", detail.into()))
}
