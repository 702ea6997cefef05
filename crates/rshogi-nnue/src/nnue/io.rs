//! 評価関数ファイルのヘッダ I/O
//!
//! ネットワーク部のレイアウト（little endian）:
//!
//! ```text
//! u32   構造ハッシュ
//! u32   構造文字列の長さ（1..=MAX_ARCH_LEN）
//! [u8]  構造文字列（UTF-8）
//! バケット数だけ繰り返し:
//!       L1 バイアス i32[8],  L1 重み i8[8 × 512]
//! 共有: L2 バイアス i32[96], L2 重み i8[96 × 32]（入力 8 を 32 にパディング）
//!       L3 バイアス i32[1],  L3 重み i8[1 × 96]
//! ```
//!
//! テンソルを読む前に必ずヘッダを検証する。

use super::constants::MAX_ARCH_LEN;
use super::error::{NnueError, NnueResult};
use std::io::{self, Read, Write};

/// ヘッダ先頭の固定長部分（hash + arch_len）
pub const HEADER_PREFIX_SIZE: usize = 8;

/// u32（LE）を読み込み
pub(crate) fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf4 = [0u8; 4];
    reader.read_exact(&mut buf4)?;
    Ok(u32::from_le_bytes(buf4))
}

/// ネットワーク部のヘッダ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHeader {
    /// 構造ハッシュ
    pub hash: u32,
    /// 構造文字列
    pub arch: String,
}

impl NetworkHeader {
    /// 新規作成
    pub fn new(hash: u32, arch: impl Into<String>) -> Self {
        Self {
            hash,
            arch: arch.into(),
        }
    }

    /// ストリームから読み込み
    ///
    /// 構造文字列の長さが 0 または `MAX_ARCH_LEN` を超える場合はエラー。
    pub fn read<R: Read>(reader: &mut R) -> NnueResult<Self> {
        let hash = read_u32(reader)?;
        let arch_len = read_u32(reader)? as usize;
        if arch_len == 0 || arch_len > MAX_ARCH_LEN {
            return Err(NnueError::InvalidArchLength(arch_len));
        }

        let mut arch = vec![0u8; arch_len];
        reader.read_exact(&mut arch)?;
        let arch = String::from_utf8_lossy(&arch).into_owned();

        log::debug!("NNUE header: hash=0x{hash:08X}, arch={arch}");
        Ok(Self { hash, arch })
    }

    /// バイト列の先頭から読み込み（ロードせずにヘッダのみ解析）
    pub fn from_bytes(bytes: &[u8]) -> NnueResult<Self> {
        let mut reader = bytes;
        Self::read(&mut reader)
    }

    /// ストリームへ書き出し
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.hash.to_le_bytes())?;
        writer.write_all(&(self.arch.len() as u32).to_le_bytes())?;
        writer.write_all(self.arch.as_bytes())
    }

    /// エンコード後のバイト数
    pub fn encoded_len(&self) -> usize {
        HEADER_PREFIX_SIZE + self.arch.len()
    }
}

/// ヘッダを読み込み（`NetworkHeader::read` の関数版）
pub fn read_header<R: Read>(reader: &mut R) -> NnueResult<NetworkHeader> {
    NetworkHeader::read(reader)
}

/// ストリームが終端に達しているか確認
///
/// パラメータの後ろに余分なバイトがあればエラー。
pub(crate) fn expect_eof<R: Read>(reader: &mut R) -> NnueResult<()> {
    let mut extra = [0u8; 1];
    loop {
        match reader.read(&mut extra) {
            Ok(0) => return Ok(()),
            Ok(_) => return Err(NnueError::TrailingData),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
