//! NNUEネットワーク全体の読み込みと評価の入口
//!
//! 以下のアーキテクチャをサポート:
//! - **LayerStacks**: L1 を 8 バケットにスタック
//! - **SingleStack**: L1 を1つだけ持つ
//!
//! ```text
//! NnueNetwork
//! ├── LayerStacks(Box<LayerStackNetwork>)
//! └── SingleStack(Box<SingleStackNetwork>)
//! ```
//!
//! ファイル先頭の構造ハッシュでバリアントを判別し、構造文字列を照合してから
//! テンソルを読み込む。

use super::constants::{FV_SCALE, INPUT_DIMENSIONS, L1_OUTPUT_DIMENSIONS, L2_OUTPUT_DIMENSIONS};
use super::error::{NnueError, NnueResult};
use super::io::{NetworkHeader, expect_eof};
use super::network_layer_stacks::{
    Architecture, LAYER_STACKS_HASH, LayerStackNetwork, SINGLE_STACK_HASH, Scratch,
    SingleStackNetwork,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::OnceLock;

/// グローバルなNNUEネットワーク
static NETWORK: OnceLock<NnueNetwork> = OnceLock::new();

/// FV_SCALE のグローバルオーバーライド設定
///
/// 0 = 既定値（`FV_SCALE`）を使用
/// 1以上 = 指定値でオーバーライド
///
/// YaneuraOuと同様にエンジンオプションで設定可能。
static FV_SCALE_OVERRIDE: AtomicI32 = AtomicI32::new(0);

/// FV_SCALE オーバーライドを取得
///
/// 戻り値:
/// - `Some(value)`: オーバーライド値が設定されている
/// - `None`: 既定値を使用
pub fn get_fv_scale_override() -> Option<i32> {
    let value = FV_SCALE_OVERRIDE.load(Ordering::Relaxed);
    if value > 0 { Some(value) } else { None }
}

/// FV_SCALE オーバーライドを設定
///
/// 引数:
/// - `value`: 設定値（0以下 = 解除、1以上 = オーバーライド）
pub fn set_fv_scale_override(value: i32) {
    FV_SCALE_OVERRIDE.store(value.max(0), Ordering::Relaxed);
}

/// 現在有効な FV_SCALE
#[inline]
pub fn fv_scale() -> i32 {
    get_fv_scale_override().unwrap_or(FV_SCALE)
}

// =============================================================================
// NnueNetwork - アーキテクチャを抽象化するenum
// =============================================================================

/// NNUEネットワーク（2バリアント）
#[derive(Debug)]
pub enum NnueNetwork {
    /// L1 を 8 バケットにスタック
    LayerStacks(Box<LayerStackNetwork>),
    /// L1 は1つ
    SingleStack(Box<SingleStackNetwork>),
}

impl NnueNetwork {
    /// ファイルから読み込み（バリアント自動判別）
    pub fn load<P: AsRef<Path>>(path: P) -> NnueResult<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let network = Self::read(&mut reader)?;
        expect_eof(&mut reader)?;
        log::info!("NNUE file: {}", path.display());
        Ok(network)
    }

    /// バイト列から読み込み（バリアント自動判別）
    pub fn from_bytes(bytes: &[u8]) -> NnueResult<Self> {
        let mut reader = bytes;
        let network = Self::read(&mut reader)?;
        expect_eof(&mut reader)?;
        Ok(network)
    }

    /// リーダーから読み込み（バリアント自動判別）
    ///
    /// ストリームの終端は確認しない。
    pub fn read<R: Read>(reader: &mut R) -> NnueResult<Self> {
        let header = NetworkHeader::read(reader)?;
        let network = match header.hash {
            LAYER_STACKS_HASH => {
                Self::LayerStacks(Box::new(LayerStackNetwork::read_with_header(&header, reader)?))
            }
            SINGLE_STACK_HASH => {
                Self::SingleStack(Box::new(SingleStackNetwork::read_with_header(&header, reader)?))
            }
            hash => return Err(NnueError::UnknownArchitecture(hash)),
        };

        if let Some(scale) = get_fv_scale_override() {
            log::warn!("FV_SCALE override in effect: {scale} (default {FV_SCALE})");
        }
        Ok(network)
    }

    /// アーキテクチャ名
    pub fn architecture_name(&self) -> &'static str {
        match self {
            Self::LayerStacks(_) => LayerStackNetwork::NAME,
            Self::SingleStack(_) => SingleStackNetwork::NAME,
        }
    }

    /// 構造ハッシュ
    pub fn hash(&self) -> u32 {
        match self {
            Self::LayerStacks(_) => LayerStackNetwork::HASH,
            Self::SingleStack(_) => SingleStackNetwork::HASH,
        }
    }

    /// 構造文字列
    pub fn structure(&self) -> &'static str {
        match self {
            Self::LayerStacks(_) => LayerStackNetwork::STRUCTURE,
            Self::SingleStack(_) => SingleStackNetwork::STRUCTURE,
        }
    }

    /// バケット数
    pub fn bucket_count(&self) -> usize {
        match self {
            Self::LayerStacks(net) => net.bucket_count(),
            Self::SingleStack(net) => net.bucket_count(),
        }
    }

    /// 順伝播（生の出力値）
    pub fn propagate(&self, features: &[u8], scratch: &mut Scratch, bucket: usize) -> i32 {
        match self {
            Self::LayerStacks(net) => net.propagate(features, scratch, bucket),
            Self::SingleStack(net) => net.propagate(features, scratch, bucket),
        }
    }

    /// 評価値（出力を FV_SCALE で割った値）
    pub fn evaluate(&self, features: &[u8], scratch: &mut Scratch, bucket: usize) -> i32 {
        match self {
            Self::LayerStacks(net) => net.evaluate(features, scratch, bucket),
            Self::SingleStack(net) => net.evaluate(features, scratch, bucket),
        }
    }
}

/// NNUEを初期化（バリアント自動判別）
pub fn init_nnue<P: AsRef<Path>>(path: P) -> NnueResult<()> {
    if is_nnue_initialized() {
        return Err(NnueError::AlreadyInitialized);
    }
    let network = NnueNetwork::load(path)?;
    NETWORK.set(network).map_err(|_| NnueError::AlreadyInitialized)
}

/// バイト列からNNUEを初期化（バリアント自動判別）
pub fn init_nnue_from_bytes(bytes: &[u8]) -> NnueResult<()> {
    if is_nnue_initialized() {
        return Err(NnueError::AlreadyInitialized);
    }
    let network = NnueNetwork::from_bytes(bytes)?;
    NETWORK.set(network).map_err(|_| NnueError::AlreadyInitialized)
}

/// NNUEが初期化済みかどうか
pub fn is_nnue_initialized() -> bool {
    NETWORK.get().is_some()
}

/// NNUEネットワークへの参照を取得（初期化されていない場合はNone）
pub fn get_network() -> Option<&'static NnueNetwork> {
    NETWORK.get()
}

// =============================================================================
// フォーマット検出
// =============================================================================

/// NNUE フォーマット情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NnueFormatInfo {
    /// アーキテクチャ名（"LayerStacks" or "SingleStack"）
    pub architecture: String,

    /// 構造ハッシュ（生の u32 値）
    pub hash: u32,

    /// L1 のバケット数
    pub buckets: usize,

    /// 入力次元（512）
    pub input_dimension: usize,

    /// L1 出力次元（8）
    pub l1_dimension: usize,

    /// L2 出力次元（96）
    pub l2_dimension: usize,

    /// ヘッダ込みの想定ファイルサイズ
    pub expected_size: usize,

    /// アーキテクチャ文字列（生の文字列）
    pub arch_string: String,
}

impl NnueFormatInfo {
    fn for_architecture<A: Architecture>(header: NetworkHeader, expected_size: usize) -> Self {
        Self {
            architecture: A::NAME.to_string(),
            hash: header.hash,
            buckets: A::STACKS,
            input_dimension: INPUT_DIMENSIONS,
            l1_dimension: L1_OUTPUT_DIMENSIONS,
            l2_dimension: L2_OUTPUT_DIMENSIONS,
            expected_size,
            arch_string: header.arch,
        }
    }
}

/// NNUE ファイルのフォーマット情報を検出（ロードせずにヘッダのみ解析）
///
/// # Arguments
/// * `bytes` - NNUE ファイルの先頭（少なくともヘッダ全体を含むこと）
///
/// # Returns
/// * `Ok(NnueFormatInfo)` - フォーマット情報
/// * `Err(NnueError)` - ヘッダが不正、または未知のハッシュ
///
/// 構造文字列の照合はロード時に行うため、ここではハッシュのみで判別する。
pub fn detect_format(bytes: &[u8]) -> NnueResult<NnueFormatInfo> {
    let header = NetworkHeader::from_bytes(bytes)?;
    match header.hash {
        LAYER_STACKS_HASH => Ok(NnueFormatInfo::for_architecture::<LayerStackNetwork>(
            header,
            LayerStackNetwork::serialized_size(),
        )),
        SINGLE_STACK_HASH => Ok(NnueFormatInfo::for_architecture::<SingleStackNetwork>(
            header,
            SingleStackNetwork::serialized_size(),
        )),
        hash => Err(NnueError::UnknownArchitecture(hash)),
    }
}
