//! NNUE定数定義
//!
//! YaneuraOu の LayerStack[8x8<-2048] アーキテクチャに基づき、
//! ネットワーク構造とスケーリングに関する定数をまとめる。

// =============================================================================
// 次元定義
// =============================================================================

/// 変換後の次元数（片方の視点）
pub const TRANSFORMED_FEATURE_DIMENSIONS: usize = 256;

/// ネットワーク入力次元（2視点分を連結）
pub const INPUT_DIMENSIONS: usize = TRANSFORMED_FEATURE_DIMENSIONS * 2; // 512

/// L1 層出力次元
pub const L1_OUTPUT_DIMENSIONS: usize = 8;

/// L2 層出力次元
pub const L2_OUTPUT_DIMENSIONS: usize = 96;

/// 出力次元数
pub const OUTPUT_DIMENSIONS: usize = 1;

/// 評価関数ファイルに格納されるネットワーク数（L1 のスタック数）
pub const LAYER_STACKS: usize = 8;

// =============================================================================
// スケーリング定数
// =============================================================================

/// 重みのスケーリングビット数
pub const WEIGHT_SCALE_BITS: u32 = 6;

/// 活性化関数の出力最大値（127 = 2^7 - 1）
pub const CLIPPED_RELU_MAX: i32 = 127;

/// SqrClippedReLU の入力クランプ上限（127 << 6 = 8128）
pub const SQR_CLIPPED_RELU_INPUT_MAX: i32 = CLIPPED_RELU_MAX << WEIGHT_SCALE_BITS;

/// SqrClippedReLU の右シフト量
///
/// x² >> (2 * 6 + 7) で [0, 127] に正規化
pub const SQR_CLIPPED_RELU_SHIFT: u32 = 2 * WEIGHT_SCALE_BITS + 7; // 19

/// 評価値のスケーリング（デフォルト: 16）
///
/// YaneuraOu のデフォルト値。評価関数によっては異なる値が必要になるため、
/// `set_fv_scale_override` で実行時に上書きできる。
pub const FV_SCALE: i32 = 16;

// =============================================================================
// メモリレイアウト / ファイル形式
// =============================================================================

/// キャッシュラインサイズ（バイト）
pub const CACHE_LINE_SIZE: usize = 64;

/// アフィン変換の入力次元パディング単位（SIMDアライメント用）
pub const INPUT_PADDING: usize = 32;

/// 疎入力アフィン変換のチャンクサイズ（u8×4 = i32として扱う単位）
pub const SPARSE_CHUNK_SIZE: usize = 4;

/// アーキテクチャ文字列の最大長（破損ファイル/DoS対策）
pub const MAX_ARCH_LEN: usize = 4096;
