//! NNUE評価関数モジュール（LayerStack 推論コア）
//!
//! 外部の FeatureTransformer が生成した埋め込みベクトル（512 バイト）を受け取り、
//! 量子化済みの固定トポロジーネットワークで1つの整数評価値に変換する。
//!
//! - 層の実装（InputSlice / アフィン変換 / ClippedReLU / SqrClippedReLU）
//! - LayerStack（L1 のバケット選択）
//! - ネットワークの合成と Scratch バッファ
//! - 評価関数ファイルの読み込みと構造ハッシュの照合

mod aligned;
mod constants;
mod error;
mod io;
mod layer_stack;
mod layers;
mod network;
mod network_layer_stacks;
mod stats;


pub use aligned::Aligned;
pub use constants::*;
pub use error::{NnueError, NnueResult};
pub use io::{HEADER_PREFIX_SIZE, NetworkHeader, read_header};
pub use layer_stack::LayerStack;
pub use layers::{
    AffineTransform, AffineTransformSparseInput, ClippedReLU, InputSlice, SqrClippedReLU,
    padded_input,
};
pub use network::{
    NnueFormatInfo, NnueNetwork, detect_format, fv_scale, get_fv_scale_override, get_network,
    init_nnue, init_nnue_from_bytes, is_nnue_initialized, set_fv_scale_override,
};
pub use network_layer_stacks::{
    Ac0, Ac1, Architecture, DefaultNetwork, InputLayer, L1, L2, L3, LAYER_STACKS_HASH,
    LAYER_STACKS_STRUCTURE, LayerStackNetwork, Network, SINGLE_STACK_HASH,
    SINGLE_STACK_STRUCTURE, Scratch, SingleStackNetwork, composed_hash_value,
    composed_structure_string,
};
#[cfg(feature = "nnue-stats")]
pub use stats::{NNUE_STATS, NnueStats, NnueStatsSnapshot};
