//! # rshogi-nnue
//!
//! YaneuraOu互換の LayerStack NNUE 推論コア。
//!
//! ## モジュール構成
//!
//! - `nnue`: 層の実装、バケット選択、ネットワーク合成、評価関数ファイルの読み込み
//!
//! 盤面表現・特徴量抽出・探索はこのクレートの外側にあり、
//! ここでは埋め込みベクトルから評価値までの順伝播だけを扱う。

pub mod nnue;

pub use nnue::{
    DefaultNetwork, LayerStackNetwork, Network, NnueError, NnueNetwork, NnueResult, Scratch,
    SingleStackNetwork,
};
