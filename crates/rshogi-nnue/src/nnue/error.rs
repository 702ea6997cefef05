//! Error types for NNUE parameter loading
//!
//! 推論そのもの（propagate）は失敗しない。バケット範囲外や入力長の不一致は
//! 呼び出し側の契約違反として panic し、ここには含めない。

/// NNUE-specific errors
#[derive(thiserror::Error, Debug)]
pub enum NnueError {
    /// File I/O error（途中で切れたファイルを含む）
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 構造ハッシュがコンパイル済みネットワークと一致しない
    #[error("NNUE hash mismatch: expected 0x{expected:08X}, got 0x{actual:08X}")]
    HashMismatch { expected: u32, actual: u32 },

    /// 構造文字列がコンパイル済みネットワークと一致しない
    #[error("NNUE structure mismatch: expected {expected:?}, got {actual:?}")]
    StructureMismatch { expected: &'static str, actual: String },

    /// 構造文字列の長さが不正（0 または上限超過）
    #[error("Invalid arch string length: {0}")]
    InvalidArchLength(usize),

    /// 既知のどのアーキテクチャにも該当しないハッシュ
    #[error("Unknown NNUE architecture hash: 0x{0:08X}")]
    UnknownArchitecture(u32),

    /// パラメータの後ろに余分なデータがある
    #[error("Trailing data after NNUE parameters")]
    TrailingData,

    /// グローバルネットワークは初期化済み
    #[error("NNUE already initialized")]
    AlreadyInitialized,
}

/// Result type for NNUE operations
pub type NnueResult<T> = Result<T, NnueError>;
