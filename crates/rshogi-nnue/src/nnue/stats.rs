//! NNUE 統計カウンタ（デバッグ・チューニング用）
//!
//! propagate 回数、バケットの使用分布、疎入力 L1 の非ゼロチャンク数を測定する。
//! `nnue-stats` feature 有効時のみカウントを行う。
//!
//! # 使用方法
//!
//! ```bash
//! cargo build --release --features nnue-stats
//! ```

#[cfg(feature = "nnue-stats")]
use super::constants::LAYER_STACKS;
#[cfg(feature = "nnue-stats")]
use std::sync::atomic::{AtomicU64, Ordering};

/// NNUE propagate 統計
#[cfg(feature = "nnue-stats")]
pub struct NnueStats {
    /// propagate 呼び出し回数
    pub propagate_count: AtomicU64,
    /// L1 で処理した非ゼロチャンク数の累計
    pub nonzero_chunks: AtomicU64,
    /// バケットごとの使用回数
    pub bucket_counts: [AtomicU64; LAYER_STACKS],
}

#[cfg(feature = "nnue-stats")]
impl NnueStats {
    /// 新規作成
    pub const fn new() -> Self {
        Self {
            propagate_count: AtomicU64::new(0),
            nonzero_chunks: AtomicU64::new(0),
            bucket_counts: [const { AtomicU64::new(0) }; LAYER_STACKS],
        }
    }

    /// カウンタをリセット
    pub fn reset(&self) {
        self.propagate_count.store(0, Ordering::Relaxed);
        self.nonzero_chunks.store(0, Ordering::Relaxed);
        for count in &self.bucket_counts {
            count.store(0, Ordering::Relaxed);
        }
    }

    /// propagate 呼び出しをカウント
    #[inline]
    pub fn count_propagate(&self, bucket: usize, nonzero_chunks: usize) {
        self.propagate_count.fetch_add(1, Ordering::Relaxed);
        self.nonzero_chunks.fetch_add(nonzero_chunks as u64, Ordering::Relaxed);
        if let Some(count) = self.bucket_counts.get(bucket) {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 統計情報を取得
    pub fn snapshot(&self) -> NnueStatsSnapshot {
        let mut bucket_histogram = [0u64; LAYER_STACKS];
        for (dst, src) in bucket_histogram.iter_mut().zip(&self.bucket_counts) {
            *dst = src.load(Ordering::Relaxed);
        }
        NnueStatsSnapshot {
            propagate_count: self.propagate_count.load(Ordering::Relaxed),
            nonzero_chunks: self.nonzero_chunks.load(Ordering::Relaxed),
            bucket_histogram,
        }
    }
}

#[cfg(feature = "nnue-stats")]
impl Default for NnueStats {
    fn default() -> Self {
        Self::new()
    }
}

/// グローバル統計インスタンス
#[cfg(feature = "nnue-stats")]
pub static NNUE_STATS: NnueStats = NnueStats::new();

/// 統計スナップショット
#[cfg(feature = "nnue-stats")]
#[derive(Debug, Clone, Copy, Default)]
pub struct NnueStatsSnapshot {
    pub propagate_count: u64,
    pub nonzero_chunks: u64,
    pub bucket_histogram: [u64; LAYER_STACKS],
}

#[cfg(feature = "nnue-stats")]
impl NnueStatsSnapshot {
    /// 1回の propagate あたりの平均非ゼロチャンク数
    pub fn average_nonzero_chunks(&self) -> f64 {
        if self.propagate_count == 0 {
            0.0
        } else {
            self.nonzero_chunks as f64 / self.propagate_count as f64
        }
    }

    /// 統計を log に出力
    pub fn log_summary(&self) {
        log::info!(
            "[nnue-stats] propagate={} avg_nonzero_chunks={:.2} buckets={:?}",
            self.propagate_count,
            self.average_nonzero_chunks(),
            self.bucket_histogram
        );
    }
}

/// propagate をカウント（feature 無効時は何もしない）
#[inline(always)]
#[allow(unused_variables)]
pub(crate) fn count_propagate(bucket: usize, nonzero_chunks: usize) {
    #[cfg(feature = "nnue-stats")]
    NNUE_STATS.count_propagate(bucket, nonzero_chunks);
}
