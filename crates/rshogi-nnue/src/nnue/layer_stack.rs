//! LayerStack（L1 のバケット別パラメータ）
//!
//! 評価関数ファイルには L1 だけが `N` 個格納されており、局面の文脈
//! （残り駒数などから外部で計算したバケット番号）で1つを選んで使う。
//! L2 以降はバケット間で共有する。

/// バケット別パラメータの固定長配列
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerStack<T, const N: usize> {
    stacks: [T; N],
}

impl<T, const N: usize> LayerStack<T, N> {
    /// バケット数
    pub const BUCKETS: usize = N;

    /// 各バケットをクロージャで生成
    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        const {
            assert!(N > 0, "LayerStack requires at least one bucket");
        }
        Self {
            stacks: std::array::from_fn(f),
        }
    }

    /// バケット数を取得
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    /// バケット数が0かどうか（常に false）
    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// バケットを選択
    ///
    /// `bucket` が `[0, N)` の外なら panic する（呼び出し側の契約違反）。
    /// 範囲外をクランプして続行することはしない。
    #[inline]
    pub fn select(&self, bucket: usize) -> &T {
        assert!(bucket < N, "LayerStack bucket out of range: {bucket} (buckets = {N})");
        &self.stacks[bucket]
    }

    /// バケットを取得（範囲外なら None）
    #[inline]
    pub fn get(&self, bucket: usize) -> Option<&T> {
        self.stacks.get(bucket)
    }

    /// バケットを可変で取得（範囲外なら None）
    #[inline]
    pub fn get_mut(&mut self, bucket: usize) -> Option<&mut T> {
        self.stacks.get_mut(bucket)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.stacks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.stacks.iter_mut()
    }
}
