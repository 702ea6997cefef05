//! キャッシュラインアライメント用ラッパー

/// アライメントを保証するラッパー（64バイト = キャッシュライン）
#[repr(C, align(64))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aligned<T>(pub T);

impl<T: Default> Default for Aligned<T> {
    fn default() -> Self {
        Self(T::default())
    }
}
