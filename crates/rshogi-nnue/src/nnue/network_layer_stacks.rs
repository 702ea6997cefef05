//! LayerStack ネットワーク本体
//!
//! # アーキテクチャ概要
//!
//! ```text
//! 埋め込み [256] × 2視点 = [512]（外部の FeatureTransformer が生成）
//!          ↓
//!     InputSlice [512]
//!          ↓
//!     L1[bucket]  AffineTransformSparseInput [512→8]
//!          ↓
//!     SqrClippedReLU [8]
//!          ↓
//!     L2  AffineTransform [8→96]
//!          ↓
//!     ClippedReLU [96]
//!          ↓
//!     L3  AffineTransform [96→1]
//!          ↓
//!       評価値（生の i32）
//! ```
//!
//! L1 だけがバケットごとに異なり、L2/L3 は全バケットで共有する。
//! L1 をスタックしない SingleStack バリアントも同じ型で表現する（`Network<1>`）。

use super::aligned::Aligned;
use super::constants::{
    INPUT_DIMENSIONS, L1_OUTPUT_DIMENSIONS, L2_OUTPUT_DIMENSIONS, LAYER_STACKS,
    OUTPUT_DIMENSIONS,
};
use super::error::{NnueError, NnueResult};
use super::io::{NetworkHeader, expect_eof};
use super::layer_stack::LayerStack;
use super::layers::{
    AffineTransform, AffineTransformSparseInput, ClippedReLU, InputSlice, SqrClippedReLU,
    padded_input,
};
use super::network::fv_scale;
use super::stats;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

// =============================================================================
// 層の定義
// =============================================================================

/// 入力層
pub type InputLayer = InputSlice<INPUT_DIMENSIONS, 0>;
/// L1（疎入力、バケットごと）
pub type L1 = AffineTransformSparseInput<INPUT_DIMENSIONS, L1_OUTPUT_DIMENSIONS>;
/// L1 の活性化
pub type Ac0 = SqrClippedReLU<L1_OUTPUT_DIMENSIONS>;
/// L2
pub type L2 = AffineTransform<L1_OUTPUT_DIMENSIONS, L2_OUTPUT_DIMENSIONS>;
/// L2 の活性化
pub type Ac1 = ClippedReLU<L2_OUTPUT_DIMENSIONS>;
/// L3（出力層）
pub type L3 = AffineTransform<L2_OUTPUT_DIMENSIONS, OUTPUT_DIMENSIONS>;

// =============================================================================
// アーキテクチャ識別子
// =============================================================================

/// LayerStacks バリアントの構造ハッシュ
pub const LAYER_STACKS_HASH: u32 = 0x7AF3_2F16;

/// LayerStacks バリアントの構造文字列
pub const LAYER_STACKS_STRUCTURE: &str = "LayerStack[8x8<-2048]";

/// SingleStack バリアントの構造ハッシュ（各層のハッシュを合成した値）
pub const SINGLE_STACK_HASH: u32 = 0x6333_71F4;

/// SingleStack バリアントの構造文字列（各層の構造文字列を合成した値）
pub const SINGLE_STACK_STRUCTURE: &str = "AffineTransform[1<-96](ClippedReLU[96](\
AffineTransform[96<-8](SqrClippedReLU[8](AffineTransformSparseInput[8<-512](\
InputSlice[512(0:512)])))))";

/// ネットワークアーキテクチャの識別情報
///
/// ローダはファイルのヘッダをこれと照合してからテンソルを読み込む。
pub trait Architecture {
    /// アーキテクチャ名
    const NAME: &'static str;
    /// L1 のスタック数（バケット数）
    const STACKS: usize;
    /// 構造ハッシュ
    const HASH: u32;
    /// 構造文字列
    const STRUCTURE: &'static str;
}

/// LayerStacks バリアント（L1 を 8 スタック）
pub type LayerStackNetwork = Network<LAYER_STACKS>;

/// SingleStack バリアント（L1 は1つ）
pub type SingleStackNetwork = Network<1>;

/// ビルド設定で選択されるネットワーク
#[cfg(not(feature = "single-stack"))]
pub type DefaultNetwork = LayerStackNetwork;

/// ビルド設定で選択されるネットワーク
#[cfg(feature = "single-stack")]
pub type DefaultNetwork = SingleStackNetwork;

impl Architecture for Network<LAYER_STACKS> {
    const NAME: &'static str = "LayerStacks";
    const STACKS: usize = LAYER_STACKS;
    const HASH: u32 = LAYER_STACKS_HASH;
    const STRUCTURE: &'static str = LAYER_STACKS_STRUCTURE;
}

impl Architecture for Network<1> {
    const NAME: &'static str = "SingleStack";
    const STACKS: usize = 1;
    const HASH: u32 = SINGLE_STACK_HASH;
    const STRUCTURE: &'static str = SINGLE_STACK_STRUCTURE;
}

/// 層の合成から求めた構造ハッシュ（SingleStack 定数の検証用）
pub const fn composed_hash_value() -> u32 {
    let hash = InputLayer::hash_value();
    let hash = L1::hash_value(hash);
    let hash = Ac0::hash_value(hash);
    let hash = L2::hash_value(hash);
    let hash = Ac1::hash_value(hash);
    L3::hash_value(hash)
}

/// 層の合成から求めた構造文字列（SingleStack 定数の検証用）
pub fn composed_structure_string() -> String {
    let s = InputLayer::structure_string();
    let s = L1::structure_string(&s);
    let s = Ac0::structure_string(&s);
    let s = L2::structure_string(&s);
    let s = Ac1::structure_string(&s);
    L3::structure_string(&s)
}

// =============================================================================
// Scratch バッファ
// =============================================================================

/// 1回の評価で使う中間バッファ
///
/// 各層の出力をキャッシュライン境界に揃えて保持する。
/// 呼び出しごと（またはスレッドごと）に1つ用意し、並行する呼び出し間で共有しない。
/// propagate 後は全中間層の出力が残るため、デバッグ時に参照できる。
#[repr(C, align(64))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scratch {
    /// L1 出力
    pub fc_0_out: Aligned<[i32; L1_OUTPUT_DIMENSIONS]>,
    /// SqrClippedReLU 出力（L2 の入力幅にパディング）
    pub ac_0_out: Aligned<[u8; padded_input(L1_OUTPUT_DIMENSIONS)]>,
    /// L2 出力
    pub fc_1_out: Aligned<[i32; L2_OUTPUT_DIMENSIONS]>,
    /// ClippedReLU 出力（L3 の入力幅にパディング）
    pub ac_1_out: Aligned<[u8; padded_input(L2_OUTPUT_DIMENSIONS)]>,
    /// L3 出力
    pub fc_2_out: Aligned<[i32; OUTPUT_DIMENSIONS]>,
}

impl Scratch {
    /// バッファのバイト数
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// バッファのアライメント
    pub const ALIGN: usize = std::mem::align_of::<Self>();

    /// ゼロ初期化
    pub const fn new() -> Self {
        Self {
            fc_0_out: Aligned([0; L1_OUTPUT_DIMENSIONS]),
            ac_0_out: Aligned([0; padded_input(L1_OUTPUT_DIMENSIONS)]),
            fc_1_out: Aligned([0; L2_OUTPUT_DIMENSIONS]),
            ac_1_out: Aligned([0; padded_input(L2_OUTPUT_DIMENSIONS)]),
            fc_2_out: Aligned([0; OUTPUT_DIMENSIONS]),
        }
    }

    /// ヒープ上にゼロ初期化で確保
    pub fn new_boxed() -> Box<Self> {
        Box::new(Self::new())
    }

    /// 最終出力
    #[inline]
    pub fn output(&self) -> i32 {
        self.fc_2_out.0[0]
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Network
// =============================================================================

/// LayerStack ネットワーク
///
/// 重みはロード後は読み取り専用で、複数スレッドから同時に propagate してよい。
/// その場合は各スレッドが自分の `Scratch` を渡すこと。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network<const STACKS: usize> {
    /// L1（バケットごと）
    pub fc_0: LayerStack<L1, STACKS>,
    /// L2（共有）
    pub fc_1: L2,
    /// L3（共有）
    pub fc_2: L3,
}

impl<const STACKS: usize> Network<STACKS> {
    /// 入力（埋め込み）の次元数
    pub const INPUT_DIMENSIONS: usize = INPUT_DIMENSIONS;

    /// 必要な Scratch のバイト数
    pub const SCRATCH_SIZE: usize = Scratch::SIZE;

    /// 必要な Scratch のアライメント
    pub const SCRATCH_ALIGN: usize = Scratch::ALIGN;

    /// ゼロ初期化
    pub fn new_zeroed() -> Self {
        Self {
            fc_0: LayerStack::from_fn(|_| L1::new_zeroed()),
            fc_1: L2::new_zeroed(),
            fc_2: L3::new_zeroed(),
        }
    }

    /// バケット数
    #[inline]
    pub const fn bucket_count(&self) -> usize {
        STACKS
    }

    /// 順伝播
    ///
    /// # 引数
    ///
    /// - `features`: 埋め込みベクトル（`INPUT_DIMENSIONS` バイト、各要素 [0, 127]）
    /// - `scratch`: 中間バッファ（呼び出し側が所有、内容は上書きされる）
    /// - `bucket`: L1 のバケット番号（`[0, STACKS)`）
    ///
    /// # 戻り値
    ///
    /// 生の出力値（`FV_SCALE` で割る前）
    ///
    /// # Panics
    ///
    /// `features` の長さが不正、または `bucket` が範囲外の場合。
    /// どちらも呼び出し側の契約違反であり、切り詰めやクランプはしない。
    pub fn propagate(&self, features: &[u8], scratch: &mut Scratch, bucket: usize) -> i32 {
        assert_eq!(
            features.len(),
            INPUT_DIMENSIONS,
            "NNUE input length mismatch: expected {INPUT_DIMENSIONS}, got {}",
            features.len()
        );
        let fc_0 = self.fc_0.select(bucket);

        let input = InputLayer::propagate(features);
        let nonzero_chunks = fc_0.propagate(input, &mut scratch.fc_0_out.0);
        Ac0::propagate(&scratch.fc_0_out.0, &mut scratch.ac_0_out.0);
        self.fc_1.propagate(&scratch.ac_0_out.0, &mut scratch.fc_1_out.0);
        Ac1::propagate(&scratch.fc_1_out.0, &mut scratch.ac_1_out.0);
        self.fc_2.propagate(&scratch.ac_1_out.0, &mut scratch.fc_2_out.0);

        stats::count_propagate(bucket, nonzero_chunks);
        scratch.output()
    }

    /// 評価値を計算（出力を FV_SCALE で割った値）
    ///
    /// FV_SCALE は `set_fv_scale_override` で上書きできる。
    pub fn evaluate(&self, features: &[u8], scratch: &mut Scratch, bucket: usize) -> i32 {
        self.propagate(features, scratch, bucket) / fv_scale()
    }

    /// パラメータ部を読み込み（ヘッダは読み込み済みであること）
    fn read_parameters<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut network = Self::new_zeroed();
        for fc_0 in network.fc_0.iter_mut() {
            *fc_0 = L1::read(reader)?;
        }
        network.fc_1 = L2::read(reader)?;
        network.fc_2 = L3::read(reader)?;
        Ok(network)
    }
}

impl<const STACKS: usize> Network<STACKS>
where
    Self: Architecture,
{
    /// アーキテクチャのヘッダ
    pub fn header() -> NetworkHeader {
        NetworkHeader::new(Self::HASH, Self::STRUCTURE)
    }

    /// ヘッダを検証
    ///
    /// ハッシュ → 構造文字列の順に照合する。
    pub fn verify_header(header: &NetworkHeader) -> NnueResult<()> {
        if header.hash != Self::HASH {
            return Err(NnueError::HashMismatch {
                expected: Self::HASH,
                actual: header.hash,
            });
        }
        if header.arch != Self::STRUCTURE {
            return Err(NnueError::StructureMismatch {
                expected: Self::STRUCTURE,
                actual: header.arch.clone(),
            });
        }
        Ok(())
    }

    /// ストリームから読み込み
    ///
    /// ヘッダを検証してからテンソルを読み込む。途中で失敗した場合、
    /// 読みかけのネットワークは破棄される。ストリームの終端は確認しない。
    pub fn read<R: Read>(reader: &mut R) -> NnueResult<Self> {
        let header = NetworkHeader::read(reader)?;
        Self::read_with_header(&header, reader)
    }

    /// 読み込み済みのヘッダを検証し、続くテンソルを読み込む
    pub(crate) fn read_with_header<R: Read>(
        header: &NetworkHeader,
        reader: &mut R,
    ) -> NnueResult<Self> {
        Self::verify_header(header)?;
        let network = Self::read_parameters(reader)?;
        log::info!(
            "NNUE loaded: {} (hash=0x{:08X}, buckets={})",
            Self::NAME,
            Self::HASH,
            STACKS
        );
        Ok(network)
    }

    /// バイト列から読み込み（末尾に余分なデータがあればエラー）
    pub fn from_bytes(bytes: &[u8]) -> NnueResult<Self> {
        let mut reader = bytes;
        let network = Self::read(&mut reader)?;
        expect_eof(&mut reader)?;
        Ok(network)
    }

    /// ファイルから読み込み（末尾に余分なデータがあればエラー）
    pub fn load<P: AsRef<Path>>(path: P) -> NnueResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let network = Self::read(&mut reader)?;
        expect_eof(&mut reader)?;
        Ok(network)
    }

    /// ストリームへ書き出し（ヘッダ込み）
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        Self::header().write(writer)?;
        for fc_0 in self.fc_0.iter() {
            fc_0.write(writer)?;
        }
        self.fc_1.write(writer)?;
        self.fc_2.write(writer)
    }

    /// ヘッダ込みのファイルサイズ
    pub fn serialized_size() -> usize {
        let l1 = L1_OUTPUT_DIMENSIONS * 4 + L1_OUTPUT_DIMENSIONS * L1::PADDED_INPUT;
        let l2 = L2_OUTPUT_DIMENSIONS * 4 + L2_OUTPUT_DIMENSIONS * L2::PADDED_INPUT;
        let l3 = OUTPUT_DIMENSIONS * 4 + OUTPUT_DIMENSIONS * L3::PADDED_INPUT;
        Self::header().encoded_len() + STACKS * l1 + l2 + l3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_layout() {
        // fc_0(32→64) + ac_0(32→64) + fc_1(384) + ac_1(96→128) + fc_2(4→64)
        assert_eq!(Scratch::SIZE, 704);
        assert_eq!(Scratch::ALIGN, 64);
        assert_eq!(LayerStackNetwork::SCRATCH_SIZE, std::mem::size_of::<Scratch>());
        assert_eq!(SingleStackNetwork::SCRATCH_ALIGN, 64);

        let scratch = Scratch::new_boxed();
        let base = &*scratch as *const Scratch as usize;
        assert_eq!(base % 64, 0);
        assert_eq!((&scratch.fc_1_out as *const _ as usize) % 64, 0);
        assert_eq!((&scratch.ac_1_out as *const _ as usize) % 64, 0);
    }

    #[test]
    fn test_single_stack_identity_matches_layer_composition() {
        assert_eq!(composed_hash_value(), SINGLE_STACK_HASH);
        assert_eq!(composed_structure_string(), SINGLE_STACK_STRUCTURE);
    }

    #[test]
    fn test_identity_constants_are_stable() {
        assert_eq!(<LayerStackNetwork as Architecture>::HASH, 0x7AF3_2F16);
        assert_eq!(<LayerStackNetwork as Architecture>::STRUCTURE, "LayerStack[8x8<-2048]");
        assert_eq!(<LayerStackNetwork as Architecture>::STACKS, 8);
        assert_eq!(<SingleStackNetwork as Architecture>::STACKS, 1);
        assert_ne!(LAYER_STACKS_HASH, SINGLE_STACK_HASH);

        // 何度問い合わせても同じ
        assert_eq!(LayerStackNetwork::header(), LayerStackNetwork::header());
        assert_eq!(composed_hash_value(), composed_hash_value());
    }

    #[test]
    fn test_serialized_size() {
        // L1: 8*4 + 8*512 = 4128, L2: 96*4 + 96*32 = 3456, L3: 4 + 96 = 100
        let header = 8 + LAYER_STACKS_STRUCTURE.len();
        assert_eq!(LayerStackNetwork::serialized_size(), header + 8 * 4128 + 3456 + 100);

        let mut bytes = Vec::new();
        LayerStackNetwork::new_zeroed().write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), LayerStackNetwork::serialized_size());

        let mut bytes = Vec::new();
        SingleStackNetwork::new_zeroed().write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), SingleStackNetwork::serialized_size());
    }

    #[test]
    fn test_verify_header_mismatch() {
        let wrong_hash = NetworkHeader::new(SINGLE_STACK_HASH, LAYER_STACKS_STRUCTURE);
        assert!(matches!(
            LayerStackNetwork::verify_header(&wrong_hash),
            Err(NnueError::HashMismatch { expected: LAYER_STACKS_HASH, actual: SINGLE_STACK_HASH })
        ));

        let wrong_arch = NetworkHeader::new(LAYER_STACKS_HASH, "LayerStack[4x8<-2048]");
        assert!(matches!(
            LayerStackNetwork::verify_header(&wrong_arch),
            Err(NnueError::StructureMismatch { .. })
        ));

        assert!(LayerStackNetwork::verify_header(&LayerStackNetwork::header()).is_ok());
    }

    #[test]
    fn test_zero_network_outputs_zero() {
        let network = LayerStackNetwork::new_zeroed();
        let features = [127u8; INPUT_DIMENSIONS];
        let mut scratch = Scratch::new();
        for bucket in 0..network.bucket_count() {
            assert_eq!(network.propagate(&features, &mut scratch, bucket), 0);
        }
    }
}
