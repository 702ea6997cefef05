//! ネットワーク層の実装
//!
//! - `InputSlice`: 入力バッファの連続部分列を切り出す層（パラメータなし）
//! - `AffineTransform`: 全結合アフィン変換層（入力×重み + バイアス）
//! - `AffineTransformSparseInput`: 疎入力向けのアフィン変換層
//! - `ClippedReLU`: 整数スケーリング付きのクリップ付き ReLU 層
//! - `SqrClippedReLU`: クリップ後に二乗してリスケールする ReLU 層
//!
//! 各層は YaneuraOu と同じ規則でハッシュ値と構造文字列を合成できる。
//! ネットワーク全体の識別子は `network_layer_stacks.rs` で定数として保持する。

use super::constants::{
    CLIPPED_RELU_MAX, INPUT_PADDING, SPARSE_CHUNK_SIZE, SQR_CLIPPED_RELU_INPUT_MAX,
    SQR_CLIPPED_RELU_SHIFT, WEIGHT_SCALE_BITS,
};
use std::io::{self, Read, Write};

/// パディング済み入力次元（SIMDアライメント用）
pub const fn padded_input(input_dim: usize) -> usize {
    input_dim.div_ceil(INPUT_PADDING) * INPUT_PADDING
}

/// アフィン変換層のハッシュ値（密・疎で共通）
const fn affine_hash_value(output_dim: usize, prev_hash: u32) -> u32 {
    let mut hash = 0xCC03_DAE4u32.wrapping_add(output_dim as u32);
    hash ^= prev_hash >> 1;
    hash ^= prev_hash << 31;
    hash
}

/// 活性化層のハッシュ値（ClippedReLU / SqrClippedReLU で共通）
const fn activation_hash_value(prev_hash: u32) -> u32 {
    0x538D_24C7u32.wrapping_add(prev_hash)
}

/// バイアス（i32 LE）を読み込み
fn read_biases<R: Read, const N: usize>(reader: &mut R) -> io::Result<[i32; N]> {
    let mut biases = [0i32; N];
    let mut buf4 = [0u8; 4];
    for bias in biases.iter_mut() {
        reader.read_exact(&mut buf4)?;
        *bias = i32::from_le_bytes(buf4);
    }
    Ok(biases)
}

/// バイアス（i32 LE）を書き出し
fn write_biases<W: Write>(writer: &mut W, biases: &[i32]) -> io::Result<()> {
    for bias in biases {
        writer.write_all(&bias.to_le_bytes())?;
    }
    Ok(())
}

// =============================================================================
// InputSlice
// =============================================================================

/// 入力スライス層
///
/// 入力バッファの `[OFFSET, OFFSET + OUTPUT_DIM)` をそのまま次の層に渡す。
pub struct InputSlice<const OUTPUT_DIM: usize, const OFFSET: usize>;

impl<const OUTPUT_DIM: usize, const OFFSET: usize> InputSlice<OUTPUT_DIM, OFFSET> {
    /// ハッシュ値（入力層なので前段なし）
    pub const fn hash_value() -> u32 {
        0xEC42_E90Du32 ^ (OUTPUT_DIM as u32) ^ ((OFFSET as u32) << 10)
    }

    /// 構造文字列
    pub fn structure_string() -> String {
        format!("InputSlice[{}({}:{})]", OUTPUT_DIM, OFFSET, OFFSET + OUTPUT_DIM)
    }

    /// 順伝播
    ///
    /// 入力が `OFFSET + OUTPUT_DIM` より短い場合は panic する。
    #[inline]
    pub fn propagate(input: &[u8]) -> &[u8] {
        &input[OFFSET..OFFSET + OUTPUT_DIM]
    }
}

// =============================================================================
// AffineTransform
// =============================================================================

/// アフィン変換層
///
/// `out[j] = bias[j] + Σ_i weight[j][i] * in[i]`
///
/// 出力は生の i32 積和値。次の層のスケールへの右シフトは活性化層で行う。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffineTransform<const INPUT_DIM: usize, const OUTPUT_DIM: usize> {
    /// バイアス
    pub biases: [i32; OUTPUT_DIM],
    /// 重み（row-major: weights[output * PADDED_INPUT + input]）
    pub weights: Box<[i8]>,
}

impl<const INPUT_DIM: usize, const OUTPUT_DIM: usize> AffineTransform<INPUT_DIM, OUTPUT_DIM> {
    /// パディング済み入力次元
    pub const PADDED_INPUT: usize = padded_input(INPUT_DIM);

    /// ゼロ初期化
    pub fn new_zeroed() -> Self {
        Self {
            biases: [0; OUTPUT_DIM],
            weights: vec![0i8; OUTPUT_DIM * Self::PADDED_INPUT].into_boxed_slice(),
        }
    }

    /// 重みを取得
    #[inline]
    pub fn weight(&self, output: usize, input: usize) -> i8 {
        self.weights[output * Self::PADDED_INPUT + input]
    }

    /// 重みを設定
    #[inline]
    pub fn set_weight(&mut self, output: usize, input: usize, value: i8) {
        debug_assert!(input < INPUT_DIM, "input index out of range: {input}");
        self.weights[output * Self::PADDED_INPUT + input] = value;
    }

    /// ハッシュ値
    pub const fn hash_value(prev_hash: u32) -> u32 {
        affine_hash_value(OUTPUT_DIM, prev_hash)
    }

    /// 構造文字列
    pub fn structure_string(prev: &str) -> String {
        format!("AffineTransform[{OUTPUT_DIM}<-{INPUT_DIM}]({prev})")
    }

    /// ファイルから読み込み（Bias-first）
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let biases = read_biases::<R, OUTPUT_DIM>(reader)?;

        let mut weights = vec![0u8; OUTPUT_DIM * Self::PADDED_INPUT];
        reader.read_exact(&mut weights)?;

        Ok(Self {
            biases,
            weights: weights.into_iter().map(|b| b as i8).collect(),
        })
    }

    /// ファイルへ書き出し（Bias-first）
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_biases(writer, &self.biases)?;
        let bytes: Vec<u8> = self.weights.iter().map(|&w| w as u8).collect();
        writer.write_all(&bytes)
    }

    /// 順伝播
    ///
    /// 入力は `INPUT_DIM` 要素以上必要（パディング部分は読まない）。
    /// 積 (u8 × i8) は i16 に収まるが、積和は i32 で行う。
    /// 積和は 2 の補数で折り返す（オーバーフローしてもパニックしない）。
    pub fn propagate(&self, input: &[u8], output: &mut [i32; OUTPUT_DIM]) {
        assert!(
            input.len() >= INPUT_DIM,
            "AffineTransform input too short: {} < {INPUT_DIM}",
            input.len()
        );
        let input = &input[..INPUT_DIM];

        for (j, out) in output.iter_mut().enumerate() {
            let row = &self.weights[j * Self::PADDED_INPUT..j * Self::PADDED_INPUT + INPUT_DIM];
            let mut sum = self.biases[j];
            for (&w, &x) in row.iter().zip(input) {
                sum = sum.wrapping_add((w as i32).wrapping_mul(x as i32));
            }
            *out = sum;
        }
    }
}

// =============================================================================
// AffineTransformSparseInput
// =============================================================================

/// 疎入力向けアフィン変換層
///
/// 入力を4バイトのチャンク単位で走査し、全要素がゼロのチャンクを読み飛ばす。
/// 重みはチャンク優先のスクランブル形式で保持するため、非ゼロチャンク1つにつき
/// 連続した `OUTPUT_DIM * 4` バイトだけを参照すればよい。
///
/// 整数演算のみなので、結果は `AffineTransform` とビット単位で一致する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffineTransformSparseInput<const INPUT_DIM: usize, const OUTPUT_DIM: usize> {
    /// バイアス
    pub biases: [i32; OUTPUT_DIM],
    /// 重み（スクランブル形式: weights[input_chunk][output][4]）
    weights: Box<[i8]>,
}

impl<const INPUT_DIM: usize, const OUTPUT_DIM: usize>
    AffineTransformSparseInput<INPUT_DIM, OUTPUT_DIM>
{
    /// パディング済み入力次元
    pub const PADDED_INPUT: usize = padded_input(INPUT_DIM);

    /// 入力チャンク数
    const NUM_INPUT_CHUNKS: usize = Self::PADDED_INPUT / SPARSE_CHUNK_SIZE;

    /// ゼロ初期化
    pub fn new_zeroed() -> Self {
        Self {
            biases: [0; OUTPUT_DIM],
            weights: vec![0i8; OUTPUT_DIM * Self::PADDED_INPUT].into_boxed_slice(),
        }
    }

    /// 重みインデックスのスクランブル変換
    ///
    /// 元のレイアウト: weights[output][input]
    /// 変換後: weights[input_chunk][output][4]
    #[inline]
    const fn scrambled_index(output: usize, input: usize) -> usize {
        (input / SPARSE_CHUNK_SIZE) * OUTPUT_DIM * SPARSE_CHUNK_SIZE
            + output * SPARSE_CHUNK_SIZE
            + input % SPARSE_CHUNK_SIZE
    }

    /// 重みを取得
    #[inline]
    pub fn weight(&self, output: usize, input: usize) -> i8 {
        self.weights[Self::scrambled_index(output, input)]
    }

    /// 重みを設定
    #[inline]
    pub fn set_weight(&mut self, output: usize, input: usize, value: i8) {
        debug_assert!(input < INPUT_DIM, "input index out of range: {input}");
        self.weights[Self::scrambled_index(output, input)] = value;
    }

    /// 密なアフィン変換層から変換
    pub fn from_dense(dense: &AffineTransform<INPUT_DIM, OUTPUT_DIM>) -> Self {
        let mut sparse = Self::new_zeroed();
        sparse.biases = dense.biases;
        for output in 0..OUTPUT_DIM {
            for input in 0..Self::PADDED_INPUT {
                sparse.weights[Self::scrambled_index(output, input)] =
                    dense.weights[output * Self::PADDED_INPUT + input];
            }
        }
        sparse
    }

    /// 密なアフィン変換層へ変換（検証用の基準実装）
    pub fn to_dense(&self) -> AffineTransform<INPUT_DIM, OUTPUT_DIM> {
        let mut dense = AffineTransform::new_zeroed();
        dense.biases = self.biases;
        for output in 0..OUTPUT_DIM {
            for input in 0..Self::PADDED_INPUT {
                dense.weights[output * Self::PADDED_INPUT + input] =
                    self.weights[Self::scrambled_index(output, input)];
            }
        }
        dense
    }

    /// ハッシュ値
    pub const fn hash_value(prev_hash: u32) -> u32 {
        affine_hash_value(OUTPUT_DIM, prev_hash)
    }

    /// 構造文字列
    pub fn structure_string(prev: &str) -> String {
        format!("AffineTransformSparseInput[{OUTPUT_DIM}<-{INPUT_DIM}]({prev})")
    }

    /// ファイルから読み込み（Bias-first、重みは row-major で格納されている）
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let biases = read_biases::<R, OUTPUT_DIM>(reader)?;

        let mut raw = vec![0u8; OUTPUT_DIM * Self::PADDED_INPUT];
        reader.read_exact(&mut raw)?;

        let mut layer = Self::new_zeroed();
        layer.biases = biases;
        for (i, &b) in raw.iter().enumerate() {
            let output = i / Self::PADDED_INPUT;
            let input = i % Self::PADDED_INPUT;
            layer.weights[Self::scrambled_index(output, input)] = b as i8;
        }
        Ok(layer)
    }

    /// ファイルへ書き出し（row-major に戻してから書く）
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_biases(writer, &self.biases)?;
        let mut raw = vec![0u8; OUTPUT_DIM * Self::PADDED_INPUT];
        for (i, byte) in raw.iter_mut().enumerate() {
            let output = i / Self::PADDED_INPUT;
            let input = i % Self::PADDED_INPUT;
            *byte = self.weights[Self::scrambled_index(output, input)] as u8;
        }
        writer.write_all(&raw)
    }

    /// 順伝播
    ///
    /// 入力は `PADDED_INPUT` バイト以上必要。戻り値は非ゼロだったチャンク数
    /// （統計用）。積和は密な実装と同じく 2 の補数で折り返す。
    pub fn propagate(&self, input: &[u8], output: &mut [i32; OUTPUT_DIM]) -> usize {
        const {
            assert!(INPUT_DIM % SPARSE_CHUNK_SIZE == 0);
        }
        assert!(
            input.len() >= Self::PADDED_INPUT,
            "AffineTransformSparseInput input too short: {} < {}",
            input.len(),
            Self::PADDED_INPUT
        );

        output.copy_from_slice(&self.biases);

        let chunk_stride = OUTPUT_DIM * SPARSE_CHUNK_SIZE;
        let mut nonzero_chunks = 0;

        for (chunk_idx, chunk) in input[..Self::PADDED_INPUT]
            .chunks_exact(SPARSE_CHUNK_SIZE)
            .enumerate()
            .take(Self::NUM_INPUT_CHUNKS)
        {
            if chunk.iter().all(|&b| b == 0) {
                continue;
            }
            nonzero_chunks += 1;

            let column = &self.weights[chunk_idx * chunk_stride..(chunk_idx + 1) * chunk_stride];
            for (out, w) in output.iter_mut().zip(column.chunks_exact(SPARSE_CHUNK_SIZE)) {
                let mut sum = 0i32;
                for (&wk, &xk) in w.iter().zip(chunk) {
                    sum = sum.wrapping_add((wk as i32).wrapping_mul(xk as i32));
                }
                *out = out.wrapping_add(sum);
            }
        }

        nonzero_chunks
    }
}

// =============================================================================
// ClippedReLU
// =============================================================================

/// ClippedReLU層
///
/// 入力: i32、出力: u8（`clamp(x >> 6, 0, 127)`）
pub struct ClippedReLU<const DIM: usize>;

impl<const DIM: usize> ClippedReLU<DIM> {
    /// ハッシュ値
    pub const fn hash_value(prev_hash: u32) -> u32 {
        activation_hash_value(prev_hash)
    }

    /// 構造文字列
    pub fn structure_string(prev: &str) -> String {
        format!("ClippedReLU[{DIM}]({prev})")
    }

    /// 1要素分の活性化
    #[inline]
    pub const fn activate(x: i32) -> u8 {
        let shifted = x >> WEIGHT_SCALE_BITS;
        if shifted < 0 {
            0
        } else if shifted > CLIPPED_RELU_MAX {
            CLIPPED_RELU_MAX as u8
        } else {
            shifted as u8
        }
    }

    /// 順伝播
    ///
    /// 出力バッファは `DIM` 要素以上（パディング部分は書き換えない）。
    pub fn propagate(input: &[i32; DIM], output: &mut [u8]) {
        assert!(output.len() >= DIM, "ClippedReLU output too short: {} < {DIM}", output.len());
        for (out, &x) in output.iter_mut().zip(input) {
            *out = Self::activate(x);
        }
    }
}

// =============================================================================
// SqrClippedReLU
// =============================================================================

/// SqrClippedReLU層
///
/// 入力: i32、出力: u8（`clamp(x, 0, 127 << 6)² >> 19`）
///
/// 二乗は i64 で計算する。クランプ上限の二乗を 19 ビット右シフトすると 126 になるため、
/// 出力は常に [0, 126] に収まり、127 には到達しない。
pub struct SqrClippedReLU<const DIM: usize>;

impl<const DIM: usize> SqrClippedReLU<DIM> {
    /// ハッシュ値
    pub const fn hash_value(prev_hash: u32) -> u32 {
        activation_hash_value(prev_hash)
    }

    /// 構造文字列
    pub fn structure_string(prev: &str) -> String {
        format!("SqrClippedReLU[{DIM}]({prev})")
    }

    /// 1要素分の活性化
    #[inline]
    pub const fn activate(x: i32) -> u8 {
        let clamped: i64 = if x < 0 {
            0
        } else if x > SQR_CLIPPED_RELU_INPUT_MAX {
            SQR_CLIPPED_RELU_INPUT_MAX as i64
        } else {
            x as i64
        };
        ((clamped * clamped) >> SQR_CLIPPED_RELU_SHIFT) as u8
    }

    /// 順伝播
    ///
    /// 出力バッファは `DIM` 要素以上（パディング部分は書き換えない）。
    pub fn propagate(input: &[i32; DIM], output: &mut [u8]) {
        assert!(output.len() >= DIM, "SqrClippedReLU output too short: {} < {DIM}", output.len());
        for (out, &x) in output.iter_mut().zip(input) {
            *out = Self::activate(x);
        }
    }
}
