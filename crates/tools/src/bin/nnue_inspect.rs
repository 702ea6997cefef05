//! NNUE 評価関数ファイルの検査ツール
//!
//! ヘッダからアーキテクチャを判別し、ファイル全体を読み込んで検証したうえで、
//! 一定値の埋め込みを与えたときのバケットごとの出力を表示する。
//!
//! ```bash
//! cargo run -p tools --bin nnue_inspect --release -- eval/nn.bin --fill 64
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rshogi_nnue::nnue::{
    CLIPPED_RELU_MAX, INPUT_DIMENSIONS, NnueFormatInfo, NnueNetwork, Scratch, detect_format,
    fv_scale, set_fv_scale_override,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "nnue_inspect")]
#[command(about = "NNUE 評価関数ファイルのヘッダと出力を確認する")]
struct Cli {
    /// 評価関数ファイル
    file: PathBuf,

    /// 埋め込みの全要素に与える値（0..=127）
    #[arg(long, default_value_t = 0)]
    fill: u8,

    /// 評価するバケット（省略時は全バケット）
    #[arg(long)]
    bucket: Option<usize>,

    /// FV_SCALE を上書き（0 以下で既定値）
    #[arg(long, allow_negative_numbers = true)]
    fv_scale: Option<i32>,

    /// ヘッダの解析だけ行い、テンソルは読み込まない
    #[arg(long, default_value_t = false)]
    header_only: bool,

    /// JSON で出力
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// バケットごとの出力
#[derive(Debug, Serialize)]
struct BucketOutput {
    bucket: usize,
    raw: i32,
    eval: i32,
}

/// 検査結果
#[derive(Debug, Serialize)]
struct Report {
    file: String,
    file_size: usize,
    format: NnueFormatInfo,
    scratch_size: usize,
    scratch_align: usize,
    fill: u8,
    fv_scale: i32,
    outputs: Vec<BucketOutput>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if cli.fill as i32 > CLIPPED_RELU_MAX {
        bail!("--fill は 0..={CLIPPED_RELU_MAX} の範囲で指定してください: {}", cli.fill);
    }
    if let Some(scale) = cli.fv_scale {
        set_fv_scale_override(scale);
    }

    let bytes = std::fs::read(&cli.file)
        .with_context(|| format!("ファイルを読み込めません: {}", cli.file.display()))?;
    let format = detect_format(&bytes)
        .with_context(|| format!("ヘッダを解析できません: {}", cli.file.display()))?;

    if bytes.len() != format.expected_size {
        log::warn!(
            "file size mismatch: expected {} bytes, got {} bytes",
            format.expected_size,
            bytes.len()
        );
    }

    let mut report = Report {
        file: cli.file.display().to_string(),
        file_size: bytes.len(),
        format,
        scratch_size: Scratch::SIZE,
        scratch_align: Scratch::ALIGN,
        fill: cli.fill,
        fv_scale: fv_scale(),
        outputs: Vec::new(),
    };

    if !cli.header_only {
        let network = NnueNetwork::from_bytes(&bytes)
            .with_context(|| format!("評価関数を読み込めません: {}", cli.file.display()))?;

        let buckets: Vec<usize> = match cli.bucket {
            Some(bucket) if bucket >= network.bucket_count() => {
                bail!("バケットが範囲外です: {bucket} (buckets = {})", network.bucket_count())
            }
            Some(bucket) => vec![bucket],
            None => (0..network.bucket_count()).collect(),
        };

        report.outputs = evaluate_buckets(&network, cli.fill, &buckets);
    }

    #[cfg(feature = "nnue-stats")]
    rshogi_nnue::nnue::NNUE_STATS.snapshot().log_summary();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// 一定値の埋め込みで各バケットを評価
fn evaluate_buckets(network: &NnueNetwork, fill: u8, buckets: &[usize]) -> Vec<BucketOutput> {
    let features = vec![fill; INPUT_DIMENSIONS];
    let mut scratch = Scratch::new_boxed();
    buckets
        .iter()
        .map(|&bucket| BucketOutput {
            bucket,
            raw: network.propagate(&features, &mut scratch, bucket),
            eval: network.evaluate(&features, &mut scratch, bucket),
        })
        .collect()
}

fn print_report(report: &Report) {
    println!("ファイル        : {} ({} bytes)", report.file, report.file_size);
    println!("アーキテクチャ  : {}", report.format.architecture);
    println!("構造ハッシュ    : 0x{:08X}", report.format.hash);
    println!("構造文字列      : {}", report.format.arch_string);
    println!("バケット数      : {}", report.format.buckets);
    println!(
        "次元            : {} -> {} -> {} -> 1",
        report.format.input_dimension, report.format.l1_dimension, report.format.l2_dimension
    );
    println!("Scratch         : {} bytes (align {})", report.scratch_size, report.scratch_align);

    if report.outputs.is_empty() {
        return;
    }
    println!();
    println!("fill = {}, FV_SCALE = {}", report.fill, report.fv_scale);
    for output in &report.outputs {
        println!("  bucket {:>2}: raw = {:>8}, eval = {:>6}", output.bucket, output.raw, output.eval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rshogi_nnue::nnue::LayerStackNetwork;

    #[test]
    fn cli_accepts_negative_fv_scale() {
        let cli = Cli::try_parse_from(["nnue_inspect", "nn.bin", "--fv-scale", "-1"])
            .expect("parse failed");
        assert_eq!(cli.fv_scale, Some(-1));
        assert_eq!(cli.fill, 0);
    }

    #[test]
    fn evaluate_buckets_reports_raw_and_scaled() {
        let mut network = LayerStackNetwork::new_zeroed();
        network.fc_2.biases[0] = -100;
        let network = NnueNetwork::LayerStacks(Box::new(network));

        let outputs = evaluate_buckets(&network, 64, &[0, 7]);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].bucket, 7);
        for output in &outputs {
            assert_eq!(output.raw, -100);
            // -100 / 16 は 0 方向に切り捨て
            assert_eq!(output.eval, -6);
        }
    }
}
