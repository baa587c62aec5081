use std::path::PathBuf;

use clap::Parser;
use ixixx::config::{IndexConfig, SortBackend, TokenizerKind};
use ixixx::IndexBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 从 `<id> <text>` 记录构建 ix/ixx 两级全文索引
#[derive(Parser, Debug)]
#[command(name = "ixixx", version, about)]
struct Args {
    /// 输入文件；`-` 表示 stdin
    input: PathBuf,

    #[arg(default_value = "out.ix")]
    out_ix: PathBuf,

    #[arg(default_value = "out.ixx")]
    out_ixx: PathBuf,

    /// TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 固定 ixx 前缀长度（不指定则自动优化）
    #[arg(long)]
    prefix_size: Option<usize>,

    /// 排序后端：auto | system | in-process
    #[arg(long)]
    backend: Option<SortBackend>,

    /// 每个排序 run 的最大行数
    #[arg(long)]
    run_size: Option<usize>,

    /// 排序 run 文件目录
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// 分词方式：whitespace | word-chars
    #[arg(long)]
    tokenizer: Option<TokenizerKind>,

    /// 以 JSON 输出构建报告
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => IndexConfig::load(path)?,
        None => IndexConfig::default(),
    };
    if let Some(p) = args.prefix_size {
        config.prefix_size = Some(p);
    }
    if let Some(b) = args.backend {
        config.sort_backend = b;
    }
    if let Some(n) = args.run_size {
        config.run_size_limit = n;
    }
    if let Some(dir) = args.work_dir.clone() {
        config.work_dir = Some(dir);
    }
    if let Some(t) = args.tokenizer {
        config.tokenizer = t;
    }

    let builder = IndexBuilder::new(config)?;
    info!(
        "Indexing {:?} -> {:?}, {:?}",
        args.input, args.out_ix, args.out_ixx
    );

    let report = if args.input.as_os_str() == "-" {
        builder.ix_ixx_stream(std::io::stdin(), &args.out_ix, &args.out_ixx)?
    } else {
        builder.ix_ixx(&args.input, &args.out_ix, &args.out_ixx)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
