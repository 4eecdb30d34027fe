use anyhow::Result;
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Clipdrop 开发任务自动化")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建所有组件 (release)
    Build,
    /// 运行守护进程 (开发模式)
    Dev {
        /// 日志级别 (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "debug")]
        log_level: String,
        /// 上传目录
        #[arg(short = 'd', long, default_value = "./documents")]
        upload_dir: String,
        /// 不写剪贴板、不发通知（无桌面环境时使用）
        #[arg(long)]
        headless: bool,
    },
    /// 运行测试
    Test,
    /// 运行 clippy
    Lint,
    /// 打包发布 (tar.gz)
    Dist,
    /// 清理构建产物
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // 确保在项目根目录执行
    let project_root = match std::env::var("CARGO_MANIFEST_DIR")
        .map(std::path::PathBuf::from)
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
    {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    sh.change_dir(&project_root);

    match cli.command {
        Commands::Build => build(&sh)?,
        Commands::Dev {
            log_level,
            upload_dir,
            headless,
        } => dev(&sh, &log_level, &upload_dir, headless)?,
        Commands::Test => test(&sh)?,
        Commands::Lint => lint(&sh)?,
        Commands::Dist => dist(&sh)?,
        Commands::Clean => clean(&sh)?,
    }

    Ok(())
}

fn build(sh: &Shell) -> Result<()> {
    println!("🔨 构建所有组件...");
    cmd!(sh, "cargo build --release -p clipdrop-daemon -p clipdrop-cli").run()?;
    println!("✅ 构建完成");
    Ok(())
}

fn dev(sh: &Shell, log_level: &str, upload_dir: &str, headless: bool) -> Result<()> {
    println!("🚀 启动开发模式守护进程...");
    println!("   日志级别: {log_level}");
    println!("   上传目录: {upload_dir}");

    let mut args = vec![
        "--log-level".to_string(),
        log_level.to_string(),
        "--upload-dir".to_string(),
        upload_dir.to_string(),
    ];
    if headless {
        args.push("--no-clipboard".to_string());
        args.push("--no-notify".to_string());
    }

    cmd!(sh, "cargo run -p clipdrop-daemon -- {args...}").run()?;
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    println!("🧪 运行测试...");
    cmd!(sh, "cargo test --workspace").run()?;
    println!("✅ 测试完成");
    Ok(())
}

fn lint(sh: &Shell) -> Result<()> {
    println!("🔍 运行 clippy...");
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    println!("✅ 检查通过");
    Ok(())
}

fn dist(sh: &Shell) -> Result<()> {
    println!("📦 打包发布...");

    build(sh)?;

    let version = env!("CARGO_PKG_VERSION");
    let dist_name = format!("clipdrop-{version}-linux-x86_64");

    cmd!(sh, "mkdir -p dist/{dist_name}").run()?;
    cmd!(sh, "cp target/release/clipdrop-daemon dist/{dist_name}/").run()?;
    cmd!(sh, "cp target/release/clipdrop dist/{dist_name}/").run()?;

    sh.change_dir("dist");
    cmd!(sh, "tar -czvf {dist_name}.tar.gz {dist_name}").run()?;

    println!("✅ 打包完成: dist/{dist_name}.tar.gz");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 清理构建产物...");
    cmd!(sh, "cargo clean").run()?;
    cmd!(sh, "rm -rf dist").run()?;
    println!("✅ 清理完成");
    Ok(())
}
