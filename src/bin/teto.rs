use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use teto::{
    is_ffmpeg_on_path, FfmpegBackend, LocalAssetResolver, MockTtsProvider, ParallelDriver,
    Script, ScriptCompiler, TtsCache, VideoGenerator,
};

#[derive(Parser, Debug)]
#[command(name = "teto", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a script and render its output(s) (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Compile a script and dump the project JSON without rendering.
    Compile(CompileArgs),
    /// Inspect or clear the TTS cache.
    Cache(CacheArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory.
    #[arg(long, default_value = "./output")]
    out_dir: PathBuf,

    /// Render multiple outputs concurrently.
    #[arg(long, default_value_t = true)]
    parallel: bool,

    /// Override worker threads (parallel mode only).
    #[arg(long)]
    workers: Option<usize>,

    /// Keep encoder chatter on stderr.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output project JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Working directory for narration audio.
    #[arg(long, default_value = "./output")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct CacheArgs {
    #[command(subcommand)]
    cmd: CacheCommand,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Print entry count and bytes used.
    Info,
    /// Delete cached audio.
    Clear {
        /// Only delete entries older than this many days.
        #[arg(long)]
        older_than_days: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teto=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Compile(args) => cmd_compile(args),
        Command::Cache(args) => cmd_cache(args),
    }
}

fn compiler_for(out_dir: &std::path::Path) -> ScriptCompiler {
    // The bundled provider is offline; real TTS vendors plug in through the
    // library API.
    ScriptCompiler::new(
        Arc::new(MockTtsProvider::new()),
        Arc::new(LocalAssetResolver),
        out_dir,
    )
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if !is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg not found on PATH");
    }

    let script = Script::from_json_file(&args.in_path)
        .with_context(|| format!("loading script '{}'", args.in_path.display()))?;

    let results = compiler_for(&args.out_dir).compile_all(&script)?;
    let backend = Arc::new(FfmpegBackend::new());

    if args.parallel && results.len() > 1 {
        let mut driver = ParallelDriver::new(backend);
        if let Some(workers) = args.workers {
            driver = driver.with_max_workers(workers);
        }
        driver.verbose = args.verbose;
        let outcomes =
            driver.render_all(results.into_iter().map(|r| r.project).collect())?;
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                Ok(path) => eprintln!("wrote {}", path.display()),
                Err(e) => {
                    failed += 1;
                    eprintln!("render failed: {e}");
                }
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} output(s) failed");
        }
    } else {
        let generator = VideoGenerator::new(backend);
        for result in results {
            let path = generator.generate(
                result.project,
                Some(Box::new(|msg: &str| eprintln!("  {msg}"))),
                args.verbose,
            )?;
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let script = Script::from_json_file(&args.in_path)
        .with_context(|| format!("loading script '{}'", args.in_path.display()))?;
    let result = compiler_for(&args.out_dir).compile(&script, args.out.with_extension("mp4"))?;
    result.project.to_json_file(&args.out)?;
    eprintln!(
        "compiled {} scene(s), {:.2}s total, cache {}/{} hits",
        result.metadata.scene_timings.len(),
        result.metadata.total_duration,
        result.metadata.cache_hits,
        result.metadata.cache_hits + result.metadata.cache_misses,
    );
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_cache(args: CacheArgs) -> anyhow::Result<()> {
    let cache = TtsCache::default();
    match args.cmd {
        CacheCommand::Info => {
            let info = cache.info()?;
            println!(
                "tts cache: {} entries, {:.2} MB ({})",
                info.entry_count,
                info.bytes_used as f64 / (1024.0 * 1024.0),
                info.cache_dir.display()
            );
        }
        CacheCommand::Clear { older_than_days } => {
            let age = older_than_days.map(|days| Duration::from_secs(days * 24 * 3600));
            let removed = cache.clear(age)?;
            println!("removed {removed} cache file(s)");
        }
    }
    Ok(())
}
