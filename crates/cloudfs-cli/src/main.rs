//! cloudfs - browse and edit an object-store bucket as a filesystem.
//!
//! Settings come from `CLOUDFS_*` environment variables, falling back to a
//! TOML file given with `--config`.
//!
//! ```bash
//! cloudfs ls ~/upload
//! cloudfs put ./photo.jpg ~/upload/28/photo.jpg
//! cloudfs cat ~/upload/notes.txt
//! RUST_LOG=cloudfs_kernel=debug cloudfs rmdir ~/upload/28
//! ```

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cloudfs_kernel::{
    EnvProvider, FileProvider, FileSystem, FsFlow, Layered, ObjectStoreFs, Subscription,
};

/// Filesystem view of an S3 bucket.
#[derive(Parser, Debug)]
#[command(name = "cloudfs")]
#[command(about = "Filesystem view of an S3 bucket")]
struct Args {
    /// TOML file with settings; CLOUDFS_* environment variables take precedence
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List directories and files under a path
    Ls {
        #[arg(default_value = "~/")]
        path: String,
    },
    /// Show metadata for a file
    Stat { path: String },
    /// Check whether a file (or, with --dir, a directory) exists
    Exists {
        path: String,
        #[arg(long)]
        dir: bool,
    },
    /// Upload a local file
    Put { local: PathBuf, remote: String },
    /// Download a file to a local path
    Get { remote: String, local: PathBuf },
    /// Stream a file to stdout
    Cat { path: String },
    /// Copy a file
    Cp { from: String, to: String },
    /// Move a file
    Mv { from: String, to: String },
    /// Delete a file
    Rm { path: String },
    /// Create a directory
    Mkdir { path: String },
    /// Delete a directory and everything below it
    Rmdir { path: String },
    /// Print the public URL of a path
    Url { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut provider = Layered::new().with(EnvProvider::default());
    if let Some(path) = &args.config {
        provider = provider.with(FileProvider::load(path)?);
    }
    let fs = ObjectStoreFs::from_provider(&provider).context("failed to set up filesystem")?;
    tracing::debug!(bucket = fs.bucket(), "connected");

    let mut events = fs.subscribe(">");
    let result = run(&fs, args.command).await;
    log_events(&mut events);
    result
}

async fn run(fs: &ObjectStoreFs, command: Command) -> Result<()> {
    match command {
        Command::Ls { path } => {
            for dir in fs.get_directories(&path).await? {
                println!("d {:>12}  {}/", "-", dir.name);
            }
            for file in fs.get_files(&path).await? {
                println!("- {:>12}  {}", file.length, file.name);
            }
        }
        Command::Stat { path } => {
            let file = fs.get_file(&path).await?;
            println!("path:     {}", file.virtual_path);
            println!("size:     {}", file.length);
            println!("modified: {}", unix_secs(file.updated));
            println!("url:      {}", fs.public_url(&path));
        }
        Command::Exists { path, dir } => {
            let present = if dir {
                fs.probe_directory(&path).await?
            } else {
                fs.probe_file(&path).await?
            };
            println!("{}", present.is_present());
        }
        Command::Put { local, remote } => {
            let mut file = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("failed to open {}", local.display()))?;
            let written = fs.write_from_reader(&remote, &mut file).await?;
            tracing::info!(path = %remote, bytes = written, "uploaded");
        }
        Command::Get { remote, local } => {
            let mut file = tokio::fs::File::create(&local)
                .await
                .with_context(|| format!("failed to create {}", local.display()))?;
            let stats = fs.read_file_contents(&remote, &mut file).await?;
            tracing::info!(path = %remote, bytes = stats.bytes, chunks = stats.chunks, "downloaded");
        }
        Command::Cat { path } => {
            let mut stdout = tokio::io::stdout();
            fs.read_file_contents(&path, &mut stdout).await?;
        }
        Command::Cp { from, to } => fs.copy_file(&from, &to).await?,
        Command::Mv { from, to } => fs.move_file(&from, &to).await?,
        Command::Rm { path } => fs.delete_file(&path).await?,
        Command::Mkdir { path } => fs.create_directory(&path).await?,
        Command::Rmdir { path } => fs.delete_directory(&path).await?,
        Command::Url { path } => println!("{}", fs.public_url(&path)),
    }
    Ok(())
}

fn log_events(events: &mut Subscription<FsFlow>) {
    for msg in events.drain() {
        match msg.payload.destination_path() {
            Some(to) => tracing::info!(
                subject = %msg.subject,
                from = msg.payload.source_path(),
                to,
                "fs event"
            ),
            None => tracing::info!(
                subject = %msg.subject,
                path = msg.payload.source_path(),
                "fs event"
            ),
        }
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
