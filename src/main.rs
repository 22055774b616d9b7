use bookshelf_config::Config;
use bookshelf_library::commit::{NewBook, PageFile, add_book};
use bookshelf_library::{BookEntry, BookMetadata, Bookshelf, Direction, index};
use bookshelf_storage::BackendHandle;
use bookshelf_storage::backend::{HubBackend, ReadOnlyBackend};
use clap::{Args, Parser, Subcommand, ValueEnum};
use derive_more::{Display, Error};
use exn::ResultExt;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("cannot set up the repository client")]
    Backend,
    #[display("failed to index the bookshelf")]
    Index,
    #[display("failed to add the book")]
    Commit,
    #[display("failed to write output")]
    Output,
}

#[derive(Parser)]
#[command(name = "bookshelf", version, about = "Browse and contribute image books stored in a Hugging Face repository")]
struct Cli {
    /// Configuration file (defaults to config.toml in the platform config directory).
    #[arg(long, global = true, env = "BOOKSHELF_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log the commit instead of sending it.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the books in the repository.
    List {
        /// Print the books as JSON.
        #[arg(long)]
        json: bool,
        /// Only books whose title or tags contain this text.
        #[arg(short, long)]
        query: Option<String>,
        /// Print every tag on the shelf instead of the books.
        #[arg(long, conflicts_with = "json")]
        tags: bool,
    },
    /// Upload a new book as a single commit.
    Add(AddArgs),
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    title: String,
    /// Folder to store the book in (derived from the title if omitted).
    #[arg(long)]
    folder: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Comma-separated tags.
    #[arg(long)]
    tags: Option<String>,
    #[arg(long, value_enum, default_value_t = DirectionArg::Rtl)]
    direction: DirectionArg,
    /// Page to use as the cover (defaults to the first file).
    #[arg(long)]
    cover: Option<String>,
    /// Your X handle.
    #[arg(long)]
    x_id: Option<String>,
    /// Where the images were generated.
    #[arg(long)]
    generation_url: Option<String>,
    /// Page images, in reading order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}
impl AddArgs {
    fn into_book(self) -> NewBook {
        let metadata = BookMetadata {
            title: None,
            author: self.author,
            description: self.description,
            tags: self.tags.as_deref().map(BookMetadata::parse_tags).filter(|tags| !tags.is_empty()),
            direction: Some(self.direction.into()),
            cover: self.cover,
            x_id: self.x_id.map(|id| id.replace('@', "")).filter(|id| !id.trim().is_empty()),
            generation_url: self.generation_url,
        };
        let book = NewBook::new(self.title)
            .with_metadata(metadata)
            .with_files(self.files.into_iter().map(PageFile::from_path));
        match self.folder {
            Some(folder) => book.with_folder_name(folder),
            None => book,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Ltr,
    Rtl,
}
impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Ltr => Direction::Ltr,
            DirectionArg::Rtl => Direction::Rtl,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "bookshelf=debug,bookshelf_library=debug,bookshelf_storage=debug,bookshelf_config=debug"
    } else {
        "bookshelf=info,bookshelf_library=info,warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let backend = connect(&config, cli.dry_run)?;
    match cli.command {
        Command::List { json, query, tags } => list(&backend, json, query.as_deref(), tags).await,
        Command::Add(args) => add(&backend, args).await,
    }
}

fn connect(config: &Config, dry_run: bool) -> Result<BackendHandle> {
    let repository = config.repo_id().or_raise(|| ErrorKind::Config)?;
    tracing::debug!(%repository, endpoint = %config.endpoint, revision = %config.revision, "Connecting");
    let hub = HubBackend::new(
        "hub",
        repository,
        Some(config.endpoint.clone()),
        Some(config.revision.clone()),
        config.token.clone(),
        config.timeout(),
    )
    .or_raise(|| ErrorKind::Backend)?;
    let backend: BackendHandle = Arc::new(hub);
    if dry_run {
        return Ok(Arc::new(ReadOnlyBackend::new(backend)));
    }
    Ok(backend)
}

async fn list(backend: &BackendHandle, json: bool, query: Option<&str>, tags: bool) -> Result<()> {
    let shelf = Bookshelf::new(index::index(backend).await.or_raise(|| ErrorKind::Index)?);
    let mut out = std::io::stdout().lock();
    if tags {
        for tag in shelf.tags() {
            writeln!(out, "{tag}").or_raise(|| ErrorKind::Output)?;
        }
        return Ok(());
    }
    let books = shelf.search(query.unwrap_or_default());
    if json {
        serde_json::to_writer_pretty(&mut out, &books).or_raise(|| ErrorKind::Output)?;
        writeln!(out).or_raise(|| ErrorKind::Output)?;
        return Ok(());
    }
    for book in books {
        writeln!(out, "{}", describe(book)).or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn describe(book: &BookEntry) -> String {
    let mut line = format!("{}\t{}\t{} pages", book.folder_name, book.title, book.page_count());
    if let Some(author) = book.metadata.as_ref().and_then(|m| m.author.as_deref()) {
        line.push_str(&format!("\tby {author}"));
    }
    let tags = book.tags();
    if !tags.is_empty() {
        line.push_str(&format!("\t[{}]", tags.join(", ")));
    }
    line
}

async fn add(backend: &BackendHandle, args: AddArgs) -> Result<()> {
    let info = add_book(backend, args.into_book()).await.or_raise(|| ErrorKind::Commit)?;
    let mut out = std::io::stdout().lock();
    match (info.commit_url, info.commit_oid) {
        (Some(url), _) => writeln!(out, "Committed: {url}"),
        (None, Some(oid)) => writeln!(out, "Committed: {oid}"),
        (None, None) => writeln!(out, "Nothing was committed (dry run)"),
    }
    .or_raise(|| ErrorKind::Output)
}
