use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use packstruct_core::{Layout, LayoutError, ReaderSource, Record, RegistryDecl, StructRegistry};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("PACKSTRUCT_BUILD_COMMIT"),
    ", ",
    env!("PACKSTRUCT_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  packstruct render layouts.json --values values.json\n  packstruct pack layouts.json values.json -o frame.bin\n  packstruct unpack layouts.json frame.bin --mode stream --pretty";

#[derive(Parser, Debug)]
#[command(name = "packstruct")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Pack and unpack binary records described by declarative layouts.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Increase log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the wire token string of a layout.
    Render {
        /// Layout file (JSON)
        layouts: PathBuf,

        /// Layout name (defaults to the unnamed or only layout)
        #[arg(long)]
        layout: Option<String>,

        /// Values used to resolve data-dependent sizes
        #[arg(long)]
        values: Option<PathBuf>,
    },
    /// Encode a JSON record into bytes.
    Pack {
        /// Layout file (JSON)
        layouts: PathBuf,

        /// Record to encode (JSON object)
        values: PathBuf,

        /// Layout name (defaults to the unnamed or only layout)
        #[arg(long)]
        layout: Option<String>,

        /// Output file for the packed bytes
        #[arg(short = 'o', long, required_unless_present = "hex")]
        output: Option<PathBuf>,

        /// Print the packed bytes as hex on stdout
        #[arg(long, conflicts_with = "output")]
        hex: bool,
    },
    /// Decode bytes into a JSON record.
    Unpack {
        /// Layout file (JSON)
        layouts: PathBuf,

        /// Binary input
        input: PathBuf,

        /// Layout name (defaults to the unnamed or only layout)
        #[arg(long)]
        layout: Option<String>,

        /// Decoding strategy
        #[arg(long, value_enum, default_value_t = Mode::Whole)]
        mode: Mode,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Read the whole file, then decode field by field
    Whole,
    /// Read the file one field length at a time
    Stream,
    /// Single-pass decode; layouts without data-dependent sizes only
    Fast,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Render {
            layouts,
            layout,
            values,
        } => cmd_render(&layouts, layout.as_deref(), values.as_deref()),
        Commands::Pack {
            layouts,
            values,
            layout,
            output,
            hex,
        } => cmd_pack(&layouts, &values, layout.as_deref(), output, hex),
        Commands::Unpack {
            layouts,
            input,
            layout,
            mode,
            pretty,
        } => cmd_unpack(&layouts, &input, layout.as_deref(), mode, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(err) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("warning: logging disabled: {err}");
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<LayoutError> for CliError {
    fn from(err: LayoutError) -> Self {
        let hint = match &err {
            LayoutError::UnknownModifier { .. } => {
                Some("check the modifier spelling in the layout file".to_string())
            }
            LayoutError::MissingDependency { reference, .. } => {
                Some(format!("add '{reference}' to the values file"))
            }
            LayoutError::SymbolicSize { .. } => {
                Some("use --mode whole or --mode stream for this layout".to_string())
            }
            LayoutError::TruncatedInput { .. } | LayoutError::EndOfStream { .. } => {
                Some("the input is shorter than the layout requires".to_string())
            }
            _ => None,
        };
        CliError::new(err.to_string(), hint)
    }
}

fn cmd_render(
    layouts: &Path,
    layout: Option<&str>,
    values: Option<&Path>,
) -> Result<(), CliError> {
    let registry = load_registry(layouts)?;
    let layout = select_layout(&registry, layout)?;
    let context = match values {
        Some(path) => load_values(path)?,
        None => Record::new(),
    };
    let rendered = layout.render(&context).map_err(|err| match err {
        LayoutError::UnresolvedSize { field, reference } => CliError::new(
            format!("size of '{field}' depends on '{reference}'"),
            Some("pass --values with the referenced fields".to_string()),
        ),
        other => other.into(),
    })?;
    println!("{rendered}");
    Ok(())
}

fn cmd_pack(
    layouts: &Path,
    values: &Path,
    layout: Option<&str>,
    output: Option<PathBuf>,
    hex: bool,
) -> Result<(), CliError> {
    let registry = load_registry(layouts)?;
    let layout = select_layout(&registry, layout)?;
    let record = load_values(values)?;
    let bytes = layout.pack(&record)?;

    if hex {
        println!("{}", to_hex(&bytes));
        return Ok(());
    }

    let output = output.ok_or_else(|| {
        CliError::new(
            "missing output path",
            Some("use -o/--output or --hex".to_string()),
        )
    })?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(&output, &bytes)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;
    info!("{} bytes written -> {}", bytes.len(), output.display());
    Ok(())
}

fn cmd_unpack(
    layouts: &Path,
    input: &Path,
    layout: Option<&str>,
    mode: Mode,
    pretty: bool,
) -> Result<(), CliError> {
    let registry = load_registry(layouts)?;
    let layout = select_layout(&registry, layout)?;
    validate_input_file(input)?;

    let record = match mode {
        Mode::Whole => {
            let bytes = read_input(input)?;
            layout.unpack(&bytes)?
        }
        Mode::Fast => {
            let bytes = read_input(input)?;
            layout.fast_unpack(&bytes)?
        }
        Mode::Stream => {
            let file = File::open(input)
                .with_context(|| format!("Failed to open input: {}", input.display()))?;
            let mut source = ReaderSource::new(BufReader::new(file));
            let record = layout.unpack_from_stream(&mut source)?;
            debug!("stream consumed {} bytes", source.consumed());
            record
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&record)
    } else {
        serde_json::to_string(&record)
    }
    .context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

fn load_registry(path: &Path) -> Result<StructRegistry, CliError> {
    let text = fs::read_to_string(path).map_err(|err| {
        CliError::new(
            format!("cannot read layout file {}: {err}", path.display()),
            Some("pass a JSON layout file".to_string()),
        )
    })?;
    let decl = RegistryDecl::from_json(&text).map_err(|err| {
        CliError::new(
            format!("invalid layout file {}: {err}", path.display()),
            Some(r#"expected {"layouts": [{"name": ..., "fields": [...]}]}"#.to_string()),
        )
    })?;
    let registry = StructRegistry::from_decl(&decl)?;
    debug!("loaded {} layouts from {}", registry.len(), path.display());
    Ok(registry)
}

fn select_layout<'a>(
    registry: &'a StructRegistry,
    name: Option<&str>,
) -> Result<&'a Layout, CliError> {
    registry.resolve(name).map_err(|err| {
        let available = registry.names().collect::<Vec<_>>().join(", ");
        let hint = if available.is_empty() {
            None
        } else {
            Some(format!("use --layout with one of: {available}"))
        };
        CliError::new(err.to_string(), hint)
    })
}

fn load_values(path: &Path) -> Result<Record, CliError> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read values file: {}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            format!("invalid values file {}: {err}", path.display()),
            Some("expected a JSON object mapping field names to values".to_string()),
        )
    })
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.is_file() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a binary file produced by `packstruct pack`".to_string()),
        ));
    }
    Ok(())
}

fn read_input(input: &Path) -> Result<Vec<u8>> {
    fs::read(input).with_context(|| format!("Failed to read input: {}", input.display()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
