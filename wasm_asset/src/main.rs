use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use wasm_asset::config::{BuildSettings, WasmAssetConfig, load_config};
use wasm_asset::error::WasmAssetError;
use wasm_asset::host::ManifestHost;
use wasm_asset::loader::ModuleFormat;
use wasm_asset::pipeline::{AssetOutput, AssetRequest, BuildStrategy, BuildTools, build_asset, transform_entry};
use wasm_asset::session::BuildSession;
use wasm_asset::tools::{ProcessBindingGenerator, ProcessInstaller, ProcessToolchain};
use wasm_asset::wrapper::PatchMode;

#[derive(Parser, Debug)]
#[command(name = "wasm-asset")]
#[command(about = "Turn a Rust crate into a bundler-loadable WebAssembly module", long_about = None)]
struct Cli {
    /// Debug-level logs (overridden by WASM_ASSET_LOG).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a crate asset with the native toolchain and emit its loader.
    Build(BuildArgs),

    /// Rewrite an existing wasm-pack entry module; no toolchain is run.
    ///
    /// Example:
    ///   wasm-asset rewrite pkg/hello.js --id hello --url /hello_bg.wasm
    Rewrite(RewriteArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Asset path: the crate's Cargo.toml or any file inside the crate.
    asset: PathBuf,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Base URL binaries are served from.
    #[arg(long)]
    public_url: Option<String>,

    /// Cache directory for generated loaders, relative to the crate.
    #[arg(long)]
    cache_dir: Option<String>,

    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// How the binding wrapper is patched.
    #[arg(long, value_enum)]
    patch: Option<PatchArg>,

    /// wasm-pack `--target` value.
    #[arg(long)]
    wasm_pack_target: Option<String>,

    /// Write inline module code here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write `<out>.map` for an inlined loader.
    #[arg(long, requires = "out")]
    source_map: bool,

    /// Write the JSON build manifest here.
    #[arg(long)]
    manifest: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RewriteArgs {
    entry: PathBuf,

    /// URL the loader fetches the binary from.
    #[arg(long)]
    url: String,

    /// Module id (the package name).
    #[arg(long)]
    id: String,

    #[arg(long, value_enum, default_value_t = FormatArg::Esm)]
    format: FormatArg,

    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write `<out>.map` mapping the loader back to the entry.
    #[arg(long, requires = "out")]
    source_map: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    Direct,
    Bindgen,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Esm,
    Commonjs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PatchArg {
    Structural,
    Textual,
}

impl From<StrategyArg> for BuildStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Direct => BuildStrategy::Direct,
            StrategyArg::Bindgen => BuildStrategy::WithBindingGenerator,
        }
    }
}

impl From<FormatArg> for ModuleFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Esm => ModuleFormat::Esm,
            FormatArg::Commonjs => ModuleFormat::CommonJs,
        }
    }
}

impl From<PatchArg> for PatchMode {
    fn from(value: PatchArg) -> Self {
        match value {
            PatchArg::Structural => PatchMode::Structural,
            PatchArg::Textual => PatchMode::Textual,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum OutputSummary {
    Inline {
        bytes: usize,
    },
    #[serde(rename_all = "camelCase")]
    Registered {
        type_tag: String,
        loader_path: PathBuf,
        binary_path: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct BuildManifest<'h> {
    asset: PathBuf,
    output: OutputSummary,
    #[serde(flatten)]
    host: &'h ManifestHost,
}

fn main() {
    let cli = Cli::parse();
    wasm_asset::logging::init_logging(cli.verbose);
    let result = match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Rewrite(args) => run_rewrite(args),
    };
    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run_build(args: BuildArgs) -> Result<(), WasmAssetError> {
    let asset_path = dunce::canonicalize(&args.asset).map_err(|source| WasmAssetError::Io {
        path: args.asset.clone(),
        source,
    })?;
    let request = AssetRequest::for_asset(&asset_path)?;
    let overrides = WasmAssetConfig {
        public_url: args.public_url.clone(),
        cache_dir: args.cache_dir.clone(),
        strategy: args.strategy.map(Into::into),
        module_format: args.format.map(Into::into),
        wrapper_patch: args.patch.map(Into::into),
        wasm_pack_target: args.wasm_pack_target.clone(),
        source_maps: args.source_map.then_some(true),
    };
    let config = load_config(&request.crate_dir)?.merged_with(&overrides);
    let settings = BuildSettings::resolve(&request.crate_dir, &config);

    let session = BuildSession::new(settings.cache_dir.clone());
    let toolchain = ProcessToolchain::new(settings.wasm_pack_target.clone());
    let tools = BuildTools {
        toolchain: &toolchain,
        binding_generator: &ProcessBindingGenerator,
        installer: &ProcessInstaller,
    };
    let mut host = ManifestHost::new(settings.public_url.clone());

    let output = build_asset(&session, &tools, &mut host, &request, &settings)?;
    let summary = match output {
        AssetOutput::Inline { code, source_map } => {
            emit_loader(args.out.as_deref(), &code, source_map.as_deref())?;
            OutputSummary::Inline { bytes: code.len() }
        }
        AssetOutput::Registered {
            type_tag,
            loader_path,
            binary_path,
        } => OutputSummary::Registered {
            type_tag,
            loader_path,
            binary_path,
        },
    };
    let print_manifest = matches!(summary, OutputSummary::Registered { .. });

    let manifest = BuildManifest {
        asset: asset_path,
        output: summary,
        host: &host,
    };
    let rendered = serde_json::to_string_pretty(&manifest).map_err(|err| WasmAssetError::Io {
        path: args.manifest.clone().unwrap_or_default(),
        source: std::io::Error::other(err),
    })?;
    match args.manifest.as_deref() {
        Some(path) => write_file(path, &rendered),
        None if print_manifest => emit_text(None, &rendered),
        None => Ok(()),
    }
}

fn run_rewrite(args: RewriteArgs) -> Result<(), WasmAssetError> {
    let source_text = std::fs::read_to_string(&args.entry).map_err(|source| WasmAssetError::Io {
        path: args.entry.clone(),
        source,
    })?;
    let loader = transform_entry(
        &args.entry,
        &source_text,
        &args.id,
        args.format.into(),
        args.source_map,
        |_| args.url.clone(),
    )?;
    emit_loader(
        args.out.as_deref(),
        &loader.code,
        loader.source_map.as_deref(),
    )
}

/// A map is only written next to an output file; stdout gets the code alone.
fn emit_loader(
    out: Option<&Path>,
    code: &str,
    source_map: Option<&str>,
) -> Result<(), WasmAssetError> {
    let (Some(out), Some(source_map)) = (out, source_map) else {
        return emit_text(out, code);
    };
    let mut map_path = out.as_os_str().to_owned();
    map_path.push(".map");
    let map_path = PathBuf::from(map_path);
    let map_name = map_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    write_file(&map_path, source_map)?;
    write_file(
        out,
        &format!("{}\n//# sourceMappingURL={map_name}\n", code.trim_end()),
    )
}

fn emit_text(out: Option<&Path>, text: &str) -> Result<(), WasmAssetError> {
    match out {
        Some(path) => write_file(path, text),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), WasmAssetError> {
    std::fs::write(path, text).map_err(|source| WasmAssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}
