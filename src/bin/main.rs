//! PE Signer CLI
//!
//! Command-line wrapper around the Authenticode signing engine: signs PE
//! images with a PEM key and certificate, inspects image layout, and manages
//! the configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use pe_signer::{
    domain::pe::PeImage, services::PeHasher, sign_pe_file, ConfigManager, HashAlgorithm,
    OpenSslKeySigner, SigningConfiguration,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pe-signer")]
#[command(about = "Authenticode signing for PE/COFF images")]
#[command(long_about = "
PE Signer - Authenticode signing for PE/COFF images

EXAMPLES:
    # Sign in place with an RSA or EC key
    pe-signer sign --key signer.key --cert signer.pem bootx64.efi

    # Sign to a new file with SHA-384 and an intermediate bundle
    pe-signer sign --key k.pem --cert c.pem --chain ca.pem --hash sha384 app.exe -o app-signed.exe

    # Show the Authenticode digest and certificate table of an image
    pe-signer inspect app.exe

ENVIRONMENT VARIABLES:
    RUST_LOG        Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a PE file
    Sign(SignArgs),

    /// Print headers, certificate table and Authenticode digest of a PE file
    Inspect {
        /// PE file to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Hash algorithm for the digest
        #[arg(long, value_enum, default_value = "sha256")]
        hash: HashAlgorithmArg,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct SignArgs {
    /// PE file to sign (.exe, .dll, .efi, .sys, etc.)
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Output file path (defaults to overwriting input file)
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// PEM private key
    #[arg(long, value_name = "KEY_PEM")]
    key: PathBuf,

    /// PEM signer certificate
    #[arg(long, value_name = "CERT_PEM")]
    cert: PathBuf,

    /// PEM bundle of intermediate certificates to embed
    #[arg(long, value_name = "CHAIN_PEM")]
    chain: Option<PathBuf>,

    /// Hash algorithm (overrides config)
    #[arg(long, value_enum)]
    hash: Option<HashAlgorithmArg>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Add a signingTime attribute
    #[arg(long)]
    signing_time: bool,

    /// Program name recorded in the signature
    #[arg(long, value_name = "NAME")]
    program_name: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show {
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init {
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum HashAlgorithmArg {
    Sha256,
    Sha384,
    Sha512,
}

impl From<HashAlgorithmArg> for HashAlgorithm {
    fn from(arg: HashAlgorithmArg) -> Self {
        match arg {
            HashAlgorithmArg::Sha256 => HashAlgorithm::Sha256,
            HashAlgorithmArg::Sha384 => HashAlgorithm::Sha384,
            HashAlgorithmArg::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

fn config_manager(path: Option<PathBuf>) -> Result<ConfigManager> {
    match path {
        Some(path) => Ok(ConfigManager::with_path(path)),
        None => ConfigManager::new().into_diagnostic(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(&cli.command, Commands::Sign(args) if args.verbose);
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Sign(args) => handle_sign_command(args),
        Commands::Inspect { file, hash } => handle_inspect_command(&file, hash.into()),
        Commands::Config(ConfigCommands::Show { config }) => {
            let manager = config_manager(config)?;
            let loaded = manager.load_or_default()?;
            println!("# {}", manager.config_path().display());
            print!("{}", toml::to_string_pretty(&loaded).into_diagnostic()?);
            Ok(())
        }
        Commands::Config(ConfigCommands::Init { config }) => {
            let manager = config_manager(config)?;
            manager.save(&SigningConfiguration::default())?;
            println!("Wrote {}", manager.config_path().display());
            Ok(())
        }
    }
}

fn handle_sign_command(args: SignArgs) -> Result<()> {
    let manager = config_manager(args.config)?;
    let mut configuration = manager.load_or_default()?;
    if let Some(hash) = args.hash {
        configuration.hash_algorithm = hash.into();
    }
    if args.signing_time {
        configuration.include_signing_time = true;
    }
    if args.program_name.is_some() {
        configuration.program_name = args.program_name;
    }

    let signer = OpenSslKeySigner::from_pem_files(&args.key, &args.cert, args.chain.as_deref())
        .wrap_err("Failed to load signing key")?;
    log::debug!("Using {signer:?}");

    let output = args.output.unwrap_or_else(|| args.input_file.clone());
    sign_pe_file(
        &args.input_file,
        &output,
        &signer,
        configuration.to_options(),
    )
    .wrap_err_with(|| format!("Failed to sign {}", args.input_file.display()))?;

    println!("Signed {} -> {}", args.input_file.display(), output.display());
    Ok(())
}

fn handle_inspect_command(file: &Path, hash: HashAlgorithm) -> Result<()> {
    let data = std::fs::read(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
    let image = PeImage::parse(&data).map_err(pe_signer::SigningError::from)?;

    let coff = image.coff_header();
    let optional = image.optional_header();
    println!("File:            {} ({} bytes)", file.display(), image.len());
    println!(
        "Format:          {}",
        if image.is_pe32_plus() { "PE32+" } else { "PE32" }
    );
    println!("Machine:         0x{:04x}", coff.machine);
    println!("Characteristics: 0x{:04x}", coff.characteristics);
    println!("Subsystem:       {}", optional.subsystem);
    println!("Entry point:     0x{:08x}", optional.address_of_entry_point);
    println!("Image base:      0x{:x}", optional.image_base);
    println!("Checksum:        0x{:08x}", optional.checksum);
    println!("Sections:");
    for section in image.sections() {
        println!(
            "  {:<8} va=0x{:08x} vsize=0x{:08x} raw=0x{:08x}+0x{:x}",
            section.name,
            section.virtual_address,
            section.virtual_size,
            section.pointer_to_raw_data,
            section.size_of_raw_data
        );
    }
    if image.overlay_len() > 0 {
        println!("Overlay:         {} bytes", image.overlay_len());
    }
    match image.certificate_table() {
        Some(table) => {
            println!("Certificate table: 0x{:x}..0x{:x}", table.start, table.end);
            for (index, entry) in image
                .win_certificates()
                .map_err(pe_signer::SigningError::from)?
                .iter()
                .enumerate()
            {
                println!(
                    "  [{index}] length={} revision=0x{:04x} type=0x{:04x}",
                    entry.length, entry.revision, entry.cert_type
                );
            }
        }
        None => println!("Certificate table: none"),
    }

    let digest = PeHasher::new(hash).hash(&image)?;
    println!("Authenticode {}: {}", hash, digest.to_hex());
    Ok(())
}
