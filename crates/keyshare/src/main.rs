#![forbid(unsafe_code)]

//! keyshare CLI: classify identity certificates and export them as PKCS#12.

use clap::{Parser, Subcommand};
use keyshare_certs::{
    certificate_requested, certificate_zip_requested, classify, decode_certificate,
    not_before_epoch_seconds, pkcs12_file_name, serial_number_hex,
};
use keyshare_core::Error;
use keyshare_pkcs12::{
    assemble_with_options, generate_password, open_pkcs12, Pkcs12Options,
    DEFAULT_PASSWORD_LEN,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "keyshare",
    about = "keyshare: certificate roles and PKCS#12 export for key sharing",
    version
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the role, serial number, and validity start of a certificate
    Classify {
        /// Certificate (PEM or DER)
        cert: PathBuf,
    },

    /// Check whether content type identifiers request a certificate
    Requested {
        /// Certificate (PEM or DER)
        cert: PathBuf,

        /// Content type identifier (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Match against the zip identifier table
        #[arg(long)]
        zip: bool,
    },

    /// Build a PKCS#12 file from a certificate and a raw key buffer
    Export {
        /// Certificate (PEM or DER)
        cert: PathBuf,

        /// Raw key buffer (public part followed by private part)
        raw_key: PathBuf,

        /// Container password (default: generated and printed)
        #[arg(short, long)]
        password: Option<String>,

        /// Use pbeWithSHAAnd3-KeyTripleDES-CBC with an HMAC-SHA1 MAC
        #[arg(long)]
        legacy: bool,

        /// friendlyName attribute for the bags
        #[arg(long = "friendly-name")]
        friendly_name: Option<String>,

        /// Output file (default: <role>_<serial>.p12)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Open a PKCS#12 file and list what it holds
    Inspect {
        /// PKCS#12 file
        file: PathBuf,

        /// Container password
        #[arg(short, long)]
        password: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Classify { cert } => cmd_classify(&cert),
        Commands::Requested { cert, ids, zip } => cmd_requested(&cert, &ids, zip),
        Commands::Export {
            cert,
            raw_key,
            password,
            legacy,
            friendly_name,
            output,
        } => cmd_export(&cert, &raw_key, password, legacy, friendly_name, output),
        Commands::Inspect { file, password } => cmd_inspect(&file, &password),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_classify(path: &Path) -> Result<(), Error> {
    let cert = decode_certificate(&read_certificate(path)?)?;
    let role = classify(&cert);
    let serial = serial_number_hex(&cert)?;

    println!("role:       {}", role.display_name());
    println!("serial:     {serial}");
    println!("not before: {}", not_before_epoch_seconds(&cert)?);
    println!("file name:  {}", pkcs12_file_name(role, &serial));
    Ok(())
}

fn cmd_requested(path: &Path, ids: &[String], zip: bool) -> Result<(), Error> {
    let cert = decode_certificate(&read_certificate(path)?)?;
    let requested = if zip {
        certificate_zip_requested(&cert, ids)
    } else {
        certificate_requested(&cert, ids)
    };
    println!("{requested}");
    Ok(())
}

fn cmd_export(
    cert_path: &Path,
    raw_key_path: &Path,
    password: Option<String>,
    legacy: bool,
    friendly_name: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let cert_der = read_certificate(cert_path)?;
    let raw_key = read_bytes(raw_key_path)?;
    let cert = decode_certificate(&cert_der)?;

    let options = Pkcs12Options {
        friendly_name,
        ..if legacy {
            Pkcs12Options::legacy()
        } else {
            Pkcs12Options::default()
        }
    };
    let (password, generated) = match password {
        Some(p) => (p, false),
        None => (generate_password(DEFAULT_PASSWORD_LEN), true),
    };

    let p12 = assemble_with_options(&cert_der, &raw_key, &password, &options)?;
    let output = match output {
        Some(p) => p,
        None => PathBuf::from(pkcs12_file_name(classify(&cert), &serial_number_hex(&cert)?)),
    };
    std::fs::write(&output, &p12).map_err(|e| Error::Other(format!("{}: {e}", output.display())))?;

    eprintln!("Wrote: {}", output.display());
    if generated {
        println!("{password}");
    }
    Ok(())
}

fn cmd_inspect(path: &Path, password: &str) -> Result<(), Error> {
    let contents = open_pkcs12(&read_bytes(path)?, password)?;

    for entry in &contents.certificates {
        let cert = decode_certificate(&entry.der)?;
        println!(
            "certificate {} role={}{}",
            serial_number_hex(&cert)?,
            classify(&cert).display_name(),
            entry
                .friendly_name
                .as_deref()
                .map(|n| format!(" name={n:?}"))
                .unwrap_or_default()
        );
    }
    for entry in &contents.private_keys {
        println!("private key ({} bytes PKCS#8)", entry.der.len());
    }
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

/// Read a certificate, accepting PEM or DER.
fn read_certificate(path: &Path) -> Result<Vec<u8>, Error> {
    let data = read_bytes(path)?;
    if !data.starts_with(b"-----BEGIN") {
        return Ok(data);
    }
    let (label, der) = der::pem::decode_vec(&data)
        .map_err(|e| Error::KeyFormat(format!("{}: invalid PEM: {e}", path.display())))?;
    if label != "CERTIFICATE" {
        return Err(Error::KeyFormat(format!(
            "{}: expected a CERTIFICATE PEM block, found {label}",
            path.display()
        )));
    }
    Ok(der)
}
