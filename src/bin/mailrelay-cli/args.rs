use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mailrelay-cli", version, about = "Relais de campagnes e-mail")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// fichier de configuration JSON
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// répertoire de données (prend le pas sur DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// format: human|json|csv
    #[arg(long, global = true, value_enum, default_value_t = Format::Human)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
    /// validate et series uniquement
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// passe les adresses dans le pipeline de délivrabilité
    Validate {
        /// lit des adresses depuis stdin (une par ligne)
        #[arg(long)]
        stdin: bool,
        emails: Vec<String>,
    },
    #[command(flatten)]
    Relay(RelayCommand),
}

/// Commandes qui ouvrent le stockage du relais.
#[derive(Subcommand)]
pub enum RelayCommand {
    /// envoie un message
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long)]
        html: Option<String>,
        /// jeton de campagne (statistiques)
        #[arg(long)]
        token: Option<String>,
    },
    /// envoie un lot CSV (colonnes emails + analysis); Ctrl-C arrête le lot
    Batch {
        file: PathBuf,
        #[arg(long)]
        token: Option<String>,
        /// pause entre deux envois (ms)
        #[arg(long = "delay-ms")]
        delay_ms: Option<u64>,
    },
    /// applique un lot d'événements webhook (fichier JSON ou `-`)
    Events { input: String },
    /// enregistre une réponse entrante (fichier JSON ou `-`)
    Inbound { input: String },
    /// relances et rapport « ouvert sans réponse »
    Followup {
        /// relance toutes les 60 s jusqu'à Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// série journalière sent/delivered/opens
    Series {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        token: Option<String>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// Contenu d'un fichier, ou de stdin pour `-`.
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("read {input}"))
}
