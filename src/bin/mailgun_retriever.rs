use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::style::{Stylize, style};
use std::path::{Path, PathBuf};

use mailgun_retriever::auth::key_store;
use mailgun_retriever::auth::prompt::read_secret;
use mailgun_retriever::config::{self, Config, EU_API_BASE};
use mailgun_retriever::import::{ImportOptions, request_stop, run_import};
use mailgun_retriever::mail::decoders::display_subject;
use mailgun_retriever::mail::events_client::{DEFAULT_API_BASE, EventLogClient};
use mailgun_retriever::store::lock::StoreLock;
use mailgun_retriever::store::maildir::MaildirSink;

#[derive(Parser)]
#[command(name = "mailgun_retriever")]
#[command(about = "Save stored mailgun messages to maildir", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Region {
    Us,
    Eu,
}

#[derive(Subcommand)]
enum Command {
    /// Download messages stored since the last run
    Fetch {
        /// Mail directory used to save messages to
        #[arg(short, long, value_name = "DIRECTORY")]
        maildir: Option<PathBuf>,

        /// Mailgun domain to retrieve messages from
        #[arg(short, long)]
        domain: Option<String>,

        /// Mailgun API key used for authentication
        #[arg(short = 'k', long)]
        apikey: Option<String>,

        /// Limit the number of downloaded messages
        #[arg(short, long, value_name = "COUNT")]
        limit: Option<usize>,

        /// API region (overrides api_base from the config file)
        #[arg(long, value_enum)]
        region: Option<Region>,

        /// Save progress after every message instead of once at the end
        #[arg(long)]
        checkpoint_each: bool,
    },

    /// Store the API key for a domain in the keyring
    SetApiKey {
        #[arg(short, long)]
        domain: String,
    },

    /// Write a config template to the user config directory
    InitConfig,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetApiKey { domain } => {
            let key = read_secret(&format!("Paste API key for domain {domain}:"))?;
            key_store::save_api_key(&domain, &key)?;
            println!("Saved API key for domain {}", domain);
            Ok(())
        }

        Command::InitConfig => {
            let path = config::write_template()?;
            println!("Created template config at {}", path.display());
            Ok(())
        }

        Command::Fetch {
            maildir,
            domain,
            apikey,
            limit,
            region,
            checkpoint_each,
        } => {
            let cfg = config::load_config().map_err(|e| anyhow!("Configuration error: {e:#}"))?;

            let maildir = maildir
                .or_else(|| cfg.maildir.as_deref().map(expand_home))
                .ok_or_else(|| anyhow!("no maildir given (--maildir or config)"))?;
            let domain = domain
                .or_else(|| cfg.domain.clone())
                .ok_or_else(|| anyhow!("no domain given (--domain or config)"))?;
            let api_key = resolve_api_key(apikey, &domain)?;

            let api_base = match region {
                Some(Region::Us) => DEFAULT_API_BASE,
                Some(Region::Eu) => EU_API_BASE,
                None => cfg.api_base(),
            };

            let opts = ImportOptions {
                limit: limit.or(cfg.limit),
                checkpoint_each: checkpoint_each || cfg.checkpoint_each.unwrap_or(false),
                ..Default::default()
            };
            let r2 = opts.running.clone();
            ctrlc::set_handler(move || {
                if request_stop(&r2) {
                    // second Ctrl-C: a request is stuck, give up without saving
                    std::process::exit(130);
                }
                eprintln!("Stopping after the current message (Ctrl-C again to abort)");
            })?;

            fetch(&cfg, api_base, &maildir, &domain, &api_key, &opts)
        }
    }
}

fn fetch(
    cfg: &Config,
    api_base: &str,
    maildir: &Path,
    domain: &str,
    api_key: &str,
    opts: &ImportOptions,
) -> Result<()> {
    let _lock = StoreLock::acquire(maildir)?;

    let client = EventLogClient::with_base(api_base, domain, api_key, cfg.timeout())?
        .with_cancel(opts.running.clone());
    let mut sink = MaildirSink::open(maildir)?;

    println!(
        "{}",
        style(format!("[+] Retrieving messages for domain {domain}")).white()
    );

    let stats = run_import(&client, &mut sink, maildir, opts, |m| {
        println!("{}", style(format!("> {}", display_subject(m))).cyan());
    })?;

    if stats.limit_reached {
        println!(
            "{}",
            style("[+] Message download limit reached, exiting").white()
        );
    }
    println!(
        "{}",
        style(format!(
            "[+] Download completed in {:.2}s ({} new, {} already present)",
            stats.duration_ms as f64 / 1000.0,
            stats.stored,
            stats.skipped
        ))
        .white()
    );
    Ok(())
}

/// Flag, then `MAILGUN_API_KEY`, then keyring, then ask.
fn resolve_api_key(flag: Option<String>, domain: &str) -> Result<String> {
    if let Some(k) = flag {
        return Ok(k);
    }
    if let Ok(k) = std::env::var("MAILGUN_API_KEY") {
        return Ok(k);
    }
    match key_store::load_api_key(domain) {
        Ok(Some(k)) => return Ok(k),
        Ok(None) => {}
        Err(e) => log::warn!("keyring unavailable: {e}"),
    }
    read_secret(&format!("[+] Please enter the API key for domain {domain}:"))
}

fn expand_home(p: &str) -> PathBuf {
    match (p.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(p),
    }
}
