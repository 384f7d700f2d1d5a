//! murmur: end-to-end encrypted messaging keys from the command line
//!
//! Commands:
//!   keys init | unlock | status | share | reset   - manage the user's key pair
//!   contacts add | show | fetch                    - cached contact public keys
//!   encrypt <recipient> <message>                  - seal a message (JSON on stdout)
//!   decrypt [<file>]                               - open a sealed message
//!   config show                                    - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::io::Read;
use std::path::{Path, PathBuf};

use murmur_core::config::{expand_tilde, MurmurConfig};
use murmur_core::MessageMetadata;
use murmur_crypto::{EncryptedMessage, KdfParams};
use murmur_keys::{open_store, HttpKeyDirectory, KeyError, KeyManager, KeyState};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "murmur",
    version,
    about = "murmur E2E messaging keys",
    long_about = "murmur: generate and unlock messaging keys, manage contact keys,\n\
                  encrypt and decrypt direct messages"
)]
struct Cli {
    /// Path to murmur.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "MURMUR_CONFIG",
        default_value = "~/.config/murmur/murmur.toml"
    )]
    config: PathBuf,

    /// Acting user id
    #[arg(long, short = 'u', env = "MURMUR_USER", global = true)]
    user: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "MURMUR_LOG", global = true)]
    log: Option<String>,

    /// Log format; overrides [log] format
    #[arg(long, env = "MURMUR_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Key pair management for the acting user
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Contact public key cache
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },

    /// Encrypt a message to a contact and print the envelope as JSON
    Encrypt {
        /// Recipient user id
        recipient: String,
        /// Message text
        message: String,
        /// Metadata type tag carried in plaintext (e.g. text, image)
        #[arg(long = "type", default_value = "text")]
        kind: String,
    },

    /// Decrypt an envelope read from a file or stdin
    Decrypt {
        /// Path to the envelope JSON (default: stdin)
        input: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Generate a key pair and store it wrapped under a password
    Init,
    /// Check that the password unlocks the stored keys
    Unlock,
    /// Show key state, public key and metadata
    Status,
    /// Record that the public key has been published
    Share,
    /// Delete the stored keys (messages to the old key become unreadable)
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ContactsAction {
    /// Cache a contact's base64 public key
    Add { contact: String, public_key: String },
    /// Print a cached contact key
    Show { contact: String },
    /// Fetch a contact key from the directory and cache it
    Fetch { contact: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

// ── Entry point ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = MurmurConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "murmur starting"
    );

    match cli.command {
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
        Commands::Keys { action } => {
            let km = open_manager(&config, cli.user.as_deref())?;
            match action {
                KeysAction::Init => cmd_keys_init(&km).await,
                KeysAction::Unlock => cmd_keys_unlock(&km).await,
                KeysAction::Status => cmd_keys_status(&km),
                KeysAction::Share => cmd_keys_share(&km),
                KeysAction::Reset { yes } => cmd_keys_reset(&km, yes),
            }
        }
        Commands::Contacts { action } => {
            let km = open_manager(&config, cli.user.as_deref())?;
            match action {
                ContactsAction::Add {
                    contact,
                    public_key,
                } => cmd_contacts_add(&km, &contact, &public_key),
                ContactsAction::Show { contact } => cmd_contacts_show(&km, &contact),
                ContactsAction::Fetch { contact } => {
                    cmd_contacts_fetch(&km, &config, &contact).await
                }
            }
        }
        Commands::Encrypt {
            recipient,
            message,
            kind,
        } => {
            let km = open_manager(&config, cli.user.as_deref())?;
            cmd_encrypt(&km, &config, &recipient, &message, &kind).await
        }
        Commands::Decrypt { input } => {
            let km = open_manager(&config, cli.user.as_deref())?;
            cmd_decrypt(&km, input.as_deref()).await
        }
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn open_manager(config: &MurmurConfig, user: Option<&str>) -> Result<KeyManager> {
    let user = user.context("no user given: pass --user or set MURMUR_USER")?;
    let params = KdfParams::new(config.crypto.kdf_iterations)?;
    let km = KeyManager::new(open_store(&config.storage)?, params);
    km.initialize(user)?;
    Ok(km)
}

fn prompt_password(prompt: &str) -> Result<SecretString> {
    if let Ok(password) = std::env::var("MURMUR_PASSWORD") {
        return Ok(SecretString::from(password));
    }
    let password = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(password))
}

async fn unlock(km: &KeyManager) -> Result<()> {
    let password = prompt_password("Password: ")?;
    km.set_encryption_key_from_password(&password)
        .await
        .context("unlocking keys")
}

// ── `murmur keys` ──────────────────────────────────────────────────────────────

async fn cmd_keys_init(km: &KeyManager) -> Result<()> {
    if km.has_keys() {
        anyhow::bail!("keys already exist for this user (run `murmur keys reset` first)");
    }
    let password = prompt_password("New password: ")?;
    if std::env::var("MURMUR_PASSWORD").is_err() {
        let confirm = rpassword::prompt_password("Confirm password: ")
            .context("reading password confirmation")?;
        if secrecy::ExposeSecret::expose_secret(&password) != confirm.as_str() {
            anyhow::bail!("passwords do not match");
        }
    }

    let pair = km
        .generate_and_persist_keys(&password)
        .await
        .context("generating keys")?;
    println!("public key: {}", pair.public_key_base64());
    Ok(())
}

async fn cmd_keys_unlock(km: &KeyManager) -> Result<()> {
    unlock(km).await?;
    println!("unlocked");
    km.clear();
    Ok(())
}

fn cmd_keys_status(km: &KeyManager) -> Result<()> {
    println!("user:       {}", km.user_id().unwrap_or_default());
    println!("state:      {}", km.state());
    if let Some(public_key) = km.get_public_key() {
        println!("public key: {public_key}");
    }
    if let Some(meta) = km.metadata() {
        println!("key id:     {}", meta.key_id);
        println!("device id:  {}", meta.device_id);
        println!("created:    {}", meta.created_at);
        println!("shared:     {}", meta.public_key_shared);
    }
    Ok(())
}

fn cmd_keys_share(km: &KeyManager) -> Result<()> {
    km.mark_public_key_shared()
        .context("updating key metadata")?;
    println!("public key marked as shared");
    Ok(())
}

fn cmd_keys_reset(km: &KeyManager, yes: bool) -> Result<()> {
    if km.state() == KeyState::NoKeys {
        println!("no keys to reset");
        return Ok(());
    }
    if !yes {
        eprint!(
            "This deletes your keys. Messages sent to you become unreadable. \
             Type 'reset' to continue: "
        );
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("reading confirmation")?;
        if answer.trim() != "reset" {
            anyhow::bail!("aborted");
        }
    }
    km.reset().context("resetting keys")?;
    println!("keys removed");
    Ok(())
}

// ── `murmur contacts` ──────────────────────────────────────────────────────────

fn cmd_contacts_add(km: &KeyManager, contact: &str, public_key: &str) -> Result<()> {
    km.store_public_key_for_user(contact, public_key)
        .with_context(|| format!("storing public key for {contact}"))?;
    println!("stored public key for {contact}");
    Ok(())
}

fn cmd_contacts_show(km: &KeyManager, contact: &str) -> Result<()> {
    match km.get_public_key_for_user(contact)? {
        Some(key) => println!("{key}"),
        None => anyhow::bail!("no cached public key for {contact}"),
    }
    Ok(())
}

fn directory(config: &MurmurConfig) -> Result<HttpKeyDirectory> {
    HttpKeyDirectory::from_config(&config.directory)?
        .context("no key directory configured: set [directory] base_url")
}

async fn cmd_contacts_fetch(km: &KeyManager, config: &MurmurConfig, contact: &str) -> Result<()> {
    let directory = directory(config)?;
    let key = km
        .resolve_public_key(contact, &directory)
        .await
        .with_context(|| format!("resolving public key for {contact}"))?;
    println!("{key}");
    Ok(())
}

// ── `murmur encrypt` / `murmur decrypt` ────────────────────────────────────────

async fn cmd_encrypt(
    km: &KeyManager,
    config: &MurmurConfig,
    recipient: &str,
    message: &str,
    kind: &str,
) -> Result<()> {
    if km.get_public_key_for_user(recipient)?.is_none() && config.directory.base_url.is_some() {
        km.resolve_public_key(recipient, &directory(config)?)
            .await
            .with_context(|| format!("resolving public key for {recipient}"))?;
    }

    unlock(km).await?;
    let sealed = km.encrypt_message_for(recipient, message, Some(MessageMetadata::new(kind)));
    km.clear();

    let sealed = match sealed {
        Err(KeyError::MissingRecipientKey(id)) => anyhow::bail!(
            "no public key for {id}: add one with `murmur contacts add` or configure a directory"
        ),
        other => other.context("encrypting message")?,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&sealed).context("serializing envelope")?
    );
    Ok(())
}

async fn cmd_decrypt(km: &KeyManager, input: Option<&Path>) -> Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading envelope from stdin")?;
            buf
        }
    };
    let message: EncryptedMessage =
        serde_json::from_str(&raw).context("parsing envelope JSON")?;

    unlock(km).await?;
    let opened = km.decrypt_incoming(&message);
    km.clear();

    match opened.context("decrypting message")? {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => anyhow::bail!(
            "message from {} could not be decrypted (not for this key, or tampered)",
            message.sender
        ),
    }
}

// ── `murmur config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &MurmurConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
