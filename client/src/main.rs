//! Proof Vault command-line client
//!
//! Builds proof artifacts locally and drives the vault server:
//! upload, fetch, verify, registry status and revocation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};

use proof_vault::proof::{checksum, recover_signer, ContentHash, ProofArtifact};
use proof_vault::services::vault::VerificationVerdict;

mod api;

use api::VaultClient;

#[derive(Parser)]
#[command(name = "vault")]
#[command(about = "Seal, store and verify identity proofs")]
struct Cli {
    /// Proof vault server URL
    #[arg(long, env = "VAULT_SERVER", default_value = "http://localhost:3001")]
    server: String,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    /// Log requests
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wrap a raw SDK result into a proof artifact (offline)
    Build {
        /// Proof type: age, nationality, eu-resident, kyc, facematch
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Issuer recorded in the artifact
        #[arg(short, long)]
        issuer: String,

        /// File with the raw SDK result JSON
        #[arg(short, long)]
        raw: PathBuf,

        /// Mark the SDK verification as failed
        #[arg(long)]
        unverified: bool,

        /// Write the artifact here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Upload an artifact (or a raw SDK result with --type and --issuer)
    Upload {
        file: PathBuf,

        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(short, long)]
        issuer: Option<String>,
    },

    /// Fetch a stored proof and re-check it locally
    Fetch { hash: String },

    /// Full verdict: storage, signature and registry
    Verify { hash: String },

    /// On-chain registry record
    Status { hash: String },

    /// Revoke a registered proof
    Revoke { hash: String },

    /// Custodial signer wallet
    Wallet,

    /// Server health
    Health,
}

fn read_json(path: &Path) -> Result<Value> {
    let bytes = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Accept either a ready artifact or a raw SDK result plus its type and issuer.
fn load_artifact(path: &Path, kind: Option<&str>, issuer: Option<&str>) -> Result<ProofArtifact> {
    let value = read_json(path)?;

    if value.get("type").is_some() && value.get("rawProof").is_some() {
        let artifact: ProofArtifact =
            serde_json::from_value(value).context("Malformed proof artifact")?;
        artifact.validate()?;
        return Ok(artifact);
    }

    let kind = kind.context("Raw SDK result needs --type")?;
    let issuer = issuer.context("Raw SDK result needs --issuer")?;
    Ok(ProofArtifact::build(value, true, kind, issuer)?)
}

fn parse_hash(raw: &str) -> Result<ContentHash> {
    Ok(raw.parse::<ContentHash>()?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_verdict(verdict: &VerificationVerdict) {
    println!("Verdict for {}", verdict.proof_hash);
    println!("  Storage:    {:?} ({})", verdict.trust.storage, verdict.storage.source);
    if let Some(summary) = &verdict.summary {
        let outcome = match verdict.satisfied {
            Some(false) => " (not satisfied)",
            _ => "",
        };
        println!("  Claim:      {}{}", summary, outcome);
    }
    println!(
        "  Signature:  {:?}{}",
        verdict.signature.status,
        verdict
            .signature
            .signer
            .as_deref()
            .map(|s| format!(" by {}", s))
            .unwrap_or_default()
    );
    if let Some(error) = &verdict.signature.error {
        println!("              {}", error);
    }
    println!("  Registry:   {:?}", verdict.trust.chain);
    if let Some(error) = &verdict.registry.error {
        println!("              {:?}: {}", error.kind, error.message);
    }
    if verdict.signature.valid && !verdict.trust.custodian {
        println!("              signed by a key other than the vault's");
    }
    println!(
        "  Trusted:    {}",
        if verdict.trust.is_trusted() { "YES" } else { "NO" }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose { "vault=debug,reqwest=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = VaultClient::new(&cli.server);

    match cli.command {
        Commands::Build {
            kind,
            issuer,
            raw,
            unverified,
            out,
        } => {
            let artifact = ProofArtifact::build(read_json(&raw)?, !unverified, &kind, &issuer)?;
            let hash = ContentHash::of(&artifact)?;
            let text = serde_json::to_string_pretty(&artifact)?;

            match out {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    eprintln!("Wrote {} artifact to {} (hash {})", kind, path.display(), hash);
                }
                None => println!("{}", text),
            }
        }

        Commands::Upload { file, kind, issuer } => {
            let artifact = load_artifact(&file, kind.as_deref(), issuer.as_deref())?;
            let (resp, raw) = client.upload(&artifact).await?;
            if cli.json {
                return print_json(&raw);
            }

            println!("Proof sealed and stored");
            println!("  Proof Hash:   {}", resp.proof_hash);
            println!("  Signed By:    {}", resp.wallet_address);
            println!("  Storage:      {}", resp.source);
            if let Some(tx) = &resp.tx_hash {
                println!("  Storage TX:   {}", tx);
            }
            match (&resp.registry_tx, &resp.registry_error) {
                (Some(tx), _) => println!("  Registry TX:  {}", tx),
                (None, Some(err)) => println!("  Registry:     not registered ({:?}: {})", err.kind, err.message),
                (None, None) => println!("  Registry:     not registered"),
            }
        }

        Commands::Fetch { hash } => {
            let hash = parse_hash(&hash)?;
            let (resp, raw) = client.fetch(&hash).await?;
            if cli.json {
                return print_json(&raw);
            }

            // Re-derive locally rather than trusting the server's flags
            let local_hash = ContentHash::of(&resp.proof_data)?;
            println!("Proof {}", hash);
            println!("  Type:         {}", resp.proof_data.kind);
            println!("  Issuer:       {}", resp.proof_data.issuer);
            if let Some(summary) = &resp.summary {
                println!("  Claim:        {}", summary);
            }
            println!("  Source:       {}", resp.source);
            println!(
                "  Content Hash: {}",
                if local_hash == hash { "matches" } else { "MISMATCH" }
            );

            match &resp.hotel_attestation {
                Some(att) => {
                    let recovered = recover_signer(&local_hash, &att.signature)
                        .map(|a| checksum(&a))
                        .ok();
                    // The hashed attestation must name the same key that signed
                    let named = resp
                        .proof_data
                        .attestation
                        .as_ref()
                        .map(|a| a.verifier_address.eq_ignore_ascii_case(&att.signer_address))
                        .unwrap_or(true);
                    let valid = named && recovered.as_deref() == Some(att.signer_address.as_str());
                    println!(
                        "  Attestation:  {} by {}{}",
                        if valid { "valid" } else { "INVALID" },
                        att.signer_address,
                        if att.custodian { " (vault key)" } else { " (FOREIGN key)" }
                    );
                }
                None => match &resp.signature_failure {
                    Some(failure) => println!("  Attestation:  INVALID ({})", failure),
                    None => println!("  Attestation:  none (unsigned proof)"),
                },
            }
        }

        Commands::Verify { hash } => {
            let hash = parse_hash(&hash)?;
            let (resp, raw) = client.verify(&hash).await?;
            if cli.json {
                return print_json(&raw);
            }
            print_verdict(&resp.verdict);
        }

        Commands::Status { hash } => {
            let hash = parse_hash(&hash)?;
            let (resp, raw) = client.status(&hash).await?;
            if cli.json {
                return print_json(&raw);
            }

            let record = &resp.on_chain;
            println!("Registry record for {}", resp.proof_hash);
            println!("  Contract:      {}", resp.contract_address.as_deref().unwrap_or("in-memory"));
            println!("  Exists:        {}", record.exists);
            println!("  Valid:         {}", record.valid);
            if record.exists {
                println!("  Registered At: {}", record.registered_at);
                println!("  Registered By: {}", record.registered_by);
            }
            if record.is_revoked() {
                println!("  Revoked At:    {}", record.revoked_at);
            }
        }

        Commands::Revoke { hash } => {
            let hash = parse_hash(&hash)?;
            let (resp, raw) = client.revoke(&hash).await?;
            if cli.json {
                return print_json(&raw);
            }
            println!("Revoked {}", resp.proof_hash);
            println!("  TX Hash: {}", resp.tx_hash);
        }

        Commands::Wallet => {
            let (resp, raw) = client.wallet().await?;
            if cli.json {
                return print_json(&raw);
            }
            println!("Signer Wallet:");
            println!("  Address:  {}", resp.address);
            println!("  Balance:  {}", resp.balance);
            println!("  Network:  {} (chain {})", resp.network, resp.chain_id);
        }

        Commands::Health => {
            let (resp, raw) = client.health().await?;
            if cli.json {
                return print_json(&raw);
            }
            println!("Server {} (v{})", resp.status, resp.version);
            println!("  Storage:  {}", resp.storage);
            println!(
                "  Registry: {}",
                resp.registry_contract.as_deref().unwrap_or("none")
            );
        }
    }

    Ok(())
}
