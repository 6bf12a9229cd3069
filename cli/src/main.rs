mod client;
mod retry;

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result, anyhow, bail};
use log::debug;

use client::NodeClient;
use retry::{RetryPolicy, with_retry};
use scribe_config::ScribeConfig;
use scribe_paper::{
    DEFAULT_MIN_REVIEWS, MAX_SCORE, MIN_SCORE, PaperId, PaperMetadata, Principal, average_score,
    format_review_count, has_sufficient_reviews,
};

/// Parsed command line: positionals plus `--flag value` pairs
struct Args {
    positional: Vec<String>,
    flags: HashMap<String, String>,
}

impl Args {
    fn parse(args: &[String]) -> Self {
        let mut positional = Vec::new();
        let mut flags = HashMap::new();

        let mut i = 0;
        while i < args.len() {
            if let Some(name) = args[i].strip_prefix("--") {
                match args.get(i + 1) {
                    Some(value) if !value.starts_with("--") => {
                        flags.insert(name.to_string(), value.clone());
                        i += 1;
                    }
                    _ => {
                        flags.insert(name.to_string(), String::new());
                    }
                }
            } else {
                positional.push(args[i].clone());
            }
            i += 1;
        }

        Self { positional, flags }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    fn has(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    fn require(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => bail!("missing --{}", name),
        }
    }

    /// Paper selected by `--id <hex>` or `--slug <slug>`
    fn paper_id(&self) -> Result<PaperId> {
        if let Some(id) = self.get("id") {
            return PaperId::from_hex(id).map_err(|e| anyhow!("invalid --id: {}", e));
        }
        if let Some(slug) = self.get("slug").filter(|s| !s.is_empty()) {
            return Ok(PaperId::from_slug(slug));
        }
        bail!("select a paper with --slug <slug> or --id <hex>")
    }

    /// Caller identity from `--from <label|hex>`
    fn principal(&self) -> Result<Principal> {
        Ok(Principal::resolve(self.require("from")?))
    }

    fn metadata(&self) -> Result<PaperMetadata> {
        Ok(PaperMetadata::new(
            self.require("title")?,
            self.require("track")?,
            self.get("author").unwrap_or_default(),
        ))
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = args[1].as_str();
    if matches!(cmd, "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let parsed = Args::parse(&args[2..]);
    if let Err(e) = run(cmd, &parsed).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cmd: &str, args: &Args) -> Result<()> {
    let config = ScribeConfig::global();

    // Commands that never touch the node
    match cmd {
        "paper-id" => return paper_id(args),
        "config" => return show_config(config, args),
        _ => {}
    }

    let endpoint = args.get("endpoint").unwrap_or(&config.api.endpoint);
    let client = NodeClient::new(endpoint, config.relayer.request_timeout_secs)?;
    let policy = RetryPolicy::from_config(&config.relayer);
    debug!("Using node at {}", client.endpoint());

    match cmd {
        "health" => health(&client).await,
        "list-papers" => list_papers(&client, args).await,
        "list-ids" => list_ids(&client).await,
        "show-paper" => show_paper(&client, args).await,
        "register-paper" => register_paper(&client, args, false).await,
        "update-paper" => register_paper(&client, args, true).await,
        "submit-score" => submit_score(&client, &policy, args).await,
        "final-score" => final_score(&client, &policy, args).await,
        "share-total" => share_total(&client, &policy, args).await,
        "has-submitted" => has_submitted(&client, args).await,
        "owner" => owner(&client).await,
        "transfer-owner" => transfer_owner(&client, args).await,
        "renounce-owner" => renounce_owner(&client, args).await,
        other => {
            println!("❌ Unknown command: {}", other);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Cipher Scribe CLI - Encrypted Peer Review");
    println!();
    println!("USAGE:");
    println!("  scribe <command> [options]");
    println!();
    println!("PAPER COMMANDS:");
    println!("  paper-id <slug>            Derive a paper ID from a slug");
    println!("  list-papers [--sort <s>]   List papers (registered/newest/oldest/");
    println!("                             most-reviewed/least-reviewed)");
    println!("  list-ids                   Paper IDs in registration order");
    println!("  show-paper                 Show one paper");
    println!("  register-paper             Register a paper (owner only)");
    println!("  update-paper               Update a paper's metadata (owner only)");
    println!();
    println!("REVIEW COMMANDS:");
    println!("  submit-score --score <n>   Encrypt and submit a score ({}-{})", MIN_SCORE, MAX_SCORE);
    println!("  has-submitted              Check whether --from has submitted");
    println!("  final-score                Decrypt the total and print the average");
    println!("  share-total                Decrypt the raw encrypted total");
    println!();
    println!("OWNER COMMANDS:");
    println!("  owner                      Show the current owner");
    println!("  transfer-owner --to <p>    Hand ownership to another principal");
    println!("  renounce-owner --yes       Give up ownership for good");
    println!();
    println!("OTHER COMMANDS:");
    println!("  health                     Node health");
    println!("  config [--sample]          Show effective config or print a sample");
    println!("  help                       Show this help message");
    println!();
    println!("OPTIONS:");
    println!("  --slug <slug>              Select paper by slug");
    println!("  --id <hex>                 Select paper by ID");
    println!("  --from <label|hex>         Acting principal");
    println!("  --title <t> --track <t>    Paper metadata");
    println!("  --author <hash>            Optional author hash");
    println!("  --endpoint <url>           Node URL (overrides config)");
    println!();
    println!("EXAMPLES:");
    println!("  scribe register-paper --slug zk-rollups --title \"ZK Rollups\" --track Systems --from deployer");
    println!("  scribe submit-score --slug zk-rollups --score 8 --from alice");
    println!("  scribe final-score --slug zk-rollups --from carol");
    println!("  scribe list-papers --sort most-reviewed");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  SCRIBE_CONFIG        Config file path");
    println!("  SCRIBE_ENDPOINT      Node URL");
    println!("  SCRIBE_MAX_RETRIES   Attempts for relayer round-trips");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}

fn format_time(millis: u64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn paper_id(args: &Args) -> Result<()> {
    let slug = args
        .positional
        .first()
        .map(String::as_str)
        .or_else(|| args.get("slug"))
        .context("usage: paper-id <slug>")?;
    println!("{}", PaperId::from_slug(slug));
    Ok(())
}

fn show_config(config: &ScribeConfig, args: &Args) -> Result<()> {
    if args.has("sample") {
        println!("{}", ScribeConfig::generate_sample());
        return Ok(());
    }
    if let Some(path) = ScribeConfig::default_config_path() {
        println!("# default path: {}", path.display());
    }
    println!("{}", config.to_toml()?);
    Ok(())
}

async fn health(client: &NodeClient) -> Result<()> {
    let health = client.health().await?;
    let mark = if health.healthy { "✅" } else { "⚠️" };
    println!("{} Node at {}", mark, client.endpoint());
    println!("   Version     : {}", health.version);
    println!("   Protocol    : {}", health.protocol_id);
    println!("   Uptime      : {}s", health.uptime_secs);
    println!("   Papers      : {}", health.paper_count);
    Ok(())
}

async fn list_papers(client: &NodeClient, args: &Args) -> Result<()> {
    let papers = client.list_papers(args.get("sort")).await?;
    if papers.is_empty() {
        println!("No papers registered");
        return Ok(());
    }

    println!("📚 {} paper(s)", papers.len());
    for view in papers {
        let p = &view.paper;
        println!();
        println!("  {} [{}]", p.title, p.track);
        println!("    ID      : {}", p.id);
        println!("    Reviews : {} ({})", format_review_count(p.review_count), view.review_status);
        println!("    Updated : {}", format_time(p.updated_at));
    }
    Ok(())
}

async fn list_ids(client: &NodeClient) -> Result<()> {
    let ids = client.paper_ids().await?;
    println!("📚 {} paper(s)", ids.len());
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

async fn show_paper(client: &NodeClient, args: &Args) -> Result<()> {
    let view = client.get_paper(&args.paper_id()?).await?;
    let p = &view.paper;
    println!("📄 {}", p.title);
    println!("   ID          : {}", p.id);
    println!("   Track       : {}", p.track);
    if !p.author_hash.is_empty() {
        println!("   Author hash : {}", p.author_hash);
    }
    println!("   Reviews     : {}", format_review_count(p.review_count));
    println!("   Status      : {}", view.review_status);
    println!("   Created     : {}", format_time(p.created_at));
    println!("   Updated     : {}", format_time(p.updated_at));
    Ok(())
}

async fn register_paper(client: &NodeClient, args: &Args, update: bool) -> Result<()> {
    let id = args.paper_id()?;
    let caller = args.principal()?;
    let metadata = args.metadata()?;

    let view = if update {
        client.update_paper(&caller, &id, &metadata).await?
    } else {
        client.register_paper(&caller, &id, &metadata).await?
    };

    let verb = if update { "Updated" } else { "Registered" };
    println!("✅ {} \"{}\"", verb, view.paper.title);
    println!("   ID: {}", view.paper.id);
    Ok(())
}

async fn submit_score(client: &NodeClient, policy: &RetryPolicy, args: &Args) -> Result<()> {
    let id = args.paper_id()?;
    let reviewer = args.principal()?;
    let score: u32 = args
        .require("score")?
        .parse()
        .context("--score must be a non-negative integer")?;
    if score > MAX_SCORE {
        println!("⚠️  Score {} is above {}; the ledger will clamp it", score, MAX_SCORE);
    }

    println!("🔐 Encrypting score...");
    let encrypted = with_retry(policy, "encrypt", || client.encrypt(score, &reviewer)).await?;

    let receipt = client.submit_score(&reviewer, &id, &encrypted).await?;
    println!("✅ Score submitted");
    println!("   Paper    : {}", receipt.paper_id);
    println!("   Reviewer : {}", receipt.reviewer.short());
    println!("   Reviews  : {}", format_review_count(receipt.review_count));
    println!("   At       : {}", format_time(receipt.timestamp));
    println!("   Receipt  : {}", receipt.receipt);
    Ok(())
}

async fn final_score(client: &NodeClient, policy: &RetryPolicy, args: &Args) -> Result<()> {
    let id = args.paper_id()?;
    let requester = args.principal()?;

    let disclosure = with_retry(policy, "prepare final score", || {
        client.final_score(&requester, &id)
    })
    .await?;
    let sum = with_retry(policy, "decrypt", || {
        client.decrypt(&disclosure.authorization, &requester)
    })
    .await?;

    let count = disclosure.review_count;
    println!("📊 Final score for {}", disclosure.paper_id);
    println!("   Total   : {}", sum);
    println!("   Reviews : {}", format_review_count(count));
    println!("   Average : {:.2}", average_score(sum as u64, count));
    if !has_sufficient_reviews(count, DEFAULT_MIN_REVIEWS) {
        println!("   ⚠️  Fewer than {} reviews", DEFAULT_MIN_REVIEWS);
    }
    Ok(())
}

async fn share_total(client: &NodeClient, policy: &RetryPolicy, args: &Args) -> Result<()> {
    let id = args.paper_id()?;
    let requester = args.principal()?;

    let disclosure = with_retry(policy, "share total", || client.share_total(&requester, &id)).await?;
    println!("🔓 Total handle for {}: {}", disclosure.paper_id, disclosure.handle);
    println!("   Purpose : {}", disclosure.purpose);

    let total = with_retry(policy, "decrypt", || {
        client.decrypt(&disclosure.authorization, &requester)
    })
    .await?;
    println!("   Total   : {}", total);
    println!("   Reviews : {}", format_review_count(disclosure.review_count));
    Ok(())
}

async fn has_submitted(client: &NodeClient, args: &Args) -> Result<()> {
    let id = args.paper_id()?;
    let reviewer = args.principal()?;
    if client.has_submitted(&reviewer, &id).await? {
        println!("✅ {} has reviewed {}", reviewer.short(), id);
    } else {
        println!("❌ {} has not reviewed {}", reviewer.short(), id);
    }
    Ok(())
}

async fn owner(client: &NodeClient) -> Result<()> {
    match client.owner().await? {
        Some(owner) => println!("👤 Owner: {}", owner),
        None => println!("👤 Ownership renounced"),
    }
    Ok(())
}

async fn transfer_owner(client: &NodeClient, args: &Args) -> Result<()> {
    let caller = args.principal()?;
    let new_owner = Principal::resolve(args.require("to")?);
    client.transfer_owner(&caller, &new_owner).await?;
    println!("✅ Ownership transferred to {}", new_owner);
    Ok(())
}

/// Caller for a renounce, which must be confirmed with `--yes`
fn renounce_caller(args: &Args) -> Result<Principal> {
    let caller = args.principal()?;
    if !args.has("yes") {
        bail!("renouncing ownership cannot be undone; pass --yes to confirm");
    }
    Ok(caller)
}

async fn renounce_owner(client: &NodeClient, args: &Args) -> Result<()> {
    let caller = renounce_caller(args)?;
    client.renounce_owner(&caller).await?;
    println!("✅ Ownership renounced by {}", caller);
    println!("   Papers can no longer be registered or updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Args {
        let owned: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        Args::parse(&owned)
    }

    #[test]
    fn test_parse_flags_and_positionals() {
        let parsed = args(&["zk", "--from", "alice", "--sample"]);
        assert_eq!(parsed.positional, vec!["zk".to_string()]);
        assert_eq!(parsed.get("from"), Some("alice"));
        assert!(parsed.has("sample"));
        assert!(parsed.require("sample").is_err());
    }

    #[test]
    fn test_paper_selection() {
        let by_slug = args(&["--slug", "zk-rollups"]);
        assert_eq!(by_slug.paper_id().unwrap(), PaperId::from_slug("zk-rollups"));

        let id = PaperId::from_slug("x");
        let by_id = args(&["--id", &id.to_hex()]);
        assert_eq!(by_id.paper_id().unwrap(), id);

        assert!(args(&[]).paper_id().is_err());
    }

    #[test]
    fn test_principal_from_label() {
        let parsed = args(&["--from", "alice"]);
        assert_eq!(parsed.principal().unwrap(), Principal::from_label("alice"));
    }

    #[test]
    fn test_renounce_requires_caller_and_confirmation() {
        assert!(renounce_caller(&args(&["--yes"])).is_err());
        assert!(renounce_caller(&args(&["--from", "deployer"])).is_err());

        let caller = renounce_caller(&args(&["--from", "deployer", "--yes"])).unwrap();
        assert_eq!(caller, Principal::from_label("deployer"));
    }
}
