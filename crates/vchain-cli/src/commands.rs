use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use colored::Colorize;
use serde_json::json;
use vchain_codec::{address_to_anchor_payload, compute_content_address, encode_block};
use vchain_engine::{BlockBuilder, ChainAssembler, EngineConfig};
use vchain_intake::IntakeReport;
use vchain_ledger::SigningCredential;
use vchain_types::{AccountId, ContentAddress};

use crate::cli::*;
use crate::sandbox::Sandbox;

/// Configuration and backends shared by the chain commands.
struct Context {
    config: EngineConfig,
    sandbox: Sandbox,
    format: OutputFormat,
}

impl Context {
    fn load(
        config: Option<&Path>,
        sandbox: &Path,
        account: Option<&str>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let mut config = match config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(account) = account {
            config.account = Some(AccountId::new(account)?);
        }
        Ok(Self {
            config,
            sandbox: Sandbox::open(sandbox)?,
            format,
        })
    }

    fn assembler(&self) -> anyhow::Result<ChainAssembler> {
        Ok(ChainAssembler::new(
            self.sandbox.ledger.clone(),
            self.sandbox.store.clone(),
            self.config.clone(),
        )?)
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        config,
        sandbox,
        account,
        format,
        ..
    } = cli;
    let context = || Context::load(config.as_deref(), &sandbox, account.as_deref(), format);

    match command {
        Command::Address(args) => cmd_address(args),
        Command::Memo(args) => cmd_memo(args),
        Command::Keygen => cmd_keygen(format),
        Command::Anchors => cmd_anchors(&context()?).await,
        Command::Assemble => cmd_assemble(&context()?).await,
        Command::Verify => cmd_verify(&context()?).await,
        Command::Build(args) => cmd_build(context()?, args).await,
        Command::Enqueue(args) => cmd_enqueue(&context()?, args),
    }
}

fn cmd_address(args: AddressArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    println!("{}", compute_content_address(&bytes));
    Ok(())
}

fn cmd_memo(args: MemoArgs) -> anyhow::Result<()> {
    let address = ContentAddress::parse(args.address)?;
    println!("{}", address_to_anchor_payload(&address)?.to_hex());
    Ok(())
}

fn cmd_keygen(format: OutputFormat) -> anyhow::Result<()> {
    let credential = SigningCredential::generate();
    let secret = hex::encode(credential.secret_bytes());
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "account": credential.account_id(), "secret": secret })
        ),
        OutputFormat::Text => {
            println!("account: {}", credential.account_id().to_string().bold());
            println!("secret:  {secret}");
        }
    }
    Ok(())
}

async fn cmd_anchors(ctx: &Context) -> anyhow::Result<()> {
    let account = ctx.config.account()?;
    let anchors = ctx.assembler()?.list_anchors(account).await?;

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&anchors)?);
        return Ok(());
    }
    if anchors.is_empty() {
        println!("No anchors for {}.", account.to_string().bold());
    }
    for anchor in &anchors {
        let observed = anchor
            .observed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {}  {}",
            anchor.content_address.to_string().yellow(),
            anchor.anchor_id.as_str().dimmed(),
            observed
        );
    }
    Ok(())
}

async fn cmd_assemble(ctx: &Context) -> anyhow::Result<()> {
    let chain = ctx.assembler()?.assemble(ctx.config.account()?).await?;
    for failure in &chain.failures {
        eprintln!("{} {}", "unresolved:".yellow(), failure.error);
    }
    println!("{}", serde_json::to_string_pretty(&chain.blocks)?);
    Ok(())
}

async fn cmd_verify(ctx: &Context) -> anyhow::Result<()> {
    let account = ctx.config.account()?;
    let chain = match ctx.assembler()?.assemble(account).await {
        Ok(chain) => chain,
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            return Err(e.into());
        }
    };
    let head = chain.head_address().map(ToString::to_string);

    if ctx.format == OutputFormat::Json {
        let failures: Vec<String> = chain.failures.iter().map(|f| f.error.to_string()).collect();
        println!(
            "{}",
            json!({
                "account": account,
                "blocks": chain.len(),
                "head": head,
                "foreign_blocks": chain.foreign_blocks,
                "failures": failures,
                "complete": chain.is_complete(),
                "truncated": chain.truncated,
            })
        );
    } else {
        let mark = if chain.is_complete() {
            "✓".green().bold()
        } else {
            "!".yellow().bold()
        };
        println!("{} Chain of {}", mark, account.to_string().bold());
        println!("  Blocks: {}", chain.len());
        println!("  Head: {}", head.as_deref().unwrap_or("(empty)").yellow());
        println!("  Foreign-version blocks: {}", chain.foreign_blocks);
        println!("  Continuity: {}", "valid".green());
        if chain.truncated {
            println!("  {} scan stopped at max_pages, showing the recent tail", "note:".yellow());
        }
        for failure in &chain.failures {
            println!("  {} {}", "unresolved:".yellow(), failure.error);
        }
        for gap in &chain.gaps {
            println!("  {} after block {} until {}", "gap:".yellow(), gap.after, gap.next);
        }
    }

    if !chain.is_complete() {
        bail!("{} anchors could not be resolved", chain.failures.len());
    }
    Ok(())
}

async fn cmd_build(mut ctx: Context, args: BuildArgs) -> anyhow::Result<()> {
    let credential = SigningCredential::from_hex(&args.secret)?;
    let account = match &ctx.config.account {
        Some(account) => account.clone(),
        None => {
            let account = credential.account_id();
            ctx.config.account = Some(account.clone());
            account
        }
    };
    // Sandbox accounts exist from their first build.
    ctx.sandbox.ledger.fund(&account);

    let sandbox = &ctx.sandbox;
    let builder = BlockBuilder::new(
        sandbox.ledger.clone(),
        sandbox.store.clone(),
        sandbox.queue.clone(),
        ctx.config.clone(),
    )?;

    if args.dry_run {
        let prepared = builder.prepare().await?;
        if let Some(dir) = &args.out_dir {
            let path = write_block(dir, prepared.sequence(), &prepared.address, &prepared.bytes)?;
            println!("  Wrote {}", path.display());
        }
        println!(
            "{} Block {} {} (dry run, not published)",
            "✓".green().bold(),
            prepared.sequence(),
            prepared.address.to_string().yellow()
        );
        print_report(&prepared.report);
        return Ok(());
    }

    let committed = builder.build_and_commit_with_report(&credential).await?;
    sandbox.queue.mark_applied(&committed.queue_ids())?;
    sandbox.save()?;

    let vb = &committed.virtual_block;
    if let Some(dir) = &args.out_dir {
        let bytes = encode_block(&vb.data)?;
        let path = write_block(dir, vb.sequence(), vb.address(), &bytes)?;
        println!("  Wrote {}", path.display());
    }
    println!(
        "{} Block {} {}",
        "✓".green().bold(),
        vb.sequence(),
        vb.address().to_string().yellow()
    );
    println!("  Anchor: {}", vb.metadata.anchor_id.as_str().dimmed());
    print_report(&committed.report);
    Ok(())
}

fn cmd_enqueue(ctx: &Context, args: EnqueueArgs) -> anyhow::Result<()> {
    let data: serde_json::Value =
        serde_json::from_str(&args.data).context("--data is not valid JSON")?;
    let id = ctx.sandbox.queue.enqueue(args.op_code, args.creator, data);
    ctx.sandbox.save()?;
    println!("{} Queued {}", "✓".green(), id.to_string().yellow());
    Ok(())
}

fn print_report(report: &IntakeReport) {
    println!("  Operations: {}", report.accepted.len());
    for exclusion in &report.excluded {
        println!(
            "  {} {} {} ({})",
            "left queued:".yellow(),
            exclusion.op_code,
            exclusion.queue_id,
            exclusion.reason
        );
    }
    for dropped in &report.dropped {
        println!(
            "  {} {} {}",
            "unknown op code:".dimmed(),
            dropped.op_code,
            dropped.queue_id
        );
    }
}

fn write_block(
    dir: &Path,
    sequence: u64,
    address: &ContentAddress,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("block-{sequence}-{address}.json"));
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
