use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use upwatch::handlers::{
    Context, ReportFormat, handle_add, handle_auth, handle_delete, handle_list, handle_logout, handle_whoami,
    print_prompt,
};
use upwatch_core::report::generate_targets_report;
use upwatch_core::{AuthAction, ViewRow, print_banner};

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    let subcommand = chosen_command.subcommand();
    let machine_output = matches!(
        subcommand,
        Some(("list", sub)) if sub.get_one::<String>("format").map(String::as_str) == Some("json")
    );

    // Show banner unless --quiet flag is set or stdout is meant for a program
    if !quiet && !machine_output && !matches!(subcommand, Some(("ui", _))) {
        print_banner();
    }

    let Some((name, sub_matches)) = subcommand else {
        // No subcommand provided, just show the banner
        return;
    };

    // The TUI owns the terminal, so it gets no log output
    if name != "ui" {
        init_tracing(verbose);
    }

    let ctx = match Context::open(
        chosen_command.get_one::<String>("api-url").map(String::as_str),
        chosen_command.get_one::<PathBuf>("session-file").map(PathBuf::as_path),
        quiet,
    ) {
        Ok(ctx) => ctx,
        Err(e) => fail(e),
    };

    let result = match name {
        "ui" => upwatch_tui::run(ctx.client.clone()).await,
        "login" => handle_login(&ctx, AuthAction::Login, sub_matches).await,
        "register" => handle_login(&ctx, AuthAction::Register, sub_matches).await,
        "logout" => handle_logout(&ctx).await.map(|()| success("Logged out")),
        "whoami" => handle_whoami(&ctx)
            .await
            .map(|user| println!("{} (id {})", user.email.bright_white().bold(), user.id)),
        "list" => handle_list_command(&ctx, sub_matches).await,
        "add" => handle_add_command(&ctx, sub_matches).await,
        "delete" => handle_delete_command(&ctx, sub_matches).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        if !quiet && let Some(step) = ctx.navigator.next_step() {
            eprintln!("{} next: {}", "→".bright_blue(), step.bright_white());
        }
        fail(e);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("{} {}", "✗".red().bold(), e);
    std::process::exit(1);
}

async fn handle_login(ctx: &Context, action: AuthAction, args: &ArgMatches) -> Result<()> {
    let email = args
        .get_one::<String>("email")
        .map(String::as_str)
        .unwrap_or_default();
    let password = match args.get_one::<String>("password") {
        Some(password) => password.clone(),
        None => print_prompt("Password:")?,
    };

    let user = handle_auth(ctx, action, email, &password).await?;
    let who = user.map(|user| user.email).unwrap_or_else(|| email.to_string());
    success(&format!("Signed in as {}", who));
    if !ctx.quiet
        && let Some(step) = ctx.navigator.next_step()
    {
        println!("{} next: {}", "→".bright_blue(), step.bright_white());
    }
    Ok(())
}

async fn handle_list_command(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let format = ReportFormat::parse(
        args.get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text"),
    )?;

    // Ctrl+C drops the pending load instead of printing half a dashboard
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = handle_list(ctx, format, &cancel).await?;
    print!("{}", report);
    Ok(())
}

async fn handle_add_command(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let url = args
        .get_one::<String>("URL")
        .map(String::as_str)
        .unwrap_or_default();
    let name = args.get_one::<String>("name").map(String::as_str);

    let rows = handle_add(ctx, url, name).await?;
    success(&format!("Now monitoring {}", url.trim()));
    print_reloaded(ctx, rows);
    Ok(())
}

async fn handle_delete_command(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let id = *args
        .get_one::<i64>("ID")
        .ok_or_else(|| anyhow::anyhow!("a target id is required"))?;

    let rows = handle_delete(ctx, id).await?;
    success(&format!("Deleted target {}", id));
    print_reloaded(ctx, rows);
    Ok(())
}

/// Show the list as it stands after a change; a failed reload just skips it.
fn print_reloaded(ctx: &Context, rows: Option<Vec<ViewRow>>) {
    if ctx.quiet {
        return;
    }
    match rows {
        Some(rows) => print!("{}", generate_targets_report(&rows)),
        None => eprintln!("{} could not reload the list; run `upwatch list`", "!".yellow()),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
