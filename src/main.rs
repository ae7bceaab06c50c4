//! Nexus Hub - persona-driven dashboard engine
//!
//! Main entry point for the `nexus-hub` binary. Every invocation opens one
//! view of the stored profile, applies the requested change or renders the
//! derived state, and exits. `watch` keeps its view open until Ctrl-C.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use nexus_hub::assistant::{self, GradingRequest, GroundedText, ResearchDomain};
use nexus_hub::cli::{
    AssistSubcommand, Cli, Commands, ConfigSubcommand, LabelSubcommand, OutputArgs,
    ProfileSubcommand, SourceSubcommand,
};
use nexus_hub::config::{self, HubConfig};
use nexus_hub::dashboard::SectionId;
use nexus_hub::error::{Error, ErrorCode, Result};
use nexus_hub::logging;
use nexus_hub::navigation::{catalog, section_surfaces, NavEntry, Navigation};
use nexus_hub::persona::{LabelGroup, ModuleFlag, ProfileStore, Role, ThemeMode, UserProfile};
use nexus_hub::sync::{ChangeBus, ProfileView};
use nexus_hub::version;
use nexus_hub::visibility::{explain, SurfaceId};

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    match run(cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    }
}

/// Run one command and return the process exit code.
fn run(cli: Cli) -> Result<i32> {
    // Commands that don't need the profile use minimal logging
    match &cli.command {
        Commands::Version { short } => {
            if *short {
                version::print_short_version();
            } else {
                version::print_version();
            }
            return Ok(0);
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand.clone(), cli.config.as_deref())?;
            return Ok(0);
        }
        _ => {}
    }

    let config = HubConfig::load(cli.config.as_deref())?;

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(
        version = %build.full_version(),
        data_dir = %config.storage.data_dir,
        "Starting Nexus Hub"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("nexus-hub")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Commands, config: HubConfig) -> Result<i32> {
    let store = ProfileStore::open_dir(config.data_dir());
    let bus = ChangeBus::new(config.sync.bus_capacity);
    let view = ProfileView::open(store, bus);

    match command {
        Commands::Profile { subcommand } => match subcommand {
            ProfileSubcommand::Show { output } => {
                let profile = view.profile();
                if output.json {
                    print_json(&profile)?;
                } else {
                    print_profile(&profile);
                }
            }
            ProfileSubcommand::Reset => {
                view.reset()?;
                println!("Profile reset.");
            }
        },

        Commands::Visibility { output, explain } => match explain {
            Some(surface) => explain_surface(&view, &surface, output)?,
            None => print_visibility(&view, output)?,
        },

        Commands::Nav { output, all } => {
            let snapshot = view.snapshot();
            if all {
                let entries = catalog(&snapshot.profile, &snapshot.visibility);
                if output.json {
                    print_json(&entries)?;
                } else {
                    print_entries(&entries);
                }
            } else if output.json {
                print_json(&snapshot.navigation)?;
            } else {
                print_navigation(&snapshot.navigation);
            }
        }

        Commands::Toggle { flag, on, off } => {
            let flag: ModuleFlag = flag.parse()?;
            let value = if on || off {
                view.set_flag(flag, on)?;
                on
            } else {
                view.toggle_flag(flag)?
            };
            println!("{}: {}", flag, on_off(value));
        }

        Commands::Major { subcommand } => handle_labels(&view, LabelGroup::Majors, subcommand)?,
        Commands::Career { subcommand } => handle_labels(&view, LabelGroup::Careers, subcommand)?,

        Commands::Subject { text } => {
            view.set_subject(&text)?;
            println!("TA subject: {}", view.profile().subject_or_default());
        }

        Commands::Role { role } => {
            let role: Role = role.parse()?;
            view.set_role(role)?;
            println!("Role: {}", role);
        }

        Commands::Theme { name } => {
            let theme: ThemeMode = name.parse()?;
            view.set_theme(theme)?;
            println!("Theme: {}", theme.slug());
        }

        Commands::Source { subcommand } => handle_sources(&view, subcommand)?,

        Commands::Reorder { section, index } => {
            let section: SectionId = section.parse()?;
            let order = view.move_section(section, index)?;
            println!("Dashboard order: {}", join_sections(&order));
        }

        Commands::Watch { interval_ms } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.poll_interval());
            watch(view, interval).await?;
        }

        Commands::Assist { subcommand } => return assist(&view, &config, subcommand).await,

        Commands::Version { .. } | Commands::Config { .. } => {
            // Already handled before the runtime started
            unreachable!();
        }
    }

    Ok(0)
}

// ─────────────────────────────────────────────────────────────────
// Profile edits
// ─────────────────────────────────────────────────────────────────

fn handle_labels(view: &ProfileView, group: LabelGroup, subcommand: LabelSubcommand) -> Result<()> {
    match subcommand {
        LabelSubcommand::Add { label } => {
            if !view.add_label(group, &label)? {
                println!("{} \"{}\" already selected.", capitalize(group.noun()), label.trim());
            }
        }
        LabelSubcommand::Remove { label } => {
            if !view.remove_label(group, &label)? {
                println!("{} \"{}\" was not selected.", capitalize(group.noun()), label.trim());
            }
        }
        LabelSubcommand::Toggle { label } => {
            let selected = view.toggle_label(group, &label)?;
            let state = if selected { "selected" } else { "deselected" };
            println!("{} \"{}\" {}.", capitalize(group.noun()), label.trim(), state);
        }
        LabelSubcommand::List => {
            let profile = view.profile();
            let selected = profile.labels(group);
            for option in group.options() {
                let mark = if selected.contains(option) { "x" } else { " " };
                println!("[{}] {}", mark, option);
            }
            // Free-text labels outside the built-in options
            for label in selected.iter().filter(|l| !group.options().contains(l)) {
                println!("[x] {}", label);
            }
            return Ok(());
        }
    }

    let profile = view.profile();
    println!("{}s: {}", capitalize(group.noun()), join_labels(profile.labels(group).iter()));
    Ok(())
}

fn handle_sources(view: &ProfileView, subcommand: SourceSubcommand) -> Result<()> {
    match subcommand {
        SourceSubcommand::Add { title, content, file } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(file)) => {
                    let path = PathBuf::from(&file);
                    fs::read_to_string(&path).map_err(|e| Error::IoRead { path, source: e })?
                }
                (None, None) => return Err(Error::invalid_input("content", "pass --content or --file")),
            };
            let id = view.add_source(&title, &content)?;
            println!("Added source {}: {}", id, title.trim());
        }
        SourceSubcommand::Remove { id } => {
            view.remove_source(id)?;
            println!("Removed source {}.", id);
        }
        SourceSubcommand::List => {
            let profile = view.profile();
            if profile.knowledge_sources.is_empty() {
                println!("No knowledge sources.");
            }
            for source in &profile.knowledge_sources {
                println!("{:>4}  {}  ({} chars)", source.id, source.title, source.content.chars().count());
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Watch
// ─────────────────────────────────────────────────────────────────

async fn watch(view: Arc<ProfileView>, interval: Duration) -> Result<()> {
    print_navigation(&view.navigation());
    println!();

    let subscription = view.on_profile_changed(|snapshot| {
        println!("── profile changed ({}) ──", &snapshot.fingerprint[..12]);
        print_navigation(&snapshot.navigation);
        println!();
    });

    let handle = view.spawn_sync(interval);
    info!(interval_ms = interval.as_millis() as u64, "Watching profile; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Internal(format!("Failed to listen for Ctrl-C: {}", e)))?;

    info!("Shutdown signal received");
    handle.shutdown().await;
    view.unsubscribe(subscription);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Assistant
// ─────────────────────────────────────────────────────────────────

async fn assist(view: &ProfileView, config: &HubConfig, subcommand: AssistSubcommand) -> Result<i32> {
    let assistant = assistant::create_assistant(&config.assistant)?;
    let profile = view.profile();
    let deadline = config.assistant_deadline();
    debug!(assistant = assistant.name(), ?deadline, "Assistant ready");

    let outcome = match subcommand {
        AssistSubcommand::Research { domain, query } => {
            let domain: ResearchDomain = domain.parse()?;
            assistant::guarded("research", deadline, assistant.research(domain, &query))
                .await
                .map(|text| print_grounded(&text))
        }
        AssistSubcommand::Chat { query } => {
            let sources = &profile.knowledge_sources;
            assistant::guarded("notebook_chat", deadline, assistant.notebook_chat(&query, sources))
                .await
                .map(|text| print_grounded(&text))
        }
        AssistSubcommand::Grade {
            submission,
            rubric,
            subject,
            assignment_type,
        } => {
            let request = GradingRequest {
                subject: subject.unwrap_or_else(|| profile.subject_or_default().to_string()),
                assignment_type,
                rubric,
                submission,
            };
            match assistant::guarded("grade", deadline, assistant.grade(&request)).await {
                Ok(result) => Ok(print_json(&result)?),
                Err(notice) => Err(notice),
            }
        }
        AssistSubcommand::Summarize { text, subject } => {
            match assistant::guarded("summarize", deadline, assistant.summarize(&text, &subject)).await {
                Ok(notes) => Ok(print_json(&notes)?),
                Err(notice) => Err(notice),
            }
        }
        AssistSubcommand::Transaction { description } => {
            match assistant::guarded("analyze_transaction", deadline, assistant.analyze_transaction(&description)).await {
                Ok(analysis) => Ok(print_json(&analysis)?),
                Err(notice) => Err(notice),
            }
        }
        AssistSubcommand::Engineering { problem } => {
            match assistant::guarded("solve_engineering", deadline, assistant.solve_engineering(&problem)).await {
                Ok(solution) => Ok(print_json(&solution)?),
                Err(notice) => Err(notice),
            }
        }
        AssistSubcommand::Draft { topic, field, kind } => {
            let field = field
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| default_field(&profile));
            match assistant::guarded("draft_document", deadline, assistant.draft_document(&topic, &field, &kind)).await {
                Ok(draft) => Ok(print_json(&draft)?),
                Err(notice) => Err(notice),
            }
        }
        AssistSubcommand::Email { goal, context } => {
            match assistant::guarded("generate_email", deadline, assistant.generate_email(&goal, &context)).await {
                Ok(drafts) => Ok(print_json(&drafts)?),
                Err(notice) => Err(notice),
            }
        }
        AssistSubcommand::ReadImage { path } => {
            let path = PathBuf::from(path);
            let image = fs::read(&path).map_err(|e| Error::IoRead { path, source: e })?;
            assistant::guarded("read_image", deadline, assistant.read_image(&image))
                .await
                .map(|text| println!("{}", text))
        }
    };

    match outcome {
        Ok(()) => Ok(0),
        Err(notice) => {
            eprintln!("\x1b[33mNotice\x1b[0m: {}", notice);
            Ok(ErrorCode::AssistantRequest.exit_code())
        }
    }
}

fn default_field(profile: &UserProfile) -> String {
    if profile.field.trim().is_empty() {
        "General".to_string()
    } else {
        profile.field.clone()
    }
}

fn print_grounded(text: &GroundedText) {
    println!("{}", text.text);
    if !text.citations.is_empty() {
        println!();
        println!("Sources:");
        for citation in &text.citations {
            match &citation.uri {
                Some(uri) => println!("  - {} <{}>", citation.title, uri),
                None => println!("  - {}", citation.title),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("Failed to encode output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("Name:        {}", profile.name);
    if !profile.email.is_empty() {
        println!("Email:       {}", profile.email);
    }
    println!("Role:        {}", profile.role);
    println!("Theme:       {}", profile.theme.slug());
    println!("Field:       {}", profile.field);
    println!("TA subject:  {}", profile.subject_or_default());
    println!("Majors:      {}", join_labels(profile.selected_majors.iter()));
    println!("Careers:     {}", join_labels(profile.selected_careers.iter()));
    println!("Sources:     {}", profile.knowledge_sources.len());

    let enabled: Vec<String> = profile
        .module_visibility
        .enabled()
        .iter()
        .map(|f| f.key().to_string())
        .collect();
    println!("Flags on:    {}", if enabled.is_empty() { "(none)".to_string() } else { enabled.join(", ") });

    let order = nexus_hub::dashboard::effective_order(profile);
    println!("Dashboard:   {}", join_sections(&order));
    if let Some(at) = profile.updated_at {
        println!("Updated:     {}", at.to_rfc3339());
    }
}

fn print_visibility(view: &ProfileView, output: OutputArgs) -> Result<()> {
    let snapshot = view.snapshot();
    if output.json {
        return print_json(&snapshot.visibility);
    }

    for section in &snapshot.order {
        let hub = snapshot.visibility.section_enabled(*section);
        println!("{} ({})", section.title(), on_off(hub));
        for surface in section_surfaces(*section) {
            let mark = if snapshot.visibility.is_visible(*surface) { "x" } else { " " };
            println!(
                "  [{}] {:<22} {}",
                mark,
                surface.key(),
                explain(&snapshot.profile, *surface)
            );
        }
    }

    let aides = &snapshot.visibility.aides;
    println!();
    println!(
        "Aides: dyslexia font {}, color filters {}, screen reader {}",
        on_off(aides.dyslexia_font),
        on_off(aides.color_filters),
        on_off(aides.screen_reader)
    );

    println!();
    println!("Flags:");
    for flag in ModuleFlag::all() {
        println!("  {:<16} {}", flag.key(), on_off(snapshot.profile.module_visibility.get(*flag)));
    }
    Ok(())
}

fn explain_surface(view: &ProfileView, surface: &str, output: OutputArgs) -> Result<()> {
    let surface: SurfaceId = surface.parse()?;
    let snapshot = view.snapshot();
    let visible = snapshot.visibility.is_visible(surface);
    let reason = explain(&snapshot.profile, surface);

    if output.json {
        #[derive(Serialize)]
        struct Explanation<'a> {
            surface: SurfaceId,
            visible: bool,
            reason: &'a str,
        }
        return print_json(&Explanation {
            surface,
            visible,
            reason: &reason,
        });
    }

    let state = if visible { "visible" } else { "hidden" };
    println!("{}: {} ({})", surface, state, reason);
    Ok(())
}

fn print_navigation(navigation: &Navigation) {
    println!("Navigation:");
    for entry in &navigation.entries {
        println!("  {:<28} {}", entry.label, entry.route);
    }
    for section in &navigation.sections {
        let cards: Vec<&str> = section.cards.iter().map(|c| c.label.as_str()).collect();
        println!("{}: {}", section.title, cards.join(", "));
    }
}

fn print_entries(entries: &[NavEntry]) {
    for entry in entries {
        let mark = if entry.enabled { "x" } else { " " };
        let section = entry.section.map(|s| s.key()).unwrap_or("-");
        println!("[{}] {:<16} {:<28} {:<14} {}", mark, entry.id, entry.label, section, entry.route);
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    let labels: Vec<&str> = labels.collect();
    if labels.is_empty() {
        "(none)".to_string()
    } else {
        labels.join(", ")
    }
}

fn join_sections(order: &[SectionId]) -> String {
    order.iter().map(|s| s.key()).collect::<Vec<_>>().join(", ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = HubConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate => {
            HubConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
