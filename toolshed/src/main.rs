use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dialoguer::console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect, Select};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use toolshed_lib::launch::target;
use toolshed_lib::{
    ensure_root, scripts, Catalog, ChainEnv, Config, Elevation, ExitCode, InstallReport,
    LaunchMode, LaunchPlan, LaunchTarget, OsTransfer, PackageInstaller, ReturnTarget, Session,
    Transfer,
};

#[derive(Parser)]
#[command(name = "toolshed")]
#[command(about = "An interactive, privilege-gated installer menu for Debian-family tool setups")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Hand control to this script when the menu session ends
    #[arg(long, global = true)]
    return_to: Option<PathBuf>,

    /// How to invoke the return target: exec or spawn
    #[arg(long, global = true)]
    return_mode: Option<String>,

    /// Replace the menu process on transitions instead of spawning
    #[arg(long, global = true)]
    exec_launch: bool,

    /// Override the scripts tree root
    #[arg(long, global = true)]
    scripts_dir: Option<PathBuf>,

    /// Override the category catalog file
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Override config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Kali installer menu
    Kali,

    /// Ubuntu installer menu
    Ubuntu,

    /// Pick tool categories from the catalog and batch-install them
    Tools,

    /// Install everyday desktop applications
    Apps,

    /// List the tools catalog without installing anything
    #[command(alias = "ls")]
    List {
        /// Output format
        #[arg(long, default_value = "human")]
        format: ListFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum ListFormat {
    Human,
    Json,
}

/// What a menu entry does when picked.
#[derive(Clone, Copy)]
enum MenuAction {
    /// Run a script from the tree as a child, then redisplay the menu.
    Script(&'static str),
    /// Launch another toolshed menu, per the session transition mode.
    Menu(&'static str),
    /// Leave the session, handing off to the return target if present.
    Exit,
}

struct Menu {
    title: &'static str,
    entries: &'static [(&'static str, MenuAction)],
}

const ROOT_MENU: Menu = Menu {
    title: "Choose your system",
    entries: &[
        ("Kali Linux", MenuAction::Menu("kali")),
        ("Ubuntu", MenuAction::Menu("ubuntu")),
        ("Exit", MenuAction::Exit),
    ],
};

const KALI_MENU: Menu = Menu {
    title: "Kali installer menu",
    entries: &[
        ("Full Gnome setup", MenuAction::Script("kali/kali_install.sh")),
        ("Full i3 setup", MenuAction::Script("kali/startup.py")),
        ("Top tools by category", MenuAction::Menu("tools")),
        ("Themes only", MenuAction::Script("kali/theme.sh")),
        ("Add Kali repository", MenuAction::Script("kali/repo.py")),
        ("Daily applications", MenuAction::Menu("apps")),
        ("Default tool set", MenuAction::Script("both/default.py")),
        ("Uninstall tools", MenuAction::Script("both/uninstaller.py")),
        ("Exit", MenuAction::Exit),
    ],
};

const UBUNTU_MENU: Menu = Menu {
    title: "Ubuntu installer menu",
    entries: &[
        ("Full Gnome setup", MenuAction::Script("ubuntu/ubuntu_install.sh")),
        ("Full i3 setup", MenuAction::Script("ubuntu/startup.py")),
        ("Top tools by category", MenuAction::Menu("tools")),
        ("Themes only", MenuAction::Script("ubuntu/theme.sh")),
        ("Extra repositories", MenuAction::Script("ubuntu/repo.py")),
        ("Daily applications", MenuAction::Menu("apps")),
        ("Default tool set", MenuAction::Script("both/default.py")),
        ("Uninstall tools", MenuAction::Script("both/uninstaller.py")),
        ("Exit", MenuAction::Exit),
    ],
};

const APP_SCRIPTS: &[(&str, &str)] = &[
    ("Brave browser", "tools/install_brave.sh"),
    ("Telegram desktop", "tools/install_telegram.sh"),
    ("Visual Studio Code", "tools/install_vscode.sh"),
    ("ProtonVPN", "tools/install_protonvpn.sh"),
    ("VirtualBox", "tools/install_virtualbox.sh"),
];

fn main() {
    match run() {
        Ok(exit_code) => process::exit(exit_code.into()),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(ExitCode::Failure.into());
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load_with_override(cli.config.clone())?;
    if let Some(dir) = &cli.scripts_dir {
        config.core.scripts_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(catalog) = &cli.catalog {
        config.core.catalog = catalog.to_string_lossy().into_owned();
    }

    let chain = ChainEnv::capture();
    let return_target =
        ReturnTarget::resolve(cli.return_to.as_deref(), cli.return_mode.as_deref(), &chain);
    let session =
        Session::new(config, cli.exec_launch, return_target).with_config_path(cli.config);

    // Read-only commands run without elevation.
    match &cli.command {
        Some(Commands::List { format }) => return handle_list(&session, *format),
        Some(Commands::Completions { shell }) => return handle_completions(*shell),
        _ => {}
    }

    // Everything below installs packages or launches installer scripts.
    match ensure_root()? {
        Elevation::AlreadyRoot => {}
        Elevation::Delegated(code) => process::exit(code),
    }

    let marked = scripts::mark_tree_executable(&session.scripts_root());
    if marked > 0 {
        println!(
            "{}",
            style(format!("Marked {marked} script(s) executable")).dim()
        );
    }

    let mut transfer = OsTransfer;
    let code = match cli.command {
        None => run_menu(&session, &mut transfer, &ROOT_MENU)?,
        Some(Commands::Kali) => run_menu(&session, &mut transfer, &KALI_MENU)?,
        Some(Commands::Ubuntu) => run_menu(&session, &mut transfer, &UBUNTU_MENU)?,
        Some(Commands::Tools) => handle_tools(&session, &mut transfer)?,
        Some(Commands::Apps) => handle_apps(&session, &mut transfer)?,
        // Handled before the privilege gate.
        Some(Commands::List { .. }) | Some(Commands::Completions { .. }) => ExitCode::Success,
    };
    Ok(code)
}

fn run_menu(session: &Session, transfer: &mut dyn Transfer, menu: &Menu) -> Result<ExitCode> {
    loop {
        let _ = Term::stdout().clear_screen();
        draw_header(menu.title);

        let labels: Vec<&str> = menu.entries.iter().map(|(label, _)| *label).collect();
        let Some(choice) = prompt_select("Pick an option", &labels) else {
            // Interrupt or end of input at the prompt counts as exiting.
            return finish_session(session, transfer);
        };

        match menu.entries[choice].1 {
            MenuAction::Script(rel) => {
                run_script(session, transfer, rel);
                pause();
            }
            MenuAction::Menu(name) => {
                if let Err(err) = transition(session, transfer, name) {
                    eprintln!("{} {err}", style("✗").red().bold());
                    pause();
                }
            }
            MenuAction::Exit => return finish_session(session, transfer),
        }
    }
}

/// Launch a script from the tree as a foreground child and wait for it.
/// Failures are reported and the menu carries on.
fn run_script(session: &Session, transfer: &mut dyn Transfer, rel: &str) {
    let path = session.script(rel);
    target::ensure_executable(&path);

    let mut plan = match LaunchTarget::new(&path).plan() {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("{} {err}", style("✗").red().bold());
            return;
        }
    };
    session.propagate_chain(&mut plan);

    println!("{} {}", style("Launching:").cyan().bold(), plan.command_line());
    match transfer.spawn(&plan) {
        Ok(status) if status.success() => {}
        Ok(status) => eprintln!("{} exited with {status}", style("Child").yellow().bold()),
        Err(err) => eprintln!("{} {err}", style("✗").red().bold()),
    }
}

/// Hand control to another menu subcommand by re-invoking this executable.
/// Exec mode replaces the process and only returns on failure; spawn mode
/// blocks until the child menu exits, then the caller redisplays.
fn transition(session: &Session, transfer: &mut dyn Transfer, subcommand: &str) -> Result<()> {
    let exe = env::current_exe().context("cannot locate the running executable")?;

    let mut args = vec![subcommand.to_string()];
    if session.transition_mode == LaunchMode::Exec {
        args.push("--exec-launch".to_string());
    }
    if let Some(config_path) = &session.config_path {
        args.push("--config".to_string());
        args.push(config_path.to_string_lossy().into_owned());
    }

    let mut plan = LaunchPlan::new(exe.to_string_lossy().into_owned(), args);
    // Children rebuild their own session from the environment.
    plan.env_var("TOOLSHED_SCRIPTS_DIR", session.config.core.scripts_dir.clone());
    plan.env_var("TOOLSHED_CATALOG", session.config.core.catalog.clone());
    session.propagate_chain(&mut plan);

    match session.transition_mode {
        LaunchMode::Exec => transfer.exec(&plan)?,
        LaunchMode::Spawn => {
            transfer.spawn(&plan)?;
        }
    }
    Ok(())
}

/// End the menu session: hand off to the return target when one was
/// resolved, then exit 0 either way. A successful exec hand-off never
/// comes back here.
fn finish_session(session: &Session, transfer: &mut dyn Transfer) -> Result<ExitCode> {
    println!("{}", style("Goodbye!").green().bold());
    if let Some(return_target) = &session.return_target {
        println!(
            "{} {} ({})",
            style("Returning to:").cyan().bold(),
            return_target.path.display(),
            return_target.mode.as_str()
        );
        if let Err(err) = return_target.hand_off(transfer) {
            eprintln!("{} return hand-off failed: {err}", style("✗").red().bold());
        }
    }
    Ok(ExitCode::Success)
}

/// Leave an installer menu. Under spawn transitions the launching menu is
/// still alive and ends the session itself; under exec transitions this
/// process is all that remains of the session, so leaving must run the
/// return-target hand-off.
fn finish_installer(session: &Session, transfer: &mut dyn Transfer) -> Result<ExitCode> {
    if session.transition_mode == LaunchMode::Exec {
        return finish_session(session, transfer);
    }
    Ok(ExitCode::Success)
}

fn handle_tools(session: &Session, transfer: &mut dyn Transfer) -> Result<ExitCode> {
    let catalog = match Catalog::load(&session.catalog_path()) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("{} {err}", style("✗").red().bold());
            pause();
            return finish_installer(session, transfer);
        }
    };
    if catalog.is_empty() {
        println!("No categories found in {}", session.catalog_path().display());
        return finish_installer(session, transfer);
    }

    let installer = PackageInstaller::from_config(&session.config.install);

    loop {
        println!();
        draw_header("Selective tool installer");

        let mut labels: Vec<String> = catalog
            .categories
            .iter()
            .map(|category| format!("{} ({} tools)", category.name, category.tools.len()))
            .collect();
        labels.push("Back".to_string());

        let Some(index) = prompt_select("Pick a category", &labels) else {
            return finish_installer(session, transfer);
        };
        let Some(category) = catalog.get(index) else {
            // Past the categories sits only the Back entry.
            return finish_installer(session, transfer);
        };

        let prompt = format!("Pick tools from {} (space to toggle)", category.name);
        let Some(picks) = prompt_multi_select(&prompt, &category.tools) else {
            continue;
        };
        if picks.is_empty() {
            println!("{}", style("Nothing selected.").yellow());
            continue;
        }

        let selected: Vec<String> = picks.iter().map(|&i| category.tools[i].clone()).collect();
        println!("Selected: {}", selected.join(", "));
        if prompt_confirm(&format!("Install {} package(s)?", selected.len())) != Some(true) {
            println!("{}", style("Cancelled.").yellow());
            continue;
        }

        let report = installer.install(&selected);
        print_report(&report);
        pause();
    }
}

fn handle_apps(session: &Session, transfer: &mut dyn Transfer) -> Result<ExitCode> {
    loop {
        let _ = Term::stdout().clear_screen();
        draw_header("Application installer");

        let mut labels: Vec<&str> = APP_SCRIPTS.iter().map(|(label, _)| *label).collect();
        labels.push("Install all");
        labels.push("Back");

        let Some(choice) = prompt_select("Pick an application", &labels) else {
            return finish_installer(session, transfer);
        };

        if let Some((_, script)) = APP_SCRIPTS.get(choice) {
            run_script(session, transfer, script);
            pause();
        } else if choice == APP_SCRIPTS.len() {
            for (label, script) in APP_SCRIPTS {
                println!("{} {label}", style("Installing").cyan().bold());
                run_script(session, transfer, script);
            }
            pause();
        } else {
            return finish_installer(session, transfer);
        }
    }
}

fn handle_list(session: &Session, format: ListFormat) -> Result<ExitCode> {
    let catalog = Catalog::load(&session.catalog_path())?;

    match format {
        ListFormat::Human => {
            if catalog.is_empty() {
                println!("No categories found");
            } else {
                for category in &catalog.categories {
                    println!("{} ({} tools)", category.name, category.tools.len());
                    for tool in &category.tools {
                        println!("  {tool}");
                    }
                }
            }
        }
        ListFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
    }

    Ok(ExitCode::Success)
}

fn handle_completions(shell: Shell) -> Result<ExitCode> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(ExitCode::Success)
}

fn print_report(report: &InstallReport) {
    println!();
    draw_header("Installation summary");
    println!(
        "  {} {}",
        style("Succeeded:").green().bold(),
        report.success_count()
    );
    println!("  {} {}", style("Failed:").red().bold(), report.fail_count());
    if !report.failed.is_empty() {
        println!("  {}", style("Failed packages:").red());
        for name in &report.failed {
            println!("    - {name}");
        }
    }
}

fn draw_header(title: &str) {
    let cols = Term::stdout().size().1 as usize;
    let width = if cols == 0 { 64 } else { cols.min(100) };
    let rule = "=".repeat(width);
    println!("{}", style(&rule).cyan());
    println!("{}", style(format!("{title:^width$}")).green().bold());
    println!("{}", style(rule).cyan());
}

/// Any prompt failure (interrupt, end of input, no terminal) reads as the
/// user leaving the menu.
fn prompt_select<T: ToString>(prompt: &str, items: &[T]) -> Option<usize> {
    match Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(0)
        .items(items)
        .interact_opt()
    {
        Ok(choice) => choice,
        Err(_) => None,
    }
}

fn prompt_multi_select<T: ToString>(prompt: &str, items: &[T]) -> Option<Vec<usize>> {
    match MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .interact_opt()
    {
        Ok(picks) => picks,
        Err(_) => None,
    }
}

fn prompt_confirm(prompt: &str) -> Option<bool> {
    match Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact_opt()
    {
        Ok(answer) => answer,
        Err(_) => None,
    }
}

fn pause() {
    print!("{}", style("Press Enter to continue...").dim());
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use toolshed_lib::RecordingTransfer;

    fn session_with_scripts(dir: &TempDir, exec_launch: bool) -> Session {
        let mut config = Config::default();
        config.core.scripts_dir = dir.path().to_string_lossy().into_owned();
        Session::new(config, exec_launch, None)
    }

    fn write_script(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        path
    }

    #[test]
    fn transitions_default_to_spawning_the_subcommand() {
        let dir = TempDir::new().unwrap();
        let session = session_with_scripts(&dir, false);
        let mut transfer = RecordingTransfer::new();

        transition(&session, &mut transfer, "kali").unwrap();

        assert_eq!(transfer.spawns.len(), 1);
        assert!(transfer.execs.is_empty());
        assert_eq!(transfer.spawns[0].args, vec!["kali".to_string()]);
    }

    #[test]
    fn exec_launch_transitions_replace_and_forward_the_flag() {
        let dir = TempDir::new().unwrap();
        let session = session_with_scripts(&dir, true);
        let mut transfer = RecordingTransfer::new();

        transition(&session, &mut transfer, "ubuntu").unwrap();

        assert_eq!(transfer.execs.len(), 1);
        assert!(transfer.spawns.is_empty());
        assert_eq!(
            transfer.execs[0].args,
            vec!["ubuntu".to_string(), "--exec-launch".to_string()]
        );
    }

    #[test]
    fn transitions_forward_the_resolved_chain() {
        let dir = TempDir::new().unwrap();
        let parent = write_script(&dir, "parent.sh");
        let mut config = Config::default();
        config.core.scripts_dir = dir.path().to_string_lossy().into_owned();
        let session = Session::new(
            config,
            false,
            Some(ReturnTarget {
                path: parent.clone(),
                mode: LaunchMode::Spawn,
            }),
        );
        let mut transfer = RecordingTransfer::new();

        transition(&session, &mut transfer, "kali").unwrap();

        let env = &transfer.spawns[0].env;
        assert!(env.contains(&(
            "PREV_SCRIPT".to_string(),
            parent.to_string_lossy().into_owned()
        )));
        assert!(env.contains(&("RETURN_MODE".to_string(), "spawn".to_string())));
    }

    #[test]
    fn scripts_launch_through_their_interpreter() {
        let dir = TempDir::new().unwrap();
        write_script(&dir, "theme.sh");
        let session = session_with_scripts(&dir, false);
        let mut transfer = RecordingTransfer::new();

        run_script(&session, &mut transfer, "theme.sh");

        assert_eq!(transfer.spawns.len(), 1);
        assert!(transfer.spawns[0].program.ends_with("bash"));
    }

    #[test]
    fn missing_scripts_are_reported_without_a_launch() {
        let dir = TempDir::new().unwrap();
        let session = session_with_scripts(&dir, false);
        let mut transfer = RecordingTransfer::new();

        run_script(&session, &mut transfer, "not-here.sh");

        assert!(transfer.spawns.is_empty());
        assert!(transfer.execs.is_empty());
    }

    #[test]
    fn session_exit_hands_off_to_the_return_target() {
        let dir = TempDir::new().unwrap();
        let parent = write_script(&dir, "parent.sh");
        let session = Session::new(
            Config::default(),
            false,
            Some(ReturnTarget {
                path: parent,
                mode: LaunchMode::Exec,
            }),
        );
        let mut transfer = RecordingTransfer::new();

        let code = finish_session(&session, &mut transfer).unwrap();

        assert_eq!(code, ExitCode::Success);
        assert_eq!(transfer.execs.len(), 1);
    }

    #[test]
    fn session_exit_without_a_target_just_terminates() {
        let session = Session::new(Config::default(), false, None);
        let mut transfer = RecordingTransfer::new();

        let code = finish_session(&session, &mut transfer).unwrap();

        assert_eq!(code, ExitCode::Success);
        assert!(transfer.execs.is_empty() && transfer.spawns.is_empty());
    }

    #[test]
    fn installer_exit_under_exec_transitions_fires_the_hand_off() {
        let dir = TempDir::new().unwrap();
        let parent = write_script(&dir, "parent.sh");
        let session = Session::new(
            Config::default(),
            true,
            Some(ReturnTarget {
                path: parent,
                mode: LaunchMode::Spawn,
            }),
        );
        let mut transfer = RecordingTransfer::new();

        let code = finish_installer(&session, &mut transfer).unwrap();

        assert_eq!(code, ExitCode::Success);
        assert_eq!(transfer.spawns.len(), 1);
    }

    #[test]
    fn installer_exit_under_spawn_transitions_defers_to_the_waiting_menu() {
        let dir = TempDir::new().unwrap();
        let parent = write_script(&dir, "parent.sh");
        let session = Session::new(
            Config::default(),
            false,
            Some(ReturnTarget {
                path: parent,
                mode: LaunchMode::Spawn,
            }),
        );
        let mut transfer = RecordingTransfer::new();

        let code = finish_installer(&session, &mut transfer).unwrap();

        assert_eq!(code, ExitCode::Success);
        assert!(transfer.execs.is_empty() && transfer.spawns.is_empty());
    }

    #[test]
    fn transitions_forward_an_explicit_config_override() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("custom.toml");
        fs::write(&config_path, "[install]\nprogram = \"apt\"\n").unwrap();
        let session =
            session_with_scripts(&dir, false).with_config_path(Some(config_path.clone()));
        let mut transfer = RecordingTransfer::new();

        transition(&session, &mut transfer, "tools").unwrap();

        assert_eq!(
            transfer.spawns[0].args,
            vec![
                "tools".to_string(),
                "--config".to_string(),
                config_path.to_string_lossy().into_owned(),
            ]
        );
    }
}
