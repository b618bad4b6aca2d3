use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use game_settings::io::FsReader;
use game_settings::messages::MessageKind;
use game_settings::{
    logging, mod_organizer, schema, GameSettingsConfig, LauncherConfig, MessageLog, SettingsSession, CONFIG_FILE,
    SETTINGS_FILE,
};

#[derive(Parser)]
#[command(name = "game_settings")]
#[command(about = "读取、修改并写回游戏配置文件（INI / 逐行配置 / XML）")]
#[command(version)]
struct Cli {
    /// 启动器配置文件（默认：<游戏目录>/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 游戏设置 schema（默认：<游戏目录>/settings.json）
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// 启动器所在目录（默认：当前目录）
    #[arg(long, global = true)]
    game_dir: Option<PathBuf>,

    /// 静默模式(仅输出错误)
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 以 JSON 输出所有提取出的选项
    Options {
        /// 只输出该设置分组中的参数
        #[arg(long)]
        group: Option<String>,
    },
    /// 修改一个选项并写回文件
    Set {
        /// 文件名（settings.json 中的 name）
        file: String,
        /// 选项名，如 `Display/fGamma`
        option: String,
        value: String,
    },
    /// 列出 Mod Organizer profile
    Profiles,
    /// 切换 Mod Organizer profile
    SwitchProfile { name: String },
    /// 校验 settings.json
    Validate,
}

struct Paths {
    launcher_dir: PathBuf,
    config: PathBuf,
    settings: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("日志初始化失败: {}", e);
    }

    let paths = resolve_paths(&cli)?;
    let launcher = load_launcher_config(&paths.config)?;

    match &cli.command {
        Command::Validate => handle_validate(&cli, &paths.settings),
        Command::Profiles => handle_profiles(&cli, &launcher, &paths),
        command => {
            let log = Arc::new(MessageLog::new());
            let mut session = create_session(launcher, &paths, log.clone());
            let result = run_session_command(&cli, command, &mut session, &paths);
            print_messages(&cli, &log);
            result
        }
    }
}

fn resolve_paths(cli: &Cli) -> anyhow::Result<Paths> {
    let launcher_dir = match &cli.game_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("无法获取当前目录")?,
    };

    Ok(Paths {
        config: cli.config.clone().unwrap_or_else(|| launcher_dir.join(CONFIG_FILE)),
        settings: cli.settings.clone().unwrap_or_else(|| launcher_dir.join(SETTINGS_FILE)),
        launcher_dir,
    })
}

/// 读取 config.json；文件不存在时使用默认配置
fn load_launcher_config(path: &Path) -> anyhow::Result<LauncherConfig> {
    if !path.exists() {
        tracing::info!("{} not found, using default launcher config", path.display());
        return Ok(LauncherConfig::default());
    }
    LauncherConfig::load(path).with_context(|| format!("无法读取启动器配置: {}", path.display()))
}

fn create_session(launcher: LauncherConfig, paths: &Paths, log: Arc<MessageLog>) -> SettingsSession {
    let documents = dirs::document_dir();
    let variables = launcher.path_variables(&paths.launcher_dir, documents.as_deref());
    SettingsSession::with_fs(launcher, variables, log)
}

fn run_session_command(cli: &Cli, command: &Command, session: &mut SettingsSession, paths: &Paths) -> anyhow::Result<()> {
    session
        .load(&paths.settings)
        .with_context(|| format!("无法加载游戏设置: {}", paths.settings.display()))?;

    match command {
        Command::Options { group: None } => {
            println!("{}", serde_json::to_string_pretty(&session.options().to_nested())?);
            Ok(())
        }
        Command::Options { group: Some(group) } => {
            let parameters = session.parameters_for_group(Some(group.as_str()));
            let options = session.options();
            let mut output = serde_json::Map::new();
            for parameter in parameters {
                for item in &parameter.items {
                    let name = item.option_name();
                    if let Some(option) = options.get(&parameter.file, &name) {
                        let file = output
                            .entry(parameter.file.clone())
                            .or_insert_with(|| serde_json::Value::Object(Default::default()));
                        if let serde_json::Value::Object(file) = file {
                            file.insert(name, serde_json::to_value(option)?);
                        }
                    }
                }
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Command::Set { file, option, value } => {
            session.set_option(file, option, value)?;
            let report = session.save()?;
            if !report.is_success() {
                bail!("{} 个文件写入失败", report.failures.len());
            }
            if !cli.quiet {
                println!("已写入: {}", report.written.join(", "));
            }
            Ok(())
        }
        Command::SwitchProfile { name } => {
            session.switch_profile(name)?;
            if !cli.quiet {
                println!("当前 profile: {}", session.profile());
            }
            Ok(())
        }
        Command::Validate | Command::Profiles => bail!("该命令不需要加载游戏设置"),
    }
}

fn handle_validate(cli: &Cli, settings: &Path) -> anyhow::Result<()> {
    let config = GameSettingsConfig::load(settings)
        .with_context(|| format!("无法读取游戏设置: {}", settings.display()))?;
    let validated = schema::validate(&config);

    if validated.is_clean() {
        tracing::info!("Settings schema is valid");
    }
    for error in &validated.errors {
        println!("{}", error);
    }
    if !cli.quiet {
        println!(
            "{} 个文件, {} 个参数有效; {} 个问题",
            validated.config.game_settings_files.len(),
            validated.config.game_settings_options.len(),
            validated.errors.len()
        );
    }
    Ok(())
}

fn handle_profiles(cli: &Cli, launcher: &LauncherConfig, paths: &Paths) -> anyhow::Result<()> {
    let mo = &launcher.mod_organizer;
    if !mo.is_used {
        bail!("config.json 中未启用 Mod Organizer");
    }

    let variables = launcher.path_variables(&paths.launcher_dir, dirs::document_dir().as_deref());
    let profiles = mod_organizer::list_profiles(&variables, &FsReader)?;
    let current = mod_organizer::read_current_profile(mo, &variables, &FsReader).ok();

    for profile in profiles {
        let marker = if current.as_deref() == Some(profile.as_str()) { "*" } else { " " };
        if cli.quiet {
            println!("{}", profile);
        } else {
            println!("{} {}", marker, profile);
        }
    }
    Ok(())
}

fn print_messages(cli: &Cli, log: &MessageLog) {
    for message in log.take() {
        match message.kind {
            MessageKind::Error | MessageKind::Warning => eprintln!("{}", message),
            _ if !cli.quiet => println!("{}", message),
            _ => {}
        }
    }
}
