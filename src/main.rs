use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use questforge_app_lib::commands::quest::QuestListKind;
use questforge_app_lib::commands::user::CredentialsInput;
use questforge_app_lib::commands::{daily, description, quest, user, AppState, CommandError};
use questforge_app_lib::config::AppConfig;
use questforge_app_lib::models::quest::{QuestCreateInput, QuestUpdateInput};
use questforge_app_lib::utils::logger::init_logging;

#[derive(Parser)]
#[command(name = "questforge")]
#[command(about = "Turn everyday goals into quests: earn points, level up and keep your streak")]
#[command(version)]
struct Cli {
    /// Id of the acting user, as printed by `register` or `login`
    #[arg(short, long, global = true, env = "QUESTFORGE_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register { username: String, password: String },

    /// Check credentials and print the user
    Login { username: String, password: String },

    /// Add a custom quest
    AddQuest {
        name: String,
        /// Points credited on completion
        #[arg(long)]
        reward: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
        /// Easy, Medium or Hard
        #[arg(long)]
        difficulty: Option<String>,
        /// 1 (lowest) to 5 (highest)
        #[arg(long)]
        priority: Option<u8>,
        /// RFC3339 timestamp
        #[arg(long)]
        due: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Change fields of an existing quest
    EditQuest {
        quest_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        reward: Option<i64>,
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        priority: Option<u8>,
        #[arg(long)]
        due: Option<String>,
    },

    /// Delete a quest
    DeleteQuest { quest_id: String },

    /// Complete a quest and collect its reward
    Complete { quest_id: String },

    /// List quests
    Quests {
        #[arg(long, value_enum, default_value_t = QuestListKind::Active)]
        kind: QuestListKind,
    },

    /// Show today's daily quests, generating them if needed
    Daily,

    /// Show totals, weekly points, streak and achievements
    Dashboard,

    /// Show level progress and unlocked achievements
    Profile,

    /// Suggest a description for a quest title
    Suggest { title: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(&config.log_dir()) {
        eprintln!("failed to initialize logging: {err}");
    }

    let state = match AppState::initialize(&config) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("failed to start: {err}");
            return ExitCode::FAILURE;
        }
    };

    match dispatch(&state, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_json(&err);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(state: &AppState, cli: Cli) -> Result<(), CommandError> {
    let acting_user = cli.user;
    let require_user = || {
        acting_user.clone().ok_or_else(|| {
            CommandError::new("VALIDATION_ERROR", "--user is required for this command", None)
        })
    };

    match cli.command {
        Commands::Register { username, password } => {
            let record = user::users_register(state, CredentialsInput { username, password }).await?;
            print_json(&record);
        }
        Commands::Login { username, password } => {
            let record = user::users_login(state, CredentialsInput { username, password }).await?;
            print_json(&record);
        }
        Commands::AddQuest {
            name,
            reward,
            description,
            duration,
            difficulty,
            priority,
            due,
            tags,
        } => {
            let payload = QuestCreateInput {
                name,
                description,
                tags: Some(tags),
                duration_minutes: duration,
                difficulty,
                reward,
                priority,
                due_at: due,
                ..Default::default()
            };
            let record = quest::quests_create(state, require_user()?, payload).await?;
            print_json(&record);
        }
        Commands::EditQuest {
            quest_id,
            name,
            description,
            reward,
            duration,
            difficulty,
            priority,
            due,
        } => {
            let payload = QuestUpdateInput {
                name,
                description: description.map(Some),
                duration_minutes: duration,
                difficulty,
                reward,
                priority,
                due_at: due.map(Some),
                ..Default::default()
            };
            let record = quest::quests_update(state, require_user()?, quest_id, payload).await?;
            print_json(&record);
        }
        Commands::DeleteQuest { quest_id } => {
            quest::quests_delete(state, require_user()?, quest_id.clone()).await?;
            print_json(&serde_json::json!({ "deleted": quest_id }));
        }
        Commands::Complete { quest_id } => {
            let result = quest::quests_complete(state, require_user()?, quest_id).await?;
            if let Some(message) = result.outcome.as_ref().and_then(|o| o.level_up_message()) {
                eprintln!("{message}");
            }
            print_json(&result);
        }
        Commands::Quests { kind } => {
            let records = quest::quests_list(state, require_user()?, Some(kind)).await?;
            print_json(&records);
        }
        Commands::Daily => {
            let board = daily::daily_quests_fetch(state, require_user()?).await?;
            print_json(&board);
        }
        Commands::Dashboard => {
            let stats = user::users_dashboard(state, require_user()?).await?;
            print_json(&stats);
        }
        Commands::Profile => {
            let profile = user::users_profile(state, require_user()?).await?;
            print_json(&profile);
        }
        Commands::Suggest { title } => {
            let suggestion = description::descriptions_suggest(state, title).await?;
            print_json(&suggestion);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("failed to render output: {err}"),
    }
}
