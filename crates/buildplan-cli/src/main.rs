mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use buildplan_rbac::{BuildplanConfig, ModuleId, Selection};

#[derive(Parser)]
#[command(name = "buildplan")]
#[command(about = "Role and permission administration for buildplan")]
#[command(version)]
struct Cli {
    /// Path to the buildplan config directory (default: ~/.buildplan)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// User id to act as (or set BUILDPLAN_ACTOR env var)
    #[arg(long, global = true, env = "BUILDPLAN_ACTOR")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create config and database, seed the system roles
    Init {
        /// Also create an administrator user with this name
        #[arg(long)]
        admin: Option<String>,
    },

    /// Manage roles
    #[command(subcommand)]
    Role(RoleCommand),

    /// Manage users and their role assignments
    #[command(subcommand)]
    User(UserCommand),

    /// List permission modules and their actions
    Modules {
        #[arg(long)]
        json: bool,
    },

    /// Show the roles × modules × actions matrix
    Matrix {
        /// Role id, or "all"
        #[arg(long, default_value = "all")]
        role: Selection<String>,
        /// Module id, or "all"
        #[arg(long, default_value = "all")]
        module: Selection<ModuleId>,
        #[arg(long)]
        json: bool,
    },

    /// Check whether a role grants a module action
    Check {
        role: String,
        module: String,
        action: String,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum RoleCommand {
    /// List all roles
    List,

    /// Show one role
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Create a custom role
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Grant as <module>:<action>, repeatable
        #[arg(long = "grant", conflicts_with = "permissions")]
        grants: Vec<String>,
        /// Full permission map as JSON, e.g. '{"projects":{"view":true}}'
        #[arg(long)]
        permissions: Option<String>,
    },

    /// Update a custom role; any permission option replaces the whole map
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "grant", conflicts_with = "permissions")]
        grants: Vec<String>,
        #[arg(long)]
        permissions: Option<String>,
        /// Refuse the update unless the stored version matches
        #[arg(long)]
        expect_version: Option<u64>,
    },

    /// Delete a custom role
    Delete { id: String },
}

#[derive(Subcommand)]
enum UserCommand {
    /// List users and their roles
    List,

    /// Add a user holding a role
    Add { name: String, role: String },

    /// Move a user to another role
    Assign { user: String, role: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("buildplan=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => BuildplanConfig::default_base_dir()?,
    };
    let actor = &cli.actor;

    match cli.command {
        Commands::Init { ref admin } => commands::init::run(&base_dir, admin.as_deref()),
        Commands::Role(ref cmd) => match cmd {
            RoleCommand::List => commands::roles::list(&base_dir, actor),
            RoleCommand::Show { id, json } => commands::roles::show(&base_dir, actor, id, *json),
            RoleCommand::Create {
                name,
                description,
                grants,
                permissions,
            } => commands::roles::create(
                &base_dir,
                actor,
                name,
                description.clone(),
                grants,
                permissions.as_deref(),
            ),
            RoleCommand::Update {
                id,
                name,
                description,
                grants,
                permissions,
                expect_version,
            } => commands::roles::update(
                &base_dir,
                actor,
                id,
                name.clone(),
                description.clone(),
                grants,
                permissions.as_deref(),
                *expect_version,
            ),
            RoleCommand::Delete { id } => commands::roles::delete(&base_dir, actor, id),
        },
        Commands::User(ref cmd) => match cmd {
            UserCommand::List => commands::users::list(&base_dir, actor),
            UserCommand::Add { name, role } => commands::users::add(&base_dir, actor, name, role),
            UserCommand::Assign { user, role } => {
                commands::users::assign(&base_dir, actor, user, role)
            }
        },
        Commands::Modules { json } => commands::modules::run(json),
        Commands::Matrix {
            ref role,
            ref module,
            json,
        } => commands::matrix::run(&base_dir, actor, role, module, json),
        Commands::Check {
            ref role,
            ref module,
            ref action,
        } => commands::check::run(&base_dir, actor, role, module, action),
        Commands::Config => commands::config::run(&base_dir),
    }
}
