use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "tareas", version, about = "Manage your to-do list from the terminal")]
pub struct Cli {
    /// API base URL (overrides config and TAREAS_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where access and refresh tokens are kept
    #[arg(long, value_enum, global = true, default_value_t = StorageKind::Keyring)]
    pub storage: StorageKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// OS keychain
    Keyring,
    /// JSON file in the data directory
    File,
    /// Process memory only; the session ends with the command
    Memory,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session tokens
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// End the current session
    Logout {
        /// Revoke every session of this account
        #[arg(long)]
        all: bool,
    },
    /// Show the signed-in user
    Whoami,
    /// List tasks
    List(ListArgs),
    /// Show one task
    Show { id: i64 },
    /// Create a task
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        /// 1 = low, 2 = medium, 3 = high
        #[arg(long, short, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
        priority: u8,
    },
    /// Change a task's title, description or priority
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, value_parser = clap::value_parser!(u8).range(1..=3))]
        priority: Option<u8>,
    },
    /// Mark a task as completed
    Done { id: i64 },
    /// Mark a task as pending
    Undone { id: i64 },
    /// Delete a task
    Rm { id: i64 },
    /// Password policy helpers
    #[command(subcommand)]
    Password(PasswordCommand),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only completed tasks
    #[arg(long, conflicts_with = "pending")]
    pub completed: bool,
    /// Only pending tasks
    #[arg(long)]
    pub pending: bool,
    #[arg(long, short, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub priority: Option<u8>,
    /// Search in title and description
    #[arg(long, short)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 10)]
    pub size: u32,
    /// Field to sort by
    #[arg(long, default_value = "created_at")]
    pub sort: String,
    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,
}

#[derive(Debug, Subcommand)]
pub enum PasswordCommand {
    /// Show the password policy
    Requirements,
    /// Score a password's strength
    Check,
    /// Check a password against the policy
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_filters() {
        let cli = Cli::try_parse_from([
            "tareas", "list", "--pending", "-p", "3", "--search", "informe", "--page", "2", "--asc",
        ])
        .unwrap();
        match cli.command {
            Command::List(args) => {
                assert!(args.pending);
                assert!(!args.completed);
                assert_eq!(args.priority, Some(3));
                assert_eq!(args.page, 2);
                assert!(args.asc);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_priority_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["tareas", "add", "Comprar pan", "-p", "4"]).is_err());
    }

    #[test]
    fn test_completed_and_pending_conflict() {
        assert!(Cli::try_parse_from(["tareas", "list", "--completed", "--pending"]).is_err());
    }

    #[test]
    fn test_global_storage_flag() {
        let cli = Cli::try_parse_from(["tareas", "whoami", "--storage", "file"]).unwrap();
        assert_eq!(cli.storage, StorageKind::File);
    }
}
