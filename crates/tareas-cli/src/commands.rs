//! Command dispatch for the `tareas` binary.

use std::fmt;
use std::io::{self, Write};

use anyhow::{bail, Result};
use tracing::{debug, warn};

use tareas_core::models::{NewTask, Priority, SortOrder, TaskQuery, TaskUpdate};
use tareas_core::{ApiError, AuthService, Config, TaskController};

use crate::cli::{Command, ListArgs, PasswordCommand};
use crate::output;

/// Marks a failure whose message the controller already published
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error already reported")
    }
}

impl std::error::Error for Reported {}

fn reported(err: ApiError) -> anyhow::Error {
    debug!(error = %err, "Task command failed");
    anyhow::Error::new(Reported)
}

pub struct Context {
    pub config: Config,
    pub auth: AuthService,
    pub controller: TaskController,
}

impl Context {
    fn require_login(&self) -> Result<()> {
        if !self.auth.is_logged_in() {
            bail!("Not signed in. Run `tareas login` first.");
        }
        Ok(())
    }
}

pub async fn run(command: Command, ctx: &mut Context) -> Result<()> {
    match command {
        Command::Login { email } => login(ctx, email).await,
        Command::Register { username, email } => register(ctx, username, email).await,
        Command::Logout { all } => {
            if all {
                ctx.auth.logout_all().await?;
            } else {
                ctx.auth.logout().await?;
            }
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            match ctx.auth.restore().await? {
                Some(user) => println!("{}", output::user_summary(&user)),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Command::List(args) => {
            ctx.require_login()?;
            let query = list_query(&args)?;
            ctx.controller.fetch_tasks(&query).await.map_err(reported)?;
            println!(
                "{}",
                output::task_list(ctx.controller.tasks(), &ctx.controller.pagination())
            );
            Ok(())
        }
        Command::Show { id } => {
            ctx.require_login()?;
            let task = ctx.controller.get_task(id).await?;
            println!("{}", output::task_detail(&task));
            Ok(())
        }
        Command::Add {
            title,
            description,
            priority,
        } => {
            ctx.require_login()?;
            let task = NewTask {
                description,
                priority: parse_priority(priority)?,
                ..NewTask::new(title)
            };
            let created = ctx.controller.create_task(&task).await.map_err(reported)?;
            println!("Created task #{}: {}", created.id, created.title);
            Ok(())
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
        } => {
            ctx.require_login()?;
            let update = TaskUpdate {
                title,
                description,
                completed: None,
                priority: priority.map(parse_priority).transpose()?,
            };
            if update.is_empty() {
                bail!("Nothing to change. Pass --title, --description or --priority.");
            }
            let updated = ctx
                .controller
                .update_task(id, &update)
                .await
                .map_err(reported)?;
            println!("{}", output::task_detail(&updated));
            Ok(())
        }
        Command::Done { id } => toggle(ctx, id, true).await,
        Command::Undone { id } => toggle(ctx, id, false).await,
        Command::Rm { id } => {
            ctx.require_login()?;
            ctx.controller.delete_task(id).await.map_err(reported)?;
            println!("Deleted task #{}", id);
            Ok(())
        }
        Command::Password(command) => password(ctx, command).await,
    }
}

async fn login(ctx: &mut Context, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email", ctx.config.last_username.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    let user = ctx.auth.login(&email, &password).await?;

    ctx.config.last_username = Some(email);
    if let Err(e) = ctx.config.save() {
        warn!("Failed to save config: {:#}", e);
    }
    println!("Signed in as {}.", user.username);
    Ok(())
}

async fn register(ctx: &Context, username: Option<String>, email: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt("Username", None)?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt("Email", None)?,
    };
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match.");
    }

    let validation = ctx.auth.api().validate_password(&password).await?;
    if !validation.is_valid {
        bail!(validation
            .error_message
            .unwrap_or_else(|| "Password does not meet the requirements.".to_string()));
    }

    let user = ctx.auth.register(&username, &email, &password).await?;
    println!("Account created for {}. Run `tareas login` to sign in.", user.username);
    Ok(())
}

async fn toggle(ctx: &mut Context, id: i64, completed: bool) -> Result<()> {
    ctx.require_login()?;
    let task = ctx
        .controller
        .toggle_task(id, completed)
        .await
        .map_err(reported)?;
    println!("{} #{} {}", task.status_marker(), task.id, task.title);
    Ok(())
}

async fn password(ctx: &Context, command: PasswordCommand) -> Result<()> {
    let api = ctx.auth.api();
    match command {
        PasswordCommand::Requirements => {
            let requirements = api.password_requirements().await?;
            println!("{}", output::requirements(&requirements));
        }
        PasswordCommand::Check => {
            let password = rpassword::prompt_password("Password: ")?;
            let analysis = api.check_password_strength(&password).await?;
            println!("{}", output::strength(&analysis));
        }
        PasswordCommand::Validate => {
            let password = rpassword::prompt_password("Password: ")?;
            let validation = api.validate_password(&password).await?;
            if validation.is_valid {
                println!("Password meets the requirements.");
            } else {
                println!(
                    "{}",
                    validation
                        .error_message
                        .as_deref()
                        .unwrap_or("Password does not meet the requirements.")
                );
            }
        }
    }
    Ok(())
}

fn parse_priority(value: u8) -> Result<Priority> {
    Priority::try_from(value).map_err(anyhow::Error::msg)
}

fn list_query(args: &ListArgs) -> Result<TaskQuery> {
    let completed = if args.completed {
        Some(true)
    } else if args.pending {
        Some(false)
    } else {
        None
    };

    Ok(TaskQuery {
        completed,
        priority: args.priority.map(parse_priority).transpose()?,
        search: args.search.clone(),
        sort_by: args.sort.clone(),
        order: if args.asc { SortOrder::Asc } else { SortOrder::Desc },
        ..TaskQuery::default().page(args.page.max(1), args.size.max(1))
    })
}

/// Read one line from stdin, falling back to `default` when blank
fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    let mut stdout = io::stdout();
    match default {
        Some(value) => write!(stdout, "{} [{}]: ", label, value)?,
        None => write!(stdout, "{}: ", label)?,
    }
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim();
    if !value.is_empty() {
        return Ok(value.to_string());
    }
    match default {
        Some(value) => Ok(value.to_string()),
        None => bail!("{} is required.", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn list_args(argv: &[&str]) -> ListArgs {
        let mut full = vec!["tareas", "list"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::List(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_list_query() {
        let query = list_query(&list_args(&[])).unwrap();
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 10);
        assert_eq!(query.completed, None);
        assert_eq!(query.order, SortOrder::Desc);
    }

    #[test]
    fn test_list_query_from_flags() {
        let query = list_query(&list_args(&[
            "--pending", "-p", "2", "--page", "3", "--size", "5", "--sort", "prioridad", "--asc",
        ]))
        .unwrap();
        assert_eq!(query.skip, 10);
        assert_eq!(query.limit, 5);
        assert_eq!(query.completed, Some(false));
        assert_eq!(query.priority, Some(Priority::Medium));
        assert_eq!(query.sort_by, "prioridad");
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let query = list_query(&list_args(&["--page", "0"])).unwrap();
        assert_eq!(query.skip, 0);
    }

    #[test]
    fn test_out_of_range_page_does_not_overflow() {
        let query = list_query(&list_args(&["--page", "4294967295", "--size", "2"])).unwrap();
        assert_eq!(query.skip, u32::MAX);
        assert_eq!(query.limit, 2);
    }

    #[test]
    fn test_reported_is_detectable() {
        let err = reported(ApiError::RetryLimitExceeded { attempts: 4 });
        assert!(err.downcast_ref::<Reported>().is_some());
    }
}
