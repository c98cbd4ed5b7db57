mod render;
mod transport;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use todo_core::types::DEFAULT_PRIORITY;
use todo_core::{
    Command, Filter, NewTodo, PasswordChange, ProfileUpdate, RegisterForm, Session, Synchronizer,
    TodoClient, TodoPatch,
};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use crate::transport::UreqTransport;

#[derive(Parser, Debug)]
#[command(name = "todo", author, version, about = "Personal todo list client")]
struct Cli {
    /// Base URL of the todo API
    #[arg(long, env = "TODO_API_URL", default_value = "http://localhost:8000", global = true)]
    api_url: String,

    /// Bearer token printed by `todo login`
    #[arg(long, env = "TODO_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Give up on a request after this many seconds
    #[arg(long, env = "TODO_TIMEOUT_SECS", default_value_t = 10, global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "")]
        full_name: String,
        #[arg(long, default_value = "")]
        phone_number: String,
    },
    /// Sign in and print the token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show or edit the signed-in user's profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileCmd>,
    },
    /// Change the account password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Show todos
    List {
        #[arg(short, long, default_value_t = Filter::All)]
        filter: Filter,
    },
    /// Add a todo
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// 1 (very high) to 5 (very low)
        #[arg(short, long, default_value_t = DEFAULT_PRIORITY)]
        priority: u8,
    },
    /// Edit a todo; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<u8>,
        #[arg(long)]
        complete: Option<bool>,
    },
    /// Flip a todo between active and completed
    Toggle { id: i64 },
    /// Delete a todo
    Rm { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ProfileCmd {
    Show,
    /// Blank fields are left unchanged
    Update {
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "")]
        phone_number: String,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(api_url = %cli.api_url, "starting");

    let client = TodoClient::new(&cli.api_url);
    let mut transport = UreqTransport::new(Duration::from_secs(cli.timeout_secs));
    let mut session = match cli.token {
        Some(token) => Session::with_token(token),
        None => Session::new(),
    };

    match cli.command {
        Cmd::Register {
            email,
            password,
            confirm_password,
            full_name,
            phone_number,
        } => {
            let form = RegisterForm {
                email,
                password,
                confirm_password,
                full_name,
                phone_number,
            };
            let user = session
                .register(&client, &mut transport, form)
                .context("Registration failed")?;
            eprintln!("Registered {}", user.email);
            print_token(&session);
        }
        Cmd::Login { email, password } => {
            let user = session
                .login(&client, &mut transport, &email, &password)
                .context("Login failed")?;
            eprintln!("Signed in as {}", user.display_name());
            print_token(&session);
        }
        Cmd::Profile { action } => {
            require_token(&session)?;
            let user = match action.unwrap_or(ProfileCmd::Show) {
                ProfileCmd::Show => session.refresh_profile(&client, &mut transport),
                ProfileCmd::Update {
                    first_name,
                    last_name,
                    phone_number,
                } => {
                    let update = ProfileUpdate::from_form(&first_name, &last_name, &phone_number);
                    if update.is_empty() {
                        bail!("Nothing to update");
                    }
                    session.update_profile(&client, &mut transport, &update)
                }
            }
            .context("Failed to load profile")?;
            render::profile(user);
        }
        Cmd::Password { current, new } => {
            require_token(&session)?;
            let change = PasswordChange::new(current, new)?;
            session
                .change_password(&client, &mut transport, &change)
                .context("Error on password change")?;
            eprintln!("Password changed");
        }
        Cmd::List { filter } => run_list(&client, &mut session, &mut transport, None, filter)?,
        Cmd::Add {
            title,
            description,
            priority,
        } => {
            let command = Command::Create(NewTodo::new(title, description, priority));
            run_list(&client, &mut session, &mut transport, Some(command), Filter::All)?;
        }
        Cmd::Edit {
            id,
            title,
            description,
            priority,
            complete,
        } => {
            let patch = TodoPatch {
                title,
                description,
                priority,
                complete,
            };
            run_list(
                &client,
                &mut session,
                &mut transport,
                Some(Command::Update { id, patch }),
                Filter::All,
            )?;
        }
        Cmd::Toggle { id } => {
            // The completion state is filled in once the collection is loaded.
            let command = Command::Toggle {
                id,
                previous_completed: false,
            };
            run_list(&client, &mut session, &mut transport, Some(command), Filter::All)?;
        }
        Cmd::Rm { id } => {
            run_list(
                &client,
                &mut session,
                &mut transport,
                Some(Command::Delete { id }),
                Filter::All,
            )?;
        }
    }
    Ok(())
}

/// Load the collection, apply `command` if the load worked, print the view.
fn run_list(
    client: &TodoClient,
    session: &mut Session,
    transport: &mut UreqTransport,
    command: Option<Command>,
    filter: Filter,
) -> Result<()> {
    require_token(session)?;
    let mut sync = Synchronizer::new(client.clone());
    sync.load(session, transport);

    if sync.error().is_none() {
        if let Some(command) = command.map(|c| with_current_state(&sync, c)) {
            sync.dispatch(command, session, transport)?;
        }
    }

    render::todos(&sync, filter);

    if !session.is_authenticated() {
        bail!("Session expired, run `todo login` again");
    }
    if let Some(error) = sync.error() {
        bail!("{error}");
    }
    Ok(())
}

/// Toggle flips what the user currently sees, which is only known after load.
fn with_current_state(sync: &Synchronizer, command: Command) -> Command {
    if let Command::Update { id, .. } | Command::Toggle { id, .. } = &command {
        if sync.get(*id).is_none() {
            eprintln!("No todo with id {id}");
        }
    }
    match command {
        Command::Toggle { id, .. } => Command::Toggle {
            id,
            previous_completed: sync.get(id).is_some_and(|t| t.complete),
        },
        other => other,
    }
}

fn require_token(session: &Session) -> Result<()> {
    if !session.is_authenticated() {
        bail!("Not signed in: pass --token or set TODO_TOKEN (see `todo login`)");
    }
    Ok(())
}

fn print_token(session: &Session) {
    if let Some(token) = session.token() {
        println!("export TODO_TOKEN={token}");
    }
}
