use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use social::client::{ApiClient, ClientConfig, NoticeLevel, Picture, ProfileEditor, Session};

#[derive(Parser, Debug)]
#[command(name = "social-profile", about = "View and edit your social profile")]
struct Cli {
    /// Where the signed-in session is kept
    #[arg(long)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print the current profile
    Show,
    /// Change profile fields; omitted fields keep their current value
    Edit {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// Image file to upload as the new profile picture
        #[arg(long)]
        picture: Option<PathBuf>,
    },
}

fn print_form(editor: &ProfileEditor) {
    let form = &editor.form;
    println!("username:    {}", form.username);
    println!("name:        {}", form.name);
    println!("email:       {}", form.email);
    println!("bio:         {}", form.bio);
    println!("profile pic: {}", form.profile_pic);
}

/// Prints pending notices; returns false if any was an error.
fn flush_notices(editor: &mut ProfileEditor) -> bool {
    let mut ok = true;
    for notice in editor.take_notices() {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Error => {
                eprintln!("error: {}", notice.message);
                ok = false;
            }
        }
    }
    ok
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let client = ApiClient::new(config);
    let session_path = cli.session.unwrap_or_else(Session::default_path);

    match cli.command {
        Command::Signin { email, password } => {
            let session = client.signin(&email, &password).await?;
            session.save(&session_path)?;
            println!("Signed in as {}", session.user_id);
        }
        Command::Show => {
            let mut editor = ProfileEditor::new(client, Session::load(&session_path)?);
            editor.load().await;
            if !flush_notices(&mut editor) {
                std::process::exit(1);
            }
            print_form(&editor);
        }
        Command::Edit {
            username,
            name,
            email,
            bio,
            picture,
        } => {
            let mut editor = ProfileEditor::new(client, Session::load(&session_path)?);
            editor.load().await;
            if !flush_notices(&mut editor) {
                std::process::exit(1);
            }

            if let Some(username) = username {
                editor.form.username = username;
            }
            if let Some(name) = name {
                editor.form.name = name;
            }
            if let Some(email) = email {
                editor.form.email = email;
            }
            if let Some(bio) = bio {
                editor.form.bio = bio;
            }
            if let Some(path) = picture {
                editor.set_picture(Picture::from_path(&path).await?);
            }

            let mut loading = editor.watch_loading();
            let progress = async move {
                while loading.changed().await.is_ok() {
                    if *loading.borrow_and_update() {
                        eprintln!("Saving...");
                    }
                }
            };
            tokio::select! {
                _ = editor.save() => {}
                _ = progress => {}
            }
            if !flush_notices(&mut editor) {
                std::process::exit(1);
            }
            print_form(&editor);
        }
    }

    Ok(())
}
